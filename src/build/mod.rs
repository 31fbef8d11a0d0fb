//! Pipeline construction.
//!
//! [`PipelineBuilder`] consumes an ordered list of stage names plus raw
//! option tokens, resolves each name to a [`StageSpecifier`], and threads
//! domain-compatibility checking through every append: a forward pass
//! narrows the set of domains possible at the tail of the pipeline, and a
//! reverse pass prunes earlier stages' transfer maps that a new stage has
//! just proven dead. The result is an executable [`Pipeline`] with an
//! [`InlineDomainValidator`] guarding every stage boundary.
//!
//! Building performs no I/O; files are only touched when the pipeline
//! runs.

use tracing::debug;

use crate::config::PipelineConfig;
use crate::domain::DomainSet;
use crate::error::AnnopipeError;
use crate::pipeline::{InlineDomainValidator, Pipeline, ProcessorSlot};
use crate::registry::{Registry, StageInstance, StageKind, StageSpecifier};
use crate::stream::{Processor, Sink, Source};
use crate::transfer::{prune_backward, DomainTransferMap};

/// One flat token list split into per-stage groups.
///
/// Stage names act as the delimiter grammar: every token matching a
/// registered name opens a new group, and the tokens up to the next name
/// are that stage's options. Tokens before the first recognized name are
/// returned separately as global options.
pub fn split_stage_groups(
    registry: &Registry,
    tokens: &[String],
) -> (Vec<String>, Vec<(String, Vec<String>)>) {
    let mut globals = Vec::new();
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for token in tokens {
        if registry.contains(token) {
            groups.push((token.clone(), Vec::new()));
        } else if let Some((_, options)) = groups.last_mut() {
            options.push(token.clone());
        } else {
            globals.push(token.clone());
        }
    }
    (globals, groups)
}

/// Builds a pipeline directly from a flat token list.
///
/// The CLI consumes global options with clap before tokens reach this
/// function, so any leading token that is not a registered stage name
/// fails with [`AnnopipeError::UnknownPluginName`]. An empty token list
/// yields a legal pipeline with no source and no sink.
pub fn from_options(
    registry: &Registry,
    config: PipelineConfig,
    tokens: &[String],
) -> Result<Pipeline, AnnopipeError> {
    let (globals, groups) = split_stage_groups(registry, tokens);
    if let Some(stray) = globals.first() {
        return Err(AnnopipeError::UnknownPluginName(stray.clone()));
    }
    let mut builder = PipelineBuilder::new(registry, config);
    for (name, options) in &groups {
        builder.add_stage(name, options)?;
    }
    Ok(builder.build())
}

/// A processor accepted by the builder, with its resolved transfer map.
struct ProcessorEntry {
    name: String,
    processor: Box<dyn Processor>,
    transfer: DomainTransferMap,
}

/// Incremental, domain-checked pipeline assembly.
pub struct PipelineBuilder<'r> {
    registry: &'r Registry,
    config: PipelineConfig,
    source: Option<(String, Box<dyn Source>)>,
    source_domain: Option<crate::domain::Domain>,
    processors: Vec<ProcessorEntry>,
    sink: Option<(String, Box<dyn Sink>)>,
    /// Domains possible at the current tail of the pipeline.
    available: DomainSet,
}

impl<'r> PipelineBuilder<'r> {
    /// Creates a builder with no stages; every domain is initially possible.
    pub fn new(registry: &'r Registry, config: PipelineConfig) -> Self {
        Self {
            registry,
            config,
            source: None,
            source_domain: None,
            processors: Vec::new(),
            sink: None,
            available: DomainSet::all(),
        }
    }

    /// The domains still possible at the tail of the pipeline.
    pub fn available_domains(&self) -> &DomainSet {
        &self.available
    }

    /// Resolves `name` to a specifier, instantiates it from `options`, and
    /// appends it, running the forward and reverse domain passes.
    ///
    /// # Errors
    ///
    /// - [`AnnopipeError::UnknownPluginName`] if `name` is not registered.
    /// - [`AnnopipeError::StageAfterOutput`] if a sink was already added.
    /// - [`AnnopipeError::InputStageNotFirst`] for a source after position 0.
    /// - [`AnnopipeError::StageInvalidForDomains`] if no domain assignment
    ///   can satisfy the stage at this position.
    pub fn add_stage(&mut self, name: &str, options: &[String]) -> Result<(), AnnopipeError> {
        let specifier = self
            .registry
            .lookup(name)
            .ok_or_else(|| AnnopipeError::UnknownPluginName(name.to_string()))?;

        if self.sink.is_some() {
            return Err(AnnopipeError::StageAfterOutput {
                stage: name.to_string(),
            });
        }

        match specifier.kind() {
            StageKind::Source => self.add_source(specifier, options),
            StageKind::Processor => self.add_processor(specifier, options),
            StageKind::Sink => self.add_sink(specifier, options),
        }
    }

    fn add_source(
        &mut self,
        specifier: &dyn StageSpecifier,
        options: &[String],
    ) -> Result<(), AnnopipeError> {
        if self.source.is_some() || !self.processors.is_empty() {
            return Err(AnnopipeError::InputStageNotFirst {
                stage: specifier.name().to_string(),
            });
        }
        let domain = specifier
            .domain()
            .expect("source specifiers declare a domain");
        let StageInstance::Source(source) =
            specifier.instantiate(options, &self.config)?
        else {
            return Err(AnnopipeError::StageOptions {
                stage: specifier.name().to_string(),
                message: "specifier kind and instance kind disagree".to_string(),
            });
        };
        self.source = Some((specifier.name().to_string(), source));
        self.source_domain = Some(domain);
        self.available = DomainSet::singleton(domain);
        debug!(stage = specifier.name(), %domain, "source accepted");
        Ok(())
    }

    fn add_processor(
        &mut self,
        specifier: &dyn StageSpecifier,
        options: &[String],
    ) -> Result<(), AnnopipeError> {
        let transfer = DomainTransferMap::probe(specifier, &self.available);
        if transfer.is_empty() {
            return Err(AnnopipeError::StageInvalidForDomains {
                stage: specifier.name().to_string(),
                available: self.available.clone(),
            });
        }
        // The new stage restricts what earlier processors may emit.
        self.prune_upstream(specifier.name(), transfer.inputs())?;

        let StageInstance::Processor(processor) =
            specifier.instantiate(options, &self.config)?
        else {
            return Err(AnnopipeError::StageOptions {
                stage: specifier.name().to_string(),
                message: "specifier kind and instance kind disagree".to_string(),
            });
        };
        self.available = transfer.outputs();
        debug!(
            stage = specifier.name(),
            domains = %self.available,
            "processor accepted"
        );
        self.processors.push(ProcessorEntry {
            name: specifier.name().to_string(),
            processor,
            transfer,
        });
        Ok(())
    }

    fn add_sink(
        &mut self,
        specifier: &dyn StageSpecifier,
        options: &[String],
    ) -> Result<(), AnnopipeError> {
        let domain = specifier.domain().expect("sink specifiers declare a domain");
        if !self.available.contains(domain) {
            return Err(AnnopipeError::StageInvalidForDomains {
                stage: specifier.name().to_string(),
                available: self.available.clone(),
            });
        }
        self.prune_upstream(specifier.name(), DomainSet::singleton(domain))?;

        let StageInstance::Sink(sink) = specifier.instantiate(options, &self.config)? else {
            return Err(AnnopipeError::StageOptions {
                stage: specifier.name().to_string(),
                message: "specifier kind and instance kind disagree".to_string(),
            });
        };
        self.sink = Some((specifier.name().to_string(), sink));
        self.available = DomainSet::singleton(domain);
        debug!(stage = specifier.name(), %domain, "sink accepted");
        Ok(())
    }

    /// Reverse pass: restrict earlier transfer maps to outputs the new
    /// stage accepts, walking backward to the fixed point.
    fn prune_upstream(
        &mut self,
        new_stage: &str,
        allowed: DomainSet,
    ) -> Result<(), AnnopipeError> {
        let mut maps: Vec<DomainTransferMap> = self
            .processors
            .iter()
            .map(|entry| entry.transfer.clone())
            .collect();
        if prune_backward(&mut maps, allowed).is_some() {
            // An earlier stage lost every domain branch: the sequence as a
            // whole is infeasible, reported against the stage being added.
            return Err(AnnopipeError::StageInvalidForDomains {
                stage: new_stage.to_string(),
                available: self.available.clone(),
            });
        }
        for (entry, map) in self.processors.iter_mut().zip(maps) {
            entry.transfer = map;
        }
        Ok(())
    }

    /// Assembles the executable pipeline, inserting a domain validator at
    /// the head boundary and after every processor.
    pub fn build(self) -> Pipeline {
        let mut slots = Vec::new();

        // Head validator: the source's emitted domain, or the first
        // processor's accepted inputs when there is no source.
        let head = match (&self.source, self.processors.first()) {
            (Some((name, _)), _) => {
                let expected = self
                    .source_domain
                    .map(DomainSet::singleton)
                    .unwrap_or_else(DomainSet::all);
                Some((name.clone(), expected))
            }
            (None, Some(first)) => Some((first.name.clone(), first.transfer.inputs())),
            (None, None) => None,
        };
        if let Some((upstream, expected)) = head {
            slots.push(validator_slot(&upstream, expected));
        }

        for entry in self.processors {
            let expected = entry.transfer.outputs();
            slots.push(ProcessorSlot {
                name: entry.name.clone(),
                processor: entry.processor,
            });
            slots.push(validator_slot(&entry.name, expected));
        }

        Pipeline::new(self.source, slots, self.sink.map(|(_, sink)| sink))
    }
}

fn validator_slot(upstream: &str, expected: DomainSet) -> ProcessorSlot {
    ProcessorSlot {
        name: format!("validate[{upstream}]"),
        processor: Box::new(InlineDomainValidator::new(upstream, expected)),
    }
}
