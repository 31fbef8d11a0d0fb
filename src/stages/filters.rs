//! Domain-preserving stream processors.

use clap::Parser;

use crate::config::PipelineConfig;
use crate::domain::{Domain, Instance};
use crate::error::AnnopipeError;
use crate::registry::{StageInstance, StageKind, StageSpecifier};
use crate::stream::{ProcessState, Processor, StageOutput};

use super::parse_stage_options;

// ============================================================================
// passthrough
// ============================================================================

/// Forwards every element unchanged. Total over all domains.
pub struct Passthrough;

impl Processor for Passthrough {
    fn process_element(
        &mut self,
        element: Instance,
        out: &mut StageOutput<'_>,
    ) -> Result<(), AnnopipeError> {
        out.then(element)
    }
}

pub struct PassthroughSpecifier;

impl StageSpecifier for PassthroughSpecifier {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn description(&self) -> &'static str {
        "forwards every instance unchanged"
    }

    fn kind(&self) -> StageKind {
        StageKind::Processor
    }

    fn domain_transfer(&self, input: Domain) -> Result<Domain, AnnopipeError> {
        Ok(input)
    }

    fn instantiate(
        &self,
        options: &[String],
        _config: &PipelineConfig,
    ) -> Result<StageInstance, AnnopipeError> {
        if let Some(stray) = options.first() {
            return Err(AnnopipeError::StageOptions {
                stage: self.name().to_string(),
                message: format!("unexpected option '{stray}'"),
            });
        }
        Ok(StageInstance::Processor(Box::new(Passthrough)))
    }
}

// ============================================================================
// discard-negatives
// ============================================================================

/// Drops instances that carry no annotation. Total over all domains.
pub struct DiscardNegatives;

impl Processor for DiscardNegatives {
    fn process_element(
        &mut self,
        element: Instance,
        out: &mut StageOutput<'_>,
    ) -> Result<(), AnnopipeError> {
        if element.is_negative() {
            return Ok(());
        }
        out.then(element)
    }
}

pub struct DiscardNegativesSpecifier;

impl StageSpecifier for DiscardNegativesSpecifier {
    fn name(&self) -> &'static str {
        "discard-negatives"
    }

    fn description(&self) -> &'static str {
        "drops instances with no annotation"
    }

    fn kind(&self) -> StageKind {
        StageKind::Processor
    }

    fn domain_transfer(&self, input: Domain) -> Result<Domain, AnnopipeError> {
        Ok(input)
    }

    fn instantiate(
        &self,
        _options: &[String],
        _config: &PipelineConfig,
    ) -> Result<StageInstance, AnnopipeError> {
        Ok(StageInstance::Processor(Box::new(DiscardNegatives)))
    }
}

// ============================================================================
// filter-labels
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "filter-labels", disable_help_flag = true)]
struct FilterLabelsOptions {
    /// Labels to keep.
    #[arg(short, long, required = true, num_args = 1..)]
    labels: Vec<String>,
}

/// Keeps only the listed labels.
///
/// Object-detection instances keep their matching objects (and may become
/// negative); classification instances with any other label are dropped
/// outright. Chain `discard-negatives` afterwards to drop the emptied
/// detection instances too.
pub struct FilterLabels {
    labels: Vec<String>,
}

impl FilterLabels {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    fn keeps(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

impl Processor for FilterLabels {
    fn process_element(
        &mut self,
        element: Instance,
        out: &mut StageOutput<'_>,
    ) -> Result<(), AnnopipeError> {
        match element {
            Instance::ObjectDetection(mut inst) => {
                if let Some(objects) = inst.objects.as_mut() {
                    objects.retain(|obj| self.keeps(&obj.label));
                }
                out.then(Instance::ObjectDetection(inst))
            }
            Instance::Classification(inst) => {
                match inst.label.as_deref() {
                    Some(label) if self.keeps(label) => {
                        out.then(Instance::Classification(inst))
                    }
                    _ => Ok(()),
                }
            }
            // Unreachable behind the inline validators.
            other => out.then(other),
        }
    }
}

pub struct FilterLabelsSpecifier;

impl StageSpecifier for FilterLabelsSpecifier {
    fn name(&self) -> &'static str {
        "filter-labels"
    }

    fn description(&self) -> &'static str {
        "keeps only instances/objects carrying the listed labels"
    }

    fn kind(&self) -> StageKind {
        StageKind::Processor
    }

    fn domain_transfer(&self, input: Domain) -> Result<Domain, AnnopipeError> {
        match input {
            Domain::ObjectDetection | Domain::Classification => Ok(input),
            other => Err(AnnopipeError::UnsupportedDomain {
                stage: self.name().to_string(),
                domain: other,
            }),
        }
    }

    fn instantiate(
        &self,
        options: &[String],
        _config: &PipelineConfig,
    ) -> Result<StageInstance, AnnopipeError> {
        let opts: FilterLabelsOptions = parse_stage_options(self.name(), options)?;
        Ok(StageInstance::Processor(Box::new(FilterLabels::new(
            opts.labels,
        ))))
    }
}

// ============================================================================
// max-elements
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "max-elements", disable_help_flag = true)]
struct MaxElementsOptions {
    /// Maximum number of elements to forward.
    #[arg(short, long)]
    max: usize,
}

/// Forwards at most N elements, then swallows the rest of the stream.
pub struct MaxElements {
    limit: usize,
    seen: ProcessState<usize>,
}

impl MaxElements {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            seen: ProcessState::new(),
        }
    }
}

impl Processor for MaxElements {
    fn process_element(
        &mut self,
        element: Instance,
        out: &mut StageOutput<'_>,
    ) -> Result<(), AnnopipeError> {
        let seen = self.seen.get_or_init(|| 0);
        if *seen >= self.limit {
            return Ok(());
        }
        *seen += 1;
        out.then(element)
    }

    fn reset(&mut self) {
        self.seen.reset();
    }
}

pub struct MaxElementsSpecifier;

impl StageSpecifier for MaxElementsSpecifier {
    fn name(&self) -> &'static str {
        "max-elements"
    }

    fn description(&self) -> &'static str {
        "forwards at most N instances"
    }

    fn kind(&self) -> StageKind {
        StageKind::Processor
    }

    fn domain_transfer(&self, input: Domain) -> Result<Domain, AnnopipeError> {
        Ok(input)
    }

    fn instantiate(
        &self,
        options: &[String],
        _config: &PipelineConfig,
    ) -> Result<StageInstance, AnnopipeError> {
        let opts: MaxElementsOptions = parse_stage_options(self.name(), options)?;
        Ok(StageInstance::Processor(Box::new(MaxElements::new(
            opts.max,
        ))))
    }
}
