//! Stage specifiers and the process-wide stage registry.
//!
//! A [`StageSpecifier`] is a load-time descriptor of one pluggable unit:
//! its name, description, kind, and domain behavior. Specifiers are looked
//! up by name from a [`Registry`] populated once at start-up and read-only
//! afterwards; the builder uses them to decide domain compatibility and to
//! instantiate the concrete stage from its option tokens.

use std::collections::BTreeMap;
use std::fmt;

use crate::config::PipelineConfig;
use crate::domain::Domain;
use crate::error::AnnopipeError;
use crate::stream::{Processor, Sink, Source};

/// The three stage kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageKind {
    Source,
    Processor,
    Sink,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StageKind::Source => "source",
            StageKind::Processor => "processor",
            StageKind::Sink => "sink",
        })
    }
}

/// A concrete stage, freshly instantiated from option tokens.
pub enum StageInstance {
    Source(Box<dyn Source>),
    Processor(Box<dyn Processor>),
    Sink(Box<dyn Sink>),
}

/// Load-time descriptor of one pluggable stage.
///
/// Source and sink specifiers fix their domain via [`domain`]; processor
/// specifiers describe theirs through [`domain_transfer`], a total
/// function over the subset of domains they support.
///
/// [`domain`]: StageSpecifier::domain
/// [`domain_transfer`]: StageSpecifier::domain_transfer
pub trait StageSpecifier {
    /// The registered stage name (the CLI token that selects this stage).
    fn name(&self) -> &'static str;

    /// A one-line human-readable description.
    fn description(&self) -> &'static str;

    /// Whether this stage is a source, processor, or sink.
    fn kind(&self) -> StageKind;

    /// The fixed domain of a source or sink stage.
    fn domain(&self) -> Option<Domain> {
        None
    }

    /// Maps an input domain to the domain this processor emits for it.
    ///
    /// Probed speculatively during pipeline construction against domains
    /// that may never be used, so implementations must be side-effect
    /// free: no I/O, no state mutation.
    ///
    /// # Errors
    ///
    /// Fails with [`AnnopipeError::UnsupportedDomain`] for domains outside
    /// the supported subset.
    fn domain_transfer(&self, input: Domain) -> Result<Domain, AnnopipeError> {
        Err(AnnopipeError::UnsupportedDomain {
            stage: self.name().to_string(),
            domain: input,
        })
    }

    /// Instantiates the concrete stage from its option tokens.
    ///
    /// Performs no I/O; file access is deferred to the pipeline run.
    fn instantiate(
        &self,
        options: &[String],
        config: &PipelineConfig,
    ) -> Result<StageInstance, AnnopipeError>;
}

/// Name -> specifier lookup, populated at start-up.
#[derive(Default)]
pub struct Registry {
    specifiers: BTreeMap<&'static str, Box<dyn StageSpecifier>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in stage.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for specifier in crate::stages::builtin_specifiers() {
            registry.register(specifier);
        }
        registry
    }

    /// Registers a specifier under its own name, replacing any previous
    /// entry with the same name.
    pub fn register(&mut self, specifier: Box<dyn StageSpecifier>) {
        self.specifiers.insert(specifier.name(), specifier);
    }

    /// Looks up a specifier by stage name.
    pub fn lookup(&self, name: &str) -> Option<&dyn StageSpecifier> {
        self.specifiers.get(name).map(|s| s.as_ref())
    }

    /// True if `name` is a registered stage name.
    pub fn contains(&self, name: &str) -> bool {
        self.specifiers.contains_key(name)
    }

    /// The registered stage names, in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.specifiers.keys().copied()
    }

    /// The registered specifiers, in name order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn StageSpecifier> + '_ {
        self.specifiers.values().map(|s| s.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_resolves_known_stages() {
        let registry = Registry::with_builtins();
        for name in [
            "from-roi-csv",
            "to-roi-csv",
            "from-subdir",
            "to-subdir",
            "passthrough",
            "discard-negatives",
            "filter-labels",
            "max-elements",
            "od-to-ic",
        ] {
            let spec = registry
                .lookup(name)
                .unwrap_or_else(|| panic!("missing builtin '{name}'"));
            assert_eq!(spec.name(), name);
            assert!(!spec.description().is_empty());
        }
    }

    #[test]
    fn unknown_names_are_absent() {
        let registry = Registry::with_builtins();
        assert!(registry.lookup("from-flux-capacitor").is_none());
        assert!(!registry.contains("from-flux-capacitor"));
    }

    #[test]
    fn sources_and_sinks_declare_a_fixed_domain() {
        let registry = Registry::with_builtins();
        for spec in registry.iter() {
            match spec.kind() {
                StageKind::Source | StageKind::Sink => {
                    assert!(
                        spec.domain().is_some(),
                        "'{}' must declare a domain",
                        spec.name()
                    );
                }
                StageKind::Processor => assert!(spec.domain().is_none()),
            }
        }
    }
}
