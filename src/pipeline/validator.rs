//! Domain validation at stage boundaries.

use tracing::{debug, trace};

use crate::domain::{DomainSet, Instance};
use crate::error::AnnopipeError;
use crate::stream::{Processor, StageOutput};

/// A processor inserted at every stage boundary by the pipeline builder.
///
/// Holds the domain set the builder proved possible at its boundary and
/// checks every element against it. If every specifier is honest about its
/// domains this never fires; a stage that emits outside its declared
/// domains is caught here with [`AnnopipeError::BadDomain`].
///
/// The validator doubles as the pipeline's observability hook: each
/// element crossing the boundary is traced, so `RUST_LOG=annopipe=trace`
/// shows the full element flow.
pub struct InlineDomainValidator {
    /// Name of the stage immediately upstream (used in errors and traces).
    upstream: String,
    expected: DomainSet,
}

impl InlineDomainValidator {
    pub fn new(upstream: impl Into<String>, expected: DomainSet) -> Self {
        Self {
            upstream: upstream.into(),
            expected,
        }
    }

    /// The domain set this validator accepts.
    pub fn expected(&self) -> &DomainSet {
        &self.expected
    }
}

impl Processor for InlineDomainValidator {
    fn start(&mut self) -> Result<(), AnnopipeError> {
        debug!(
            upstream = %self.upstream,
            domains = %self.expected,
            "domain validator armed"
        );
        Ok(())
    }

    fn process_element(
        &mut self,
        element: Instance,
        out: &mut StageOutput<'_>,
    ) -> Result<(), AnnopipeError> {
        let actual = element.domain();
        if !self.expected.contains(actual) {
            return Err(AnnopipeError::BadDomain {
                stage: self.upstream.clone(),
                expected: self.expected.clone(),
                actual,
            });
        }
        trace!(
            upstream = %self.upstream,
            domain = %actual,
            file = element.file_name(),
            negative = element.is_negative(),
            "element passed boundary"
        );
        out.then(element)
    }
}
