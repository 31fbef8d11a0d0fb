use std::path::PathBuf;
use thiserror::Error;

use crate::domain::{Domain, DomainSet};

/// The main error type for annopipe operations.
///
/// Construction-time errors (`UnknownPluginName`, `StageInvalidForDomains`,
/// `InputStageNotFirst`, `StageAfterOutput`, option errors) abort the whole
/// CLI invocation before any I/O happens. Runtime errors abort the current
/// pipeline run; the only guaranteed cleanup is the per-stage state reset.
#[derive(Debug, Error)]
pub enum AnnopipeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A stage token did not match any registered specifier.
    #[error("Unknown plugin name: '{0}'")]
    UnknownPluginName(String),

    /// A stage's domain requirements are incompatible with every domain
    /// currently reachable at its pipeline position.
    #[error("Stage '{stage}' is invalid for the possible domains at its position: {available}")]
    StageInvalidForDomains { stage: String, available: DomainSet },

    /// A source-kind stage appeared after position 0.
    #[error("Input stage '{stage}' must be the first stage of the pipeline")]
    InputStageNotFirst { stage: String },

    /// A stage was appended after a sink-kind stage.
    #[error("Stage '{stage}' appears after the output stage")]
    StageAfterOutput { stage: String },

    /// A processor's domain-transfer function does not support a domain.
    #[error("Stage '{stage}' does not support the {domain} domain")]
    UnsupportedDomain { stage: String, domain: Domain },

    /// An element observed at a validator does not match the statically
    /// resolved domain set for that boundary.
    #[error("Bad domain after stage '{stage}': got {actual}, expected one of {expected}")]
    BadDomain {
        stage: String,
        expected: DomainSet,
        actual: Domain,
    },

    /// A stage returned from `produce`/`finish` without ever signaling the
    /// end of its output stream.
    #[error("Stage '{stage}' never called done() on its output")]
    DoneNeverCalled { stage: String },

    /// A stage forwarded an element after having signaled end-of-stream.
    #[error("Stage '{stage}' called then() after done()")]
    ThenCalledAfterDone { stage: String },

    /// A stage's option tokens failed to parse.
    #[error("Invalid options for stage '{stage}': {message}")]
    StageOptions { stage: String, message: String },

    /// Malformed data encountered by a format stage.
    #[error("Bad data in {}: {message}", .path.display())]
    Data { path: PathBuf, message: String },

    /// `process()` was called on a pipeline with no source and no override.
    #[error("Pipeline has no source stage")]
    MissingSource,

    /// `process()` was called on a pipeline with no sink and no override.
    #[error("Pipeline has no sink stage")]
    MissingSink,
}
