//! Stream core: the `Source` / `Processor` / `Sink` contracts and the
//! calling-semantics enforcement applied at every stage boundary.
//!
//! Elements are pushed, never pulled. A stage forwards output through a
//! [`StageOutput`] handle, which exposes exactly two operations:
//!
//! - [`StageOutput::then`] forwards one element downstream. It may be
//!   called zero, one, or many times per input element, which is how
//!   filtering and 1:N expansion work.
//! - [`StageOutput::done`] signals that this stage will never produce
//!   another element. It is idempotent; forwarding an element after it
//!   has fired is an error.
//!
//! Every boundary therefore moves through a strict `Producing -> Done`
//! state machine exactly once per run. The [`Pipeline`](crate::pipeline)
//! executor checks [`StageOutput::ensure_done`] after `produce`/`finish`
//! return, so no stage can silently forget to terminate its stream.

pub mod state;
pub mod util;

pub use state::ProcessState;

use crate::domain::Instance;
use crate::error::AnnopipeError;

/// One message traveling across a stage boundary.
pub enum StreamEvent {
    /// A single element.
    Element(Instance),
    /// End of stream; sent at most once per boundary per run.
    End,
}

/// The downstream side of a stage boundary: a handler for stream events.
pub type Handler<'a> = Box<dyn FnMut(StreamEvent) -> Result<(), AnnopipeError> + 'a>;

/// The `then`/`done` handle passed to sources and processors.
///
/// Wraps the downstream handler with the boundary state machine: `then`
/// after `done` fails with `ThenCalledAfterDone`, repeated `done` calls
/// are silently absorbed, and `ensure_done` reports `DoneNeverCalled`
/// for a stage that returned without terminating its output.
pub struct StageOutput<'a> {
    forward: Handler<'a>,
    stage: String,
    done: bool,
}

impl<'a> StageOutput<'a> {
    /// Creates the output handle for the boundary below `stage`.
    pub fn new(stage: impl Into<String>, forward: Handler<'a>) -> Self {
        Self {
            forward,
            stage: stage.into(),
            done: false,
        }
    }

    /// Forwards one element downstream.
    ///
    /// # Errors
    ///
    /// Fails with [`AnnopipeError::ThenCalledAfterDone`] if this boundary
    /// has already seen `done`, and propagates any error raised further
    /// down the pipeline.
    pub fn then(&mut self, element: Instance) -> Result<(), AnnopipeError> {
        if self.done {
            return Err(AnnopipeError::ThenCalledAfterDone {
                stage: self.stage.clone(),
            });
        }
        (self.forward)(StreamEvent::Element(element))
    }

    /// Signals end of stream. Idempotent: calls after the first are no-ops.
    pub fn done(&mut self) -> Result<(), AnnopipeError> {
        if self.done {
            return Ok(());
        }
        self.done = true;
        (self.forward)(StreamEvent::End)
    }

    /// Returns true once `done` has fired for this boundary.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Verifies that the owning stage terminated its output.
    ///
    /// # Errors
    ///
    /// Fails with [`AnnopipeError::DoneNeverCalled`] if `done` never fired.
    pub fn ensure_done(&self) -> Result<(), AnnopipeError> {
        if self.done {
            Ok(())
        } else {
            Err(AnnopipeError::DoneNeverCalled {
                stage: self.stage.clone(),
            })
        }
    }
}

/// A stream producer. Drives the whole pipeline once per run.
pub trait Source {
    /// Optional per-run setup, called once before `produce`.
    fn start(&mut self) -> Result<(), AnnopipeError> {
        Ok(())
    }

    /// Produces the stream, calling `out.then(..)` for each element and
    /// `out.done()` when no more elements will ever follow.
    ///
    /// Called exactly once per pipeline run.
    fn produce(&mut self, out: &mut StageOutput<'_>) -> Result<(), AnnopipeError>;

    /// Resets all per-run mutable state to its initial condition.
    fn reset(&mut self) {}
}

/// A stream transformer.
pub trait Processor {
    /// Optional per-run setup, called once before the first element.
    fn start(&mut self) -> Result<(), AnnopipeError> {
        Ok(())
    }

    /// Handles one input element, forwarding zero or more outputs via
    /// `out.then(..)`. Must not end the downstream stream; end-of-stream
    /// is signaled exclusively through [`Processor::finish`].
    fn process_element(
        &mut self,
        element: Instance,
        out: &mut StageOutput<'_>,
    ) -> Result<(), AnnopipeError>;

    /// Called exactly once after the upstream stage has ended its stream.
    /// A buffering processor emits its held elements here; the default
    /// immediately terminates the downstream stream.
    fn finish(&mut self, out: &mut StageOutput<'_>) -> Result<(), AnnopipeError> {
        out.done()
    }

    /// Resets all per-run mutable state to its initial condition.
    fn reset(&mut self) {}
}

/// A terminal stream consumer.
pub trait Sink {
    /// Optional per-run setup, called once before the first element.
    fn start(&mut self) -> Result<(), AnnopipeError> {
        Ok(())
    }

    /// Consumes one element.
    fn consume_element(&mut self, element: Instance) -> Result<(), AnnopipeError>;

    /// Called once at stream end.
    fn finish(&mut self) -> Result<(), AnnopipeError> {
        Ok(())
    }

    /// Resets all per-run mutable state to its initial condition.
    fn reset(&mut self) {}
}

/// Binds a processor to its already-built downstream handler, yielding the
/// handler its upstream stage will drive.
///
/// Elements are dispatched to `process_element`; the end event invokes
/// `finish` and then verifies the processor terminated its own output.
pub fn bind_processor<'a>(
    name: &str,
    processor: &'a mut dyn Processor,
    downstream: Handler<'a>,
) -> Handler<'a> {
    let mut out = StageOutput::new(name, downstream);
    Box::new(move |event| match event {
        StreamEvent::Element(element) => processor.process_element(element, &mut out),
        StreamEvent::End => {
            processor.finish(&mut out)?;
            out.ensure_done()
        }
    })
}

/// Builds the terminal handler over a sink.
pub fn bind_sink<'a>(sink: &'a mut dyn Sink) -> Handler<'a> {
    Box::new(move |event| match event {
        StreamEvent::Element(element) => sink.consume_element(element),
        StreamEvent::End => sink.finish(),
    })
}
