//! Stream utilities shared by the executor, built-in stages, and tests.

use crate::domain::Instance;
use crate::error::AnnopipeError;

use super::state::ProcessState;
use super::{Processor, Sink, Source, StageOutput};

/// A source that replays a vector of instances.
///
/// Used by tests and as a pipeline-run override; the vector is restored on
/// `reset` so the same source can drive several runs.
pub struct VecSource {
    items: Vec<Instance>,
    cursor: ProcessState<usize>,
}

impl VecSource {
    pub fn new(items: Vec<Instance>) -> Self {
        Self {
            items,
            cursor: ProcessState::new(),
        }
    }
}

impl Source for VecSource {
    fn produce(&mut self, out: &mut StageOutput<'_>) -> Result<(), AnnopipeError> {
        let cursor = self.cursor.get_or_init(|| 0);
        while *cursor < self.items.len() {
            let element = self.items[*cursor].clone();
            *cursor += 1;
            out.then(element)?;
        }
        out.done()
    }

    fn reset(&mut self) {
        self.cursor.reset();
    }
}

/// A sink that gathers every element it consumes.
///
/// Backs [`Pipeline::load`](crate::pipeline::Pipeline::load). The gathered
/// elements are the sink's output, not per-run scratch, so `reset`
/// deliberately leaves them in place.
#[derive(Default)]
pub struct CollectSink {
    items: Vec<Instance>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The elements consumed so far.
    pub fn items(&self) -> &[Instance] {
        &self.items
    }

    /// Consumes the sink, returning the gathered elements.
    pub fn into_items(self) -> Vec<Instance> {
        self.items
    }
}

impl Sink for CollectSink {
    fn consume_element(&mut self, element: Instance) -> Result<(), AnnopipeError> {
        self.items.push(element);
        Ok(())
    }
}

/// A processor that accumulates the entire stream and only emits it once
/// the upstream stage has finished.
///
/// The one sanctioned way for a stage to see "all" elements: everything is
/// held in `process_element` and replayed, in order, from `finish`.
#[derive(Default)]
pub struct Buffer {
    held: ProcessState<Vec<Instance>>,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Processor for Buffer {
    fn process_element(
        &mut self,
        element: Instance,
        _out: &mut StageOutput<'_>,
    ) -> Result<(), AnnopipeError> {
        self.held.get_or_init(Vec::new).push(element);
        Ok(())
    }

    fn finish(&mut self, out: &mut StageOutput<'_>) -> Result<(), AnnopipeError> {
        if let Some(held) = self.held.take() {
            for element in held {
                out.then(element)?;
            }
        }
        out.done()
    }

    fn reset(&mut self) {
        self.held.reset();
    }
}
