//! The pipeline executor.
//!
//! A pipeline is an ordered triple `(source?, processors, sink?)`. The
//! builder interleaves [`InlineDomainValidator`]s among the processors, so
//! by the time a pipeline exists every boundary carries a proven domain
//! set.
//!
//! Execution is single-threaded, synchronous, and depth-first: the handler
//! chain is built from the sink backward to the source, and each element
//! the source pushes is fully processed down to the sink before the next
//! one is produced. There is no buffering between stages, no back-pressure,
//! and no mid-run cancellation; the only way to stop early is to raise an
//! error, which aborts the run after the guaranteed state reset.

mod validator;

pub use validator::InlineDomainValidator;

use tracing::debug;

use crate::domain::Instance;
use crate::error::AnnopipeError;
use crate::stream::util::CollectSink;
use crate::stream::{bind_processor, bind_sink, Processor, Sink, Source, StageOutput};

/// A named processor slot inside a pipeline.
pub(crate) struct ProcessorSlot {
    pub name: String,
    pub processor: Box<dyn Processor>,
}

/// An executable stream pipeline.
///
/// Built once per CLI invocation by the pipeline builder and discarded
/// after use. Running the same instance twice sequentially is supported
/// (all per-run state resets around each run); concurrent reuse is not.
pub struct Pipeline {
    source_name: Option<String>,
    source: Option<Box<dyn Source>>,
    processors: Vec<ProcessorSlot>,
    sink: Option<Box<dyn Sink>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("source_name", &self.source_name)
            .field("has_source", &self.source.is_some())
            .field(
                "processors",
                &self
                    .processors
                    .iter()
                    .map(|slot| slot.name.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl Pipeline {
    pub(crate) fn new(
        source: Option<(String, Box<dyn Source>)>,
        processors: Vec<ProcessorSlot>,
        sink: Option<Box<dyn Sink>>,
    ) -> Self {
        let (source_name, source) = match source {
            Some((name, source)) => (Some(name), Some(source)),
            None => (None, None),
        };
        Self {
            source_name,
            source,
            processors,
            sink,
        }
    }

    /// An empty pipeline: no source, no processors, no sink.
    pub fn empty() -> Self {
        Self::new(None, Vec::new(), None)
    }

    /// True if the pipeline has a source stage.
    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// True if the pipeline has a sink stage.
    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Number of processor slots, validators included.
    pub fn processor_count(&self) -> usize {
        self.processors.len()
    }

    /// Runs the pipeline once, source to sink.
    ///
    /// # Errors
    ///
    /// Fails with [`AnnopipeError::MissingSource`] /
    /// [`AnnopipeError::MissingSink`] when either end is absent, and
    /// propagates the first error any stage raises. Per-run state is reset
    /// before the run and again afterwards, whether or not it succeeded.
    pub fn process(&mut self) -> Result<(), AnnopipeError> {
        self.process_with(None, None)
    }

    /// Runs the pipeline once, optionally overriding the source and/or sink
    /// for this run only.
    pub fn process_with(
        &mut self,
        mut source_override: Option<&mut dyn Source>,
        mut sink_override: Option<&mut dyn Sink>,
    ) -> Result<(), AnnopipeError> {
        self.reset_all(source_override.as_deref_mut(), sink_override.as_deref_mut());
        let result = self.run_once(source_override.as_deref_mut(), sink_override.as_deref_mut());
        // Reset runs on the error path too, so a failed run leaves no residue.
        self.reset_all(source_override, sink_override);
        result
    }

    /// Runs the pipeline with a collecting sink and returns every element
    /// that reached the end of the processor chain.
    pub fn load(&mut self) -> Result<Vec<Instance>, AnnopipeError> {
        let mut collector = CollectSink::new();
        self.process_with(None, Some(&mut collector))?;
        Ok(collector.into_items())
    }

    fn run_once<'a, 'b>(
        &mut self,
        source_override: Option<&mut (dyn Source + 'a)>,
        sink_override: Option<&mut (dyn Sink + 'b)>,
    ) -> Result<(), AnnopipeError> {
        let source_name = self.source_name.as_deref().unwrap_or("<source>");
        let source: &mut dyn Source = match source_override {
            Some(source) => source,
            None => self
                .source
                .as_deref_mut()
                .ok_or(AnnopipeError::MissingSource)?,
        };
        let sink: &mut dyn Sink = match sink_override {
            Some(sink) => sink,
            None => self.sink.as_deref_mut().ok_or(AnnopipeError::MissingSink)?,
        };

        sink.start()?;
        for slot in &mut self.processors {
            slot.processor.start()?;
        }
        source.start()?;

        debug!(
            source = source_name,
            processors = self.processors.len(),
            "pipeline run starting"
        );

        // Build the handler chain from the sink backward to the source,
        // then hand the outermost boundary to the source.
        let mut handler = bind_sink(sink);
        for slot in self.processors.iter_mut().rev() {
            handler = bind_processor(&slot.name, slot.processor.as_mut(), handler);
        }
        let mut out = StageOutput::new(source_name, handler);
        source.produce(&mut out)?;
        out.ensure_done()?;

        debug!(source = source_name, "pipeline run finished");
        Ok(())
    }

    fn reset_all<'a, 'b>(
        &mut self,
        source_override: Option<&mut (dyn Source + 'a)>,
        sink_override: Option<&mut (dyn Sink + 'b)>,
    ) {
        match source_override {
            Some(source) => source.reset(),
            None => {
                if let Some(source) = self.source.as_deref_mut() {
                    source.reset();
                }
            }
        }
        for slot in &mut self.processors {
            slot.processor.reset();
        }
        match sink_override {
            Some(sink) => sink.reset(),
            None => {
                if let Some(sink) = self.sink.as_deref_mut() {
                    sink.reset();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClassificationInstance, ImageInfo, Instance};
    use crate::stream::util::{Buffer, VecSource};
    use crate::stream::ProcessState;

    fn labeled(name: &str) -> Instance {
        Instance::Classification(ClassificationInstance {
            image: ImageInfo::new(name),
            label: Some("cat".into()),
        })
    }

    fn slot(name: &str, processor: Box<dyn Processor>) -> ProcessorSlot {
        ProcessorSlot {
            name: name.to_string(),
            processor,
        }
    }

    #[test]
    fn empty_pipeline_needs_overrides() {
        let mut pipeline = Pipeline::empty();
        assert!(matches!(
            pipeline.process(),
            Err(AnnopipeError::MissingSource)
        ));

        let mut source = VecSource::new(vec![labeled("a.png")]);
        let mut sink = CollectSink::new();
        pipeline
            .process_with(Some(&mut source), Some(&mut sink))
            .unwrap();
        assert_eq!(sink.items().len(), 1);
    }

    #[test]
    fn elements_arrive_in_source_order() {
        let items = vec![labeled("a.png"), labeled("b.png"), labeled("c.png")];
        let mut pipeline = Pipeline::new(
            Some((
                "vec-source".to_string(),
                Box::new(VecSource::new(items.clone())),
            )),
            vec![slot("buffer", Box::new(Buffer::new()))],
            None,
        );
        let loaded = pipeline.load().unwrap();
        assert_eq!(loaded, items);
    }

    #[test]
    fn state_resets_even_when_a_stage_fails() {
        struct CountsThenFails {
            seen: ProcessState<usize>,
        }
        impl Processor for CountsThenFails {
            fn process_element(
                &mut self,
                _element: Instance,
                _out: &mut StageOutput<'_>,
            ) -> Result<(), AnnopipeError> {
                let seen = self.seen.get_or_init(|| 0);
                *seen += 1;
                Err(AnnopipeError::Data {
                    path: "boom".into(),
                    message: format!("failed on element {}", seen),
                })
            }
            fn reset(&mut self) {
                self.seen.reset();
            }
        }

        let mut pipeline = Pipeline::new(
            Some((
                "vec-source".to_string(),
                Box::new(VecSource::new(vec![labeled("a.png")])),
            )),
            vec![slot(
                "counts-then-fails",
                Box::new(CountsThenFails {
                    seen: ProcessState::new(),
                }),
            )],
            None,
        );

        // Two runs; the counter must restart at 1 each time.
        for _ in 0..2 {
            let err = pipeline.load().unwrap_err();
            assert!(err.to_string().contains("failed on element 1"));
        }
    }

    #[test]
    fn rerun_produces_identical_results() {
        let items = vec![labeled("a.png"), labeled("b.png")];
        let mut pipeline = Pipeline::new(
            Some((
                "vec-source".to_string(),
                Box::new(VecSource::new(items.clone())),
            )),
            Vec::new(),
            None,
        );
        let first = pipeline.load().unwrap();
        let second = pipeline.load().unwrap();
        assert_eq!(first, items);
        assert_eq!(second, items);
    }
}
