//! Criterion microbenches for the annopipe stream core.
//!
//! Run with: `cargo bench`
//!
//! These benchmarks measure:
//! - raw element throughput through the handler chain (passthrough stages)
//! - a buffering stage holding and replaying the full stream
//! - ROI CSV parsing into object-detection instances

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

use annopipe::domain::{
    BBox, ClassificationInstance, ImageInfo, Instance, LocatedObject, ObjectDetectionInstance,
};
use annopipe::pipeline::Pipeline;
use annopipe::stream::util::{Buffer, CollectSink, VecSource};
use annopipe::stream::{bind_processor, bind_sink, Processor, Source, StageOutput};

const STREAM_LEN: usize = 1_000;

// Small inline ROI CSV (fixtures live with the tests; benches stay self-contained)
const ROI_FIXTURE: &str = "filename,xmin,ymin,xmax,ymax,label,score
image001.jpg,10,20,50,80,person,
image001.jpg,30,10,70,40,car,0.92
image002.jpg,20,30,60,90,dog,
image002.jpg,10,10,40,50,cat,0.55
image003.jpg,0,0,30,60,person,
";

fn classified_stream(len: usize) -> Vec<Instance> {
    (0..len)
        .map(|i| {
            Instance::Classification(ClassificationInstance {
                image: ImageInfo::new(format!("img{i:05}.png")),
                label: Some("cat".to_string()),
            })
        })
        .collect()
}

fn detection_stream(len: usize) -> Vec<Instance> {
    (0..len)
        .map(|i| {
            Instance::ObjectDetection(ObjectDetectionInstance {
                image: ImageInfo::new(format!("img{i:05}.png")),
                objects: Some(vec![LocatedObject::new(
                    "person",
                    BBox::from_xyxy(0.0, 0.0, 32.0, 32.0),
                )]),
            })
        })
        .collect()
}

struct Identity;

impl Processor for Identity {
    fn process_element(
        &mut self,
        element: Instance,
        out: &mut StageOutput<'_>,
    ) -> Result<(), annopipe::AnnopipeError> {
        out.then(element)
    }
}

/// Throughput of a bare source -> sink run, no processors.
fn bench_passthrough_chain(c: &mut Criterion) {
    let items = classified_stream(STREAM_LEN);
    let mut group = c.benchmark_group("stream_core");
    group.throughput(Throughput::Elements(STREAM_LEN as u64));

    group.bench_function("source_to_sink", |b| {
        b.iter(|| {
            let mut pipeline = Pipeline::empty();
            let mut source = VecSource::new(items.clone());
            let mut sink = CollectSink::new();
            pipeline
                .process_with(Some(&mut source), Some(&mut sink))
                .unwrap();
            black_box(sink)
        })
    });

    group.bench_function("three_identity_stages", |b| {
        b.iter(|| {
            let mut source = VecSource::new(items.clone());
            let mut first = Identity;
            let mut second = Identity;
            let mut third = Identity;
            let mut sink = CollectSink::new();
            {
                let handler = bind_sink(&mut sink);
                let handler = bind_processor("third", &mut third, handler);
                let handler = bind_processor("second", &mut second, handler);
                let handler = bind_processor("first", &mut first, handler);
                let mut out = StageOutput::new("vec-source", handler);
                source.produce(&mut out).unwrap();
                out.ensure_done().unwrap();
            }
            black_box(sink)
        })
    });

    group.finish();
}

/// Cost of accumulating the whole stream before replaying it.
fn bench_buffering_stage(c: &mut Criterion) {
    let items = detection_stream(STREAM_LEN);
    let mut group = c.benchmark_group("stream_core");
    group.throughput(Throughput::Elements(STREAM_LEN as u64));

    group.bench_function("buffer_and_replay", |b| {
        b.iter(|| {
            let mut source = VecSource::new(items.clone());
            let mut buffer = Buffer::new();
            let mut sink = CollectSink::new();
            {
                let handler = bind_processor("buffer", &mut buffer, bind_sink(&mut sink));
                let mut out = StageOutput::new("vec-source", handler);
                source.produce(&mut out).unwrap();
                out.ensure_done().unwrap();
            }
            black_box(sink)
        })
    });

    group.finish();
}

/// ROI CSV parsing into grouped detection instances.
fn bench_roi_csv_parse(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench.csv");
    std::fs::write(&path, ROI_FIXTURE).unwrap();

    let mut group = c.benchmark_group("roi_csv");
    group.throughput(Throughput::Bytes(ROI_FIXTURE.len() as u64));

    group.bench_function("parse_grouped", |b| {
        b.iter(|| {
            let mut source = annopipe::stages::roi_csv::FromRoiCsv::new(vec![path.clone()], None);
            let mut sink = CollectSink::new();
            {
                let mut out = StageOutput::new("from-roi-csv", bind_sink(&mut sink));
                source.produce(&mut out).unwrap();
                out.ensure_done().unwrap();
            }
            black_box(sink)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_passthrough_chain,
    bench_buffering_stage,
    bench_roi_csv_parse
);
criterion_main!(benches);
