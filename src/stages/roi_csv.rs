//! ROI CSV format stages (object detection).
//!
//! # ROI CSV Format Reference
//!
//! One row per located object, pixel coordinates:
//!
//! ```text
//! filename,xmin,ymin,xmax,ymax,label,score
//! ```
//!
//! The `score` column is optional. Rows are grouped by filename in order
//! of first appearance: one pipeline instance per distinct filename, with
//! its rows in file order. A separate newline-delimited list of filenames
//! (`--negatives-from`) can supply negative examples, since a CSV of boxes
//! has no way to mention an image with nothing in it.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::domain::{
    BBox, Domain, ImageInfo, Instance, LocatedObject, ObjectDetectionInstance,
};
use crate::error::AnnopipeError;
use crate::registry::{StageInstance, StageKind, StageSpecifier};
use crate::stream::{Sink, Source, StageOutput};

use super::parse_stage_options;

/// A single row in the ROI CSV format.
#[derive(Debug, Serialize, Deserialize)]
struct RoiRow {
    filename: String,
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
    label: String,
    // Serialized as an empty field when absent; csv needs every row to
    // carry the same number of columns.
    #[serde(default)]
    score: Option<f64>,
}

// ============================================================================
// Reader
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "from-roi-csv", disable_help_flag = true)]
struct FromRoiCsvOptions {
    /// ROI CSV files to read, in order.
    #[arg(short, long, required = true, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Optional newline-delimited list of image filenames to emit as
    /// negative examples after the annotated ones.
    #[arg(long)]
    negatives_from: Option<PathBuf>,
}

/// Source reading ROI CSV files into object-detection instances.
pub struct FromRoiCsv {
    inputs: Vec<PathBuf>,
    negatives_from: Option<PathBuf>,
}

impl FromRoiCsv {
    pub fn new(inputs: Vec<PathBuf>, negatives_from: Option<PathBuf>) -> Self {
        Self {
            inputs,
            negatives_from,
        }
    }

    fn read_file(
        &self,
        path: &PathBuf,
        out: &mut StageOutput<'_>,
    ) -> Result<(), AnnopipeError> {
        let file = File::open(path)?;
        let mut reader = csv::Reader::from_reader(BufReader::new(file));

        // Group rows by filename, preserving first-appearance order.
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<LocatedObject>> = HashMap::new();
        for result in reader.deserialize() {
            let row: RoiRow = result?;
            let object = LocatedObject {
                label: row.label,
                bbox: BBox::from_xyxy(row.xmin, row.ymin, row.xmax, row.ymax),
                score: row.score,
            };
            if !groups.contains_key(&row.filename) {
                order.push(row.filename.clone());
            }
            groups.entry(row.filename).or_default().push(object);
        }

        for filename in order {
            let objects = groups.remove(&filename).unwrap_or_default();
            out.then(Instance::ObjectDetection(ObjectDetectionInstance {
                image: ImageInfo::new(filename),
                objects: Some(objects),
            }))?;
        }
        Ok(())
    }
}

impl Source for FromRoiCsv {
    fn produce(&mut self, out: &mut StageOutput<'_>) -> Result<(), AnnopipeError> {
        for path in &self.inputs {
            self.read_file(path, out)?;
        }
        if let Some(list) = &self.negatives_from {
            let file = File::open(list)?;
            for line in BufReader::new(file).lines() {
                let filename = line?;
                if filename.trim().is_empty() {
                    continue;
                }
                out.then(Instance::ObjectDetection(ObjectDetectionInstance {
                    image: ImageInfo::new(filename.trim()),
                    objects: None,
                }))?;
            }
        }
        out.done()
    }
}

/// Specifier for `from-roi-csv`.
pub struct FromRoiCsvSpecifier;

impl StageSpecifier for FromRoiCsvSpecifier {
    fn name(&self) -> &'static str {
        "from-roi-csv"
    }

    fn description(&self) -> &'static str {
        "reads object-detection instances from ROI CSV files"
    }

    fn kind(&self) -> StageKind {
        StageKind::Source
    }

    fn domain(&self) -> Option<Domain> {
        Some(Domain::ObjectDetection)
    }

    fn instantiate(
        &self,
        options: &[String],
        _config: &PipelineConfig,
    ) -> Result<StageInstance, AnnopipeError> {
        let opts: FromRoiCsvOptions = parse_stage_options(self.name(), options)?;
        Ok(StageInstance::Source(Box::new(FromRoiCsv::new(
            opts.input,
            opts.negatives_from,
        ))))
    }
}

// ============================================================================
// Writer
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "to-roi-csv", disable_help_flag = true)]
struct ToRoiCsvOptions {
    /// Output CSV file.
    #[arg(short, long)]
    output: PathBuf,
}

/// Sink writing object-detection instances as one ROI CSV file.
///
/// Rows appear in stream order; negative instances contribute no rows.
pub struct ToRoiCsv {
    output: PathBuf,
    writer: Option<csv::Writer<BufWriter<File>>>,
}

impl ToRoiCsv {
    pub fn new(output: PathBuf) -> Self {
        Self {
            output,
            writer: None,
        }
    }
}

impl Sink for ToRoiCsv {
    fn start(&mut self) -> Result<(), AnnopipeError> {
        let file = File::create(&self.output)?;
        self.writer = Some(csv::Writer::from_writer(BufWriter::new(file)));
        Ok(())
    }

    fn consume_element(&mut self, element: Instance) -> Result<(), AnnopipeError> {
        let Instance::ObjectDetection(inst) = element else {
            // Unreachable behind the inline validators; surface it anyway.
            return Err(AnnopipeError::Data {
                path: self.output.clone(),
                message: "to-roi-csv received a non-object-detection instance".to_string(),
            });
        };
        let Some(writer) = self.writer.as_mut() else {
            return Err(AnnopipeError::Data {
                path: self.output.clone(),
                message: "to-roi-csv consumed an element before start()".to_string(),
            });
        };
        for object in inst.objects.unwrap_or_default() {
            writer.serialize(RoiRow {
                filename: inst.image.file_name.clone(),
                xmin: object.bbox.xmin,
                ymin: object.bbox.ymin,
                xmax: object.bbox.xmax,
                ymax: object.bbox.ymax,
                label: object.label,
                score: object.score,
            })?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), AnnopipeError> {
        if let Some(writer) = self.writer.take() {
            writer
                .into_inner()
                .map_err(|e| AnnopipeError::Io(e.into_error()))?
                .into_inner()
                .map_err(|e| AnnopipeError::Io(e.into_error()))?;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.writer = None;
    }
}

/// Specifier for `to-roi-csv`.
pub struct ToRoiCsvSpecifier;

impl StageSpecifier for ToRoiCsvSpecifier {
    fn name(&self) -> &'static str {
        "to-roi-csv"
    }

    fn description(&self) -> &'static str {
        "writes object-detection instances to one ROI CSV file"
    }

    fn kind(&self) -> StageKind {
        StageKind::Sink
    }

    fn domain(&self) -> Option<Domain> {
        Some(Domain::ObjectDetection)
    }

    fn instantiate(
        &self,
        options: &[String],
        _config: &PipelineConfig,
    ) -> Result<StageInstance, AnnopipeError> {
        let opts: ToRoiCsvOptions = parse_stage_options(self.name(), options)?;
        Ok(StageInstance::Sink(Box::new(ToRoiCsv::new(opts.output))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::bind_sink;
    use crate::stream::util::CollectSink;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn produce_all(source: &mut FromRoiCsv) -> Vec<Instance> {
        let mut sink = CollectSink::new();
        {
            let mut out = StageOutput::new("from-roi-csv", bind_sink(&mut sink));
            source.produce(&mut out).unwrap();
            out.ensure_done().unwrap();
        }
        sink.into_items()
    }

    #[test]
    fn groups_rows_by_filename_in_first_appearance_order() {
        let csv = write_temp(
            "filename,xmin,ymin,xmax,ymax,label,score\n\
             b.png,0,0,10,10,cat,\n\
             a.png,1,1,5,5,dog,0.9\n\
             b.png,2,2,8,8,cat,\n",
        );
        let mut source = FromRoiCsv::new(vec![csv.path().to_path_buf()], None);
        let instances = produce_all(&mut source);

        let names: Vec<_> = instances.iter().map(|i| i.file_name()).collect();
        assert_eq!(names, ["b.png", "a.png"]);

        let Instance::ObjectDetection(first) = &instances[0] else {
            panic!("wrong domain");
        };
        assert_eq!(first.objects.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn negatives_list_emits_unannotated_instances() {
        let csv = write_temp("filename,xmin,ymin,xmax,ymax,label,score\n");
        let negatives = write_temp("empty1.png\n\nempty2.png\n");
        let mut source = FromRoiCsv::new(
            vec![csv.path().to_path_buf()],
            Some(negatives.path().to_path_buf()),
        );
        let instances = produce_all(&mut source);
        assert_eq!(instances.len(), 2);
        assert!(instances.iter().all(|i| i.is_negative()));
    }

    #[test]
    fn writer_round_trips_annotated_rows() {
        let dir = tempfile::tempdir().unwrap();
        let out_path = dir.path().join("out.csv");

        let mut sink = ToRoiCsv::new(out_path.clone());
        sink.start().unwrap();
        sink.consume_element(Instance::ObjectDetection(ObjectDetectionInstance {
            image: ImageInfo::new("a.png"),
            objects: Some(vec![
                LocatedObject::new("cat", BBox::from_xyxy(0.0, 0.0, 10.0, 10.0)),
            ]),
        }))
        .unwrap();
        sink.consume_element(Instance::ObjectDetection(ObjectDetectionInstance {
            image: ImageInfo::new("empty.png"),
            objects: None,
        }))
        .unwrap();
        sink.finish().unwrap();

        let mut source = FromRoiCsv::new(vec![out_path], None);
        let instances = produce_all(&mut source);
        // The negative contributed no rows, so only a.png comes back.
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].file_name(), "a.png");
        assert!(!instances[0].is_negative());
    }
}
