//! Sub-directory classification layout stages.
//!
//! The layout maps one first-level subdirectory per label:
//!
//! ```text
//! dataset/
//!   cat/ img1.png img2.png
//!   dog/ img3.png
//!   stray.png          <- top-level files are unlabeled (negative)
//! ```
//!
//! The reader walks the tree with `walkdir` in filename order for
//! deterministic output and probes image dimensions with `imagesize`
//! (a header read, not a full decode). The writer recreates the layout,
//! copying source files or dumping in-memory bytes, with negatives going
//! into a configurable unlabeled directory.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use walkdir::WalkDir;

use crate::config::PipelineConfig;
use crate::domain::{ClassificationInstance, Domain, ImageFormat, ImageInfo, Instance};
use crate::error::AnnopipeError;
use crate::registry::{StageInstance, StageKind, StageSpecifier};
use crate::stream::{ProcessState, Sink, Source, StageOutput};

use super::parse_stage_options;

// ============================================================================
// Reader
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "from-subdir", disable_help_flag = true)]
struct FromSubdirOptions {
    /// Root directory of the labeled layout.
    #[arg(short, long)]
    input: PathBuf,
}

/// Source reading a label-per-subdirectory image layout.
pub struct FromSubdir {
    root: PathBuf,
}

impl FromSubdir {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The label for a file under the root: the first path component, or
    /// `None` for a top-level (unlabeled) file.
    fn label_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut components = relative.components();
        let first = components.next()?;
        // A lone component is the filename itself: top-level, no label.
        components.next()?;
        Some(first.as_os_str().to_string_lossy().into_owned())
    }
}

impl Source for FromSubdir {
    fn produce(&mut self, out: &mut StageOutput<'_>) -> Result<(), AnnopipeError> {
        for entry in WalkDir::new(&self.root)
            .max_depth(2)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| AnnopipeError::Data {
                path: self.root.clone(),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if ImageFormat::from_path(path).is_none() {
                continue;
            }

            let mut image = ImageInfo::new(path.to_string_lossy().into_owned());
            image.format = ImageFormat::from_path(path);
            if let Ok(dims) = imagesize::size(path) {
                image.size = Some((dims.width as u32, dims.height as u32));
            }

            out.then(Instance::Classification(ClassificationInstance {
                image,
                label: self.label_for(path),
            }))?;
        }
        out.done()
    }
}

/// Specifier for `from-subdir`.
pub struct FromSubdirSpecifier;

impl StageSpecifier for FromSubdirSpecifier {
    fn name(&self) -> &'static str {
        "from-subdir"
    }

    fn description(&self) -> &'static str {
        "reads classification instances from a label-per-subdirectory layout"
    }

    fn kind(&self) -> StageKind {
        StageKind::Source
    }

    fn domain(&self) -> Option<Domain> {
        Some(Domain::Classification)
    }

    fn instantiate(
        &self,
        options: &[String],
        _config: &PipelineConfig,
    ) -> Result<StageInstance, AnnopipeError> {
        let opts: FromSubdirOptions = parse_stage_options(self.name(), options)?;
        Ok(StageInstance::Source(Box::new(FromSubdir::new(opts.input))))
    }
}

// ============================================================================
// Writer
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "to-subdir", disable_help_flag = true)]
struct ToSubdirOptions {
    /// Root directory to write the layout into.
    #[arg(short, long)]
    output: PathBuf,

    /// Directory name for unlabeled (negative) instances.
    #[arg(long, default_value = "unlabelled")]
    unlabelled: String,
}

/// Sink writing classification instances as a label-per-subdirectory layout.
pub struct ToSubdir {
    root: PathBuf,
    unlabelled: String,
    default_format: ImageFormat,
    /// Target paths written this run, for duplicate detection.
    written: ProcessState<HashSet<PathBuf>>,
}

impl ToSubdir {
    pub fn new(root: PathBuf, unlabelled: String, default_format: ImageFormat) -> Self {
        Self {
            root,
            unlabelled,
            default_format,
            written: ProcessState::new(),
        }
    }

    fn target_path(&self, inst: &ClassificationInstance) -> PathBuf {
        let source = Path::new(&inst.image.file_name);
        let mut file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| inst.image.file_name.clone());
        // In-memory bytes of unknown encoding get the configured extension.
        if inst.image.data.is_some() && ImageFormat::from_path(source).is_none() {
            file_name = format!(
                "{}.{}",
                file_name,
                inst.image.format.unwrap_or(self.default_format).extension()
            );
        }
        let label_dir = inst.label.as_deref().unwrap_or(&self.unlabelled);
        self.root.join(label_dir).join(file_name)
    }
}

impl Sink for ToSubdir {
    fn consume_element(&mut self, element: Instance) -> Result<(), AnnopipeError> {
        let Instance::Classification(inst) = element else {
            return Err(AnnopipeError::Data {
                path: self.root.clone(),
                message: "to-subdir received a non-classification instance".to_string(),
            });
        };

        let target = self.target_path(&inst);
        let written = self.written.get_or_init(HashSet::new);
        if !written.insert(target.clone()) {
            return Err(AnnopipeError::Data {
                path: target,
                message: "duplicate output filename".to_string(),
            });
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        match &inst.image.data {
            Some(bytes) => fs::write(&target, bytes)?,
            None => {
                fs::copy(&inst.image.file_name, &target)?;
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.written.reset();
    }
}

/// Specifier for `to-subdir`.
pub struct ToSubdirSpecifier;

impl StageSpecifier for ToSubdirSpecifier {
    fn name(&self) -> &'static str {
        "to-subdir"
    }

    fn description(&self) -> &'static str {
        "writes classification instances into a label-per-subdirectory layout"
    }

    fn kind(&self) -> StageKind {
        StageKind::Sink
    }

    fn domain(&self) -> Option<Domain> {
        Some(Domain::Classification)
    }

    fn instantiate(
        &self,
        options: &[String],
        config: &PipelineConfig,
    ) -> Result<StageInstance, AnnopipeError> {
        let opts: ToSubdirOptions = parse_stage_options(self.name(), options)?;
        Ok(StageInstance::Sink(Box::new(ToSubdir::new(
            opts.output,
            opts.unlabelled,
            config.preferred_format(),
        ))))
    }
}
