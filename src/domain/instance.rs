//! Instance types: one `(data, annotations)` record per domain, plus the
//! closed [`Instance`] enum that flows through pipelines.

use serde::{Deserialize, Serialize};

use super::bbox::BBox;
use super::data::{AudioInfo, ImageInfo};
use super::Domain;

/// A single located, labeled object in an image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocatedObject {
    /// Class label (e.g., "person", "car").
    pub label: String,

    /// Bounding box in pixel coordinates.
    pub bbox: BBox,

    /// Optional confidence score (e.g., from model predictions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl LocatedObject {
    /// Creates a located object with the given label and box.
    pub fn new(label: impl Into<String>, bbox: BBox) -> Self {
        Self {
            label: label.into(),
            bbox,
            score: None,
        }
    }

    /// Adds a confidence score.
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }
}

/// A per-pixel label mask.
///
/// `pixels` holds one byte per pixel in row-major order; the value is an
/// index into `labels`, with 0 reserved for background.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentationMask {
    /// Label table; pixel value N refers to `labels[N - 1]`.
    pub labels: Vec<String>,

    /// Mask dimensions as (width, height).
    pub size: (u32, u32),

    /// Row-major label indices, one byte per pixel.
    pub pixels: Vec<u8>,
}

impl SegmentationMask {
    /// Creates an all-background mask of the given size.
    pub fn empty(labels: Vec<String>, width: u32, height: u32) -> Self {
        Self {
            labels,
            size: (width, height),
            pixels: vec![0; (width as usize) * (height as usize)],
        }
    }

    /// Returns true if no pixel is labeled.
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|&p| p == 0)
    }
}

/// An image with located, labeled objects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectDetectionInstance {
    pub image: ImageInfo,
    /// `None` for a negative example; an empty list counts as negative too.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<LocatedObject>>,
}

/// An image with a single class label.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassificationInstance {
    pub image: ImageInfo,
    /// `None` for an unlabeled (negative) example.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// An image with a per-pixel label mask.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentationInstance {
    pub image: ImageInfo,
    /// `None` for a negative example; an all-zero mask counts as negative too.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<SegmentationMask>,
}

/// An audio clip with a transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeechInstance {
    pub audio: AudioInfo,
    /// `None` for an untranscribed (negative) example.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

/// One record flowing through a pipeline.
///
/// The enum is closed: every supported domain has exactly one variant, so
/// stages dispatch over instances exhaustively instead of inspecting
/// runtime types.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", rename_all = "kebab-case")]
pub enum Instance {
    ObjectDetection(ObjectDetectionInstance),
    Classification(ClassificationInstance),
    Segmentation(SegmentationInstance),
    Speech(SpeechInstance),
}

impl Instance {
    /// The domain this instance belongs to.
    pub fn domain(&self) -> Domain {
        match self {
            Instance::ObjectDetection(_) => Domain::ObjectDetection,
            Instance::Classification(_) => Domain::Classification,
            Instance::Segmentation(_) => Domain::Segmentation,
            Instance::Speech(_) => Domain::Speech,
        }
    }

    /// The filename of the underlying data record.
    pub fn file_name(&self) -> &str {
        match self {
            Instance::ObjectDetection(inst) => &inst.image.file_name,
            Instance::Classification(inst) => &inst.image.file_name,
            Instance::Segmentation(inst) => &inst.image.file_name,
            Instance::Speech(inst) => &inst.audio.file_name,
        }
    }

    /// Returns true if this instance carries no annotation.
    ///
    /// Absent annotations are always negative; so are an empty object
    /// list, an all-background mask, and an empty transcript.
    pub fn is_negative(&self) -> bool {
        match self {
            Instance::ObjectDetection(inst) => {
                inst.objects.as_ref().is_none_or(|objs| objs.is_empty())
            }
            Instance::Classification(inst) => inst.label.is_none(),
            Instance::Segmentation(inst) => {
                inst.mask.as_ref().is_none_or(SegmentationMask::is_blank)
            }
            Instance::Speech(inst) => {
                inst.transcript.as_ref().is_none_or(|t| t.is_empty())
            }
        }
    }
}
