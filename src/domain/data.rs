//! Data records: the image/audio half of an instance.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Image file formats the built-in stages can read and write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpg,
    Bmp,
}

impl ImageFormat {
    /// The canonical file extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpg => "jpg",
            ImageFormat::Bmp => "bmp",
        }
    }

    /// Maps a file extension to a format, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpg),
            "bmp" => Some(ImageFormat::Bmp),
            _ => None,
        }
    }

    /// Infers the format from a file path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| format!("unknown image format '{}'", s))
    }
}

/// A reference to an image, with optional in-memory payload and metadata.
///
/// File stages typically populate `file_name` plus whatever they can learn
/// cheaply (`size` from a header probe, `data` if the bytes were read
/// anyway); downstream stages fall back to the original file on disk when
/// `data` is absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// Filename or path of the image.
    pub file_name: String,

    /// Raw encoded bytes, if already loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,

    /// Decoded (width, height) in pixels, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<(u32, u32)>,

    /// The encoding of `data`, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ImageFormat>,
}

impl ImageInfo {
    /// Creates an image record referencing a file by name only.
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Default::default()
        }
    }

    /// Sets the decoded dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = Some((width, height));
        self
    }

    /// Sets the raw bytes and their format.
    pub fn with_data(mut self, data: Vec<u8>, format: Option<ImageFormat>) -> Self {
        self.data = Some(data);
        self.format = format;
        self
    }
}

/// A reference to an audio clip, with optional in-memory payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioInfo {
    /// Filename or path of the clip.
    pub file_name: String,

    /// Raw encoded bytes, if already loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
}

impl AudioInfo {
    /// Creates an audio record referencing a file by name only.
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            data: None,
        }
    }
}
