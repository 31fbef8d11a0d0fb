//! Pipeline-wide configuration.
//!
//! An explicit value threaded from the CLI through the builder into each
//! stage's constructor. There is deliberately no process-wide settings
//! singleton: two pipelines built in the same process can use different
//! configurations.

use crate::domain::ImageFormat;

/// Configuration shared by the stages of one pipeline.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Image formats in order of preference, used by writer stages when an
    /// image's own format is unknown.
    pub image_format_preference: Vec<ImageFormat>,
}

impl PipelineConfig {
    /// The first preferred image format.
    pub fn preferred_format(&self) -> ImageFormat {
        self.image_format_preference
            .first()
            .copied()
            .unwrap_or(ImageFormat::Png)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            image_format_preference: vec![ImageFormat::Png, ImageFormat::Jpg, ImageFormat::Bmp],
        }
    }
}
