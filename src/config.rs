//! Studio configuration: where outputs and model weights live.

use std::path::{Path, PathBuf};

use image::Rgb;

use crate::compose::ComposeOptions;

/// Local directory searched first for the SD-Turbo bundle.
pub const DEFAULT_MODEL_DIR: &str = "models/sd-turbo";

/// HuggingFace Hub repository used when the local bundle cannot be loaded.
pub const DEFAULT_MODEL_ID: &str = "stabilityai/sd-turbo";

pub const PREVIEW_FILE_NAME: &str = "shoe_RIGHT_preview.png";
pub const COMPOSITE_FILE_NAME: &str = "shoe_COMPOSITE.png";

#[derive(Debug, Clone)]
pub struct StudioConfig {
    /// Directory both output images are written to (created on demand).
    pub output_dir: PathBuf,
    pub model_dir: PathBuf,
    pub model_id: String,
    pub padding: u32,
    pub background: Rgb<u8>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("outputs"),
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            model_id: DEFAULT_MODEL_ID.to_string(),
            padding: 12,
            background: Rgb([255, 255, 255]),
        }
    }
}

impl StudioConfig {
    pub fn with_output_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Anchor preview path; overwritten on every anchor generation.
    pub fn preview_path(&self) -> PathBuf {
        self.output_dir.join(PREVIEW_FILE_NAME)
    }

    /// Composite path; overwritten on every confirm.
    pub fn composite_path(&self) -> PathBuf {
        self.output_dir.join(COMPOSITE_FILE_NAME)
    }

    /// Composer options for a composite with the given layout.
    pub fn compose_options(&self, layout: crate::compose::Layout) -> ComposeOptions {
        ComposeOptions {
            layout,
            show_labels: true,
            padding: self.padding,
            background: self.background,
        }
    }
}
