//! Error types for the sketch studio.

use crate::view::ViewKey;

/// Failures reported by an image synthesizer backend.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("out of memory while synthesizing: {0}")]
    OutOfMemory(String),

    #[error("synthesis failed: {0}")]
    Backend(#[source] anyhow::Error),
}

impl From<candle_core::Error> for SynthesisError {
    fn from(err: candle_core::Error) -> Self {
        let message = err.to_string();
        if message.contains("out of memory") || message.contains("OUT_OF_MEMORY") {
            Self::OutOfMemory(message)
        } else {
            Self::Backend(err.into())
        }
    }
}

/// Errors surfaced to the calling boundary (CLI or any other front end).
#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    #[error("unknown view `{0}` (expected one of top, left, right, back, sole)")]
    InvalidView(String),

    #[error("seed {seed} is out of range (0..={max})")]
    InvalidSeed { seed: u64, max: u32 },

    #[error("invalid size {width}x{height}: both sides must be positive multiples of 8")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("no anchor view yet: generate the {} view first", ViewKey::ANCHOR.label())]
    RequiresAnchor,

    #[error("select at least one view other than {}", ViewKey::ANCHOR.label())]
    NoViewsSelected,

    #[error("no images to compose")]
    NoImages,

    #[error(
        "image for {view} is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}"
    )]
    ShapeMismatch {
        view: ViewKey,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error("failed to write {path}: {source}")]
    Output {
        path: std::path::PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for studio operations.
pub type StudioResult<T> = std::result::Result<T, StudioError>;
