//! The image synthesizer seam.
//!
//! The studio never talks to a model directly. It builds a
//! [`SynthesisRequest`] and hands it to whatever [`Synthesizer`] was injected
//! at startup: the candle SD-Turbo pipeline in production, a
//! [`FakeSynthesizer`](crate::fakes::FakeSynthesizer) in tests.

use image::RgbImage;

use crate::error::SynthesisError;
use crate::noise::NoiseTensor;

/// What decides the output size of a synthesis call.
///
/// Fixed noise always wins: its latent shape fixes the image size, so no
/// separate width/height can disagree with it.
#[derive(Debug, Clone, Copy)]
pub enum SpatialSource<'a> {
    Noise(&'a NoiseTensor),
    Dimensions { width: u32, height: u32 },
}

/// A single text-to-image request.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisRequest<'a> {
    pub prompt: &'a str,
    pub negative_prompt: &'a str,
    pub steps: usize,
    pub guidance_scale: f64,
    pub source: SpatialSource<'a>,
}

impl SynthesisRequest<'_> {
    /// Pixel size of the image this request produces, as (width, height).
    pub fn output_size(&self) -> (u32, u32) {
        match self.source {
            SpatialSource::Noise(noise) => noise.shape().image_size(),
            SpatialSource::Dimensions { width, height } => (width, height),
        }
    }
}

/// Text-to-image backend.
///
/// Implementations must be deterministic for identical
/// (prompt, negative prompt, steps, guidance, fixed noise); the multi-view
/// workflow relies on it. Failures are returned, never papered over with a
/// placeholder image.
pub trait Synthesizer {
    /// Channel count of the initial latent noise the model expects.
    fn latent_channels(&self) -> usize;

    fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<RgbImage, SynthesisError>;
}

impl<S: Synthesizer + ?Sized> Synthesizer for Box<S> {
    fn latent_channels(&self) -> usize {
        (**self).latent_channels()
    }

    fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<RgbImage, SynthesisError> {
        (**self).synthesize(request)
    }
}
