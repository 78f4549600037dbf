//! In-process fake synthesizer (tests and dry runs)
//!
//! `FakeSynthesizer` satisfies the [`Synthesizer`] contract without loading
//! any model: the output is a flat image whose pixels are derived from the
//! prompt text and the noise bits, so identical requests give identical
//! images and different views give different ones.

use std::cell::{Cell, RefCell};

use image::{Rgb, RgbImage};

use crate::error::SynthesisError;
use crate::noise::{make_shared_noise, NoiseTensor};
use crate::synth::{SpatialSource, SynthesisRequest, Synthesizer};

/// Deterministic stand-in for a real diffusion model.
#[derive(Debug, Default)]
pub struct FakeSynthesizer {
    calls: Cell<usize>,
    prompts: RefCell<Vec<String>>,
    fail_with: RefCell<Option<String>>,
}

impl FakeSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with `ModelUnavailable(reason)`.
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.fail_with.borrow_mut() = Some(reason.into());
    }

    /// Number of synthesize calls so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl Synthesizer for FakeSynthesizer {
    fn latent_channels(&self) -> usize {
        4
    }

    fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<RgbImage, SynthesisError> {
        self.calls.set(self.calls.get() + 1);
        self.prompts.borrow_mut().push(request.prompt.to_string());

        if let Some(reason) = self.fail_with.borrow().as_ref() {
            return Err(SynthesisError::ModelUnavailable(reason.clone()));
        }

        let owned;
        let noise: &NoiseTensor = match request.source {
            SpatialSource::Noise(noise) => noise,
            SpatialSource::Dimensions { width, height } => {
                owned = make_shared_noise(self.latent_channels(), width, height, None)
                    .map_err(|e| SynthesisError::Backend(e.into()))?
                    .tensor;
                &owned
            }
        };

        let mut hash = fnv1a(FNV_OFFSET, request.prompt.as_bytes());
        hash = fnv1a(hash, request.negative_prompt.as_bytes());
        hash = fnv1a(hash, &(request.steps as u64).to_le_bytes());
        hash = fnv1a(hash, &request.guidance_scale.to_bits().to_le_bytes());
        for value in noise.data() {
            hash = fnv1a(hash, &value.to_bits().to_le_bytes());
        }

        let (width, height) = noise.shape().image_size();
        let [r, g, b, ..] = hash.to_le_bytes();
        Ok(RgbImage::from_pixel(width, height, Rgb([r, g, b])))
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;

fn fnv1a(mut hash: u64, bytes: &[u8]) -> u64 {
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}
