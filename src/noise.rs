//! Seeded initial noise shared by every view of one design.
//!
//! Seed selection and sampling are kept apart: [`resolve_seed`] turns an
//! optional caller seed into the seed actually used, [`sample_noise`] draws a
//! standard normal tensor from it. Sampling happens on the host with a
//! seeded [`StdRng`], so a given seed yields the same tensor bits on every
//! run of the same build. The synthesized images are not guaranteed to
//! match across devices or precisions (CPU vs CUDA, f32 vs f16).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use tracing::debug;

use crate::error::{StudioError, StudioResult};

/// Largest accepted seed (2^31 - 1).
pub const MAX_SEED: u32 = i32::MAX as u32;

/// Spatial downscale factor between pixels and latents.
pub const LATENT_SCALE: u32 = 8;

/// Shape of a single-batch latent tensor: (channels, height / 8, width / 8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatentShape {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl LatentShape {
    /// Latent shape for an image of `width`x`height` pixels.
    pub fn for_image(channels: usize, width: u32, height: u32) -> Self {
        Self {
            channels,
            height: (height / LATENT_SCALE) as usize,
            width: (width / LATENT_SCALE) as usize,
        }
    }

    pub fn elem_count(&self) -> usize {
        self.channels * self.height * self.width
    }

    /// Pixel size of the image this latent decodes to, as (width, height).
    pub fn image_size(&self) -> (u32, u32) {
        (
            self.width as u32 * LATENT_SCALE,
            self.height as u32 * LATENT_SCALE,
        )
    }
}

/// Host-side noise buffer in channel-major (C, H, W) order.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseTensor {
    shape: LatentShape,
    data: Vec<f32>,
}

impl NoiseTensor {
    pub fn shape(&self) -> LatentShape {
        self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// Noise tensor together with the seed that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct SeededNoise {
    pub seed: u32,
    pub tensor: NoiseTensor,
}

/// Pick the seed to use: the caller's if given (range checked), a random
/// one in `0..=MAX_SEED` otherwise.
pub fn resolve_seed(seed: Option<u64>) -> StudioResult<u32> {
    match seed {
        Some(seed) if seed > u64::from(MAX_SEED) => Err(StudioError::InvalidSeed {
            seed,
            max: MAX_SEED,
        }),
        Some(seed) => Ok(seed as u32),
        None => Ok(rand::thread_rng().gen_range(0..=MAX_SEED)),
    }
}

/// Draw an i.i.d. standard normal tensor of `shape` from `seed`.
pub fn sample_noise(seed: u32, shape: LatentShape) -> NoiseTensor {
    let mut rng = StdRng::seed_from_u64(u64::from(seed));
    let data = (0..shape.elem_count())
        .map(|_| rng.sample::<f32, _>(StandardNormal))
        .collect();
    NoiseTensor { shape, data }
}

/// Resolve the seed and sample noise for a `width`x`height` image.
pub fn make_shared_noise(
    channels: usize,
    width: u32,
    height: u32,
    seed: Option<u64>,
) -> StudioResult<SeededNoise> {
    let seed = resolve_seed(seed)?;
    let shape = LatentShape::for_image(channels, width, height);
    debug!(
        seed = seed,
        channels = shape.channels,
        latent = format!("{}x{}", shape.width, shape.height),
        "Sampling shared noise"
    );
    Ok(SeededNoise {
        seed,
        tensor: sample_noise(seed, shape),
    })
}
