//! SD-Turbo text-to-image pipeline on candle
//!
//! This module implements [`Synthesizer`] for the real model:
//! 1. Encode prompt (and negative prompt when guidance is on) with CLIP
//! 2. Denoise the initial latents with the UNet and a DDIM schedule
//! 3. VAE decode to RGB
//!
//! Initial latents come from the request's fixed noise when present, which
//! is what lets sibling views share the anchor's structure.

use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use candle_transformers::models::stable_diffusion::{
    ddim::DDIMSchedulerConfig,
    schedulers::{PredictionType, Scheduler, SchedulerConfig, TimestepSpacing},
    unet_2d::UNet2DConditionModel,
    StableDiffusionConfig,
};
use image::RgbImage;
use tracing::{debug, info, warn};

use crate::config::StudioConfig;
use crate::download::{ModelDownloader, ModelPaths};
use crate::error::SynthesisError;
use crate::models::{tensor_to_rgb, ClipTextEncoder, VaeDecoder};
use crate::noise::{make_shared_noise, NoiseTensor};
use crate::synth::{SpatialSource, SynthesisRequest, Synthesizer};

/// UNet input channels for SD 2.x
pub const LATENT_CHANNELS: usize = 4;

/// diffusers only applies classifier-free guidance above this scale
const GUIDANCE_THRESHOLD: f64 = 1.0;

/// Complete SD-Turbo generation pipeline
pub struct SdTurboPipeline {
    clip: ClipTextEncoder,
    unet: UNet2DConditionModel,
    vae: VaeDecoder,
    scheduler: DDIMSchedulerConfig,
    device: Device,
    dtype: DType,
}

impl SdTurboPipeline {
    /// Create a new pipeline by loading all components
    ///
    /// Half precision on CUDA, f32 elsewhere.
    pub fn load(paths: &ModelPaths, device: Device) -> Result<Self> {
        let dtype = if device.is_cuda() {
            DType::F16
        } else {
            DType::F32
        };
        info!(device = ?device, dtype = ?dtype, "Initializing SD-Turbo pipeline");

        // SD-Turbo shares the SD 2.1 architecture
        let sd_config = StableDiffusionConfig::v2_1(None, None, None);

        let clip = ClipTextEncoder::load(
            &paths.text_encoder,
            &paths.tokenizer_dir,
            &sd_config.clip,
            &device,
            dtype,
        )?;

        info!(path = %paths.unet.display(), "Loading UNet");
        let unet = sd_config.build_unet(&paths.unet, &device, LATENT_CHANNELS, false, dtype)?;
        info!("✓ UNet loaded successfully");

        let vae = VaeDecoder::load(&paths.vae, &sd_config, &device, dtype)?;

        // SD-Turbo is trained for epsilon prediction on trailing timesteps;
        // DDIM with eta = 0 keeps sampling deterministic.
        let scheduler = DDIMSchedulerConfig {
            prediction_type: PredictionType::Epsilon,
            timestep_spacing: TimestepSpacing::Trailing,
            ..Default::default()
        };

        info!("✓ Pipeline initialized successfully");

        Ok(Self {
            clip,
            unet,
            vae,
            scheduler,
            device,
            dtype,
        })
    }

    /// Load from the local bundle, falling back to the hub on any failure.
    ///
    /// This is the only retry in the system and it runs once, at startup.
    pub async fn load_local_or_remote(config: &StudioConfig, device: Device) -> Result<Self> {
        let local = ModelPaths::from_local_dir(&config.model_dir)
            .and_then(|paths| Self::load(&paths, device.clone()));

        match local {
            Ok(pipeline) => {
                info!(path = %config.model_dir.display(), "Using local model bundle");
                Ok(pipeline)
            }
            Err(e) => {
                warn!(
                    path = %config.model_dir.display(),
                    error = %e,
                    "Local model bundle unusable, fetching {}", config.model_id
                );
                let downloader = ModelDownloader::new(config.model_id.as_str())?;
                let paths = downloader.download_all().await?;
                Self::load(&paths, device)
            }
        }
    }

    fn generate(&self, request: &SynthesisRequest<'_>) -> Result<RgbImage, SynthesisError> {
        let (width, height) = request.output_size();
        info!(
            prompt_preview = %request.prompt.chars().take(50).collect::<String>(),
            steps = request.steps,
            size = format!("{}x{}", width, height),
            guidance = request.guidance_scale,
            "Starting generation"
        );

        let latents = match request.source {
            SpatialSource::Noise(noise) => self.noise_to_latents(noise)?,
            SpatialSource::Dimensions { width, height } => {
                let noise = make_shared_noise(LATENT_CHANNELS, width, height, None)
                    .map_err(|e| SynthesisError::Backend(e.into()))?;
                debug!(seed = noise.seed, "Sampled fresh noise");
                self.noise_to_latents(&noise.tensor)?
            }
        };

        // Step 1: Encode prompt(s) with CLIP
        let use_guidance = request.guidance_scale > GUIDANCE_THRESHOLD;
        let context = self.encode_context(request, use_guidance)?;
        debug!(shape = ?context.dims(), "Text context");

        // Step 2: Denoise
        let latents = self.denoise(latents, &context, request.steps, request.guidance_scale, use_guidance)?;
        debug!(shape = ?latents.dims(), "Latents denoised");

        // Step 3: VAE decode
        let decoded = self.vae.decode(&latents)?;
        let rgb = tensor_to_rgb(&decoded)?;

        let image = RgbImage::from_raw(width, height, rgb).ok_or_else(|| {
            SynthesisError::Backend(anyhow::anyhow!(
                "Decoded buffer does not match {}x{}",
                width,
                height
            ))
        })?;

        info!("✓ Generation complete!");
        Ok(image)
    }

    fn noise_to_latents(&self, noise: &NoiseTensor) -> Result<Tensor, SynthesisError> {
        let shape = noise.shape();
        let latents = Tensor::from_slice(
            noise.data(),
            (1, shape.channels, shape.height, shape.width),
            &self.device,
        )?;
        Ok(latents.to_dtype(self.dtype)?)
    }

    /// CLIP context, with the negative prompt stacked first under guidance
    fn encode_context(
        &self,
        request: &SynthesisRequest<'_>,
        use_guidance: bool,
    ) -> Result<Tensor, SynthesisError> {
        let cond = self.clip.encode(request.prompt).map_err(SynthesisError::Backend)?;
        let context = if use_guidance {
            let uncond = self
                .clip
                .encode(request.negative_prompt)
                .map_err(SynthesisError::Backend)?;
            Tensor::cat(&[uncond, cond], 0)?
        } else {
            cond
        };
        Ok(context.to_dtype(self.dtype)?)
    }

    fn denoise(
        &self,
        latents: Tensor,
        context: &Tensor,
        steps: usize,
        guidance_scale: f64,
        use_guidance: bool,
    ) -> Result<Tensor, SynthesisError> {
        let mut scheduler = self.scheduler.build(steps)?;
        let timesteps = scheduler.timesteps().to_vec();
        let mut latents = (latents * scheduler.init_noise_sigma())?;

        let total_steps = timesteps.len();
        for (i, &timestep) in timesteps.iter().enumerate() {
            let model_input = if use_guidance {
                Tensor::cat(&[&latents, &latents], 0)?
            } else {
                latents.clone()
            };
            let model_input = scheduler.scale_model_input(model_input, timestep)?;
            let noise_pred = self.unet.forward(&model_input, timestep as f64, context)?;

            let noise_pred = if use_guidance {
                let chunks = noise_pred.chunk(2, 0)?;
                let (uncond, text) = (&chunks[0], &chunks[1]);
                (uncond + ((text - uncond)? * guidance_scale)?)?
            } else {
                noise_pred
            };

            latents = scheduler.step(&noise_pred, timestep, &latents)?;
            debug!(step = i + 1, total = total_steps, "Denoising progress");
        }

        Ok(latents)
    }
}

impl Synthesizer for SdTurboPipeline {
    fn latent_channels(&self) -> usize {
        LATENT_CHANNELS
    }

    fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<RgbImage, SynthesisError> {
        self.generate(request)
    }
}
