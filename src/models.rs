//! Model loading for the SD-Turbo pipeline components
//!
//! This module handles loading the pieces the pipeline strings together:
//! - CLIP text encoder (OpenCLIP ViT-H, SD 2.x layout) and its BPE tokenizer
//! - VAE decoder (latents to RGB)
//!
//! The UNet is built directly by the pipeline from the same config.

use anyhow::Result;
use candle_core::{DType, Device, Module, Tensor};
use candle_transformers::models::stable_diffusion::{self, clip, vae, StableDiffusionConfig};
use std::path::Path;
use tokenizers::{
    models::bpe::BPE, normalizers::Lowercase, pre_tokenizers::whitespace::Whitespace,
    processors::template::TemplateProcessing, AddedToken, Tokenizer,
};
use tracing::{debug, info};

const START_OF_TEXT: &str = "<|startoftext|>";
const END_OF_TEXT: &str = "<|endoftext|>";
const START_OF_TEXT_ID: u32 = 49406;
const END_OF_TEXT_ID: u32 = 49407;

/// SD latents are scaled by this factor before decoding
const VAE_SCALE: f64 = 0.18215;

/// CLIP text encoder producing the UNet's cross-attention context
pub struct ClipTextEncoder {
    model: clip::ClipTextTransformer,
    tokenizer: Tokenizer,
    pad_id: u32,
    max_length: usize,
    device: Device,
}

impl ClipTextEncoder {
    /// Load CLIP model from safetensors file
    ///
    /// # Arguments
    /// * `model_path` - Path to text_encoder/model.safetensors
    /// * `tokenizer_path` - Tokenizer directory (vocab.json + merges.txt, or tokenizer.json)
    /// * `config` - CLIP configuration of the SD version
    pub fn load<P: AsRef<Path>>(
        model_path: P,
        tokenizer_path: P,
        config: &clip::Config,
        device: &Device,
        dtype: DType,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        let tokenizer_path = tokenizer_path.as_ref();

        info!(path = %model_path.display(), "Loading CLIP text encoder");

        let tokenizer = if tokenizer_path.join("tokenizer.json").is_file() {
            Tokenizer::from_file(tokenizer_path.join("tokenizer.json"))
                .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?
        } else {
            Self::load_bpe_tokenizer(tokenizer_path, config.max_position_embeddings)?
        };

        // SD 2.x pads with "!" rather than the end-of-text token
        let pad_token = config.pad_with.as_deref().unwrap_or(END_OF_TEXT);
        let pad_id = tokenizer
            .token_to_id(pad_token)
            .ok_or_else(|| anyhow::anyhow!("Padding token {:?} missing from vocabulary", pad_token))?;

        let model = stable_diffusion::build_clip_transformer(config, model_path, device, dtype)?;

        info!("✓ CLIP encoder loaded successfully");

        Ok(Self {
            model,
            tokenizer,
            pad_id,
            max_length: config.max_position_embeddings,
            device: device.clone(),
        })
    }

    /// Load BPE tokenizer from directory with vocab.json and merges.txt
    fn load_bpe_tokenizer(tokenizer_dir: &Path, max_length: usize) -> Result<Tokenizer> {
        let vocab_path = tokenizer_dir.join("vocab.json");
        let merges_path = tokenizer_dir.join("merges.txt");

        if !vocab_path.exists() || !merges_path.exists() {
            anyhow::bail!("BPE tokenizer requires vocab.json and merges.txt");
        }

        let bpe = BPE::from_file(&vocab_path.to_string_lossy(), &merges_path.to_string_lossy())
            .end_of_word_suffix("</w>".to_string())
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build BPE tokenizer: {}", e))?;

        let mut tokenizer = Tokenizer::new(bpe);
        tokenizer.with_normalizer(Some(Lowercase));
        tokenizer.with_pre_tokenizer(Some(Whitespace {}));

        tokenizer.add_special_tokens(&[
            AddedToken::from(START_OF_TEXT, true),
            AddedToken::from(END_OF_TEXT, true),
        ]);

        // Set post-processor for CLIP format
        let processor = TemplateProcessing::builder()
            .try_single(format!("{START_OF_TEXT} $A {END_OF_TEXT}"))
            .map_err(|e| anyhow::anyhow!("Template processing failed: {}", e))?
            .special_tokens(vec![
                (START_OF_TEXT, START_OF_TEXT_ID),
                (END_OF_TEXT, END_OF_TEXT_ID),
            ])
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build processor: {}", e))?;

        tokenizer.with_post_processor(Some(processor));

        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to set truncation: {}", e))?;

        Ok(tokenizer)
    }

    /// Token ids for `prompt`, padded to the encoder's context length
    pub fn tokenize(&self, prompt: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let mut tokens = encoding.get_ids().to_vec();
        if tokens.len() > self.max_length {
            // keep the closing end-of-text token
            tokens.truncate(self.max_length - 1);
            tokens.push(END_OF_TEXT_ID);
        }
        tokens.resize(self.max_length, self.pad_id);

        debug!(tokens = tokens.len(), "Prompt tokenized");
        Ok(tokens)
    }

    /// Encode text prompt to CLIP hidden states
    ///
    /// # Returns
    /// Tensor of shape [1, 77, hidden] used as UNet context
    pub fn encode(&self, prompt: &str) -> Result<Tensor> {
        let tokens = self.tokenize(prompt)?;
        let token_ids = Tensor::new(&tokens[..], &self.device)?.unsqueeze(0)?;
        Ok(self.model.forward(&token_ids)?)
    }
}

/// VAE decoder for converting latents to RGB images
pub struct VaeDecoder {
    model: vae::AutoEncoderKL,
}

impl VaeDecoder {
    /// Load the VAE from vae/diffusion_pytorch_model.safetensors
    pub fn load<P: AsRef<Path>>(
        model_path: P,
        sd_config: &StableDiffusionConfig,
        device: &Device,
        dtype: DType,
    ) -> Result<Self> {
        info!(path = %model_path.as_ref().display(), "Loading VAE decoder");

        let model = sd_config.build_vae(model_path, device, dtype)?;

        info!("✓ VAE decoder loaded successfully");

        Ok(Self { model })
    }

    /// Decode latent tensor to an image tensor
    ///
    /// # Arguments
    /// * `latents` - Latent tensor [1, 4, H/8, W/8]
    ///
    /// # Returns
    /// RGB tensor [1, 3, H, W] with values in range [-1, 1]
    pub fn decode(&self, latents: &Tensor) -> candle_core::Result<Tensor> {
        self.model.decode(&(latents / VAE_SCALE)?)
    }
}

/// Convert a decoded tensor to interleaved RGB bytes
///
/// # Arguments
/// * `tensor` - Image tensor [1, 3, H, W] with values in [-1, 1]
///
/// # Returns
/// Vec<u8> with RGB pixel data (H * W * 3 bytes)
pub fn tensor_to_rgb(tensor: &Tensor) -> candle_core::Result<Vec<u8>> {
    // Clamp to [-1, 1], scale to [0, 255]
    let image = tensor.to_dtype(DType::F32)?.clamp(-1f32, 1f32)?;
    let image = ((image + 1.0)? * 127.5)?;
    let image = image.to_dtype(DType::U8)?;

    // Remove batch dimension and permute to HWC
    let image = image.squeeze(0)?.permute((1, 2, 0))?;

    image.flatten_all()?.to_vec1()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_to_rgb_maps_range_and_layout() {
        // 1x3x1x2: red channel [-1, 1], green [0, 0], blue [1, -1]
        let data = [-1f32, 1.0, 0.0, 0.0, 1.0, -1.0];
        let tensor = Tensor::from_slice(&data, (1, 3, 1, 2), &Device::Cpu).unwrap();
        let rgb = tensor_to_rgb(&tensor).unwrap();
        assert_eq!(rgb, vec![0, 127, 255, 255, 127, 0]);
    }

    #[test]
    fn test_tensor_to_rgb_clamps() {
        let data = [-3f32, 4.0, 0.5];
        let tensor = Tensor::from_slice(&data, (1, 3, 1, 1), &Device::Cpu).unwrap();
        let rgb = tensor_to_rgb(&tensor).unwrap();
        assert_eq!(rgb, vec![0, 255, 191]);
    }
}
