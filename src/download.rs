//! SD-Turbo model bundle: local lookup and HuggingFace Hub download
//!
//! The bundle follows the diffusers repository layout:
//! - `text_encoder/model.safetensors` (OpenCLIP ViT-H text encoder, ~1.4GB)
//! - `unet/diffusion_pytorch_model.safetensors` (~3.5GB)
//! - `vae/diffusion_pytorch_model.safetensors` (~330MB)
//! - `tokenizer/vocab.json` + `tokenizer/merges.txt`

use anyhow::{Context, Result};
use hf_hub::api::tokio::{Api, ApiRepo};
use std::path::{Path, PathBuf};
use tracing::info;

const TEXT_ENCODER_FILE: &str = "text_encoder/model.safetensors";
const UNET_FILE: &str = "unet/diffusion_pytorch_model.safetensors";
const VAE_FILE: &str = "vae/diffusion_pytorch_model.safetensors";
const VOCAB_FILE: &str = "tokenizer/vocab.json";
const MERGES_FILE: &str = "tokenizer/merges.txt";

/// Paths to every file of the bundle
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub text_encoder: PathBuf,
    pub unet: PathBuf,
    pub vae: PathBuf,
    /// Directory holding `vocab.json` and `merges.txt` (or a `tokenizer.json`)
    pub tokenizer_dir: PathBuf,
}

impl ModelPaths {
    /// Use a pre-fetched bundle in `dir`, failing if any file is missing.
    pub fn from_local_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            anyhow::bail!("Local model bundle not found: {}", dir.display());
        }

        for file in [TEXT_ENCODER_FILE, UNET_FILE, VAE_FILE, VOCAB_FILE, MERGES_FILE] {
            let path = dir.join(file);
            if !path.is_file() {
                anyhow::bail!("Local model bundle is missing {}", path.display());
            }
        }

        Ok(Self {
            text_encoder: dir.join(TEXT_ENCODER_FILE),
            unet: dir.join(UNET_FILE),
            vae: dir.join(VAE_FILE),
            tokenizer_dir: dir.join("tokenizer"),
        })
    }
}

/// Model downloader that caches models using HuggingFace Hub
pub struct ModelDownloader {
    api: Api,
    model_id: String,
}

impl ModelDownloader {
    /// Create a new model downloader for `model_id`
    ///
    /// Uses HF_TOKEN environment variable if set
    pub fn new(model_id: impl Into<String>) -> Result<Self> {
        let api = Api::new().context("Failed to create HuggingFace API client")?;
        Ok(Self {
            api,
            model_id: model_id.into(),
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Download every file of the bundle (~5GB total) into the hub cache
    pub async fn download_all(&self) -> Result<ModelPaths> {
        info!(model = %self.model_id, "Downloading SD-Turbo model bundle");
        info!("This may take several minutes depending on your connection");

        let repo = self.repo();

        // Download in parallel
        let (text_encoder, unet, vae, vocab, _merges) = tokio::try_join!(
            fetch(&repo, TEXT_ENCODER_FILE, "CLIP text encoder (~1.4GB)"),
            fetch(&repo, UNET_FILE, "UNet (~3.5GB)"),
            fetch(&repo, VAE_FILE, "VAE (~330MB)"),
            fetch(&repo, VOCAB_FILE, "tokenizer vocab"),
            fetch(&repo, MERGES_FILE, "tokenizer merges"),
        )?;

        let tokenizer_dir = vocab
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Could not determine tokenizer directory"))?
            .to_path_buf();

        info!("✓ All models downloaded successfully!");

        Ok(ModelPaths {
            text_encoder,
            unet,
            vae,
            tokenizer_dir,
        })
    }

    fn repo(&self) -> ApiRepo {
        self.api.repo(hf_hub::Repo::model(self.model_id.clone()))
    }
}

async fn fetch(repo: &ApiRepo, file: &str, what: &str) -> Result<PathBuf> {
    info!("Downloading {}", what);
    let path = repo
        .get(file)
        .await
        .with_context(|| format!("Failed to download {file}"))?;
    info!("  ✓ {} downloaded: {}", what, path.display());
    Ok(path)
}
