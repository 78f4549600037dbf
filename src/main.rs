//! CLI entry point for the sneaker multi-view sketch studio

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use shoe_multiview::compose::Layout;
use shoe_multiview::config::{StudioConfig, DEFAULT_MODEL_DIR, DEFAULT_MODEL_ID};
use shoe_multiview::download::ModelDownloader;
use shoe_multiview::fakes::FakeSynthesizer;
use shoe_multiview::pipeline::SdTurboPipeline;
use shoe_multiview::session::{AnchorRequest, GenerationParams};
use shoe_multiview::studio::Studio;
use shoe_multiview::{Synthesizer, ViewKey};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shoe-multiview")]
#[command(version)]
#[command(about = "Sport sneaker multi-view sketches with shared latents", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the SD-Turbo model bundle (~5GB) into the HuggingFace cache
    Download {
        /// HuggingFace Hub model id
        #[arg(long, default_value = DEFAULT_MODEL_ID)]
        model_id: String,
    },

    /// Generate only the anchor (right) view preview
    Preview {
        #[command(flatten)]
        design: DesignArgs,
    },

    /// Generate the anchor view, then the selected views, and compose them
    ///
    /// All views reuse the anchor's noise so they show the same shoe.
    Generate {
        #[command(flatten)]
        design: DesignArgs,

        /// Views to add next to the right view (comma separated)
        #[arg(long, value_delimiter = ',', default_value = "top,back,left,sole")]
        views: Vec<ViewKey>,

        /// Composite layout: auto, row or grid2x2
        #[arg(long, default_value = "auto")]
        layout: Layout,
    },
}

#[derive(Args)]
struct DesignArgs {
    /// Shoe elements, e.g. "mesh toe, 5 eyelets, cupsole"
    #[arg(short, long, default_value = "mesh toe, 5 eyelets, cupsole")]
    elements: String,

    /// Extra design directives merged after the elements
    #[arg(short, long, default_value = "")]
    directives: String,

    /// Image width in pixels (multiple of 8)
    #[arg(long, default_value = "512")]
    width: u32,

    /// Image height in pixels (multiple of 8)
    #[arg(long, default_value = "512")]
    height: u32,

    /// Denoising steps (Turbo: 4-8)
    #[arg(long, default_value = "6")]
    steps: usize,

    /// Guidance scale (Turbo: 0.0)
    #[arg(long, default_value = "0.0")]
    guidance: f64,

    /// Seed for the shared noise; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Output directory
    #[arg(short, long, default_value = "outputs")]
    output_dir: PathBuf,

    /// Local model bundle, tried before the hub
    #[arg(long, default_value = DEFAULT_MODEL_DIR)]
    model_dir: PathBuf,

    /// HuggingFace Hub model id used when the local bundle fails to load
    #[arg(long, default_value = DEFAULT_MODEL_ID)]
    model_id: String,

    /// Skip the model and render flat placeholder tiles
    #[arg(long)]
    dry_run: bool,
}

impl DesignArgs {
    fn config(&self) -> StudioConfig {
        StudioConfig {
            output_dir: self.output_dir.clone(),
            model_dir: self.model_dir.clone(),
            model_id: self.model_id.clone(),
            ..StudioConfig::default()
        }
    }

    fn anchor_request(&self) -> AnchorRequest {
        AnchorRequest {
            elements: self.elements.clone(),
            directives: self.directives.clone(),
            params: GenerationParams {
                width: self.width,
                height: self.height,
                steps: self.steps,
                guidance_scale: self.guidance,
            },
            seed: self.seed,
        }
    }
}

async fn open_studio(design: &DesignArgs) -> Result<Studio<Box<dyn Synthesizer>>> {
    let config = design.config();
    let synth: Box<dyn Synthesizer> = if design.dry_run {
        info!("Dry run: using the placeholder synthesizer");
        Box::new(FakeSynthesizer::new())
    } else {
        let device = candle_core::Device::cuda_if_available(0)?;
        info!(device = ?device, "Selected device");
        Box::new(SdTurboPipeline::load_local_or_remote(&config, device).await?)
    };
    Ok(Studio::new(synth, config))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Download { model_id } => {
            let downloader = ModelDownloader::new(model_id)?;
            let paths = downloader.download_all().await?;

            println!();
            println!("✓ Model bundle ready ({})", downloader.model_id());
            println!("  Text encoder: {}", paths.text_encoder.display());
            println!("  UNet:         {}", paths.unet.display());
            println!("  VAE:          {}", paths.vae.display());
            println!("  Tokenizer:    {}", paths.tokenizer_dir.display());
            println!();
        }

        Commands::Preview { design } => {
            let mut studio = open_studio(&design).await?;
            let anchor = studio.generate_anchor(design.anchor_request(), None)?;

            println!();
            println!("{}", anchor.status);
            println!("  Preview: {}", anchor.path.display());
            println!();
        }

        Commands::Generate {
            design,
            views,
            layout,
        } => {
            let mut studio = open_studio(&design).await?;
            let anchor = studio.generate_anchor(design.anchor_request(), None)?;
            println!("{}", anchor.status);

            let composite = studio.confirm_composite(Some(anchor.handle), &views, layout)?;
            let labels: Vec<_> = composite.views.iter().map(|v| v.label()).collect();

            println!();
            println!("✨ Composite ready ({}):", labels.join(", "));
            println!("  Preview:   {}", anchor.path.display());
            println!("  Composite: {}", composite.path.display());
            println!();
        }
    }

    Ok(())
}
