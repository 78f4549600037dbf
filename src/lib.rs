//! Sneaker multi-view sketch studio
//!
//! Generates a consistent set of footwear line-art sketches (top, left,
//! right, back, sole) from one text description with SD-Turbo on candle,
//! then lays them out on a single labeled contact sheet.
//!
//! ## How the views stay consistent
//!
//! - **Anchor first**: the right-side view is generated first, from noise
//!   sampled with a recorded seed
//! - **Shared latents**: every other view is rendered from exactly the same
//!   noise tensor, only the view phrase of the prompt changes
//! - **Reproducible**: same seed, size and settings give the same anchor
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shoe_multiview::compose::Layout;
//! use shoe_multiview::config::StudioConfig;
//! use shoe_multiview::pipeline::SdTurboPipeline;
//! use shoe_multiview::session::AnchorRequest;
//! use shoe_multiview::studio::Studio;
//! use shoe_multiview::view::ViewKey;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = StudioConfig::default();
//!     let device = candle_core::Device::cuda_if_available(0)?;
//!     let pipeline = SdTurboPipeline::load_local_or_remote(&config, device).await?;
//!
//!     let mut studio = Studio::new(pipeline, config);
//!     let anchor = studio.generate_anchor(
//!         AnchorRequest {
//!             elements: "mesh toe, 5 eyelets, cupsole".to_string(),
//!             ..AnchorRequest::default()
//!         },
//!         None,
//!     )?;
//!     println!("{}", anchor.status);
//!
//!     let composite = studio.confirm_composite(
//!         Some(anchor.handle),
//!         &[ViewKey::Top, ViewKey::Back, ViewKey::Left, ViewKey::Sole],
//!         Layout::Auto,
//!     )?;
//!     println!("{}", composite.path.display());
//!     Ok(())
//! }
//! ```

pub mod compose;
pub mod config;
pub mod download;
pub mod error;
pub mod fakes;
pub mod models;
pub mod noise;
pub mod pipeline;
pub mod prompt;
pub mod session;
pub mod studio;
pub mod synth;
pub mod view;

pub use error::{StudioError, StudioResult, SynthesisError};
pub use synth::Synthesizer;
pub use view::ViewKey;
