//! Shared-latent design sessions.
//!
//! A session starts when the anchor (right) view is generated. It captures
//! the free-text fields, the generation parameters and the noise tensor, and
//! is then only read: every sibling view is rendered from exactly the same
//! noise so the views depict the same shoe.

use std::collections::HashMap;

use image::RgbImage;
use tracing::{debug, info};

use crate::error::{StudioError, StudioResult};
use crate::noise::{make_shared_noise, SeededNoise, LATENT_SCALE};
use crate::prompt::{build_prompt, NEGATIVE_PROMPT};
use crate::synth::{SpatialSource, SynthesisRequest, Synthesizer};
use crate::view::ViewKey;

/// Size and sampler settings of one design.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub width: u32,
    pub height: u32,
    pub steps: usize,
    pub guidance_scale: f64,
}

impl Default for GenerationParams {
    /// SD-Turbo defaults: 512x512, 6 steps, no guidance.
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            steps: 6,
            guidance_scale: 0.0,
        }
    }
}

impl GenerationParams {
    /// Reject sizes that do not map onto whole latent cells, and sampler
    /// settings the synthesizer cannot honour.
    pub fn validate(&self) -> StudioResult<()> {
        let fits = |side: u32| side > 0 && side % LATENT_SCALE == 0;
        if !fits(self.width) || !fits(self.height) {
            return Err(StudioError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.steps == 0 {
            return Err(StudioError::InvalidParameter(
                "steps must be at least 1".to_string(),
            ));
        }
        if !self.guidance_scale.is_finite() || self.guidance_scale < 0.0 {
            return Err(StudioError::InvalidParameter(format!(
                "guidance scale must be a non-negative number, got {}",
                self.guidance_scale
            )));
        }
        Ok(())
    }
}

/// Inputs of the "generate anchor view" action.
#[derive(Debug, Clone, Default)]
pub struct AnchorRequest {
    pub elements: String,
    pub directives: String,
    pub params: GenerationParams,
    /// Fixed seed; a random one is drawn when absent.
    pub seed: Option<u64>,
}

/// Everything needed to render sibling views with the anchor's noise.
#[derive(Debug, Clone)]
pub struct ViewSession {
    elements: String,
    directives: String,
    params: GenerationParams,
    noise: SeededNoise,
}

impl ViewSession {
    pub fn elements(&self) -> &str {
        &self.elements
    }

    pub fn directives(&self) -> &str {
        &self.directives
    }

    pub fn params(&self) -> GenerationParams {
        self.params
    }

    /// Seed actually used for the shared noise.
    pub fn seed(&self) -> u32 {
        self.noise.seed
    }

    pub fn noise(&self) -> &SeededNoise {
        &self.noise
    }

    /// Prompt this session produces for `view`.
    pub fn prompt_for(&self, view: ViewKey) -> String {
        build_prompt(view, &self.elements, &self.directives)
    }
}

/// Generate the anchor view and capture the session around it.
pub fn start_session<S: Synthesizer + ?Sized>(
    synth: &S,
    request: AnchorRequest,
) -> StudioResult<(RgbImage, ViewSession)> {
    request.params.validate()?;
    let params = request.params;

    let noise = make_shared_noise(
        synth.latent_channels(),
        params.width,
        params.height,
        request.seed,
    )?;

    info!(
        seed = noise.seed,
        size = format!("{}x{}", params.width, params.height),
        steps = params.steps,
        guidance = params.guidance_scale,
        "Starting design session"
    );

    let session = ViewSession {
        elements: request.elements,
        directives: request.directives,
        params,
        noise,
    };
    let image = render_view(synth, &session, ViewKey::ANCHOR)?;

    Ok((image, session))
}

/// Render `view` from the session's shared noise.
///
/// Width and height are not passed on: the noise tensor fixes the size.
pub fn render_view<S: Synthesizer + ?Sized>(
    synth: &S,
    session: &ViewSession,
    view: ViewKey,
) -> StudioResult<RgbImage> {
    let prompt = session.prompt_for(view);
    debug!(view = %view, seed = session.seed(), prompt = %prompt, "Rendering view");

    let request = SynthesisRequest {
        prompt: &prompt,
        negative_prompt: NEGATIVE_PROMPT,
        steps: session.params.steps,
        guidance_scale: session.params.guidance_scale,
        source: SpatialSource::Noise(&session.noise.tensor),
    };
    let image = synth.synthesize(&request)?;

    info!(view = %view, size = format!("{}x{}", image.width(), image.height()), "✓ View rendered");
    Ok(image)
}

/// Opaque handle a front end threads back to address its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(u64);

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// A live session and its anchor image.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub session: ViewSession,
    pub anchor: RgbImage,
}

/// Default number of live sessions a registry keeps.
pub const DEFAULT_SESSION_CAPACITY: usize = 8;

/// Sessions keyed by handle, so separate clients never share noise.
///
/// The registry is bounded: once `capacity` sessions are live, opening a
/// new one evicts the oldest.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: HashMap<SessionHandle, SessionEntry>,
    capacity: usize,
    next_id: u64,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SESSION_CAPACITY)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry keeping at most `capacity` live sessions (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            capacity: capacity.max(1),
            next_id: 0,
        }
    }

    /// Store a new session; `replaces` (if any) is discarded first, then the
    /// oldest sessions while the registry is full.
    pub fn insert(&mut self, entry: SessionEntry, replaces: Option<SessionHandle>) -> SessionHandle {
        if let Some(old) = replaces {
            if self.sessions.remove(&old).is_some() {
                debug!(session = old.id(), "Replaced previous session");
            }
        }
        while self.sessions.len() >= self.capacity {
            // handles are allocated in increasing order
            let Some(&oldest) = self.sessions.keys().min_by_key(|handle| handle.id()) else {
                break;
            };
            self.sessions.remove(&oldest);
            debug!(session = oldest.id(), "Evicted oldest session");
        }
        self.next_id += 1;
        let handle = SessionHandle(self.next_id);
        self.sessions.insert(handle, entry);
        handle
    }

    /// Look up a session; a missing or unknown handle means no anchor yet.
    pub fn get(&self, handle: Option<SessionHandle>) -> StudioResult<&SessionEntry> {
        handle
            .and_then(|handle| self.sessions.get(&handle))
            .ok_or(StudioError::RequiresAnchor)
    }

    /// Drop a session; returns whether it was live.
    pub fn remove(&mut self, handle: SessionHandle) -> bool {
        self.sessions.remove(&handle).is_some()
    }

    pub fn live_count(&self) -> usize {
        self.sessions.len()
    }
}
