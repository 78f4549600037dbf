//! The two user actions: generate the anchor view, confirm the composite.
//!
//! `Studio` owns the injected synthesizer, the session registry and the
//! output locations. Front ends call [`Studio::generate_anchor`], keep the
//! returned handle, and pass it back to [`Studio::confirm_composite`].

use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::info;

use crate::compose::{compose, Layout};
use crate::config::StudioConfig;
use crate::error::{StudioError, StudioResult};
use crate::session::{
    render_view, start_session, AnchorRequest, SessionEntry, SessionHandle, SessionRegistry,
};
use crate::synth::Synthesizer;
use crate::view::ViewKey;

/// Result of the "generate anchor view" action.
#[derive(Debug)]
pub struct AnchorResult {
    pub image: RgbImage,
    pub path: PathBuf,
    pub status: String,
    pub seed: u32,
    pub handle: SessionHandle,
}

/// Result of the "confirm composite" action.
#[derive(Debug)]
pub struct CompositeResult {
    pub image: RgbImage,
    pub path: PathBuf,
    /// Views on the canvas, anchor first.
    pub views: Vec<ViewKey>,
}

pub struct Studio<S> {
    synth: S,
    config: StudioConfig,
    sessions: SessionRegistry,
}

impl<S: Synthesizer> Studio<S> {
    pub fn new(synth: S, config: StudioConfig) -> Self {
        Self {
            synth,
            config,
            sessions: SessionRegistry::new(),
        }
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn synthesizer(&self) -> &S {
        &self.synth
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Generate the anchor (right) view and open a session for it.
    ///
    /// The preview is written to the configured preview path. Passing the
    /// caller's previous handle as `replaces` drops that session.
    pub fn generate_anchor(
        &mut self,
        request: AnchorRequest,
        replaces: Option<SessionHandle>,
    ) -> StudioResult<AnchorResult> {
        info!("┌─ Anchor view ({}) ─────────────────────────────┐", ViewKey::ANCHOR);

        let (image, session) = start_session(&self.synth, request)?;
        let seed = session.seed();

        let path = self.config.preview_path();
        save_png(&image, &path)?;
        info!("└─ ✓ Saved: {}", path.display());

        let handle = self.sessions.insert(
            SessionEntry {
                session,
                anchor: image.clone(),
            },
            replaces,
        );

        Ok(AnchorResult {
            image,
            path,
            status: format!("{} view ready. seed={seed}", ViewKey::ANCHOR),
            seed,
            handle,
        })
    }

    /// Close a session; returns whether it was live.
    pub fn end_session(&mut self, handle: SessionHandle) -> bool {
        let ended = self.sessions.remove(handle);
        if ended {
            info!(session = handle.id(), "Session ended");
        }
        ended
    }

    /// Render one view from the session's shared noise.
    pub fn render_view(&self, handle: Option<SessionHandle>, view: ViewKey) -> StudioResult<RgbImage> {
        let entry = self.sessions.get(handle)?;
        render_view(&self.synth, &entry.session, view)
    }

    /// Render the selected views and compose them after the anchor.
    ///
    /// The anchor is dropped from `selected` (it is always placed first) and
    /// duplicates are ignored. Nothing left to render is `NoViewsSelected`.
    /// Views that do not fit the layout's cells are skipped before any
    /// rendering, so `views` always lists exactly what is on the canvas.
    pub fn confirm_composite(
        &self,
        handle: Option<SessionHandle>,
        selected: &[ViewKey],
        layout: Layout,
    ) -> StudioResult<CompositeResult> {
        let entry = self.sessions.get(handle)?;
        let mut others = others_in_order(selected);
        if others.is_empty() {
            return Err(StudioError::NoViewsSelected);
        }
        if let Some(capacity) = layout.capacity() {
            // one cell is taken by the anchor
            let fits = capacity.saturating_sub(1);
            if others.len() > fits {
                let skipped = others.split_off(fits);
                info!(layout = %layout, skipped = ?skipped, "Views do not fit the layout");
            }
        }

        info!(
            seed = entry.session.seed(),
            views = ?others,
            layout = %layout,
            "Rendering remaining views with shared noise"
        );

        let mut pairs = Vec::with_capacity(others.len() + 1);
        pairs.push((ViewKey::ANCHOR, entry.anchor.clone()));
        for &view in &others {
            let image = render_view(&self.synth, &entry.session, view)?;
            pairs.push((view, image));
        }

        let image = compose(&pairs, &self.config.compose_options(layout))?;
        let path = self.config.composite_path();
        save_png(&image, &path)?;
        info!("✓ Composite saved: {}", path.display());

        Ok(CompositeResult {
            image,
            path,
            views: pairs.into_iter().map(|(view, _)| view).collect(),
        })
    }
}

/// Non-anchor views of `selected`, first occurrence order, no repeats.
fn others_in_order(selected: &[ViewKey]) -> Vec<ViewKey> {
    let mut others: Vec<ViewKey> = Vec::new();
    for &view in selected {
        if !view.is_anchor() && !others.contains(&view) {
            others.push(view);
        }
    }
    others
}

fn save_png(image: &RgbImage, path: &Path) -> StudioResult<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|source| StudioError::Output {
            path: path.to_path_buf(),
            source,
        })
}
