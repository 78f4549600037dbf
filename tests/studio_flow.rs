//! End-to-end tests of the anchor + composite workflow with the fake synthesizer.

use shoe_multiview::compose::{canvas_size, Layout};
use shoe_multiview::config::StudioConfig;
use shoe_multiview::fakes::FakeSynthesizer;
use shoe_multiview::prompt::build_prompt;
use shoe_multiview::session::{
    start_session, AnchorRequest, GenerationParams, DEFAULT_SESSION_CAPACITY,
};
use shoe_multiview::studio::Studio;
use shoe_multiview::{StudioError, SynthesisError, ViewKey};

fn studio(dir: &tempfile::TempDir) -> Studio<FakeSynthesizer> {
    Studio::new(
        FakeSynthesizer::new(),
        StudioConfig::default().with_output_dir(dir.path().join("outputs")),
    )
}

fn anchor_request(seed: Option<u64>) -> AnchorRequest {
    AnchorRequest {
        elements: "mesh toe, 5 eyelets, cupsole".to_string(),
        directives: String::new(),
        params: GenerationParams {
            width: 512,
            height: 512,
            steps: 6,
            guidance_scale: 0.0,
        },
        seed,
    }
}

/// Test: the documented scenario keeps the caller's seed
#[test]
fn test_start_session_with_seed_42() {
    let fake = FakeSynthesizer::new();
    let (image, session) = start_session(&fake, anchor_request(Some(42))).expect("anchor failed");

    assert_eq!(session.seed(), 42);
    assert_eq!(image.dimensions(), (512, 512));
    assert_eq!(session.params().steps, 6);
}

/// Test: anchor writes the preview and reports the seed
#[test]
fn test_generate_anchor_writes_preview() {
    let dir = tempfile::tempdir().unwrap();
    let mut studio = studio(&dir);

    let anchor = studio
        .generate_anchor(anchor_request(Some(7)), None)
        .expect("anchor failed");

    assert_eq!(anchor.status, "Right view ready. seed=7");
    assert_eq!(anchor.seed, 7);
    assert_eq!(anchor.path, dir.path().join("outputs/shoe_RIGHT_preview.png"));

    let saved = image::open(&anchor.path).unwrap().to_rgb8();
    assert_eq!(saved, anchor.image);
}

/// Test: same seed and settings reproduce the anchor across studios
#[test]
fn test_anchor_is_reproducible_from_seed() {
    let dir = tempfile::tempdir().unwrap();
    let mut first = studio(&dir);
    let mut second = studio(&dir);

    let a = first.generate_anchor(anchor_request(Some(1234)), None).unwrap();
    let b = second.generate_anchor(anchor_request(Some(1234)), None).unwrap();
    assert_eq!(a.image, b.image);
}

/// Test: re-rendering the anchor view from the session gives the same image
#[test]
fn test_render_right_reproduces_anchor() {
    let dir = tempfile::tempdir().unwrap();
    let mut studio = studio(&dir);

    let anchor = studio.generate_anchor(anchor_request(None), None).unwrap();
    let again = studio
        .render_view(Some(anchor.handle), ViewKey::Right)
        .expect("render failed");

    assert_eq!(again, anchor.image);
}

/// Test: rendering before any anchor is RequiresAnchor
#[test]
fn test_render_without_anchor_requires_anchor() {
    let dir = tempfile::tempdir().unwrap();
    let studio = studio(&dir);

    let err = studio.render_view(None, ViewKey::Top).unwrap_err();
    assert!(matches!(err, StudioError::RequiresAnchor));

    let err = studio
        .confirm_composite(None, &[ViewKey::Top], Layout::Auto)
        .unwrap_err();
    assert!(matches!(err, StudioError::RequiresAnchor));
    assert_eq!(studio.synthesizer().calls(), 0);
}

/// Test: only the anchor selected is NoViewsSelected
#[test]
fn test_confirm_with_only_right_selected() {
    let dir = tempfile::tempdir().unwrap();
    let mut studio = studio(&dir);
    let anchor = studio.generate_anchor(anchor_request(Some(3)), None).unwrap();

    let err = studio
        .confirm_composite(Some(anchor.handle), &[ViewKey::Right], Layout::Auto)
        .unwrap_err();
    assert!(matches!(err, StudioError::NoViewsSelected));

    let err = studio
        .confirm_composite(Some(anchor.handle), &[], Layout::Auto)
        .unwrap_err();
    assert!(matches!(err, StudioError::NoViewsSelected));
    assert!(!studio.config().composite_path().exists());
}

/// Test: composite places the anchor first and sizes the canvas by layout
#[test]
fn test_confirm_composite_default_selection() {
    let dir = tempfile::tempdir().unwrap();
    let mut studio = studio(&dir);
    let anchor = studio.generate_anchor(anchor_request(Some(5)), None).unwrap();
    let calls_after_anchor = studio.synthesizer().calls();

    let selected = [ViewKey::Top, ViewKey::Back, ViewKey::Left, ViewKey::Sole];
    let composite = studio
        .confirm_composite(Some(anchor.handle), &selected, Layout::Auto)
        .expect("composite failed");

    assert_eq!(
        composite.views,
        vec![
            ViewKey::Right,
            ViewKey::Top,
            ViewKey::Back,
            ViewKey::Left,
            ViewKey::Sole
        ]
    );
    // five images, auto layout: 3 x 2
    assert_eq!(composite.image.dimensions(), canvas_size(3, 2, 512, 512, 12).unwrap());
    assert_eq!(composite.path, dir.path().join("outputs/shoe_COMPOSITE.png"));
    assert!(composite.path.exists());

    // anchor pixels sit in the top-left cell, just past the label area
    assert_eq!(
        composite.image.get_pixel(12 + 100, 12 + 100),
        anchor.image.get_pixel(100, 100)
    );

    // one synthesis per added view
    assert_eq!(studio.synthesizer().calls() - calls_after_anchor, 4);
}

/// Test: views past the layout's cells are neither rendered nor reported
#[test]
fn test_grid2x2_composite_skips_views_that_do_not_fit() {
    let dir = tempfile::tempdir().unwrap();
    let mut studio = studio(&dir);
    let anchor = studio.generate_anchor(anchor_request(Some(8)), None).unwrap();
    let calls_after_anchor = studio.synthesizer().calls();

    let selected = [ViewKey::Top, ViewKey::Back, ViewKey::Left, ViewKey::Sole];
    let composite = studio
        .confirm_composite(Some(anchor.handle), &selected, Layout::Grid2x2)
        .expect("composite failed");

    assert_eq!(
        composite.views,
        vec![ViewKey::Right, ViewKey::Top, ViewKey::Back, ViewKey::Left]
    );
    assert_eq!(
        composite.image.dimensions(),
        canvas_size(2, 2, 512, 512, 12).unwrap()
    );
    assert_eq!(studio.synthesizer().calls() - calls_after_anchor, 3);
    assert!(!studio
        .synthesizer()
        .prompts()
        .iter()
        .any(|prompt| prompt.contains(ViewKey::Sole.phrase())));
}

/// Test: row layout keeps every selected view
#[test]
fn test_row_composite_keeps_every_view() {
    let dir = tempfile::tempdir().unwrap();
    let mut studio = studio(&dir);
    let anchor = studio.generate_anchor(anchor_request(Some(8)), None).unwrap();

    let selected = [ViewKey::Top, ViewKey::Back, ViewKey::Left, ViewKey::Sole];
    let composite = studio
        .confirm_composite(Some(anchor.handle), &selected, Layout::Row)
        .unwrap();

    assert_eq!(composite.views.len(), 5);
    assert_eq!(
        composite.image.dimensions(),
        canvas_size(5, 1, 512, 512, 12).unwrap()
    );
}

/// Test: sibling views share the anchor's fields but use their own phrase
#[test]
fn test_sibling_prompts_share_fields() {
    let dir = tempfile::tempdir().unwrap();
    let mut studio = studio(&dir);
    let request = AnchorRequest {
        directives: "  bold outline ".to_string(),
        ..anchor_request(Some(11))
    };
    let anchor = studio.generate_anchor(request, None).unwrap();
    studio
        .confirm_composite(Some(anchor.handle), &[ViewKey::Sole, ViewKey::Sole], Layout::Row)
        .unwrap();

    let prompts = studio.synthesizer().prompts();
    assert_eq!(
        prompts,
        vec![
            build_prompt(ViewKey::Right, "mesh toe, 5 eyelets, cupsole", "bold outline"),
            build_prompt(ViewKey::Sole, "mesh toe, 5 eyelets, cupsole", "bold outline"),
        ]
    );
}

/// Test: a new anchor replaces the caller's previous session
#[test]
fn test_new_anchor_replaces_previous_session() {
    let dir = tempfile::tempdir().unwrap();
    let mut studio = studio(&dir);

    let first = studio.generate_anchor(anchor_request(Some(1)), None).unwrap();
    let second = studio
        .generate_anchor(anchor_request(Some(2)), Some(first.handle))
        .unwrap();

    assert_eq!(studio.sessions().live_count(), 1);
    assert!(matches!(
        studio.render_view(Some(first.handle), ViewKey::Top),
        Err(StudioError::RequiresAnchor)
    ));
    assert!(studio.render_view(Some(second.handle), ViewKey::Top).is_ok());
}

/// Test: separate sessions keep separate noise
#[test]
fn test_sessions_do_not_leak_noise() {
    let dir = tempfile::tempdir().unwrap();
    let mut studio = studio(&dir);

    let a = studio.generate_anchor(anchor_request(Some(100)), None).unwrap();
    let b = studio.generate_anchor(anchor_request(Some(200)), None).unwrap();

    assert_eq!(studio.sessions().live_count(), 2);
    let top_a = studio.render_view(Some(a.handle), ViewKey::Top).unwrap();
    let top_b = studio.render_view(Some(b.handle), ViewKey::Top).unwrap();
    assert_ne!(top_a, top_b);
}

/// Test: anchors that are never replaced do not pile up
#[test]
fn test_session_registry_is_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let mut studio = studio(&dir);
    let mut request = anchor_request(Some(1));
    request.params.width = 64;
    request.params.height = 64;

    let first = studio.generate_anchor(request.clone(), None).unwrap();
    let mut last = first.handle;
    for _ in 0..50 {
        last = studio.generate_anchor(request.clone(), None).unwrap().handle;
        assert!(studio.sessions().live_count() <= DEFAULT_SESSION_CAPACITY);
    }

    assert_eq!(studio.sessions().live_count(), DEFAULT_SESSION_CAPACITY);
    assert!(matches!(
        studio.render_view(Some(first.handle), ViewKey::Top),
        Err(StudioError::RequiresAnchor)
    ));
    assert!(studio.render_view(Some(last), ViewKey::Top).is_ok());
}

/// Test: an ended session is gone
#[test]
fn test_end_session_releases_it() {
    let dir = tempfile::tempdir().unwrap();
    let mut studio = studio(&dir);
    let anchor = studio.generate_anchor(anchor_request(Some(2)), None).unwrap();

    assert!(studio.end_session(anchor.handle));
    assert!(!studio.end_session(anchor.handle));
    assert_eq!(studio.sessions().live_count(), 0);
    let err = studio
        .confirm_composite(Some(anchor.handle), &[ViewKey::Top], Layout::Auto)
        .unwrap_err();
    assert!(matches!(err, StudioError::RequiresAnchor));
}

/// Test: synthesizer failures surface instead of a blank image
#[test]
fn test_model_failure_is_propagated() {
    let dir = tempfile::tempdir().unwrap();
    let mut studio = studio(&dir);
    studio.synthesizer().fail_with("weights not loaded");

    let err = studio
        .generate_anchor(anchor_request(Some(1)), None)
        .err()
        .expect("anchor should fail");
    assert!(matches!(
        err,
        StudioError::Synthesis(SynthesisError::ModelUnavailable(_))
    ));
    assert!(!studio.config().preview_path().exists());
}

/// Test: invalid inputs are rejected before any synthesis
#[test]
fn test_invalid_inputs_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut studio = studio(&dir);

    let err = studio
        .generate_anchor(anchor_request(Some(1u64 << 31)), None)
        .err()
        .unwrap();
    assert!(matches!(err, StudioError::InvalidSeed { .. }));

    let mut request = anchor_request(Some(1));
    request.params.width = 510;
    let err = studio.generate_anchor(request, None).err().unwrap();
    assert!(matches!(err, StudioError::InvalidDimensions { width: 510, .. }));

    assert_eq!(studio.synthesizer().calls(), 0);
}
