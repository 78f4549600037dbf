//! Prompt assembly for each sketch view.
//!
//! Prompts must be a pure function of their inputs: sibling views are
//! rendered from the same noise, and re-rendering the anchor has to give back
//! the anchor image.

use crate::view::ViewKey;

/// Fixed domain prefix that opens every prompt.
pub const DOMAIN_PREFIX: &str = "sport sneaker, running shoe, athletic footwear design, \
breathable mesh upper, synthetic overlays, lace-up";

/// Negative prompt applied to every view.
pub const NEGATIVE_PROMPT: &str = "photorealistic, 3d render, background scenery, colors, \
heavy shading, blur, messy lines, noise, clutter";

const SEPARATOR: &str = ", ";

/// Build the prompt for `view` from the user's free-text fields.
///
/// Blank `elements` or `directives` are left out entirely; non-blank ones are
/// trimmed before they are joined.
pub fn build_prompt(view: ViewKey, elements: &str, directives: &str) -> String {
    let mut parts = vec![DOMAIN_PREFIX];
    parts.extend(
        [elements.trim(), directives.trim()]
            .into_iter()
            .filter(|part| !part.is_empty()),
    );
    parts.push(view.phrase());
    parts.join(SEPARATOR)
}
