//! Contact-sheet composition of the rendered views.
//!
//! Pure image work: no I/O happens here, the caller decides where the
//! canvas goes.

use std::fmt;
use std::str::FromStr;

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{imageops, Rgb, RgbImage};

use crate::error::{StudioError, StudioResult};
use crate::view::ViewKey;

/// Offset of a label from its image's top-left corner, in pixels.
pub const LABEL_INSET: u32 = 8;

/// Each glyph cell of the 8x8 bitmap font is drawn at this scale.
const LABEL_SCALE: u32 = 2;

/// Grid policy for the composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Pick rows and columns from the image count.
    #[default]
    Auto,
    /// Everything on one row.
    Row,
    /// Fixed 2x2 grid; images past the fourth are dropped.
    Grid2x2,
}

impl Layout {
    /// (columns, rows) for `count` images.
    ///
    /// `Grid2x2` and `Auto` have a fixed capacity (4 and 6); extra images
    /// are truncated, not an error.
    pub fn grid(self, count: usize) -> (u32, u32) {
        let n = u32::try_from(count).unwrap_or(u32::MAX);
        match self {
            Self::Row => (n, 1),
            Self::Grid2x2 => (2, 2),
            Self::Auto => match n {
                0..=3 => (n, 1),
                4 => (2, 2),
                _ => (3, 2),
            },
        }
    }

    /// Most images the layout shows; `None` when unbounded.
    pub fn capacity(self) -> Option<usize> {
        match self {
            Self::Row => None,
            Self::Grid2x2 => Some(4),
            Self::Auto => Some(6),
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Row => "row",
            Self::Grid2x2 => "grid2x2",
        })
    }
}

impl FromStr for Layout {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "row" => Ok(Self::Row),
            "grid2x2" => Ok(Self::Grid2x2),
            other => Err(StudioError::InvalidParameter(format!(
                "unknown layout `{other}` (expected auto, row or grid2x2)"
            ))),
        }
    }
}

/// Drawing options for [`compose`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeOptions {
    pub layout: Layout,
    pub show_labels: bool,
    pub padding: u32,
    pub background: Rgb<u8>,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            layout: Layout::Auto,
            show_labels: true,
            padding: 12,
            background: Rgb([255, 255, 255]),
        }
    }
}

/// Canvas size, as (width, height), for `columns` x `rows` cells of
/// `cell_width` x `cell_height` separated and surrounded by `padding`.
///
/// Fails with `InvalidParameter` when the canvas cannot be addressed:
/// a side past `u32::MAX` or a pixel buffer past `usize::MAX` bytes.
pub fn canvas_size(
    columns: u32,
    rows: u32,
    cell_width: u32,
    cell_height: u32,
    padding: u32,
) -> StudioResult<(u32, u32)> {
    let side = |cells: u32, cell: u32| {
        let gutters = cells.checked_add(1)?.checked_mul(padding)?;
        cells.checked_mul(cell)?.checked_add(gutters)
    };
    let too_large = || {
        StudioError::InvalidParameter(format!(
            "canvas of {columns}x{rows} cells of {cell_width}x{cell_height} with padding {padding} is too large"
        ))
    };

    let width = side(columns, cell_width).ok_or_else(too_large)?;
    let height = side(rows, cell_height).ok_or_else(too_large)?;
    usize::try_from(width)
        .ok()
        .zip(usize::try_from(height).ok())
        .and_then(|(w, h)| w.checked_mul(h)?.checked_mul(3))
        .ok_or_else(too_large)?;
    Ok((width, height))
}

/// Lay `pairs` out row-major on a single canvas, the first pair top-left.
///
/// All images must share the first image's size; nothing is resized.
pub fn compose(pairs: &[(ViewKey, RgbImage)], options: &ComposeOptions) -> StudioResult<RgbImage> {
    let (_, first) = pairs.first().ok_or(StudioError::NoImages)?;
    let (width, height) = first.dimensions();

    for (view, image) in pairs {
        if image.dimensions() != (width, height) {
            return Err(StudioError::ShapeMismatch {
                view: *view,
                expected_width: width,
                expected_height: height,
                actual_width: image.width(),
                actual_height: image.height(),
            });
        }
    }

    let (columns, rows) = options.layout.grid(pairs.len());
    let pad = options.padding;
    let (canvas_width, canvas_height) = canvas_size(columns, rows, width, height, pad)?;
    let mut canvas = RgbImage::from_pixel(canvas_width, canvas_height, options.background);
    let ink = contrasting_ink(options.background);

    let cells = (0..rows).flat_map(|row| (0..columns).map(move |col| (col, row)));
    for ((view, image), (col, row)) in pairs.iter().zip(cells) {
        let x = pad + col * (width + pad);
        let y = pad + row * (height + pad);
        imageops::replace(&mut canvas, image, i64::from(x), i64::from(y));
        if options.show_labels {
            draw_label(
                &mut canvas,
                view.label(),
                x.saturating_add(LABEL_INSET),
                y.saturating_add(LABEL_INSET),
                (x.saturating_add(width), y.saturating_add(height)),
                ink,
            );
        }
    }

    Ok(canvas)
}

/// Black on light backgrounds, white on dark ones.
pub fn contrasting_ink(background: Rgb<u8>) -> Rgb<u8> {
    let [r, g, b] = background.0;
    let luma = 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
    if luma >= 128 * 1000 {
        Rgb([0, 0, 0])
    } else {
        Rgb([255, 255, 255])
    }
}

/// Draw `text` with the 8x8 bitmap font, clipped to `limit` (exclusive).
fn draw_label(canvas: &mut RgbImage, text: &str, x: u32, y: u32, limit: (u32, u32), ink: Rgb<u8>) {
    let advance = 8 * LABEL_SCALE;
    for (i, ch) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(ch) else {
            continue;
        };
        let offset = u32::try_from(i).unwrap_or(u32::MAX).saturating_mul(advance);
        let origin_x = x.saturating_add(offset);
        for (gy, bits) in glyph.iter().enumerate() {
            for gx in 0..8u32 {
                if bits & (1 << gx) == 0 {
                    continue;
                }
                for dy in 0..LABEL_SCALE {
                    for dx in 0..LABEL_SCALE {
                        let px = origin_x.saturating_add(gx * LABEL_SCALE + dx);
                        let py = y.saturating_add(gy as u32 * LABEL_SCALE + dy);
                        if px < limit.0 && py < limit.1 {
                            canvas.put_pixel(px, py, ink);
                        }
                    }
                }
            }
        }
    }
}
