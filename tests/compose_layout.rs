//! Canvas geometry of the composer across layouts and image counts.

use image::{Rgb, RgbImage};
use shoe_multiview::compose::{compose, ComposeOptions, Layout};
use shoe_multiview::{StudioError, ViewKey};

const W: u32 = 32;
const H: u32 = 24;

fn pairs(n: usize) -> Vec<(ViewKey, RgbImage)> {
    // six slots over five keys: the sixth repeats the first key
    (0..n)
        .map(|i| {
            let view = ViewKey::ALL[i % ViewKey::ALL.len()];
            (view, RgbImage::from_pixel(W, H, Rgb([i as u8 * 40, 0, 0])))
        })
        .collect()
}

fn expected(layout: Layout, n: u32, pad: u32) -> (u32, u32) {
    let (cols, rows) = match layout {
        Layout::Row => (n, 1),
        Layout::Grid2x2 => (2, 2),
        Layout::Auto if n <= 3 => (n, 1),
        Layout::Auto if n == 4 => (2, 2),
        Layout::Auto => (3, 2),
    };
    (cols * W + pad * (cols + 1), rows * H + pad * (rows + 1))
}

#[test]
fn test_canvas_dimensions_for_every_layout_and_count() {
    for layout in [Layout::Row, Layout::Grid2x2, Layout::Auto] {
        for n in 1..=6 {
            for pad in [0, 12] {
                let options = ComposeOptions {
                    layout,
                    padding: pad,
                    ..ComposeOptions::default()
                };
                let canvas = compose(&pairs(n), &options).unwrap();
                assert_eq!(
                    canvas.dimensions(),
                    expected(layout, n as u32, pad),
                    "layout {layout}, n = {n}, pad = {pad}"
                );
            }
        }
    }
}

#[test]
fn test_compose_empty_is_no_images() {
    let err = compose(&[], &ComposeOptions::default()).unwrap_err();
    assert!(matches!(err, StudioError::NoImages));
}

#[test]
fn test_auto_places_second_row() {
    let options = ComposeOptions {
        layout: Layout::Auto,
        show_labels: false,
        padding: 4,
        background: Rgb([255, 255, 255]),
    };
    let canvas = compose(&pairs(5), &options).unwrap();
    // fifth image: row 1, column 1
    let x = 4 + (W + 4);
    let y = 4 + (H + 4);
    assert_eq!(canvas.get_pixel(x, y).0, [160, 0, 0]);
    // sixth cell is empty
    assert_eq!(canvas.get_pixel(4 + 2 * (W + 4), y).0, [255, 255, 255]);
}

#[test]
fn test_background_fills_padding() {
    let options = ComposeOptions {
        layout: Layout::Row,
        show_labels: false,
        padding: 3,
        background: Rgb([10, 20, 30]),
    };
    let canvas = compose(&pairs(2), &options).unwrap();
    assert_eq!(canvas.get_pixel(0, 0).0, [10, 20, 30]);
    assert_eq!(canvas.get_pixel(3 + W + 1, 5).0, [10, 20, 30]);
}
