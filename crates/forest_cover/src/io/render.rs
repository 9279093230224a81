use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{imageops, GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, BresenhamLineIter};

use crate::{
    config::RenderConfig,
    types::{ForestAnalysis, PixelPoint},
};

/// Masks shown in the mosaic after the original image
pub const MOSAIC_MASK_SLOTS: usize = 7;

/// Longest tile label, in characters
pub const LABEL_MAX_CHARS: usize = 15;

/// Label offset from the top-left corner of its tile
const LABEL_OFFSET: (u32, u32) = (10, 12);

const LABEL_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

const GLYPH_SIZE: u32 = 8;

/// Forest fill over a flat background, with the border stroked on top
pub fn render_forest_map(analysis: &ForestAnalysis, config: &RenderConfig) -> RgbImage {
    let forest = analysis.forest_mask();
    let mut map = RgbImage::from_fn(analysis.image_width, analysis.image_height, |x, y| {
        if forest.get_pixel(x, y)[0] > 0 {
            Rgb(config.forest)
        } else {
            Rgb(config.background)
        }
    });
    draw_border(&mut map, &analysis.contour.points, config);
    map
}

/// Closed polyline of `border_thickness`, plus a marker at every point
pub fn draw_border(canvas: &mut RgbImage, points: &[PixelPoint], config: &RenderConfig) {
    let color = Rgb(config.border);
    let radius = (config.border_thickness / 2) as i32;

    for (i, &[x0, y0]) in points.iter().enumerate() {
        let [x1, y1] = points[(i + 1) % points.len()];
        for (x, y) in BresenhamLineIter::new((x0 as f32, y0 as f32), (x1 as f32, y1 as f32)) {
            draw_filled_circle_mut(canvas, (x, y), radius, color);
        }
    }
    for &[x, y] in points {
        draw_filled_circle_mut(canvas, (x, y), config.marker_radius, color);
    }
}

pub fn mask_to_rgb(mask: &GrayImage) -> RgbImage {
    RgbImage::from_fn(mask.width(), mask.height(), |x, y| {
        let v = mask.get_pixel(x, y)[0];
        Rgb([v, v, v])
    })
}

/// `"4_ndvi_enhanced"` -> `"4 Ndvi Enhanced"`, cut to [`LABEL_MAX_CHARS`]
pub fn mosaic_label(name: &str) -> String {
    let mut previous_alphabetic = false;
    name.chars()
        .map(|c| {
            let c = if c == '_' { ' ' } else { c };
            let cased = if !c.is_alphabetic() {
                c
            } else if previous_alphabetic {
                c.to_ascii_lowercase()
            } else {
                c.to_ascii_uppercase()
            };
            previous_alphabetic = c.is_alphabetic();
            cased
        })
        .take(LABEL_MAX_CHARS)
        .collect()
}

/// Draw `text` in an 8×8 bitmap font with its top-left corner at `origin`, clipped to `clip`
/// (`x, y, width, height`). Characters without a glyph are left blank.
pub fn draw_label(
    canvas: &mut RgbImage,
    text: &str,
    origin: (u32, u32),
    clip: (u32, u32, u32, u32),
    color: Rgb<u8>,
) {
    let (clip_x, clip_y, clip_w, clip_h) = clip;
    let right = (clip_x + clip_w).min(canvas.width());
    let bottom = (clip_y + clip_h).min(canvas.height());

    for (i, c) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(c) else {
            continue;
        };
        let left = origin.0 + i as u32 * GLYPH_SIZE;
        for (row, &bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if bits & (1u8 << col) == 0 {
                    continue;
                }
                let (x, y) = (left + col, origin.1 + row as u32);
                if x >= clip_x && x < right && y >= clip_y && y < bottom {
                    canvas.put_pixel(x, y, color);
                }
            }
        }
    }
}

/// 3×3 grid of image-sized tiles: the original, up to seven named masks, and the final map in
/// the last tile, each labeled in its top-left corner. Unused tiles stay black and unlabeled.
pub fn render_mosaic(
    original: &RgbImage,
    masks: &[(&str, &GrayImage)],
    final_map: &RgbImage,
) -> RgbImage {
    let (width, height) = original.dimensions();
    let mut mosaic = RgbImage::new(width * 3, height * 3);
    let place = |mosaic: &mut RgbImage, tile: &RgbImage, label: &str, slot: u32| {
        let (x, y) = ((slot % 3) * width, (slot / 3) * height);
        imageops::replace(mosaic, tile, x as i64, y as i64);
        let origin = (x + LABEL_OFFSET.0, y + LABEL_OFFSET.1);
        draw_label(mosaic, label, origin, (x, y, width, height), LABEL_COLOR);
    };

    place(&mut mosaic, original, "Original", 0);
    for (i, (name, mask)) in masks.iter().take(MOSAIC_MASK_SLOTS).enumerate() {
        place(&mut mosaic, &mask_to_rgb(mask), &mosaic_label(name), i as u32 + 1);
    }
    place(&mut mosaic, final_map, "Final Result", 8);
    mosaic
}
