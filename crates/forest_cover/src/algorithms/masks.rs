//! Binary mask helpers. Masks are `GrayImage`s holding 0 or 255; any non-zero value counts as set.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

use crate::algorithms::features::FloatChannel;

pub const ON: u8 = 255;

/// Build a mask from a per-pixel predicate
pub fn from_predicate<F>(width: u32, height: u32, mut predicate: F) -> GrayImage
where
    F: FnMut(u32, u32) -> bool,
{
    GrayImage::from_fn(width, height, |x, y| Luma([if predicate(x, y) { ON } else { 0 }]))
}

pub fn count_set(mask: &GrayImage) -> u64 {
    mask.pixels().filter(|p| p[0] > 0).count() as u64
}

pub fn intersect(a: &GrayImage, b: &GrayImage) -> GrayImage {
    from_predicate(a.width(), a.height(), |x, y| {
        a.get_pixel(x, y)[0] > 0 && b.get_pixel(x, y)[0] > 0
    })
}

pub fn union_into(target: &mut GrayImage, other: &GrayImage) {
    for (dst, src) in target.pixels_mut().zip(other.pixels()) {
        if src[0] > 0 {
            dst[0] = ON;
        }
    }
}

/// Percentage of `interior` pixels that are set in `mask`; 0 for an empty interior
pub fn coverage_percent(mask: &GrayImage, interior: &GrayImage) -> f64 {
    let total = count_set(interior);
    if total == 0 {
        return 0.0;
    }
    let inside = mask
        .pixels()
        .zip(interior.pixels())
        .filter(|(m, i)| m[0] > 0 && i[0] > 0)
        .count();
    inside as f64 / total as f64 * 100.0
}

/// Dilate `iterations` times, then erode `iterations` times
pub fn close_iterated(mask: &GrayImage, norm: Norm, radius: u8, iterations: u32) -> GrayImage {
    let mut result = mask.clone();
    for _ in 0..iterations {
        morphology::dilate_mut(&mut result, norm, radius);
    }
    for _ in 0..iterations {
        morphology::erode_mut(&mut result, norm, radius);
    }
    result
}

pub fn dilate_iterated(mask: &GrayImage, norm: Norm, radius: u8, iterations: u32) -> GrayImage {
    let mut result = mask.clone();
    for _ in 0..iterations {
        morphology::dilate_mut(&mut result, norm, radius);
    }
    result
}

/// Grayscale opening of a float channel with a `window`×`window` square
pub fn open_float(channel: &FloatChannel, window: u32) -> FloatChannel {
    let radius = window / 2;
    let eroded = square_filter(channel, radius, f32::min);
    square_filter(&eroded, radius, f32::max)
}

/// Separable min/max filter over the in-bounds part of a square window
fn square_filter(channel: &FloatChannel, radius: u32, pick: fn(f32, f32) -> f32) -> FloatChannel {
    let (width, height) = channel.dimensions();
    let horizontal = FloatChannel::from_fn(width, height, |x, y| {
        let lo = x.saturating_sub(radius);
        let hi = (x + radius).min(width - 1);
        (lo..=hi)
            .map(|xx| channel.get_pixel(xx, y)[0])
            .reduce(pick)
            .map_or(Luma([0.0]), |v| Luma([v]))
    });
    FloatChannel::from_fn(width, height, |x, y| {
        let lo = y.saturating_sub(radius);
        let hi = (y + radius).min(height - 1);
        (lo..=hi)
            .map(|yy| horizontal.get_pixel(x, yy)[0])
            .reduce(pick)
            .map_or(Luma([0.0]), |v| Luma([v]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage_of_half_mask() {
        let interior = from_predicate(10, 10, |_, _| true);
        let mask = from_predicate(10, 10, |x, _| x < 5);
        assert_eq!(coverage_percent(&mask, &interior), 50.0);
    }

    #[test]
    fn test_coverage_ignores_pixels_outside_interior() {
        let interior = from_predicate(10, 10, |x, _| x < 5);
        let mask = from_predicate(10, 10, |_, _| true);
        assert_eq!(coverage_percent(&mask, &interior), 100.0);
    }

    #[test]
    fn test_coverage_of_empty_interior_is_zero() {
        let interior = GrayImage::new(4, 4);
        let mask = from_predicate(4, 4, |_, _| true);
        assert_eq!(coverage_percent(&mask, &interior), 0.0);
    }

    #[test]
    fn test_closing_bridges_small_gap() {
        let mask = from_predicate(40, 11, |x, y| y == 5 && x != 20 && x != 21);
        let closed = close_iterated(&mask, Norm::L2, 3, 2);
        assert_eq!(closed.get_pixel(20, 5)[0], ON);
        assert_eq!(closed.get_pixel(21, 5)[0], ON);
    }

    #[test]
    fn test_float_opening_removes_isolated_peak() {
        let mut channel = FloatChannel::new(9, 9);
        channel.put_pixel(4, 4, Luma([100.0]));
        let opened = open_float(&channel, 5);
        assert!(opened.pixels().all(|p| p[0] == 0.0));
    }

    #[test]
    fn test_float_opening_keeps_wide_plateau() {
        let channel = FloatChannel::from_fn(9, 9, |_, _| Luma([7.0]));
        let opened = open_float(&channel, 5);
        assert!(opened.pixels().all(|p| p[0] == 7.0));
    }
}
