use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::{
    algorithms::{
        features::{FeatureChannels, FloatChannel},
        masks,
    },
    config::VegetationThresholds,
};

/// The eight independent pixel-level vegetation detectors, in evaluation order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    Serialize, Deserialize,
    Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VegetationMethod {
    /// Broad green hue band in HSV
    HsvEnhanced,
    /// Green exceeds red and blue by a relative margin
    GreenDominance,
    /// Green side of the LAB `a` opponent channel
    LabGreen,
    /// Normalized green/red difference
    NdviEnhanced,
    /// Green excess index
    GreenExcess,
    /// Moderate lightness and saturation in a green hue band
    HlsVegetation,
    /// Moderate local texture typical of canopy
    Texture,
    /// Shadowed canopy: green exceeds red and blue by absolute margins
    DarkGreen,
}

impl VegetationMethod {
    /// Human readable name
    pub fn label(&self) -> &'static str {
        match self {
            Self::HsvEnhanced => "HSV Enhanced",
            Self::GreenDominance => "Green Dominance",
            Self::LabGreen => "LAB Green",
            Self::NdviEnhanced => "NDVI Enhanced",
            Self::GreenExcess => "Green Excess",
            Self::HlsVegetation => "HLS Vegetation",
            Self::Texture => "Texture",
            Self::DarkGreen => "Dark Green",
        }
    }

    /// Candidate mask over the whole image
    pub fn detect(&self, f: &FeatureChannels, t: &VegetationThresholds) -> GrayImage {
        let (width, height) = f.dimensions();
        let px = |channel: &GrayImage, x: u32, y: u32| channel.get_pixel(x, y)[0];

        match self {
            Self::HsvEnhanced => masks::from_predicate(width, height, |x, y| {
                t.hsv_green.contains(px(&f.hsv_h, x, y), px(&f.hsv_s, x, y), px(&f.hsv_v, x, y))
            }),
            Self::GreenDominance => masks::from_predicate(width, height, |x, y| {
                let (r, g, b) = (px(&f.red, x, y) as f32, px(&f.green, x, y) as f32, px(&f.blue, x, y) as f32);
                g > r * t.dominance_ratio
                    && g > b * t.dominance_ratio
                    && g > t.dominance_min_green as f32
            }),
            Self::LabGreen => masks::from_predicate(width, height, |x, y| {
                px(&f.lab_a, x, y) <= t.lab_max_a
            }),
            Self::NdviEnhanced => masks::from_predicate(width, height, |x, y| {
                f.ndvi.get_pixel(x, y)[0] > t.ndvi_min
            }),
            Self::GreenExcess => masks::from_predicate(width, height, |x, y| {
                f.green_excess.get_pixel(x, y)[0] > t.green_excess_min
            }),
            Self::HlsVegetation => masks::from_predicate(width, height, |x, y| {
                let (h, l, s) = (px(&f.hls_h, x, y), px(&f.hls_l, x, y), px(&f.hls_s, x, y));
                l > t.hls_min_lightness
                    && l < t.hls_max_lightness
                    && s > t.hls_min_saturation
                    && (t.hls_min_hue..=t.hls_max_hue).contains(&h)
            }),
            Self::Texture => {
                let deviation = local_deviation(&f.gray, t.texture_window);
                masks::from_predicate(width, height, |x, y| {
                    let std = deviation.get_pixel(x, y)[0];
                    std > t.texture_min_std && std < t.texture_max_std
                })
            }
            Self::DarkGreen => masks::from_predicate(width, height, |x, y| {
                let (r, g, b) = (px(&f.red, x, y) as u16, px(&f.green, x, y) as u16, px(&f.blue, x, y) as u16);
                let margin = t.dark_green_margin as u16;
                g > r + margin && g > b + margin && g > t.dark_green_min_green as u16
            }),
        }
    }
}

/// Local standard deviation estimate; grayscale openings stand in for local means
pub fn local_deviation(gray: &GrayImage, window: u32) -> FloatChannel {
    let values = FloatChannel::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([gray.get_pixel(x, y)[0] as f32])
    });
    let mean = masks::open_float(&values, window);

    let squared = FloatChannel::from_fn(gray.width(), gray.height(), |x, y| {
        let diff = values.get_pixel(x, y)[0] - mean.get_pixel(x, y)[0];
        Luma([diff * diff])
    });
    let mut deviation = masks::open_float(&squared, window);
    for pixel in deviation.pixels_mut() {
        pixel[0] = pixel[0].sqrt();
    }
    deviation
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use strum::IntoEnumIterator;

    fn detect_uniform(method: VegetationMethod, color: [u8; 3]) -> u64 {
        let image = RgbImage::from_pixel(8, 8, Rgb(color));
        let features = FeatureChannels::extract(&image);
        masks::count_set(&method.detect(&features, &VegetationThresholds::default()))
    }

    #[test]
    fn test_method_order_and_names() {
        let names: Vec<String> = VegetationMethod::iter().map(|m| m.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "hsv_enhanced", "green_dominance", "lab_green", "ndvi_enhanced",
                "green_excess", "hls_vegetation", "texture", "dark_green"
            ]
        );
        assert_eq!(VegetationMethod::NdviEnhanced.label(), "NDVI Enhanced");
    }

    #[test]
    fn test_forest_green_triggers_color_methods() {
        let forest = [34, 139, 34];
        for method in VegetationMethod::iter().filter(|m| *m != VegetationMethod::Texture) {
            assert_eq!(detect_uniform(method, forest), 64, "{} should fire", method);
        }
        assert_eq!(detect_uniform(VegetationMethod::Texture, forest), 0);
    }

    #[test]
    fn test_neutral_gray_triggers_nothing() {
        for method in VegetationMethod::iter() {
            assert_eq!(detect_uniform(method, [100, 100, 100]), 0, "{} should not fire", method);
        }
    }

    #[test]
    fn test_dark_green_catches_shadowed_canopy() {
        // too dark for the HSV value floor, still green dominant
        let shadow = [10, 28, 12];
        assert_eq!(detect_uniform(VegetationMethod::HsvEnhanced, shadow), 0);
        assert_eq!(detect_uniform(VegetationMethod::DarkGreen, [10, 35, 12]), 64);
    }

    #[test]
    fn test_dark_green_margin_does_not_wrap() {
        assert_eq!(detect_uniform(VegetationMethod::DarkGreen, [250, 252, 10]), 0);
    }

    #[test]
    fn test_opening_deviation_vanishes() {
        // every window holds its own minimum, which the opening preserves, so the second
        // opening sees a zero in every window
        let mut state = 12345u32;
        let image = RgbImage::from_fn(40, 40, |_, _| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let level = (state >> 16) as u8;
            Rgb([level, level, level])
        });
        let features = FeatureChannels::extract(&image);
        assert!(local_deviation(&features.gray, 5).pixels().all(|p| p[0] == 0.0));
        assert_eq!(
            masks::count_set(&VegetationMethod::Texture.detect(&features, &VegetationThresholds::default())),
            0
        );
    }
}
