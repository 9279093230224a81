use std::collections::HashMap;

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::region_labelling::{connected_components, Connectivity};
use tracing::debug;

use crate::{
    algorithms::{features::FeatureChannels, masks},
    config::BorderConfig,
    error::Result,
    traits::BorderDetector,
};

/// Detects red/orange/brown (and optionally white) cartographic border markings
#[derive(Debug, Clone, Default)]
pub struct ColorBorderDetector {
    pub config: BorderConfig,
}

impl ColorBorderDetector {
    pub fn new(config: BorderConfig) -> Self {
        Self { config }
    }

    /// Union of the HSV hue bands, the RGB red test and the LAB `a` test
    pub fn red_candidates(&self, features: &FeatureChannels) -> GrayImage {
        let cfg = &self.config;
        let (width, height) = features.dimensions();
        masks::from_predicate(width, height, |x, y| {
            let (h, s, v) = (
                features.hsv_h.get_pixel(x, y)[0],
                features.hsv_s.get_pixel(x, y)[0],
                features.hsv_v.get_pixel(x, y)[0],
            );
            if cfg.hsv_ranges.iter().any(|range| range.contains(h, s, v)) {
                return true;
            }

            let rgb_red = features.red.get_pixel(x, y)[0] >= cfg.rgb_min_red
                && features.green.get_pixel(x, y)[0] <= cfg.rgb_max_green
                && features.blue.get_pixel(x, y)[0] <= cfg.rgb_max_blue;

            rgb_red || features.lab_a.get_pixel(x, y)[0] >= cfg.lab_min_a
        })
    }

    /// Bright, low-saturation pixels: HSV band OR HLS test OR raw intensity
    pub fn white_candidates(&self, features: &FeatureChannels) -> GrayImage {
        let white = &self.config.white;
        let (width, height) = features.dimensions();
        masks::from_predicate(width, height, |x, y| {
            let hsv_white = white.hsv.contains(
                features.hsv_h.get_pixel(x, y)[0],
                features.hsv_s.get_pixel(x, y)[0],
                features.hsv_v.get_pixel(x, y)[0],
            );
            let hls_white = features.hls_l.get_pixel(x, y)[0] > white.hls_min_lightness
                && features.hls_s.get_pixel(x, y)[0] < white.hls_max_saturation;
            let gray_white = features.gray.get_pixel(x, y)[0] >= white.gray_min;

            hsv_white || hls_white || gray_white
        })
    }

    /// Drop components that are both small and compact (text labels); keep large OR elongated ones
    pub fn remove_text_blobs(&self, candidates: &GrayImage) -> GrayImage {
        let (width, height) = candidates.dimensions();
        match masks::count_set(candidates) {
            0 => return GrayImage::new(width, height),
            // a lone pixel is a component of area and extent 1
            1 if self.config.max_text_area >= 1 && self.config.max_text_extent >= 1 => {
                return GrayImage::new(width, height);
            }
            1 => return candidates.clone(),
            _ => {}
        }

        let labeled = connected_components(candidates, Connectivity::Eight, Luma([0u8]));

        // label -> (min_x, min_y, max_x, max_y, area)
        let mut regions: HashMap<u32, (u32, u32, u32, u32, u32)> = HashMap::new();
        for (x, y, label) in labeled.enumerate_pixels() {
            let label = label[0];
            if label == 0 {
                continue;
            }
            regions
                .entry(label)
                .and_modify(|(min_x, min_y, max_x, max_y, area)| {
                    *min_x = (*min_x).min(x);
                    *min_y = (*min_y).min(y);
                    *max_x = (*max_x).max(x);
                    *max_y = (*max_y).max(y);
                    *area += 1;
                })
                .or_insert((x, y, x, y, 1));
        }

        let keep: HashMap<u32, bool> = regions
            .iter()
            .map(|(&label, &(min_x, min_y, max_x, max_y, area))| {
                let extent = (max_x - min_x + 1).max(max_y - min_y + 1);
                let is_text = area <= self.config.max_text_area && extent <= self.config.max_text_extent;
                (label, !is_text)
            })
            .collect();

        debug!(
            "Border components: {} total, {} kept",
            regions.len(),
            keep.values().filter(|&&k| k).count()
        );

        masks::from_predicate(width, height, |x, y| {
            let label = labeled.get_pixel(x, y)[0];
            label != 0 && keep.get(&label).copied().unwrap_or(false)
        })
    }

    /// Bridge dashed segments, thin them back, then confirm with edges
    pub fn connect_segments(&self, cleaned: &GrayImage, gray: &GrayImage) -> GrayImage {
        let cfg = &self.config;
        let mut connected =
            masks::close_iterated(cleaned, Norm::L2, cfg.closing_radius, cfg.closing_iterations);
        imageproc::morphology::open_mut(&mut connected, Norm::L1, cfg.opening_radius);

        if cfg.edge_reinforcement {
            let edges = imageproc::edges::canny(gray, cfg.canny_low, cfg.canny_high);
            let confirmed = masks::intersect(&edges, &connected);
            masks::union_into(&mut connected, &confirmed);
        }

        connected
    }
}

impl BorderDetector for ColorBorderDetector {
    fn detect_border(&self, features: &FeatureChannels) -> Result<GrayImage> {
        let mut candidates = self.red_candidates(features);
        if self.config.include_white_lines {
            masks::union_into(&mut candidates, &self.white_candidates(features));
        }

        let cleaned = self.remove_text_blobs(&candidates);
        let connected = self.connect_segments(&cleaned, &features.gray);

        debug!(
            "Border mask: {} candidate px, {} after cleanup, {} connected",
            masks::count_set(&candidates),
            masks::count_set(&cleaned),
            masks::count_set(&connected)
        );

        Ok(connected)
    }
}
