use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::SurfaceConfig;

pub const M2_PER_HECTARE: f64 = 10_000.0;
pub const M2_PER_KM2: f64 = 1_000_000.0;
pub const ACRES_PER_M2: f64 = 0.000247105;

/// Real-world area at a fixed ground resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionArea {
    pub meters_per_pixel: f64,
    pub forest_area_m2: f64,
    pub forest_area_hectares: f64,
    pub forest_area_km2: f64,
    pub forest_area_acres: f64,
}

/// Area of the bordered region. The interior mask is the forest parcel, so its pixel count is
/// reported as the forest area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceAreaReport {
    pub forest_area_pixels: u64,
    pub total_image_pixels: u64,
    /// Share of the whole image, in percent
    pub forest_coverage_percent: f64,
    #[serde(rename = "zoom_18_5_resolution")]
    pub resolution: ResolutionArea,
}

#[derive(Debug, Clone, Default)]
pub struct SurfaceAreaEstimator {
    pub config: SurfaceConfig,
}

impl SurfaceAreaEstimator {
    pub fn new(config: SurfaceConfig) -> Self {
        Self { config }
    }

    pub fn estimate(&self, interior_pixels: u64, width: u32, height: u32) -> SurfaceAreaReport {
        let total_image_pixels = width as u64 * height as u64;
        let forest_coverage_percent = if total_image_pixels == 0 {
            0.0
        } else {
            interior_pixels as f64 / total_image_pixels as f64 * 100.0
        };

        let mpp = self.config.meters_per_pixel;
        let forest_area_m2 = interior_pixels as f64 * (mpp * mpp);
        let report = SurfaceAreaReport {
            forest_area_pixels: interior_pixels,
            total_image_pixels,
            forest_coverage_percent,
            resolution: ResolutionArea {
                meters_per_pixel: mpp,
                forest_area_m2,
                forest_area_hectares: forest_area_m2 / M2_PER_HECTARE,
                forest_area_km2: forest_area_m2 / M2_PER_KM2,
                forest_area_acres: forest_area_m2 * ACRES_PER_M2,
            },
        };

        info!(
            "Surface area at {} m/px: {:.0} m², {:.1} ha, {:.1} acres",
            mpp, report.resolution.forest_area_m2, report.resolution.forest_area_hectares,
            report.resolution.forest_area_acres
        );
        report
    }
}
