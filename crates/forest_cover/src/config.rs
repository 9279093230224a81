//! Tuned constants for every pipeline stage.
//!
//! All thresholds are empirical. They are grouped per stage so that a single stage can be
//! re-tuned (or tested) without touching algorithm code. Every struct deserializes with
//! `#[serde(default)]`, so a config file only needs the keys it overrides.

use std::fs;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::algorithms::ensemble::VegetationMethod;
use crate::error::{ForestError, Result};

/// Complete configuration of the analysis pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub border: BorderConfig,
    pub contour: ContourConfig,
    pub interior: InteriorConfig,
    pub ensemble: EnsembleConfig,
    pub surface: SurfaceConfig,
    pub render: RenderConfig,
}

impl AnalysisConfig {
    /// Get the JSON schema of the configuration file
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AnalysisConfig)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&fs::read_to_string(path_ref)?),
            Some("json") => Self::from_json(&fs::read_to_string(path_ref)?),
            _ => Err(ForestError::UnsupportedConfigFormat(
                path_ref.display().to_string(),
            )),
        }
    }
}

/// Inclusive per-channel range in 8-bit HSV (H halved into 0..=180)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, h: u8, s: u8, v: u8) -> bool {
        (self.lower[0]..=self.upper[0]).contains(&h)
            && (self.lower[1]..=self.upper[1]).contains(&s)
            && (self.lower[2]..=self.upper[2]).contains(&v)
    }
}

/// White cartographic line detector; the three criteria are OR-ed
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct WhiteLineConfig {
    pub hsv: HsvRange,
    pub hls_min_lightness: u8,
    pub hls_max_saturation: u8,
    pub gray_min: u8,
}

impl Default for WhiteLineConfig {
    fn default() -> Self {
        Self {
            hsv: HsvRange::new([0, 0, 200], [180, 30, 255]),
            hls_min_lightness: 200,
            hls_max_saturation: 40,
            gray_min: 220,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct BorderConfig {
    /// Red, orange and brown hue bands. Red wraps at 0/180, hence two bright-red ranges.
    pub hsv_ranges: Vec<HsvRange>,
    pub rgb_min_red: u8,
    pub rgb_max_green: u8,
    pub rgb_max_blue: u8,
    /// Lower bound on the offset LAB `a` channel
    pub lab_min_a: u8,
    pub include_white_lines: bool,
    pub white: WhiteLineConfig,
    /// Components with area at most this AND extent at most `max_text_extent` are dropped
    pub max_text_area: u32,
    pub max_text_extent: u32,
    pub closing_radius: u8,
    pub closing_iterations: u32,
    pub opening_radius: u8,
    pub edge_reinforcement: bool,
    pub canny_low: f32,
    pub canny_high: f32,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            hsv_ranges: vec![
                HsvRange::new([0, 100, 100], [10, 255, 255]),
                HsvRange::new([170, 100, 100], [180, 255, 255]),
                HsvRange::new([5, 80, 80], [20, 255, 255]),
                HsvRange::new([0, 50, 50], [25, 200, 200]),
            ],
            rgb_min_red: 150,
            rgb_max_green: 100,
            rgb_max_blue: 100,
            lab_min_a: 140,
            include_white_lines: true,
            white: WhiteLineConfig::default(),
            max_text_area: 150,
            max_text_extent: 20,
            closing_radius: 3,
            closing_iterations: 2,
            opening_radius: 1,
            edge_reinforcement: true,
            canny_low: 30.0,
            canny_high: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct ContourConfig {
    #[schemars(range(min = 0.0, max = 1.0))]
    pub min_area_fraction: f64,
    #[schemars(range(min = 0.0, max = 1.0))]
    pub max_area_fraction: f64,
    pub fallback_margin_fraction: f64,
    /// Hull is used only if `hull_area <= contour_area * max_hull_expansion`
    pub max_hull_expansion: f64,
    /// Douglas-Peucker tolerance as a fraction of the closed perimeter
    pub simplify_tolerance_fraction: f64,
    #[schemars(range(min = 1))]
    pub interpolation_factor: usize,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            min_area_fraction: 0.03,
            max_area_fraction: 0.70,
            fallback_margin_fraction: 0.05,
            max_hull_expansion: 1.2,
            simplify_tolerance_fraction: 0.001,
            interpolation_factor: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct InteriorConfig {
    pub closing_radius: u8,
    /// Below this fraction of the image the interior is treated as under-filled
    pub min_coverage_fraction: f64,
    pub repair_radius: u8,
    pub repair_iterations: u32,
}

impl Default for InteriorConfig {
    fn default() -> Self {
        Self {
            closing_radius: 5,
            min_coverage_fraction: 0.6,
            repair_radius: 10,
            repair_iterations: 2,
        }
    }
}

/// Per-method thresholds of the eight vegetation detectors
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct VegetationThresholds {
    pub hsv_green: HsvRange,
    pub dominance_ratio: f32,
    pub dominance_min_green: u8,
    pub lab_max_a: u8,
    pub ndvi_min: f32,
    pub green_excess_min: f32,
    pub hls_min_lightness: u8,
    pub hls_max_lightness: u8,
    pub hls_min_saturation: u8,
    pub hls_min_hue: u8,
    pub hls_max_hue: u8,
    /// Side of the square window used as local-mean estimator
    pub texture_window: u32,
    pub texture_min_std: f32,
    pub texture_max_std: f32,
    pub dark_green_margin: u8,
    pub dark_green_min_green: u8,
}

impl Default for VegetationThresholds {
    fn default() -> Self {
        Self {
            hsv_green: HsvRange::new([25, 30, 30], [95, 255, 255]),
            dominance_ratio: 1.1,
            dominance_min_green: 40,
            lab_max_a: 125,
            ndvi_min: 0.1,
            green_excess_min: 15.0,
            hls_min_lightness: 30,
            hls_max_lightness: 180,
            hls_min_saturation: 20,
            hls_min_hue: 30,
            hls_max_hue: 90,
            texture_window: 5,
            texture_min_std: 8.0,
            texture_max_std: 40.0,
            dark_green_margin: 10,
            dark_green_min_green: 30,
        }
    }
}

/// Fixed voting weights reflecting the empirical reliability of each method
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct MethodWeights {
    pub hsv_enhanced: f64,
    pub green_dominance: f64,
    pub lab_green: f64,
    pub ndvi_enhanced: f64,
    pub green_excess: f64,
    pub hls_vegetation: f64,
    pub texture: f64,
    pub dark_green: f64,
}

impl MethodWeights {
    pub fn weight(&self, method: VegetationMethod) -> f64 {
        match method {
            VegetationMethod::HsvEnhanced => self.hsv_enhanced,
            VegetationMethod::GreenDominance => self.green_dominance,
            VegetationMethod::LabGreen => self.lab_green,
            VegetationMethod::NdviEnhanced => self.ndvi_enhanced,
            VegetationMethod::GreenExcess => self.green_excess,
            VegetationMethod::HlsVegetation => self.hls_vegetation,
            VegetationMethod::Texture => self.texture,
            VegetationMethod::DarkGreen => self.dark_green,
        }
    }
}

impl Default for MethodWeights {
    fn default() -> Self {
        Self {
            hsv_enhanced: 1.5,
            green_dominance: 1.2,
            lab_green: 1.3,
            ndvi_enhanced: 1.4,
            green_excess: 1.0,
            hls_vegetation: 1.1,
            texture: 0.8,
            dark_green: 1.0,
        }
    }
}

/// Open interval of coverage percentages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct CoverageBand {
    pub min: f64,
    pub max: f64,
}

impl CoverageBand {
    pub fn admits(&self, coverage: f64) -> bool {
        coverage > self.min && coverage < self.max
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct EnsembleConfig {
    pub thresholds: VegetationThresholds,
    pub weights: MethodWeights,
    pub weighted_band: CoverageBand,
    /// Fraction of the contributing weight a pixel needs
    pub weighted_vote_fraction: f64,
    pub union_top_k: usize,
    pub union_min_coverage: f64,
    pub majority_band: CoverageBand,
    pub majority_min_methods: usize,
    pub majority_min_votes: f64,
    pub majority_vote_fraction: f64,
    /// Candidates above this coverage have their score multiplied by `penalty_factor`
    pub penalty_coverage: f64,
    pub penalty_factor: f64,
    pub cleanup_open_radius: u8,
    pub cleanup_close_radius: u8,
    pub median_radius: u32,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            thresholds: VegetationThresholds::default(),
            weights: MethodWeights::default(),
            weighted_band: CoverageBand { min: 3.0, max: 90.0 },
            weighted_vote_fraction: 0.4,
            union_top_k: 5,
            union_min_coverage: 10.0,
            majority_band: CoverageBand { min: 5.0, max: 85.0 },
            majority_min_methods: 3,
            majority_min_votes: 2.0,
            majority_vote_fraction: 0.35,
            penalty_coverage: 80.0,
            penalty_factor: 0.5,
            cleanup_open_radius: 1,
            cleanup_close_radius: 2,
            median_radius: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Ground resolution of the source imagery (~1.4 m/pixel at map zoom 18.5)
    #[schemars(range(min = 0.0))]
    pub meters_per_pixel: f64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self { meters_per_pixel: 1.4 }
    }
}

/// Colors are RGB
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub background: [u8; 3],
    pub forest: [u8; 3],
    pub border: [u8; 3],
    pub border_thickness: u32,
    pub marker_radius: i32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            background: [198, 224, 230],
            forest: [58, 145, 58],
            border: [255, 0, 0],
            border_thickness: 4,
            marker_radius: 2,
        }
    }
}
