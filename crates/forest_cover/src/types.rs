use geo_types::{Coord, LineString, Polygon};
use image::GrayImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::algorithms::ensemble::ForestClassification;
use crate::algorithms::surface::SurfaceAreaReport;

/// Integer pixel coordinate `[x, y]`
pub type PixelPoint = [i32; 2];

/// How the border contour was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContourSelection {
    /// Largest contour whose area lies in the plausible band
    Plausible,
    /// No contour in the plausible band; the largest one was used (reduced confidence)
    OutOfRange,
    /// No contour at all; inset rectangle
    Fallback,
}

/// Closed, smoothed border polygon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorderContour {
    /// Resampled spline points; first == last
    pub points: Vec<PixelPoint>,
    /// Simplified polygon the spline was fitted through; first == last
    pub simplified: Vec<PixelPoint>,
    pub selection: ContourSelection,
    /// Area of the contour picked from the mask, before hull/simplification
    pub selected_area: f64,
}

impl BorderContour {
    pub fn is_closed(&self) -> bool {
        !self.points.is_empty() && self.points.first() == self.points.last()
    }

    pub fn to_geo_polygon(&self) -> Polygon<f64> {
        Polygon::new(to_line_string(&self.points), vec![])
    }

    /// Area enclosed by the smooth contour in square pixels
    pub fn area(&self) -> f64 {
        use geo::Area;
        self.to_geo_polygon().unsigned_area()
    }

    /// Closed perimeter in pixels
    pub fn perimeter(&self) -> f64 {
        use geo::EuclideanLength;
        let mut ring = to_line_string(&self.points);
        ring.close();
        ring.euclidean_length()
    }
}

pub(crate) fn to_line_string(points: &[PixelPoint]) -> LineString<f64> {
    LineString::new(
        points
            .iter()
            .map(|&[x, y]| Coord { x: x as f64, y: y as f64 })
            .collect(),
    )
}

/// Pixels enclosed by the border
#[derive(Debug, Clone)]
pub struct InteriorMask {
    pub mask: GrayImage,
    pub pixel_count: u64,
    /// Fraction of the image covered, after any repair
    pub coverage_fraction: f64,
    /// Set when the under-fill dilation was applied
    pub repaired: bool,
}

/// Everything the pipeline produces for one image
#[derive(Debug, Clone)]
pub struct ForestAnalysis {
    pub image_width: u32,
    pub image_height: u32,
    pub border_mask: GrayImage,
    pub contour: BorderContour,
    pub interior: InteriorMask,
    pub classification: ForestClassification,
    pub surface: SurfaceAreaReport,
}

impl ForestAnalysis {
    pub fn forest_mask(&self) -> &GrayImage {
        &self.classification.final_mask
    }

    /// Forest pixels as a percentage of interior pixels
    pub fn forest_coverage_percent(&self) -> f64 {
        self.classification.final_coverage
    }
}
