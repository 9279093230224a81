use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    algorithms::{ensemble::FusionStrategy, surface::SurfaceAreaReport},
    error::Result,
    types::{ContourSelection, ForestAnalysis, PixelPoint},
};

pub const DETECTION_METHOD: &str = "conservative_forest_focused_enhanced_border";

const RULE: usize = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub total_points: usize,
    pub original_points: usize,
    pub interpolation_factor: usize,
    pub image_width: u32,
    pub image_height: u32,
    pub contour_area: f64,
    pub contour_perimeter: f64,
    pub forest_coverage_percent: f64,
    pub detection_method: String,
    pub contour_selection: ContourSelection,
    pub interior_repaired: bool,
    pub selected_fusion: FusionStrategy,
    pub zoom_18_5_surface_area: SurfaceAreaReport,
}

/// Border coordinates with their metadata, as written to the JSON artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatesReport {
    pub metadata: ReportMetadata,
    pub border_points: Vec<PixelPoint>,
}

impl CoordinatesReport {
    pub fn from_analysis(analysis: &ForestAnalysis, interpolation_factor: usize) -> Self {
        let contour = &analysis.contour;
        Self {
            metadata: ReportMetadata {
                total_points: contour.points.len(),
                original_points: contour.simplified.len(),
                interpolation_factor,
                image_width: analysis.image_width,
                image_height: analysis.image_height,
                contour_area: contour.area(),
                contour_perimeter: contour.perimeter(),
                forest_coverage_percent: analysis.forest_coverage_percent(),
                detection_method: DETECTION_METHOD.to_string(),
                contour_selection: contour.selection,
                interior_repaired: analysis.interior.repaired,
                selected_fusion: analysis.classification.selected,
                zoom_18_5_surface_area: analysis.surface.clone(),
            },
            border_points: contour.points.clone(),
        }
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Human-readable report with the surface-area section and numbered points
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// `point_id,x,y` with 1-based ids
    pub fn to_csv(&self) -> String {
        let rows: String = self
            .border_points
            .iter()
            .enumerate()
            .map(|(i, [x, y])| format!("{},{},{}\n", i + 1, x, y))
            .collect();
        format!("point_id,x,y\n{rows}")
    }
}

impl fmt::Display for CoordinatesReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.metadata;
        let surface = &m.zoom_18_5_surface_area;
        let res = &surface.resolution;
        let heavy = "=".repeat(RULE);
        let light = "-".repeat(RULE);

        writeln!(f, "{heavy}\nFOREST BORDER COORDINATES\n{heavy}\n")?;
        writeln!(f, "Image dimensions: {} x {} pixels", m.image_width, m.image_height)?;
        writeln!(f, "Total border points: {}", m.total_points)?;
        writeln!(f, "Original contour points: {}", m.original_points)?;
        writeln!(f, "Interpolation factor: {}x", m.interpolation_factor)?;
        writeln!(f, "Contour area: {:.2} pixels²", m.contour_area)?;
        writeln!(f, "Contour perimeter: {:.2} pixels", m.contour_perimeter)?;
        writeln!(f, "Forest coverage: {:.1}%", m.forest_coverage_percent)?;
        writeln!(f, "Contour selection: {}", m.contour_selection)?;
        writeln!(f, "Interior repaired: {}", if m.interior_repaired { "yes" } else { "no" })?;
        writeln!(f, "Selected fusion: {}", m.selected_fusion)?;
        writeln!(f, "Detection method: {}", m.detection_method)?;

        writeln!(f, "\n{heavy}\nGOOGLE MAPS ZOOM 18.5 FOREST SURFACE AREA\n{heavy}\n")?;
        writeln!(f, "Forest area pixels: {}", group_thousands(surface.forest_area_pixels))?;
        writeln!(f, "Total image pixels: {}", group_thousands(surface.total_image_pixels))?;
        writeln!(f, "Forest coverage of image: {:.1}%", surface.forest_coverage_percent)?;
        writeln!(f, "\nGoogle Maps Zoom 18.5 (~{}m/pixel) Forest Area:", res.meters_per_pixel)?;
        writeln!(f, "{}\n", "-".repeat(50))?;
        writeln!(
            f,
            "• {} m² ({:.1}K m²)",
            group_thousands(res.forest_area_m2.round() as u64),
            res.forest_area_m2 / 1000.0
        )?;
        writeln!(f, "• {:.1} hectares", res.forest_area_hectares)?;
        writeln!(f, "• {:.6} km²", res.forest_area_km2)?;
        writeln!(f, "• {:.1} acres", res.forest_area_acres)?;

        writeln!(f, "\n{light}\nCoordinates (x, y):\n{light}\n")?;
        for (i, [x, y]) in self.border_points.iter().enumerate() {
            writeln!(f, "Point {:4}: ({:4}, {:4})", i + 1, x, y)?;
        }
        Ok(())
    }
}

/// `1234567` -> `1,234,567`
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::surface::SurfaceAreaEstimator;

    fn report() -> CoordinatesReport {
        CoordinatesReport {
            metadata: ReportMetadata {
                total_points: 3,
                original_points: 5,
                interpolation_factor: 5,
                image_width: 100,
                image_height: 50,
                contour_area: 1234.5,
                contour_perimeter: 321.0,
                forest_coverage_percent: 42.25,
                detection_method: DETECTION_METHOD.to_string(),
                contour_selection: ContourSelection::OutOfRange,
                interior_repaired: true,
                selected_fusion: FusionStrategy::UnionTop,
                zoom_18_5_surface_area: SurfaceAreaEstimator::default().estimate(2_500, 100, 50),
            },
            border_points: vec![[1, 2], [30, 4], [1, 2]],
        }
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_json_layout() {
        let json: serde_json::Value = serde_json::from_str(&report().to_json_string().unwrap()).unwrap();
        assert_eq!(json["metadata"]["total_points"], 3);
        assert_eq!(json["metadata"]["contour_selection"], "out_of_range");
        assert_eq!(json["metadata"]["selected_fusion"], "union_top");
        assert_eq!(json["metadata"]["zoom_18_5_surface_area"]["forest_area_pixels"], 2_500);
        assert_eq!(
            json["metadata"]["zoom_18_5_surface_area"]["zoom_18_5_resolution"]["meters_per_pixel"],
            1.4
        );
        assert_eq!(json["border_points"][1], serde_json::json!([30, 4]));
    }

    #[test]
    fn test_text_layout() {
        let text = report().to_text();
        assert!(text.contains("Image dimensions: 100 x 50 pixels"));
        assert!(text.contains("Forest coverage: 42.2%") || text.contains("Forest coverage: 42.3%"));
        assert!(text.contains("Forest area pixels: 2,500"));
        assert!(text.contains("• 4,900 m² (4.9K m²)"));
        assert!(text.contains("Point    2: (  30,    4)"));
        assert!(text.contains("Contour selection: out_of_range"));
        assert!(text.starts_with(&"=".repeat(60)));
        assert!(text.ends_with("Point    3: (   1,    2)\n"));
    }

    #[test]
    fn test_csv_is_one_indexed() {
        assert_eq!(report().to_csv(), "point_id,x,y\n1,1,2\n2,30,4\n3,1,2\n");
    }
}
