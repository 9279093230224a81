use std::path::Path;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ForestError, Result},
    types::{ContourSelection, ForestAnalysis, PixelPoint},
};

/// Properties attached to the border feature
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[schemars(description = "Properties of the extracted forest border")]
pub struct BorderProperties {
    #[schemars(description = "Area enclosed by the border in square pixels")]
    pub area: f64,
    #[schemars(description = "Border length in pixels")]
    pub perimeter: f64,
    pub point_count: usize,
    #[schemars(description = "Forest pixels as a percentage of the enclosed pixels")]
    pub forest_coverage_percent: f64,
    pub contour_selection: ContourSelection,
}

impl ForestAnalysis {
    /// Border polygon in pixel coordinates, with image size as foreign members
    pub fn to_geojson(&self) -> Result<FeatureCollection> {
        let ring: Vec<Vec<f64>> = self
            .contour
            .points
            .iter()
            .map(|&[x, y]| vec![x as f64, y as f64])
            .collect();
        let geometry = Geometry::new(Value::Polygon(vec![ring]));

        let properties = BorderProperties {
            area: self.contour.area(),
            perimeter: self.contour.perimeter(),
            point_count: self.contour.points.len(),
            forest_coverage_percent: self.forest_coverage_percent(),
            contour_selection: self.contour.selection,
        };
        let properties = match serde_json::to_value(properties)? {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        };

        let mut foreign_members = JsonObject::new();
        foreign_members.insert("image_width".to_string(), self.image_width.into());
        foreign_members.insert("image_height".to_string(), self.image_height.into());

        Ok(FeatureCollection {
            bbox: None,
            features: vec![Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties,
                foreign_members: None,
            }],
            foreign_members: Some(foreign_members),
        })
    }

    pub fn to_geojson_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_geojson()?)?)
    }

    pub fn save_geojson<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_geojson_string()?)?;
        Ok(())
    }
}

/// Border points and properties from a collection written by `to_geojson`
pub fn border_from_geojson_str(content: &str) -> Result<(Vec<PixelPoint>, BorderProperties)> {
    let collection: FeatureCollection = content.parse()?;
    let feature = collection
        .features
        .first()
        .ok_or_else(|| ForestError::InvalidBorder("no features".to_string()))?;

    let ring = match feature.geometry.as_ref().map(|g| &g.value) {
        Some(Value::Polygon(rings)) => rings
            .first()
            .ok_or_else(|| ForestError::InvalidBorder("polygon has no exterior ring".to_string()))?,
        _ => return Err(ForestError::InvalidBorder("expected a polygon".to_string())),
    };
    let points = ring
        .iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok([x.round() as i32, y.round() as i32]),
            _ => Err(ForestError::InvalidBorder("position with fewer than two coordinates".to_string())),
        })
        .collect::<Result<Vec<_>>>()?;

    let properties = feature
        .properties
        .clone()
        .ok_or_else(|| ForestError::InvalidBorder("missing properties".to_string()))?;
    let properties: BorderProperties = serde_json::from_value(serde_json::Value::Object(properties))?;

    Ok((points, properties))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_polygon() {
        let content = r#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"Point","coordinates":[1.0,2.0]},"properties":{}}]}"#;
        assert!(matches!(
            border_from_geojson_str(content),
            Err(ForestError::InvalidBorder(_))
        ));
    }

    #[test]
    fn test_properties_schema_lists_selection_outcomes() {
        let schema = serde_json::to_string(&schemars::schema_for!(BorderProperties))
            .expect("Should serialize schema");
        for selection in ["plausible", "out_of_range", "fallback"] {
            assert!(schema.contains(selection), "schema lacks {selection}");
        }
    }

    #[test]
    fn test_rejects_empty_collection() {
        let content = r#"{"type":"FeatureCollection","features":[]}"#;
        assert!(matches!(
            border_from_geojson_str(content),
            Err(ForestError::InvalidBorder(_))
        ));
    }
}
