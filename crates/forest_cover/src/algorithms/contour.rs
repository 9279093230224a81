use geo::{Area, ConvexHull, EuclideanLength, Simplify};
use geo_types::{LineString, Polygon};
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use tracing::{debug, info, warn};

use crate::{
    algorithms::spline::smooth_closed_ring,
    config::ContourConfig,
    error::Result,
    traits::ContourResolver,
    types::{to_line_string, BorderContour, ContourSelection, PixelPoint},
};

/// Picks the most plausible border contour, bridges gaps with its hull, simplifies it and
/// smooths it with a periodic spline
#[derive(Debug, Clone, Default)]
pub struct SplineContourResolver {
    pub config: ContourConfig,
}

impl SplineContourResolver {
    pub fn new(config: ContourConfig) -> Self {
        Self { config }
    }

    /// Outermost outer borders of the mask
    pub fn external_contours(mask: &GrayImage) -> Vec<Vec<PixelPoint>> {
        find_contours::<i32>(mask)
            .into_iter()
            .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
            .map(|contour| contour.points.iter().map(|p| [p.x, p.y]).collect())
            .collect()
    }

    /// Inset rectangle used when the mask yields no contour at all
    pub fn fallback_rectangle(&self, width: u32, height: u32) -> Vec<PixelPoint> {
        let margin = (self.config.fallback_margin_fraction * width.min(height) as f64) as i32;
        let (w, h) = (width as i32, height as i32);
        vec![
            [margin, margin],
            [w - margin, margin],
            [w - margin, h - margin],
            [margin, h - margin],
        ]
    }

    /// Largest contour in the plausible area band, else the largest overall, else the fallback
    /// rectangle. Ties keep the earliest contour.
    pub fn select_contour(
        &self,
        contours: Vec<Vec<PixelPoint>>,
        width: u32,
        height: u32,
    ) -> (Vec<PixelPoint>, ContourSelection, f64) {
        let image_area = width as f64 * height as f64;
        let min_area = self.config.min_area_fraction * image_area;
        let max_area = self.config.max_area_fraction * image_area;

        let mut plausible: Option<(usize, f64)> = None;
        let mut largest: Option<(usize, f64)> = None;
        for (i, contour) in contours.iter().enumerate() {
            let area = ring_area(contour);
            if largest.map_or(true, |(_, best)| area > best) {
                largest = Some((i, area));
            }
            if (min_area..=max_area).contains(&area) && plausible.map_or(true, |(_, best)| area > best) {
                plausible = Some((i, area));
            }
        }

        let (index, area, selection) = match (plausible, largest) {
            (Some((i, area)), _) => (i, area, ContourSelection::Plausible),
            (None, Some((i, area))) => {
                warn!(
                    "No contour within {:.0}%-{:.0}% of the image; using the largest ({:.0} px²), results may be less accurate",
                    self.config.min_area_fraction * 100.0,
                    self.config.max_area_fraction * 100.0,
                    area
                );
                (i, area, ContourSelection::OutOfRange)
            }
            (None, None) => {
                warn!("No border contour found; falling back to inset rectangle");
                let rectangle = self.fallback_rectangle(width, height);
                let area = ring_area(&rectangle);
                return (rectangle, ContourSelection::Fallback, area);
            }
        };

        let mut contours = contours;
        (contours.swap_remove(index), selection, area)
    }

    /// Convex hull if it expands the contour by no more than `max_hull_expansion`, else the
    /// contour itself. The result is a closed ring.
    pub fn bridge_gaps(&self, contour: &[PixelPoint]) -> LineString<f64> {
        let mut ring = to_line_string(contour);
        ring.close();

        let contour_area = Polygon::new(ring.clone(), vec![]).unsigned_area();
        let hull = ring.convex_hull();
        let hull_area = hull.unsigned_area();

        if hull_area <= contour_area * self.config.max_hull_expansion {
            debug!("Using convex hull ({:.0} px² vs {:.0} px²)", hull_area, contour_area);
            hull.exterior().clone()
        } else {
            ring
        }
    }

    /// Douglas-Peucker with a perimeter-proportional tolerance; returns a closed ring without
    /// consecutive duplicates
    pub fn simplify(&self, working: &LineString<f64>) -> Vec<PixelPoint> {
        let mut ring = working.clone();
        ring.close();
        let epsilon = self.config.simplify_tolerance_fraction * ring.euclidean_length();
        let simplified = ring.simplify(&epsilon);

        let mut points: Vec<PixelPoint> = Vec::with_capacity(simplified.0.len() + 1);
        for coord in simplified.coords() {
            let point = [coord.x.round() as i32, coord.y.round() as i32];
            if points.last() != Some(&point) {
                points.push(point);
            }
        }
        if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
            if first != last {
                points.push(first);
            }
        }
        points
    }
}

impl ContourResolver for SplineContourResolver {
    fn resolve_contour(&self, border_mask: &GrayImage) -> Result<BorderContour> {
        let (width, height) = border_mask.dimensions();
        let contours = Self::external_contours(border_mask);
        debug!("Found {} external contours", contours.len());

        let (selected, selection, selected_area) = self.select_contour(contours, width, height);
        info!(
            "Selected contour area: {:.0} px² (image area {})",
            selected_area,
            width as u64 * height as u64
        );

        let working = self.bridge_gaps(&selected);
        let simplified = self.simplify(&working);
        let points = smooth_closed_ring(&simplified, self.config.interpolation_factor);
        info!("Interpolated {} points to {} points", simplified.len(), points.len());

        Ok(BorderContour {
            points,
            simplified,
            selection,
            selected_area,
        })
    }
}

fn ring_area(points: &[PixelPoint]) -> f64 {
    Polygon::new(to_line_string(points), vec![]).unsigned_area()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
    use imageproc::rect::Rect;

    fn ring_mask(width: u32, height: u32, rect: Rect) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        draw_hollow_rect_mut(&mut mask, rect, Luma([255]));
        mask
    }

    #[test]
    fn test_empty_mask_falls_back_to_inset_rectangle() {
        let resolver = SplineContourResolver::default();
        let contour = resolver.resolve_contour(&GrayImage::new(100, 100)).unwrap();

        assert_eq!(contour.selection, ContourSelection::Fallback);
        assert_eq!(contour.selected_area, 90.0 * 90.0);
        assert!(contour.is_closed());
        assert_eq!(contour.points.len(), contour.simplified.len() * 5);
        for corner in [[5, 5], [95, 5], [95, 95], [5, 95]] {
            assert!(contour.simplified.contains(&corner), "missing corner {:?}", corner);
        }
    }

    #[test]
    fn test_fallback_uses_shorter_dimension() {
        let resolver = SplineContourResolver::default();
        assert_eq!(
            resolver.fallback_rectangle(200, 100),
            vec![[5, 5], [195, 5], [195, 95], [5, 95]]
        );
    }

    #[test]
    fn test_plausible_contour_is_selected() {
        let mask = ring_mask(100, 100, Rect::at(10, 10).of_size(81, 81));
        let contour = SplineContourResolver::default().resolve_contour(&mask).unwrap();

        assert_eq!(contour.selection, ContourSelection::Plausible);
        assert_eq!(contour.selected_area, 80.0 * 80.0);
        assert!(contour.is_closed());
        assert_eq!(contour.points.len(), contour.simplified.len() * 5);
    }

    #[test]
    fn test_largest_plausible_contour_wins_over_larger_implausible() {
        // first one covers ~95% of the image
        let contours = vec![
            vec![[2, 2], [197, 2], [197, 197], [2, 197]],
            vec![[20, 20], [80, 20], [80, 80], [20, 80]],
            vec![[100, 100], [180, 100], [180, 180], [100, 180]],
        ];
        let (selected, selection, area) =
            SplineContourResolver::default().select_contour(contours, 200, 200);
        assert_eq!(selection, ContourSelection::Plausible);
        assert_eq!(area, 6400.0);
        assert_eq!(selected[0], [100, 100]);
    }

    #[test]
    fn test_only_tiny_contours_are_out_of_range() {
        let mut mask = GrayImage::new(200, 200);
        draw_filled_rect_mut(&mut mask, Rect::at(10, 10).of_size(12, 12), Luma([255]));
        let contour = SplineContourResolver::default().resolve_contour(&mask).unwrap();
        assert_eq!(contour.selection, ContourSelection::OutOfRange);
        assert!(contour.is_closed());
    }

    #[test]
    fn test_hull_rejected_for_concave_shape() {
        // thin L shape: hull is far larger than the contour
        let l_shape = vec![[0, 0], [100, 0], [100, 5], [5, 5], [5, 100], [0, 100]];
        let working = SplineContourResolver::default().bridge_gaps(&l_shape);
        assert_eq!(working.0.len(), l_shape.len() + 1);
        assert!(working.is_closed());
    }

    #[test]
    fn test_hull_adopted_for_nearly_convex_shape() {
        let notched = vec![[0, 0], [50, 0], [52, 3], [54, 0], [100, 0], [100, 100], [0, 100]];
        let working = SplineContourResolver::default().bridge_gaps(&notched);
        // notch vertex disappears
        assert!(!working.coords().any(|c| c.x == 52.0 && c.y == 3.0));
    }

    #[test]
    fn test_simplify_removes_collinear_points_and_closes() {
        let line: Vec<PixelPoint> = (0..=50)
            .map(|x| [x, 0])
            .chain((0..=50).map(|y| [50, y]))
            .chain((0..=50).rev().map(|x| [x, 50]))
            .chain((0..=50).rev().map(|y| [0, y]))
            .collect();
        let simplified = SplineContourResolver::default().simplify(&to_line_string(&line));
        assert_eq!(simplified.first(), simplified.last());
        assert_eq!(simplified.len(), 5);
    }
}
