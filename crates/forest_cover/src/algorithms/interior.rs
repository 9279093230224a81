use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use tracing::{info, warn};

use crate::{
    algorithms::masks,
    config::InteriorConfig,
    error::Result,
    traits::InteriorBuilder,
    types::{BorderContour, InteriorMask, PixelPoint},
};

/// Fills the contour and repairs under-filled results by dilation
#[derive(Debug, Clone, Default)]
pub struct FilledInteriorBuilder {
    pub config: InteriorConfig,
}

impl FilledInteriorBuilder {
    pub fn new(config: InteriorConfig) -> Self {
        Self { config }
    }

    /// Rasterize the polygon. The closing vertex and consecutive duplicates are dropped because
    /// the fill routine rejects an explicitly closed polygon.
    pub fn fill(points: &[PixelPoint], width: u32, height: u32) -> GrayImage {
        let mut mask = GrayImage::new(width, height);

        let mut polygon: Vec<Point<i32>> = Vec::with_capacity(points.len());
        for &[x, y] in points {
            let point = Point::new(x, y);
            if polygon.last() != Some(&point) {
                polygon.push(point);
            }
        }
        while polygon.len() > 1 && polygon.first() == polygon.last() {
            polygon.pop();
        }

        match polygon.as_slice() {
            [] => {}
            [single] => {
                if single.x >= 0 && single.y >= 0 && (single.x as u32) < width && (single.y as u32) < height {
                    mask.put_pixel(single.x as u32, single.y as u32, Luma([masks::ON]));
                }
            }
            _ => draw_polygon_mut(&mut mask, &polygon, Luma([masks::ON])),
        }
        mask
    }
}

impl InteriorBuilder for FilledInteriorBuilder {
    fn build_interior(&self, contour: &BorderContour, width: u32, height: u32) -> Result<InteriorMask> {
        let cfg = &self.config;
        let filled = Self::fill(&contour.points, width, height);
        let mut mask = masks::close_iterated(&filled, Norm::L2, cfg.closing_radius, 1);

        let image_pixels = (width as u64 * height as u64).max(1) as f64;
        let mut pixel_count = masks::count_set(&mask);
        let mut coverage_fraction = pixel_count as f64 / image_pixels;
        info!("Inside mask covers {:.1}% of image", coverage_fraction * 100.0);

        let repaired = coverage_fraction < cfg.min_coverage_fraction;
        if repaired {
            warn!("Inside mask coverage seems low, expanding");
            mask = masks::dilate_iterated(&mask, Norm::L2, cfg.repair_radius, cfg.repair_iterations);
            pixel_count = masks::count_set(&mask);
            coverage_fraction = pixel_count as f64 / image_pixels;
            info!("Expanded inside mask now covers {:.1}% of image", coverage_fraction * 100.0);
        }

        Ok(InteriorMask {
            mask,
            pixel_count,
            coverage_fraction,
            repaired,
        })
    }
}
