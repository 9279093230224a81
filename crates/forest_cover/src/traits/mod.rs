use image::GrayImage;
use crate::{
    algorithms::{ensemble::ForestClassification, features::FeatureChannels},
    error::Result,
    types::{BorderContour, InteriorMask},
};

/// Trait for border candidate detection
pub trait BorderDetector: Send + Sync {
    /// Produce a binary mask of pixels plausibly belonging to the cartographic border
    fn detect_border(&self, features: &FeatureChannels) -> Result<GrayImage>;
}

/// Trait for turning a border mask into a single closed contour
pub trait ContourResolver: Send + Sync {
    fn resolve_contour(&self, border_mask: &GrayImage) -> Result<BorderContour>;
}

/// Trait for filling a contour into the interior mask
pub trait InteriorBuilder: Send + Sync {
    fn build_interior(&self, contour: &BorderContour, width: u32, height: u32) -> Result<InteriorMask>;
}

/// Trait for forest/non-forest classification inside the interior
pub trait ForestClassifier: Send + Sync {
    fn classify(
        &self,
        features: &FeatureChannels,
        interior: &InteriorMask,
        diagnostics: &mut dyn DiagnosticsSink,
    ) -> Result<ForestClassification>;
}

/// Receiver of intermediate masks.
///
/// Producers must check `wants_masks` before building anything that only exists for
/// diagnostics.
pub trait DiagnosticsSink {
    fn wants_masks(&self) -> bool;

    fn record_mask(&mut self, name: &str, mask: &GrayImage);
}
