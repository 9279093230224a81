pub mod builder;

use image::RgbImage;
use tracing::{info, info_span};

use crate::{
    algorithms::{features::FeatureChannels, surface::SurfaceAreaEstimator},
    config::AnalysisConfig,
    diagnostics::NoDiagnostics,
    error::{ForestError, Result},
    traits::{BorderDetector, ContourResolver, DiagnosticsSink, ForestClassifier, InteriorBuilder},
    types::ForestAnalysis,
};

/// Smallest accepted width and height
pub const MIN_IMAGE_SIDE: u32 = 2;

/// Border extraction followed by ensemble classification, one image at a time
pub struct Pipeline {
    config: AnalysisConfig,
    border_detector: Box<dyn BorderDetector>,
    contour_resolver: Box<dyn ContourResolver>,
    interior_builder: Box<dyn InteriorBuilder>,
    classifier: Box<dyn ForestClassifier>,
    surface: SurfaceAreaEstimator,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    pub fn new(
        config: AnalysisConfig,
        border_detector: Box<dyn BorderDetector>,
        contour_resolver: Box<dyn ContourResolver>,
        interior_builder: Box<dyn InteriorBuilder>,
        classifier: Box<dyn ForestClassifier>,
    ) -> Self {
        let surface = SurfaceAreaEstimator::new(config.surface.clone());
        Self {
            config,
            border_detector,
            contour_resolver,
            interior_builder,
            classifier,
            surface,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn process(&self, image: &RgbImage) -> Result<ForestAnalysis> {
        self.process_with_diagnostics(image, &mut NoDiagnostics)
    }

    /// Run every stage, handing intermediate masks to `diagnostics`
    pub fn process_with_diagnostics(
        &self,
        image: &RgbImage,
        diagnostics: &mut dyn DiagnosticsSink,
    ) -> Result<ForestAnalysis> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ForestError::EmptyImage { width, height });
        }
        if width < MIN_IMAGE_SIDE || height < MIN_IMAGE_SIDE {
            return Err(ForestError::ImageTooSmall {
                width,
                height,
                min: MIN_IMAGE_SIDE,
            });
        }
        let _span = info_span!("analysis", width, height).entered();

        let features = FeatureChannels::extract(image);

        info!("Detecting border markings");
        let border_mask = self.border_detector.detect_border(&features)?;

        let contour = self.contour_resolver.resolve_contour(&border_mask)?;
        let interior = self.interior_builder.build_interior(&contour, width, height)?;

        info!("Classifying forest inside the border");
        let classification = self.classifier.classify(&features, &interior, diagnostics)?;

        let surface = self.surface.estimate(interior.pixel_count, width, height);

        Ok(ForestAnalysis {
            image_width: width,
            image_height: height,
            border_mask,
            contour,
            interior,
            classification,
            surface,
        })
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        format!(
            "Pipeline: border colors {}, white lines {}, edge reinforcement {}, {} m/px",
            self.config.border.hsv_ranges.len(),
            if self.config.border.include_white_lines { "on" } else { "off" },
            if self.config.border.edge_reinforcement { "on" } else { "off" },
            self.config.surface.meters_per_pixel
        )
    }
}
