use crate::{
    algorithms::{
        ColorBorderDetector, EnsembleForestClassifier, FilledInteriorBuilder, SplineContourResolver,
    },
    config::AnalysisConfig,
    pipeline::Pipeline,
    traits::{BorderDetector, ContourResolver, ForestClassifier, InteriorBuilder},
};

/// Builder for creating analysis pipelines with a fluent API.
///
/// Stages that are not set explicitly are built from the configuration at `build` time.
pub struct PipelineBuilder {
    config: AnalysisConfig,
    border_detector: Option<Box<dyn BorderDetector>>,
    contour_resolver: Option<Box<dyn ContourResolver>>,
    interior_builder: Option<Box<dyn InteriorBuilder>>,
    classifier: Option<Box<dyn ForestClassifier>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: AnalysisConfig::default(),
            border_detector: None,
            contour_resolver: None,
            interior_builder: None,
            classifier: None,
        }
    }

    /// Replace the configuration used for the default stages and the surface estimate
    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// Ground resolution used for the surface estimate
    pub fn with_meters_per_pixel(mut self, meters_per_pixel: f64) -> Self {
        self.config.surface.meters_per_pixel = meters_per_pixel;
        self
    }

    pub fn with_white_lines(mut self, enabled: bool) -> Self {
        self.config.border.include_white_lines = enabled;
        self
    }

    /// Set the border detector (replaces any existing one)
    pub fn set_border_detector<D>(mut self, detector: D) -> Self
    where
        D: BorderDetector + 'static,
    {
        self.border_detector = Some(Box::new(detector));
        self
    }

    /// Set the contour resolver (replaces any existing one)
    pub fn set_contour_resolver<R>(mut self, resolver: R) -> Self
    where
        R: ContourResolver + 'static,
    {
        self.contour_resolver = Some(Box::new(resolver));
        self
    }

    /// Set the interior builder (replaces any existing one)
    pub fn set_interior_builder<I>(mut self, builder: I) -> Self
    where
        I: InteriorBuilder + 'static,
    {
        self.interior_builder = Some(Box::new(builder));
        self
    }

    /// Set the forest classifier (replaces any existing one)
    pub fn set_classifier<C>(mut self, classifier: C) -> Self
    where
        C: ForestClassifier + 'static,
    {
        self.classifier = Some(Box::new(classifier));
        self
    }

    /// Build the pipeline with default components if not specified
    pub fn build(self) -> Pipeline {
        let config = self.config;

        let border_detector = self
            .border_detector
            .unwrap_or_else(|| Box::new(ColorBorderDetector::new(config.border.clone())));
        let contour_resolver = self
            .contour_resolver
            .unwrap_or_else(|| Box::new(SplineContourResolver::new(config.contour.clone())));
        let interior_builder = self
            .interior_builder
            .unwrap_or_else(|| Box::new(FilledInteriorBuilder::new(config.interior.clone())));
        let classifier = self
            .classifier
            .unwrap_or_else(|| Box::new(EnsembleForestClassifier::new(config.ensemble.clone())));

        Pipeline::new(config, border_detector, contour_resolver, interior_builder, classifier)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
