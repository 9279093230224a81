pub mod features;
pub mod masks;
pub mod border;
pub mod spline;
pub mod contour;
pub mod interior;
pub mod ensemble;
pub mod surface;

pub use features::{FeatureChannels, FloatChannel};
pub use border::ColorBorderDetector;
pub use spline::{smooth_closed_ring, PeriodicSpline};
pub use contour::SplineContourResolver;
pub use interior::FilledInteriorBuilder;
pub use ensemble::{
    EnsembleForestClassifier, ForestClassification, FusionResult, FusionStrategy, MethodResult,
    VegetationMethod,
};
pub use surface::{SurfaceAreaEstimator, SurfaceAreaReport};
