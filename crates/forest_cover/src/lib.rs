//! # Forest Cover Analysis Library
//!
//! Extracts the hand-drawn or cartographic border of a forest parcel from a map screenshot and
//! classifies the pixels inside it as forest or non-forest.
//!
//! ## Core Features
//!
//! - **Border Extraction**: Red/orange/brown (and optionally white) markings are cleaned of text
//!   labels, bridged across dashes and turned into one smooth closed contour
//! - **Ensemble Classification**: Eight vegetation detectors fused by weighted, top-union and
//!   majority voting, with a penalty on over-inclusive results
//! - **Surface Area**: Enclosed area in m², hectares, km² and acres at a fixed ground resolution
//! - **Artifacts**: Map rendering, debug mosaic, JSON/TXT/CSV coordinates and GeoJSON export
//! - **Trait-based Pipeline**: Swap any stage by implementing its trait
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use forest_cover::Pipeline;
//!
//! let pipeline = Pipeline::builder().build();
//!
//! let image = image::open("parcel.png")?.to_rgb8();
//! let analysis = pipeline.process(&image)?;
//!
//! println!("Forest coverage: {:.1}%", analysis.forest_coverage_percent());
//! analysis.save_geojson("parcel_border.geojson")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Custom Pipeline
//!
//! ```rust,no_run
//! use forest_cover::{config::AnalysisConfig, algorithms::*, Pipeline};
//!
//! let config = AnalysisConfig::from_file("forest.toml")?;
//! let pipeline = Pipeline::builder()
//!     .with_config(config)
//!     .with_white_lines(false)
//!     .set_contour_resolver(SplineContourResolver::default())
//!     .build();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod config;
pub mod types;
pub mod traits;
pub mod diagnostics;
pub mod algorithms;
pub mod pipeline;
pub mod io;

pub use error::{ForestError, Result};
pub use config::AnalysisConfig;
pub use types::{BorderContour, ContourSelection, ForestAnalysis, InteriorMask, PixelPoint};
pub use traits::*;
pub use diagnostics::{MaskCollector, NoDiagnostics};
pub use pipeline::{builder::PipelineBuilder, Pipeline};
pub use io::{ArtifactPaths, ArtifactWriter, CoordinatesReport};
