use std::path::{Path, PathBuf};

use forest_cover::{
    ArtifactPaths, ArtifactWriter, ForestAnalysis, ForestError, MaskCollector, NoDiagnostics,
    Pipeline,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, info_span, warn};

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("{}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: ForestError,
    },
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}

/// Where and what to write for each input
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub output_dir: PathBuf,
    /// Border mask and method mosaic
    pub write_debug: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            write_debug: true,
        }
    }
}

/// Per-input outcome of a batch run
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImageSummary {
    pub input: PathBuf,
    pub forest_coverage_percent: f64,
    pub forest_area_hectares: f64,
    pub forest_area_acres: f64,
    pub contour_selection: String,
}

#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub succeeded: Vec<ImageSummary>,
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn to_json(&self) -> Result<String, BatchError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_json_file(&self, path: &Path) -> Result<(), BatchError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Analyse one image and write its artifacts
pub fn process_image(
    pipeline: &Pipeline,
    writer: &ArtifactWriter,
    input: &Path,
    output_dir: &Path,
) -> Result<ForestAnalysis, BatchError> {
    let wrap = |source: ForestError| BatchError::Image {
        path: input.to_path_buf(),
        source,
    };

    let image = image::open(input)
        .map_err(|err| wrap(ForestError::from(err)))?
        .to_rgb8();

    let mut collector = MaskCollector::new();
    let analysis = if writer.write_debug {
        pipeline.process_with_diagnostics(&image, &mut collector)
    } else {
        pipeline.process_with_diagnostics(&image, &mut NoDiagnostics)
    }
    .map_err(wrap)?;

    let paths = ArtifactPaths::for_input(output_dir, input);
    writer.write(&paths, &image, &analysis, &collector).map_err(wrap)?;
    Ok(analysis)
}

/// Process every input in order. A failing input is logged and skipped.
pub fn run_batch(pipeline: &Pipeline, inputs: &[PathBuf], options: &BatchOptions) -> Result<BatchSummary, BatchError> {
    std::fs::create_dir_all(&options.output_dir)?;

    let config = pipeline.config();
    let writer = ArtifactWriter::new(config.render.clone(), config.contour.interpolation_factor)
        .with_debug(options.write_debug);

    let mut summary = BatchSummary::default();
    for input in inputs {
        let _span = info_span!("image", path = %input.display()).entered();
        info!("Processing {}", input.display());

        match process_image(pipeline, &writer, input, &options.output_dir) {
            Ok(analysis) => {
                let area = &analysis.surface.resolution;
                info!(
                    "✅ Forest coverage {:.1}%, {:.1} ha ({:.1} acres)",
                    analysis.forest_coverage_percent(),
                    area.forest_area_hectares,
                    area.forest_area_acres
                );
                summary.succeeded.push(ImageSummary {
                    input: input.clone(),
                    forest_coverage_percent: analysis.forest_coverage_percent(),
                    forest_area_hectares: area.forest_area_hectares,
                    forest_area_acres: area.forest_area_acres,
                    contour_selection: analysis.contour.selection.to_string(),
                });
            }
            Err(err) => {
                error!("❌ {}", err);
                summary.failed.push((input.clone(), err.to_string()));
            }
        }
    }

    if !summary.all_succeeded() {
        warn!("{} of {} images failed", summary.failed.len(), inputs.len());
    }
    Ok(summary)
}
