pub mod geojson;
pub mod render;
pub mod report;

pub use self::geojson::{border_from_geojson_str, BorderProperties};
pub use render::{mosaic_label, render_forest_map, render_mosaic};
pub use report::CoordinatesReport;

use std::path::{Path, PathBuf};

use image::{GrayImage, RgbImage};
use tracing::{debug, info};

use crate::{
    config::RenderConfig,
    diagnostics::MaskCollector,
    error::{ForestError, Result},
    types::ForestAnalysis,
};

/// Output locations for one input image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub map: PathBuf,
    pub border_mask: PathBuf,
    pub debug_mosaic: PathBuf,
    pub json: PathBuf,
    pub text: PathBuf,
    pub csv: PathBuf,
    pub geojson: PathBuf,
}

impl ArtifactPaths {
    pub fn new(output_dir: &Path, base: &str) -> Self {
        let file = |suffix: &str| output_dir.join(format!("{base}_{suffix}"));
        Self {
            map: file("map_final_conservative.png"),
            border_mask: file("border_mask.png"),
            debug_mosaic: file("debug_conservative_methods.png"),
            json: file("border_coordinates_conservative.json"),
            text: file("border_coordinates_conservative.txt"),
            csv: file("border_coordinates_conservative.csv"),
            geojson: file("border_conservative.geojson"),
        }
    }

    /// Base name is the input file stem
    pub fn for_input(output_dir: &Path, input: &Path) -> Self {
        let base = input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Self::new(output_dir, &base)
    }
}

/// Writes the map, reports and (optionally) debug images for an analysis
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    pub render: RenderConfig,
    pub interpolation_factor: usize,
    /// Border mask and method mosaic
    pub write_debug: bool,
}

impl ArtifactWriter {
    pub fn new(render: RenderConfig, interpolation_factor: usize) -> Self {
        Self {
            render,
            interpolation_factor,
            write_debug: true,
        }
    }

    pub fn with_debug(mut self, write_debug: bool) -> Self {
        self.write_debug = write_debug;
        self
    }

    pub fn write(
        &self,
        paths: &ArtifactPaths,
        original: &RgbImage,
        analysis: &ForestAnalysis,
        diagnostics: &MaskCollector,
    ) -> Result<()> {
        let map = render_forest_map(analysis, &self.render);
        save_rgb(&map, &paths.map)?;

        if self.write_debug {
            save_gray(&analysis.border_mask, &paths.border_mask)?;
            let masks: Vec<(&str, &GrayImage)> = diagnostics.iter().collect();
            let mosaic = render_mosaic(original, &masks, &map);
            save_rgb(&mosaic, &paths.debug_mosaic)?;
        }

        let report = CoordinatesReport::from_analysis(analysis, self.interpolation_factor);
        std::fs::write(&paths.json, report.to_json_string()?)?;
        std::fs::write(&paths.text, report.to_text())?;
        std::fs::write(&paths.csv, report.to_csv())?;
        analysis.save_geojson(&paths.geojson)?;

        info!("Artifacts written next to {}", paths.map.display());
        Ok(())
    }
}

fn save_rgb(image: &RgbImage, path: &Path) -> Result<()> {
    debug!("Writing {}", path.display());
    image.save(path).map_err(|source| ForestError::ImageWrite {
        path: path.to_path_buf(),
        source,
    })
}

fn save_gray(image: &GrayImage, path: &Path) -> Result<()> {
    debug!("Writing {}", path.display());
    image.save(path).map_err(|source| ForestError::ImageWrite {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_follow_input_stem() {
        let paths = ArtifactPaths::for_input(Path::new("/out"), Path::new("/data/parcel_12.jpg"));
        assert_eq!(paths.map, PathBuf::from("/out/parcel_12_map_final_conservative.png"));
        assert_eq!(paths.csv, PathBuf::from("/out/parcel_12_border_coordinates_conservative.csv"));
        assert_eq!(paths.geojson, PathBuf::from("/out/parcel_12_border_conservative.geojson"));
    }
}
