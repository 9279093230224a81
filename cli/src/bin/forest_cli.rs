use std::path::PathBuf;

use clap::Parser;
use cli::{run_batch, BatchOptions};
use color_eyre::eyre::{bail, Result};
use forest_cover::{AnalysisConfig, Pipeline};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

/// Forest border extraction and forest cover classification for map screenshots
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input images
    #[arg(required_unless_present = "print_config_schema")]
    images: Vec<PathBuf>,

    /// Analysis configuration (.toml or .json); defaults are used for missing fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the generated artifacts
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Skip the border mask and the method mosaic
    #[arg(long)]
    skip_debug: bool,

    /// Ground resolution in meters per pixel (overrides the configuration)
    #[arg(long)]
    meters_per_pixel: Option<f64>,

    /// Ignore white line markings when detecting the border
    #[arg(long)]
    no_white_lines: bool,

    /// Write the per-image batch summary as JSON to this file
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Print the JSON schema of the configuration file and exit
    #[arg(long)]
    print_config_schema: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    if cli.print_config_schema {
        println!("{}", serde_json::to_string_pretty(&AnalysisConfig::schema())?);
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            AnalysisConfig::from_file(path)?
        }
        None => AnalysisConfig::default(),
    };

    let mut builder = Pipeline::builder().with_config(config);
    if let Some(mpp) = cli.meters_per_pixel {
        if mpp <= 0.0 {
            bail!("--meters-per-pixel must be positive, got {}", mpp);
        }
        builder = builder.with_meters_per_pixel(mpp);
    }
    if cli.no_white_lines {
        builder = builder.with_white_lines(false);
    }
    let pipeline = builder.build();
    info!("{}", pipeline.info());

    let options = BatchOptions {
        output_dir: cli.output_dir,
        write_debug: !cli.skip_debug,
    };
    let summary = run_batch(&pipeline, &cli.images, &options)?;

    info!("🎉 {} of {} images processed", summary.succeeded.len(), cli.images.len());
    for image in &summary.succeeded {
        info!(
            "  {}: {:.1}% forest, {:.1} ha ({})",
            image.input.display(),
            image.forest_coverage_percent,
            image.forest_area_hectares,
            image.contour_selection
        );
    }
    for (path, reason) in &summary.failed {
        warn!("  {} failed: {}", path.display(), reason);
    }

    if let Some(path) = &cli.summary_json {
        summary.to_json_file(path)?;
        info!("Summary written to {}", path.display());
    }

    Ok(())
}
