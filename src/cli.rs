//! Command-line arguments shared by the two demo binaries. Running a demo
//! with no arguments reproduces the fixed setup.

use crate::config::{ImageFormat, PipelineConfig};
use clap::Parser;
use std::path::PathBuf;
use tracing::Level;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
pub struct DemoArgs {
    /// Random seed for data generation and centroid initialization.
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Directory the images are written to.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Image format for the saved plots.
    #[arg(long, value_enum, default_value = "png")]
    pub format: ImageFormat,

    /// Print the report without writing images.
    #[arg(long)]
    pub no_plots: bool,

    /// Verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl DemoArgs {
    pub fn config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .seed(self.seed)
            .output_dir(&self.output_dir)
            .image_format(self.format)
            .render_plots(!self.no_plots)
    }

    pub fn init_tracing(&self) -> Result<(), SetGlobalDefaultError> {
        let log_level = if self.verbose { Level::DEBUG } else { Level::INFO };
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_target(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    }
}
