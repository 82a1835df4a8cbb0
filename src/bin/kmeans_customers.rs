use anyhow::{Context, Result};
use clap::Parser;
use customer_segments::cli::DemoArgs;
use customer_segments::{pipeline, plot, report};

fn main() -> Result<()> {
    let args = DemoArgs::parse();
    args.init_tracing()?;
    let config = args.config();

    println!("Generating synthetic customer data (seed {})...", config.seed);
    let outcome = pipeline::run_kmeans(&config).context("K-Means segmentation failed")?;

    println!("\nMissing values per column:");
    print!("{}", report::missing_values(&outcome.dataset));
    print!("{}", report::kmeans_report(&outcome)?);

    if config.render_plots {
        let written = plot::render_kmeans(&config, &outcome)
            .with_context(|| format!("failed to write plots to {}", config.output_dir.display()))?;
        print!("{}", report::saved_files(&written));
    }

    Ok(())
}
