use anodet::cli::{Cli, Command};
use anodet::{filter, flatten, pivot, regression, score_bins, thresholds};
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    match args.command {
        Command::Flatten {
            base_dir,
            output_csv,
            scratch_dir,
            keep_scratch,
            jobs,
        } => {
            let opts = flatten::FlattenOptions {
                base_dir,
                output_csv,
                scratch_dir,
                keep_scratch,
                jobs,
            };
            // Per-category failures are reported, never fatal
            let summary = flatten::run(&opts)?;
            if !summary.failed.is_empty() {
                println!(
                    "{} of {} categories failed and were excluded",
                    summary.failed.len(),
                    summary.categories
                );
            }
        }
        Command::Thresholds {
            input_csv,
            columns,
            output_csv,
        } => thresholds::run(&input_csv, &columns, &output_csv)?,
        Command::Bins {
            input_csv,
            column,
            threshold,
            output_dir,
        } => score_bins::run(&input_csv, column.as_str(), threshold, &output_dir)?,
        Command::Pivot {
            input_csv,
            output_dir,
            dist_threshold,
            diff_threshold,
        } => pivot::run(&input_csv, &output_dir, dist_threshold, diff_threshold)?,
        Command::Filter {
            input_csv,
            config,
            output_dir,
        } => filter::run(&input_csv, &config, &output_dir)?,
        Command::Regress {
            input_csv,
            output_dir,
            trees,
            seed,
            residual_sigma,
        } => {
            let opts = regression::RegressOptions {
                trees,
                seed,
                residual_sigma,
                ..Default::default()
            };
            regression::run(&input_csv, output_dir.as_deref(), &opts)?;
        }
    }

    Ok(())
}
