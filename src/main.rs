use anyhow::Result;
use clap::Parser;
use mosaic_batch::cli::{Command, RootArgs};
use mosaic_batch::config::{MergeConfig, MosaicConfig};
use mosaic_batch::merge::run_merge;
use mosaic_batch::mosaic::run_mosaic;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = RootArgs::parse();
    match cli.command {
        Command::Mosaic(args) => {
            let config = MosaicConfig::from_args(&args)?;
            let report = run_mosaic(&config)?;
            if args.json {
                println!("{}", report.to_json()?);
            }
        }
        Command::Merge(args) => {
            let config = MergeConfig::from_args(&args)?;
            let report = run_merge(&config)?;
            if args.json {
                println!("{}", report.to_json()?);
            }
        }
    }
    Ok(())
}
