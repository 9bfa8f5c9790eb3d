use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use datapipe::config::RunConfig;
use datapipe::locate::Locator;
use datapipe::pipeline::Pipeline;
use datapipe::sink::run_to_sink;
use datapipe::logging;

#[derive(Parser)]
#[command(name = "datapipe")]
#[command(about = "Lazy ETL pipeline over date-partitioned file hierarchies")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline described by a TOML config file
    Run {
        /// Path to the run configuration
        config: PathBuf,
    },
    /// List the files the pipeline would process, without reading them
    ListFiles {
        /// Path to the run configuration
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            let config = RunConfig::load(&config)?;
            let params = config.to_params()?;

            match &config.out_file {
                Some(out) => {
                    info!(out = %out.display(), "running pipeline to sink");
                    let written = run_to_sink(&params, None, out)?;
                    info!(records = written, "pipeline finished");
                    println!("{} records written to {}", written, out.display());
                }
                None => {
                    // No sink configured: records go to stdout as they come.
                    let stream = Pipeline::run(&params)?;
                    let mut count = 0u64;
                    for record in stream {
                        match record {
                            Ok(line) => {
                                println!("{line}");
                                count += 1;
                            }
                            Err(e) => {
                                error!("Pipeline failed: {}", e);
                                return Err(e.into());
                            }
                        }
                    }
                    info!(records = count, "pipeline finished");
                }
            }
        }
        Commands::ListFiles { config } => {
            let config = RunConfig::load(&config)?;
            let params = config.to_params()?;
            let locator = Locator::new(
                params.top_dirs.clone(),
                params.exclusions.clone(),
                &params.file_patterns,
                false,
            )?;
            let mut count = 0u64;
            for path in locator {
                let path = path?;
                println!("{}", path.display());
                count += 1;
            }
            println!("{count} files matched");
        }
    }
    Ok(())
}
