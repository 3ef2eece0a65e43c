//! `glake` command line.

use clap::{ArgAction, Parser, Subcommand};
use glake_model::{RetreatSeries, RunConfig};
use glake_runner::Pipeline;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "glake", version, about = "Future glacial lakes from glacier retreat projections")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process every glacier under the data root
    Run {
        /// YAML run configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the data root
        #[arg(long)]
        data_root: Option<PathBuf>,

        /// Override the output root
        #[arg(long)]
        output_root: Option<PathBuf>,

        /// Only process these glaciers (repeatable)
        #[arg(long = "glacier")]
        glaciers: Vec<String>,
    },
    /// Print the sampled retreat series of one model output file as JSON
    Series {
        csv: PathBuf,

        /// YAML run configuration supplying the sampling
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<RunConfig, glake_model::ModelError> {
    match path {
        Some(p) => RunConfig::from_file(p),
        None => Ok(RunConfig::default()),
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Run {
            config,
            data_root,
            output_root,
            glaciers,
        } => {
            let mut config = load_config(config.as_ref())?;
            if let Some(root) = data_root {
                config.data_root = root;
            }
            if output_root.is_some() {
                config.output_root = output_root;
            }

            let summary = Pipeline::new(config).run(&glaciers)?;
            if summary.glaciers == 0 {
                tracing::warn!("No glacier directories found");
            }
        }
        Command::Series { csv, config } => {
            let config = load_config(config.as_ref())?;
            let series = RetreatSeries::from_csv(&csv, &config.sampling)?;
            println!("{}", serde_json::to_string_pretty(&series)?);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
