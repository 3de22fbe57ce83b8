//! Scrap Bastion - Development Tools

use std::path::PathBuf;

use bastion_tools::data_dir::DataSet;
use bastion_tools::scenario::{run_scenario, verify_replay, Scenario};
use bastion_tools::{offline, validate, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bastion-tools")]
#[command(about = "Development tools for Scrap Bastion")]
struct Cli {
    /// Data directory with catalog.ron / balance.ron; built-ins when omitted
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Path to data directory
        #[arg(default_value = "assets/data")]
        path: PathBuf,
    },
    /// Write the built-in catalog and balance as RON
    ExportCatalog {
        /// Output directory
        #[arg(default_value = "assets/data")]
        out: PathBuf,
    },
    /// Run a scenario headlessly and print a JSON report
    Simulate {
        /// Scenario file (RON)
        scenario: PathBuf,
        /// Save the recorded replay here
        #[arg(long)]
        record: Option<PathBuf>,
        /// Override the scenario seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Play back a replay and check its final hash
    VerifyReplay {
        /// Replay file
        replay: PathBuf,
    },
    /// Estimate offline earnings
    Offline {
        /// Hours away
        #[arg(long, default_value_t = 8.0)]
        hours: f64,
        /// Saved snapshot (.ron or bincode); a fresh game when omitted
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
}

fn run(cli: Cli) -> Result<bool> {
    let data_dir = cli.data.as_deref();
    match cli.command {
        Commands::Validate { path } => {
            tracing::info!("Validating data files in: {}", path.display());
            let report = validate::validate_data_directory(&path)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(report.is_ok())
        }
        Commands::ExportCatalog { out } => {
            for path in DataSet::load(data_dir)?.export(&out)? {
                tracing::info!("Wrote {}", path.display());
            }
            Ok(true)
        }
        Commands::Simulate { scenario, record, seed } => {
            let mut scenario = Scenario::load(&scenario)?;
            if let Some(seed) = seed {
                scenario.seed = seed;
            }
            let run = run_scenario(&scenario, &DataSet::load(data_dir)?)?;
            if let Some(path) = record {
                run.replay.save(&path)?;
                tracing::info!("Replay saved to {}", path.display());
            }
            println!("{}", serde_json::to_string_pretty(&run.report)?);
            Ok(true)
        }
        Commands::VerifyReplay { replay } => {
            let ticks = verify_replay(&replay, &DataSet::load(data_dir)?)?;
            tracing::info!("Replay verified over {ticks} ticks");
            Ok(true)
        }
        Commands::Offline { hours, snapshot } => {
            let estimate = offline::estimate_for(
                snapshot.as_deref(),
                &DataSet::load(data_dir)?,
                hours * 3600.0,
            )?;
            println!("{}", serde_json::to_string_pretty(&estimate)?);
            Ok(true)
        }
    }
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => {
            tracing::error!("Validation failed");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    }
}
