//! mapcontract CLI

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use mapcontract::scenario;
use mapcontract::{ContractRegistry, Value, VerificationMode, VerifyConfig};

#[derive(Parser)]
#[command(name = "mapcontract", version, about = "Contract verification for map-like containers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every operation with its preconditions and postconditions
    Catalog {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Run the reference scenarios against a verified map
    Scenarios {
        /// TOML verification config (defaults to enforced)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Catalog { json } => print_catalog(json),
        Command::Scenarios { config, json } => run_scenarios(config, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn print_catalog(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = ContractRegistry::<Value, Value>::standard().catalog();
    if json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
    } else {
        print!("{catalog}");
    }
    Ok(())
}

fn run_scenarios(config: Option<PathBuf>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config {
        Some(path) => VerifyConfig::from_file(&path)?,
        None => VerifyConfig::new().mode(VerificationMode::Enforced),
    };

    let reports = scenario::run_all(config);
    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!("{report}");
        }
    }

    let failed = reports.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        return Err(format!("{failed} of {} scenarios failed", reports.len()).into());
    }
    if !json {
        println!("\nall {} scenarios passed ({} verification)", reports.len(), config.mode);
    }
    Ok(())
}
