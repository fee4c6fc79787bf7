//! deckhand CLI tool.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "deckhand")]
#[command(about = "Normalize CI environments for deployment tooling", long_about = None)]
struct Cli {
    /// Log filter directive
    #[arg(long, env = "DECKHAND_LOG", default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the configuration and print it
    Config {
        /// Print as JSON instead of KEY=value lines
        #[arg(long)]
        json: bool,
    },
    /// Select cluster credentials for a deployment track
    Kubeconfig {
        /// Deployment track (defaults to the resolved DEFAULT_TRACK)
        #[arg(long)]
        track: Option<String>,
    },
    /// Show which plugins can configure themselves from the environment
    Plugins,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log)?)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Config { json } => {
            commands::config(json)?;
        }
        Commands::Kubeconfig { track } => {
            commands::kubeconfig(track)?;
        }
        Commands::Plugins => {
            commands::plugins()?;
        }
    }

    Ok(())
}
