use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mgmt_core::{Registry, RegistryConfig};
use mgmt_repl::EditModeChoice;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "MGMT_LOG";

/// mgmt - Interactive console for managed objects
#[derive(Parser, Debug)]
#[command(name = "mgmt")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Force vi editing mode
    #[arg(long, conflicts_with = "emacs")]
    vi: bool,

    /// Force emacs editing mode
    #[arg(long)]
    emacs: bool,

    /// Start with an empty registry instead of the demo objects
    #[arg(long)]
    no_demo: bool,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let edit_mode = if args.vi {
        EditModeChoice::Vi
    } else if args.emacs {
        EditModeChoice::Emacs
    } else {
        EditModeChoice::Detect
    };

    let config = match RegistryConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };
    let registry = Arc::new(Registry::new(config));

    if !args.no_demo {
        match mgmt_repl::demo::install(&registry) {
            Ok(names) => tracing::info!(count = names.len(), "demo objects registered"),
            Err(e) => {
                eprintln!("Error: {}", mgmt_repl::commands::format_mgmt_error(&e));
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = mgmt_repl::run(registry, edit_mode) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
