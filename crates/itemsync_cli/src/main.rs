//! itemsync CLI
//!
//! Command-line tools for itemsync stores.
//!
//! # Commands
//!
//! - `init` - Create a new store
//! - `inspect` - Display store statistics
//! - `verify` - Replay the journal and report corruption
//! - `dump-journal` - Dump journal frames for debugging
//! - `list` - List an owner's live items
//! - `changes` - Show an owner's change feed

mod commands;

use clap::{Parser, Subcommand};
use commands::OutputFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// itemsync store tools.
#[derive(Parser)]
#[command(name = "itemsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long, env = "ITEMSYNC_PATH")]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new, empty store
    Init,

    /// Display store statistics
    Inspect {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Replay the journal and report corruption without changing it
    Verify,

    /// Dump journal frames for debugging
    DumpJournal {
        /// Maximum number of frames to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List an owner's live items, most recently updated first
    List {
        /// Owner id
        #[arg(short, long)]
        owner: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show everything an owner changed after a version
    Changes {
        /// Owner id
        #[arg(short, long)]
        owner: String,

        /// Last version already seen
        #[arg(short, long, default_value_t = 0)]
        since: u64,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => {
            let path = cli.path.ok_or("Store path required for init")?;
            commands::init::run(&path)?;
        }
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Store path required for inspect")?;
            commands::inspect::run(&path, format)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Store path required for verify")?;
            commands::verify::run(&path)?;
        }
        Commands::DumpJournal { limit, format } => {
            let path = cli.path.ok_or("Store path required for dump-journal")?;
            commands::dump_journal::run(&path, limit, format)?;
        }
        Commands::List { owner, format } => {
            let path = cli.path.ok_or("Store path required for list")?;
            commands::items::list(&path, &owner, format)?;
        }
        Commands::Changes {
            owner,
            since,
            format,
        } => {
            let path = cli.path.ok_or("Store path required for changes")?;
            commands::items::changes(&path, &owner, since, format)?;
        }
        Commands::Version => {
            println!("itemsync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("itemsync core v{}", itemsync_core::VERSION);
        }
    }

    Ok(())
}
