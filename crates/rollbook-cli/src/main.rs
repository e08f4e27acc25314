//! Rollbook CLI.
//!
//! Attendance and grade analytics over a school star schema.
//!
//! # Quick Start
//!
//! ```bash
//! # Serve the JSON API from ./datasets/clean
//! rollbook serve
//!
//! # Run one query and print JSON
//! rollbook query grades-by-class
//! rollbook query students --search ana --per-page 20
//!
//! # Show the effective configuration
//! rollbook config show --format toml
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::query::{ListingArgs, QueryOp};

/// Rollbook - attendance and grade analytics over a school star schema.
#[derive(Parser)]
#[command(name = "rollbook")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory holding rollbook.toml and relative data paths.
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information.
    Version,

    /// Load the exports and serve the HTTP API.
    Serve {
        /// Address to bind to (overrides server.bind_address).
        #[arg(short, long)]
        bind: Option<String>,

        /// Directory holding the CSV exports (overrides data.dir).
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Disable cross-origin requests.
        #[arg(long)]
        no_cors: bool,
    },

    /// Load the exports, run one query and print the result as JSON.
    Query {
        /// Query to run.
        #[arg(value_enum)]
        op: QueryOp,

        /// Directory holding the CSV exports (overrides data.dir).
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        #[command(flatten)]
        listing: ListingArgs,
    },

    /// Load the exports and print per-table row counts.
    Health {
        /// Directory holding the CSV exports (overrides data.dir).
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },

    /// Configuration commands.
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration.
    Show {
        /// Output format (text, json, toml).
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so query output stays pipeable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            commands::version::run();
            Ok(())
        }
        Commands::Serve {
            bind,
            data_dir,
            no_cors,
        } => commands::serve::run(&cli.project, bind, data_dir, no_cors),
        Commands::Query {
            op,
            data_dir,
            listing,
        } => commands::query::run(&cli.project, data_dir, op, &listing),
        Commands::Health { data_dir } => commands::health::run(&cli.project, data_dir),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show { format } => commands::config::show(&cli.project, &format),
        },
    }
}
