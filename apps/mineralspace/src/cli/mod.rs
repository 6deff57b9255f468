//! # MineralSpace CLI Module
//!
//! This module implements the CLI interface for MineralSpace.
//!
//! ## Available Commands
//!
//! - `serve` - Start the HTTP server
//! - `resolve` - Resolve an identifier (fetching from Wikidata on a miss)
//! - `show` - Print a persisted reference (store only)
//! - `list` - List persisted references
//! - `seed` - Insert curated references from a JSON file
//! - `init` - Initialize a new database
//! - `status` - Show reference counts

mod commands;

use crate::config::{Backend, Config};
use clap::{Parser, Subcommand};
use mineralspace_core::MineralError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// MineralSpace - mineral reference catalog
///
/// Serves curated mineral references and resolves `wikidata:` identifiers
/// on first use, persisting each one exactly once.
#[derive(Parser, Debug)]
#[command(name = "mineralspace")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML config file (default: ./mineralspace.toml if present)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the reference database (overrides the config file)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend (overrides the config file)
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Resolve a mineral identifier, fetching it from Wikidata on a miss
    Resolve {
        /// Mineral identifier, e.g. `wikidata:Q43010` or a curated id
        id: String,
    },

    /// Show a persisted reference without any network access
    Show {
        /// Mineral identifier
        id: String,
    },

    /// List persisted references
    List,

    /// Insert curated references from a JSON array file
    Seed {
        /// Path to the input file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Show reference counts
    Status,
}

impl Cli {
    /// Load the config file and apply CLI overrides.
    pub fn effective_config(&self) -> Result<Config, MineralError> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        Ok(config)
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), MineralError> {
    let mut config = cli.effective_config()?;
    let json_mode = cli.json_mode;

    if cli.verbose {
        tracing::info!(
            database = %config.database.display(),
            backend = ?config.backend,
            wikidata = %config.wikidata.api_url,
            "Effective configuration"
        );
    }

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_serve(&config).await
        }
        Some(Commands::Resolve { id }) => cmd_resolve(&config, json_mode, &id).await,
        Some(Commands::Show { id }) => cmd_show(&config, json_mode, &id),
        Some(Commands::List) => cmd_list(&config, json_mode),
        Some(Commands::Seed { file }) => cmd_seed(&config, json_mode, &file),
        Some(Commands::Init { force }) => cmd_init(&config, force),
        Some(Commands::Status) | None => cmd_status(&config, json_mode),
    }
}
