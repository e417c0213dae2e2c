//! Duramap CLI
//!
//! Command-line tools for inspecting and editing Duramap storage.
//!
//! # Commands
//!
//! - `dump` - Print every entry of a map
//! - `get` / `set` / `remove` - Read or change one entry
//! - `truncate` - Delete every entry of a map
//! - `buckets` - List the maps stored at a path

mod commands;
mod error;
mod json;

use clap::{Parser, Subcommand};
use commands::Format;
use duramap_core::{Config, Registry};
use error::CliError;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Duramap command-line tools.
#[derive(Parser)]
#[command(name = "duramap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the storage directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Name of the map
    #[arg(global = true, short, long, default_value = "default")]
    name: String,

    /// Raw 32-byte encryption key as 64 hex characters
    #[arg(global = true, long, conflicts_with = "password")]
    key_hex: Option<String>,

    /// Password to derive the encryption key from
    #[arg(global = true, long, requires = "salt")]
    password: Option<String>,

    /// Salt for password key derivation
    #[arg(global = true, long)]
    salt: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every entry of the map
    Dump {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: Format,
    },

    /// Print the value of one key as JSON
    Get {
        /// Key to read
        key: String,
    },

    /// Store a JSON value under a key
    Set {
        /// Key to write
        key: String,
        /// Value as a JSON document
        value: String,
    },

    /// Remove one key
    Remove {
        /// Key to remove
        key: String,
    },

    /// Delete every entry of the map
    Truncate,

    /// List the maps stored at the path
    Buckets {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: Format,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG overrides the default level
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Version = cli.command {
        println!("Duramap CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("Duramap Core v{}", duramap_core::VERSION);
        return Ok(());
    }

    let path = cli
        .path
        .clone()
        .ok_or_else(|| CliError::usage("Storage path required (--path)"))?;
    let registry = Registry::new(Config::default());
    let mut out = std::io::stdout().lock();

    if let Commands::Buckets { format } = cli.command {
        commands::buckets::run(&registry, &path, format, &mut out)?;
        return Ok(());
    }

    let secret = commands::secret_from_args(
        cli.key_hex.as_deref(),
        cli.password.as_deref(),
        cli.salt.as_deref(),
    )?;
    let map = registry.open_loaded(&path, &cli.name, secret)?;

    let result = match cli.command {
        Commands::Dump { format } => commands::dump::run(&map, format, &mut out),
        Commands::Get { key } => commands::edit::get(&map, &key, &mut out),
        Commands::Set { key, value } => commands::edit::set(&map, &key, &value, &mut out),
        Commands::Remove { key } => commands::edit::remove(&map, &key, &mut out),
        Commands::Truncate => commands::edit::truncate(&map, &mut out),
        Commands::Buckets { .. } | Commands::Version => Ok(()),
    };

    map.close()?;
    result?;
    Ok(())
}
