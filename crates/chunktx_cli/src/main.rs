//! chunktx CLI
//!
//! Command-line driver for chunked uploads.
//!
//! # Commands
//!
//! - `upload` - Upload a file into a storage root in fixed-size chunks
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// chunktx command-line upload tool.
#[derive(Parser)]
#[command(name = "chunktx")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file into a storage root
    Upload {
        /// File to upload
        source: PathBuf,

        /// Storage root the file is published under
        #[arg(short, long)]
        root: PathBuf,

        /// Destination path relative to the root (defaults to the file name)
        #[arg(short, long)]
        dest: Option<PathBuf>,

        /// Chunk size in bytes
        #[arg(short, long, default_value_t = chunktx_core::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Allow only one in-flight transaction
        #[arg(long)]
        serial: bool,

        /// Tenant to upload as (random if unset)
        #[arg(short, long)]
        tenant: Option<Uuid>,

        /// Skip syncing the document before publishing it
        #[arg(long)]
        no_sync: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Upload {
            source,
            root,
            dest,
            chunk_size,
            serial,
            tenant,
            no_sync,
            format,
        } => {
            let mut config = chunktx_core::Config::new()
                .storage_root(root)
                .chunk_size(chunk_size)
                .serial(serial)
                .sync_on_commit(!no_sync);
            if let Some(tenant) = tenant {
                config = config.tenant_id(tenant);
            }
            commands::upload::run(&source, dest, &config, &format)?;
        }
        Commands::Version => {
            println!("chunktx CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("chunktx Core v{}", chunktx_core::VERSION);
        }
    }

    Ok(())
}
