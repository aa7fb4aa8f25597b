//! # tagstore CLI Module
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server and the write-back worker
//! - `put` - Map a tag to a digest
//! - `get` - Resolve a tag
//! - `flush` - Run queued write-back tasks once
//! - `pending` - List queued write-back tasks
//! - `digest` - Print the canonical digest of a file

mod commands;

use crate::config::Config;
use crate::error::AppError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// tagstore - tag to digest resolution with delayed write-back
///
/// Tags are readable as soon as they are put; uploads to the backend happen
/// later from a durable queue.
#[derive(Parser, Debug)]
#[command(name = "tagstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the TOML config file
    #[arg(short, long, global = true, default_value = "tagstore.toml")]
    pub config: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server and write-back worker
    Server {
        /// Host to bind to (overrides server.host)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Map a tag to a digest
    Put {
        tag: String,

        /// Canonical digest (sha256:<hex>)
        digest: String,

        /// Seconds before the write-back may run (overrides write_back.default_delay_secs)
        #[arg(short, long)]
        delay_secs: Option<u64>,
    },

    /// Resolve a tag to its digest
    Get { tag: String },

    /// Run write-back tasks once
    Flush {
        /// Also run tasks whose delay has not elapsed
        #[arg(short, long)]
        force: bool,
    },

    /// List queued write-back tasks
    Pending,

    /// Print the canonical digest of a file's content
    Digest { file: PathBuf },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), AppError> {
    let json_mode = cli.json_mode;

    // `digest` needs no store
    if let Commands::Digest { file } = &cli.command {
        return cmd_digest(file, json_mode);
    }

    let config = Config::load(&cli.config)?;
    match cli.command {
        Commands::Server { host, port } => cmd_server(config, host, port, cli.quiet).await,
        Commands::Put {
            tag,
            digest,
            delay_secs,
        } => cmd_put(&config, &tag, &digest, delay_secs, json_mode),
        Commands::Get { tag } => cmd_get(&config, &tag, json_mode),
        Commands::Flush { force } => cmd_flush(&config, force, json_mode),
        Commands::Pending => cmd_pending(&config, json_mode),
        Commands::Digest { file } => cmd_digest(&file, json_mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_put_with_delay() {
        let cli = Cli::try_parse_from([
            "tagstore",
            "--json-mode",
            "put",
            "library/ubuntu:22.04",
            "sha256:00",
            "--delay-secs",
            "5",
        ])
        .expect("parse");

        assert!(cli.json_mode);
        assert_eq!(cli.config, PathBuf::from("tagstore.toml"));
        match cli.command {
            Commands::Put {
                tag, delay_secs, ..
            } => {
                assert_eq!(tag, "library/ubuntu:22.04");
                assert_eq!(delay_secs, Some(5));
            }
            other => unreachable!("parsed {:?}", other),
        }
    }

    #[test]
    fn server_flags_are_optional() {
        let cli = Cli::try_parse_from(["tagstore", "-c", "x.toml", "server", "-p", "9000"])
            .expect("parse");
        assert_eq!(cli.config, PathBuf::from("x.toml"));
        assert!(matches!(
            cli.command,
            Commands::Server {
                host: None,
                port: Some(9000)
            }
        ));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["tagstore"]).is_err());
    }
}
