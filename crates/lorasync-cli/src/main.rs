//! lorasync - sync model metadata and previews from a catalog by content hash.
//!
//! Logs go to stderr; command output (fingerprints, summaries, listings) goes
//! to stdout so it can be piped.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "lorasync")]
#[command(about = "Sync model metadata and previews from a catalog by content hash")]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fingerprint every model under ROOT and reconcile its side-car files
    Sync {
        root: PathBuf,

        /// Catalog API key (falls back to CIVITAI_API_KEY, then the config file)
        #[arg(long)]
        api_key: Option<String>,

        /// Catalog API base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Only scan ROOT itself, not its subdirectories
        #[arg(long)]
        no_recursive: bool,

        /// Lookup request timeout in seconds
        #[arg(long, default_value = "30")]
        timeout: u64,

        /// Print the final report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the SHA256 fingerprint of a file
    Hash { file: PathBuf },

    /// List models under ROOT with the side-car files found next to them
    Inspect {
        root: PathBuf,

        /// Only scan ROOT itself, not its subdirectories
        #[arg(long)]
        no_recursive: bool,

        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(debug: bool, json: bool) {
    // --debug wins over RUST_LOG
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.debug, args.json_logs);

    match args.command {
        Command::Sync {
            root,
            api_key,
            base_url,
            no_recursive,
            timeout,
            json,
        } => {
            let options = commands::sync_options(api_key, base_url, !no_recursive, timeout);
            commands::sync(root, options, json).await
        }
        Command::Hash { file } => commands::hash(file).await,
        Command::Inspect {
            root,
            no_recursive,
            json,
        } => commands::inspect(root, !no_recursive, json),
    }
}
