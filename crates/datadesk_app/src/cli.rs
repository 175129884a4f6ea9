use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use datadesk_engine::{Dataset, JobKind};

use crate::platform::logging::LogDestination;

#[derive(Debug, Parser)]
#[command(name = "datadesk", about = "Admin console for the datadesk API", version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Base URL of the API, including the `/api` prefix.
    #[arg(long, env = "DATADESK_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Directory holding the saved session.
    #[arg(long, env = "DATADESK_STATE_DIR", global = true)]
    pub state_dir: Option<PathBuf>,

    /// Progress polling interval in milliseconds.
    #[arg(long, env = "DATADESK_POLL_MS", global = true)]
    pub poll_ms: Option<u64>,

    /// Rows per page.
    #[arg(long, global = true)]
    pub limit: Option<u32>,

    /// Request timeout in seconds.
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    #[arg(long, value_enum, default_value_t = LogDestination::File, global = true)]
    pub log: LogDestination,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and save the session token.
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "DATADESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the saved session.
    Logout,
    /// Show the user behind the saved session.
    Whoami,
    /// Page through a dataset.
    Browse {
        dataset: Dataset,
        /// Filter as `field=value`; repeatable.
        #[arg(short, long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
        /// Page to open; pages past the deep-page threshold switch to cursor traversal.
        #[arg(long)]
        page: Option<u32>,
        /// Number of pages to walk forward from the first one shown.
        #[arg(long, default_value_t = 1)]
        pages: u32,
        /// Print rows as JSON lines.
        #[arg(long)]
        json: bool,
    },
    /// Start a server-side job and follow its progress. Ctrl-C requests a stop.
    Import {
        job: JobKind,
        /// Column holding URLs (blacklist update).
        #[arg(long)]
        url_column: Option<String>,
    },
    /// Ask the server to stop a running job.
    Stop {
        job: JobKind,
        #[arg(long)]
        process_id: Option<String>,
    },
    /// Upload a `url,image` CSV to the SS-URL import in chunks.
    UploadSsUrl {
        file: PathBuf,
        #[arg(short, long)]
        bucket: String,
    },
    /// Mark adult-keyword references as reviewed.
    Moderate {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Flag the references as adult content instead of clean.
        #[arg(long)]
        adult: bool,
    },
    /// Record counts for one dataset, or every collection.
    Stats { dataset: Option<Dataset> },
    /// Delete every record of a dataset.
    DeleteAll {
        dataset: Dataset,
        #[arg(long)]
        yes: bool,
    },
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => {
            Ok((field.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected field=value, got '{raw}'")),
    }
}
