//! Command-line interface for reconcyl

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reconcyl")]
#[command(about = "Reconcile two tabular datasets and report what is missing on each side")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Job store directory (defaults to ./.reconcyl)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Configuration file (defaults to <store>/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the job store and write a default configuration
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Reconcile two files in the foreground
    Run {
        /// Source dataset (delimited text with a header row)
        source: PathBuf,

        /// Target dataset (delimited text with a header row)
        target: PathBuf,

        /// Report format: "json", "csv" or "html"
        #[arg(long, default_value = "json")]
        format: String,

        /// Write the report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Compare on the columns both inputs share instead of failing on a mismatch
        #[arg(long)]
        common_columns: bool,

        /// Leave rows with empty cells out of the unmatched sections
        #[arg(long)]
        drop_incomplete: bool,
    },

    /// Submit a reconciliation job and wait for it to finish
    Submit {
        /// Source dataset
        source: PathBuf,

        /// Target dataset
        target: PathBuf,

        /// Report format: "json", "csv" or "html"
        #[arg(long, default_value = "json")]
        format: String,

        /// Send the report to this address when the job succeeds
        #[arg(long)]
        email: Option<String>,

        /// Fail the job if it runs longer than this many seconds (must be > 0)
        #[arg(long, value_parser = validate_timeout_secs)]
        timeout_secs: Option<u64>,
    },

    /// Show the status of a job
    Status {
        /// Job id
        job_id: String,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Render the report of a finished job
    Fetch {
        /// Job id
        job_id: String,

        /// Report format: "json", "csv" or "html"
        #[arg(long, default_value = "json")]
        format: String,

        /// Write the report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List known jobs
    List {
        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// Cancel a job that has not started yet
    Cancel {
        /// Job id
        job_id: String,
    },
}

/// Parse output format string
#[derive(Debug, Clone)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {}. Use 'pretty' or 'json'", s)),
        }
    }
}

/// Validate that the job timeout is greater than 0
fn validate_timeout_secs(s: &str) -> Result<u64, String> {
    let secs: u64 = s
        .parse()
        .map_err(|_| format!("Invalid timeout: '{}'. Must be a positive integer.", s))?;

    if secs == 0 {
        return Err("Timeout must be greater than 0 seconds".to_string());
    }

    Ok(secs)
}
