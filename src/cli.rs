//! Command-line interface.

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

use crate::config::FileConfig;
use crate::store::{S3Options, StoreConfig};
use crate::sync::{IdentityFailurePolicy, SyncConfig};

#[derive(Debug, Parser)]
#[command(name = "bucketsync")]
#[command(version)]
#[command(about = "Upload new and changed files to an S3 bucket")]
#[command(long_about = r#"
Upload new and changed files to an S3 bucket.

Files are compared by MD5 content hash against the objects already in the
bucket; only files that are missing or changed are uploaded. Nothing is ever
deleted remotely.

The file list names one file or directory per line. Directories are synced
recursively. Blank lines and lines starting with '#' are ignored.
"#)]
pub struct Cli {
    /// Name of the destination bucket
    pub bucket: String,

    /// File listing the paths to sync, one per line
    pub file_list: PathBuf,

    /// Log what would be uploaded without writing anything
    #[arg(short, long)]
    pub dry_run: bool,

    /// Key prefix inside the bucket (default: /)
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Verbose output; specify twice for debug-level output
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Print a summary of the run when finished
    #[arg(short, long)]
    pub summary: bool,

    /// Print run statistics as JSON when finished
    #[arg(long)]
    pub json: bool,

    /// Bucket region
    #[arg(long)]
    pub region: Option<String>,

    /// Custom endpoint for S3-compatible services
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Maximum number of concurrent uploads
    #[arg(short = 'j', long)]
    pub upload_concurrency: Option<usize>,

    /// Threads used to hash local files (default: number of CPUs)
    #[arg(long)]
    pub hash_threads: Option<usize>,

    /// Skip files that cannot be read instead of aborting the run
    #[arg(long)]
    pub skip_unreadable: bool,

    /// Configuration file (default: <config dir>/bucketsync/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub store: StoreConfig,
    pub s3: S3Options,
    pub sync: SyncConfig,
}

impl Cli {
    /// Merge command-line flags over values from the config file.
    pub fn settings(&self, file: FileConfig) -> Settings {
        let prefix = self.prefix.clone().or(file.prefix);
        let store = StoreConfig::new(self.bucket.clone())
            .with_prefix(prefix.as_deref())
            .with_dry_run(self.dry_run);

        let defaults = S3Options::default();
        let s3 = S3Options {
            region: self.region.clone().or(file.region).unwrap_or(defaults.region),
            endpoint: self.endpoint.clone().or(file.endpoint),
        };

        let defaults = SyncConfig::default();
        let identity_failure = if self.skip_unreadable {
            IdentityFailurePolicy::Skip
        } else {
            file.identity_failure.unwrap_or(defaults.identity_failure)
        };
        let sync = SyncConfig {
            upload_concurrency: self
                .upload_concurrency
                .or(file.upload_concurrency)
                .unwrap_or(defaults.upload_concurrency)
                .max(1),
            hash_threads: self
                .hash_threads
                .or(file.hash_threads)
                .unwrap_or(defaults.hash_threads)
                .max(1),
            identity_failure,
        };

        Settings { store, s3, sync }
    }

    /// Console log level for the `-v` count.
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            _ => LevelFilter::DEBUG,
        }
    }
}
