use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use bucketsync::cli::Cli;
use bucketsync::config::FileConfig;
use bucketsync::filelist::read_file_list;
use bucketsync::{ObjectStore, RunStatistics, SyncEngine, SyncError};

#[tokio::main]
async fn main() -> ExitCode {
    // Exits with status 2 on invalid arguments
    let cli = Cli::parse();

    init_logging(cli.log_level());

    match run(&cli).await {
        Ok(stats) if stats.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            if let Some(hint) = err.downcast_ref::<SyncError>().and_then(SyncError::suggestion) {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: LevelFilter) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},opendal=warn,hyper=warn,reqwest=warn",
            level.to_string().to_lowercase()
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli) -> Result<RunStatistics> {
    let file_config = FileConfig::resolve(cli.config.as_deref())?;
    let settings = cli.settings(file_config);

    let paths = read_file_list(&cli.file_list)
        .with_context(|| format!("failed to read file list {}", cli.file_list.display()))?;

    let store = ObjectStore::s3(settings.store, &settings.s3)
        .context("failed to configure object store")?;
    let engine = SyncEngine::new(Arc::new(store), settings.sync);

    let stats = engine.run(paths.as_slice()).await?;

    if cli.summary {
        println!("{}", stats.summary());
    }
    if cli.json {
        println!("{}", stats.to_json().context("failed to render statistics")?);
    }

    Ok(stats)
}
