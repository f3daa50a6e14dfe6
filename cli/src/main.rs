mod config;
mod notifier;
mod process;

use std::{path::PathBuf, sync::Arc};
use clap::Parser;
use models::{error::Error, logger::{self, create_span}, infra::SpannedRuntime};
use tokio::fs::File;
use crate::{config::Config, notifier::ConsoleNotifier, process::{build_registry, process_results, read_results}};

/// Saves scraped bank transactions to every configured storage backend.
#[derive(Parser, Debug)]
#[command(name = "fanout", version)]
struct Args {
    /// JSON file with the scraper's per-account results
    input: PathBuf,

    /// TOML configuration, without one no backend is enabled
    #[arg(short, long, env = "FANOUT_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Error> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;

    let logger = logger::Logger::new(config.logging.dir.clone(), config.logging.filter.clone());
    logger.start()?;

    let rt = Arc::new(models::infra::get_runtime(config.runtime.worker_threads, config.runtime.blocking_threads, create_span())?);
    let rtc = rt.clone();
    rt.block_on(init(args.input, config, rtc))?;
    Ok(())
}

async fn init(path: PathBuf, config: Config, rt: Arc<SpannedRuntime>) -> Result<(), Error> {
    let mut file = File::open(&path).await?;
    let results = read_results(&mut file).await?;
    // Built once, before any transaction is looked at.
    let registry = build_registry(&config.storage);
    let notifier = Arc::new(ConsoleNotifier::new(tokio::io::stdout()));
    process_results(&results, &registry, notifier, rt).await;
    Ok(())
}
