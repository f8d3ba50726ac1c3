//! reelcache - fetch upstream JSON through a persistent response cache
//!
//! `fetch` warm-starts from the snapshot, serves or fetches the URL, and flushes
//! the snapshot on exit. `inspect` lists what the snapshot holds.

use std::process::ExitCode;

use clap::Parser;
use reelcache::cache::load_snapshot;
use reelcache::cli::{Cli, Command};
use reelcache::{CacheConfig, FetchOptions, ResponseCache};

/// Fetches `url` and prints the payload to stdout
async fn run_fetch(config: CacheConfig, url: &str, options: FetchOptions) -> Result<(), Box<dyn std::error::Error>> {
    let cache = ResponseCache::open(config).await?;
    let result = cache.fetch(url, options).await;
    cache.close().await;

    let data = result?;
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}

/// Prints one line per snapshot entry with its age
async fn run_inspect(config: CacheConfig) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = config.snapshot_path else {
        println!("No snapshot location available");
        return Ok(());
    };

    let entries = load_snapshot(&path).await?;
    if entries.is_empty() {
        println!("Snapshot {} is empty or missing", path.display());
        return Ok(());
    }

    println!("{} entries in {}", entries.len(), path.display());
    for (key, entry) in &entries {
        println!("{:>8}s  {}", entry.age().as_secs(), key);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout carries only the payload
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.cache_config();

    let result = match &cli.command {
        Command::Fetch { url, .. } => {
            let options = cli.fetch_options().unwrap_or_default();
            run_fetch(config, url, options).await
        }
        Command::Inspect => run_inspect(config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
