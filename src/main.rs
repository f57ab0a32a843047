use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ouroboros_cache::{CacheConfig, CacheFacade, ComputeOptions, MemoryBackend};

#[derive(Parser)]
#[command(name = "ouroboros-cache")]
#[command(about = "Single-flight object cache toolkit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the configuration resolved from OBJECT_CACHE_* variables
    Config,

    /// Fire concurrent get-or-compute calls at one key and report stats
    Demo {
        /// Logical key to request
        #[arg(short, long, default_value = "demo")]
        key: String,

        /// Number of concurrent callers
        #[arg(short, long, default_value = "10")]
        callers: usize,

        /// Simulated computation time in milliseconds
        #[arg(short, long, default_value = "100")]
        delay_ms: u64,

        /// Run with the backend switched off
        #[arg(long)]
        offline: bool,
    },

    /// Flush a backend and print the JSON result
    Flush {
        /// Flush an offline backend to see the failure payload
        #[arg(long)]
        offline: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "ouroboros_cache=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = CacheConfig::from_env().context("Failed to load cache configuration")?;

    match cli.command {
        Commands::Config => {
            let report = json!({
                "group": config.group(),
                "tenant": config.effective_tenant().to_string(),
                "config": config,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Demo {
            key,
            callers,
            delay_ms,
            offline,
        } => {
            let backend = Arc::new(MemoryBackend::with_defaults());
            backend.set_available(!offline);
            let cache = CacheFacade::new(backend, config)?;
            let invocations = Arc::new(AtomicUsize::new(0));

            let mut handles = Vec::with_capacity(callers);
            for _ in 0..callers {
                let cache = cache.clone();
                let key = key.clone();
                let invocations = invocations.clone();
                handles.push(tokio::spawn(async move {
                    cache
                        .get_or_compute(
                            &key,
                            None,
                            move || async move {
                                let n = invocations.fetch_add(1, Ordering::SeqCst) + 1;
                                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                                Ok::<_, anyhow::Error>(format!("computed #{}", n))
                            },
                            ComputeOptions::default(),
                        )
                        .await
                }));
            }

            let mut results = Vec::with_capacity(callers);
            for handle in handles {
                let value = handle.await??;
                results.push(String::from_utf8_lossy(&value).into_owned());
            }

            let report = json!({
                "key": cache.key_for(&key, None)?.to_string(),
                "invocations": invocations.load(Ordering::SeqCst),
                "results": results,
                "stats": cache.stats(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Flush { offline } => {
            let backend = Arc::new(MemoryBackend::with_defaults());
            backend.set_available(!offline);
            let cache = CacheFacade::new(backend, config)?;

            println!("{}", serde_json::to_string(&cache.flush().await)?);
        }
    }

    Ok(())
}
