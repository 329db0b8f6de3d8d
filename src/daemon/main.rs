//! ABAC Engine Daemon
//!
//! Loads a policy document once at startup and serves match requests over
//! HTTP until interrupted.

use abac_engine::cache::ConditionCache;
use abac_engine::server;
use abac_engine::telemetry;
use abac_engine::{Attributes, Config, PolicyDocument, PolicyStore, Result};

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// ABAC Engine Daemon
#[derive(Parser, Debug)]
#[command(name = "abac-engine")]
#[command(about = "Attribute-based access control policy matching service")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// HTTP bind address, e.g. 0.0.0.0:5120
    #[arg(long, env = "ADDR")]
    addr: Option<String>,

    /// Policy file to load
    #[arg(short, long, env = "POLICY_FILE")]
    policies: Option<PathBuf>,

    /// Shared definitions file (YAML or JSON)
    #[arg(short, long, env = "DEFINITIONS_FILE")]
    definitions: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON log format
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    // Apply command line overrides
    if let Some(policies) = args.policies {
        config.policies.file = policies;
    }
    if let Some(definitions) = args.definitions {
        config.policies.definitions_file = Some(definitions);
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if args.json_logs {
        config.logging.json = true;
    }
    let addr = args.addr.unwrap_or_else(|| config.server.addr());

    config.validate()?;
    telemetry::init_tracing(&config.logging)?;

    info!("Starting ABAC Engine Daemon v{}", abac_engine::VERSION);

    let store = load_store(&config)?;
    info!("Loaded {} policies", store.policy_count());

    server::serve(Arc::new(store), &addr, shutdown_signal()).await?;

    info!("Shutting down ABAC Engine Daemon");
    Ok(())
}

/// Build the policy store from the configured sources.
fn load_store(config: &Config) -> Result<PolicyStore> {
    info!("Loading policy file: {:?}", config.policies.file);
    let mut document = PolicyDocument::from_file(&config.policies.file)?;

    if let Some(path) = &config.policies.definitions_file {
        info!("Loading definitions file: {:?}", path);
        document.definitions.extend(load_definitions(path)?);
    }

    PolicyStore::builder()
        .with_cache(Arc::new(ConditionCache::with_capacity(
            config.cache.initial_capacity,
        )))
        .with_definitions(document.definitions)
        .with_policies(document.policies)
        .build()
        .inspect_err(|err| {
            for rejected in err.iter() {
                tracing::error!(category = rejected.category(), "policy rejected: {}", rejected);
            }
        })
}

/// Load a definitions file. YAML parsing also accepts JSON.
fn load_definitions(path: &Path) -> Result<Attributes> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Caught ctrl-c");
}
