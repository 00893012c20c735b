use std::sync::Arc;

use clap::Parser;
use datadict_core::{CredentialResolver, EnvCredentials, GeminiClient, RelayConfig};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use datadict_server::http::{self, HttpState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "datadict.toml")]
    config: String,

    /// Report configuration and credential status, then exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Neither file overrides variables already set; .env.local wins over .env
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Init logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    // Load config
    let config = match RelayConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    let credentials = CredentialResolver::new(Arc::new(EnvCredentials), config.credentials.clone());

    if args.check {
        println!("✅ Gateway: {} (model {})", config.gateway.base_url, config.gateway.model);
        if credentials.is_configured() {
            println!("✅ API key found");
        } else {
            println!(
                "❌ API key missing: set {} or {}",
                config.credentials.primary_var, config.credentials.fallback_var
            );
            std::process::exit(1);
        }
        return Ok(());
    }

    if !credentials.is_configured() {
        // Not fatal: the key is resolved per request and may be provided later
        tracing::warn!(
            primary = %config.credentials.primary_var,
            fallback = %config.credentials.fallback_var,
            "No API key in environment; requests will fail until one is set"
        );
    }

    if config.cors.allow_any_origin {
        tracing::warn!("CORS allows any origin; restrict this before exposing the server publicly");
    }

    let gateway = GeminiClient::new(&config.gateway)?;
    let state = HttpState::new(config, credentials, Arc::new(gateway));

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    http::start_http_server(state, tx.subscribe()).await?;

    Ok(())
}
