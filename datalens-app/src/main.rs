use std::sync::Arc;

use clap::Parser;
use datalens_core::{DatalensConfig, LocalIdentityProvider};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use datalens_app::console::Console;
use datalens_app::App;

#[derive(Parser, Debug)]
#[command(author, version, about = "Data-quality dashboard console", long_about = None)]
struct Args {
    /// Config file (TOML); missing files fall back to defaults
    #[arg(short, long, env = "DATALENS_CONFIG", default_value = "datalens.toml")]
    config: String,

    /// Override `api.base_url`
    #[arg(long)]
    base_url: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience; production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config_path = shellexpand::tilde(&args.config).into_owned();

    let mut config = match DatalensConfig::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", config_path, e);
            std::process::exit(1);
        }
    };
    if let Some(base_url) = args.base_url {
        config.api.base_url = base_url;
    }

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.service.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let console = Console::stdin();
    let provider = Arc::new(LocalIdentityProvider::new());
    let app = Arc::new(App::from_config(&config, provider, console.interaction())?);

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

    let gate_app = app.clone();
    tokio::spawn(async move {
        if let Err(e) = gate_app.gate.run().await {
            tracing::error!("Session gate stopped: {}", e);
        }
    });

    console.run(&app, tx.subscribe()).await?;

    Ok(())
}
