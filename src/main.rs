use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arbor::config::loader::load_config;
use arbor::http::HttpServer;
use arbor::server::Arbor;
use arbor::sync::{GithubFetcher, SyncDriver};
use arbor::watch::ContentWatcher;
use arbor::HandlerRegistry;

#[derive(Parser)]
#[command(name = "arbor", about = "Content tree server")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "arbor.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arbor=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(&cli.config)?;
    tracing::info!(
        bind_address = %config.server.bind_address,
        base_path = %config.content.base_path,
        sync_enabled = config.sync.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => arbor::observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let registry = HandlerRegistry::default();
    let arbor = Arc::new(Arbor::new(config, registry)?);

    let driver = if arbor.config.sync.enabled {
        let fetcher = Arc::new(GithubFetcher::new(
            arbor.config.sync.token.clone(),
            arbor.config.sync.fetch_attempts,
            arbor.config.sync.fetch_base_delay_ms,
        ));
        Some(Arc::new(SyncDriver::new(arbor.clone(), fetcher)))
    } else {
        None
    };

    // Held for the server's lifetime; dropping it stops the watch.
    let _watcher = if arbor.config.content.watch_local_changes {
        Some(ContentWatcher::new(arbor.clone()).run()?)
    } else {
        None
    };

    let server = HttpServer::new(arbor, driver);
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
