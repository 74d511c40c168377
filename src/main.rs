use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jobboard_api::config::{AppConfig, SessionBackend};
use jobboard_api::database::{DatabaseManager, PgStore, Store};
use jobboard_api::session::{MemorySessionStore, PgSessionStore, SessionStore};
use jobboard_api::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "jobboard-api", version, about = "Job board API server")]
struct Args {
    /// Port to listen on (overrides PORT / JOBBOARD_API_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Apply database migrations before serving
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL and the signing keys
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("jobboard_api=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = AppConfig::from_env().context("invalid configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    info!("Starting Jobboard API v{} in {:?} mode", env!("CARGO_PKG_VERSION"), config.environment);

    let pool = DatabaseManager::connect_lazy(&config.database)?;
    if args.migrate {
        DatabaseManager::migrate(&pool).await.context("failed to apply migrations")?;
    }

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool.clone()));
    let sessions: Arc<dyn SessionStore> = match config.session.backend {
        SessionBackend::Memory => Arc::new(MemorySessionStore::new()),
        SessionBackend::Postgres => Arc::new(PgSessionStore::new(pool)),
    };
    info!(backend = ?config.session.backend, "Session registry ready");

    spawn_session_purge(
        sessions.clone(),
        Duration::from_secs(config.session.purge_interval_secs.max(1)),
    );

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let app = jobboard_api::app(AppState::new(config, store, sessions));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Jobboard API listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Periodically drop expired refresh-token entries.
fn spawn_session_purge(sessions: Arc<dyn SessionStore>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "Purged expired sessions"),
                Err(e) => warn!(error = %e, "Session purge failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
