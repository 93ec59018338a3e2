//! Stayforge HTTP server.
//!
//! Wires the booking engine to its storage backend and serves the API.

use std::sync::Arc;
use std::time::Duration;
use stayforge_core::SystemClock;
use stayforge_engine::lifecycle::LifecycleEnvironment;
use stayforge_engine::postgres::{self, PostgresBookingRepository, PostgresLedgerStore};
use stayforge_engine::{
    BookingEngine, BookingRepository, InMemoryBookingRepository, InMemoryLedgerStore, LedgerStore,
};
use stayforge_web::{AppState, Config, build_router};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stayforge=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Stayforge server");

    let config = Config::from_env();
    info!(
        backend = %config.storage.backend,
        host = %config.server.host,
        port = config.server.port,
        "Configuration loaded"
    );

    stayforge_engine::metrics::register_engine_metrics();

    let (repository, ledger): (Arc<dyn BookingRepository>, Arc<dyn LedgerStore>) =
        if config.storage.backend == "postgres" {
            info!("Connecting to Postgres");
            let pool = postgres::connect(
                &config.storage.database_url,
                config.storage.max_connections,
            )
            .await?;
            (
                Arc::new(PostgresBookingRepository::new(pool.clone())),
                Arc::new(PostgresLedgerStore::new(pool)),
            )
        } else {
            info!("Using in-memory storage");
            (
                Arc::new(InMemoryBookingRepository::new()),
                Arc::new(InMemoryLedgerStore::new()),
            )
        };

    let mut env = LifecycleEnvironment::new(Arc::new(SystemClock), config.policy_config());
    env.no_show_grace_hours = config.engine.no_show_grace_hours;
    env.max_extension_hours = config.engine.max_extension_hours;

    let engine = Arc::new(
        BookingEngine::new(repository, ledger, env)
            .with_lock_wait(Duration::from_millis(config.engine.lock_wait_ms)),
    );

    let router = build_router(AppState::new(engine));
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    // Both SIGINT and SIGTERM stop the server
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
