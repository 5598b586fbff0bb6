//! course_ledger - wallet ledger and course purchase backend
//!
//! Serves the purchase, review, wallet and payment-callback endpoints and
//! runs the maintenance scheduler.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use course_ledger::api::{self, AppState};
use course_ledger::cache::ExpiringStore;
use course_ledger::config::{LogFormat, StorageBackend};
use course_ledger::jobs::JobScheduler;
use course_ledger::notify::{PurchaseNotifier, StoreNotificationSink, TracingMailer};
use course_ledger::payment::{MidtransVerifier, PaymentGateway};
use course_ledger::storage::{LedgerStore, MemoryLedgerStore, PgLedgerStore};
use course_ledger::{db, Config};

/// Initialize tracing/logging
fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "course_ledger=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!(
        environment = %config.environment,
        backend = ?config.storage_backend,
        "Starting course_ledger server"
    );

    let (store, pool) = match config.storage_backend {
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required"))?;

            tracing::info!("Connecting to database...");
            let pool = db::connect(database_url, config.database_max_connections).await?;
            db::verify_connection(&pool).await?;

            // Verify database schema
            if !db::check_schema(&pool).await? {
                tracing::error!("Database schema is not complete. Please run migrations.");
                return Err(anyhow::anyhow!("Database schema incomplete"));
            }
            tracing::info!("Database connected successfully");

            let store: Arc<dyn LedgerStore> = Arc::new(PgLedgerStore::new(pool.clone()));
            (store, Some(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; state is lost on shutdown");
            let store: Arc<dyn LedgerStore> = Arc::new(MemoryLedgerStore::new());
            (store, None)
        }
    };

    if config.midtrans_server_key.is_empty() {
        tracing::warn!("MIDTRANS_SERVER_KEY is not set; every payment callback will be rejected");
    }

    let callback_cache = ExpiringStore::new();
    let payments = PaymentGateway::new(
        store.clone(),
        Arc::new(MidtransVerifier::new(config.midtrans_server_key.clone())),
        callback_cache.clone(),
        config.callback_cache_ttl,
    );
    let notifier = PurchaseNotifier::new(
        store.clone(),
        Arc::new(TracingMailer::new(config.mail_from.clone())),
        Arc::new(StoreNotificationSink::new(store.clone())),
    );

    let scheduler = JobScheduler::new(store.clone(), callback_cache).start();

    let app = api::build_router(AppState {
        store,
        notifier,
        payments,
    });

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup
    tracing::info!("Server shutting down...");
    scheduler.abort();
    if let Some(pool) = pool {
        pool.close().await;
        tracing::info!("Database connections closed");
    }
    tracing::info!("Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
