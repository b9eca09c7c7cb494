//! Application entry point and server initialization
//!
//! Loads configuration, opens the store, seeds the property catalog and
//! starts the HTTP server with graceful shutdown support. Any failure before
//! the server is listening aborts startup.

use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use lead_intake::config::Config;
use lead_intake::database::{init_db, AppState};
use lead_intake::route::create_app;
use lead_intake::transform::LeadTransformer;

/// Application entry point
///
/// Startup order:
/// 1. Loads `.env` and installs the tracing subscriber
/// 2. Reads configuration and opens the store
/// 3. Seeds the property catalog and loads the agent table
/// 4. Serves the router until a shutdown signal arrives
///
/// # Environment Variables
///
/// - `PORT` - Server port number (default: 8080)
/// - `DATABASE_URL` - Path to database file (default: "leads.db")
/// - `AGENT_SOURCE` - "from_submission" or "from_static_table"
/// - `AGENT_TABLE_PATH` - JSON agent table
/// - `PROPERTY_CATALOG_PATH` - JSON property catalog seeded at startup
/// - `WEBHOOK_TOKEN` - Required Authorization value for the webhook
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lead_intake=debug,tower_http=debug")),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    let store = init_db(&config.database_path)
        .with_context(|| format!("failed to initialize database at {}", config.database_path))?;
    let store = Arc::new(store);

    // Catalog entries overwrite properties with the same id
    let catalog = config.load_property_catalog()?;
    if !catalog.is_empty() {
        store.seed_properties(&catalog)?;
    }

    let agents = config.load_agent_directory()?;
    tracing::info!(
        "Agent source: {:?} ({} project(s) in agent table)",
        config.agent_source,
        agents.len()
    );

    let state = AppState {
        store: store.clone(),
        transformer: LeadTransformer::new(store, Arc::new(agents), config.agent_source),
        webhook_token: config.webhook_token.clone(),
    };

    // Request logging and permissive CORS for the form hosts
    let app = create_app(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!("🚀 Server running at http://localhost:{}", config.port);
    tracing::info!("📂 Using database: {}", config.database_path);

    // Start the server with graceful shutdown support
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves once the process is asked to stop
///
/// axum stops accepting connections and drains in-flight requests after
/// this future completes.
async fn shutdown_signal() {
    let signal = wait_for_signal().await;
    tracing::info!("Received {}, shutting down lead intake", signal);
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!("SIGTERM handler unavailable: {}", e);
            return ctrl_c().await;
        }
    };

    tokio::select! {
        name = ctrl_c() => name,
        _ = sigterm.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    ctrl_c().await
}

async fn ctrl_c() -> &'static str {
    if let Err(e) = signal::ctrl_c().await {
        // Without a handler only SIGTERM (or a kill) can stop the server
        tracing::error!("Ctrl+C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
    "SIGINT"
}
