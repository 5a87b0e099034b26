//! Tank control server binary.
//!
//! Opens the log database, loads the credential directory, builds the tank
//! object and serves the control surface until SIGTERM/SIGINT.

use std::net::SocketAddr;
use std::sync::Arc;
use tankctl_control::{Dispatcher, Tank, ValveHysteresis};
use tankctl_identity::CredentialDirectory;
use tankctl_server::{app, background, config, AppState};
use tankctl_store::LogStore;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("TANKCTL_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let (config, origin) = config::load_config(selected_config_path)
        .expect("failed to load configuration, the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );
    if origin == config::ConfigOrigin::Defaults {
        tracing::info!(
            path = selected_config_path.unwrap_or("<none>"),
            "config file not found, using defaults"
        );
    }

    // Initialize database
    let pool = tankctl_db::create_pool(
        &config.database.path,
        tankctl_db::DbRuntimeSettings {
            busy_timeout_ms: config.database.busy_timeout_ms,
            pool_max_size: config.database.pool_max_size,
        },
    )
    .expect("failed to create database pool, check database.path in config");

    {
        let conn = pool
            .get()
            .expect("failed to get database connection for migrations");
        let applied =
            tankctl_db::run_migrations(&conn).expect("failed to run database migrations");
        if applied > 0 {
            tracing::info!(count = applied, "applied database migrations");
        }
    }

    // Credentials
    let directory = CredentialDirectory::from_specs(config.principals.clone())
        .expect("invalid [[principals]] entry in config");
    if directory.is_empty() {
        tracing::warn!("no principals configured, only anonymous access is possible");
    }

    // Tank object and operations
    let valve_band = ValveHysteresis::new(
        config.control.valve_open_above_pct,
        config.control.valve_close_below_pct,
    )
    .expect("invalid [control] valve thresholds");
    let tank = Arc::new(Tank::new(config.tank.name.clone()));
    let dispatcher = Dispatcher::new(
        LogStore::new(pool),
        Arc::clone(&tank),
        config.access.clone(),
        valve_band,
    );

    // Prime the cache; an empty database is not fatal.
    match dispatcher.refresh_attributes() {
        Ok(params) => tracing::info!(
            fill_percentage = params.fill_percentage,
            valve_position = params.valve_position,
            threshold = params.threshold,
            "loaded tank attributes from store"
        ),
        Err(e) => tracing::warn!("tank attributes start at defaults: {}", e),
    }

    let state = AppState {
        dispatcher: Arc::new(dispatcher),
        directory: Arc::new(directory),
    };

    tokio::spawn(background::start_attribute_refresh_task(
        Arc::new(state.clone()),
        config.control.refresh_interval_secs,
    ));

    // Build application
    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, tank = tank.name(), "starting tank control server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address, is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("tank control server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
