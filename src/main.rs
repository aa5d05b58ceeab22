//! Planning poker backend entrypoint wiring REST, SSE and the session store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use planning_poker_back::{
    config::{AppConfig, StoreBackend},
    dao::session_store::memory::MemorySessionStore,
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = match StoreBackend::from_env() {
        StoreBackend::Memory => {
            info!("using in-memory session store");
            AppState::with_store(config, Arc::new(MemorySessionStore::new())).await
        }
        StoreBackend::Couch => start_couch_store(config)?,
    };

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Start in degraded mode and let the storage supervisor install the CouchDB store.
#[cfg(feature = "couch-store")]
fn start_couch_store(config: AppConfig) -> anyhow::Result<SharedState> {
    use planning_poker_back::{
        dao::{
            session_store::{
                SessionStore,
                couchdb::{CouchConfig, CouchSessionStore},
            },
            storage::StorageError,
        },
        services::storage_supervisor,
    };

    let couch_config = CouchConfig::from_env().context("reading CouchDB configuration")?;
    info!(
        base_url = %couch_config.base_url,
        database = %couch_config.database,
        "using CouchDB session store"
    );

    let state = AppState::new(config);
    tokio::spawn(storage_supervisor::run(state.clone(), move || {
        let couch_config = couch_config.clone();
        async move {
            let store = CouchSessionStore::connect(couch_config)
                .await
                .map_err(StorageError::from)?;
            Ok(Arc::new(store) as Arc<dyn SessionStore>)
        }
    }));

    Ok(state)
}

#[cfg(not(feature = "couch-store"))]
fn start_couch_store(_config: AppConfig) -> anyhow::Result<SharedState> {
    anyhow::bail!("STORE_BACKEND=couch requires the `couch-store` feature")
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
