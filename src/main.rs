//! Jam Hub Back binary entrypoint: storage backend selection, supervision and the HTTP server.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::{Context, bail};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jam_hub_back::{
    clock::Clock,
    config::AppConfig,
    dao::jam_store::memory::{MemoryJamStore, MemorySeed},
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = AppState::new(AppConfig::load());
    start_storage(&app_state).await?;

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Install the backend named by `STORAGE_BACKEND` (`mongo` by default, `couch` or `memory`).
///
/// Database backends are connected by the storage supervisor in the background;
/// the server answers 503 until the first connection succeeds.
async fn start_storage(state: &SharedState) -> anyhow::Result<()> {
    let backend = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "mongo".into());
    info!(backend = %backend, "selecting storage backend");

    match backend.as_str() {
        "memory" => {
            let seed = match env::var("MEMORY_SEED_PATH") {
                Ok(path) => {
                    let contents = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading memory seed `{path}`"))?;
                    serde_json::from_str::<MemorySeed>(&contents)
                        .with_context(|| format!("parsing memory seed `{path}`"))?
                }
                Err(_) => MemorySeed::default(),
            };
            state
                .set_jam_store(Arc::new(MemoryJamStore::from_seed(seed, Clock::System)))
                .await;
            Ok(())
        }
        "mongo" => spawn_mongo_supervisor(state),
        "couch" => spawn_couch_supervisor(state),
        other => bail!("unknown STORAGE_BACKEND `{other}` (expected mongo, couch or memory)"),
    }
}

#[cfg(feature = "mongo-store")]
fn spawn_mongo_supervisor(state: &SharedState) -> anyhow::Result<()> {
    use jam_hub_back::{
        dao::jam_store::{
            JamStore,
            mongodb::{MongoConfig, MongoJamStore},
        },
        dao::storage::StorageError,
        services::storage_supervisor,
    };

    let uri = env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into());
    let db_name = env::var("MONGO_DB").ok();

    tokio::spawn(storage_supervisor::run(state.clone(), move || {
        let uri = uri.clone();
        let db_name = db_name.clone();
        async move {
            let config = MongoConfig::from_uri(&uri, db_name.as_deref()).await?;
            let store = MongoJamStore::connect(config).await?;
            Ok::<_, StorageError>(Arc::new(store) as Arc<dyn JamStore>)
        }
    }));
    Ok(())
}

#[cfg(not(feature = "mongo-store"))]
fn spawn_mongo_supervisor(_state: &SharedState) -> anyhow::Result<()> {
    bail!("this binary was built without the `mongo-store` feature")
}

#[cfg(feature = "couch-store")]
fn spawn_couch_supervisor(state: &SharedState) -> anyhow::Result<()> {
    use jam_hub_back::{
        dao::jam_store::{
            JamStore,
            couchdb::{CouchConfig, CouchJamStore},
        },
        dao::storage::StorageError,
        services::storage_supervisor,
    };

    let config = CouchConfig::from_env().context("reading CouchDB configuration")?;

    tokio::spawn(storage_supervisor::run(state.clone(), move || {
        let config = config.clone();
        async move {
            let store = CouchJamStore::connect(config).await?;
            Ok::<_, StorageError>(Arc::new(store) as Arc<dyn JamStore>)
        }
    }));
    Ok(())
}

#[cfg(not(feature = "couch-store"))]
fn spawn_couch_supervisor(_state: &SharedState) -> anyhow::Result<()> {
    bail!("this binary was built without the `couch-store` feature")
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
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
