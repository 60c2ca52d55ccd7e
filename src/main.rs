mod annotate;
mod archive_client;
mod config;
mod domain;
mod scrape;
mod storage;
mod sync;
mod tracker_api;

use std::{path::Path, sync::Arc};

use anyhow::Context;
use archive_client::{ArchiveClient, PageFetcher, RetryingFetcher};
use config::Config;
use migration::MigratorTrait;
use poem::{
    EndpointExt, Route, Server,
    listener::TcpListener,
    middleware::{Cors, Tracing as PoemTracing},
};
use poem_openapi::OpenApiService;
use sea_orm::Database;
use storage::{SeaOrmStore, TrackerStore};
use sync::{StatusBoard, SyncEngine, VisitHandler};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt::SubscriberBuilder, prelude::*};

type TrackerResult<T> = anyhow::Result<T>;

#[tokio::main]
async fn main() -> TrackerResult<()> {
    // Respect RUST_LOG if set, default to info for our crate and warn for deps.
    let default_filter = format!(
        "{}=info,poem=info,reqwest=warn,h2=warn,sqlx=warn",
        env!("CARGO_PKG_NAME")
    );
    let env_filter = std::env::var("RUST_LOG").unwrap_or(default_filter);
    SubscriberBuilder::default()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_target(false)
        .with_level(true)
        .pretty()
        .finish()
        .with(ErrorLayer::default())
        .init();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting AO3 tracker");

    if Path::new(".env.local").exists() {
        dotenvy::from_filename(".env.local")?;
    } else if Path::new(".env").exists() {
        dotenvy::from_filename(".env")?;
    };
    let config = Config::load()?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let db_conn = Database::connect(&config.db_connection_string)
        .await
        .with_context(|| "Failed to connect to database")?;
    migration::Migrator::up(&db_conn, None)
        .await
        .with_context(|| "Failed to run database migrations")?;

    let store = TrackerStore::new(Arc::new(SeaOrmStore::new(db_conn)));
    store
        .clear_stale_sync_markers()
        .await
        .with_context(|| "Failed to clear stale sync markers")?;

    let client = ArchiveClient::new(&config.archive_base_url)?.with_cookie(&config.archive_cookie);
    let has_cookie = !config.archive_cookie.is_empty();
    tracing::info!(archive = %config.archive_base_url, has_cookie, "configured archive client");
    let origin = client.base_url().clone();
    let fetcher: Arc<dyn PageFetcher> =
        Arc::new(RetryingFetcher::new(client, config.retry_policy()));

    let board = Arc::new(StatusBoard::new());
    let engine = Arc::new(
        SyncEngine::new(store, fetcher, origin, config.sync_settings()).with_observer(board.clone()),
    );
    let visits = Arc::new(VisitHandler::new(engine.clone(), config.auto_sync_interval()));

    run_poem(
        tracker_api::TrackerApi {
            engine,
            board,
            visits,
        },
        &config.bind_addr,
    )
    .await
}

pub async fn run_poem(api: tracker_api::TrackerApi, bind_addr: &str) -> TrackerResult<()> {
    let version = env!("CARGO_PKG_VERSION");
    let api_service = OpenApiService::new(api, "AO3 Tracker API", version)
        .server(format!("http://{bind_addr}"));
    let ui = api_service.rapidoc();
    let spec = api_service.spec();
    let route = Route::new()
        .nest("/", api_service)
        .nest("/ui", ui)
        .nest("/spec", poem::endpoint::make_sync(move |_| spec.clone()))
        .with(Cors::new())
        .with(PoemTracing);

    tracing::info!(%bind_addr, "starting HTTP server");
    Server::new(TcpListener::bind(bind_addr.to_string()))
        .run(route)
        .await?;
    Ok(())
}
