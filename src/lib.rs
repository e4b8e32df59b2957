pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod enrich;
pub mod middleware;
pub mod seed;
pub mod server;
pub mod util;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use catalog::{CatalogService, HttpTextGenerator};
use config::Config;
use db::{DocumentStore, Query, SqliteDocumentStore};
use enrich::{EnrichReport, Enricher, FsBlobStore, PosterClient};
use seed::{ReseedMode, ReseedReport};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] db::DbError),
    #[error("Seeding failed: {0}")]
    Seed(#[from] seed::SeedError),
    #[error("Enrichment failed: {0}")]
    Enrich(#[from] enrich::EnrichError),
    #[error("Server error: {0}")]
    Server(String),
}

pub async fn open_store(config: &Config) -> Result<Arc<dyn DocumentStore>, AppError> {
    info!("Opening document store at {}", config.database.url);
    let store = SqliteDocumentStore::new(&config.database.url).await?;
    Ok(Arc::new(store))
}

fn build_catalog(config: &Config, store: Arc<dyn DocumentStore>) -> Result<CatalogService, AppError> {
    let mut catalog = CatalogService::new(store);
    match config.textgen {
        Some(ref textgen) => {
            let generator = HttpTextGenerator::new(textgen)
                .map_err(|e| AppError::Server(format!("Failed to create text generator: {}", e)))?;
            info!("Summaries via {}", textgen.endpoint);
            catalog = catalog
                .with_text_generator(Arc::new(generator))
                .with_summary_timeout(Duration::from_secs(textgen.timeout_secs));
        }
        None => warn!("No text generation endpoint configured, summaries are disabled"),
    }
    Ok(catalog)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

/// Serve the read API until Ctrl-C.
pub async fn run(config: Config) -> Result<(), AppError> {
    if config.debug_logs {
        info!("Debug logging enabled");
    }

    let store = open_store(&config).await?;
    let catalog = Arc::new(build_catalog(&config, store.clone())?);

    let address = config.listen.address.as_deref().unwrap_or("[::]");
    let port = &config.listen.port;
    let addr: SocketAddr = format!("{}:{}", address, port)
        .parse()
        .map_err(|e| AppError::Server(format!("Invalid address: {}", e)))?;

    let tls = match (&config.listen.tlscert, &config.listen.tlskey) {
        (Some(cert), Some(key)) => Some((cert.clone(), key.clone())),
        _ => None,
    };

    let state = server::AppState::new(config, catalog);
    let app = server::app(server::build_router(state));

    let served = if let Some((cert_path, key_path)) = tls {
        info!("Loading TLS certificate from {}", cert_path);
        info!("Loading TLS key from {}", key_path);

        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(&cert_path, &key_path)
            .await
            .map_err(|e| AppError::Server(format!("Failed to load TLS config: {}", e)))?;

        let handle = axum_server::Handle::new();
        let shutdown = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown.graceful_shutdown(Some(Duration::from_secs(10)));
        });

        info!("Serving HTTPS on {}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(app.into_make_service())
            .await
            .map_err(|e| AppError::Server(format!("Server error: {}", e)))
    } else {
        info!("Serving HTTP on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::Server(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| AppError::Server(format!("Server error: {}", e)))
    };

    store.close().await;
    info!("Document store closed");
    served
}

/// Replace the catalog with the contents of a CSV file.
///
/// Without `file`, the first CSV in `data_dir` (or the configured data
/// directory) is used.
pub async fn run_seed(
    config: &Config,
    file: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    mode: Option<ReseedMode>,
) -> Result<ReseedReport, AppError> {
    let file = match file {
        Some(file) => file,
        None => {
            let dir = data_dir.unwrap_or_else(|| PathBuf::from(&config.seed.data_dir));
            seed::find_csv_file(&dir)?
        }
    };

    seed_from_file(config, &file, mode.unwrap_or(config.seed.mode)).await
}

async fn seed_from_file(config: &Config, file: &Path, mode: ReseedMode) -> Result<ReseedReport, AppError> {
    // Schema and rows are checked before the store is touched.
    let loaded = seed::load_file(file)?;
    if loaded.movies.is_empty() {
        warn!("No valid rows in {}, the catalog will be emptied", file.display());
    }

    let store = open_store(config).await?;
    let result = seed::reseed(store.as_ref(), loaded.movies, mode).await;
    store.close().await;

    let report = result?;
    info!(
        cleared = report.cleared,
        written = report.written,
        failed = report.failed_years.len(),
        skipped_rows = loaded.skipped,
        "Seeding completed"
    );
    Ok(report)
}

/// Fetch posters for every movie without a cover, optionally only for one
/// release year.
pub async fn run_enrich(config: &Config, year: Option<i32>) -> Result<EnrichReport, AppError> {
    let posters = PosterClient::new(&config.omdb)?;
    let blob_dir = config
        .blobs
        .directory
        .as_ref()
        .ok_or(config::ConfigError::Missing("blobs.directory"))?;
    let blobs = FsBlobStore::new(blob_dir, &config.blobs.base_url);

    let store = open_store(config).await?;
    let enricher = Enricher::new(
        store.clone(),
        Arc::new(posters),
        Arc::new(blobs),
        Duration::from_millis(config.omdb.request_delay_ms),
    );
    let query = match year {
        Some(year) => Query::Partition(i64::from(year)),
        None => Query::All,
    };
    let result = enricher.run(query).await;
    store.close().await;

    Ok(result?)
}
