use axum::{
    extract::Request,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower::Layer;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::api::ErrorBody;
use crate::catalog::CatalogService;
use crate::config::Config;

pub const BLOB_ROUTE: &str = "/movie-images";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<CatalogService>,
}

impl AppState {
    pub fn new(config: Config, catalog: Arc<CatalogService>) -> Self {
        Self {
            config: Arc::new(config),
            catalog,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/api/status", get(crate::api::status))
        .route("/api/listAll", get(crate::api::list_all))
        .route("/api/listByYear", get(crate::api::list_by_year))
        .route("/api/findByTitle", get(crate::api::find_by_title))
        .route("/api/summarize", get(crate::api::summarize));

    let mut router = Router::new()
        .route("/robots.txt", get(robots_txt_handler))
        .merge(api_routes);

    if let Some(ref dir) = state.config.blobs.directory {
        router = router.nest_service(BLOB_ROUTE, ServeDir::new(dir));
    }

    router
        .fallback(fallback_handler)
        .layer(axum::middleware::from_fn(crate::middleware::log_request))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The service handed to the listener: paths are normalized before the
/// router sees them.
pub fn app(router: Router) -> Router {
    let normalized = axum::middleware::from_fn(crate::middleware::normalize_path).layer(router);
    Router::new().fallback_service(normalized)
}

async fn robots_txt_handler() -> &'static str {
    "User-agent: *\nDisallow: /\n"
}

async fn fallback_handler(req: Request<axum::body::Body>) -> impl IntoResponse {
    if req.method() == axum::http::Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "Not found".to_string(),
        }),
    )
        .into_response()
}
