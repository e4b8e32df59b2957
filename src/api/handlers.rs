use axum::{
    extract::{Query, State},
    Json,
};
use tracing::info;

use super::error::ApiError;
use crate::catalog::{CatalogStatus, Movie, MovieList, Summary, YearListing};
use crate::server::AppState;
use crate::util::QueryParams;

pub async fn status(State(state): State<AppState>) -> Result<Json<CatalogStatus>, ApiError> {
    info!("Testing document store connectivity");
    Ok(Json(state.catalog.status().await?))
}

pub async fn list_all(State(state): State<AppState>) -> Result<Json<MovieList>, ApiError> {
    Ok(Json(state.catalog.list_all().await?))
}

pub async fn list_by_year(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<YearListing>, ApiError> {
    let year = params
        .get_non_blank("year")
        .ok_or_else(|| ApiError::bad_request("Please provide a year parameter"))?;
    Ok(Json(state.catalog.list_by_year(year).await?))
}

pub async fn find_by_title(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Movie>, ApiError> {
    let title = title_param(&params)?;
    Ok(Json(state.catalog.find_by_title(title).await?))
}

pub async fn summarize(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Summary>, ApiError> {
    let title = title_param(&params)?;
    Ok(Json(state.catalog.summarize(title).await?))
}

fn title_param(params: &QueryParams) -> Result<&str, ApiError> {
    params
        .get_non_blank("title")
        .map(str::trim)
        .ok_or_else(|| ApiError::bad_request("Please provide a title parameter"))
}
