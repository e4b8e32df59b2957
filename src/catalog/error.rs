use std::time::Duration;

use super::model::ModelError;
use crate::db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("Movie '{0}' not found")]
    NotFound(String),
    #[error("Document store unavailable: {0}")]
    StoreUnavailable(#[from] DbError),
    #[error("Corrupt catalog document: {0}")]
    CorruptDocument(#[from] ModelError),
    #[error("Upstream error: {0}")]
    UpstreamError(String),
    #[error("Upstream call exceeded {0:?}")]
    UpstreamTimeout(Duration),
}

pub type CatalogResult<T> = Result<T, CatalogError>;
