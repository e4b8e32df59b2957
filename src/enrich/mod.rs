pub mod blob;
pub mod enricher;
pub mod omdb;

use crate::db::DbError;

pub use blob::{blob_name, sanitize_title, BlobStore, FsBlobStore};
pub use enricher::{EnrichReport, Enricher};
pub use omdb::{PosterClient, PosterSource};

#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("Store error: {0}")]
    Store(#[from] DbError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Missing configuration: {0}")]
    Config(&'static str),
}

pub type EnrichResult<T> = Result<T, EnrichError>;
