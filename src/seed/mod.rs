pub mod loader;
pub mod reseed;
pub mod schema;

use std::path::PathBuf;

use crate::db::DbError;

pub use loader::{find_csv_file, load_file, load_reader, load_rows, LoadedRows};
pub use reseed::{reseed, ReseedMode, ReseedReport};
pub use schema::{validate_schema, Column, HeaderMapping, REQUIRED_COLUMNS};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("No CSV files found in {0}")]
    NoInput(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing required columns: {}", .missing.join(", "))]
    SchemaInvalid { missing: Vec<String> },
    #[error("Failed to delete document {id} after clearing {cleared}: {source}")]
    PartialClearFailure {
        id: String,
        cleared: usize,
        #[source]
        source: DbError,
    },
    #[error("Store error: {0}")]
    Store(#[from] DbError),
}

pub type SeedResult<T> = Result<T, SeedError>;
