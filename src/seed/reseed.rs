use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::{SeedError, SeedResult};
use crate::catalog::{group, Movie};
use crate::db::{document_key, Document, DocumentStore, Query};

/// How the old catalog is swapped for the new one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReseedMode {
    /// One batch write; readers see either the old or the new catalog.
    #[default]
    Atomic,
    /// Delete every document, then upsert one document per year.
    TwoPhase,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReseedReport {
    pub cleared: usize,
    pub written: usize,
    pub failed_years: Vec<i32>,
}

/// Destructively replace the catalog with `movies`.
pub async fn reseed(
    store: &dyn DocumentStore,
    movies: Vec<Movie>,
    mode: ReseedMode,
) -> SeedResult<ReseedReport> {
    let groups = group(movies);
    info!("Grouped movies into {} year documents", groups.len());

    match mode {
        ReseedMode::Atomic => {
            let existing = store.query(Query::All).await?;
            let docs: Vec<Document> = groups.values().map(|doc| doc.to_document()).collect();
            store.replace_all(&docs).await?;
            info!("Replaced {} documents with {}", existing.len(), docs.len());
            Ok(ReseedReport {
                cleared: existing.len(),
                written: docs.len(),
                failed_years: Vec::new(),
            })
        }
        ReseedMode::TwoPhase => {
            let cleared = clear(store).await?;
            let mut report = ReseedReport {
                cleared,
                ..Default::default()
            };

            for (year, doc) in &groups {
                match store.upsert(&doc.to_document()).await {
                    Ok(()) => {
                        info!(year, "Added document");
                        report.written += 1;
                    }
                    Err(e) => {
                        error!(year, "Error adding document: {}", e);
                        report.failed_years.push(*year);
                    }
                }
            }

            if !report.failed_years.is_empty() {
                warn!("{} year documents could not be written", report.failed_years.len());
            }
            Ok(report)
        }
    }
}

/// Delete every document. Stops at the first failure; documents already
/// deleted stay deleted.
async fn clear(store: &dyn DocumentStore) -> SeedResult<usize> {
    let docs = store.query(Query::All).await?;
    if docs.is_empty() {
        info!("Database is empty, nothing to clear");
        return Ok(0);
    }

    info!("Clearing {} existing documents", docs.len());
    let mut cleared = 0;
    for doc in &docs {
        let (id, partition_key) = document_key(doc).map_err(|source| SeedError::PartialClearFailure {
            id: doc.get("id").map(|v| v.to_string()).unwrap_or_default(),
            cleared,
            source,
        })?;

        if let Err(source) = store.delete(&id, partition_key).await {
            error!(id = %id, "Error deleting document: {}", source);
            return Err(SeedError::PartialClearFailure { id, cleared, source });
        }
        cleared += 1;
    }

    info!("Cleared {} documents", cleared);
    Ok(cleared)
}
