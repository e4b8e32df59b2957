use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::error::{CatalogError, CatalogResult};
use super::group::{flatten, flatten_all};
use super::model::{document_id, Movie, YearDocument};
use super::textgen::{TextGenError, TextGenerator};
use crate::db::{DbError, Document, DocumentStore, Query};

pub const DEFAULT_SUMMARY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieList {
    pub movies: Vec<Movie>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearListing {
    pub movies: Vec<Movie>,
    pub total: usize,
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogStatus {
    pub status: &'static str,
    pub count: usize,
}

/// Read access to the movie catalog.
pub struct CatalogService {
    store: Arc<dyn DocumentStore>,
    textgen: Option<Arc<dyn TextGenerator>>,
    summary_timeout: Duration,
}

impl CatalogService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            textgen: None,
            summary_timeout: DEFAULT_SUMMARY_TIMEOUT,
        }
    }

    pub fn with_text_generator(mut self, textgen: Arc<dyn TextGenerator>) -> Self {
        self.textgen = Some(textgen);
        self
    }

    pub fn with_summary_timeout(mut self, timeout: Duration) -> Self {
        self.summary_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    async fn all_documents(&self) -> CatalogResult<Vec<YearDocument>> {
        let docs = self.store.query(Query::All).await.map_err(|e| {
            error!("Catalog query failed: {}", e);
            CatalogError::StoreUnavailable(e)
        })?;
        Ok(decode_documents(docs))
    }

    /// Connectivity check: how many year documents the store holds.
    pub async fn status(&self) -> CatalogResult<CatalogStatus> {
        let docs = self.store.query(Query::All).await.map_err(|e| {
            error!("Connection test failed: {}", e);
            CatalogError::StoreUnavailable(e)
        })?;
        Ok(CatalogStatus {
            status: "connected",
            count: docs.len(),
        })
    }

    pub async fn list_all(&self) -> CatalogResult<MovieList> {
        let docs = self.all_documents().await?;
        let movies = flatten_all(&docs);
        info!("Listing {} movies from {} documents", movies.len(), docs.len());
        Ok(MovieList {
            total: movies.len(),
            movies,
        })
    }

    pub async fn list_by_year(&self, year: &str) -> CatalogResult<YearListing> {
        let year: i32 = year
            .trim()
            .parse()
            .map_err(|_| CatalogError::InvalidInput("Year must be a valid number".to_string()))?;

        let id = document_id(year);
        let doc = match self.store.read_by_id(&id, i64::from(year)).await {
            Ok(doc) => doc,
            Err(DbError::NotFound(_)) => {
                info!(year, "No document for year");
                return Ok(YearListing {
                    movies: Vec::new(),
                    total: 0,
                    year,
                    message: Some(format!("No movies found for year {}", year)),
                });
            }
            Err(e) => {
                error!(year, "Reading year document failed: {}", e);
                return Err(CatalogError::StoreUnavailable(e));
            }
        };

        let doc = YearDocument::from_document(doc).map_err(|e| {
            error!(id = %id, "Corrupt year document: {}", e);
            CatalogError::CorruptDocument(e)
        })?;
        let movies = flatten(&doc);
        Ok(YearListing {
            total: movies.len(),
            movies,
            year,
            message: None,
        })
    }

    /// Full scan; returns the first movie whose title matches ignoring case.
    pub async fn find_by_title(&self, title: &str) -> CatalogResult<Movie> {
        let wanted = title.to_lowercase();
        for doc in self.all_documents().await? {
            if let Some(movie) = flatten(&doc)
                .into_iter()
                .find(|m| m.title.to_lowercase() == wanted)
            {
                return Ok(movie);
            }
        }
        Err(CatalogError::NotFound(title.to_string()))
    }

    pub async fn summarize(&self, title: &str) -> CatalogResult<Summary> {
        let movie = self.find_by_title(title).await?;
        let textgen = self.textgen.as_ref().ok_or_else(|| {
            warn!("Summary requested but no text generator is configured");
            CatalogError::UpstreamError("text generation is not configured".to_string())
        })?;

        let prompt = summary_prompt(&movie);
        debug!(title = %movie.title, "Requesting summary");

        let summary = match tokio::time::timeout(self.summary_timeout, textgen.generate(&prompt)).await {
            Ok(Ok(text)) => text,
            Ok(Err(TextGenError::Timeout)) | Err(_) => {
                error!(title = %movie.title, "Summary request timed out");
                return Err(CatalogError::UpstreamTimeout(self.summary_timeout));
            }
            Ok(Err(e)) => {
                error!(title = %movie.title, "Summary request failed: {}", e);
                return Err(CatalogError::UpstreamError(e.to_string()));
            }
        };

        Ok(Summary {
            title: movie.title,
            summary,
        })
    }
}

pub fn summary_prompt(movie: &Movie) -> String {
    format!(
        "Write a brief, spoiler-free summary of the {} movie \"{}\" released in {}. \
         Keep it to two or three sentences.",
        movie.genre.to_lowercase(),
        movie.title,
        movie.year
    )
}

/// Parse raw documents, logging and skipping any that are malformed.
pub fn decode_documents(docs: Vec<Document>) -> Vec<YearDocument> {
    docs.into_iter()
        .filter_map(|doc| match YearDocument::from_document(doc) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!("Skipping malformed document: {}", e);
                None
            }
        })
        .collect()
}
