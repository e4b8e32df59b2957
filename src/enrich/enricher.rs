use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::blob::{blob_name, BlobStore};
use super::omdb::PosterSource;
use super::EnrichResult;
use crate::catalog::{Movie, YearDocument};
use crate::db::{DocumentStore, Query};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichReport {
    pub examined_documents: usize,
    pub updated_movies: usize,
    pub updated_documents: usize,
    pub failed_documents: usize,
}

/// Adds `coverURL` to every catalog movie that lacks one.
///
/// Each document is read, modified and written back without a version
/// check, so a concurrent writer to the same year can lose its update.
pub struct Enricher {
    store: Arc<dyn DocumentStore>,
    posters: Arc<dyn PosterSource>,
    blobs: Arc<dyn BlobStore>,
    request_delay: Duration,
}

impl Enricher {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        posters: Arc<dyn PosterSource>,
        blobs: Arc<dyn BlobStore>,
        request_delay: Duration,
    ) -> Self {
        Self {
            store,
            posters,
            blobs,
            request_delay,
        }
    }

    /// Enrich the documents selected by `query`.
    pub async fn run(&self, query: Query) -> EnrichResult<EnrichReport> {
        let docs = self.store.query(query).await?;
        let mut report = EnrichReport::default();

        for raw in docs {
            report.examined_documents += 1;
            let mut doc = match YearDocument::from_document(raw) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!("Skipping malformed document: {}", e);
                    report.failed_documents += 1;
                    continue;
                }
            };

            let mut modified = 0;
            for movie in doc.movies_mut() {
                if movie.cover_url.is_some() {
                    continue;
                }
                info!("Processing {} ({})", movie.title, movie.year);
                tokio::time::sleep(self.request_delay).await;

                match self.cover_for(movie).await {
                    Ok(Some(url)) => {
                        info!("Added cover for {}", movie.title);
                        movie.cover_url = Some(url);
                        modified += 1;
                    }
                    Ok(None) => warn!("No poster found for {} ({})", movie.title, movie.year),
                    Err(e) => error!("Error getting poster for {}: {}", movie.title, e),
                }
            }

            if modified == 0 {
                continue;
            }
            match self.store.upsert(&doc.to_document()).await {
                Ok(()) => {
                    report.updated_documents += 1;
                    report.updated_movies += modified;
                }
                Err(e) => {
                    error!(id = %doc.id, "Failed to write back document: {}", e);
                    report.failed_documents += 1;
                }
            }
        }

        info!(
            examined = report.examined_documents,
            updated = report.updated_documents,
            movies = report.updated_movies,
            failed = report.failed_documents,
            "Movie cover upload completed"
        );
        Ok(report)
    }

    async fn cover_for(&self, movie: &Movie) -> EnrichResult<Option<String>> {
        let Some(poster_url) = self.posters.poster_url(&movie.title, movie.year).await? else {
            return Ok(None);
        };
        let image = self.posters.download(&poster_url).await?;
        let url = self
            .blobs
            .upload(&blob_name(&movie.title, movie.year), &image)
            .await?;
        Ok(Some(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{flatten, group};
    use crate::db::{DbError, DbResult, Document, MemoryDocumentStore};
    use crate::enrich::EnrichError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    struct FakePosters;

    #[async_trait]
    impl PosterSource for FakePosters {
        async fn poster_url(&self, title: &str, _year: i32) -> EnrichResult<Option<String>> {
            match title {
                "Unknown" => Ok(None),
                "Broken" => Err(EnrichError::Status { status: 500, url: "omdb".to_string() }),
                _ => Ok(Some(format!("http://img/{}", title))),
            }
        }

        async fn download(&self, url: &str) -> EnrichResult<Vec<u8>> {
            Ok(url.as_bytes().to_vec())
        }
    }

    #[derive(Default)]
    struct MemoryBlobs {
        blobs: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl BlobStore for MemoryBlobs {
        async fn upload(&self, name: &str, data: &[u8]) -> EnrichResult<String> {
            self.blobs.lock().await.insert(name.to_string(), data.to_vec());
            Ok(format!("mem://{}", name))
        }
    }

    #[tokio::test]
    async fn test_enrich_adds_missing_covers() {
        let store = Arc::new(MemoryDocumentStore::new());
        let mut covered = Movie::new("Alpha", "Drama", 2008);
        covered.cover_url = Some("mem://existing".to_string());
        let movies = vec![
            covered,
            Movie::new("Beta", "Drama", 2008),
            Movie::new("Unknown", "Drama", 2008),
            Movie::new("Broken", "Drama", 2010),
        ];
        for doc in group(movies).values() {
            store.upsert(&doc.to_document()).await.unwrap();
        }

        let blobs = Arc::new(MemoryBlobs::default());
        let enricher = Enricher::new(store.clone(), Arc::new(FakePosters), blobs.clone(), Duration::ZERO);
        let report = enricher.run(Query::All).await.unwrap();

        assert_eq!(
            report,
            EnrichReport {
                examined_documents: 2,
                updated_movies: 1,
                updated_documents: 1,
                failed_documents: 0,
            }
        );

        let doc = YearDocument::from_document(store.read_by_id("year_2008", 2008).await.unwrap()).unwrap();
        let covers: Vec<(String, Option<String>)> = flatten(&doc)
            .into_iter()
            .map(|m| (m.title, m.cover_url))
            .collect();
        assert_eq!(
            covers,
            vec![
                ("Alpha".to_string(), Some("mem://existing".to_string())),
                ("Beta".to_string(), Some("mem://Beta-2008.jpg".to_string())),
                ("Unknown".to_string(), None),
            ]
        );
        assert_eq!(
            blobs.blobs.lock().await.get("Beta-2008.jpg").cloned(),
            Some(b"http://img/Beta".to_vec())
        );
    }

    #[tokio::test]
    async fn test_enrich_keeps_store_fields() {
        let store = Arc::new(MemoryDocumentStore::new());
        store
            .upsert(&json!({
                "id": "year_1999",
                "year": 1999,
                "_ts": 12345,
                "m": {"movies": [{"title": "Matrix", "genre": "Action", "year": 1999}]}
            }))
            .await
            .unwrap();

        let enricher = Enricher::new(
            store.clone(),
            Arc::new(FakePosters),
            Arc::new(MemoryBlobs::default()),
            Duration::ZERO,
        );
        enricher.run(Query::All).await.unwrap();

        let doc = store.read_by_id("year_1999", 1999).await.unwrap();
        assert_eq!(doc["_ts"], 12345);
        assert_eq!(doc["m"]["movies"][0]["coverURL"], "mem://Matrix-1999.jpg");
    }

    /// Refuses writes to one year.
    struct ReadOnlyYear {
        inner: MemoryDocumentStore,
        year: i64,
    }

    #[async_trait]
    impl DocumentStore for ReadOnlyYear {
        async fn query(&self, query: Query) -> DbResult<Vec<Document>> {
            self.inner.query(query).await
        }
        async fn read_by_id(&self, id: &str, partition_key: i64) -> DbResult<Document> {
            self.inner.read_by_id(id, partition_key).await
        }
        async fn upsert(&self, doc: &Document) -> DbResult<()> {
            if doc["year"].as_i64() == Some(self.year) {
                return Err(DbError::InvalidDocument("read only".to_string()));
            }
            self.inner.upsert(doc).await
        }
        async fn delete(&self, id: &str, partition_key: i64) -> DbResult<()> {
            self.inner.delete(id, partition_key).await
        }
        async fn replace_all(&self, docs: &[Document]) -> DbResult<()> {
            self.inner.replace_all(docs).await
        }
        async fn close(&self) {}
    }

    async fn seeded(movies: Vec<Movie>) -> MemoryDocumentStore {
        let store = MemoryDocumentStore::new();
        for doc in group(movies).values() {
            store.upsert(&doc.to_document()).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_failed_write_back_does_not_stop_run() {
        let inner = seeded(vec![
            Movie::new("Alpha", "Drama", 2008),
            Movie::new("Gamma", "Drama", 2010),
        ])
        .await;
        let store = Arc::new(ReadOnlyYear { inner, year: 2008 });

        let enricher = Enricher::new(
            store.clone(),
            Arc::new(FakePosters),
            Arc::new(MemoryBlobs::default()),
            Duration::ZERO,
        );
        let report = enricher.run(Query::All).await.unwrap();
        assert_eq!(
            report,
            EnrichReport {
                examined_documents: 2,
                updated_movies: 1,
                updated_documents: 1,
                failed_documents: 1,
            }
        );

        let doc = store.read_by_id("year_2010", 2010).await.unwrap();
        assert_eq!(doc["g"]["movies"][0]["coverURL"], "mem://Gamma-2010.jpg");
        let doc = store.read_by_id("year_2008", 2008).await.unwrap();
        assert!(doc["a"]["movies"][0].get("coverURL").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_before_each_lookup() {
        let mut covered = Movie::new("Delta", "Drama", 2008);
        covered.cover_url = Some("mem://existing".to_string());
        let store = Arc::new(
            seeded(vec![
                covered,
                Movie::new("Alpha", "Drama", 2008),
                Movie::new("Beta", "Drama", 2008),
                Movie::new("Gamma", "Drama", 2010),
            ])
            .await,
        );

        let delay = Duration::from_millis(300);
        let enricher = Enricher::new(store, Arc::new(FakePosters), Arc::new(MemoryBlobs::default()), delay);

        let start = tokio::time::Instant::now();
        let report = enricher.run(Query::All).await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(report.updated_movies, 3);
        assert!(elapsed >= delay * 3, "elapsed {:?}", elapsed);
        assert!(elapsed < delay * 4, "elapsed {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_enrich_single_year() {
        let store = Arc::new(
            seeded(vec![
                Movie::new("Alpha", "Drama", 2008),
                Movie::new("Gamma", "Drama", 2010),
            ])
            .await,
        );
        let enricher = Enricher::new(
            store.clone(),
            Arc::new(FakePosters),
            Arc::new(MemoryBlobs::default()),
            Duration::ZERO,
        );
        let report = enricher.run(Query::Partition(2010)).await.unwrap();
        assert_eq!(report.examined_documents, 1);
        assert_eq!(report.updated_movies, 1);

        let doc = store.read_by_id("year_2008", 2008).await.unwrap();
        assert!(doc["a"]["movies"][0].get("coverURL").is_none());
        let doc = store.read_by_id("year_2010", 2010).await.unwrap();
        assert_eq!(doc["g"]["movies"][0]["coverURL"], "mem://Gamma-2010.jpg");
    }
}
