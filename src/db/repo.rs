use async_trait::async_trait;

use super::model::*;

/// Client for the catalog document database.
///
/// Documents are JSON objects keyed by `id` within a partition; the
/// partition key is the document's integer `year` field.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents come back ordered by `(partition key, id)`.
    async fn query(&self, query: Query) -> DbResult<Vec<Document>>;
    async fn read_by_id(&self, id: &str, partition_key: i64) -> DbResult<Document>;
    async fn upsert(&self, doc: &Document) -> DbResult<()>;
    async fn delete(&self, id: &str, partition_key: i64) -> DbResult<()>;
    /// Remove every document and write `docs` as one atomic batch.
    async fn replace_all(&self, docs: &[Document]) -> DbResult<()>;
    async fn close(&self);
}
