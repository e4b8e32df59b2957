use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::model::*;
use super::repo::*;

/// In-process document store, used for tests and dry runs.
#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<BTreeMap<(i64, String), Document>>,
    closed: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_open(&self) -> DbResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DbError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn query(&self, query: Query) -> DbResult<Vec<Document>> {
        self.check_open()?;
        let docs = self.docs.read().await;
        let found = docs
            .iter()
            .filter(|((partition_key, _), _)| match query {
                Query::All => true,
                Query::Partition(pk) => *partition_key == pk,
            })
            .map(|(_, doc)| doc.clone())
            .collect();
        Ok(found)
    }

    async fn read_by_id(&self, id: &str, partition_key: i64) -> DbResult<Document> {
        self.check_open()?;
        let docs = self.docs.read().await;
        docs.get(&(partition_key, id.to_string()))
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("Document not found: {}", id)))
    }

    async fn upsert(&self, doc: &Document) -> DbResult<()> {
        self.check_open()?;
        let (id, partition_key) = document_key(doc)?;
        let mut docs = self.docs.write().await;
        docs.insert((partition_key, id), doc.clone());
        Ok(())
    }

    async fn delete(&self, id: &str, partition_key: i64) -> DbResult<()> {
        self.check_open()?;
        let mut docs = self.docs.write().await;
        docs.remove(&(partition_key, id.to_string()))
            .map(|_| ())
            .ok_or_else(|| DbError::NotFound(format!("Document not found: {}", id)))
    }

    async fn replace_all(&self, new_docs: &[Document]) -> DbResult<()> {
        self.check_open()?;
        let mut replacement = BTreeMap::new();
        for doc in new_docs {
            let (id, partition_key) = document_key(doc)?;
            replacement.insert((partition_key, id), doc.clone());
        }
        let mut docs = self.docs.write().await;
        *docs = replacement;
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_partition_query() {
        let store = MemoryDocumentStore::new();
        store.upsert(&json!({"id": "year_2020", "year": 2020})).await.unwrap();
        store.upsert(&json!({"id": "year_1990", "year": 1990})).await.unwrap();

        let all = store.query(Query::All).await.unwrap();
        assert_eq!(all[0]["year"], 1990);
        assert_eq!(store.query(Query::Partition(2020)).await.unwrap().len(), 1);
        assert!(store.query(Query::Partition(1800)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_closed_store_refuses_requests() {
        let store = MemoryDocumentStore::new();
        store.close().await;
        assert!(matches!(store.query(Query::All).await, Err(DbError::Closed)));
    }

    #[tokio::test]
    async fn test_replace_all_rejects_invalid_batch() {
        let store = MemoryDocumentStore::new();
        store.upsert(&json!({"id": "year_2020", "year": 2020})).await.unwrap();
        assert!(store.replace_all(&[json!({"year": 2021})]).await.is_err());
        assert_eq!(store.query(Query::All).await.unwrap().len(), 1);
    }
}
