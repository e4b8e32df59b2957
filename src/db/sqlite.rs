use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use super::model::*;
use super::repo::*;

pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Open the store. `url` is either a `sqlite:` URL or a plain file path.
    pub async fn new(url: &str) -> DbResult<Self> {
        let options = if url.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(url)?
        } else {
            SqliteConnectOptions::new().filename(url)
        }
        .create_if_missing(true);

        // Every connection to an in-memory database sees its own database.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;

        info!("Document store opened at {}", url);

        Ok(store)
    }

    async fn init_schema(&self) -> DbResult<()> {
        let schema = include_str!("schema.sql");
        sqlx::query(schema).execute(&self.pool).await?;
        Ok(())
    }
}

fn decode_rows(rows: Vec<(String,)>) -> DbResult<Vec<Document>> {
    rows.into_iter()
        .map(|(body,)| serde_json::from_str(&body).map_err(DbError::from))
        .collect()
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn query(&self, query: Query) -> DbResult<Vec<Document>> {
        let rows: Vec<(String,)> = match query {
            Query::All => {
                sqlx::query_as("SELECT body FROM documents ORDER BY partition_key, id")
                    .fetch_all(&self.pool)
                    .await?
            }
            Query::Partition(partition_key) => {
                sqlx::query_as("SELECT body FROM documents WHERE partition_key = ? ORDER BY id")
                    .bind(partition_key)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        decode_rows(rows)
    }

    async fn read_by_id(&self, id: &str, partition_key: i64) -> DbResult<Document> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT body FROM documents WHERE id = ? AND partition_key = ?")
                .bind(id)
                .bind(partition_key)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((body,)) => Ok(serde_json::from_str(&body)?),
            None => Err(DbError::NotFound(format!("Document not found: {}", id))),
        }
    }

    async fn upsert(&self, doc: &Document) -> DbResult<()> {
        let (id, partition_key) = document_key(doc)?;
        let body = serde_json::to_string(doc)?;
        sqlx::query("INSERT OR REPLACE INTO documents (id, partition_key, body) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(partition_key)
            .bind(&body)
            .execute(&self.pool)
            .await?;
        debug!(id = %id, partition_key, "Upserted document");
        Ok(())
    }

    async fn delete(&self, id: &str, partition_key: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ? AND partition_key = ?")
            .bind(id)
            .bind(partition_key)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Document not found: {}", id)));
        }
        Ok(())
    }

    async fn replace_all(&self, docs: &[Document]) -> DbResult<()> {
        let mut rows = Vec::with_capacity(docs.len());
        for doc in docs {
            let (id, partition_key) = document_key(doc)?;
            rows.push((id, partition_key, serde_json::to_string(doc)?));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM documents").execute(&mut *tx).await?;
        for (id, partition_key, body) in &rows {
            sqlx::query("INSERT OR REPLACE INTO documents (id, partition_key, body) VALUES (?, ?, ?)")
                .bind(id)
                .bind(partition_key)
                .bind(body)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        info!("Replaced catalog with {} documents", rows.len());
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
