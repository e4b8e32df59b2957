use serde_json::Value;

/// A raw catalog document as it lives in the store.
pub type Document = Value;

/// Selects which documents a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    /// Every document, across all partitions.
    All,
    /// Every document in one partition (release year).
    Partition(i64),
}

/// Extract the `(id, partition key)` pair every stored document must carry.
pub fn document_key(doc: &Document) -> DbResult<(String, i64)> {
    let id = doc
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| DbError::InvalidDocument("missing string field 'id'".to_string()))?;
    let year = doc
        .get("year")
        .and_then(Value::as_i64)
        .ok_or_else(|| {
            DbError::InvalidDocument(format!("document {} has no integer field 'year'", id))
        })?;
    Ok((id.to_string(), year))
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    #[error("Corrupt document body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Store is closed")]
    Closed,
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_key() {
        let doc = json!({"id": "year_2008", "year": 2008});
        assert_eq!(document_key(&doc).unwrap(), ("year_2008".to_string(), 2008));
    }

    #[test]
    fn test_document_key_rejects_missing_fields() {
        assert!(matches!(
            document_key(&json!({"year": 2008})),
            Err(DbError::InvalidDocument(_))
        ));
        assert!(matches!(
            document_key(&json!({"id": "year_2008", "year": "2008"})),
            Err(DbError::InvalidDocument(_))
        ));
    }
}
