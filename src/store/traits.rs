use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// The document (or revision) we tried to write already moved on.
    #[error("document update conflict")]
    Conflict,
    /// I/O, TLS or timeout failure before an HTTP status was obtained.
    #[error("transport error: {0}")]
    Transport(String),
    /// Any non-conflict error status from the database.
    #[error("unexpected HTTP status {status}")]
    Http { status: u16 },
    /// The database answered 2xx but the body was not what we expect.
    #[error("could not decode store response: {0}")]
    Decode(String),
}

/// One row of a view query result.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewRow {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub key: Value,
    #[serde(default)]
    pub value: Value,
    /// Present when the view was queried with `include_docs=true`.
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Narrow facade over a CouchDB-compatible document store.
///
/// Implementations are stateless between calls and never retry on their own;
/// conflict resolution is the caller's business.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document. Fails with [`StoreError::Conflict`] if `id` exists.
    async fn put_new(&self, id: &str, body: &Value) -> Result<(), StoreError>;

    /// Fetch a document body and its current revision token.
    async fn get(&self, id: &str) -> Result<(Value, String), StoreError>;

    /// Update a document against a revision token. Fails with
    /// [`StoreError::Conflict`] if the revision is stale.
    async fn put_update(&self, id: &str, rev: &str, body: &Value) -> Result<(), StoreError>;

    /// Query a named view. `params` values must already be encoded the way
    /// the view engine expects (JSON for `startkey` and friends).
    async fn view(
        &self,
        design: &str,
        view: &str,
        params: &[(String, String)],
    ) -> Result<Vec<ViewRow>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_view_row_deserialize_with_doc() {
        let row: ViewRow = serde_json::from_value(json!({
            "id": "abc",
            "key": [123, 456],
            "value": null,
            "doc": {"type": "flight"}
        }))
        .unwrap();
        assert_eq!(row.id, "abc");
        assert_eq!(row.key[0], 123);
        assert_eq!(row.doc.unwrap()["type"], "flight");
    }

    #[test]
    fn test_view_row_deserialize_minimal() {
        let row: ViewRow = serde_json::from_value(json!({"id": "x"})).unwrap();
        assert!(row.doc.is_none());
        assert!(row.key.is_null());
    }

    #[test]
    fn test_store_error_display() {
        assert_eq!(StoreError::Conflict.to_string(), "document update conflict");
        assert_eq!(
            StoreError::Http { status: 500 }.to_string(),
            "unexpected HTTP status 500"
        );
    }
}
