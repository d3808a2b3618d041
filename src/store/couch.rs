//! CouchDB client over reqwest.
//!
//! Thin and stateless: one method per HTTP shape the uploader needs, a fixed
//! transport timeout, and no retrying. Status mapping is the whole contract:
//! 201/202 success, 409 conflict, anything else an HTTP error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::traits::{DocumentStore, StoreError, ViewRow};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ViewResponse {
    #[serde(default)]
    rows: Vec<ViewRow>,
}

/// HTTP client for one database on one CouchDB server.
pub struct CouchStore {
    http: reqwest::Client,
    db_url: String,
}

impl CouchStore {
    /// Build a client for `{couch_url}/{database}`.
    pub fn new(couch_url: &str, database: &str) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("uplink-engine/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(transport)?;

        Ok(Self {
            http,
            db_url: format!("{}/{}", couch_url.trim_end_matches('/'), database),
        })
    }

    fn doc_url(&self, id: &str) -> String {
        format!("{}/{}", self.db_url, id)
    }

    fn check_write_status(status: StatusCode) -> Result<(), StoreError> {
        match status.as_u16() {
            201 | 202 => Ok(()),
            409 => Err(StoreError::Conflict),
            other => Err(StoreError::Http { status: other }),
        }
    }
}

fn transport(err: reqwest::Error) -> StoreError {
    StoreError::Transport(err.to_string())
}

#[async_trait]
impl DocumentStore for CouchStore {
    async fn put_new(&self, id: &str, body: &Value) -> Result<(), StoreError> {
        let resp = self
            .http
            .put(self.doc_url(id))
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        debug!(id = %id, status = resp.status().as_u16(), "put_new");
        Self::check_write_status(resp.status())
    }

    async fn get(&self, id: &str) -> Result<(Value, String), StoreError> {
        let resp = self
            .http
            .get(self.doc_url(id))
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        debug!(id = %id, status = status.as_u16(), "get");
        if !status.is_success() {
            return Err(StoreError::Http {
                status: status.as_u16(),
            });
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        let rev = body
            .get("_rev")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Decode("document body carries no _rev".to_string()))?
            .to_string();

        Ok((body, rev))
    }

    async fn put_update(&self, id: &str, rev: &str, body: &Value) -> Result<(), StoreError> {
        // CouchDB accepts the revision either as ?rev= or as _rev in the
        // body; we send the body field so the payload is self-describing.
        let mut body = body.clone();
        if let Some(map) = body.as_object_mut() {
            map.insert("_rev".to_string(), Value::String(rev.to_string()));
        }

        let resp = self
            .http
            .put(self.doc_url(id))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        debug!(id = %id, rev = %rev, status = resp.status().as_u16(), "put_update");
        Self::check_write_status(resp.status())
    }

    async fn view(
        &self,
        design: &str,
        view: &str,
        params: &[(String, String)],
    ) -> Result<Vec<ViewRow>, StoreError> {
        let url = format!("{}/_design/{}/_view/{}", self.db_url, design, view);
        let resp = self
            .http
            .get(url)
            .query(&params)
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        debug!(design = %design, view = %view, status = status.as_u16(), "view");
        if !status.is_success() {
            return Err(StoreError::Http {
                status: status.as_u16(),
            });
        }

        let parsed: ViewResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(parsed.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_construction() {
        let store = CouchStore::new("http://habitat.habhub.org/", "habitat").unwrap();
        assert_eq!(store.db_url, "http://habitat.habhub.org/habitat");
        assert_eq!(
            store.doc_url("abc123"),
            "http://habitat.habhub.org/habitat/abc123"
        );
    }

    #[test]
    fn test_write_status_mapping() {
        assert!(CouchStore::check_write_status(StatusCode::CREATED).is_ok());
        assert!(CouchStore::check_write_status(StatusCode::ACCEPTED).is_ok());
        assert!(matches!(
            CouchStore::check_write_status(StatusCode::CONFLICT),
            Err(StoreError::Conflict)
        ));
        assert!(matches!(
            CouchStore::check_write_status(StatusCode::INTERNAL_SERVER_ERROR),
            Err(StoreError::Http { status: 500 })
        ));
        assert!(matches!(
            CouchStore::check_write_status(StatusCode::UNAUTHORIZED),
            Err(StoreError::Http { status: 401 })
        ));
    }
}
