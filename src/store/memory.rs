//! In-memory document store with CouchDB conflict semantics.
//!
//! Faithful enough to exercise the merge-upload loop: `put_new` conflicts on
//! an existing id, `put_update` conflicts on a stale revision. View results
//! are scripted per `design/view` name.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::traits::{DocumentStore, StoreError, ViewRow};

struct StoredDoc {
    rev_seq: u64,
    body: Value,
}

fn rev_token(seq: u64) -> String {
    format!("{}-mem", seq)
}

pub struct InMemoryStore {
    docs: DashMap<String, StoredDoc>,
    views: DashMap<String, Vec<ViewRow>>,
    operations: AtomicU64,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            docs: DashMap::new(),
            views: DashMap::new(),
            operations: AtomicU64::new(0),
        }
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Total store calls made (any operation). Lets tests assert that an
    /// action produced no traffic at all.
    #[must_use]
    pub fn operations(&self) -> u64 {
        self.operations.load(Ordering::Acquire)
    }

    /// Fetch a document body without counting as an operation.
    #[must_use]
    pub fn peek(&self, id: &str) -> Option<Value> {
        self.docs.get(id).map(|d| d.body.clone())
    }

    /// Seed a document as if another listener had already uploaded it.
    pub fn seed(&self, id: impl Into<String>, body: Value) {
        self.docs.insert(id.into(), StoredDoc { rev_seq: 1, body });
    }

    /// Script the rows returned for `design/view`.
    pub fn set_view(&self, design: &str, view: &str, rows: Vec<ViewRow>) {
        self.views.insert(format!("{}/{}", design, view), rows);
    }

    fn count_op(&self) {
        self.operations.fetch_add(1, Ordering::Release);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn put_new(&self, id: &str, body: &Value) -> Result<(), StoreError> {
        self.count_op();
        if self.docs.contains_key(id) {
            return Err(StoreError::Conflict);
        }
        self.docs.insert(
            id.to_string(),
            StoredDoc {
                rev_seq: 1,
                body: body.clone(),
            },
        );
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<(Value, String), StoreError> {
        self.count_op();
        match self.docs.get(id) {
            Some(doc) => Ok((doc.body.clone(), rev_token(doc.rev_seq))),
            None => Err(StoreError::Http { status: 404 }),
        }
    }

    async fn put_update(&self, id: &str, rev: &str, body: &Value) -> Result<(), StoreError> {
        self.count_op();
        match self.docs.get_mut(id) {
            Some(mut doc) => {
                if rev_token(doc.rev_seq) != rev {
                    return Err(StoreError::Conflict);
                }
                doc.rev_seq += 1;
                doc.body = body.clone();
                Ok(())
            }
            None => Err(StoreError::Conflict),
        }
    }

    async fn view(
        &self,
        design: &str,
        view: &str,
        _params: &[(String, String)],
    ) -> Result<Vec<ViewRow>, StoreError> {
        self.count_op();
        Ok(self
            .views
            .get(&format!("{}/{}", design, view))
            .map(|rows| rows.clone())
            .unwrap_or_default())
    }
}
