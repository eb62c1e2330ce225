use std::cmp::Ordering;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::error::DomainError;

pub type DocumentData = Map<String, Value>;

/// A schema-less record of a remote collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub revision: u64,
    pub data: DocumentData,
}

impl Document {
    pub fn str_field(&self, name: &str) -> String {
        match self.data.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    pub fn opt_str_field(&self, name: &str) -> Option<String> {
        match self.data.get(name) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    pub fn u64_field(&self, name: &str) -> u64 {
        match self.data.get(name) {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
                .unwrap_or(0),
            _ => 0,
        }
    }

    pub fn f64_field(&self, name: &str) -> f64 {
        self.data
            .get(name)
            .and_then(Value::as_f64)
            .unwrap_or_default()
    }

    /// String members of an array field; anything else is skipped.
    pub fn string_list(&self, name: &str) -> Vec<String> {
        match self.data.get(name) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    pub filters: Vec<(String, Value)>,
    /// Field to sort on, largest first.
    pub descending_by: Option<String>,
    pub limit: Option<usize>,
}

impl DocumentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    pub fn order_desc(mut self, field: &str) -> Self {
        self.descending_by = Some(field.to_string());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| doc.data.get(field) == Some(expected))
    }

    /// Ordering used by backends that sort client side; ties fall back to id.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let by_field = match &self.descending_by {
            Some(field) => compare_values(a.data.get(field), b.data.get(field)).reverse(),
            None => Ordering::Equal,
        };
        by_field.then_with(|| a.id.cmp(&b.id))
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .unwrap_or_default()
            .total_cmp(&y.as_f64().unwrap_or_default()),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    None,
    Revision(u64),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },
    #[error("revision mismatch on {collection}/{id}: expected {expected}, found {actual}")]
    RevisionMismatch {
        collection: String,
        id: String,
        expected: u64,
        actual: u64,
    },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("backend refused credentials")]
    Unauthorized,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("malformed document: {0}")]
    Malformed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => {
                DomainError::NotFound(format!("{collection}/{id}"))
            }
            StoreError::RevisionMismatch { collection, id, .. } => {
                DomainError::Conflict(format!("{collection}/{id}"))
            }
            StoreError::Http(e) if e.is_timeout() || e.is_connect() || e.is_request() => {
                DomainError::NetworkFailure(e.to_string())
            }
            StoreError::Http(e) => DomainError::Upstream(e.to_string()),
            StoreError::Rejected { status, body } => {
                DomainError::Upstream(format!("status {status}: {body}"))
            }
            StoreError::Unauthorized => {
                DomainError::Upstream("backend refused credentials".to_string())
            }
            StoreError::Database(
                e @ (sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed),
            ) => DomainError::NetworkFailure(e.to_string()),
            StoreError::Database(e) => DomainError::Internal(e.to_string()),
            StoreError::Malformed(msg) => DomainError::Internal(msg),
            StoreError::Io(e) => DomainError::Internal(e.to_string()),
        }
    }
}

/// Minimal CRUD verbs against a remote document collection.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn list(
        &self,
        collection: &str,
        query: &DocumentQuery,
    ) -> Result<Vec<Document>, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Stores a new document; the store assigns its id and revision 1.
    async fn create(&self, collection: &str, data: DocumentData)
    -> Result<Document, StoreError>;

    /// Merges `patch` into the top-level fields and bumps the revision.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: DocumentData,
        precondition: Precondition,
    ) -> Result<Document, StoreError>;
}

pub fn new_document_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, data: Value) -> Document {
        Document {
            id: id.into(),
            revision: 1,
            data: data.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn field_readers_tolerate_missing_and_mistyped_values() {
        let d = doc(
            "a",
            json!({ "likes": 3, "likedBy": ["u1", 7, "u2"], "name": null }),
        );
        assert_eq!(d.u64_field("likes"), 3);
        assert_eq!(d.u64_field("absent"), 0);
        assert_eq!(d.string_list("likedBy"), vec!["u1", "u2"]);
        assert_eq!(d.str_field("name"), "");
        assert_eq!(d.opt_str_field("name"), None);
    }

    #[test]
    fn descending_order_breaks_ties_by_id() {
        let q = DocumentQuery::new().order_desc("timestamp");
        let mut docs = vec![
            doc("b", json!({ "timestamp": "2024-01-01T00:00:00.000Z" })),
            doc("c", json!({ "timestamp": "2024-03-01T00:00:00.000Z" })),
            doc("a", json!({ "timestamp": "2024-01-01T00:00:00.000Z" })),
            doc("d", json!({})),
        ];
        docs.sort_by(|x, y| q.compare(x, y));
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b", "d"]);
    }
}
