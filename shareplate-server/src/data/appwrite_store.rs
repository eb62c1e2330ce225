use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, error, warn};

use crate::data::document_store::{
    Document, DocumentData, DocumentQuery, DocumentStore, Precondition, StoreError,
    new_document_id,
};
use crate::infrastructure::config::AppwriteConfig;

const PAGE_SIZE: usize = 100;
const MAX_ID_LEN: usize = 36;

/// Appwrite ids: up to 36 of `[A-Za-z0-9._-]`, not starting with a special character.
/// Anything else must never be spliced into a request path.
pub fn is_valid_id(id: &str) -> bool {
    id.len() <= MAX_ID_LEN
        && id.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Authenticated handle on an Appwrite project, shared by the document and file stores.
#[derive(Clone)]
pub struct AppwriteClient {
    http: Client,
    endpoint: String,
    project_id: String,
    api_key: String,
}

impl AppwriteClient {
    pub fn new(config: &AppwriteConfig) -> Result<Self, StoreError> {
        let http = Client::builder()
            .user_agent(concat!("shareplate-server/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    pub fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.url(path))
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Key", &self.api_key)
    }

    /// Passes successful responses through; maps the rest onto [`StoreError`].
    pub async fn check(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                error!(%status, "appwrite refused credentials: {}", body);
                Err(StoreError::Unauthorized)
            }
            _ => Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DocumentList {
    documents: Vec<Value>,
}

fn parse_document(raw: Value) -> Result<Document, StoreError> {
    let Value::Object(mut map) = raw else {
        return Err(StoreError::Malformed("document is not an object".into()));
    };
    let id = match map.remove("$id") {
        Some(Value::String(id)) => id,
        _ => return Err(StoreError::Malformed("document without $id".into())),
    };
    let revision = map
        .get("$updatedAt")
        .and_then(Value::as_str)
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.timestamp_micros().max(0) as u64)
        .unwrap_or(0);
    map.retain(|key, _| !key.starts_with('$'));
    Ok(Document {
        id,
        revision,
        data: map,
    })
}

fn encode_queries(
    query: &DocumentQuery,
    cursor_after: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut queries = Vec::new();
    for (field, value) in &query.filters {
        queries.push(json!({ "method": "equal", "attribute": field, "values": [value] }));
    }
    if let Some(field) = &query.descending_by {
        queries.push(json!({ "method": "orderDesc", "attribute": field }));
    }
    let page = query.limit.map_or(PAGE_SIZE, |l| l.min(PAGE_SIZE));
    queries.push(json!({ "method": "limit", "values": [page] }));
    if let Some(cursor) = cursor_after {
        queries.push(json!({ "method": "cursorAfter", "values": [cursor] }));
    }
    queries
        .into_iter()
        .map(|q| ("queries[]", q.to_string()))
        .collect()
}

pub struct AppwriteDocumentStore {
    client: AppwriteClient,
    database_id: String,
}

impl AppwriteDocumentStore {
    pub fn new(client: AppwriteClient, database_id: impl Into<String>) -> Self {
        Self {
            client,
            database_id: database_id.into(),
        }
    }

    fn documents_path(&self, collection: &str) -> String {
        format!(
            "/databases/{}/collections/{}/documents",
            self.database_id, collection
        )
    }
}

#[async_trait]
impl DocumentStore for AppwriteDocumentStore {
    fn backend(&self) -> &'static str {
        "appwrite"
    }

    async fn list(
        &self,
        collection: &str,
        query: &DocumentQuery,
    ) -> Result<Vec<Document>, StoreError> {
        let mut documents = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let response = self
                .client
                .request(reqwest::Method::GET, &self.documents_path(collection))
                .query(&encode_queries(query, cursor.as_deref()))
                .send()
                .await?;
            let page: DocumentList = AppwriteClient::check(response).await?.json().await?;
            let fetched = page.documents.len();
            for raw in page.documents {
                documents.push(parse_document(raw)?);
            }

            let reached_limit = query.limit.is_some_and(|l| documents.len() >= l);
            if fetched < PAGE_SIZE || reached_limit {
                break;
            }
            cursor = documents.last().map(|d| d.id.clone());
        }
        if let Some(limit) = query.limit {
            documents.truncate(limit);
        }
        debug!(collection, count = documents.len(), "listed appwrite documents");
        Ok(documents)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        if !is_valid_id(id) {
            debug!(collection, "refusing malformed document id");
            return Ok(None);
        }
        let response = self
            .client
            .request(
                reqwest::Method::GET,
                &format!("{}/{}", self.documents_path(collection), id),
            )
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let raw: Value = AppwriteClient::check(response).await?.json().await?;
        parse_document(raw).map(Some)
    }

    async fn create(
        &self,
        collection: &str,
        data: DocumentData,
    ) -> Result<Document, StoreError> {
        let response = self
            .client
            .request(reqwest::Method::POST, &self.documents_path(collection))
            .json(&json!({ "documentId": new_document_id(), "data": data }))
            .send()
            .await?;
        let raw: Value = AppwriteClient::check(response).await?.json().await?;
        parse_document(raw)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: DocumentData,
        precondition: Precondition,
    ) -> Result<Document, StoreError> {
        if !is_valid_id(id) {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        // Appwrite has no conditional write: the revision is compared right
        // before the PATCH, which narrows the race window without closing it.
        if let Precondition::Revision(expected) = precondition {
            let current = self
                .get(collection, id)
                .await?
                .ok_or_else(|| StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })?;
            if current.revision != expected {
                warn!(collection, id, expected, actual = current.revision, "stale revision");
                return Err(StoreError::RevisionMismatch {
                    collection: collection.to_string(),
                    id: id.to_string(),
                    expected,
                    actual: current.revision,
                });
            }
        }

        let response = self
            .client
            .request(
                reqwest::Method::PATCH,
                &format!("{}/{}", self.documents_path(collection), id),
            )
            .json(&json!({ "data": patch }))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        let raw: Value = AppwriteClient::check(response).await?.json().await?;
        parse_document(raw)
    }
}
