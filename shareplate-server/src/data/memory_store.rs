use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::data::document_store::{
    Document, DocumentData, DocumentQuery, DocumentStore, Precondition, StoreError,
    new_document_id,
};

/// Process-local store; conditional updates are atomic under the write lock.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, HashMap<String, Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn list(
        &self,
        collection: &str,
        query: &DocumentQuery,
    ) -> Result<Vec<Document>, StoreError> {
        let guard = self.collections.read().await;
        let mut docs: Vec<Document> = guard
            .get(collection)
            .map(|docs| docs.values().filter(|d| query.matches(d)).cloned().collect())
            .unwrap_or_default();
        docs.sort_by(|a, b| query.compare(a, b));
        if let Some(limit) = query.limit {
            docs.truncate(limit);
        }
        Ok(docs)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn create(
        &self,
        collection: &str,
        data: DocumentData,
    ) -> Result<Document, StoreError> {
        let doc = Document {
            id: new_document_id(),
            revision: 1,
            data,
        };
        let mut guard = self.collections.write().await;
        guard
            .entry(collection.to_string())
            .or_default()
            .insert(doc.id.clone(), doc.clone());
        debug!(collection, id = %doc.id, "document created");
        Ok(doc)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: DocumentData,
        precondition: Precondition,
    ) -> Result<Document, StoreError> {
        let mut guard = self.collections.write().await;
        let doc = guard
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        if let Precondition::Revision(expected) = precondition {
            if doc.revision != expected {
                return Err(StoreError::RevisionMismatch {
                    collection: collection.to_string(),
                    id: id.to_string(),
                    expected,
                    actual: doc.revision,
                });
            }
        }

        doc.data.extend(patch);
        doc.revision += 1;
        Ok(doc.clone())
    }
}
