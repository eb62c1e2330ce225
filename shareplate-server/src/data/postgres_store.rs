use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::{error, info};

use crate::data::document_store::{
    Document, DocumentData, DocumentQuery, DocumentStore, Precondition, StoreError,
    new_document_id,
};

type DocumentRow = (String, i64, Json<Value>);

/// Documents kept as JSONB rows of a single `documents` table.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_document((id, revision, Json(data)): DocumentRow) -> Result<Document, StoreError> {
    let data = match data {
        Value::Object(map) => map,
        other => {
            return Err(StoreError::Malformed(format!(
                "document {id} holds {other} instead of an object"
            )));
        }
    };
    Ok(Document {
        id,
        revision: u64::try_from(revision).unwrap_or_default(),
        data,
    })
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn list(
        &self,
        collection: &str,
        query: &DocumentQuery,
    ) -> Result<Vec<Document>, StoreError> {
        let filter: DocumentData = query.filters.iter().cloned().collect();
        // without a sort field `data -> NULL` is NULL for every row and id decides
        let sql = r#"
            SELECT id, revision, data FROM documents
            WHERE collection = $1 AND data @> $2
            ORDER BY data -> $3::TEXT DESC NULLS LAST, id ASC
            LIMIT $4
            "#;

        let rows = sqlx::query_as::<_, DocumentRow>(sql)
            .bind(collection)
            .bind(Json(Value::Object(filter)))
            .bind(query.descending_by.as_deref())
            .bind(query.limit.map(|l| l as i64))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(collection, "failed to list documents: {}", e);
                StoreError::from(e)
            })?;

        rows.into_iter().map(into_document).collect()
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, revision, data FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(collection, id, "failed to fetch document: {}", e);
            StoreError::from(e)
        })?;

        row.map(into_document).transpose()
    }

    async fn create(
        &self,
        collection: &str,
        data: DocumentData,
    ) -> Result<Document, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            INSERT INTO documents (collection, id, revision, data)
            VALUES ($1, $2, 1, $3)
            RETURNING id, revision, data
            "#,
        )
        .bind(collection)
        .bind(new_document_id())
        .bind(Json(Value::Object(data)))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!(collection, "failed to create document: {}", e);
            StoreError::from(e)
        })?;

        let doc = into_document(row)?;
        info!(collection, id = %doc.id, "document created");
        Ok(doc)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: DocumentData,
        precondition: Precondition,
    ) -> Result<Document, StoreError> {
        let expected = match precondition {
            Precondition::Revision(rev) => Some(rev as i64),
            Precondition::None => None,
        };

        // Single statement: the revision check and the write cannot interleave.
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            UPDATE documents
            SET data = data || $3, revision = revision + 1, updated_at = now()
            WHERE collection = $1 AND id = $2 AND ($4::BIGINT IS NULL OR revision = $4)
            RETURNING id, revision, data
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(Value::Object(patch)))
        .bind(expected)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(collection, id, "failed to update document: {}", e);
            StoreError::from(e)
        })?;

        if let Some(row) = row {
            return into_document(row);
        }

        let current: Option<i64> = sqlx::query_scalar(
            "SELECT revision FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match (current, expected) {
            (Some(actual), Some(expected)) => Err(StoreError::RevisionMismatch {
                collection: collection.to_string(),
                id: id.to_string(),
                expected: expected as u64,
                actual: actual as u64,
            }),
            _ => Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            }),
        }
    }
}
