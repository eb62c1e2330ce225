use std::sync::Arc;

use serde_json::json;
use tracing::{error, info};

use crate::data::document_store::{Document, DocumentData, DocumentQuery, DocumentStore};
use crate::domain::error::DomainError;
use crate::domain::timestamp_now;
use crate::domain::user::{NewUser, User};

const USERNAME: &str = "username";
const EMAIL: &str = "email";
const PASSWORD_HASH: &str = "passwordHash";
const CREATED_AT: &str = "createdAt";

#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl UserRepository {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Email uniqueness is checked before the write, not enforced by the store.
    pub async fn create(&self, user: NewUser) -> Result<User, DomainError> {
        if self.find_by_email(&user.email).await?.is_some() {
            return Err(DomainError::AlreadyExists(
                "email already registered".to_string(),
            ));
        }

        let mut data = DocumentData::new();
        data.insert(USERNAME.into(), json!(user.username));
        data.insert(EMAIL.into(), json!(user.email));
        data.insert(PASSWORD_HASH.into(), json!(user.password_hash));
        data.insert(CREATED_AT.into(), json!(timestamp_now()));

        let doc = self
            .store
            .create(&self.collection, data)
            .await
            .map_err(|e| {
                error!("failed to create user: {}", e);
                DomainError::from(e)
            })?;

        let user = to_user(&doc);
        info!(user_id = %user.id, email = %user.email, "user created");
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let query = DocumentQuery::new().filter_eq(EMAIL, email).limit(1);
        let docs = self
            .store
            .list(&self.collection, &query)
            .await
            .map_err(|e| {
                error!("failed to find user by email {}: {}", email, e);
                DomainError::from(e)
            })?;
        Ok(docs.first().map(to_user))
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>, DomainError> {
        let doc = self.store.get(&self.collection, id).await.map_err(|e| {
            error!("failed to find user by id {}: {}", id, e);
            DomainError::from(e)
        })?;
        Ok(doc.as_ref().map(to_user))
    }
}

fn to_user(doc: &Document) -> User {
    User {
        id: doc.id.clone(),
        username: doc.str_field(USERNAME),
        email: doc.str_field(EMAIL),
        password_hash: doc.str_field(PASSWORD_HASH),
        created_at: doc.str_field(CREATED_AT),
    }
}
