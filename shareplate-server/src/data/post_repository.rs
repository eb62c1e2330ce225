use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{error, info};

use crate::data::document_store::{
    Document, DocumentData, DocumentQuery, DocumentStore, Precondition, StoreError,
};
use crate::domain::error::DomainError;
use crate::domain::post::{NewPost, Post};

const USER_ID: &str = "userId";
const USERNAME: &str = "username";
const FOOD_NAME: &str = "foodName";
const IMAGE_ID: &str = "imageId";
const LIKES: &str = "likes";
const LIKED_BY: &str = "likedBy";
const TIMESTAMP: &str = "timestamp";

/// A post together with the store revision it was read at.
#[derive(Debug, Clone)]
pub struct VersionedPost {
    pub post: Post,
    pub revision: u64,
}

#[derive(Clone)]
pub struct PostRepository {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl PostRepository {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub async fn create(&self, new: NewPost) -> Result<Post, DomainError> {
        let mut data = DocumentData::new();
        data.insert(USER_ID.into(), json!(new.user_id));
        data.insert(USERNAME.into(), json!(new.username));
        data.insert(FOOD_NAME.into(), json!(new.food_name));
        data.insert(IMAGE_ID.into(), json!(new.image_id));
        data.insert(LIKES.into(), json!(0));
        data.insert(LIKED_BY.into(), json!(Vec::<String>::new()));
        data.insert(TIMESTAMP.into(), json!(new.timestamp));

        let doc = self
            .store
            .create(&self.collection, data)
            .await
            .map_err(|e| {
                error!("failed to create post: {}", e);
                DomainError::from(e)
            })?;

        info!(
            post_id = %doc.id,
            author_id = %new.user_id,
            image_id = %new.image_id,
            "post created"
        );
        Ok(to_post(&doc))
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<VersionedPost>, DomainError> {
        let doc = self.store.get(&self.collection, id).await.map_err(|e| {
            error!("db error find_by_id {}: {}", id, e);
            DomainError::from(e)
        })?;
        Ok(doc.map(|doc| VersionedPost {
            post: to_post(&doc),
            revision: doc.revision,
        }))
    }

    /// Every post, newest first. Unpaginated.
    pub async fn list_newest_first(&self) -> Result<Vec<Post>, DomainError> {
        let query = DocumentQuery::new().order_desc(TIMESTAMP);
        let docs = self
            .store
            .list(&self.collection, &query)
            .await
            .map_err(|e| {
                error!("error while fetching posts: {}", e);
                DomainError::from(e)
            })?;
        Ok(docs.iter().map(to_post).collect())
    }

    /// Writes the like state of `post` if the stored revision is still `revision`.
    /// Returns `None` when another writer got there first.
    pub async fn save_likes(
        &self,
        post: &Post,
        revision: u64,
    ) -> Result<Option<VersionedPost>, DomainError> {
        let mut patch = DocumentData::new();
        patch.insert(LIKES.into(), json!(post.likes));
        patch.insert(
            LIKED_BY.into(),
            Value::Array(post.liked_by.iter().cloned().map(Value::String).collect()),
        );

        match self
            .store
            .update(
                &self.collection,
                &post.id,
                patch,
                Precondition::Revision(revision),
            )
            .await
        {
            Ok(doc) => Ok(Some(VersionedPost {
                post: to_post(&doc),
                revision: doc.revision,
            })),
            Err(StoreError::RevisionMismatch { .. }) => Ok(None),
            Err(StoreError::NotFound { id, .. }) => Err(DomainError::PostNotFound(id)),
            Err(e) => {
                error!(post_id = %post.id, "failed to save likes: {}", e);
                Err(e.into())
            }
        }
    }
}

fn to_post(doc: &Document) -> Post {
    Post {
        id: doc.id.clone(),
        user_id: doc.str_field(USER_ID),
        username: doc.str_field(USERNAME),
        food_name: doc.str_field(FOOD_NAME),
        image_id: doc.str_field(IMAGE_ID),
        likes: u32::try_from(doc.u64_field(LIKES)).unwrap_or(u32::MAX),
        liked_by: doc.string_list(LIKED_BY),
        timestamp: doc.str_field(TIMESTAMP),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory_store::MemoryDocumentStore;

    #[test]
    fn maps_sparse_documents_with_defaults() {
        let doc = Document {
            id: "p9".into(),
            revision: 3,
            data: json!({ "foodName": "Poha", "likes": 2.0 })
                .as_object()
                .cloned()
                .unwrap(),
        };
        let post = to_post(&doc);
        assert_eq!(post.food_name, "Poha");
        assert_eq!(post.likes, 2);
        assert_eq!(post.username, "");
        assert!(post.liked_by.is_empty());
    }

    #[tokio::test]
    async fn created_posts_start_without_likes() {
        let repo = PostRepository::new(Arc::new(MemoryDocumentStore::new()), "posts");
        let post = repo
            .create(NewPost::new(
                "u1".into(),
                "Asha".into(),
                "Upma".into(),
                "img1".into(),
            ))
            .await
            .unwrap();
        assert_eq!(post.likes, 0);
        assert!(post.liked_by.is_empty());

        let stored = repo.find_by_id(&post.id).await.unwrap().unwrap();
        assert_eq!(stored.post, post);
        assert_eq!(stored.revision, 1);
    }

    #[tokio::test]
    async fn stale_save_reports_none() {
        let repo = PostRepository::new(Arc::new(MemoryDocumentStore::new()), "posts");
        let mut post = repo
            .create(NewPost::new(
                "u1".into(),
                "Asha".into(),
                "Upma".into(),
                "img1".into(),
            ))
            .await
            .unwrap();
        post.apply_like("u2");

        assert!(repo.save_likes(&post, 1).await.unwrap().is_some());
        assert!(repo.save_likes(&post, 1).await.unwrap().is_none());
    }
}
