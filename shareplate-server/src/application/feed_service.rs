use tracing::{debug, info, instrument, warn};

use crate::data::post_repository::{PostRepository, VersionedPost};
use crate::domain::error::DomainError;
use crate::domain::post::{FeedPost, LikeAction, NewPost, Post};

/// Feed reads plus the like/unlike read-modify-write.
///
/// Like state is written with the revision it was read at; when another
/// writer moved the post on in between, the whole cycle is retried up to
/// `max_retries` more times before giving up with [`DomainError::Conflict`].
#[derive(Clone)]
pub struct FeedService {
    repo: PostRepository,
    max_retries: u32,
}

impl FeedService {
    pub fn new(repo: PostRepository, max_retries: u32) -> Self {
        Self { repo, max_retries }
    }

    pub async fn list_feed(&self, viewer: Option<&str>) -> Result<Vec<FeedPost>, DomainError> {
        let posts = self.repo.list_newest_first().await?;
        debug!(count = posts.len(), "feed loaded");
        Ok(posts.iter().map(|p| p.view_for(viewer)).collect())
    }

    pub async fn get_post(
        &self,
        post_id: &str,
        viewer: Option<&str>,
    ) -> Result<FeedPost, DomainError> {
        self.load(post_id)
            .await
            .map(|versioned| versioned.post.view_for(viewer))
    }

    #[instrument(skip(self))]
    pub async fn create_post(
        &self,
        user_id: &str,
        username: &str,
        food_name: &str,
        image_id: &str,
    ) -> Result<Post, DomainError> {
        if food_name.trim().is_empty() {
            return Err(DomainError::validation("food name must not be blank"));
        }
        if image_id.trim().is_empty() {
            return Err(DomainError::validation("image id must not be blank"));
        }
        self.repo
            .create(NewPost::new(
                user_id.to_string(),
                username.to_string(),
                food_name.trim().to_string(),
                image_id.to_string(),
            ))
            .await
    }

    #[instrument(skip(self))]
    pub async fn like(&self, post_id: &str, user_id: &str) -> Result<FeedPost, DomainError> {
        self.apply(post_id, user_id, LikeAction::Like).await
    }

    #[instrument(skip(self))]
    pub async fn unlike(&self, post_id: &str, user_id: &str) -> Result<FeedPost, DomainError> {
        self.apply(post_id, user_id, LikeAction::Unlike).await
    }

    async fn load(&self, post_id: &str) -> Result<VersionedPost, DomainError> {
        self.repo
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::PostNotFound(post_id.to_string()))
    }

    async fn apply(
        &self,
        post_id: &str,
        user_id: &str,
        action: LikeAction,
    ) -> Result<FeedPost, DomainError> {
        for attempt in 0..=self.max_retries {
            let VersionedPost { mut post, revision } = self.load(post_id).await?;

            if !action.apply(&mut post, user_id) {
                debug!(post_id, user_id, ?action, "like state already as requested");
                return Ok(post.view_for(Some(user_id)));
            }

            match self.repo.save_likes(&post, revision).await? {
                Some(saved) => {
                    let likes = saved.post.likes;
                    info!(post_id, user_id, ?action, likes, "like state updated");
                    return Ok(saved.post.view_for(Some(user_id)));
                }
                None => warn!(post_id, attempt, ?action, "post changed underneath, retrying"),
            }
        }

        Err(DomainError::Conflict(post_id.to_string()))
    }
}
