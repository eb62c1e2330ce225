use serde::{Deserialize, Serialize};

/// A feed post as stored in the posts collection.
///
/// `liked_by` has set semantics; `likes` mirrors its size after every
/// mutation made through [`Post::apply_like`] and [`Post::apply_unlike`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub food_name: String,
    pub image_id: String,
    pub likes: u32,
    pub liked_by: Vec<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: String,
    pub username: String,
    pub food_name: String,
    pub image_id: String,
    pub timestamp: String,
}

impl NewPost {
    pub fn new(user_id: String, username: String, food_name: String, image_id: String) -> Self {
        Self {
            user_id,
            username,
            food_name,
            image_id,
            timestamp: super::timestamp_now(),
        }
    }
}

impl Post {
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.liked_by.iter().any(|id| id == user_id)
    }

    /// Returns false when the user already liked the post.
    pub fn apply_like(&mut self, user_id: &str) -> bool {
        if self.is_liked_by(user_id) {
            return false;
        }
        self.liked_by.push(user_id.to_string());
        self.sync_likes();
        true
    }

    /// Returns false when the user had not liked the post.
    pub fn apply_unlike(&mut self, user_id: &str) -> bool {
        let before = self.liked_by.len();
        self.liked_by.retain(|id| id != user_id);
        if self.liked_by.len() == before {
            return false;
        }
        self.sync_likes();
        true
    }

    fn sync_likes(&mut self) {
        self.likes = u32::try_from(self.liked_by.len()).unwrap_or(u32::MAX);
    }

    pub fn view_for(&self, viewer: Option<&str>) -> FeedPost {
        FeedPost {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            food_name: self.food_name.clone(),
            image_id: self.image_id.clone(),
            likes: self.likes,
            timestamp: self.timestamp.clone(),
            is_liked_by_current_user: viewer.is_some_and(|id| self.is_liked_by(id)),
        }
    }
}

/// What a client renders for one post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPost {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub food_name: String,
    pub image_id: String,
    pub likes: u32,
    pub timestamp: String,
    pub is_liked_by_current_user: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeAction {
    Like,
    Unlike,
}

impl LikeAction {
    pub fn apply(self, post: &mut Post, user_id: &str) -> bool {
        match self {
            LikeAction::Like => post.apply_like(user_id),
            LikeAction::Unlike => post.apply_unlike(user_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(liked_by: &[&str], likes: u32) -> Post {
        Post {
            id: "p1".into(),
            user_id: "author".into(),
            username: "Asha".into(),
            food_name: "Biryani".into(),
            image_id: "img".into(),
            likes,
            liked_by: liked_by.iter().map(|s| s.to_string()).collect(),
            timestamp: "2024-01-20T00:00:00.000Z".into(),
        }
    }

    #[test]
    fn like_adds_member_once() {
        let mut p = post(&[], 0);
        assert!(p.apply_like("u1"));
        assert!(!p.apply_like("u1"));
        assert_eq!(p.likes, 1);
        assert_eq!(p.liked_by, vec!["u1".to_string()]);
    }

    #[test]
    fn unlike_of_non_member_changes_nothing() {
        let mut p = post(&["u1"], 1);
        assert!(!p.apply_unlike("u2"));
        assert_eq!(p.likes, 1);
    }

    #[test]
    fn unlike_repairs_drifted_counter() {
        // counter drifted below the set size before this write
        let mut p = post(&["u1", "u2"], 0);
        assert!(p.apply_unlike("u1"));
        assert_eq!(p.likes, 1);
        assert!(p.apply_unlike("u2"));
        assert_eq!(p.likes, 0);
    }

    #[test]
    fn view_marks_viewer_membership() {
        let p = post(&["u1"], 1);
        assert!(p.view_for(Some("u1")).is_liked_by_current_user);
        assert!(!p.view_for(Some("u2")).is_liked_by_current_user);
        assert!(!p.view_for(None).is_liked_by_current_user);
    }
}
