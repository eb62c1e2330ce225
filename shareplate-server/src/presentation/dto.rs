use serde::{Deserialize, Serialize};

use crate::application::auth_service::IssuedToken;
use crate::application::media_service::ImageUpload;
use crate::domain::donation::Donation;
use crate::domain::post::FeedPost;
use crate::domain::user::User;

// ======================= AUTH =======================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub token_type: String, // "Bearer"
    pub user: UserProfile,
}

impl From<IssuedToken> for AuthResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            access_token: issued.access_token,
            expires_in: issued.expires_in,
            token_type: "Bearer".to_string(),
            user: issued.user.into(),
        }
    }
}

// ======================= FEED =======================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub food_name: String,
    pub image_id: String,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub posts: Vec<FeedPost>,
    pub total: usize,
}

// ======================= DONATIONS =======================

/// Inline image, used by `POST /api/media` and inside a donation body.
#[derive(Debug, Deserialize)]
pub struct ImagePayload {
    #[serde(default)]
    pub file_name: String,
    pub content_type: String,
    /// base64, optionally as a `data:` URL
    pub data: String,
}

impl From<ImagePayload> for ImageUpload {
    fn from(payload: ImagePayload) -> Self {
        Self {
            file_name: payload.file_name,
            content_type: payload.content_type,
            data: payload.data,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateDonationRequest {
    pub food_name: String,
    pub serving_count: i64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub image: Option<ImagePayload>,
}

#[derive(Debug, Serialize)]
pub struct DonationResponse {
    pub donation: Donation,
    pub post: Option<FeedPost>,
}

#[derive(Debug, Serialize)]
pub struct DonationsResponse {
    pub donations: Vec<Donation>,
    pub total: usize,
}

// ======================= MEDIA =======================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadImageResponse {
    pub image_id: String,
}
