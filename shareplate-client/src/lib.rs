//! HTTP client for the SharePlate feed and donation API.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

mod error;
mod http_client;

pub use error::ClientError;
pub use http_client::{DEFAULT_TOKEN_FILE, HttpClient};

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub token_type: String,
    pub user: UserProfile,
}

/// A post as seen by the caller.
#[derive(Debug, Clone, Deserialize)]
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

#[derive(Debug, Clone, Deserialize)]
pub struct Donation {
    pub id: String,
    pub food_name: String,
    pub serving_count: u32,
    pub image_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImagePayload {
    pub file_name: String,
    pub content_type: String,
    pub data: String,
}

impl ImagePayload {
    pub fn from_bytes(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: &[u8],
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: STANDARD.encode(bytes),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewDonation {
    pub food_name: String,
    pub serving_count: i64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImagePayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DonationReceipt {
    pub donation: Donation,
    pub post: Option<FeedPost>,
}

#[async_trait]
pub trait SharePlateClient: Send {
    async fn register(
        &mut self,
        username: String,
        email: String,
        password: String,
    ) -> Result<UserProfile, ClientError>;
    async fn login(&mut self, email: String, password: String) -> Result<UserProfile, ClientError>;
    async fn me(&mut self) -> Result<UserProfile, ClientError>;

    async fn list_feed(&mut self) -> Result<Vec<FeedPost>, ClientError>;
    async fn get_post(&mut self, id: &str) -> Result<FeedPost, ClientError>;
    async fn create_post(
        &mut self,
        food_name: String,
        image_id: String,
    ) -> Result<FeedPost, ClientError>;
    async fn like(&mut self, post_id: &str) -> Result<FeedPost, ClientError>;
    async fn unlike(&mut self, post_id: &str) -> Result<FeedPost, ClientError>;

    async fn donate(&mut self, donation: NewDonation) -> Result<DonationReceipt, ClientError>;
    async fn list_donations(&mut self) -> Result<Vec<Donation>, ClientError>;

    async fn upload_image(&mut self, image: ImagePayload) -> Result<String, ClientError>;
    async fn download_image(&mut self, image_id: &str) -> Result<Vec<u8>, ClientError>;
}
