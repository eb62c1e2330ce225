use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ClientError;
use crate::{
    AuthResponse, Donation, DonationReceipt, FeedPost, ImagePayload, NewDonation,
    SharePlateClient, UserProfile,
};

pub const DEFAULT_TOKEN_FILE: &str = ".shareplate_token";

#[derive(Deserialize)]
struct FeedResponse {
    posts: Vec<FeedPost>,
}

#[derive(Deserialize)]
struct DonationsResponse {
    donations: Vec<Donation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadImageResponse {
    image_id: String,
}

/// Talks to the REST API and keeps the session token in a file between runs.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    token_path: PathBuf,
}

impl HttpClient {
    pub fn connect(endpoint: &str) -> Result<Self, ClientError> {
        Self::with_token_file(endpoint, DEFAULT_TOKEN_FILE)
    }

    pub fn with_token_file(
        endpoint: &str,
        token_path: impl Into<PathBuf>,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            client: Client::builder().build()?,
            base_url: endpoint.trim_end_matches('/').to_string(),
            token: None,
            token_path: token_path.into(),
        })
    }

    pub fn set_token(&mut self, token: String) -> Result<(), ClientError> {
        fs::write(&self.token_path, &token)?;
        self.token = Some(token);
        Ok(())
    }

    pub fn clear_token(&mut self) -> Result<(), ClientError> {
        self.token = None;
        match fs::remove_file(&self.token_path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// The in-memory token, falling back to the token file.
    pub fn token(&mut self) -> Result<Option<&str>, ClientError> {
        if self.token.is_none() {
            match fs::read_to_string(&self.token_path) {
                Ok(saved) if !saved.trim().is_empty() => {
                    self.token = Some(saved.trim().to_string())
                }
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(self.token.as_deref())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(&mut self) -> Result<Option<HeaderValue>, ClientError> {
        match self.token()? {
            Some(token) => HeaderValue::from_str(&format!("Bearer {token}"))
                .map(Some)
                .map_err(|_| ClientError::Unauthorized),
            None => Ok(None),
        }
    }

    /// Attaches the token when there is one; public reads work without it.
    fn optional_auth(&mut self, req: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        Ok(match self.bearer()? {
            Some(header) => req.header(AUTHORIZATION, header),
            None => req,
        })
    }

    fn required_auth(&mut self, req: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let header = self.bearer()?.ok_or(ClientError::Unauthorized)?;
        Ok(req.header(AUTHORIZATION, header))
    }

    async fn expect_json<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
        if resp.status().is_success() {
            Ok(resp.json().await?)
        } else {
            Err(ClientError::from_http_response(resp).await)
        }
    }

    async fn authenticate(
        &mut self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<UserProfile, ClientError> {
        let resp = self.client.post(self.url(path)).json(&body).send().await?;
        let auth: AuthResponse = Self::expect_json(resp).await?;
        debug!(user_id = %auth.user.id, expires_in = auth.expires_in, "session stored");
        self.set_token(auth.access_token)?;
        Ok(auth.user)
    }
}

#[async_trait]
impl SharePlateClient for HttpClient {
    async fn register(
        &mut self,
        username: String,
        email: String,
        password: String,
    ) -> Result<UserProfile, ClientError> {
        let body = serde_json::json!({
            "username": username,
            "email": email,
            "password": password,
        });
        self.authenticate("/api/auth/register", body).await
    }

    async fn login(&mut self, email: String, password: String) -> Result<UserProfile, ClientError> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
        });
        self.authenticate("/api/auth/login", body).await
    }

    async fn me(&mut self) -> Result<UserProfile, ClientError> {
        let req = self.client.get(self.url("/api/auth/me"));
        let resp = self.required_auth(req)?.send().await?;
        Self::expect_json(resp).await
    }

    async fn list_feed(&mut self) -> Result<Vec<FeedPost>, ClientError> {
        let req = self.client.get(self.url("/api/feed"));
        let resp = self.optional_auth(req)?.send().await?;
        let feed: FeedResponse = Self::expect_json(resp).await?;
        Ok(feed.posts)
    }

    async fn get_post(&mut self, id: &str) -> Result<FeedPost, ClientError> {
        let req = self.client.get(self.url(&format!("/api/feed/{id}")));
        let resp = self.optional_auth(req)?.send().await?;
        Self::expect_json(resp).await
    }

    async fn create_post(
        &mut self,
        food_name: String,
        image_id: String,
    ) -> Result<FeedPost, ClientError> {
        let req = self.client.post(self.url("/api/feed"));
        let resp = self
            .required_auth(req)?
            .json(&serde_json::json!({
                "foodName": food_name,
                "imageId": image_id,
            }))
            .send()
            .await?;
        Self::expect_json(resp).await
    }

    async fn like(&mut self, post_id: &str) -> Result<FeedPost, ClientError> {
        let req = self.client.post(self.url(&format!("/api/feed/{post_id}/like")));
        let resp = self.required_auth(req)?.send().await?;
        Self::expect_json(resp).await
    }

    async fn unlike(&mut self, post_id: &str) -> Result<FeedPost, ClientError> {
        let req = self
            .client
            .delete(self.url(&format!("/api/feed/{post_id}/like")));
        let resp = self.required_auth(req)?.send().await?;
        Self::expect_json(resp).await
    }

    async fn donate(&mut self, donation: NewDonation) -> Result<DonationReceipt, ClientError> {
        let req = self.client.post(self.url("/api/donations"));
        let resp = self.required_auth(req)?.json(&donation).send().await?;
        Self::expect_json(resp).await
    }

    async fn list_donations(&mut self) -> Result<Vec<Donation>, ClientError> {
        let resp = self.client.get(self.url("/api/donations")).send().await?;
        let list: DonationsResponse = Self::expect_json(resp).await?;
        Ok(list.donations)
    }

    async fn upload_image(&mut self, image: ImagePayload) -> Result<String, ClientError> {
        let req = self.client.post(self.url("/api/media"));
        let resp = self.required_auth(req)?.json(&image).send().await?;
        let uploaded: UploadImageResponse = Self::expect_json(resp).await?;
        Ok(uploaded.image_id)
    }

    async fn download_image(&mut self, image_id: &str) -> Result<Vec<u8>, ClientError> {
        let resp = self
            .client
            .get(self.url(&format!("/api/media/{image_id}")))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ClientError::from_http_response(resp).await);
        }
        Ok(resp.bytes().await?.to_vec())
    }
}
