use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest, web};
use futures_util::future::{Ready, ready};

use crate::application::auth_service::AuthService;
use crate::domain::error::DomainError;
use crate::infrastructure::security::JwtKeys;
use crate::presentation::middleware::RequestId;

/// Set by `JwtAuthMiddleware`; extracting it outside a protected resource fails with 401.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: String,
    pub username: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(DomainError::NotAuthenticated.into())),
        }
    }
}

/// Optional identity for public reads; a missing or invalid token reads as anonymous.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<AuthenticatedUser>);

impl Viewer {
    pub fn id(&self) -> Option<&str> {
        self.0.as_ref().map(|user| user.id.as_str())
    }
}

impl FromRequest for Viewer {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let viewer = match (
            bearer_token(req),
            req.app_data::<web::Data<AuthService>>(),
        ) {
            (Some(token), Some(auth)) => user_from_claims(token, auth.keys()),
            _ => None,
        };
        ready(Ok(Viewer(viewer)))
    }
}

pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn user_from_claims(token: &str, keys: &JwtKeys) -> Option<AuthenticatedUser> {
    keys.verify_token(token).ok().map(|claims| AuthenticatedUser {
        id: claims.sub,
        username: claims.name,
    })
}

/// Verifies the token and confirms the account still exists.
pub async fn extract_user_from_token(
    token: &str,
    keys: &JwtKeys,
    auth_service: &AuthService,
) -> Result<AuthenticatedUser, DomainError> {
    let claims = keys
        .verify_token(token)
        .map_err(|_| DomainError::NotAuthenticated)?;

    let user = auth_service
        .get_user(&claims.sub)
        .await
        .map_err(|e| match e {
            DomainError::UserNotFound(_) => DomainError::NotAuthenticated,
            other => other,
        })?;

    Ok(AuthenticatedUser {
        id: user.id,
        username: user.username,
    })
}

pub fn request_id(req: &HttpRequest) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|rid| rid.0.clone())
        .unwrap_or_else(|| "unknown".into())
}
