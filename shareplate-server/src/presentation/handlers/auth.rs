use actix_web::{HttpRequest, HttpResponse, web};
use tracing::info;

use crate::application::auth_service::AuthService;
use crate::domain::error::DomainError;
use crate::presentation::dto::{AuthResponse, LoginRequest, RegisterRequest, UserProfile};
use crate::presentation::utils::{AuthenticatedUser, request_id};

pub async fn register(
    req: HttpRequest,
    service: web::Data<AuthService>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, DomainError> {
    let RegisterRequest {
        username,
        email,
        password,
    } = payload.into_inner();

    let user = service.register(username, email, password).await?;
    info!(request_id = %request_id(&req), user_id = %user.id, "user registered");

    // signing up opens a session straight away
    let issued = service.issue_token(user)?;
    Ok(HttpResponse::Created().json(AuthResponse::from(issued)))
}

pub async fn login(
    req: HttpRequest,
    service: web::Data<AuthService>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, DomainError> {
    let issued = service.login(&payload.email, &payload.password).await?;

    info!(request_id = %request_id(&req), user_id = %issued.user.id, "user logged in");

    Ok(HttpResponse::Ok().json(AuthResponse::from(issued)))
}

pub async fn me(
    user: AuthenticatedUser,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, DomainError> {
    let user = service.get_user(&user.id).await?;
    Ok(HttpResponse::Ok().json(UserProfile::from(user)))
}
