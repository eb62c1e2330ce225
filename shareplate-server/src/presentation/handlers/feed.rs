use actix_web::{HttpRequest, HttpResponse, web};
use tracing::info;

use crate::application::feed_service::FeedService;
use crate::domain::error::DomainError;
use crate::presentation::dto::{CreatePostRequest, FeedResponse};
use crate::presentation::utils::{AuthenticatedUser, Viewer, request_id};

pub async fn list_feed(
    req: HttpRequest,
    viewer: Viewer,
    feed: web::Data<FeedService>,
) -> Result<HttpResponse, DomainError> {
    let posts = feed.list_feed(viewer.id()).await?;

    info!(
        request_id = %request_id(&req),
        count = posts.len(),
        "feed retrieved"
    );

    Ok(HttpResponse::Ok().json(FeedResponse {
        total: posts.len(),
        posts,
    }))
}

pub async fn get_post(
    viewer: Viewer,
    feed: web::Data<FeedService>,
    path: web::Path<String>,
) -> Result<HttpResponse, DomainError> {
    let post = feed.get_post(&path.into_inner(), viewer.id()).await?;
    Ok(HttpResponse::Ok().json(post))
}

pub async fn create_post(
    req: HttpRequest,
    user: AuthenticatedUser,
    feed: web::Data<FeedService>,
    payload: web::Json<CreatePostRequest>,
) -> Result<HttpResponse, DomainError> {
    let post = feed
        .create_post(&user.id, &user.username, &payload.food_name, &payload.image_id)
        .await?;

    info!(
        request_id = %request_id(&req),
        username = %user.username,
        post_id = %post.id,
        "post created"
    );

    Ok(HttpResponse::Created().json(post.view_for(Some(&user.id))))
}

pub async fn like_post(
    req: HttpRequest,
    user: AuthenticatedUser,
    feed: web::Data<FeedService>,
    path: web::Path<String>,
) -> Result<HttpResponse, DomainError> {
    let post_id = path.into_inner();
    let post = feed.like(&post_id, &user.id).await?;

    info!(
        request_id = %request_id(&req),
        user_id = %user.id,
        post_id = %post_id,
        likes = post.likes,
        "post liked"
    );

    Ok(HttpResponse::Ok().json(post))
}

pub async fn unlike_post(
    req: HttpRequest,
    user: AuthenticatedUser,
    feed: web::Data<FeedService>,
    path: web::Path<String>,
) -> Result<HttpResponse, DomainError> {
    let post_id = path.into_inner();
    let post = feed.unlike(&post_id, &user.id).await?;

    info!(
        request_id = %request_id(&req),
        user_id = %user.id,
        post_id = %post_id,
        likes = post.likes,
        "post unliked"
    );

    Ok(HttpResponse::Ok().json(post))
}
