use actix_web::http::header::{CACHE_CONTROL, CONTENT_DISPOSITION};
use actix_web::{HttpRequest, HttpResponse, web};
use tracing::info;

use crate::application::media_service::MediaService;
use crate::domain::error::DomainError;
use crate::presentation::dto::{ImagePayload, UploadImageResponse};
use crate::presentation::utils::{AuthenticatedUser, request_id};

pub async fn upload_image(
    req: HttpRequest,
    user: AuthenticatedUser,
    media: web::Data<MediaService>,
    payload: web::Json<ImagePayload>,
) -> Result<HttpResponse, DomainError> {
    let image_id = media.upload(payload.into_inner().into()).await?;

    info!(
        request_id = %request_id(&req),
        user_id = %user.id,
        image_id = %image_id,
        "image uploaded"
    );

    Ok(HttpResponse::Created().json(UploadImageResponse { image_id }))
}

pub async fn serve_image(
    media: web::Data<MediaService>,
    path: web::Path<String>,
) -> Result<HttpResponse, DomainError> {
    let file = media.fetch(&path.into_inner()).await?;
    let disposition = format!(
        "inline; filename=\"{}\"",
        file.file_name.replace(['"', '\\'], "_")
    );

    // ids are never reused, so the bytes behind one never change
    Ok(HttpResponse::Ok()
        .content_type(file.content_type)
        .insert_header((CACHE_CONTROL, "public, max-age=86400, immutable"))
        .insert_header((CONTENT_DISPOSITION, disposition))
        .body(file.bytes))
}
