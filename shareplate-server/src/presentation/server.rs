use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{HttpResponse, Responder, guard, web};
use serde::Serialize;
use tracing::info;

use crate::application::auth_service::AuthService;
use crate::application::donation_service::DonationService;
use crate::application::feed_service::FeedService;
use crate::application::media_service::MediaService;
use crate::data::appwrite_store::{AppwriteClient, AppwriteDocumentStore};
use crate::data::document_store::DocumentStore;
use crate::data::donation_repository::DonationRepository;
use crate::data::file_store::{AppwriteFileStore, FileStore, LocalFileStore, MemoryFileStore};
use crate::data::memory_store::MemoryDocumentStore;
use crate::data::post_repository::PostRepository;
use crate::data::postgres_store::PostgresDocumentStore;
use crate::data::user_repository::UserRepository;
use crate::domain::error::DomainError;
use crate::domain::timestamp_now;
use crate::infrastructure::config::{AppConfig, StoreBackend};
use crate::infrastructure::database::{create_pool, run_migrations};
use crate::infrastructure::security::JwtKeys;
use crate::presentation::handlers;
use crate::presentation::middleware::JwtAuthMiddleware;

/// Headroom on top of the base64-inflated image for the rest of a JSON body.
const JSON_BODY_MARGIN: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppServices {
    pub auth: AuthService,
    pub feed: FeedService,
    pub donations: DonationService,
    pub media: MediaService,
    pub max_image_bytes: usize,
}

impl AppServices {
    pub fn new(
        config: &AppConfig,
        documents: Arc<dyn DocumentStore>,
        files: Arc<dyn FileStore>,
    ) -> Self {
        let collections = &config.collections;

        let users = UserRepository::new(Arc::clone(&documents), collections.users.clone());
        let posts = PostRepository::new(Arc::clone(&documents), collections.posts.clone());
        let donations = DonationRepository::new(documents, collections.donations.clone());

        let auth = AuthService::new(
            users,
            JwtKeys::new(config.jwt_secret.clone(), config.jwt_ttl_hours),
        );
        let feed = FeedService::new(posts, config.like_max_retries);
        let media = MediaService::new(files, config.max_image_bytes);
        let donations = DonationService::new(donations, feed.clone(), media.clone());

        Self {
            auth,
            feed,
            donations,
            media,
            max_image_bytes: config.max_image_bytes,
        }
    }

    fn json_limit(&self) -> usize {
        self.max_image_bytes.div_ceil(3) * 4 + JSON_BODY_MARGIN
    }
}

/// Connects the configured backends and wires the services on top of them.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let (documents, files): (Arc<dyn DocumentStore>, Arc<dyn FileStore>) = match config.backend {
        StoreBackend::Memory => (
            Arc::new(MemoryDocumentStore::new()),
            local_or_memory_files(config).await?,
        ),
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?;
            let pool = create_pool(url).await?;
            run_migrations(&pool).await?;
            (
                Arc::new(PostgresDocumentStore::new(pool)),
                local_or_memory_files(config).await?,
            )
        }
        StoreBackend::Appwrite => {
            let appwrite = config
                .appwrite
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("Appwrite settings are missing"))?;
            let client = AppwriteClient::new(appwrite)?;
            (
                Arc::new(AppwriteDocumentStore::new(
                    client.clone(),
                    appwrite.database_id.clone(),
                )),
                Arc::new(AppwriteFileStore::new(client, appwrite.bucket_id.clone())),
            )
        }
    };

    info!(
        documents = documents.backend(),
        files = files.backend(),
        "storage backends ready"
    );

    Ok(AppServices::new(config, documents, files))
}

async fn local_or_memory_files(config: &AppConfig) -> anyhow::Result<Arc<dyn FileStore>> {
    Ok(match &config.media_dir {
        Some(dir) => Arc::new(LocalFileStore::open(dir.clone()).await?),
        None => Arc::new(MemoryFileStore::new()),
    })
}

/// Registers shared state and every `/api` route.
///
/// Public and protected handlers can share a path; resource guards pick by method
/// so that only the protected resource runs `JwtAuthMiddleware`.
pub fn configure(cfg: &mut web::ServiceConfig, services: &AppServices) {
    let keys = services.auth.keys().clone();
    let auth = || JwtAuthMiddleware::new(keys.clone());

    cfg.app_data(
        web::JsonConfig::default()
            .limit(services.json_limit())
            .error_handler(|err, _req| DomainError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| DomainError::Validation(err.to_string()).into()),
    )
    .app_data(web::Data::new(services.auth.clone()))
    .app_data(web::Data::new(services.feed.clone()))
    .app_data(web::Data::new(services.donations.clone()))
    .app_data(web::Data::new(services.media.clone()))
    .service(
        web::scope("/api")
            .route("/health", web::get().to(health))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(handlers::auth::register))
                    .route("/login", web::post().to(handlers::auth::login))
                    .service(
                        web::resource("/me")
                            .wrap(auth())
                            .route(web::get().to(handlers::auth::me)),
                    ),
            )
            .service(
                web::resource("/feed")
                    .guard(guard::Get())
                    .to(handlers::feed::list_feed),
            )
            .service(
                web::resource("/feed")
                    .guard(guard::Post())
                    .wrap(auth())
                    .to(handlers::feed::create_post),
            )
            .service(web::resource("/feed/{id}").route(web::get().to(handlers::feed::get_post)))
            .service(
                web::resource("/feed/{id}/like")
                    .wrap(auth())
                    .route(web::post().to(handlers::feed::like_post))
                    .route(web::delete().to(handlers::feed::unlike_post)),
            )
            .service(
                web::resource("/donations")
                    .guard(guard::Get())
                    .to(handlers::donation::list_donations),
            )
            .service(
                web::resource("/donations")
                    .guard(guard::Post())
                    .wrap(auth())
                    .to(handlers::donation::create_donation),
            )
            .service(
                web::resource("/media")
                    .wrap(auth())
                    .route(web::post().to(handlers::media::upload_image)),
            )
            .service(
                web::resource("/media/{id}").route(web::get().to(handlers::media::serve_image)),
            ),
    );
}

pub fn build_cors(config: &AppConfig) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "DELETE"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers(vec![header::HeaderName::from_static("x-request-id")])
        .max_age(3600);

    if config.cors_origins.iter().any(|origin| origin == "*") {
        return cors.allow_any_origin();
    }

    cors = cors.supports_credentials();
    for origin in &config.cors_origins {
        cors = cors.allowed_origin(origin);
    }

    cors
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        timestamp: timestamp_now(),
    })
}
