use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::http::header::{AUTHORIZATION, CONTENT_TYPE};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{App, test};
use serde_json::{Value, json};

use shareplate_server::data::file_store::MemoryFileStore;
use shareplate_server::data::memory_store::MemoryDocumentStore;
use shareplate_server::infrastructure::config::AppConfig;
use shareplate_server::presentation::middleware::{RequestIdMiddleware, TimingMiddleware};
use shareplate_server::presentation::server::{AppServices, configure};

// "hello"
const IMAGE_BASE64: &str = "aGVsbG8=";

fn services() -> AppServices {
    let config = AppConfig::from_lookup(|key| match key {
        "JWT_SECRET" => Some("integration-secret".to_string()),
        _ => None,
    })
    .expect("config");

    AppServices::new(
        &config,
        Arc::new(MemoryDocumentStore::new()),
        Arc::new(MemoryFileStore::new()),
    )
}

macro_rules! app {
    ($services:expr) => {
        test::init_service(
            App::new()
                .wrap(TimingMiddleware)
                .wrap(RequestIdMiddleware)
                .configure(|cfg| configure(cfg, &$services)),
        )
        .await
    };
}

macro_rules! register {
    ($app:expr, $username:expr, $email:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({
                "username": $username,
                "email": $email,
                "password": "correct horse"
            }))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = test::read_body_json(resp).await;
        body["access_token"]
            .as_str()
            .expect("access token")
            .to_string()
    }};
}

/// Middleware rejections surface as service errors rather than responses.
async fn rejected_status<S, B>(app: &S, req: actix_http::Request) -> StatusCode
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
{
    match test::try_call_service(app, req).await {
        Ok(resp) => resp.status(),
        Err(err) => err.as_response_error().status_code(),
    }
}

fn bearer(token: &str) -> (actix_web::http::header::HeaderName, String) {
    (AUTHORIZATION, format!("Bearer {token}"))
}

#[actix_web::test]
async fn health_reports_ok_with_request_id() {
    let services = services();
    let app = app!(services);

    let req = test::TestRequest::get()
        .uri("/api/health")
        .insert_header(("x-request-id", "req-1"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("req-1")
    );
    assert!(resp.headers().contains_key("server-timing"));

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn donate_then_like_and_unlike_through_the_feed() {
    let services = services();
    let app = app!(services);

    let alice = register!(app, "alice", "alice@example.com");
    let bob = register!(app, "bob", "bob@example.com");

    let req = test::TestRequest::post()
        .uri("/api/donations")
        .insert_header(bearer(&alice))
        .set_json(json!({
            "food_name": "Vegetable biryani",
            "serving_count": 6,
            "latitude": 17.385,
            "longitude": 78.4867,
            "image": {
                "file_name": "biryani.png",
                "content_type": "image/png",
                "data": IMAGE_BASE64
            }
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["donation"]["serving_count"], 6);
    let post_id = body["post"]["id"].as_str().expect("post id").to_string();
    let image_id = body["post"]["imageId"].as_str().expect("image id").to_string();

    let req = test::TestRequest::get()
        .uri("/api/feed")
        .insert_header(bearer(&bob))
        .to_request();
    let feed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(feed["total"], 1);
    assert_eq!(feed["posts"][0]["username"], "alice");
    assert_eq!(feed["posts"][0]["foodName"], "Vegetable biryani");
    assert_eq!(feed["posts"][0]["isLikedByCurrentUser"], false);

    let like_uri = format!("/api/feed/{post_id}/like");
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri(&like_uri)
            .insert_header(bearer(&bob))
            .to_request();
        let liked: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(liked["likes"], 1);
        assert_eq!(liked["isLikedByCurrentUser"], true);
    }

    // someone else's view of the same post
    let req = test::TestRequest::get()
        .uri(&format!("/api/feed/{post_id}"))
        .insert_header(bearer(&alice))
        .to_request();
    let seen: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(seen["likes"], 1);
    assert_eq!(seen["isLikedByCurrentUser"], false);

    let req = test::TestRequest::delete()
        .uri(&like_uri)
        .insert_header(bearer(&bob))
        .to_request();
    let unliked: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(unliked["likes"], 0);
    assert_eq!(unliked["isLikedByCurrentUser"], false);

    let req = test::TestRequest::get()
        .uri(&format!("/api/media/{image_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some("image/png")
    );
    let bytes = test::read_body(resp).await;
    assert_eq!(&bytes[..], b"hello");
}

#[actix_web::test]
async fn donation_without_image_stays_off_the_feed() {
    let services = services();
    let app = app!(services);
    let token = register!(app, "carol", "carol@example.com");

    let req = test::TestRequest::post()
        .uri("/api/donations")
        .insert_header(bearer(&token))
        .set_json(json!({
            "food_name": "Bread",
            "serving_count": 2,
            "latitude": 0.0,
            "longitude": 0.0
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["post"].is_null());

    let req = test::TestRequest::get().uri("/api/donations").to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(list["total"], 1);

    let req = test::TestRequest::get().uri("/api/feed").to_request();
    let feed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(feed["total"], 0);
}

#[actix_web::test]
async fn protected_routes_reject_missing_or_bad_tokens() {
    let services = services();
    let app = app!(services);

    let req = test::TestRequest::post()
        .uri("/api/feed/some-post/like")
        .to_request();
    assert_eq!(rejected_status(&app, req).await, StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/feed")
        .insert_header(bearer("not-a-jwt"))
        .set_json(json!({ "foodName": "Soup", "imageId": "img" }))
        .to_request();
    assert_eq!(rejected_status(&app, req).await, StatusCode::UNAUTHORIZED);

    // a broken token on a public read is just an anonymous viewer
    let req = test::TestRequest::get()
        .uri("/api/feed")
        .insert_header(bearer("not-a-jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn invalid_input_maps_to_client_errors() {
    let services = services();
    let app = app!(services);
    let token = register!(app, "dave", "dave@example.com");

    let req = test::TestRequest::post()
        .uri("/api/donations")
        .insert_header(bearer(&token))
        .set_json(json!({
            "food_name": "Rice",
            "serving_count": 0,
            "latitude": 10.0,
            "longitude": 10.0
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/media")
        .insert_header(bearer(&token))
        .set_json(json!({ "content_type": "text/plain", "data": IMAGE_BASE64 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/feed/missing/like")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": "dave2",
            "email": "DAVE@example.com",
            "password": "another password"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn login_and_me_round_trip() {
    let services = services();
    let app = app!(services);
    register!(app, "erin", "erin@example.com");

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "erin@example.com", "password": "wrong password" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "erin@example.com", "password": "correct horse" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let token = body["access_token"].as_str().expect("token").to_string();
    assert_eq!(body["token_type"], "Bearer");

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&token))
        .to_request();
    let me: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(me["username"], "erin");
    assert_eq!(me["email"], "erin@example.com");
}

#[actix_web::test]
async fn media_upload_takes_snake_case_payload_and_returns_image_id() {
    let services = services();
    let app = app!(services);
    let token = register!(app, "frank", "frank@example.com");

    let req = test::TestRequest::post()
        .uri("/api/media")
        .insert_header(bearer(&token))
        .set_json(json!({
            "file_name": "soup.jpg",
            "content_type": "image/jpeg",
            "data": IMAGE_BASE64
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let image_id = body["imageId"].as_str().expect("imageId").to_string();
    assert!(body.get("image_id").is_none());

    let req = test::TestRequest::post()
        .uri("/api/feed")
        .insert_header(bearer(&token))
        .set_json(json!({ "foodName": "Tomato soup", "imageId": image_id }))
        .to_request();
    let post: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(post["imageId"], image_id.as_str());

    let req = test::TestRequest::get()
        .uri(&format!("/api/media/{image_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(
        resp.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some("image/jpeg")
    );
}
