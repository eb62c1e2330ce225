pub mod auth_service;
pub mod donation_service;
pub mod feed_service;
pub mod media_service;
