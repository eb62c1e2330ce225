pub mod auth;
pub mod donation;
pub mod feed;
pub mod media;
