pub mod appwrite_store;
pub mod document_store;
pub mod donation_repository;
pub mod file_store;
pub mod memory_store;
pub mod post_repository;
pub mod postgres_store;
pub mod user_repository;
