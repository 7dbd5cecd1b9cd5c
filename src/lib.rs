pub mod auth;
pub mod clock;
pub mod settings;
pub mod constants;
pub mod error;
pub mod feed;
pub mod filter;
pub mod models;
pub mod openapi;
pub mod pagination;
pub mod policy;
pub mod repo;
pub mod routes;
pub mod security;
pub mod storage;
pub mod viewer;

// Re-export commonly used items for tests / external users
pub use routes::{config, AppState};
pub use security::SecurityHeaders;
