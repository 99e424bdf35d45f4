pub mod app;
pub mod authz;
pub mod config;
pub mod directory;
pub mod docs;
pub mod errors;
pub mod events;
pub mod jwt;
pub mod models;
pub mod routes;
pub mod session;

// Re-export commonly used items for tests
pub use app::create_app;
