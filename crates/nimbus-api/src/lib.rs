//! Nimbus REST API
//!
//! This crate provides the Axum-based HTTP API for Nimbus: authentication,
//! user management, and profile CRUD.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
