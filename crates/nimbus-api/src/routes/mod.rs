//! API routes

pub mod auth;
mod health;
mod profiles;
pub mod types;
mod users;

use axum::Router;

use crate::state::AppState;

// Re-export commonly used types for external use
#[allow(unused_imports)]
pub use auth::{RequireAdmin, RequireAuth, RequireVerified};
#[allow(unused_imports)]
pub use types::*;

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health checks
        .merge(health::routes())
        // Authentication and account lifecycle
        .merge(auth::routes())
        // Admin user management
        .merge(users::routes())
        // Profile CRUD
        .merge(profiles::routes())
        .with_state(state)
}
