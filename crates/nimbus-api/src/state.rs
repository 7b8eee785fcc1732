//! Application state

use nimbus_auth::{AuthGuard, AuthService};
use nimbus_db::Database;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub auth: Arc<AuthService>,
    pub guard: Arc<AuthGuard>,
}

impl AppState {
    pub fn new(db: Database, auth: Arc<AuthService>, guard: Arc<AuthGuard>) -> Self {
        Self { db, auth, guard }
    }
}
