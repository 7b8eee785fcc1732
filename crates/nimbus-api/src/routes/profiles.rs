//! Profile routes

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use nimbus_db::ProfileUpdate;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

use super::auth::{RequireAdmin, RequireAuth, RequireVerified};
use super::types::{ProfileResponse, UpdateProfileRequest};

/// Maximum length for any free-text profile field
const MAX_FIELD_LENGTH: usize = 1024;

fn validate_field(name: &str, value: &Option<String>) -> Result<(), ApiError> {
    if let Some(v) = value
        && v.len() > MAX_FIELD_LENGTH
    {
        return Err(ApiError::BadRequest(format!(
            "{} exceeds maximum length of {} characters",
            name, MAX_FIELD_LENGTH
        )));
    }
    Ok(())
}

// ==================== Profile Routes ====================

/// GET /api/v1/profile
async fn get_own_profile(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state
        .db
        .get_profile(&principal.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile".to_string()))?;

    Ok(Json(ProfileResponse::from(profile)))
}

/// PUT /api/v1/profile
///
/// Writes require a verified email; reads do not.
async fn update_own_profile(
    RequireVerified(principal): RequireVerified,
    State(state): State<AppState>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    validate_field("display_name", &request.display_name)?;
    validate_field("bio", &request.bio)?;
    validate_field("avatar_url", &request.avatar_url)?;
    validate_field("location", &request.location)?;
    validate_field("website", &request.website)?;

    debug!(account_id = %principal.id, "Updating profile");

    let profile = state
        .db
        .upsert_profile(
            &principal.id,
            ProfileUpdate {
                display_name: request.display_name,
                bio: request.bio,
                avatar_url: request.avatar_url,
                location: request.location,
                website: request.website,
            },
        )
        .await?;

    Ok(Json(ProfileResponse::from(profile)))
}

/// GET /api/v1/users/{id}/profile (Admin only)
async fn get_user_profile(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state
        .db
        .get_profile(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Profile: {}", id)))?;

    Ok(Json(ProfileResponse::from(profile)))
}

/// Create profile routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/profile", get(get_own_profile))
        .route("/api/v1/profile", put(update_own_profile))
        .route("/api/v1/users/{id}/profile", get(get_user_profile))
}
