//! User management routes (admin)

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};
use nimbus_auth::hash_password;
use nimbus_db::{AccountStatus, NewAccount, Role};
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

use super::auth::{RequireAdmin, validate_email, validate_password_length};
use super::types::{
    AccountResponse, CreateUserRequest, ListUsersQuery, UpdateUserRequest, UserListResponse,
};

/// Minimum allowed password length for operator-created users
const MIN_PASSWORD_LENGTH: usize = 8;

fn validate_new_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    validate_password_length(password)
}

fn parse_role(role: &str) -> Result<Role, ApiError> {
    Role::from_str(role).map_err(|_| ApiError::BadRequest(format!("Invalid role: {}", role)))
}

// ==================== User Routes ====================

/// GET /api/v1/users (Admin only)
async fn list_users(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<UserListResponse>, ApiError> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 200);
    let offset = (page - 1) * limit;

    let users = state.db.list_accounts(limit, offset).await?;
    let total = state.db.count_accounts().await?;

    Ok(Json(UserListResponse {
        users: users.into_iter().map(AccountResponse::from).collect(),
        total,
        page,
        limit,
    }))
}

/// POST /api/v1/users (Admin only)
///
/// Operator-created accounts come up active and pre-verified, unlike
/// self-registration.
async fn create_user(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    validate_email(&request.email)?;
    validate_new_password(&request.password)?;
    let role = parse_role(&request.role)?;

    debug!(email = %request.email, "Creating user");

    let password_hash = hash_password(&request.password)?;
    let account = state
        .db
        .insert_account(NewAccount::provisioned(
            request.email,
            password_hash,
            role,
            request.tenant_id,
        ))
        .await?;

    info!(account_id = %account.id, "Created user");

    Ok((StatusCode::CREATED, Json(AccountResponse::from(account))))
}

/// GET /api/v1/users/{id} (Admin only)
async fn get_user(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state
        .db
        .find_account_by_id(&id)
        .await?
        .filter(|a| !a.is_deleted)
        .ok_or_else(|| ApiError::NotFound(format!("User: {}", id)))?;

    Ok(Json(AccountResponse::from(account)))
}

/// PUT /api/v1/users/{id} (Admin only)
async fn update_user(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    debug!(account_id = %id, "Updating user");

    state
        .db
        .find_account_by_id(&id)
        .await?
        .filter(|a| !a.is_deleted)
        .ok_or_else(|| ApiError::NotFound(format!("User: {}", id)))?;

    if let Some(role_str) = &request.role {
        let role = parse_role(role_str)?;
        state.db.update_account_role(&id, role).await?;
    }

    if let Some(status_str) = &request.status {
        let status = AccountStatus::from_str(status_str)
            .map_err(|_| ApiError::BadRequest(format!("Invalid status: {}", status_str)))?;
        state.db.set_account_status(&id, status).await?;
    }

    if let Some(password) = &request.password {
        validate_new_password(password)?;
        let password_hash = hash_password(password)?;
        state.db.update_password(&id, &password_hash).await?;
    }

    let account = state
        .db
        .find_account_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User: {}", id)))?;

    info!(account_id = %account.id, "Updated user");

    Ok(Json(AccountResponse::from(account)))
}

/// DELETE /api/v1/users/{id} (Admin only, soft delete)
async fn delete_user(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    debug!(account_id = %id, "Deleting user");

    let deleted = state.db.soft_delete_account(&id).await?;

    if deleted {
        info!(account_id = %id, "Deleted user");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("User: {}", id)))
    }
}

/// Create user routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/users", get(list_users))
        .route("/api/v1/users", post(create_user))
        .route("/api/v1/users/{id}", get(get_user))
        .route("/api/v1/users/{id}", put(update_user))
        .route("/api/v1/users/{id}", delete(delete_user))
}
