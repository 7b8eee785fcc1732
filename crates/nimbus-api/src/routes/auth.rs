//! Authentication extractors and routes

use axum::{
    Json, Router,
    extract::{FromRef, FromRequestParts, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    routing::{get, post},
};
use nimbus_auth::{AuthError, Permission, Principal, RoutePolicy, role_has_permission};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

use super::types::{
    ChangePasswordRequest, LoginRequest, MeResponse, MessageResponse,
    PasswordResetConfirmRequest, PasswordResetRequest, RefreshRequest, RegisterRequest,
    ResendVerificationRequest, TokenResponse, VerifyEmailRequest,
};

// ==================== Auth Extractors ====================

async fn authorize<S>(parts: &mut Parts, state: &S, policy: RoutePolicy) -> Result<Principal, ApiError>
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    let app_state = AppState::from_ref(state);
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    app_state
        .guard
        .can_activate(auth_header, &policy)
        .await?
        // The policies used here are never public, so a principal is always produced
        .ok_or(ApiError::Auth(AuthError::AuthenticationFailed))
}

/// Extractor for an authenticated caller
pub struct RequireAuth(pub Principal);

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let principal = authorize(parts, state, RoutePolicy::authenticated()).await?;
        debug!(account_id = %principal.id, "Authenticated request");
        Ok(RequireAuth(principal))
    }
}

/// Extractor for an authenticated caller with a verified email
pub struct RequireVerified(pub Principal);

impl<S> FromRequestParts<S> for RequireVerified
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let principal = authorize(parts, state, RoutePolicy::verified()).await?;
        Ok(RequireVerified(principal))
    }
}

/// Extractor for a caller allowed to manage users
pub struct RequireAdmin(pub Principal);

impl<S> FromRequestParts<S> for RequireAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(principal) = RequireAuth::from_request_parts(parts, state).await?;

        if !role_has_permission(principal.role, Permission::ManageUsers) {
            return Err(ApiError::Forbidden);
        }

        Ok(RequireAdmin(principal))
    }
}

// ==================== Input Validation ====================

/// Maximum allowed email length
const MAX_EMAIL_LENGTH: usize = 254;
/// Maximum allowed password length (prevent DoS with very large passwords)
const MAX_PASSWORD_LENGTH: usize = 256;

/// Validate email shape and length
pub(super) fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.is_empty() {
        return Err(ApiError::BadRequest("Email cannot be empty".to_string()));
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Email exceeds maximum length of {} characters",
            MAX_EMAIL_LENGTH
        )));
    }
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    }
    Ok(())
}

/// Cap password length before any hashing work happens
pub(super) fn validate_password_length(password: &str) -> Result<(), ApiError> {
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password exceeds maximum length of {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

// ==================== Auth Routes ====================

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    validate_email(&request.email)?;
    validate_password_length(&request.password)?;

    let issued = state.auth.authenticate(&request.email, &request.password).await?;
    Ok(Json(TokenResponse::from(issued)))
}

/// POST /api/v1/auth/register
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    validate_email(&request.email)?;
    validate_password_length(&request.password)?;

    state
        .auth
        .register(
            &request.email,
            &request.password,
            &request.confirm_password,
            None,
            request.tenant_id,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "Account created; check your inbox to verify your email",
        )),
    ))
}

/// POST /api/v1/auth/refresh
async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let issued = state.auth.refresh_token(&request.refresh_token).await?;
    Ok(Json(TokenResponse::from(issued)))
}

/// POST /api/v1/auth/logout
async fn logout(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth.logout(&principal.id).await?;
    Ok(Json(MessageResponse::new("Logged out")))
}

/// GET /api/v1/auth/me
async fn me(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<MeResponse>, ApiError> {
    let permissions = state.auth.get_user_permissions(&principal.id).await?;
    Ok(Json(MeResponse::from_principal(principal, permissions)))
}

/// POST /api/v1/auth/password/change
async fn change_password(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    validate_password_length(&request.new_password)?;

    state
        .auth
        .change_password(
            &principal.id,
            &request.current_password,
            &request.new_password,
            &request.confirm_password,
        )
        .await?;

    Ok(Json(MessageResponse::new("Password changed")))
}

/// POST /api/v1/auth/password/reset/request
///
/// Always answers 202 with the same body; whether the account exists is
/// deliberately not observable here.
async fn password_reset_request(
    State(state): State<AppState>,
    Json(request): Json<PasswordResetRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    validate_email(&request.email)?;

    let _ = state.auth.request_password_reset(&request.email).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse::new(
            "If the account exists, a reset link has been sent",
        )),
    ))
}

/// POST /api/v1/auth/password/reset/confirm
async fn password_reset_confirm(
    State(state): State<AppState>,
    Json(request): Json<PasswordResetConfirmRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    validate_password_length(&request.new_password)?;

    if state
        .auth
        .confirm_password_reset(&request.token, &request.new_password)
        .await?
    {
        Ok(Json(MessageResponse::new("Password reset")))
    } else {
        Err(ApiError::BadRequest(
            "Unable to reset password".to_string(),
        ))
    }
}

/// POST /api/v1/auth/email/verify
async fn verify_email(
    State(state): State<AppState>,
    Json(request): Json<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if state.auth.verify_email(&request.token).await? {
        Ok(Json(MessageResponse::new("Email verified")))
    } else {
        Err(ApiError::BadRequest("Unable to verify email".to_string()))
    }
}

/// POST /api/v1/auth/email/resend
///
/// Same anti-enumeration shape as the reset request.
async fn resend_verification(
    State(state): State<AppState>,
    Json(request): Json<ResendVerificationRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    validate_email(&request.email)?;

    let _ = state.auth.resend_email_verification(&request.email).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse::new(
            "If the account exists, a verification link has been sent",
        )),
    ))
}

/// Create auth routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/refresh", post(refresh))
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/auth/me", get(me))
        .route("/api/v1/auth/password/change", post(change_password))
        .route("/api/v1/auth/password/reset/request", post(password_reset_request))
        .route("/api/v1/auth/password/reset/confirm", post(password_reset_confirm))
        .route("/api/v1/auth/email/verify", post(verify_email))
        .route("/api/v1/auth/email/resend", post(resend_verification))
}
