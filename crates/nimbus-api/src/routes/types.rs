//! Request/Response DTOs

use nimbus_auth::{IssuedTokens, Permission, Principal};
use nimbus_db::{Account, Profile};
use serde::{Deserialize, Serialize};

// ==================== Auth Types ====================

/// Login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

/// Token refresh request
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Password change request
#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Password reset start request
#[derive(Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

/// Password reset completion request
#[derive(Deserialize)]
pub struct PasswordResetConfirmRequest {
    pub token: String,
    pub new_password: String,
}

/// Email verification request
#[derive(Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

/// Verification re-send request
#[derive(Deserialize)]
pub struct ResendVerificationRequest {
    pub email: String,
}

/// Successful login/refresh response
#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub account: AccountResponse,
}

impl From<IssuedTokens> for TokenResponse {
    fn from(issued: IssuedTokens) -> Self {
        Self {
            access_token: issued.access_token,
            refresh_token: issued.refresh_token,
            token_type: issued.token_type,
            expires_in: issued.expires_in,
            account: AccountResponse::from(issued.account),
        }
    }
}

/// Generic message response
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The authenticated caller, as seen by itself
#[derive(Serialize)]
pub struct MeResponse {
    pub id: String,
    pub email: String,
    pub role: String,
    pub status: String,
    pub email_verification_status: String,
    pub tenant_id: Option<String>,
    pub permissions: Vec<Permission>,
}

impl MeResponse {
    pub fn from_principal(principal: Principal, permissions: Vec<Permission>) -> Self {
        Self {
            id: principal.id,
            email: principal.email,
            role: principal.role.as_str().to_string(),
            status: principal.status.as_str().to_string(),
            email_verification_status: principal.email_verification_status.as_str().to_string(),
            tenant_id: principal.tenant_id,
            permissions,
        }
    }
}

// ==================== User Types ====================

/// Account response (credential material never included)
#[derive(Serialize)]
pub struct AccountResponse {
    pub id: String,
    pub email: String,
    pub role: String,
    pub status: String,
    pub email_verification_status: String,
    pub tenant_id: Option<String>,
    pub last_login_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            role: account.role.as_str().to_string(),
            status: account.status.as_str().to_string(),
            email_verification_status: account.email_verification_status.as_str().to_string(),
            tenant_id: account.tenant_id,
            last_login_at: account.last_login_at.map(|t| t.to_rfc3339()),
            created_at: account.created_at.to_rfc3339(),
            updated_at: account.updated_at.to_rfc3339(),
        }
    }
}

/// Create user request (admin)
#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub role: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

/// Update user request (admin)
#[derive(Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Paginated user listing
#[derive(Serialize)]
pub struct UserListResponse {
    pub users: Vec<AccountResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// User listing query parameters
#[derive(Deserialize, Default)]
pub struct ListUsersQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    50
}

// ==================== Profile Types ====================

/// Profile response
#[derive(Serialize)]
pub struct ProfileResponse {
    pub account_id: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            account_id: profile.account_id,
            display_name: profile.display_name,
            bio: profile.bio,
            avatar_url: profile.avatar_url,
            location: profile.location,
            website: profile.website,
            created_at: profile.created_at.to_rfc3339(),
            updated_at: profile.updated_at.to_rfc3339(),
        }
    }
}

/// Profile update request
#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}
