//! Database models

use crate::utils::{parse_datetime_opt, parse_datetime_or_now};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::fmt;
use std::str::FromStr;

/// Error type for parsing models from strings
#[derive(Debug, Clone)]
pub enum ParseError {
    InvalidAccountStatus(String),
    InvalidRole(String),
    InvalidVerificationStatus(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidAccountStatus(s) => write!(f, "Invalid account status: {}", s),
            ParseError::InvalidRole(s) => write!(f, "Invalid role: {}", s),
            ParseError::InvalidVerificationStatus(s) => {
                write!(f, "Invalid verification status: {}", s)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Account lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    PendingVerification,
    Active,
    Inactive,
    Locked,
    Suspended,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::PendingVerification => "pending_verification",
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
            AccountStatus::Locked => "locked",
            AccountStatus::Suspended => "suspended",
        }
    }
}

impl FromStr for AccountStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_verification" => Ok(AccountStatus::PendingVerification),
            "active" => Ok(AccountStatus::Active),
            "inactive" => Ok(AccountStatus::Inactive),
            "locked" => Ok(AccountStatus::Locked),
            "suspended" => Ok(AccountStatus::Suspended),
            _ => Err(ParseError::InvalidAccountStatus(s.to_string())),
        }
    }
}

/// Account role, ordered by privilege
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Guest,
    User,
    Moderator,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Numeric privilege rank, higher is more privileged
    pub fn privilege(&self) -> u8 {
        match self {
            Role::Guest => 0,
            Role::User => 1,
            Role::Moderator => 2,
            Role::Admin => 3,
            Role::SuperAdmin => 4,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

impl FromStr for Role {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guest" => Ok(Role::Guest),
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            "super_admin" => Ok(Role::SuperAdmin),
            _ => Err(ParseError::InvalidRole(s.to_string())),
        }
    }
}

/// Email verification status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Unverified,
    Verified,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Unverified => "unverified",
            VerificationStatus::Verified => "verified",
        }
    }
}

impl FromStr for VerificationStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unverified" => Ok(VerificationStatus::Unverified),
            "verified" => Ok(VerificationStatus::Verified),
            _ => Err(ParseError::InvalidVerificationStatus(s.to_string())),
        }
    }
}

/// Account model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub status: AccountStatus,
    pub email_verification_status: VerificationStatus,
    pub role: Role,
    pub tenant_id: Option<String>,
    pub failed_login_attempts: i64,
    pub last_failed_login_at: Option<DateTime<Utc>>,
    pub locked_at: Option<DateTime<Utc>>,
    pub lock_reason: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New account (for insertion)
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub tenant_id: Option<String>,
    pub status: AccountStatus,
    pub email_verification_status: VerificationStatus,
}

impl NewAccount {
    /// A self-registered account: pending verification, unverified email
    pub fn registration(
        email: String,
        password_hash: String,
        role: Role,
        tenant_id: Option<String>,
    ) -> Self {
        Self {
            email,
            password_hash,
            role,
            tenant_id,
            status: AccountStatus::PendingVerification,
            email_verification_status: VerificationStatus::Unverified,
        }
    }

    /// An operator-created account: active and pre-verified
    pub fn provisioned(
        email: String,
        password_hash: String,
        role: Role,
        tenant_id: Option<String>,
    ) -> Self {
        Self {
            email,
            password_hash,
            role,
            tenant_id,
            status: AccountStatus::Active,
            email_verification_status: VerificationStatus::Verified,
        }
    }
}

/// Account profile model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub account_id: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields for upsert (all optional, None leaves the field untouched)
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
}

// ==================== TryFrom Implementations ====================

impl TryFrom<&sqlx::sqlite::SqliteRow> for Account {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        let status_str: String = row.try_get("status")?;
        let verification_str: String = row.try_get("email_verification_status")?;
        let role_str: String = row.try_get("role")?;
        Ok(Account {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            password_changed_at: parse_datetime_opt(
                row.try_get::<Option<String>, _>("password_changed_at")?,
            ),
            // Unknown strings fail closed to the non-usable states
            status: AccountStatus::from_str(&status_str).unwrap_or(AccountStatus::Inactive),
            email_verification_status: VerificationStatus::from_str(&verification_str)
                .unwrap_or(VerificationStatus::Unverified),
            role: Role::from_str(&role_str).unwrap_or(Role::Guest),
            tenant_id: row.try_get("tenant_id")?,
            failed_login_attempts: row.try_get("failed_login_attempts")?,
            last_failed_login_at: parse_datetime_opt(
                row.try_get::<Option<String>, _>("last_failed_login_at")?,
            ),
            locked_at: parse_datetime_opt(row.try_get::<Option<String>, _>("locked_at")?),
            lock_reason: row.try_get("lock_reason")?,
            last_login_at: parse_datetime_opt(row.try_get::<Option<String>, _>("last_login_at")?),
            is_active: row.try_get("is_active")?,
            is_deleted: row.try_get("is_deleted")?,
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("updated_at")?),
        })
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for Profile {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(Profile {
            account_id: row.try_get("account_id")?,
            display_name: row.try_get("display_name")?,
            bio: row.try_get("bio")?,
            avatar_url: row.try_get("avatar_url")?,
            location: row.try_get("location")?,
            website: row.try_get("website")?,
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("updated_at")?),
        })
    }
}
