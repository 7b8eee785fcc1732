//! Request authorization guard
//!
//! Per-request gate: extracts the bearer token, validates it, loads the
//! account, checks the account-state invariants in a fixed order, and
//! produces the request principal. Route requirements are explicit
//! `RoutePolicy` values, never runtime introspection.

use std::sync::Arc;

use nimbus_db::{AccountStatus, Database, Role, VerificationStatus};
use serde::Serialize;
use tracing::{debug, error};

use crate::error::{AuthError, ForbiddenReason};
use crate::permissions::Permission;
use crate::token::{TokenIssuer, TokenKind};

/// What a route demands of its callers
#[derive(Debug, Clone, Copy, Default)]
pub struct RoutePolicy {
    pub public: bool,
    pub require_verified_email: bool,
}

impl RoutePolicy {
    /// No authentication at all
    pub fn public() -> Self {
        Self {
            public: true,
            require_verified_email: false,
        }
    }

    /// A valid access token and a usable account
    pub fn authenticated() -> Self {
        Self {
            public: false,
            require_verified_email: false,
        }
    }

    /// Authenticated, and the email must be verified
    pub fn verified() -> Self {
        Self {
            public: false,
            require_verified_email: true,
        }
    }
}

/// The authenticated identity attached to a request. Built fresh per
/// request; permissions start empty and are filled lazily downstream.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,
    pub tenant_id: Option<String>,
    pub email_verification_status: VerificationStatus,
    pub permissions: Vec<Permission>,
}

/// Request authorization gate
#[derive(Clone)]
pub struct AuthGuard {
    db: Database,
    tokens: Arc<TokenIssuer>,
}

impl AuthGuard {
    pub fn new(db: Database, tokens: Arc<TokenIssuer>) -> Self {
        Self { db, tokens }
    }

    /// Authorize one request. Returns Ok(None) for public routes, a
    /// principal for authorized ones, and a typed failure otherwise.
    pub async fn can_activate(
        &self,
        authorization: Option<&str>,
        policy: &RoutePolicy,
    ) -> Result<Option<Principal>, AuthError> {
        if policy.public {
            return Ok(None);
        }

        let header = authorization.ok_or(AuthError::MissingToken)?;
        let token = extract_bearer_token(header)?;

        let claims = self.tokens.verify(token)?;
        if claims.kind != TokenKind::Access {
            debug!(kind = claims.kind.as_str(), "Guard rejected non-access token");
            return Err(AuthError::InvalidToken);
        }

        let account = self
            .db
            .find_account_by_id(&claims.sub)
            .await
            .map_err(|e| {
                // Never leak directory failures to the client
                error!(error = %e, "Account load failed during authorization");
                AuthError::AuthenticationFailed
            })?
            .ok_or(AuthError::UserNotFound)?;

        // Fixed order: the first failing check wins. Lock and suspension
        // take precedence over verification state.
        if !account.is_active || account.is_deleted {
            return Err(AuthError::Forbidden(ForbiddenReason::Inactive));
        }
        if account.status == AccountStatus::Locked {
            return Err(AuthError::Forbidden(ForbiddenReason::Locked));
        }
        if account.status == AccountStatus::Suspended {
            return Err(AuthError::Forbidden(ForbiddenReason::Suspended));
        }
        if policy.require_verified_email
            && account.email_verification_status != VerificationStatus::Verified
        {
            return Err(AuthError::Forbidden(ForbiddenReason::Unverified));
        }

        debug!(account_id = %account.id, role = account.role.as_str(), "Request authorized");
        Ok(Some(Principal {
            id: account.id,
            email: account.email,
            role: account.role,
            status: account.status,
            tenant_id: account.tenant_id,
            email_verification_status: account.email_verification_status,
            permissions: Vec::new(),
        }))
    }
}

/// Extract bearer token from authorization header
fn extract_bearer_token(header: &str) -> Result<&str, AuthError> {
    header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthHeader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password;
    use crate::token::TokenConfig;
    use chrono::Utc;
    use nimbus_db::{Account, NewAccount};

    async fn setup(name: &str) -> (Database, Arc<TokenIssuer>, AuthGuard) {
        let db = Database::new(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
            .await
            .unwrap();
        let tokens = Arc::new(TokenIssuer::new("test-secret-key", TokenConfig::default()));
        let guard = AuthGuard::new(db.clone(), tokens.clone());
        (db, tokens, guard)
    }

    async fn provision(db: &Database, email: &str) -> Account {
        db.insert_account(NewAccount::provisioned(
            email.to_string(),
            password::hash_password("Correct1pw").unwrap(),
            Role::User,
            Some("acme".to_string()),
        ))
        .await
        .unwrap()
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    #[tokio::test]
    async fn test_public_routes_skip_everything() {
        let (_db, _tokens, guard) = setup("guard_public").await;
        let result = guard.can_activate(None, &RoutePolicy::public()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_happy_path_builds_principal() {
        let (db, tokens, guard) = setup("guard_happy").await;
        let account = provision(&db, "m@x.com").await;
        let token = tokens.sign_access(&account).unwrap();

        let principal = guard
            .can_activate(Some(&bearer(&token)), &RoutePolicy::verified())
            .await
            .unwrap()
            .expect("principal expected");

        assert_eq!(principal.id, account.id);
        assert_eq!(principal.email, "m@x.com");
        assert_eq!(principal.role, Role::User);
        assert_eq!(principal.tenant_id.as_deref(), Some("acme"));
        assert!(principal.permissions.is_empty());
    }

    #[tokio::test]
    async fn test_header_failures() {
        let (db, tokens, guard) = setup("guard_headers").await;
        let account = provision(&db, "n@x.com").await;

        let result = guard.can_activate(None, &RoutePolicy::authenticated()).await;
        assert!(matches!(result, Err(AuthError::MissingToken)));

        let token = tokens.sign_access(&account).unwrap();
        let result = guard
            .can_activate(Some(&format!("Token {token}")), &RoutePolicy::authenticated())
            .await;
        assert!(matches!(result, Err(AuthError::InvalidAuthHeader)));

        let result = guard
            .can_activate(Some("Bearer garbage"), &RoutePolicy::authenticated())
            .await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_an_access_token() {
        let (db, tokens, guard) = setup("guard_kind").await;
        let account = provision(&db, "o@x.com").await;
        let refresh = tokens.sign_refresh(&account).unwrap();

        let result = guard
            .can_activate(Some(&bearer(&refresh)), &RoutePolicy::authenticated())
            .await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_unknown_subject() {
        let (_db, tokens, guard) = setup("guard_unknown_sub").await;
        let now = Utc::now();
        let ghost = Account {
            id: "no-such-id".to_string(),
            email: "ghost@x.com".to_string(),
            password_hash: "hash".to_string(),
            password_changed_at: None,
            status: AccountStatus::Active,
            email_verification_status: VerificationStatus::Verified,
            role: Role::User,
            tenant_id: None,
            failed_login_attempts: 0,
            last_failed_login_at: None,
            locked_at: None,
            lock_reason: None,
            last_login_at: None,
            is_active: true,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        let token = tokens.sign_access(&ghost).unwrap();

        let result = guard
            .can_activate(Some(&bearer(&token)), &RoutePolicy::authenticated())
            .await;
        assert!(matches!(result, Err(AuthError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_state_check_order() {
        let (db, tokens, guard) = setup("guard_order").await;

        // Locked AND unverified on a verified-only route: locked wins
        let account = db
            .insert_account(NewAccount::registration(
                "p@x.com".to_string(),
                "hash".to_string(),
                Role::User,
                None,
            ))
            .await
            .unwrap();
        let token = tokens.sign_access(&account).unwrap();
        db.lock_account(&account.id, "test").await.unwrap();

        let result = guard
            .can_activate(Some(&bearer(&token)), &RoutePolicy::verified())
            .await;
        assert!(matches!(
            result,
            Err(AuthError::Forbidden(ForbiddenReason::Locked))
        ));

        // Soft-deleted beats locked
        db.soft_delete_account(&account.id).await.unwrap();
        let result = guard
            .can_activate(Some(&bearer(&token)), &RoutePolicy::verified())
            .await;
        assert!(matches!(
            result,
            Err(AuthError::Forbidden(ForbiddenReason::Inactive))
        ));
    }

    #[tokio::test]
    async fn test_suspended_and_unverified_reasons() {
        let (db, tokens, guard) = setup("guard_reasons").await;

        let suspended = provision(&db, "q@x.com").await;
        let token = tokens.sign_access(&suspended).unwrap();
        db.set_account_status(&suspended.id, AccountStatus::Suspended)
            .await
            .unwrap();
        let result = guard
            .can_activate(Some(&bearer(&token)), &RoutePolicy::authenticated())
            .await;
        assert!(matches!(
            result,
            Err(AuthError::Forbidden(ForbiddenReason::Suspended))
        ));

        // Unverified trips only routes that demand verification
        let pending = db
            .insert_account(NewAccount::registration(
                "r@x.com".to_string(),
                "hash".to_string(),
                Role::User,
                None,
            ))
            .await
            .unwrap();
        let token = tokens.sign_access(&pending).unwrap();

        let result = guard
            .can_activate(Some(&bearer(&token)), &RoutePolicy::verified())
            .await;
        assert!(matches!(
            result,
            Err(AuthError::Forbidden(ForbiddenReason::Unverified))
        ));

        let principal = guard
            .can_activate(Some(&bearer(&token)), &RoutePolicy::authenticated())
            .await
            .unwrap();
        assert!(principal.is_some());
    }
}
