//! Authentication service
//!
//! Orchestrates login, registration, token refresh, password change/reset,
//! email verification, and permission derivation. Request correlation rides
//! the caller's tracing span; nothing here takes an explicit request id.

use std::sync::Arc;

use nimbus_db::{Account, AccountStatus, Database, DbError, NewAccount, Role, VerificationStatus};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::mailer::Mailer;
use crate::password::{self, DUMMY_HASH};
use crate::permissions::{Permission, permissions_for, role_has_permission};
use crate::token::{TokenIssuer, TokenKind};

/// Login and credential policy
#[derive(Debug, Clone)]
pub struct AuthPolicy {
    /// Failed-attempt count at which login is refused and the account locks
    pub lockout_threshold: i64,
    /// Whether accounts pending email verification may log in
    pub allow_unverified_login: bool,
    /// Minimum password length
    pub min_password_length: usize,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            lockout_threshold: 5,
            allow_unverified_login: false,
            min_password_length: 8,
        }
    }
}

/// Result of a successful login or refresh
#[derive(Debug, Clone, Serialize)]
pub struct IssuedTokens {
    pub account: Account,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Authentication service
pub struct AuthService {
    db: Database,
    tokens: Arc<TokenIssuer>,
    mailer: Arc<dyn Mailer>,
    policy: AuthPolicy,
}

impl AuthService {
    pub fn new(
        db: Database,
        tokens: Arc<TokenIssuer>,
        mailer: Arc<dyn Mailer>,
        policy: AuthPolicy,
    ) -> Self {
        Self {
            db,
            tokens,
            mailer,
            policy,
        }
    }

    // ==================== Login ====================

    /// Authenticate an email/password pair and issue a token pair.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IssuedTokens, AuthError> {
        debug!(email = %email, "Login attempt");

        let account = match self.db.find_account_by_email(email).await? {
            Some(account) => account,
            None => {
                // Burn a comparable verification so unknown emails are not
                // distinguishable by response time.
                let _ = password::verify_password(password, DUMMY_HASH);
                return Err(AuthError::InvalidCredentials);
            }
        };

        self.ensure_can_login(&account)?;

        if !password::verify_password(password, &account.password_hash)? {
            let attempts = self.db.increment_failed_login_attempts(&account.id).await?;
            warn!(
                account_id = %account.id,
                attempts,
                "Login failed: invalid credentials"
            );
            if attempts >= self.policy.lockout_threshold {
                self.db
                    .lock_account(&account.id, "too many failed login attempts")
                    .await?;
                warn!(account_id = %account.id, "Account locked after repeated failures");
            }
            return Err(AuthError::InvalidCredentials);
        }

        // Incidental side effect: a failure here must not fail the login
        if let Err(e) = self.db.record_login(&account.id).await {
            warn!(account_id = %account.id, error = %e, "Failed to record login");
        }

        info!(account_id = %account.id, "Login successful");
        self.issue_tokens(&account)
    }

    /// The can-login gate: state checks that apply regardless of whether the
    /// presented password is correct.
    fn ensure_can_login(&self, account: &Account) -> Result<(), AuthError> {
        if account.is_deleted || !account.is_active {
            return Err(AuthError::AccountNotUsable);
        }
        match account.status {
            AccountStatus::Active => {}
            AccountStatus::PendingVerification if self.policy.allow_unverified_login => {}
            _ => return Err(AuthError::AccountNotUsable),
        }
        if account.failed_login_attempts >= self.policy.lockout_threshold {
            return Err(AuthError::AccountNotUsable);
        }
        Ok(())
    }

    fn issue_tokens(&self, account: &Account) -> Result<IssuedTokens, AuthError> {
        let access_token = self.tokens.sign_access(account)?;
        let refresh_token = self.tokens.sign_refresh(account)?;
        Ok(IssuedTokens {
            account: account.clone(),
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.access_ttl_secs(),
        })
    }

    // ==================== Registration ====================

    /// Register a new account. The account starts pending verification and
    /// is never auto-activated.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        confirm_password: &str,
        role: Option<Role>,
        tenant_id: Option<String>,
    ) -> Result<Account, AuthError> {
        if password != confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        self.validate_password_strength(password)?;

        if self.db.email_exists(email).await? {
            return Err(AuthError::EmailAlreadyExists);
        }

        let password_hash = password::hash_password(password)?;
        let account = self
            .db
            .insert_account(NewAccount::registration(
                email.to_string(),
                password_hash,
                role.unwrap_or(Role::User),
                tenant_id,
            ))
            .await
            .map_err(|e| match e {
                DbError::Duplicate(_) => AuthError::EmailAlreadyExists,
                other => AuthError::Database(other),
            })?;

        let token = self.tokens.sign_email_verification(&account)?;
        self.mailer
            .send_email_verification(&account.email, &token)
            .await;

        info!(account_id = %account.id, "Account registered");
        Ok(account)
    }

    fn validate_password_strength(&self, password: &str) -> Result<(), AuthError> {
        if password.len() < self.policy.min_password_length {
            return Err(AuthError::WeakPassword(format!(
                "must be at least {} characters",
                self.policy.min_password_length
            )));
        }
        if !password.chars().any(|c| c.is_alphabetic()) {
            return Err(AuthError::WeakPassword(
                "must contain at least one letter".to_string(),
            ));
        }
        if !password.chars().any(|c| c.is_numeric()) {
            return Err(AuthError::WeakPassword(
                "must contain at least one number".to_string(),
            ));
        }
        Ok(())
    }

    // ==================== Token refresh ====================

    /// Exchange a refresh token for a fresh access+refresh pair.
    ///
    /// The can-login gate is re-run so an account locked after issuance
    /// cannot keep refreshing. Rotation is advisory: the old refresh token
    /// is not blacklisted (there is no revocation store).
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<IssuedTokens, AuthError> {
        let claims = self
            .tokens
            .verify(refresh_token)
            .map_err(|_| AuthError::InvalidRefreshToken)?;
        if claims.kind != TokenKind::Refresh {
            debug!(kind = claims.kind.as_str(), "Refresh rejected: wrong token kind");
            return Err(AuthError::InvalidRefreshToken);
        }

        let account = self
            .db
            .find_account_by_id(&claims.sub)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        self.ensure_can_login(&account)?;

        debug!(account_id = %account.id, "Refresh token exchanged");
        self.issue_tokens(&account)
    }

    // ==================== Password change / reset ====================

    /// Change the password of an authenticated account.
    pub async fn change_password(
        &self,
        account_id: &str,
        current_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<bool, AuthError> {
        let account = self
            .db
            .find_account_by_id(account_id)
            .await?
            .ok_or(AuthError::NotAuthenticated)?;

        if account.is_deleted || !account.is_active || account.status != AccountStatus::Active {
            return Err(AuthError::AccountInactive);
        }
        if new_password != confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        self.validate_password_strength(new_password)?;

        if !password::verify_password(current_password, &account.password_hash)? {
            warn!(account_id = %account.id, "Password change failed: wrong current password");
            return Err(AuthError::InvalidCredentials);
        }

        let password_hash = password::hash_password(new_password)?;
        self.db.update_password(&account.id, &password_hash).await?;

        info!(account_id = %account.id, "Password changed");
        Ok(true)
    }

    /// Start a password reset. Returns Ok(false) — not an error — when the
    /// account is missing or unusable, so callers can answer identically in
    /// both cases.
    pub async fn request_password_reset(&self, email: &str) -> Result<bool, AuthError> {
        let account = match self.db.find_account_by_email(email).await? {
            Some(account) => account,
            None => {
                debug!("Password reset requested for unknown email");
                return Ok(false);
            }
        };
        if account.is_deleted || !account.is_active {
            debug!(account_id = %account.id, "Password reset refused: account unusable");
            return Ok(false);
        }

        let token = self.tokens.sign_password_reset(&account)?;
        self.mailer.send_password_reset(&account.email, &token).await;

        info!(account_id = %account.id, "Password reset requested");
        Ok(true)
    }

    /// Complete a password reset with a token from `request_password_reset`.
    pub async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<bool, AuthError> {
        let claims = self.tokens.verify(token)?;
        if claims.kind != TokenKind::PasswordReset {
            return Err(AuthError::InvalidToken);
        }

        let account = match self.db.find_account_by_id(&claims.sub).await? {
            Some(account) => account,
            None => return Ok(false),
        };
        if account.is_deleted || !account.is_active {
            return Ok(false);
        }

        self.validate_password_strength(new_password)?;
        let password_hash = password::hash_password(new_password)?;
        self.db.update_password(&account.id, &password_hash).await?;

        info!(account_id = %account.id, "Password reset completed");
        Ok(true)
    }

    // ==================== Email verification ====================

    /// Verify an email address. A pending account becomes active.
    pub async fn verify_email(&self, token: &str) -> Result<bool, AuthError> {
        let claims = self.tokens.verify(token)?;
        if claims.kind != TokenKind::EmailVerification {
            return Err(AuthError::InvalidToken);
        }

        let account = match self.db.find_account_by_id(&claims.sub).await? {
            Some(account) => account,
            None => return Ok(false),
        };
        if account.is_deleted {
            return Ok(false);
        }

        self.db.mark_email_as_verified(&account.id).await?;
        info!(account_id = %account.id, "Email verified");
        Ok(true)
    }

    /// Re-send the verification mail. Returns false for missing, deleted,
    /// or already-verified accounts.
    pub async fn resend_email_verification(&self, email: &str) -> Result<bool, AuthError> {
        let account = match self.db.find_account_by_email(email).await? {
            Some(account) => account,
            None => return Ok(false),
        };
        if account.is_deleted
            || account.email_verification_status == VerificationStatus::Verified
        {
            return Ok(false);
        }

        let token = self.tokens.sign_email_verification(&account)?;
        self.mailer
            .send_email_verification(&account.email, &token)
            .await;

        debug!(account_id = %account.id, "Verification email re-queued");
        Ok(true)
    }

    // ==================== Permissions ====================

    /// Capabilities of an account. Missing accounts have none.
    pub async fn get_user_permissions(
        &self,
        account_id: &str,
    ) -> Result<Vec<Permission>, AuthError> {
        Ok(match self.account_role(account_id).await? {
            Some(role) => permissions_for(role).to_vec(),
            None => Vec::new(),
        })
    }

    pub async fn has_permission(
        &self,
        account_id: &str,
        permission: Permission,
    ) -> Result<bool, AuthError> {
        Ok(self
            .account_role(account_id)
            .await?
            .is_some_and(|role| role_has_permission(role, permission)))
    }

    pub async fn has_any_permission(
        &self,
        account_id: &str,
        permissions: &[Permission],
    ) -> Result<bool, AuthError> {
        Ok(self.account_role(account_id).await?.is_some_and(|role| {
            permissions
                .iter()
                .any(|p| role_has_permission(role, *p))
        }))
    }

    pub async fn has_all_permissions(
        &self,
        account_id: &str,
        permissions: &[Permission],
    ) -> Result<bool, AuthError> {
        Ok(self.account_role(account_id).await?.is_some_and(|role| {
            permissions
                .iter()
                .all(|p| role_has_permission(role, *p))
        }))
    }

    async fn account_role(&self, account_id: &str) -> Result<Option<Role>, AuthError> {
        Ok(self
            .db
            .find_account_by_id(account_id)
            .await?
            .filter(|a| !a.is_deleted)
            .map(|a| a.role))
    }

    // ==================== Logout ====================

    /// Best-effort logout marker. Without a revocation store this only
    /// leaves an audit trail; issued tokens stay valid until expiry.
    pub async fn logout(&self, account_id: &str) -> Result<bool, AuthError> {
        info!(account_id = %account_id, "Logout recorded");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::Mailer;
    use crate::token::TokenConfig;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Captures outbound tokens so tests can drive the verify/reset flows
    #[derive(Default)]
    struct RecordingMailer {
        verifications: Mutex<Vec<(String, String)>>,
        resets: Mutex<Vec<(String, String)>>,
    }

    impl RecordingMailer {
        fn last_verification_token(&self) -> String {
            self.verifications.lock().unwrap().last().unwrap().1.clone()
        }

        fn last_reset_token(&self) -> String {
            self.resets.lock().unwrap().last().unwrap().1.clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_email_verification(&self, email: &str, token: &str) {
            self.verifications
                .lock()
                .unwrap()
                .push((email.to_string(), token.to_string()));
        }

        async fn send_password_reset(&self, email: &str, token: &str) {
            self.resets
                .lock()
                .unwrap()
                .push((email.to_string(), token.to_string()));
        }
    }

    struct Harness {
        db: Database,
        service: AuthService,
        mailer: Arc<RecordingMailer>,
        tokens: Arc<TokenIssuer>,
    }

    async fn harness(name: &str, policy: AuthPolicy) -> Harness {
        let db = Database::new(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
            .await
            .unwrap();
        let tokens = Arc::new(TokenIssuer::new("test-secret-key", TokenConfig::default()));
        let mailer = Arc::new(RecordingMailer::default());
        let service = AuthService::new(
            db.clone(),
            tokens.clone(),
            mailer.clone(),
            policy,
        );
        Harness {
            db,
            service,
            mailer,
            tokens,
        }
    }

    async fn provision(h: &Harness, email: &str, password: &str) -> Account {
        h.db.insert_account(NewAccount::provisioned(
            email.to_string(),
            password::hash_password(password).unwrap(),
            Role::User,
            None,
        ))
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_register_then_login_requires_verification() {
        let h = harness("svc_register", AuthPolicy::default()).await;

        let account = h
            .service
            .register("a@x.com", "P@ssw0rd1", "P@ssw0rd1", None, None)
            .await
            .unwrap();
        assert_eq!(account.status, AccountStatus::PendingVerification);
        assert_eq!(
            account.email_verification_status,
            VerificationStatus::Unverified
        );
        assert_eq!(account.role, Role::User);

        // Not yet usable
        let result = h.service.authenticate("a@x.com", "P@ssw0rd1").await;
        assert!(matches!(result, Err(AuthError::AccountNotUsable)));

        // Verify, then login succeeds and claims carry the right subject
        let token = h.mailer.last_verification_token();
        assert!(h.service.verify_email(&token).await.unwrap());

        let issued = h.service.authenticate("a@x.com", "P@ssw0rd1").await.unwrap();
        assert_eq!(issued.token_type, "Bearer");
        assert_eq!(issued.expires_in, 900);
        let claims = h.tokens.verify(&issued.access_token).unwrap();
        assert_eq!(claims.sub, account.id);
        assert_eq!(claims.role, "user");
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[tokio::test]
    async fn test_unverified_login_allowed_by_policy() {
        let policy = AuthPolicy {
            allow_unverified_login: true,
            ..Default::default()
        };
        let h = harness("svc_unverified_policy", policy).await;

        h.service
            .register("b@x.com", "P@ssw0rd1", "P@ssw0rd1", None, None)
            .await
            .unwrap();
        assert!(h.service.authenticate("b@x.com", "P@ssw0rd1").await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_email_is_invalid_credentials() {
        let h = harness("svc_unknown", AuthPolicy::default()).await;
        let result = h.service.authenticate("nobody@x.com", "whatever1").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let h = harness("svc_register_validation", AuthPolicy::default()).await;

        let result = h
            .service
            .register("c@x.com", "P@ssw0rd1", "different1", None, None)
            .await;
        assert!(matches!(result, Err(AuthError::PasswordMismatch)));

        let result = h.service.register("c@x.com", "short1", "short1", None, None).await;
        assert!(matches!(result, Err(AuthError::WeakPassword(_))));

        let result = h
            .service
            .register("c@x.com", "lettersonly", "lettersonly", None, None)
            .await;
        assert!(matches!(result, Err(AuthError::WeakPassword(_))));

        h.service
            .register("C@X.com", "P@ssw0rd1", "P@ssw0rd1", None, None)
            .await
            .unwrap();
        // Case-insensitive conflict
        let result = h
            .service
            .register("c@x.com", "P@ssw0rd1", "P@ssw0rd1", None, None)
            .await;
        assert!(matches!(result, Err(AuthError::EmailAlreadyExists)));
    }

    #[tokio::test]
    async fn test_failed_attempts_count_exactly_and_lock() {
        let policy = AuthPolicy {
            lockout_threshold: 3,
            ..Default::default()
        };
        let h = harness("svc_lockout", policy).await;
        let account = provision(&h, "d@x.com", "Correct1pw").await;

        for _ in 0..2 {
            let result = h.service.authenticate("d@x.com", "Wrong1pw").await;
            assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        }
        let loaded = h.db.find_account_by_id(&account.id).await.unwrap().unwrap();
        assert_eq!(loaded.failed_login_attempts, 2);
        assert_eq!(loaded.status, AccountStatus::Active);

        // Third failure crosses the threshold and locks
        let result = h.service.authenticate("d@x.com", "Wrong1pw").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        let loaded = h.db.find_account_by_id(&account.id).await.unwrap().unwrap();
        assert_eq!(loaded.failed_login_attempts, 3);
        assert_eq!(loaded.status, AccountStatus::Locked);
        assert!(loaded.locked_at.is_some());

        // Correct password no longer helps
        let result = h.service.authenticate("d@x.com", "Correct1pw").await;
        assert!(matches!(result, Err(AuthError::AccountNotUsable)));
    }

    #[tokio::test]
    async fn test_successful_login_resets_counter() {
        let h = harness("svc_reset_counter", AuthPolicy::default()).await;
        let account = provision(&h, "e@x.com", "Correct1pw").await;

        let _ = h.service.authenticate("e@x.com", "Wrong1pw").await;
        h.service.authenticate("e@x.com", "Correct1pw").await.unwrap();

        let loaded = h.db.find_account_by_id(&account.id).await.unwrap().unwrap();
        assert_eq!(loaded.failed_login_attempts, 0);
        assert!(loaded.last_failed_login_at.is_none());
        assert!(loaded.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_locked_and_suspended_reject_correct_password() {
        let h = harness("svc_states", AuthPolicy::default()).await;
        let account = provision(&h, "f@x.com", "Correct1pw").await;

        h.db.lock_account(&account.id, "operator action").await.unwrap();
        let result = h.service.authenticate("f@x.com", "Correct1pw").await;
        assert!(matches!(result, Err(AuthError::AccountNotUsable)));

        h.db.set_account_status(&account.id, AccountStatus::Suspended)
            .await
            .unwrap();
        let result = h.service.authenticate("f@x.com", "Correct1pw").await;
        assert!(matches!(result, Err(AuthError::AccountNotUsable)));

        h.db.set_account_status(&account.id, AccountStatus::Active)
            .await
            .unwrap();
        h.db.soft_delete_account(&account.id).await.unwrap();
        let result = h.service.authenticate("f@x.com", "Correct1pw").await;
        assert!(matches!(result, Err(AuthError::AccountNotUsable)));
    }

    #[tokio::test]
    async fn test_refresh_flow() {
        let h = harness("svc_refresh", AuthPolicy::default()).await;
        let account = provision(&h, "g@x.com", "Correct1pw").await;

        let issued = h.service.authenticate("g@x.com", "Correct1pw").await.unwrap();

        // A refresh token yields a fresh pair
        let refreshed = h.service.refresh_token(&issued.refresh_token).await.unwrap();
        let claims = h.tokens.verify(&refreshed.access_token).unwrap();
        assert_eq!(claims.sub, account.id);

        // An access token is the wrong kind
        let result = h.service.refresh_token(&issued.access_token).await;
        assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));

        // Garbage is invalid
        let result = h.service.refresh_token("garbage").await;
        assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));

        // An account locked after issuance cannot keep refreshing
        h.db.lock_account(&account.id, "operator action").await.unwrap();
        let result = h.service.refresh_token(&issued.refresh_token).await;
        assert!(matches!(result, Err(AuthError::AccountNotUsable)));
    }

    #[tokio::test]
    async fn test_change_password() {
        let h = harness("svc_change_password", AuthPolicy::default()).await;
        let account = provision(&h, "h@x.com", "Original1pw").await;

        // Wrong current password: rejected, password_changed_at untouched
        let result = h
            .service
            .change_password(&account.id, "Wrong1pw", "Replacement1", "Replacement1")
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        let loaded = h.db.find_account_by_id(&account.id).await.unwrap().unwrap();
        assert!(loaded.password_changed_at.is_none());

        // Mismatched confirmation
        let result = h
            .service
            .change_password(&account.id, "Original1pw", "Replacement1", "Other1")
            .await;
        assert!(matches!(result, Err(AuthError::PasswordMismatch)));

        // Unknown account
        let result = h
            .service
            .change_password("missing-id", "a1", "Replacement1", "Replacement1")
            .await;
        assert!(matches!(result, Err(AuthError::NotAuthenticated)));

        // Success: old credential dies, new one works
        assert!(
            h.service
                .change_password(&account.id, "Original1pw", "Replacement1", "Replacement1")
                .await
                .unwrap()
        );
        let loaded = h.db.find_account_by_id(&account.id).await.unwrap().unwrap();
        assert!(loaded.password_changed_at.is_some());
        assert!(matches!(
            h.service.authenticate("h@x.com", "Original1pw").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(h.service.authenticate("h@x.com", "Replacement1").await.is_ok());

        // Inactive accounts cannot change passwords
        h.db.set_account_status(&account.id, AccountStatus::Suspended)
            .await
            .unwrap();
        let result = h
            .service
            .change_password(&account.id, "Replacement1", "Another1pw", "Another1pw")
            .await;
        assert!(matches!(result, Err(AuthError::AccountInactive)));
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let h = harness("svc_reset", AuthPolicy::default()).await;
        provision(&h, "i@x.com", "Original1pw").await;

        // Unknown email: false, not an error
        assert!(!h.service.request_password_reset("nobody@x.com").await.unwrap());

        assert!(h.service.request_password_reset("i@x.com").await.unwrap());
        let token = h.mailer.last_reset_token();

        // An access token is not a reset token
        let issued = h.service.authenticate("i@x.com", "Original1pw").await.unwrap();
        let result = h
            .service
            .confirm_password_reset(&issued.access_token, "Replacement1")
            .await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));

        assert!(
            h.service
                .confirm_password_reset(&token, "Replacement1")
                .await
                .unwrap()
        );
        assert!(h.service.authenticate("i@x.com", "Replacement1").await.is_ok());
    }

    #[tokio::test]
    async fn test_resend_email_verification() {
        let h = harness("svc_resend", AuthPolicy::default()).await;

        assert!(!h.service.resend_email_verification("nobody@x.com").await.unwrap());

        h.service
            .register("j@x.com", "P@ssw0rd1", "P@ssw0rd1", None, None)
            .await
            .unwrap();
        assert!(h.service.resend_email_verification("j@x.com").await.unwrap());

        let token = h.mailer.last_verification_token();
        assert!(h.service.verify_email(&token).await.unwrap());

        // Already verified
        assert!(!h.service.resend_email_verification("j@x.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_permissions() {
        let h = harness("svc_permissions", AuthPolicy::default()).await;
        let user = provision(&h, "k@x.com", "Correct1pw").await;
        let root = h
            .db
            .insert_account(NewAccount::provisioned(
                "root@x.com".to_string(),
                password::hash_password("Correct1pw").unwrap(),
                Role::SuperAdmin,
                None,
            ))
            .await
            .unwrap();

        assert!(
            h.service
                .has_permission(&user.id, Permission::WriteContent)
                .await
                .unwrap()
        );
        assert!(
            !h.service
                .has_permission(&user.id, Permission::ManageUsers)
                .await
                .unwrap()
        );
        assert!(
            h.service
                .has_permission(&root.id, Permission::ManageUsers)
                .await
                .unwrap()
        );

        assert!(
            h.service
                .has_any_permission(&user.id, &[Permission::ManageUsers, Permission::ReadContent])
                .await
                .unwrap()
        );
        assert!(
            !h.service
                .has_all_permissions(&user.id, &[Permission::ManageUsers, Permission::ReadContent])
                .await
                .unwrap()
        );
        assert!(
            h.service
                .has_all_permissions(
                    &root.id,
                    &[Permission::ManageUsers, Permission::ManageSystem]
                )
                .await
                .unwrap()
        );

        let perms = h.service.get_user_permissions(&user.id).await.unwrap();
        assert_eq!(perms, permissions_for(Role::User).to_vec());
        assert!(h.service.get_user_permissions("missing-id").await.unwrap().is_empty());
        assert!(!h.service.has_permission("missing-id", Permission::ReadContent).await.unwrap());
    }

    #[tokio::test]
    async fn test_logout_is_best_effort() {
        let h = harness("svc_logout", AuthPolicy::default()).await;
        let account = provision(&h, "l@x.com", "Correct1pw").await;
        assert!(h.service.logout(&account.id).await.unwrap());
    }
}
