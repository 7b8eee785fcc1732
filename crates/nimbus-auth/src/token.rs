//! JWT token management

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use nimbus_db::Account;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AuthError;

/// Token kind carried in the `type` claim
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
    EmailVerification,
    PasswordReset,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
            TokenKind::EmailVerification => "email_verification",
            TokenKind::PasswordReset => "password_reset",
        }
    }
}

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (account ID)
    pub sub: String,
    /// Account email
    pub email: String,
    /// Account role
    pub role: String,
    /// Tenant scope, if any
    pub tenant_id: Option<String>,
    /// Token kind
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Per-kind token lifetimes, in seconds
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub verification_ttl_secs: i64,
    pub reset_ttl_secs: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_ttl_secs: 900,          // 15 minutes
            refresh_ttl_secs: 604_800,     // 7 days
            verification_ttl_secs: 86_400, // 24 hours
            reset_ttl_secs: 3_600,         // 1 hour
        }
    }
}

/// Token issuer: signs and validates the claim-set. Expiry is enforced via
/// the `exp` claim alone; account state is the guard's concern, not ours.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    config: TokenConfig,
}

impl TokenIssuer {
    /// Create a new token issuer from the shared signing secret
    pub fn new(secret: &str, config: TokenConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            config,
        }
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.config.access_ttl_secs
    }

    /// Sign a short-lived access token for an account
    pub fn sign_access(&self, account: &Account) -> Result<String, AuthError> {
        self.sign_for(account, TokenKind::Access)
    }

    /// Sign a long-lived refresh token for an account
    pub fn sign_refresh(&self, account: &Account) -> Result<String, AuthError> {
        self.sign_for(account, TokenKind::Refresh)
    }

    /// Sign an email-verification token for an account
    pub fn sign_email_verification(&self, account: &Account) -> Result<String, AuthError> {
        self.sign_for(account, TokenKind::EmailVerification)
    }

    /// Sign a password-reset token for an account
    pub fn sign_password_reset(&self, account: &Account) -> Result<String, AuthError> {
        self.sign_for(account, TokenKind::PasswordReset)
    }

    fn ttl_secs(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.config.access_ttl_secs,
            TokenKind::Refresh => self.config.refresh_ttl_secs,
            TokenKind::EmailVerification => self.config.verification_ttl_secs,
            TokenKind::PasswordReset => self.config.reset_ttl_secs,
        }
    }

    fn sign_for(&self, account: &Account, kind: TokenKind) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.ttl_secs(kind));

        let claims = Claims {
            sub: account.id.clone(),
            email: account.email.clone(),
            role: account.role.as_str().to_string(),
            tenant_id: account.tenant_id.clone(),
            kind,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        debug!(account_id = %account.id, kind = kind.as_str(), "Signing token");
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::default(), claims, &self.encoding_key).map_err(AuthError::Jwt)
    }

    /// Validate a token and return its claims.
    ///
    /// Expired, malformed, and bad-signature inputs all surface as the same
    /// InvalidToken to the caller; the distinction is only logged.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => {
                let code = match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => "token_expired",
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => "bad_signature",
                    _ => "malformed",
                };
                debug!(code, "Token validation failed");
                Err(AuthError::InvalidToken)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_db::{AccountStatus, Role, VerificationStatus};

    fn test_account() -> Account {
        let now = Utc::now();
        Account {
            id: "acct-1".to_string(),
            email: "test@example.com".to_string(),
            password_hash: "hash".to_string(),
            password_changed_at: None,
            status: AccountStatus::Active,
            email_verification_status: VerificationStatus::Verified,
            role: Role::Moderator,
            tenant_id: Some("acme".to_string()),
            failed_login_attempts: 0,
            last_failed_login_at: None,
            locked_at: None,
            lock_reason: None,
            last_login_at: None,
            is_active: true,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret-key", TokenConfig::default())
    }

    #[test]
    fn test_access_token_round_trip() {
        let issuer = issuer();
        let token = issuer.sign_access(&test_account()).unwrap();
        let claims = issuer.verify(&token).unwrap();

        assert_eq!(claims.sub, "acct-1");
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.role, "moderator");
        assert_eq!(claims.tenant_id.as_deref(), Some("acme"));
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_refresh_token_round_trip() {
        let issuer = issuer();
        let token = issuer.sign_refresh(&test_account()).unwrap();
        let claims = issuer.verify(&token).unwrap();

        assert_eq!(claims.kind, TokenKind::Refresh);
        assert_eq!(claims.exp - claims.iat, 604_800);
    }

    #[test]
    fn test_invalid_token() {
        let result = issuer().verify("invalid-token");
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_tampered_token() {
        let issuer = issuer();
        let mut token = issuer.sign_access(&test_account()).unwrap();
        token.push('x');
        assert!(matches!(
            issuer.verify(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_wrong_secret() {
        let token = issuer().sign_access(&test_account()).unwrap();
        let other = TokenIssuer::new("different-secret", TokenConfig::default());
        assert!(matches!(other.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token() {
        let issuer = issuer();
        let now = Utc::now();
        let claims = Claims {
            sub: "acct-1".to_string(),
            email: "test@example.com".to_string(),
            role: "user".to_string(),
            tenant_id: None,
            kind: TokenKind::Access,
            iat: now.timestamp() - 1_000,
            exp: now.timestamp() - 100,
        };
        let token = issuer.sign(&claims).unwrap();
        assert!(matches!(
            issuer.verify(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_verification_and_reset_kinds() {
        let issuer = issuer();
        let account = test_account();

        let verification = issuer.sign_email_verification(&account).unwrap();
        assert_eq!(
            issuer.verify(&verification).unwrap().kind,
            TokenKind::EmailVerification
        );

        let reset = issuer.sign_password_reset(&account).unwrap();
        let claims = issuer.verify(&reset).unwrap();
        assert_eq!(claims.kind, TokenKind::PasswordReset);
        assert_eq!(claims.exp - claims.iat, 3_600);
    }
}
