//! Outbound mail seam
//!
//! Delivery is not this crate's concern; the service only hands a recipient
//! and a signed token to whatever sits behind this trait.

use async_trait::async_trait;
use tracing::info;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email_verification(&self, email: &str, token: &str);
    async fn send_password_reset(&self, email: &str, token: &str);
}

/// Default mailer: records that a message was queued. Token material is
/// never logged.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_email_verification(&self, email: &str, _token: &str) {
        info!(email = %email, "Queued email-verification message");
    }

    async fn send_password_reset(&self, email: &str, _token: &str) {
        info!(email = %email, "Queued password-reset message");
    }
}
