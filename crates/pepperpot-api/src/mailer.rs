use async_trait::async_trait;
use tracing::info;

/// Outbound account email. Delivery is a deployment concern; the API only
/// needs to hand the token off.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification(&self, email: &str, name: Option<&str>, token: &str) -> anyhow::Result<()>;
    async fn send_password_reset(&self, email: &str, token: &str) -> anyhow::Result<()>;
}

/// Writes the links to the log instead of sending mail. Used in development
/// and whenever no transport is configured.
pub struct LogMailer {
    base_url: String,
}

impl LogMailer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_verification(&self, email: &str, name: Option<&str>, token: &str) -> anyhow::Result<()> {
        info!(
            to = %email,
            name = name.unwrap_or(""),
            "Verify email: {}/verify-email?token={}",
            self.base_url,
            token
        );
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, token: &str) -> anyhow::Result<()> {
        info!(to = %email, "Reset password: {}/reset-password?token={}", self.base_url, token);
        Ok(())
    }
}
