use async_trait::async_trait;
use tracing::info;

/// Out-of-band delivery channel for password-reset links. The core only
/// produces the link; how it reaches the user is someone else's problem.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, to: &str, reset_url: &str) -> anyhow::Result<()>;
}

/// Writes outgoing mail to the log. Stands in for a real delivery channel
/// in development.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, to: &str, reset_url: &str) -> anyhow::Result<()> {
        info!(%to, %reset_url, "password reset link issued");
        Ok(())
    }
}
