use async_trait::async_trait;
use tracing::debug;

/// Delivery seam for verification mail. Real delivery is not wired up; the
/// default implementation records the minted token at debug level, so the
/// gap stays visible in the logs instead of being papered over.
#[async_trait]
pub trait VerificationMailer: Send + Sync {
    async fn send_verification(&self, email: &str, token: &str) -> anyhow::Result<()>;
}

pub struct LogMailer;

#[async_trait]
impl VerificationMailer for LogMailer {
    async fn send_verification(&self, email: &str, token: &str) -> anyhow::Result<()> {
        debug!(email = %email, token = %token, "verification email delivery not implemented");
        Ok(())
    }
}
