//! Outbound notification transports
//!
//! Transport-level delivery is an external concern; the orchestrator only
//! sees this trait. The stub implementation logs the send and succeeds,
//! matching the development transports of the original deployment.

use async_trait::async_trait;

/// Medium-specific outbound send operations.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send_email(&self, recipient: &str, message: &str) -> anyhow::Result<()>;
    async fn send_sms(&self, recipient: &str, message: &str) -> anyhow::Result<()>;
    async fn send_push(&self, recipient: &str, message: &str) -> anyhow::Result<()>;
    async fn send_telegram(&self, recipient: &str, message: &str) -> anyhow::Result<()>;
}

/// Gateway that logs instead of sending.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubGateway;

#[async_trait]
impl NotificationGateway for StubGateway {
    async fn send_email(&self, recipient: &str, message: &str) -> anyhow::Result<()> {
        tracing::info!(recipient, message, "sending email");
        Ok(())
    }

    async fn send_sms(&self, recipient: &str, message: &str) -> anyhow::Result<()> {
        tracing::info!(recipient, message, "sending SMS");
        Ok(())
    }

    async fn send_push(&self, recipient: &str, message: &str) -> anyhow::Result<()> {
        tracing::info!(recipient, message, "sending push notification");
        Ok(())
    }

    async fn send_telegram(&self, recipient: &str, message: &str) -> anyhow::Result<()> {
        tracing::info!(recipient, message, "sending telegram message");
        Ok(())
    }
}
