//! Direct-message delivery of verification challenges.
//!
//! Delivery is fire-and-forget: the onboarding response never waits for it,
//! and failures are reported on the `dead_letter` log target.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fedidir_common::{AppError, AppResult};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::challenge::ChallengeRecord;

/// Sends a direct message from the directory's own account.
#[async_trait]
pub trait DirectMessageSender: Send + Sync {
    /// Deliver `body` privately to `recipient` (`user@domain`).
    async fn send_direct(&self, recipient: &str, body: &str) -> AppResult<()>;
}

/// Shared handle to a [`DirectMessageSender`].
pub type MessageSender = Arc<dyn DirectMessageSender>;

/// Posts direct-visibility statuses through a Mastodon-compatible API.
#[derive(Clone)]
pub struct MastodonMessenger {
    client: reqwest::Client,
    statuses_url: String,
    access_token: String,
}

impl MastodonMessenger {
    pub fn new(base_url: &str, access_token: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            statuses_url: format!("{}/api/v1/statuses", base_url.trim_end_matches('/')),
            access_token: access_token.into(),
        })
    }
}

#[async_trait]
impl DirectMessageSender for MastodonMessenger {
    async fn send_direct(&self, recipient: &str, body: &str) -> AppResult<()> {
        let response = self
            .client
            .post(&self.statuses_url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "status": body, "visibility": "direct" }))
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Status post failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ExternalService(format!(
                "Status post to {recipient} rejected with {status}"
            )));
        }

        Ok(())
    }
}

/// Sender used when no messaging account is configured.
#[derive(Clone, Default)]
pub struct NoOpMessenger;

#[async_trait]
impl DirectMessageSender for NoOpMessenger {
    async fn send_direct(&self, _recipient: &str, _body: &str) -> AppResult<()> {
        Ok(())
    }
}

/// Deliver a challenge in the background.
///
/// The returned handle may be dropped; the task keeps running detached.
pub fn spawn_challenge_delivery(sender: MessageSender, challenge: ChallengeRecord) -> JoinHandle<()> {
    tokio::spawn(async move {
        match sender.send_direct(&challenge.recipient, &challenge.body).await {
            Ok(()) => info!(recipient = %challenge.recipient, "Verification challenge delivered"),
            Err(e) => error!(
                target: "dead_letter",
                recipient = %challenge.recipient,
                error = %e,
                "Verification challenge could not be delivered"
            ),
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::test_support::RecordingSender;

    fn challenge() -> ChallengeRecord {
        ChallengeRecord {
            recipient: "admin@example.social".to_string(),
            body: "@admin@example.social hello".to_string(),
        }
    }

    #[tokio::test]
    async fn test_spawned_delivery_sends_once() {
        let sender = Arc::new(RecordingSender::new());

        spawn_challenge_delivery(sender.clone(), challenge()).await.unwrap();

        assert_eq!(
            sender.sent(),
            vec![(
                "admin@example.social".to_string(),
                "@admin@example.social hello".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_failed_delivery_does_not_panic() {
        let sender = Arc::new(RecordingSender::failing());

        let joined = spawn_challenge_delivery(sender.clone(), challenge()).await;

        assert!(joined.is_ok());
        assert_eq!(sender.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_noop_messenger() {
        assert!(NoOpMessenger.send_direct("a@b", "c").await.is_ok());
    }

    #[test]
    fn test_statuses_url_trims_trailing_slash() {
        let messenger =
            MastodonMessenger::new("https://bot.example/", "token", Duration::from_secs(5)).unwrap();
        assert_eq!(messenger.statuses_url, "https://bot.example/api/v1/statuses");
    }
}
