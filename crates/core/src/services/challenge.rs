//! Administrator ownership verification and challenge composition.

use std::sync::Arc;

use fedidir_db::entities::PlatformFamily;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use super::probe::{decode, InstanceSnapshot, ProbeFailure, RemoteInstanceClient};

/// A direct message to deliver to the instance administrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeRecord {
    /// Fully qualified recipient, `user@domain`.
    pub recipient: String,
    /// Message text, addressed with a leading mention.
    pub body: String,
}

/// Why ownership could not be established.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationFailure {
    #[error("the claimed account is not an administrator")]
    AdminCheckFailed,

    #[error("no administrator handle was supplied")]
    MissingAdminHandle,

    #[error("administrator lookup failed: {0}")]
    Unreachable(#[from] ProbeFailure),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MisskeyUser {
    #[serde(default)]
    is_admin: bool,
}

/// Issues verification challenges for newly submitted instances.
#[derive(Clone)]
pub struct ChallengeIssuer {
    client: Arc<dyn RemoteInstanceClient>,
    directory_name: String,
    verify_url_base: String,
}

impl ChallengeIssuer {
    #[must_use]
    pub fn new(
        client: Arc<dyn RemoteInstanceClient>,
        directory_name: impl Into<String>,
        verify_url_base: impl Into<String>,
    ) -> Self {
        Self {
            client,
            directory_name: directory_name.into(),
            verify_url_base: verify_url_base.into(),
        }
    }

    /// Establish who administers `address` and compose the challenge for them.
    ///
    /// Mastodon-family snapshots already name the contact account. Misskey has
    /// no such field, so the claimed handle must be confirmed as a local admin.
    pub async fn issue_challenge(
        &self,
        address: &str,
        snapshot: &InstanceSnapshot,
        platform: PlatformFamily,
        claimed_admin_handle: Option<&str>,
        credential: &str,
    ) -> Result<ChallengeRecord, VerificationFailure> {
        let handle = match platform {
            PlatformFamily::Mastodon => snapshot.contact_handle.clone(),
            PlatformFamily::Misskey => {
                let handle = claimed_admin_handle
                    .and_then(local_part)
                    .ok_or(VerificationFailure::MissingAdminHandle)?;
                self.verify_misskey_admin(address, &handle).await?;
                handle
            }
        };

        Ok(self.compose(address, &handle, credential))
    }

    async fn verify_misskey_admin(&self, address: &str, handle: &str) -> Result<(), VerificationFailure> {
        let url = format!("https://{address}/api/users/search");
        let query = json!({
            "query": handle,
            "limit": 1,
            "origin": "local",
            "detail": true,
        });

        let body = self.client.post_json(&url, &query).await?;
        let users: Vec<MisskeyUser> = decode(&url, body)?;

        if users.first().is_some_and(|u| u.is_admin) {
            info!(address, handle, "Administrator verification passed");
            Ok(())
        } else {
            debug!(address, handle, "Claimed handle is not an administrator");
            Err(VerificationFailure::AdminCheckFailed)
        }
    }

    fn compose(&self, address: &str, handle: &str, credential: &str) -> ChallengeRecord {
        let body = format!(
            "@{handle}@{address} Hi there someone is attempting to register your instance on {}, \
             if this is you. Please click this link to finish the registration: {}{credential}",
            self.directory_name, self.verify_url_base
        );

        ChallengeRecord {
            recipient: format!("{handle}@{address}"),
            body,
        }
    }
}

/// `@root`, `root` and `root@host` all name the local user `root`.
fn local_part(handle: &str) -> Option<String> {
    let user = handle.trim().trim_start_matches('@').split('@').next()?;
    if user.is_empty() {
        None
    } else {
        Some(user.to_string())
    }
}
