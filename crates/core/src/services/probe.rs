//! Platform adapter: fetches instance metadata and normalizes it.
//!
//! Mastodon-family servers expose everything through `GET /api/v1/instance`.
//! Misskey-family servers split it across `POST /api/meta` and `POST /api/stats`.
//! Both shapes are decoded into explicit structs and folded into one
//! [`InstanceSnapshot`]; anything missing or malformed fails the whole probe.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fedidir_db::entities::PlatformFamily;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

/// Contact handle recorded when the platform does not expose an administrator.
pub const CONTACT_UNKNOWN: &str = "null";

/// Normalized metadata from one successful probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSnapshot {
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub user_count: u64,
    pub status_count: u64,
    pub contact_handle: String,
    pub registrations_open: bool,
    pub approval_required: bool,
}

/// Why a probe produced no snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
}

/// JSON transport to remote instances.
#[async_trait]
pub trait RemoteInstanceClient: Send + Sync {
    /// `GET` a URL and parse the body as JSON.
    async fn get_json(&self, url: &str) -> Result<Value, ProbeFailure>;

    /// `POST` a JSON body to a URL and parse the response as JSON.
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, ProbeFailure>;
}

/// `reqwest`-backed [`RemoteInstanceClient`].
#[derive(Clone)]
pub struct HttpInstanceClient {
    client: reqwest::Client,
}

impl HttpInstanceClient {
    /// Create a client whose requests each time out after `timeout`.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }

    async fn read_json(url: &str, response: reqwest::Response) -> Result<Value, ProbeFailure> {
        let status = response.status();
        if !status.is_success() {
            return Err(ProbeFailure::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<Value>().await.map_err(|e| ProbeFailure::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

fn network_failure(url: &str, err: &reqwest::Error) -> ProbeFailure {
    ProbeFailure::Network {
        url: url.to_string(),
        reason: err.to_string(),
    }
}

#[async_trait]
impl RemoteInstanceClient for HttpInstanceClient {
    async fn get_json(&self, url: &str) -> Result<Value, ProbeFailure> {
        let response = self
            .client
            .get(url)
            .header("Content-Type", "application/json;charset=UTF-8")
            .send()
            .await
            .map_err(|e| network_failure(url, &e))?;

        Self::read_json(url, response).await
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, ProbeFailure> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json;charset=UTF-8")
            .json(body)
            .send()
            .await
            .map_err(|e| network_failure(url, &e))?;

        Self::read_json(url, response).await
    }
}

#[derive(Deserialize)]
struct MastodonInstance {
    title: String,
    #[serde(default)]
    short_description: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    stats: MastodonStats,
    contact_account: MastodonAccount,
    registrations: bool,
    approval_required: bool,
}

#[derive(Deserialize)]
struct MastodonStats {
    user_count: u64,
    status_count: u64,
}

#[derive(Deserialize)]
struct MastodonAccount {
    username: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MisskeyMeta {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    banner_url: Option<String>,
    disable_registration: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MisskeyStats {
    original_users_count: u64,
    notes_count: u64,
}

pub(crate) fn decode<T: DeserializeOwned>(url: &str, value: Value) -> Result<T, ProbeFailure> {
    serde_json::from_value(value).map_err(|e| ProbeFailure::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Probes remote instances and produces [`InstanceSnapshot`]s.
#[derive(Clone)]
pub struct InstanceProber {
    client: Arc<dyn RemoteInstanceClient>,
    deadline: Duration,
}

impl InstanceProber {
    /// Create a prober. A probe running longer than `deadline` is abandoned.
    #[must_use]
    pub fn new(client: Arc<dyn RemoteInstanceClient>, deadline: Duration) -> Self {
        Self { client, deadline }
    }

    /// Probe `address` using a submitted platform tag.
    ///
    /// Unknown tags fail immediately without contacting the instance.
    pub async fn probe(&self, address: &str, platform: &str) -> Result<InstanceSnapshot, ProbeFailure> {
        let family = PlatformFamily::from_tag(platform)
            .ok_or_else(|| ProbeFailure::UnsupportedPlatform(platform.to_string()))?;
        self.probe_family(address, family).await
    }

    /// Probe `address` as an instance of `family`.
    pub async fn probe_family(
        &self,
        address: &str,
        family: PlatformFamily,
    ) -> Result<InstanceSnapshot, ProbeFailure> {
        let probe = async {
            match family {
                PlatformFamily::Mastodon => self.probe_mastodon(address).await,
                PlatformFamily::Misskey => self.probe_misskey(address).await,
            }
        };

        let result = tokio::time::timeout(self.deadline, probe)
            .await
            .map_err(|_| ProbeFailure::Timeout(self.deadline))?;

        match &result {
            Ok(_) => debug!(address, platform = %family, "Probe succeeded"),
            Err(e) => debug!(address, platform = %family, error = %e, "Probe failed"),
        }
        result
    }

    async fn probe_mastodon(&self, address: &str) -> Result<InstanceSnapshot, ProbeFailure> {
        let url = format!("https://{address}/api/v1/instance");
        let body = self.client.get_json(&url).await?;
        let info: MastodonInstance = decode(&url, body)?;

        // Pleroma-family servers omit short_description.
        let description = info
            .short_description
            .or(info.description)
            .ok_or_else(|| ProbeFailure::Decode {
                url: url.clone(),
                reason: "missing field `short_description` and `description`".to_string(),
            })?;

        Ok(InstanceSnapshot {
            title: info.title,
            description,
            thumbnail_url: info.thumbnail,
            user_count: info.stats.user_count,
            status_count: info.stats.status_count,
            contact_handle: info.contact_account.username,
            registrations_open: info.registrations,
            approval_required: info.approval_required,
        })
    }

    async fn probe_misskey(&self, address: &str) -> Result<InstanceSnapshot, ProbeFailure> {
        let meta_url = format!("https://{address}/api/meta");
        let stats_url = format!("https://{address}/api/stats");
        let detail = json!({ "detail": true });

        let (meta, stats) = tokio::try_join!(
            self.client.post_json(&meta_url, &detail),
            self.client.post_json(&stats_url, &detail),
        )?;
        let meta: MisskeyMeta = decode(&meta_url, meta)?;
        let stats: MisskeyStats = decode(&stats_url, stats)?;

        Ok(InstanceSnapshot {
            title: meta.name,
            description: meta.description.unwrap_or_default(),
            thumbnail_url: meta.banner_url,
            user_count: stats.original_users_count,
            status_count: stats.notes_count,
            contact_handle: CONTACT_UNKNOWN.to_string(),
            registrations_open: !meta.disable_registration,
            approval_required: false,
        })
    }
}
