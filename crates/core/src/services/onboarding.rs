//! Onboarding of newly submitted instances.
//!
//! A submission is probed and its administrator verified before anything is
//! written. Only then are the directory rows created and the challenge sent.

use fedidir_db::entities::PlatformFamily;
use serde::Deserialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use url::Url;
use validator::Validate;

use super::challenge::{ChallengeIssuer, VerificationFailure};
use super::directory::{CandidateInstance, CreateFailure, DirectoryService};
use super::messaging::{spawn_challenge_delivery, MessageSender};
use super::probe::{InstanceProber, ProbeFailure};

/// Returned to the submitter once the instance is recorded.
pub const SUBMISSION_ACCEPTED_MESSAGE: &str =
    "Added instance successfully, your instance admin account needs to be verified! Check your DMs!";

/// Longest hostname DNS allows.
const MAX_HOST_LEN: usize = 253;

/// Input for submitting an instance to the directory.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitCandidateInput {
    pub uri: String,
    #[serde(rename = "api_mode")]
    pub platform: String,
    #[serde(rename = "nsfwflag")]
    #[validate(length(max = 32))]
    pub nsfw_flag: String,
    #[serde(rename = "instance_contact", default)]
    #[validate(length(max = 128))]
    pub claimed_admin_handle: Option<String>,
    #[serde(rename = "type", default)]
    #[validate(length(max = 64))]
    pub category: Option<String>,
}

/// Why a submission was rejected. `Display` is the message shown to the submitter.
#[derive(Debug, Error)]
pub enum OnboardingError {
    #[error("invalid URI")]
    InvalidUri,

    #[error("failed to verify URI")]
    ProbeFailed(#[source] ProbeFailure),

    #[error("Administrator verification failed")]
    AdminVerificationFailed(#[source] VerificationFailure),

    #[error("Instance already exists")]
    Duplicate,

    #[error("{0}")]
    Invalid(String),
}

impl From<CreateFailure> for OnboardingError {
    fn from(failure: CreateFailure) -> Self {
        match failure {
            CreateFailure::Duplicate => Self::Duplicate,
            CreateFailure::Invalid(detail) => Self::Invalid(detail),
        }
    }
}

impl From<validator::ValidationErrors> for OnboardingError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Invalid(errors.to_string())
    }
}

/// A recorded submission whose challenge is being delivered.
#[derive(Debug)]
pub struct SubmissionAccepted {
    pub instance_id: String,
    pub uri: String,
    pub message: &'static str,
    /// Background delivery task. Dropping it detaches the task.
    pub delivery: JoinHandle<()>,
}

#[derive(Clone)]
pub struct OnboardingService {
    prober: InstanceProber,
    issuer: ChallengeIssuer,
    directory: DirectoryService,
    sender: MessageSender,
}

impl OnboardingService {
    #[must_use]
    pub fn new(
        prober: InstanceProber,
        issuer: ChallengeIssuer,
        directory: DirectoryService,
        sender: MessageSender,
    ) -> Self {
        Self {
            prober,
            issuer,
            directory,
            sender,
        }
    }

    /// Probe, verify and record a submitted instance, then send its challenge.
    pub async fn submit_candidate(
        &self,
        input: SubmitCandidateInput,
    ) -> Result<SubmissionAccepted, OnboardingError> {
        let address = normalize_uri(&input.uri)?;
        input.validate()?;

        let platform = PlatformFamily::from_tag(&input.platform).ok_or_else(|| {
            OnboardingError::ProbeFailed(ProbeFailure::UnsupportedPlatform(input.platform.clone()))
        })?;

        let snapshot = self
            .prober
            .probe_family(&address, platform)
            .await
            .map_err(|e| {
                info!(uri = %address, error = %e, "Submitted instance could not be probed");
                OnboardingError::ProbeFailed(e)
            })?;

        let credential = self.directory.mint_credential();
        let challenge = self
            .issuer
            .issue_challenge(
                &address,
                &snapshot,
                platform,
                input.claimed_admin_handle.as_deref(),
                &credential,
            )
            .await
            .map_err(|e| {
                warn!(uri = %address, error = %e, "Administrator verification failed");
                OnboardingError::AdminVerificationFailed(e)
            })?;

        let candidate = CandidateInstance {
            uri: address,
            platform,
            nsfw_flag: input.nsfw_flag,
            category: input.category,
        };
        let created = self
            .directory
            .create_instance(&candidate, &snapshot, &credential)
            .await?;

        let delivery = spawn_challenge_delivery(self.sender.clone(), challenge);

        Ok(SubmissionAccepted {
            instance_id: created.id,
            uri: created.uri,
            message: SUBMISSION_ACCEPTED_MESSAGE,
            delivery,
        })
    }
}

/// Reduce a submitted URI to a lower-cased `host[:port]`.
///
/// Schemes, paths, queries and credentials are rejected rather than stripped.
pub fn normalize_uri(raw: &str) -> Result<String, OnboardingError> {
    let candidate = raw.trim().to_ascii_lowercase();
    if candidate.is_empty()
        || candidate.len() > MAX_HOST_LEN
        || candidate
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '@' | '\\'))
    {
        return Err(OnboardingError::InvalidUri);
    }

    let parsed = Url::parse(&format!("https://{candidate}/")).map_err(|_| OnboardingError::InvalidUri)?;
    let host = parsed.host_str().ok_or(OnboardingError::InvalidUri)?;

    Ok(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}
