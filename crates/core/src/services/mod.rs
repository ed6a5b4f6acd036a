//! Business logic services.

#![allow(missing_docs)]

pub mod challenge;
pub mod directory;
pub mod health;
pub mod messaging;
pub mod onboarding;
pub mod probe;
pub mod reconciliation;

#[cfg(test)]
pub(crate) mod test_support;

pub use challenge::{ChallengeIssuer, ChallengeRecord, VerificationFailure};
pub use directory::{CandidateInstance, CreateFailure, DirectoryService, UpdateFailure};
pub use health::{HealthState, HealthUpdate, HEALTH_BAN_REASON, MAX_FAILED_CHECKS};
pub use messaging::{
    spawn_challenge_delivery, DirectMessageSender, MastodonMessenger, MessageSender, NoOpMessenger,
};
pub use onboarding::{
    normalize_uri, OnboardingError, OnboardingService, SubmissionAccepted, SubmitCandidateInput,
    SUBMISSION_ACCEPTED_MESSAGE,
};
pub use probe::{
    HttpInstanceClient, InstanceProber, InstanceSnapshot, ProbeFailure, RemoteInstanceClient,
    CONTACT_UNKNOWN,
};
pub use reconciliation::{ReconciliationService, SweepError, SweepReport, SweepScope};
