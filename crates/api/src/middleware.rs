//! Shared application state.

#![allow(missing_docs)]

use fedidir_core::{OnboardingService, ReconciliationService};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub onboarding_service: OnboardingService,
    pub reconciliation_service: ReconciliationService,
}
