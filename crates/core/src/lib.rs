//! Onboarding and health reconciliation for the fedidir instance directory.

pub mod services;

pub use services::*;
