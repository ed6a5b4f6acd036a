//! HTTP API layer for fedidir.
//!
//! - **Endpoints**: instance submission, reconciliation triggers, liveness
//! - **Response**: the `{"message", "type"}` envelope shared by every endpoint
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::AppState;
