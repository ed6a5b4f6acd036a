//! Common utilities and shared types for fedidir.
//!
//! This crate provides foundational components used across all fedidir crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based identifiers and access tokens via [`IdGenerator`]
//!
//! # Example
//!
//! ```no_run
//! use fedidir_common::{AppResult, Config, IdGenerator};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!     let id_gen = IdGenerator::new();
//!     println!("Generated ID: {}", id_gen.generate());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
