//! Background scheduling for fedidir.
//!
//! - **Scheduler**: periodic reconciliation sweeps over the directory

pub mod scheduler;

pub use scheduler::{run_scheduler, JobExecutor, ScheduledJob, SchedulerConfig};
