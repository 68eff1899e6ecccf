//! Core domain types for the dead job monitor.
//!
//! This crate contains shared types used across all packages:
//! - JobRecord, JobStatus and JobMessage for tracked work
//! - Clock implementations for stamping and comparing times
//! - Events for observers of the monitor

mod clock;
mod events;
mod job;

pub use clock::{Clock, FixedClock, JobClock, ManualClock, SystemClock};
pub use events::MonitorEvent;
pub use job::{JobId, JobMessage, JobRecord, JobStatus, Level};
