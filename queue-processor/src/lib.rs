//! Queue-driven calendar synchronization.
//!
//! Producers write a record hash into the store and queue its key in
//! `to-process` or `to-delete`. The [`Processor`] polls those sets, runs one
//! bounded-time job per key against the remote calendar, and leaves every key
//! in `processed` or `failed` (or removed, for deletions) when it is done.

pub mod calendar;
pub mod config;
pub mod error;
pub mod job;
pub mod logs;
pub mod processor;
pub mod store;
pub mod sweeper;

#[cfg(test)]
mod testing;

pub use calendar::{CalendarApi, CalendarEvent, GoogleCalendar};
pub use config::{Cli, ProcessorConfig};
pub use error::JobError;
pub use job::{InFlight, Intent, JobContext};
pub use logs::JobLog;
pub use processor::Processor;
pub use store::{Batch, RedisStore, Store};
pub use sweeper::{SweepReport, Sweeper};
