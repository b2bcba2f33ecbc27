//! Background schedulers

pub mod error;
pub mod event_flush_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use event_flush_scheduler::EventFlushScheduler;
