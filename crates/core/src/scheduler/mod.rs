//! One-shot wall-clock scheduler.
//!
//! A schedule is armed for an instant strictly in the future and fires its
//! callback exactly once, unless cancelled first. Remaining time is always
//! re-derived from the wall clock and published on a `watch` channel for
//! countdown displays.

mod timer;
mod types;

pub use timer::{FireCallback, ScheduleHandle, Scheduler};
pub use types::{format_countdown, remaining_until, SchedulePhase, SchedulerError};
