//! Busy-time bookkeeping for shops: time parsing, day books and per-date
//! schedules.

mod daybook;
mod time;

pub use daybook::{DayBook, ShopSchedule};
pub use time::{validate_range, TimeOfDay, TimeRange};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("Invalid time format '{0}'. Use hh:mm AM/PM")]
    InvalidTimeFormat(String),

    #[error("Invalid time range: {0}")]
    InvalidRange(String),

    #[error("Time slot {0} is already taken")]
    SlotTaken(String),

    #[error("Busy time entry {0} not found")]
    NotFound(String),
}
