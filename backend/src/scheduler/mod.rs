//! Training schedule generation.
//!
//! [`recurrence`] expands a weekly slot definition into dated sessions. It is
//! a pure function of its inputs and has no knowledge of storage or HTTP.

pub mod recurrence;

pub use recurrence::{
    expand, expand_with, months_from, parse_start_date, try_expand, ScheduleDefinition,
    ScheduleError, Session, SlotTime, WeeklySlot, WindowBound, MAX_DURATION_MONTHS,
};
