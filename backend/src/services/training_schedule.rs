//! Turns a training-schedule request document into a stored one.
//!
//! The request carries `startFromDate`, `schedule` (the weekly definition) and
//! `duration` (months). Before storage, `schedule` is replaced by the expanded
//! sessions and the raw definition is kept under `scheduleDOW`.

use serde_json::Value;
use tracing::debug;

use crate::models::Document;
use crate::scheduler::{parse_start_date, try_expand, ScheduleDefinition, ScheduleError, WindowBound};

pub const START_FIELD: &str = "startFromDate";
pub const SCHEDULE_FIELD: &str = "schedule";
pub const DURATION_FIELD: &str = "duration";
pub const SCHEDULE_DOW_FIELD: &str = "scheduleDOW";

fn required<'a>(document: &'a Document, field: &'static str) -> Result<&'a Value, ScheduleError> {
    document.get(field).ok_or(ScheduleError::MissingField(field))
}

/// Month count from a JSON integer or a numeric string.
pub fn duration_months(value: &Value) -> Result<i64, ScheduleError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| ScheduleError::InvalidDuration(n.to_string())),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| ScheduleError::InvalidDuration(s.clone())),
        other => Err(ScheduleError::InvalidDuration(other.to_string())),
    }
}

/// Expand the document's weekly definition and write `schedule` and
/// `scheduleDOW` back into it.
pub fn attach_sessions(document: &mut Document, bound: WindowBound) -> Result<(), ScheduleError> {
    let start = match required(document, START_FIELD)? {
        Value::String(s) => parse_start_date(s)?,
        Value::Null => return Err(ScheduleError::MissingField(START_FIELD)),
        other => return Err(ScheduleError::InvalidStartDate(other.to_string())),
    };
    let raw_definition = required(document, SCHEDULE_FIELD)?.clone();
    let definition = ScheduleDefinition::from_json(&raw_definition)?;
    let months = duration_months(required(document, DURATION_FIELD)?)?;

    let sessions = try_expand(start, &definition, months, bound)?;
    debug!(
        slots = definition.len(),
        months,
        sessions = sessions.len(),
        "Expanded training schedule"
    );

    let sessions =
        serde_json::to_value(&sessions).map_err(|e| ScheduleError::Malformed(e.to_string()))?;
    document.insert(SCHEDULE_FIELD.to_string(), sessions);
    document.insert(SCHEDULE_DOW_FIELD.to_string(), raw_definition);
    Ok(())
}
