//! Weekly recurrence expansion for training schedules.
//!
//! A trainer describes a recurring plan as a list of weekly slots (weekday,
//! time of day, exercise payload). [`expand`] turns that description into the
//! concrete, calendar-dated sessions it implies for a number of months.
//!
//! # Weekday convention
//!
//! A slot's `dayOfWeek` is offset by one into a Sunday-based week
//! (0 = Sunday .. 6 = Saturday), and the value 7 rolls over to the Sunday that
//! closes the week. In practice:
//!
//! | `dayOfWeek` | 0   | 1   | 2   | 3   | 4   | 5   | 6   |
//! |-------------|-----|-----|-----|-----|-----|-----|-----|
//! | weekday     | Mon | Tue | Wed | Thu | Fri | Sat | Sun |
//!
//! The week used for alignment is the Sunday-started week containing the
//! anchor, so a Sunday anchor aligns slot 6 to the *next* Sunday.
//!
//! # Generation window
//!
//! Each month iteration emits weekly occurrences from the anchor up to a
//! window end chosen by [`WindowBound`].

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike,
};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Output format of [`Session::date`].
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Longest accepted duration, in months (ten years).
pub const MAX_DURATION_MONTHS: u32 = 120;

/// Errors raised while validating a schedule definition or its inputs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("slot {slot}: time '{value}' is not a valid HH:MM time of day")]
    InvalidTime { slot: usize, value: String },

    #[error("slot {slot}: day of week {value} is outside 0..=6")]
    InvalidDayOfWeek { slot: usize, value: i64 },

    #[error("duration must not be negative (got {0})")]
    NegativeDuration(i64),

    #[error("duration of {value} months exceeds the limit of {max}")]
    DurationTooLong { value: i64, max: u32 },

    #[error("duration '{0}' is not a whole number of months")]
    InvalidDuration(String),

    #[error("start date '{0}' is not a recognised date")]
    InvalidStartDate(String),

    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("malformed schedule definition: {0}")]
    Malformed(String),
}

/// Upper bound of the window a month iteration generates sessions in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowBound {
    /// Each iteration covers one month from its anchor.
    #[default]
    SingleMonth,
    /// Each iteration covers the whole requested duration from its anchor.
    /// Later iterations overlap earlier ones and only de-duplication keeps the
    /// output unique; this reproduces the legacy schedule documents.
    TotalSpan,
}

impl WindowBound {
    fn months(self, requested: u32) -> u32 {
        match self {
            WindowBound::SingleMonth => 1,
            WindowBound::TotalSpan => requested,
        }
    }
}

impl FromStr for WindowBound {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single-month" | "single_month" | "month" => Ok(Self::SingleMonth),
            "total-span" | "total_span" | "total" | "legacy" => Ok(Self::TotalSpan),
            other => Err(format!("Unknown schedule window: {}", other)),
        }
    }
}

/// Wall-clock time of a slot, minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotTime {
    hour: u32,
    minute: u32,
}

impl SlotTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    /// Parse strict `HH:MM` (two digits each).
    pub fn parse(value: &str) -> Option<Self> {
        let (hour, minute) = value.split_once(':')?;
        if hour.len() != 2 || minute.len() != 2 {
            return None;
        }
        if !hour.bytes().chain(minute.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }
        Self::new(hour.parse().ok()?, minute.parse().ok()?)
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        SlotTime::parse(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid HH:MM time '{}'", raw)))
    }
}

/// One weekly occurrence definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySlot {
    day_of_week: u8,
    time: SlotTime,
    exercises: Value,
}

impl WeeklySlot {
    /// Build a validated slot. `slot` is the position used in error messages.
    pub fn new(
        slot: usize,
        day_of_week: i64,
        time: &str,
        exercises: Value,
    ) -> Result<Self, ScheduleError> {
        let day_of_week = u8::try_from(day_of_week)
            .ok()
            .filter(|d| *d <= 6)
            .ok_or(ScheduleError::InvalidDayOfWeek {
                slot,
                value: day_of_week,
            })?;
        let time = SlotTime::parse(time).ok_or_else(|| ScheduleError::InvalidTime {
            slot,
            value: time.to_string(),
        })?;

        Ok(Self {
            day_of_week,
            time,
            exercises,
        })
    }

    pub fn day_of_week(&self) -> u8 {
        self.day_of_week
    }

    pub fn time(&self) -> SlotTime {
        self.time
    }

    pub fn exercises(&self) -> &Value {
        &self.exercises
    }

    /// Move `anchor` onto this slot's weekday and time of day.
    ///
    /// Seconds and sub-seconds of the anchor are kept.
    fn align(&self, anchor: NaiveDateTime) -> Option<NaiveDateTime> {
        let target = i64::from(self.day_of_week) + 1;
        let current = i64::from(anchor.weekday().num_days_from_sunday());
        anchor
            .checked_add_signed(Duration::days(target - current))?
            .with_hour(self.time.hour)?
            .with_minute(self.time.minute)
    }
}

/// Ordered list of weekly slots; definition order is iteration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleDefinition {
    slots: Vec<WeeklySlot>,
}

impl ScheduleDefinition {
    pub fn new(slots: Vec<WeeklySlot>) -> Self {
        Self { slots }
    }

    pub fn slots(&self) -> &[WeeklySlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Parse the per-day definition sent by clients.
    ///
    /// Two shapes are accepted:
    /// - an object keyed by day index, `{"0": {"time": "08:00", "exercises": ..}}`,
    ///   iterated in ascending numeric key order;
    /// - an array of `{"dayOfWeek", "time", "exercises"}` objects, iterated in
    ///   array order.
    ///
    /// `null` is an empty definition.
    pub fn from_json(value: &Value) -> Result<Self, ScheduleError> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => {
                let mut keyed = map
                    .iter()
                    .map(|(key, entry)| {
                        key.trim()
                            .parse::<i64>()
                            .map(|day| (day, entry))
                            .map_err(|_| {
                                ScheduleError::Malformed(format!(
                                    "key '{}' is not a day index",
                                    key
                                ))
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                keyed.sort_by_key(|(day, _)| *day);

                let slots = keyed
                    .into_iter()
                    .enumerate()
                    .map(|(slot, (day, entry))| slot_from_entry(slot, Some(day), entry))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::new(slots))
            }
            Value::Array(entries) => {
                let slots = entries
                    .iter()
                    .enumerate()
                    .map(|(slot, entry)| slot_from_entry(slot, None, entry))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::new(slots))
            }
            other => Err(ScheduleError::Malformed(format!(
                "expected an object or array, got {}",
                json_kind(other)
            ))),
        }
    }
}

impl Serialize for ScheduleDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.slots.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ScheduleDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ScheduleDefinition::from_json(&value).map_err(de::Error::custom)
    }
}

fn slot_from_entry(
    slot: usize,
    keyed_day: Option<i64>,
    entry: &Value,
) -> Result<WeeklySlot, ScheduleError> {
    let fields = entry.as_object().ok_or_else(|| {
        ScheduleError::Malformed(format!("slot {} is {}, not an object", slot, json_kind(entry)))
    })?;

    let day = match keyed_day {
        Some(day) => day,
        None => match fields.get("dayOfWeek") {
            Some(Value::Number(n)) => n.as_i64().ok_or_else(|| {
                ScheduleError::Malformed(format!("slot {}: dayOfWeek {} is not an integer", slot, n))
            })?,
            Some(Value::String(s)) => s.trim().parse().map_err(|_| {
                ScheduleError::Malformed(format!("slot {}: dayOfWeek '{}' is not an integer", slot, s))
            })?,
            _ => {
                return Err(ScheduleError::Malformed(format!(
                    "slot {} has no dayOfWeek",
                    slot
                )))
            }
        },
    };

    let time = match fields.get("time") {
        Some(Value::String(s)) => s.as_str(),
        Some(other) => {
            return Err(ScheduleError::InvalidTime {
                slot,
                value: other.to_string(),
            })
        }
        None => {
            return Err(ScheduleError::InvalidTime {
                slot,
                value: String::new(),
            })
        }
    };

    let exercises = fields.get("exercises").cloned().unwrap_or(Value::Null);
    WeeklySlot::new(slot, day, time, exercises)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One concrete, dated occurrence of a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
    /// Serialized as `HH:mm`.
    pub time: SlotTime,
    pub exercises: Value,
}

/// Parse a client supplied start date.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS[.fff]]` and RFC 3339 with an
/// offset. For offset timestamps the wall-clock time in that offset is used.
pub fn parse_start_date(value: &str) -> Result<NaiveDateTime, ScheduleError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(|d| d.and_time(NaiveTime::MIN))
        .map_err(|_| ScheduleError::InvalidStartDate(value.to_string()))
}

/// Convert a signed month count, rejecting negative values and anything
/// above [`MAX_DURATION_MONTHS`].
pub fn months_from(value: i64) -> Result<u32, ScheduleError> {
    if value < 0 {
        return Err(ScheduleError::NegativeDuration(value));
    }
    match u32::try_from(value) {
        Ok(months) if months <= MAX_DURATION_MONTHS => Ok(months),
        _ => Err(ScheduleError::DurationTooLong {
            value,
            max: MAX_DURATION_MONTHS,
        }),
    }
}

/// Expand `schedule` over `months` month iterations starting at `start`,
/// bounding each iteration to one month.
pub fn expand(start: NaiveDateTime, schedule: &ScheduleDefinition, months: u32) -> Vec<Session> {
    expand_with(start, schedule, months, WindowBound::default())
}

/// Expand `schedule` with an explicit window bound.
///
/// Sessions are returned in append order: slot-major within a month
/// iteration, weekly-ascending within a slot. No two sessions share a
/// `(date, time)` pair.
pub fn expand_with(
    start: NaiveDateTime,
    schedule: &ScheduleDefinition,
    months: u32,
    bound: WindowBound,
) -> Vec<Session> {
    let mut sessions = Vec::new();
    let mut seen: HashSet<(NaiveDate, SlotTime)> = HashSet::new();
    let week = Duration::weeks(1);
    let span = Months::new(bound.months(months));
    let mut anchor = start;

    for _ in 0..months {
        let window_end = anchor
            .checked_add_months(span)
            .unwrap_or(NaiveDateTime::MAX);

        for slot in schedule.slots() {
            let Some(mut next) = slot.align(anchor) else {
                continue;
            };
            if next < anchor {
                match next.checked_add_signed(week) {
                    Some(shifted) => next = shifted,
                    None => continue,
                }
            }

            while next == anchor || next < window_end {
                if seen.insert((next.date(), slot.time)) {
                    sessions.push(Session {
                        date: next.date(),
                        time: slot.time,
                        exercises: slot.exercises.clone(),
                    });
                }
                match next.checked_add_signed(week) {
                    Some(following) => next = following,
                    None => break,
                }
            }
        }

        match start_of_next_month(anchor) {
            Some(following) => anchor = following,
            None => break,
        }
    }

    sessions
}

/// Validating front door: negative or over-long month counts are rejected.
pub fn try_expand(
    start: NaiveDateTime,
    schedule: &ScheduleDefinition,
    months: i64,
    bound: WindowBound,
) -> Result<Vec<Session>, ScheduleError> {
    let months = months_from(months)?;
    Ok(expand_with(start, schedule, months, bound))
}

fn start_of_next_month(at: NaiveDateTime) -> Option<NaiveDateTime> {
    at.date()
        .with_day(1)?
        .checked_add_months(Months::new(1))
        .map(|first| first.and_time(NaiveTime::MIN))
}

#[cfg(test)]
#[path = "recurrence_tests.rs"]
mod tests;
