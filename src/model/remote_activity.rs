use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PresenceStatus {
    Present,
    HalfDay,
    Absent,
}

/// Daily call statistics of a remote employee; its existence is the
/// attendance evidence for that day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RemoteActivity {
    pub employee_id: u64,
    #[schema(format = "date", value_type = String)]
    pub date: NaiveDate,
    pub answered_calls: u32,
    pub missed_calls: u32,
    pub talk_seconds: u32,
    pub status: PresenceStatus,
}

impl RemoteActivity {
    pub fn new(
        employee_id: u64,
        date: NaiveDate,
        answered_calls: u32,
        missed_calls: u32,
        talk_seconds: u32,
    ) -> Self {
        Self {
            employee_id,
            date,
            answered_calls,
            missed_calls,
            talk_seconds,
            status: classify(date, talk_seconds),
        }
    }
}

/// Presence derived from talk time, with lighter thresholds late in the week.
///
/// | day     | present  | half day |
/// |---------|----------|----------|
/// | Mon-Thu | >= 90 min | >= 45 min |
/// | Fri     | >= 60 min | >= 30 min |
/// | Sat     | >= 45 min | >= 21 min |
///
/// Sunday is a holiday and always counts as present.
pub fn classify(date: NaiveDate, talk_seconds: u32) -> PresenceStatus {
    if talk_seconds == 0 {
        return PresenceStatus::Absent;
    }
    let minutes = talk_seconds as f64 / 60.0;
    let (present, half) = match date.weekday() {
        Weekday::Sun => return PresenceStatus::Present,
        Weekday::Sat => (45.0, 21.0),
        Weekday::Fri => (60.0, 30.0),
        _ => (90.0, 45.0),
    };
    if minutes >= present {
        PresenceStatus::Present
    } else if minutes >= half {
        PresenceStatus::HalfDay
    } else {
        PresenceStatus::Absent
    }
}
