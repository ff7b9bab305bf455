use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::utils::time_format::hhmm_option;

/// Daily attendance of an on-site employee. Unique per `(employee_id, date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRecord {
    pub employee_id: u64,
    #[schema(format = "date", value_type = String)]
    pub date: NaiveDate,
    #[serde(default, with = "hhmm_option")]
    #[schema(example = "09:05", value_type = Option<String>)]
    pub first_in: Option<NaiveTime>,
    #[serde(default, with = "hhmm_option")]
    #[schema(example = "18:40", value_type = Option<String>)]
    pub last_out: Option<NaiveTime>,
    /// Seconds between first-in and last-out, when both are known.
    pub work_seconds: Option<i64>,
}

impl AttendanceRecord {
    /// Placeholder row with no times, as created by an approval on an empty day.
    pub fn empty(employee_id: u64, date: NaiveDate) -> Self {
        Self {
            employee_id,
            date,
            first_in: None,
            last_out: None,
            work_seconds: None,
        }
    }

    pub fn has_data(&self) -> bool {
        self.first_in.is_some() || self.last_out.is_some()
    }

    /// Overwrites only the supplied fields, then refreshes the work duration.
    pub fn apply_correction(&mut self, first_in: Option<NaiveTime>, last_out: Option<NaiveTime>) {
        if let Some(first_in) = first_in {
            self.first_in = Some(first_in);
        }
        if let Some(last_out) = last_out {
            self.last_out = Some(last_out);
        }
        self.recompute_work_seconds();
    }

    pub fn recompute_work_seconds(&mut self) {
        self.work_seconds = match (self.first_in, self.last_out) {
            (Some(first_in), Some(last_out)) => Some((last_out - first_in).num_seconds().max(0)),
            _ => None,
        };
    }
}

/// Time fields an approval writes onto the attendance row of the request day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceCorrection {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub first_in: Option<NaiveTime>,
    pub last_out: Option<NaiveTime>,
}
