use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString, IntoStaticStr};
use utoipa::ToSchema;

use crate::utils::time_format::hhmm_option;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    AsRefStr,
    IntoStaticStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestKind {
    Sick,
    Medical,
    Annual,
    Casual,
    EarlyLeave,
    Other,
}

impl RequestKind {
    /// Sick and medical leave must carry a supporting document.
    pub fn requires_document(self) -> bool {
        matches!(self, RequestKind::Sick | RequestKind::Medical)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Declined,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

/// A leave or early-departure request. Early-leave requests fill in the
/// leaving/return times and the visit details; multi-day leave leaves them empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1000,
    "kind": "early_leave",
    "start_date": "2024-03-10",
    "end_date": "2024-03-10",
    "reason": "Site visit",
    "document": null,
    "leaving_time": "11:00",
    "return_time": "13:30",
    "destination": "Dubai Marina",
    "customer_name": "Acme LLC",
    "requested_days": 1,
    "approved_days": null,
    "admin_notes": null,
    "status": "pending",
    "created_at": "2024-03-10T07:00:00Z",
    "reviewed_at": null
}))]
pub struct LeaveRequest {
    pub id: u64,
    pub employee_id: u64,
    pub kind: RequestKind,
    #[schema(format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub reason: String,
    pub document: Option<String>,
    #[serde(default, with = "hhmm_option")]
    #[schema(value_type = Option<String>)]
    pub leaving_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm_option")]
    #[schema(value_type = Option<String>)]
    pub return_time: Option<NaiveTime>,
    pub destination: Option<String>,
    pub customer_name: Option<String>,
    pub requested_days: u32,
    pub approved_days: Option<u32>,
    pub admin_notes: Option<String>,
    pub status: RequestStatus,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl LeaveRequest {
    /// The day whose attendance record the request refers to.
    pub fn request_date(&self) -> NaiveDate {
        self.start_date
    }
}

/// Inclusive number of calendar days in `start..=end`, at least one.
pub fn span_days(start: NaiveDate, end: NaiveDate) -> u32 {
    let days = (end - start).num_days() + 1;
    days.max(1) as u32
}

/// A validated request ready to be persisted in `pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLeaveRequest {
    pub employee_id: u64,
    pub kind: RequestKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub document: Option<String>,
    pub leaving_time: Option<NaiveTime>,
    pub return_time: Option<NaiveTime>,
    pub destination: Option<String>,
    pub customer_name: Option<String>,
    pub requested_days: u32,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    #[rstest]
    #[case("sick", RequestKind::Sick, true)]
    #[case("medical", RequestKind::Medical, true)]
    #[case("annual", RequestKind::Annual, false)]
    #[case("casual", RequestKind::Casual, false)]
    #[case("early_leave", RequestKind::EarlyLeave, false)]
    #[case("other", RequestKind::Other, false)]
    fn kinds_parse_and_know_their_document_rule(
        #[case] raw: &str,
        #[case] kind: RequestKind,
        #[case] needs_document: bool,
    ) {
        assert_eq!(RequestKind::from_str(raw).unwrap(), kind);
        assert_eq!(kind.as_ref(), raw);
        assert_eq!(kind.requires_document(), needs_document);
    }

    #[test]
    fn span_counts_both_ends() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        assert_eq!(span_days(d(10), d(10)), 1);
        assert_eq!(span_days(d(10), d(14)), 5);
        assert_eq!(span_days(d(14), d(10)), 1);
    }

    #[test]
    fn only_pending_is_open() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(RequestStatus::Approved.is_terminal());
        assert!(RequestStatus::Declined.is_terminal());
        assert_eq!(RequestStatus::from_str("declined").unwrap(), RequestStatus::Declined);
    }
}
