use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use super::errors::WorkflowError;
use crate::model::{
    attendance::{AttendanceCorrection, AttendanceRecord},
    employee::{Employee, EmployeeCategory},
    leave_request::{LeaveRequest, RequestKind, RequestStatus, span_days},
};
use crate::store::{DecisionCommit, Store, StoreError};
use crate::utils::time_format::hhmm_option;

/// What a reviewer decided. Times are `HH:MM`; omitted fields keep the
/// stored values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Approve {
        #[serde(default, with = "hhmm_option")]
        #[schema(value_type = Option<String>, example = "09:00")]
        new_first_in: Option<NaiveTime>,
        #[serde(default, with = "hhmm_option")]
        #[schema(value_type = Option<String>, example = "13:30")]
        new_last_out: Option<NaiveTime>,
        #[serde(default)]
        approved_days: Option<u32>,
        #[serde(default)]
        #[schema(value_type = Option<String>, format = "date")]
        adjusted_start: Option<NaiveDate>,
        #[serde(default)]
        #[schema(value_type = Option<String>, format = "date")]
        adjusted_end: Option<NaiveDate>,
        #[serde(default)]
        admin_notes: Option<String>,
    },
    Decline {
        #[serde(default)]
        admin_notes: Option<String>,
    },
}

impl Decision {
    /// Approval that only settles the request, leaving attendance times as they are.
    pub fn approve() -> Self {
        Decision::Approve {
            new_first_in: None,
            new_last_out: None,
            approved_days: None,
            adjusted_start: None,
            adjusted_end: None,
            admin_notes: None,
        }
    }

    pub fn decline() -> Self {
        Decision::Decline { admin_notes: None }
    }
}

/// Attendance as the reviewer sees it, shaped by the employee category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum AttendanceView {
    OnSite {
        #[serde(with = "hhmm_option")]
        #[schema(value_type = Option<String>, example = "09:05")]
        first_in: Option<NaiveTime>,
        #[serde(with = "hhmm_option")]
        #[schema(value_type = Option<String>)]
        last_out: Option<NaiveTime>,
        #[serde(with = "hhmm_option")]
        #[schema(value_type = Option<String>, example = "13:30")]
        suggested_last_out: Option<NaiveTime>,
    },
    Remote {},
}

/// Read-only projection of a request for the review screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RequestSnapshot {
    pub request_id: u64,
    pub employee_id: u64,
    pub employee_name: String,
    pub kind: RequestKind,
    pub status: RequestStatus,
    #[schema(value_type = String, format = "date")]
    pub request_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub reason: String,
    pub document: Option<String>,
    pub destination: Option<String>,
    pub customer_name: Option<String>,
    #[serde(with = "hhmm_option")]
    #[schema(value_type = Option<String>)]
    pub leaving_time: Option<NaiveTime>,
    #[serde(with = "hhmm_option")]
    #[schema(value_type = Option<String>)]
    pub return_time: Option<NaiveTime>,
    pub requested_days: u32,
    pub has_data: bool,
    pub attendance: AttendanceView,
}

/// Corrected last-out to offer the reviewer: the later of return time and
/// the recorded last-out, whichever of the two exists otherwise.
pub fn suggest_last_out(
    return_time: Option<NaiveTime>,
    last_out: Option<NaiveTime>,
) -> Option<NaiveTime> {
    match (return_time, last_out) {
        (Some(back), Some(out)) => Some(back.max(out)),
        (Some(back), None) => Some(back),
        (None, out) => out,
    }
}

/// Attendance evidence for a request day.
struct Evidence {
    record: Option<AttendanceRecord>,
    has_data: bool,
}

async fn load_evidence(
    store: &dyn Store,
    employee: &Employee,
    date: NaiveDate,
) -> Result<Evidence, StoreError> {
    let record = store.find_attendance(employee.id, date).await?;
    let mut has_data = record.as_ref().is_some_and(AttendanceRecord::has_data);
    if employee.category == EmployeeCategory::Remote && !has_data {
        has_data = store.find_remote_activity(employee.id, date).await?.is_some();
    }
    Ok(Evidence { record, has_data })
}

async fn load_request(
    store: &dyn Store,
    request_id: u64,
) -> Result<(LeaveRequest, Employee), WorkflowError> {
    let request = store
        .find_request(request_id)
        .await?
        .ok_or(WorkflowError::NotFound(request_id))?;
    let employee = store
        .find_employee(request.employee_id)
        .await?
        .ok_or_else(|| {
            StoreError::Corrupt(format!(
                "request {} refers to missing employee {}",
                request.id, request.employee_id
            ))
        })?;
    Ok((request, employee))
}

#[instrument(skip(store))]
pub async fn fetch_for_review(
    store: &dyn Store,
    request_id: u64,
) -> Result<RequestSnapshot, WorkflowError> {
    let (request, employee) = load_request(store, request_id).await?;
    let evidence = load_evidence(store, &employee, request.request_date()).await?;

    let attendance = match employee.category {
        EmployeeCategory::OnSite => {
            let first_in = evidence.record.as_ref().and_then(|r| r.first_in);
            let last_out = evidence.record.as_ref().and_then(|r| r.last_out);
            AttendanceView::OnSite {
                first_in,
                last_out,
                suggested_last_out: suggest_last_out(request.return_time, last_out),
            }
        }
        EmployeeCategory::Remote => AttendanceView::Remote {},
    };

    Ok(RequestSnapshot {
        request_id: request.id,
        employee_id: employee.id,
        employee_name: employee.name,
        kind: request.kind,
        status: request.status,
        request_date: request.request_date(),
        end_date: request.end_date,
        reason: request.reason,
        document: request.document,
        destination: request.destination,
        customer_name: request.customer_name,
        leaving_time: request.leaving_time,
        return_time: request.return_time,
        requested_days: request.requested_days,
        has_data: evidence.has_data,
        attendance,
    })
}

fn blank_to_none(notes: &Option<String>) -> Option<String> {
    notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Turns a decision into the writes it implies, without touching storage.
pub fn plan_decision(
    request: &LeaveRequest,
    employee: &Employee,
    has_data: bool,
    decision: &Decision,
    now: DateTime<Utc>,
) -> Result<DecisionCommit, WorkflowError> {
    if request.status.is_terminal() {
        return Err(WorkflowError::NotPending(request.id));
    }

    match decision {
        Decision::Decline { admin_notes } => Ok(DecisionCommit {
            request_id: request.id,
            status: RequestStatus::Declined,
            reviewed_at: now,
            admin_notes: blank_to_none(admin_notes),
            approved_days: None,
            adjusted_range: None,
            correction: None,
        }),
        Decision::Approve {
            new_first_in,
            new_last_out,
            approved_days,
            adjusted_start,
            adjusted_end,
            admin_notes,
        } => {
            let adjusted_range = match (adjusted_start, adjusted_end) {
                (None, None) => None,
                (start, end) => {
                    let start = start.unwrap_or(request.start_date);
                    let end = end.unwrap_or(request.end_date);
                    if start > end {
                        return Err(WorkflowError::InvalidAdjustment);
                    }
                    Some((start, end))
                }
            };
            let (start, end) = adjusted_range.unwrap_or((request.start_date, request.end_date));
            let duration = span_days(start, end);
            let days = approved_days
                .unwrap_or(request.requested_days)
                .clamp(1, duration);

            let correction = match employee.category {
                EmployeeCategory::Remote if !has_data => {
                    return Err(WorkflowError::NoAttendanceData {
                        employee_id: employee.id,
                        date: request.request_date(),
                    });
                }
                EmployeeCategory::Remote => None,
                EmployeeCategory::OnSite => Some(AttendanceCorrection {
                    employee_id: employee.id,
                    date: request.request_date(),
                    first_in: *new_first_in,
                    last_out: *new_last_out,
                }),
            };

            Ok(DecisionCommit {
                request_id: request.id,
                status: RequestStatus::Approved,
                reviewed_at: now,
                admin_notes: blank_to_none(admin_notes),
                approved_days: Some(days),
                adjusted_range,
                correction,
            })
        }
    }
}

/// Applies a reviewer's decision to a pending request.
///
/// The status change and any attendance correction are committed together;
/// a concurrent decision on the same request loses with `NotPending`.
#[instrument(skip(store, decision, now))]
pub async fn decide(
    store: &dyn Store,
    request_id: u64,
    decision: &Decision,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    let (request, employee) = load_request(store, request_id).await?;
    if request.status.is_terminal() {
        warn!(status = request.status.as_ref(), "Request already decided");
        return Err(WorkflowError::NotPending(request_id));
    }

    let has_data = match (decision, employee.category) {
        (Decision::Approve { .. }, EmployeeCategory::Remote) => {
            load_evidence(store, &employee, request.request_date())
                .await?
                .has_data
        }
        _ => false,
    };

    let commit = plan_decision(&request, &employee, has_data, decision, now)?;
    match store.commit_decision(&commit).await {
        Ok(()) => {
            info!(
                status = commit.status.as_ref(),
                employee_id = employee.id,
                corrected = commit.correction.is_some(),
                "Decision recorded"
            );
            Ok(())
        }
        Err(StoreError::NotPending(id)) => {
            warn!("Request decided concurrently");
            Err(WorkflowError::NotPending(id))
        }
        Err(e) => {
            error!(error = %e, "Failed to commit decision");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::employee::NewEmployee;
    use crate::model::remote_activity::RemoteActivity;
    use crate::store::memory::MemoryStore;
    use crate::workflow::intake::{Submission, submit};
    use chrono::TimeZone;
    use rstest::rstest;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 11, 9, 0, 0).unwrap()
    }

    async fn employee(store: &MemoryStore, category: EmployeeCategory) -> u64 {
        store
            .insert_employee(&NewEmployee {
                name: "Omar".into(),
                email: Some("omar@example.com".into()),
                category,
                shift_start: None,
                shift_end: None,
            })
            .await
            .unwrap()
    }

    async fn sick_leave(store: &MemoryStore, employee_id: u64) -> u64 {
        let submission = Submission {
            kind: "sick".into(),
            start_date: Some("2024-03-10".into()),
            reason: "Flu".into(),
            document: Some("doc-1".into()),
            ..Default::default()
        };
        submit(store, employee_id, &submission, now()).await.unwrap()
    }

    async fn early_leave(store: &MemoryStore, employee_id: u64) -> u64 {
        let submission = Submission {
            kind: "early_leave".into(),
            start_date: Some("2024-03-10".into()),
            leaving_time: Some("11:00".into()),
            return_time: Some("13:30".into()),
            destination: Some("Dubai Marina".into()),
            customer_name: Some("Acme LLC".into()),
            ..Default::default()
        };
        submit(store, employee_id, &submission, now()).await.unwrap()
    }

    fn record(employee_id: u64, first_in: Option<NaiveTime>, last_out: Option<NaiveTime>) -> AttendanceRecord {
        let mut record = AttendanceRecord::empty(employee_id, day());
        record.apply_correction(first_in, last_out);
        record
    }

    async fn status_of(store: &MemoryStore, id: u64) -> RequestStatus {
        store.find_request(id).await.unwrap().unwrap().status
    }

    #[rstest]
    #[case(Some(t(13, 30)), Some(t(18, 0)), Some(t(18, 0)))]
    #[case(Some(t(13, 30)), Some(t(12, 0)), Some(t(13, 30)))]
    #[case(Some(t(13, 30)), None, Some(t(13, 30)))]
    #[case(None, Some(t(18, 0)), Some(t(18, 0)))]
    #[case(None, None, None)]
    fn suggests_the_later_of_return_and_last_out(
        #[case] return_time: Option<NaiveTime>,
        #[case] last_out: Option<NaiveTime>,
        #[case] expected: Option<NaiveTime>,
    ) {
        assert_eq!(suggest_last_out(return_time, last_out), expected);
    }

    #[actix_web::test]
    async fn it_should_suggest_return_time_when_nobody_checked_out() {
        let store = MemoryStore::new();
        let emp = employee(&store, EmployeeCategory::OnSite).await;
        store.put_attendance(record(emp, Some(t(9, 5)), None)).await;
        let id = early_leave(&store, emp).await;

        let snapshot = fetch_for_review(&store, id).await.unwrap();
        assert!(snapshot.has_data);
        assert_eq!(snapshot.customer_name.as_deref(), Some("Acme LLC"));
        assert_eq!(
            snapshot.attendance,
            AttendanceView::OnSite {
                first_in: Some(t(9, 5)),
                last_out: None,
                suggested_last_out: Some(t(13, 30)),
            }
        );

        decide(&store, id, &Decision::approve(), now()).await.unwrap();
        let after = store.find_attendance(emp, day()).await.unwrap().unwrap();
        assert_eq!(after.last_out, None);
    }

    #[actix_web::test]
    async fn it_should_return_identical_snapshots_on_repeated_reads() {
        let store = MemoryStore::new();
        let emp = employee(&store, EmployeeCategory::OnSite).await;
        store
            .put_attendance(record(emp, Some(t(9, 5)), Some(t(17, 0))))
            .await;
        let id = early_leave(&store, emp).await;

        let first = fetch_for_review(&store, id).await.unwrap();
        let second = fetch_for_review(&store, id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(status_of(&store, id).await, RequestStatus::Pending);
    }

    #[actix_web::test]
    async fn it_should_hide_times_for_remote_staff() {
        let store = MemoryStore::new();
        let emp = employee(&store, EmployeeCategory::Remote).await;
        let id = sick_leave(&store, emp).await;

        let snapshot = fetch_for_review(&store, id).await.unwrap();
        assert_eq!(snapshot.attendance, AttendanceView::Remote {});
        assert!(!snapshot.has_data);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["attendance"], serde_json::json!({ "category": "remote" }));
    }

    #[actix_web::test]
    async fn it_should_report_missing_requests() {
        let store = MemoryStore::new();
        assert!(matches!(
            fetch_for_review(&store, 7).await,
            Err(WorkflowError::NotFound(7))
        ));
        assert!(matches!(
            decide(&store, 7, &Decision::decline(), now()).await,
            Err(WorkflowError::NotFound(7))
        ));
    }

    #[actix_web::test]
    async fn it_should_not_approve_remote_days_without_evidence() {
        let store = MemoryStore::new();
        let emp = employee(&store, EmployeeCategory::Remote).await;
        let id = sick_leave(&store, emp).await;
        assert_eq!(status_of(&store, id).await, RequestStatus::Pending);

        let result = decide(&store, id, &Decision::approve(), now()).await;
        assert!(matches!(
            result,
            Err(WorkflowError::NoAttendanceData { employee_id, date }) if employee_id == emp && date == day()
        ));
        assert_eq!(status_of(&store, id).await, RequestStatus::Pending);
    }

    #[actix_web::test]
    async fn it_should_approve_remote_days_with_call_activity_without_writing_times() {
        let store = MemoryStore::new();
        let emp = employee(&store, EmployeeCategory::Remote).await;
        store
            .upsert_remote_activity(&RemoteActivity::new(emp, day(), 12, 1, 3_000))
            .await
            .unwrap();
        let id = sick_leave(&store, emp).await;

        let decision = Decision::Approve {
            new_first_in: Some(t(9, 0)),
            new_last_out: Some(t(18, 0)),
            approved_days: None,
            adjusted_start: None,
            adjusted_end: None,
            admin_notes: None,
        };
        decide(&store, id, &decision, now()).await.unwrap();

        assert_eq!(status_of(&store, id).await, RequestStatus::Approved);
        assert_eq!(store.find_attendance(emp, day()).await.unwrap(), None);
    }

    #[actix_web::test]
    async fn it_should_leave_attendance_alone_on_decline() {
        let store = MemoryStore::new();
        let emp = employee(&store, EmployeeCategory::OnSite).await;
        let before = record(emp, Some(t(9, 5)), Some(t(12, 0)));
        store.put_attendance(before.clone()).await;
        let id = early_leave(&store, emp).await;

        let decision = Decision::Decline {
            admin_notes: Some("No customer confirmation".into()),
        };
        decide(&store, id, &decision, now()).await.unwrap();

        let request = store.find_request(id).await.unwrap().unwrap();
        assert_eq!(request.status, RequestStatus::Declined);
        assert_eq!(request.reviewed_at, Some(now()));
        assert_eq!(request.admin_notes.as_deref(), Some("No customer confirmation"));
        assert_eq!(store.find_attendance(emp, day()).await.unwrap(), Some(before));
    }

    #[actix_web::test]
    async fn it_should_keep_last_out_when_only_first_in_is_corrected() {
        let store = MemoryStore::new();
        let emp = employee(&store, EmployeeCategory::OnSite).await;
        store
            .put_attendance(record(emp, Some(t(10, 40)), Some(t(18, 15))))
            .await;
        let id = early_leave(&store, emp).await;

        let decision = Decision::Approve {
            new_first_in: Some(t(9, 0)),
            new_last_out: None,
            approved_days: None,
            adjusted_start: None,
            adjusted_end: None,
            admin_notes: None,
        };
        decide(&store, id, &decision, now()).await.unwrap();

        let after = store.find_attendance(emp, day()).await.unwrap().unwrap();
        assert_eq!(after.first_in, Some(t(9, 0)));
        assert_eq!(after.last_out, Some(t(18, 15)));
        assert_eq!(after.work_seconds, Some(33_300));
    }

    #[actix_web::test]
    async fn it_should_create_the_attendance_row_for_an_empty_day() {
        let store = MemoryStore::new();
        let emp = employee(&store, EmployeeCategory::OnSite).await;
        let id = early_leave(&store, emp).await;

        let decision = Decision::Approve {
            new_first_in: None,
            new_last_out: Some(t(13, 30)),
            approved_days: None,
            adjusted_start: None,
            adjusted_end: None,
            admin_notes: None,
        };
        decide(&store, id, &decision, now()).await.unwrap();

        let after = store.find_attendance(emp, day()).await.unwrap().unwrap();
        assert_eq!(after.first_in, None);
        assert_eq!(after.last_out, Some(t(13, 30)));
    }

    #[rstest]
    #[case(Decision::approve(), Decision::decline())]
    #[case(Decision::decline(), Decision::approve())]
    #[case(Decision::approve(), Decision::approve())]
    #[actix_web::test]
    async fn it_should_reject_a_second_decision(#[case] first: Decision, #[case] second: Decision) {
        let store = MemoryStore::new();
        let emp = employee(&store, EmployeeCategory::OnSite).await;
        store
            .put_attendance(record(emp, Some(t(9, 0)), Some(t(18, 0))))
            .await;
        let id = early_leave(&store, emp).await;

        decide(&store, id, &first, now()).await.unwrap();
        let status = status_of(&store, id).await;
        let attendance = store.find_attendance(emp, day()).await.unwrap();

        let result = decide(&store, id, &second, now()).await;
        assert!(matches!(result, Err(WorkflowError::NotPending(rid)) if rid == id));
        assert_eq!(status_of(&store, id).await, status);
        assert_eq!(store.find_attendance(emp, day()).await.unwrap(), attendance);
    }

    #[actix_web::test]
    async fn it_should_let_only_one_concurrent_decision_win() {
        let store = MemoryStore::new();
        let emp = employee(&store, EmployeeCategory::OnSite).await;
        let id = early_leave(&store, emp).await;

        let approve = Decision::approve();
        let decline = Decision::decline();
        let (a, b) = futures::join!(
            decide(&store, id, &approve, now()),
            decide(&store, id, &decline, now())
        );

        assert!(a.is_ok() ^ b.is_ok());
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(loser, Err(WorkflowError::NotPending(_))));
    }

    #[actix_web::test]
    async fn it_should_persist_nothing_when_the_commit_fails() {
        let store = MemoryStore::new();
        let emp = employee(&store, EmployeeCategory::OnSite).await;
        let before = record(emp, Some(t(9, 5)), None);
        store.put_attendance(before.clone()).await;
        let id = early_leave(&store, emp).await;
        store.fail_commits(true);

        let decision = Decision::Approve {
            new_first_in: None,
            new_last_out: Some(t(13, 30)),
            approved_days: None,
            adjusted_start: None,
            adjusted_end: None,
            admin_notes: None,
        };
        let result = decide(&store, id, &decision, now()).await;
        assert!(matches!(result, Err(WorkflowError::Store(_))));
        assert_eq!(status_of(&store, id).await, RequestStatus::Pending);
        assert_eq!(store.find_attendance(emp, day()).await.unwrap(), Some(before));
    }

    fn pending_range(days: u32) -> (LeaveRequest, Employee) {
        let start = day();
        let end = start + chrono::Duration::days(days as i64 - 1);
        let request = LeaveRequest {
            id: 5,
            employee_id: 2,
            kind: RequestKind::Annual,
            start_date: start,
            end_date: end,
            reason: "Family trip".into(),
            document: None,
            leaving_time: None,
            return_time: None,
            destination: None,
            customer_name: None,
            requested_days: days,
            approved_days: None,
            admin_notes: None,
            status: RequestStatus::Pending,
            created_at: now(),
            reviewed_at: None,
        };
        let employee = Employee {
            id: 2,
            name: "Lina".into(),
            email: None,
            category: EmployeeCategory::Remote,
            is_active: true,
            shift_start: None,
            shift_end: None,
        };
        (request, employee)
    }

    #[rstest]
    #[case(None, None, None, 5)]
    #[case(Some(3), None, None, 3)]
    #[case(Some(0), None, None, 1)]
    #[case(Some(9), None, None, 5)]
    #[case(None, None, Some(11), 2)]
    fn approved_days_are_clamped_to_the_range(
        #[case] approved_days: Option<u32>,
        #[case] adjusted_start: Option<u32>,
        #[case] adjusted_end: Option<u32>,
        #[case] expected: u32,
    ) {
        let (request, employee) = pending_range(5);
        let date = |d: u32| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
        let decision = Decision::Approve {
            new_first_in: None,
            new_last_out: None,
            approved_days,
            adjusted_start: adjusted_start.map(date),
            adjusted_end: adjusted_end.map(date),
            admin_notes: Some("  ".into()),
        };

        let commit = plan_decision(&request, &employee, true, &decision, now()).unwrap();
        assert_eq!(commit.approved_days, Some(expected));
        assert_eq!(commit.admin_notes, None);
        assert_eq!(commit.correction, None);
    }

    #[test]
    fn an_inverted_adjustment_is_rejected() {
        let (request, employee) = pending_range(3);
        let decision = Decision::Approve {
            new_first_in: None,
            new_last_out: None,
            approved_days: None,
            adjusted_start: NaiveDate::from_ymd_opt(2024, 3, 20),
            adjusted_end: None,
            admin_notes: None,
        };
        assert!(matches!(
            plan_decision(&request, &employee, true, &decision, now()),
            Err(WorkflowError::InvalidAdjustment)
        ));
    }

    #[test]
    fn decisions_deserialize_from_tagged_json() {
        let approve: Decision = serde_json::from_value(serde_json::json!({
            "decision": "approve",
            "new_last_out": "13:30",
            "approved_days": 2
        }))
        .unwrap();
        assert!(matches!(
            approve,
            Decision::Approve { new_last_out: Some(out), approved_days: Some(2), new_first_in: None, .. } if out == t(13, 30)
        ));

        let decline: Decision =
            serde_json::from_value(serde_json::json!({ "decision": "decline" })).unwrap();
        assert_eq!(decline, Decision::decline());
    }
}
