//! Persistence port for the attendance and request workflow.
//!
//! Handlers and workflow code only see [`Store`]; `mysql` backs production,
//! `memory` backs tests and local runs. Every method that changes more than
//! one row is a single atomic unit in both adapters.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use derive_more::Display;
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::{
    attendance::{AttendanceCorrection, AttendanceRecord},
    employee::{Employee, EmployeeCategory, NewEmployee},
    holiday::Holiday,
    leave_request::{LeaveRequest, NewLeaveRequest, RequestKind, RequestStatus},
    remote_activity::RemoteActivity,
    user::{NewUser, UserAccount},
};

#[derive(Debug, Display)]
pub enum StoreError {
    /// Conditional write on `status = 'pending'` matched nothing.
    #[display(fmt = "request {} is no longer pending", _0)]
    NotPending(u64),
    /// A unique key such as a username already exists.
    #[display(fmt = "{} already exists", _0)]
    Duplicate(String),
    #[display(fmt = "stored value could not be decoded: {}", _0)]
    Corrupt(String),
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub employee_id: Option<u64>,
    pub status: Option<RequestStatus>,
    pub kind: Option<RequestKind>,
    /// 1-based
    pub page: u64,
    pub per_page: u64,
}

impl RequestFilter {
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1) * self.per_page
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusCounts {
    pub pending: i64,
    pub approved: i64,
    pub declined: i64,
}

/// Everything a decision writes, applied all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionCommit {
    pub request_id: u64,
    pub status: RequestStatus,
    pub reviewed_at: DateTime<Utc>,
    pub admin_notes: Option<String>,
    pub approved_days: Option<u32>,
    /// Replacement `(start, end)` chosen by the reviewer.
    pub adjusted_range: Option<(NaiveDate, NaiveDate)>,
    /// Create-if-absent-then-patch of the request day's attendance row.
    pub correction: Option<AttendanceCorrection>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user(&self, username: &str) -> Result<Option<UserAccount>, StoreError>;
    /// Fails with [`StoreError::Duplicate`] when the username is taken.
    async fn insert_user(&self, user: &NewUser) -> Result<u64, StoreError>;
    async fn save_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: i64,
    ) -> Result<(), StoreError>;
    /// Marks the token revoked; `false` when it was unknown or already revoked.
    async fn revoke_refresh_token(&self, jti: &str) -> Result<bool, StoreError>;

    async fn insert_employee(&self, employee: &NewEmployee) -> Result<u64, StoreError>;
    async fn find_employee(&self, id: u64) -> Result<Option<Employee>, StoreError>;
    async fn list_employees(
        &self,
        category: Option<EmployeeCategory>,
    ) -> Result<Vec<Employee>, StoreError>;

    async fn insert_request(&self, request: &NewLeaveRequest) -> Result<u64, StoreError>;
    async fn find_request(&self, id: u64) -> Result<Option<LeaveRequest>, StoreError>;
    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<(Vec<LeaveRequest>, i64), StoreError>;
    async fn count_by_status(&self) -> Result<StatusCounts, StoreError>;

    async fn find_attendance(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError>;
    async fn attendance_between(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;
    /// Sets `first_in` unless already set; `false` means already checked in.
    async fn check_in(
        &self,
        employee_id: u64,
        date: NaiveDate,
        at: NaiveTime,
    ) -> Result<bool, StoreError>;
    /// Moves `last_out` forward; `false` when there is no check-in for the day.
    async fn check_out(
        &self,
        employee_id: u64,
        date: NaiveDate,
        at: NaiveTime,
    ) -> Result<bool, StoreError>;

    async fn upsert_remote_activity(&self, activity: &RemoteActivity) -> Result<(), StoreError>;
    async fn find_remote_activity(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<RemoteActivity>, StoreError>;
    async fn remote_activity_between(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RemoteActivity>, StoreError>;

    /// Inserts the holiday or renames the existing one on that date.
    async fn upsert_holiday(&self, holiday: &Holiday) -> Result<(), StoreError>;
    async fn delete_holiday(&self, date: NaiveDate) -> Result<bool, StoreError>;
    async fn holidays_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Holiday>, StoreError>;

    /// Fails with [`StoreError::NotPending`] when the request left `pending`
    /// before the write; in that case nothing is persisted.
    async fn commit_decision(&self, commit: &DecisionCommit) -> Result<(), StoreError>;
}
