use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{FromRow, MySqlPool};
use tracing::debug;

use super::{DecisionCommit, RequestFilter, StatusCounts, Store, StoreError};
use crate::model::{
    attendance::AttendanceRecord,
    employee::{Employee, EmployeeCategory, NewEmployee},
    holiday::Holiday,
    leave_request::{LeaveRequest, NewLeaveRequest, RequestKind, RequestStatus},
    remote_activity::{PresenceStatus, RemoteActivity},
    user::{NewUser, UserAccount},
};
use crate::utils::employee_cache;

const EMPLOYEE_COLUMNS: &str = "id, name, email, category, is_active, shift_start, shift_end";

const REQUEST_COLUMNS: &str = r#"
    id, employee_id, kind, start_date, end_date, reason, document,
    leaving_time, return_time, destination, customer_name,
    requested_days, approved_days, admin_notes, status, created_at, reviewed_at
"#;

const REFRESH_WORK_SECONDS: &str = r#"
    UPDATE attendance_records
    SET work_seconds = IF(
        first_in IS NULL OR last_out IS NULL,
        NULL,
        GREATEST(TIME_TO_SEC(last_out) - TIME_TO_SEC(first_in), 0)
    )
    WHERE employee_id = ? AND date = ?
"#;

/// Overwrites only the non-NULL values, so an untouched field keeps whatever
/// check-in/out wrote concurrently.
const UPSERT_CORRECTION: &str = r#"
    INSERT INTO attendance_records (employee_id, date, first_in, last_out)
    VALUES (?, ?, ?, ?)
    ON DUPLICATE KEY UPDATE
        first_in = COALESCE(VALUES(first_in), first_in),
        last_out = COALESCE(VALUES(last_out), last_out)
"#;

#[derive(FromRow)]
pub(crate) struct EmployeeRow {
    id: u64,
    name: String,
    email: Option<String>,
    category: String,
    is_active: bool,
    shift_start: Option<NaiveTime>,
    shift_end: Option<NaiveTime>,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = StoreError;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        let category = EmployeeCategory::from_str(&row.category)
            .map_err(|_| StoreError::Corrupt(format!("employee category '{}'", row.category)))?;
        Ok(Employee {
            id: row.id,
            name: row.name,
            email: row.email,
            category,
            is_active: row.is_active,
            shift_start: row.shift_start,
            shift_end: row.shift_end,
        })
    }
}

#[derive(FromRow)]
struct RequestRow {
    id: u64,
    employee_id: u64,
    kind: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: String,
    document: Option<String>,
    leaving_time: Option<NaiveTime>,
    return_time: Option<NaiveTime>,
    destination: Option<String>,
    customer_name: Option<String>,
    requested_days: u32,
    approved_days: Option<u32>,
    admin_notes: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    reviewed_at: Option<DateTime<Utc>>,
}

impl TryFrom<RequestRow> for LeaveRequest {
    type Error = StoreError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let kind = RequestKind::from_str(&row.kind)
            .map_err(|_| StoreError::Corrupt(format!("request kind '{}'", row.kind)))?;
        let status = RequestStatus::from_str(&row.status)
            .map_err(|_| StoreError::Corrupt(format!("request status '{}'", row.status)))?;
        Ok(LeaveRequest {
            id: row.id,
            employee_id: row.employee_id,
            kind,
            start_date: row.start_date,
            end_date: row.end_date,
            reason: row.reason,
            document: row.document,
            leaving_time: row.leaving_time,
            return_time: row.return_time,
            destination: row.destination,
            customer_name: row.customer_name,
            requested_days: row.requested_days,
            approved_days: row.approved_days,
            admin_notes: row.admin_notes,
            status,
            created_at: row.created_at,
            reviewed_at: row.reviewed_at,
        })
    }
}

#[derive(FromRow)]
struct AttendanceRow {
    employee_id: u64,
    date: NaiveDate,
    first_in: Option<NaiveTime>,
    last_out: Option<NaiveTime>,
    work_seconds: Option<i64>,
}

impl From<AttendanceRow> for AttendanceRecord {
    fn from(row: AttendanceRow) -> Self {
        AttendanceRecord {
            employee_id: row.employee_id,
            date: row.date,
            first_in: row.first_in,
            last_out: row.last_out,
            work_seconds: row.work_seconds,
        }
    }
}

#[derive(FromRow)]
struct RemoteActivityRow {
    employee_id: u64,
    date: NaiveDate,
    answered_calls: u32,
    missed_calls: u32,
    talk_seconds: u32,
    status: String,
}

impl TryFrom<RemoteActivityRow> for RemoteActivity {
    type Error = StoreError;

    fn try_from(row: RemoteActivityRow) -> Result<Self, Self::Error> {
        let status = PresenceStatus::from_str(&row.status)
            .map_err(|_| StoreError::Corrupt(format!("presence status '{}'", row.status)))?;
        Ok(RemoteActivity {
            employee_id: row.employee_id,
            date: row.date,
            answered_calls: row.answered_calls,
            missed_calls: row.missed_calls,
            talk_seconds: row.talk_seconds,
            status,
        })
    }
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn employee_select_sql(where_clause: &str) -> String {
    format!("SELECT {EMPLOYEE_COLUMNS} FROM employees {where_clause}")
}

#[async_trait]
impl Store for MySqlStore {
    async fn find_user(&self, username: &str) -> Result<Option<UserAccount>, StoreError> {
        let user = sqlx::query_as::<_, UserAccount>(
            r#"
            SELECT id, username, password, role_id, employee_id, is_active
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: &NewUser) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password, role_id, employee_id)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.id())
        .bind(user.employee_id)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Duplicate(format!("username '{}'", user.username))
            }
            e => StoreError::Database(e),
        })?;
        Ok(result.last_insert_id())
    }

    async fn save_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: i64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, jti, expires_at)
            VALUES (?, ?, FROM_UNIXTIME(?))
            "#,
        )
        .bind(user_id)
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn revoke_refresh_token(&self, jti: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = 1
            WHERE jti = ?
            AND revoked = 0
            "#,
        )
        .bind(jti)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_employee(&self, employee: &NewEmployee) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO employees (name, email, category, shift_start, shift_end)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(employee.category.as_ref())
        .bind(employee.shift_start)
        .bind(employee.shift_end)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn find_employee(&self, id: u64) -> Result<Option<Employee>, StoreError> {
        if let Some(employee) = employee_cache::get(id).await {
            return Ok(Some(employee));
        }

        let row = sqlx::query_as::<_, EmployeeRow>(&employee_select_sql("WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let employee = Employee::try_from(row)?;
                employee_cache::remember(&employee).await;
                Ok(Some(employee))
            }
            None => Ok(None),
        }
    }

    async fn list_employees(
        &self,
        category: Option<EmployeeCategory>,
    ) -> Result<Vec<Employee>, StoreError> {
        let rows = match category {
            Some(category) => {
                sqlx::query_as::<_, EmployeeRow>(&employee_select_sql(
                    "WHERE category = ? ORDER BY name",
                ))
                .bind(category.as_ref())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, EmployeeRow>(&employee_select_sql("ORDER BY name"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.into_iter().map(Employee::try_from).collect()
    }

    async fn insert_request(&self, request: &NewLeaveRequest) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, kind, start_date, end_date, reason, document,
                 leaving_time, return_time, destination, customer_name,
                 requested_days, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?)
            "#,
        )
        .bind(request.employee_id)
        .bind(request.kind.as_ref())
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(&request.reason)
        .bind(&request.document)
        .bind(request.leaving_time)
        .bind(request.return_time)
        .bind(&request.destination)
        .bind(&request.customer_name)
        .bind(request.requested_days)
        .bind(request.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn find_request(&self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = ?");
        let row = sqlx::query_as::<_, RequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(LeaveRequest::try_from).transpose()
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<(Vec<LeaveRequest>, i64), StoreError> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(employee_id) = filter.employee_id {
            where_sql.push_str(" AND employee_id = ?");
            args.push(FilterValue::U64(employee_id));
        }
        if let Some(status) = &filter.status {
            where_sql.push_str(" AND status = ?");
            args.push(FilterValue::Str(status.as_ref()));
        }
        if let Some(kind) = &filter.kind {
            where_sql.push_str(" AND kind = ?");
            args.push(FilterValue::Str(kind.as_ref()));
        }

        let count_sql = format!("SELECT COUNT(*) FROM leave_requests{where_sql}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(*s),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        let data_sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM leave_requests{where_sql} \
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        debug!(sql = %data_sql, page = filter.page, per_page = filter.per_page, "Fetching requests");

        let mut data_q = sqlx::query_as::<_, RequestRow>(&data_sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
                FilterValue::Str(s) => data_q.bind(s),
            };
        }
        let rows = data_q
            .bind(filter.per_page)
            .bind(filter.offset())
            .fetch_all(&self.pool)
            .await?;

        let requests = rows
            .into_iter()
            .map(LeaveRequest::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((requests, total))
    }

    async fn count_by_status(&self) -> Result<StatusCounts, StoreError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM leave_requests GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            match RequestStatus::from_str(&status) {
                Ok(RequestStatus::Pending) => counts.pending = count,
                Ok(RequestStatus::Approved) => counts.approved = count,
                Ok(RequestStatus::Declined) => counts.declined = count,
                Err(_) => return Err(StoreError::Corrupt(format!("request status '{status}'"))),
            }
        }
        Ok(counts)
    }

    async fn find_attendance(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let row = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT employee_id, date, first_in, last_out, work_seconds
            FROM attendance_records
            WHERE employee_id = ? AND date = ?
            "#,
        )
        .bind(employee_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(AttendanceRecord::from))
    }

    async fn attendance_between(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT employee_id, date, first_in, last_out, work_seconds
            FROM attendance_records
            WHERE employee_id = ? AND date BETWEEN ? AND ?
            ORDER BY date
            "#,
        )
        .bind(employee_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(AttendanceRecord::from).collect())
    }

    async fn check_in(
        &self,
        employee_id: u64,
        date: NaiveDate,
        at: NaiveTime,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT IGNORE INTO attendance_records (employee_id, date) VALUES (?, ?)")
            .bind(employee_id)
            .bind(date)
            .execute(&mut *tx)
            .await?;

        let updated = sqlx::query(
            r#"
            UPDATE attendance_records
            SET first_in = ?
            WHERE employee_id = ? AND date = ?
            AND first_in IS NULL
            "#,
        )
        .bind(at)
        .bind(employee_id)
        .bind(date)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(REFRESH_WORK_SECONDS)
            .bind(employee_id)
            .bind(date)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn check_out(
        &self,
        employee_id: u64,
        date: NaiveDate,
        at: NaiveTime,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE attendance_records
            SET last_out = ?
            WHERE employee_id = ? AND date = ?
            AND first_in IS NOT NULL
            "#,
        )
        .bind(at)
        .bind(employee_id)
        .bind(date)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(REFRESH_WORK_SECONDS)
            .bind(employee_id)
            .bind(date)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn upsert_remote_activity(&self, activity: &RemoteActivity) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO remote_activity
                (employee_id, date, answered_calls, missed_calls, talk_seconds, status)
            VALUES (?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                answered_calls = VALUES(answered_calls),
                missed_calls = VALUES(missed_calls),
                talk_seconds = VALUES(talk_seconds),
                status = VALUES(status)
            "#,
        )
        .bind(activity.employee_id)
        .bind(activity.date)
        .bind(activity.answered_calls)
        .bind(activity.missed_calls)
        .bind(activity.talk_seconds)
        .bind(activity.status.as_ref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_remote_activity(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<RemoteActivity>, StoreError> {
        let row = sqlx::query_as::<_, RemoteActivityRow>(
            r#"
            SELECT employee_id, date, answered_calls, missed_calls, talk_seconds, status
            FROM remote_activity
            WHERE employee_id = ? AND date = ?
            "#,
        )
        .bind(employee_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        row.map(RemoteActivity::try_from).transpose()
    }

    async fn remote_activity_between(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RemoteActivity>, StoreError> {
        let rows = sqlx::query_as::<_, RemoteActivityRow>(
            r#"
            SELECT employee_id, date, answered_calls, missed_calls, talk_seconds, status
            FROM remote_activity
            WHERE employee_id = ? AND date BETWEEN ? AND ?
            ORDER BY date
            "#,
        )
        .bind(employee_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(RemoteActivity::try_from).collect()
    }

    async fn upsert_holiday(&self, holiday: &Holiday) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO holidays (date, name)
            VALUES (?, ?)
            ON DUPLICATE KEY UPDATE name = VALUES(name)
            "#,
        )
        .bind(holiday.date)
        .bind(&holiday.name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_holiday(&self, date: NaiveDate) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM holidays WHERE date = ?")
            .bind(date)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn holidays_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Holiday>, StoreError> {
        let rows = sqlx::query_as::<_, (NaiveDate, String)>(
            "SELECT date, name FROM holidays WHERE date BETWEEN ? AND ? ORDER BY date",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(date, name)| Holiday { date, name })
            .collect())
    }

    async fn commit_decision(&self, commit: &DecisionCommit) -> Result<(), StoreError> {
        // Dropping `tx` on any early return rolls back.
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?,
                reviewed_at = ?,
                admin_notes = ?,
                approved_days = ?,
                start_date = COALESCE(?, start_date),
                end_date = COALESCE(?, end_date)
            WHERE id = ?
            AND status = 'pending'
            "#,
        )
        .bind(commit.status.as_ref())
        .bind(commit.reviewed_at)
        .bind(&commit.admin_notes)
        .bind(commit.approved_days)
        .bind(commit.adjusted_range.map(|(start, _)| start))
        .bind(commit.adjusted_range.map(|(_, end)| end))
        .bind(commit.request_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::NotPending(commit.request_id));
        }

        if let Some(correction) = &commit.correction {
            sqlx::query(UPSERT_CORRECTION)
                .bind(correction.employee_id)
                .bind(correction.date)
                .bind(correction.first_in)
                .bind(correction.last_out)
                .execute(&mut *tx)
                .await?;
            sqlx::query(REFRESH_WORK_SECONDS)
                .bind(correction.employee_id)
                .bind(correction.date)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
