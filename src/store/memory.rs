// In-memory implementation of the Store port.
//
// All state sits behind one RwLock, so every write method is atomic and
// concurrent decisions on a request serialize on the write guard.

use std::collections::{BTreeMap, HashMap};
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use tokio::sync::RwLock;

use super::{DecisionCommit, RequestFilter, StatusCounts, Store, StoreError};
use crate::model::{
    attendance::AttendanceRecord,
    employee::{Employee, EmployeeCategory, NewEmployee},
    holiday::Holiday,
    leave_request::{LeaveRequest, NewLeaveRequest, RequestStatus},
    remote_activity::RemoteActivity,
    user::{NewUser, UserAccount},
};

struct RefreshToken {
    revoked: bool,
}

#[derive(Default)]
struct State {
    users: HashMap<String, UserAccount>,
    refresh_tokens: HashMap<String, RefreshToken>,
    employees: BTreeMap<u64, Employee>,
    requests: BTreeMap<u64, LeaveRequest>,
    attendance: HashMap<(u64, NaiveDate), AttendanceRecord>,
    remote: HashMap<(u64, NaiveDate), RemoteActivity>,
    holidays: BTreeMap<NaiveDate, Holiday>,
    next_user_id: u64,
    next_employee_id: u64,
    next_request_id: u64,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    #[cfg(test)]
    fail_commits: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a raw attendance row, as the biometric import would.
    #[cfg(test)]
    pub async fn put_attendance(&self, record: AttendanceRecord) {
        self.state
            .write()
            .await
            .attendance
            .insert((record.employee_id, record.date), record);
    }

    /// Makes the next decision commits fail after validation, before any write.
    #[cfg(test)]
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user(&self, username: &str) -> Result<Option<UserAccount>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .users
            .get(&username.to_lowercase())
            .cloned())
    }

    async fn insert_user(&self, user: &NewUser) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        let key = user.username.to_lowercase();
        if state.users.contains_key(&key) {
            return Err(StoreError::Duplicate(format!("username '{}'", user.username)));
        }
        state.next_user_id += 1;
        let id = state.next_user_id;
        state.users.insert(
            key,
            UserAccount {
                id,
                username: user.username.clone(),
                password: user.password_hash.clone(),
                role_id: user.role.id(),
                employee_id: user.employee_id,
                is_active: true,
            },
        );
        Ok(id)
    }

    async fn save_refresh_token(
        &self,
        _user_id: u64,
        jti: &str,
        _expires_at: i64,
    ) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .refresh_tokens
            .insert(jti.to_string(), RefreshToken { revoked: false });
        Ok(())
    }

    async fn revoke_refresh_token(&self, jti: &str) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        match state.refresh_tokens.get_mut(jti) {
            Some(token) if !token.revoked => {
                token.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_employee(&self, employee: &NewEmployee) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        state.next_employee_id += 1;
        let id = state.next_employee_id;
        state.employees.insert(
            id,
            Employee {
                id,
                name: employee.name.clone(),
                email: employee.email.clone(),
                category: employee.category,
                is_active: true,
                shift_start: employee.shift_start,
                shift_end: employee.shift_end,
            },
        );
        Ok(id)
    }

    async fn find_employee(&self, id: u64) -> Result<Option<Employee>, StoreError> {
        Ok(self.state.read().await.employees.get(&id).cloned())
    }

    async fn list_employees(
        &self,
        category: Option<EmployeeCategory>,
    ) -> Result<Vec<Employee>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .employees
            .values()
            .filter(|e| category.is_none_or(|c| e.category == c))
            .cloned()
            .collect())
    }

    async fn insert_request(&self, request: &NewLeaveRequest) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        state.next_request_id += 1;
        let id = state.next_request_id;
        state.requests.insert(
            id,
            LeaveRequest {
                id,
                employee_id: request.employee_id,
                kind: request.kind,
                start_date: request.start_date,
                end_date: request.end_date,
                reason: request.reason.clone(),
                document: request.document.clone(),
                leaving_time: request.leaving_time,
                return_time: request.return_time,
                destination: request.destination.clone(),
                customer_name: request.customer_name.clone(),
                requested_days: request.requested_days,
                approved_days: None,
                admin_notes: None,
                status: RequestStatus::Pending,
                created_at: request.created_at,
                reviewed_at: None,
            },
        );
        Ok(id)
    }

    async fn find_request(&self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        Ok(self.state.read().await.requests.get(&id).cloned())
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<(Vec<LeaveRequest>, i64), StoreError> {
        let state = self.state.read().await;
        let mut matching: Vec<&LeaveRequest> = state
            .requests
            .values()
            .filter(|r| filter.employee_id.is_none_or(|id| r.employee_id == id))
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| filter.kind.is_none_or(|k| r.kind == k))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.per_page as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn count_by_status(&self) -> Result<StatusCounts, StoreError> {
        let state = self.state.read().await;
        let mut counts = StatusCounts::default();
        for request in state.requests.values() {
            match request.status {
                RequestStatus::Pending => counts.pending += 1,
                RequestStatus::Approved => counts.approved += 1,
                RequestStatus::Declined => counts.declined += 1,
            }
        }
        Ok(counts)
    }

    async fn find_attendance(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .attendance
            .get(&(employee_id, date))
            .cloned())
    }

    async fn attendance_between(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let state = self.state.read().await;
        let mut records: Vec<AttendanceRecord> = state
            .attendance
            .values()
            .filter(|r| r.employee_id == employee_id && r.date >= from && r.date <= to)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.date);
        Ok(records)
    }

    async fn check_in(
        &self,
        employee_id: u64,
        date: NaiveDate,
        at: NaiveTime,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let record = state
            .attendance
            .entry((employee_id, date))
            .or_insert_with(|| AttendanceRecord::empty(employee_id, date));
        if record.first_in.is_some() {
            return Ok(false);
        }
        record.apply_correction(Some(at), None);
        Ok(true)
    }

    async fn check_out(
        &self,
        employee_id: u64,
        date: NaiveDate,
        at: NaiveTime,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        match state.attendance.get_mut(&(employee_id, date)) {
            Some(record) if record.first_in.is_some() => {
                record.apply_correction(None, Some(at));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn upsert_remote_activity(&self, activity: &RemoteActivity) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .remote
            .insert((activity.employee_id, activity.date), activity.clone());
        Ok(())
    }

    async fn find_remote_activity(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<RemoteActivity>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .remote
            .get(&(employee_id, date))
            .cloned())
    }

    async fn remote_activity_between(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RemoteActivity>, StoreError> {
        let state = self.state.read().await;
        let mut activity: Vec<RemoteActivity> = state
            .remote
            .values()
            .filter(|a| a.employee_id == employee_id && a.date >= from && a.date <= to)
            .cloned()
            .collect();
        activity.sort_by_key(|a| a.date);
        Ok(activity)
    }

    async fn upsert_holiday(&self, holiday: &Holiday) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .holidays
            .insert(holiday.date, holiday.clone());
        Ok(())
    }

    async fn delete_holiday(&self, date: NaiveDate) -> Result<bool, StoreError> {
        Ok(self.state.write().await.holidays.remove(&date).is_some())
    }

    async fn holidays_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Holiday>, StoreError> {
        if from > to {
            return Ok(Vec::new());
        }
        Ok(self
            .state
            .read()
            .await
            .holidays
            .range(from..=to)
            .map(|(_, h)| h.clone())
            .collect())
    }

    async fn commit_decision(&self, commit: &DecisionCommit) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        let mut request = match state.requests.get(&commit.request_id) {
            Some(r) if r.status == RequestStatus::Pending => r.clone(),
            _ => return Err(StoreError::NotPending(commit.request_id)),
        };
        request.status = commit.status;
        request.reviewed_at = Some(commit.reviewed_at);
        request.admin_notes = commit.admin_notes.clone();
        request.approved_days = commit.approved_days;
        if let Some((start, end)) = commit.adjusted_range {
            request.start_date = start;
            request.end_date = end;
        }

        let attendance = commit.correction.as_ref().map(|c| {
            let mut record = state
                .attendance
                .get(&(c.employee_id, c.date))
                .cloned()
                .unwrap_or_else(|| AttendanceRecord::empty(c.employee_id, c.date));
            record.apply_correction(c.first_in, c.last_out);
            record
        });

        #[cfg(test)]
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        if let Some(record) = attendance {
            state
                .attendance
                .insert((record.employee_id, record.date), record);
        }
        state.requests.insert(request.id, request);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceCorrection;
    use crate::model::leave_request::RequestKind;
    use crate::model::role::Role;
    use chrono::{TimeZone, Utc};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn new_request(employee_id: u64, minute: u32) -> NewLeaveRequest {
        NewLeaveRequest {
            employee_id,
            kind: RequestKind::Annual,
            start_date: day(),
            end_date: day(),
            reason: "family".into(),
            document: None,
            leaving_time: None,
            return_time: None,
            destination: None,
            customer_name: None,
            requested_days: 1,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, minute, 0).unwrap(),
        }
    }

    fn approve(request_id: u64, correction: Option<AttendanceCorrection>) -> DecisionCommit {
        DecisionCommit {
            request_id,
            status: RequestStatus::Approved,
            reviewed_at: Utc.with_ymd_and_hms(2024, 3, 11, 9, 0, 0).unwrap(),
            admin_notes: None,
            approved_days: Some(1),
            adjusted_range: None,
            correction,
        }
    }

    #[actix_web::test]
    async fn it_should_list_newest_first_with_paging() {
        let store = MemoryStore::new();
        for minute in 0..5 {
            store.insert_request(&new_request(1, minute)).await.unwrap();
        }
        store.insert_request(&new_request(2, 9)).await.unwrap();

        let filter = RequestFilter {
            employee_id: Some(1),
            page: 1,
            per_page: 2,
            ..Default::default()
        };
        let (page, total) = store.list_requests(&filter).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.iter().map(|r| r.id).collect::<Vec<_>>(), vec![5, 4]);

        let last = RequestFilter { page: 3, ..filter };
        let (page, _) = store.list_requests(&last).await.unwrap();
        assert_eq!(page.len(), 1);
    }

    #[actix_web::test]
    async fn it_should_reject_a_second_commit() {
        let store = MemoryStore::new();
        let id = store.insert_request(&new_request(1, 0)).await.unwrap();
        store.commit_decision(&approve(id, None)).await.unwrap();

        let again = store.commit_decision(&approve(id, None)).await;
        assert!(matches!(again, Err(StoreError::NotPending(rid)) if rid == id));
        assert_eq!(store.count_by_status().await.unwrap().approved, 1);
    }

    #[actix_web::test]
    async fn it_should_create_then_patch_the_attendance_row() {
        let store = MemoryStore::new();
        let id = store.insert_request(&new_request(1, 0)).await.unwrap();
        let correction = AttendanceCorrection {
            employee_id: 1,
            date: day(),
            first_in: None,
            last_out: Some(t(13, 30)),
        };
        store
            .commit_decision(&approve(id, Some(correction)))
            .await
            .unwrap();

        let record = store.find_attendance(1, day()).await.unwrap().unwrap();
        assert_eq!(record.first_in, None);
        assert_eq!(record.last_out, Some(t(13, 30)));
    }

    #[actix_web::test]
    async fn it_should_leave_everything_untouched_when_the_commit_fails() {
        let store = MemoryStore::new();
        let id = store.insert_request(&new_request(1, 0)).await.unwrap();
        let before = AttendanceRecord {
            first_in: Some(t(9, 5)),
            ..AttendanceRecord::empty(1, day())
        };
        store.put_attendance(before.clone()).await;

        store.fail_commits(true);
        let correction = AttendanceCorrection {
            employee_id: 1,
            date: day(),
            first_in: Some(t(8, 0)),
            last_out: Some(t(17, 0)),
        };
        let result = store.commit_decision(&approve(id, Some(correction))).await;
        assert!(matches!(result, Err(StoreError::Database(_))));

        let request = store.find_request(id).await.unwrap().unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.reviewed_at, None);
        assert_eq!(store.find_attendance(1, day()).await.unwrap(), Some(before));
    }

    #[actix_web::test]
    async fn it_should_check_in_once_and_check_out_after() {
        let store = MemoryStore::new();
        assert!(!store.check_out(1, day(), t(18, 0)).await.unwrap());
        assert!(store.check_in(1, day(), t(9, 0)).await.unwrap());
        assert!(!store.check_in(1, day(), t(9, 30)).await.unwrap());
        assert!(store.check_out(1, day(), t(18, 0)).await.unwrap());

        let record = store.find_attendance(1, day()).await.unwrap().unwrap();
        assert_eq!(record.first_in, Some(t(9, 0)));
        assert_eq!(record.work_seconds, Some(9 * 3600));
    }

    #[actix_web::test]
    async fn it_should_refuse_a_taken_username() {
        let store = MemoryStore::new();
        let user = NewUser {
            username: "Amina".into(),
            password_hash: "hash".into(),
            role: Role::Employee,
            employee_id: Some(4),
        };
        let id = store.insert_user(&user).await.unwrap();

        let again = NewUser {
            username: "amina".into(),
            ..user
        };
        assert!(matches!(
            store.insert_user(&again).await,
            Err(StoreError::Duplicate(_))
        ));
        let found = store.find_user("AMINA").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.employee_id, Some(4));
    }

    #[actix_web::test]
    async fn it_should_list_holidays_inside_the_range() {
        let store = MemoryStore::new();
        for (day, name) in [(26, "Independence Day"), (31, "Eid"), (1, "Other")] {
            let month = if day == 1 { 4 } else { 3 };
            store
                .upsert_holiday(&Holiday {
                    date: NaiveDate::from_ymd_opt(2024, month, day).unwrap(),
                    name: name.into(),
                })
                .await
                .unwrap();
        }
        let first = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let last = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let names: Vec<String> = store
            .holidays_between(first, last)
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.name)
            .collect();
        assert_eq!(names, vec!["Independence Day", "Eid"]);

        assert!(store.delete_holiday(last).await.unwrap());
        assert!(!store.delete_holiday(last).await.unwrap());
    }

    #[actix_web::test]
    async fn it_should_rotate_refresh_tokens_once() {
        let store = MemoryStore::new();
        store.save_refresh_token(1, "jti-1", 0).await.unwrap();
        assert!(store.revoke_refresh_token("jti-1").await.unwrap());
        assert!(!store.revoke_refresh_token("jti-1").await.unwrap());
        assert!(!store.revoke_refresh_token("unknown").await.unwrap());
    }
}
