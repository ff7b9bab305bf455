use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use tracing::instrument;
use utoipa::ToSchema;

use crate::model::{
    attendance::AttendanceRecord,
    employee::{Employee, EmployeeCategory},
    holiday::Holiday,
    remote_activity::{PresenceStatus, RemoteActivity},
};
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MonthlySummary {
    pub employee_id: u64,
    pub category: EmployeeCategory,
    pub year: i32,
    pub month: u32,
    /// Days with attendance evidence: recorded times on site, call activity remotely.
    pub working_days: u32,
    /// Working days that were neither late nor short (on site) or rated present (remote).
    pub present_days: u32,
    /// Arrivals after the shift start. Always zero for remote staff.
    pub late_days: u32,
    /// Departures before the shift end, or remote days rated half day.
    pub half_days: u32,
    /// Workdays without evidence.
    pub leave_days: u32,
    /// Custom holidays falling on a workday of the month.
    pub holidays: u32,
}

/// First and last day of a calendar month, `None` for an invalid month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next.pred_opt()?))
}

/// Days of a month on which attendance is expected: not Sunday, not a holiday.
#[derive(Debug, Clone)]
pub struct WorkCalendar {
    first: NaiveDate,
    last: NaiveDate,
    holidays: BTreeSet<NaiveDate>,
}

impl WorkCalendar {
    pub fn new(first: NaiveDate, last: NaiveDate, holidays: &[Holiday]) -> Self {
        Self {
            first,
            last,
            holidays: holidays.iter().map(|h| h.date).collect(),
        }
    }

    pub fn is_workday(&self, date: NaiveDate) -> bool {
        date.weekday() != Weekday::Sun && !self.holidays.contains(&date)
    }

    pub fn workdays(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.first
            .iter_days()
            .take_while(|d| *d <= self.last)
            .filter(|d| self.is_workday(*d))
    }

    fn holidays_on_workdays(&self) -> u32 {
        self.holidays
            .iter()
            .filter(|d| **d >= self.first && **d <= self.last && d.weekday() != Weekday::Sun)
            .count() as u32
    }

    fn leave_days(&self, worked: &BTreeSet<NaiveDate>) -> u32 {
        self.workdays().filter(|d| !worked.contains(d)).count() as u32
    }
}

pub fn summarize_on_site(
    employee: &Employee,
    year: i32,
    month: u32,
    calendar: &WorkCalendar,
    records: &[AttendanceRecord],
) -> MonthlySummary {
    let (shift_start, shift_end) = employee.shift();
    let worked: Vec<&AttendanceRecord> = records.iter().filter(|r| r.has_data()).collect();

    let late = |r: &AttendanceRecord| r.first_in.is_some_and(|t| t > shift_start);
    let short = |r: &AttendanceRecord| r.last_out.is_some_and(|t| t < shift_end);

    MonthlySummary {
        employee_id: employee.id,
        category: employee.category,
        year,
        month,
        working_days: worked.len() as u32,
        present_days: worked.iter().filter(|r| !late(**r) && !short(**r)).count() as u32,
        late_days: worked.iter().filter(|r| late(**r)).count() as u32,
        half_days: worked.iter().filter(|r| short(**r)).count() as u32,
        leave_days: calendar.leave_days(&worked.iter().map(|r| r.date).collect()),
        holidays: calendar.holidays_on_workdays(),
    }
}

pub fn summarize_remote(
    employee: &Employee,
    year: i32,
    month: u32,
    calendar: &WorkCalendar,
    activity: &[RemoteActivity],
) -> MonthlySummary {
    let rated = |status: PresenceStatus| activity.iter().filter(|a| a.status == status).count() as u32;

    MonthlySummary {
        employee_id: employee.id,
        category: employee.category,
        year,
        month,
        working_days: activity.len() as u32,
        present_days: rated(PresenceStatus::Present),
        late_days: 0,
        half_days: rated(PresenceStatus::HalfDay),
        leave_days: calendar.leave_days(&activity.iter().map(|a| a.date).collect()),
        holidays: calendar.holidays_on_workdays(),
    }
}

/// Monthly attendance totals; `None` when `month` is out of range.
#[instrument(skip(store, employee), fields(employee_id = employee.id))]
pub async fn monthly_summary(
    store: &dyn Store,
    employee: &Employee,
    year: i32,
    month: u32,
) -> Result<Option<MonthlySummary>, StoreError> {
    let Some((first, last)) = month_bounds(year, month) else {
        return Ok(None);
    };
    let calendar = WorkCalendar::new(first, last, &store.holidays_between(first, last).await?);

    let summary = match employee.category {
        EmployeeCategory::OnSite => {
            let records = store.attendance_between(employee.id, first, last).await?;
            summarize_on_site(employee, year, month, &calendar, &records)
        }
        EmployeeCategory::Remote => {
            let activity = store.remote_activity_between(employee.id, first, last).await?;
            summarize_remote(employee, year, month, &calendar, &activity)
        }
    };
    Ok(Some(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::employee::NewEmployee;
    use crate::store::memory::MemoryStore;
    use chrono::NaiveTime;
    use rstest::rstest;

    fn t(h: u32, m: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, m, 0)
    }

    fn march(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn employee(category: EmployeeCategory) -> Employee {
        Employee {
            id: 3,
            name: "Sara".into(),
            email: None,
            category,
            is_active: true,
            shift_start: None,
            shift_end: None,
        }
    }

    fn row(day: u32, first_in: Option<NaiveTime>, last_out: Option<NaiveTime>) -> AttendanceRecord {
        let mut record = AttendanceRecord::empty(3, march(day));
        record.apply_correction(first_in, last_out);
        record
    }

    fn calendar(holidays: &[Holiday]) -> WorkCalendar {
        let (first, last) = month_bounds(2024, 3).unwrap();
        WorkCalendar::new(first, last, holidays)
    }

    fn holiday(day: u32) -> Holiday {
        Holiday {
            date: march(day),
            name: "Independence Day".into(),
        }
    }

    #[rstest]
    #[case(2024, 2, 29)]
    #[case(2023, 2, 28)]
    #[case(2024, 12, 31)]
    fn month_bounds_end_on_the_last_day(#[case] year: i32, #[case] month: u32, #[case] last: u32) {
        let (first, end) = month_bounds(year, month).unwrap();
        assert_eq!(first.day(), 1);
        assert_eq!(end, NaiveDate::from_ymd_opt(year, month, last).unwrap());
    }

    #[test]
    fn month_bounds_rejects_month_thirteen() {
        assert_eq!(month_bounds(2024, 13), None);
    }

    #[test]
    fn counts_late_half_and_leave_days() {
        let records = vec![
            row(4, t(9, 55), t(19, 5)),
            row(5, t(10, 20), t(19, 0)),
            row(6, t(9, 50), t(15, 0)),
            row(7, None, None),
        ];

        let summary =
            summarize_on_site(&employee(EmployeeCategory::OnSite), 2024, 3, &calendar(&[]), &records);
        assert_eq!(summary.working_days, 3);
        assert_eq!(summary.present_days, 1);
        assert_eq!(summary.late_days, 1);
        assert_eq!(summary.half_days, 1);
        // March 2024 has 31 days, 5 of them Sundays.
        assert_eq!(summary.leave_days, 23);
    }

    #[test]
    fn uses_the_employee_shift_when_set() {
        let mut emp = employee(EmployeeCategory::OnSite);
        emp.shift_start = t(9, 0);
        emp.shift_end = t(17, 0);

        let summary = summarize_on_site(&emp, 2024, 3, &calendar(&[]), &[row(4, t(9, 30), t(17, 30))]);
        assert_eq!(summary.late_days, 1);
        assert_eq!(summary.half_days, 0);
    }

    #[rstest]
    // Tuesday
    #[case(26, 25, 1)]
    // Sunday is already off
    #[case(31, 26, 0)]
    fn holidays_are_not_leave(#[case] day: u32, #[case] leave_days: u32, #[case] holidays: u32) {
        let summary = summarize_on_site(
            &employee(EmployeeCategory::OnSite),
            2024,
            3,
            &calendar(&[holiday(day)]),
            &[],
        );
        assert_eq!(summary.leave_days, leave_days);
        assert_eq!(summary.holidays, holidays);
    }

    #[test]
    fn work_on_a_holiday_counts_without_reducing_leave() {
        let summary = summarize_on_site(
            &employee(EmployeeCategory::OnSite),
            2024,
            3,
            &calendar(&[holiday(26)]),
            &[row(26, t(9, 0), t(19, 0))],
        );
        assert_eq!(summary.working_days, 1);
        assert_eq!(summary.leave_days, 25);
    }

    #[test]
    fn remote_days_come_from_call_activity() {
        let activity = vec![
            RemoteActivity::new(3, march(11), 10, 0, 6000),
            RemoteActivity::new(3, march(12), 4, 1, 50 * 60),
            RemoteActivity::new(3, march(13), 0, 3, 0),
        ];
        let summary =
            summarize_remote(&employee(EmployeeCategory::Remote), 2024, 3, &calendar(&[]), &activity);
        assert_eq!(summary.working_days, 3);
        assert_eq!(summary.present_days, 1);
        assert_eq!(summary.half_days, 1);
        assert_eq!(summary.late_days, 0);
        assert_eq!(summary.leave_days, 23);
    }

    #[actix_web::test]
    async fn monthly_summary_reads_remote_activity_and_holidays() {
        let store = MemoryStore::new();
        let id = store
            .insert_employee(&NewEmployee {
                name: "Omar".into(),
                email: None,
                category: EmployeeCategory::Remote,
                shift_start: None,
                shift_end: None,
            })
            .await
            .unwrap();
        for day in 11..=15 {
            store
                .upsert_remote_activity(&RemoteActivity::new(id, march(day), 10, 0, 6000))
                .await
                .unwrap();
        }
        store.upsert_holiday(&holiday(26)).await.unwrap();
        let emp = store.find_employee(id).await.unwrap().unwrap();

        let summary = monthly_summary(&store, &emp, 2024, 3).await.unwrap().unwrap();
        assert_eq!(summary.category, EmployeeCategory::Remote);
        assert_eq!(summary.working_days, 5);
        assert_eq!(summary.present_days, 5);
        assert_eq!(summary.holidays, 1);
        // 26 workdays, minus the holiday, minus 5 active days
        assert_eq!(summary.leave_days, 20);
    }

    #[actix_web::test]
    async fn monthly_summary_is_none_for_an_invalid_month() {
        let store = MemoryStore::new();
        let emp = employee(EmployeeCategory::OnSite);
        assert_eq!(monthly_summary(&store, &emp, 2024, 0).await.unwrap(), None);
    }
}
