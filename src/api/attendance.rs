use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::employee::EmployeeCategory;
use crate::model::remote_activity::RemoteActivity;
use crate::store::Store;
use crate::utils::time_format::format_time;
use crate::workflow::summary;
use actix_web::{HttpResponse, web};
use chrono::{Datelike, Local, NaiveDate, Timelike};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct RemoteActivityReq {
    #[schema(example = 7)]
    pub employee_id: u64,
    #[schema(example = "2024-03-11", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[serde(default)]
    pub answered_calls: u32,
    #[serde(default)]
    pub missed_calls: u32,
    /// Total talk time in seconds
    #[schema(example = 5400)]
    pub talk_seconds: u32,
}

#[derive(Deserialize, IntoParams)]
pub struct SummaryQuery {
    /// Defaults to the caller's own employee profile
    pub employee_id: Option<u64>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance",
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "message": "Checked in successfully",
            "first_in": "09:05"
        })),
        (status = 409, description = "Already checked in today", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 403, description = "No employee profile", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = auth.employee_id()?;
    let now = Local::now().naive_local();
    let at = now.time().with_nanosecond(0).unwrap_or(now.time());

    if !store.check_in(employee_id, now.date(), at).await? {
        return Err(ApiError::conflict(
            "already_checked_in",
            "Already checked in today",
        ));
    }

    info!(employee_id, "Checked in");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Checked in successfully",
        "first_in": format_time(&at)
    })))
}

/// Check-out endpoint
#[utoipa::path(
    put,
    path = "/api/attendance",
    responses(
        (status = 200, description = "Checked out successfully", body = Object, example = json!({
            "message": "Checked out successfully",
            "last_out": "18:40"
        })),
        (status = 400, description = "No check-in found for today", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 403, description = "No employee profile", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = auth.employee_id()?;
    let now = Local::now().naive_local();
    let at = now.time().with_nanosecond(0).unwrap_or(now.time());

    if !store.check_out(employee_id, now.date(), at).await? {
        return Err(ApiError::bad_request(
            "not_checked_in",
            "No check-in found for today",
        ));
    }

    info!(employee_id, "Checked out");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Checked out successfully",
        "last_out": format_time(&at)
    })))
}

/// Record a remote employee's call activity for a day
#[utoipa::path(
    post,
    path = "/api/attendance/remote",
    request_body = RemoteActivityReq,
    responses(
        (status = 200, description = "Activity stored with derived presence", body = RemoteActivity),
        (status = 400, description = "Employee is not remote", body = ErrorBody),
        (status = 403, description = "Forbidden", body = ErrorBody),
        (status = 404, description = "Employee not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn record_remote_activity(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    payload: web::Json<RemoteActivityReq>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let employee = store
        .find_employee(payload.employee_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("employee {} not found", payload.employee_id)))?;
    if employee.category != EmployeeCategory::Remote {
        return Err(ApiError::bad_request(
            "not_remote",
            "Call activity can only be recorded for remote employees",
        ));
    }

    let activity = RemoteActivity::new(
        employee.id,
        payload.date,
        payload.answered_calls,
        payload.missed_calls,
        payload.talk_seconds,
    );
    store.upsert_remote_activity(&activity).await?;

    info!(employee_id = employee.id, date = %activity.date, status = activity.status.as_ref(), "Remote activity recorded");
    Ok(HttpResponse::Ok().json(activity))
}

/// Monthly attendance summary
#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Totals for the month", body = MonthlySummary),
        (status = 400, description = "Invalid month", body = ErrorBody),
        (status = 403, description = "Forbidden", body = ErrorBody),
        (status = 404, description = "Employee not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn monthly_summary(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    query: web::Query<SummaryQuery>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = match query.employee_id {
        Some(id) => id,
        None => auth.employee_id()?,
    };
    auth.require_self_or_reviewer(employee_id)?;

    let today = Local::now().date_naive();
    let year = query.year.unwrap_or(today.year());
    let month = query.month.unwrap_or(today.month());

    let employee = store
        .find_employee(employee_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("employee {employee_id} not found")))?;

    match summary::monthly_summary(store.get_ref(), &employee, year, month).await? {
        Some(summary) => Ok(HttpResponse::Ok().json(summary)),
        None => Err(ApiError::bad_request(
            "invalid_date",
            format!("{year}-{month} is not a valid month"),
        )),
    }
}
