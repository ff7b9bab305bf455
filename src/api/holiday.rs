use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::holiday::Holiday;
use crate::store::Store;
use crate::workflow::summary::month_bounds;
use actix_web::{HttpResponse, web};
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams)]
pub struct HolidayQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
    /// Whole year when omitted
    pub month: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct HolidayListResponse {
    pub data: Vec<Holiday>,
    #[schema(example = 3)]
    pub total: usize,
}

fn range_for(year: i32, month: Option<u32>) -> Option<(NaiveDate, NaiveDate)> {
    match month {
        Some(month) => month_bounds(year, month),
        None => Some((
            NaiveDate::from_ymd_opt(year, 1, 1)?,
            NaiveDate::from_ymd_opt(year, 12, 31)?,
        )),
    }
}

/// Add a holiday, or rename the one already on that date
#[utoipa::path(
    post,
    path = "/api/holidays",
    request_body = Holiday,
    responses(
        (status = 201, description = "Holiday stored", body = Holiday),
        (status = 400, description = "Name missing"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn create_holiday(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    payload: web::Json<Holiday>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let holiday = Holiday {
        date: payload.date,
        name: payload.name.trim().to_string(),
    };
    if holiday.name.is_empty() {
        return Err(ApiError::bad_request("missing_field", "name is required"));
    }

    store.upsert_holiday(&holiday).await?;
    info!(date = %holiday.date, name = %holiday.name, "Holiday stored");
    Ok(HttpResponse::Created().json(holiday))
}

/// Holidays of a year or month
#[utoipa::path(
    get,
    path = "/api/holidays",
    params(HolidayQuery),
    responses(
        (status = 200, description = "Holidays by date", body = HolidayListResponse),
        (status = 400, description = "Invalid month")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_holidays(
    _auth: AuthUser,
    store: web::Data<dyn Store>,
    query: web::Query<HolidayQuery>,
) -> Result<HttpResponse, ApiError> {
    let year = query.year.unwrap_or_else(|| Local::now().year());
    let (first, last) = range_for(year, query.month)
        .ok_or_else(|| ApiError::bad_request("invalid_date", "year or month out of range"))?;

    let data = store.holidays_between(first, last).await?;
    Ok(HttpResponse::Ok().json(HolidayListResponse {
        total: data.len(),
        data,
    }))
}

/// Remove a holiday
#[utoipa::path(
    delete,
    path = "/api/holidays/{date}",
    params(("date" = String, Path, description = "Holiday date, YYYY-MM-DD")),
    responses(
        (status = 204, description = "Removed"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "No holiday on that date")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn delete_holiday(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    path: web::Path<NaiveDate>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let date = path.into_inner();
    if !store.delete_holiday(date).await? {
        return Err(ApiError::not_found(format!("no holiday on {date}")));
    }
    info!(%date, "Holiday removed");
    Ok(HttpResponse::NoContent().finish())
}
