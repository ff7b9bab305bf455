use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::leave_request::{LeaveRequest, RequestKind, RequestStatus};
use crate::store::{RequestFilter, StatusCounts, Store};
use crate::workflow::{self, Decision, Submission};
use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, ToSchema)]
pub struct SubmittedResponse {
    #[schema(example = 1)]
    pub id: u64,
    pub status: RequestStatus,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct RequestQuery {
    /// Filter by employee ID
    #[schema(example = 123)]
    pub employee_id: Option<u64>,
    /// Filter by request status
    pub status: Option<RequestStatus>,
    /// Filter by request kind
    pub kind: Option<RequestKind>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u64>,
    /// Pagination per page number
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct RequestListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
    /// Totals across all requests, ignoring the filter.
    pub counts: StatusCounts,
}

/// Submit a leave or early-leave request for the caller
#[utoipa::path(
    post,
    path = "/api/requests",
    request_body = Submission,
    responses(
        (status = 201, description = "Request stored as pending", body = SubmittedResponse),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 403, description = "No employee profile", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn submit_request(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    payload: web::Json<Submission>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = auth.employee_id()?;
    let id = workflow::submit(store.get_ref(), employee_id, &payload, Utc::now()).await?;

    Ok(HttpResponse::Created().json(SubmittedResponse {
        id,
        status: RequestStatus::Pending,
    }))
}

/// Paginated request list with per-status counts
#[utoipa::path(
    get,
    path = "/api/requests",
    params(RequestQuery),
    responses(
        (status = 200, description = "Paginated request list", body = RequestListResponse),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 403, description = "Forbidden", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn list_requests(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    query: web::Query<RequestQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let query = query.into_inner();
    let filter = RequestFilter {
        employee_id: query.employee_id,
        status: query.status,
        kind: query.kind,
        page: query.page.unwrap_or(1).max(1),
        per_page: query.per_page.unwrap_or(10).clamp(1, 100),
    };

    let (data, total) = store.list_requests(&filter).await?;
    let counts = store.count_by_status().await?;

    Ok(HttpResponse::Ok().json(RequestListResponse {
        data,
        page: filter.page,
        per_page: filter.per_page,
        total,
        counts,
    }))
}

/// Review snapshot of a request with the requester's attendance for the day
#[utoipa::path(
    get,
    path = "/api/requests/{request_id}/review",
    params(("request_id" = u64, Path, description = "ID of the request to review")),
    responses(
        (status = 200, description = "Review snapshot", body = RequestSnapshot),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 403, description = "Forbidden", body = ErrorBody),
        (status = 404, description = "Request not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn review_request(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let snapshot = workflow::fetch_for_review(store.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

/// Approve or decline a pending request
#[utoipa::path(
    put,
    path = "/api/requests/{request_id}/decision",
    params(("request_id" = u64, Path, description = "ID of the request to decide")),
    request_body = Decision,
    responses(
        (status = 200, description = "Decision recorded", body = LeaveRequest),
        (status = 400, description = "Invalid adjustment", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 403, description = "Forbidden", body = ErrorBody),
        (status = 404, description = "Request not found", body = ErrorBody),
        (status = 409, description = "Request already decided", body = ErrorBody),
        (status = 422, description = "No attendance data for the day", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn decide_request(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    path: web::Path<u64>,
    decision: web::Json<Decision>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let request_id = path.into_inner();
    workflow::decide(store.get_ref(), request_id, &decision, Utc::now()).await?;

    let request = store
        .find_request(request_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("request {request_id} not found")))?;
    Ok(HttpResponse::Ok().json(request))
}
