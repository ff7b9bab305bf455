use crate::api::attendance::RemoteActivityReq;
use crate::api::documents::UploadResponse;
use crate::api::employee::{AccountReq, AccountResponse, EmployeeListResponse, EmployeeQuery};
use crate::api::holiday::HolidayListResponse;
use crate::api::leave_request::{RequestListResponse, RequestQuery, SubmittedResponse};
use crate::error::ErrorBody;
use crate::model::attendance::AttendanceRecord;
use crate::model::employee::{Employee, EmployeeCategory, NewEmployee};
use crate::model::holiday::Holiday;
use crate::model::leave_request::{LeaveRequest, RequestKind, RequestStatus};
use crate::model::remote_activity::{PresenceStatus, RemoteActivity};
use crate::models::{LoginReqDto, TokenPair};
use crate::store::StatusCounts;
use crate::workflow::approval::{AttendanceView, Decision, RequestSnapshot};
use crate::workflow::intake::Submission;
use crate::workflow::summary::MonthlySummary;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Desk API",
        version = "1.0.0",
        description = r#"
## Attendance corrections and leave approvals

Employees submit leave and early-leave requests; HR and admins review each
request next to the attendance recorded for that day and approve or decline it.
Approving an on-site employee's request can correct the first-in and last-out
times of that day in the same transaction.

### Security
Everything under `/api` needs a JWT bearer access token from `/auth/login`.
Review, decision, employee, account and remote-activity endpoints are HR/Admin only;
holidays are managed by admins. Employees log in with accounts created through
`/api/employees/{id}/account`.

### Errors
Failures answer with `{"code": ..., "message": ...}`; `code` is stable.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::documents::upload_document,

        crate::api::leave_request::submit_request,
        crate::api::leave_request::list_requests,
        crate::api::leave_request::review_request,
        crate::api::leave_request::decide_request,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::record_remote_activity,
        crate::api::attendance::monthly_summary,
        crate::api::holiday::create_holiday,
        crate::api::holiday::list_holidays,
        crate::api::holiday::delete_holiday,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::create_account
    ),
    components(
        schemas(
            ErrorBody,
            LoginReqDto,
            TokenPair,
            UploadResponse,
            Submission,
            SubmittedResponse,
            RequestQuery,
            RequestListResponse,
            StatusCounts,
            LeaveRequest,
            RequestKind,
            RequestStatus,
            RequestSnapshot,
            AttendanceView,
            Decision,
            AttendanceRecord,
            RemoteActivity,
            RemoteActivityReq,
            PresenceStatus,
            MonthlySummary,
            Holiday,
            HolidayListResponse,
            Employee,
            EmployeeCategory,
            NewEmployee,
            EmployeeQuery,
            EmployeeListResponse,
            AccountReq,
            AccountResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Login and token rotation"),
        (name = "Requests", description = "Leave requests, review and decisions"),
        (name = "Attendance", description = "Check-in/out, remote activity, holidays and summaries"),
        (name = "Employee", description = "Employee management APIs"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
