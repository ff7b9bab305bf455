use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::store::StoreError;
use crate::workflow::{IntakeError, ValidationError, WorkflowError};

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({ "code": "not_pending", "message": "request 7 has already been decided" }))]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Display)]
#[display(fmt = "{}: {}", code, message)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, message)
    }

    /// Details stay in the log; clients only see a generic message.
    pub fn internal(context: &str, err: &dyn std::error::Error) -> Self {
        error!(error = %err, "{context}");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage_error",
            "Something went wrong, contact the system admin",
        )
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status).json(ErrorBody {
            code: self.code,
            message: self.message.clone(),
        })
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::bad_request(e.code(), e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(_) => ApiError::conflict("duplicate", e.to_string()),
            e => ApiError::internal("Storage failure", &e),
        }
    }
}

impl From<IntakeError> for ApiError {
    fn from(e: IntakeError) -> Self {
        match e {
            IntakeError::Invalid(v) => v.into(),
            IntakeError::UnknownEmployee(_) => {
                ApiError::new(StatusCode::FORBIDDEN, "unknown_employee", e.to_string())
            }
            IntakeError::Store(s) => s.into(),
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(e: WorkflowError) -> Self {
        let status = match &e {
            WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
            WorkflowError::NotPending(_) => StatusCode::CONFLICT,
            WorkflowError::NoAttendanceData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            WorkflowError::InvalidAdjustment => StatusCode::BAD_REQUEST,
            WorkflowError::Store(s) => return ApiError::internal("Storage failure", s),
        };
        ApiError::new(status, e.code(), e.to_string())
    }
}
