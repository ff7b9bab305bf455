use derive_more::Display;

use crate::store::StoreError;

/// Caller-correctable problems with a submitted request.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[display(fmt = "unknown request kind '{}'", _0)]
    UnknownKind(String),
    #[display(fmt = "{} requests require a supporting document", _0)]
    MissingDocument(&'static str),
    #[display(fmt = "invalid date: {}", _0)]
    InvalidDate(String),
    #[display(fmt = "a reason is required")]
    MissingReason,
    #[display(fmt = "missing required field '{}'", _0)]
    MissingField(&'static str),
    #[display(fmt = "invalid time for '{}', expected HH:MM", _0)]
    InvalidTime(&'static str),
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::UnknownKind(_) => "unknown_kind",
            ValidationError::MissingDocument(_) => "missing_document",
            ValidationError::InvalidDate(_) => "invalid_date",
            ValidationError::MissingReason => "missing_reason",
            ValidationError::MissingField(_) => "missing_field",
            ValidationError::InvalidTime(_) => "invalid_time",
        }
    }
}

#[derive(Debug, Display)]
pub enum IntakeError {
    #[display(fmt = "{}", _0)]
    Invalid(ValidationError),
    #[display(fmt = "employee {} does not exist", _0)]
    UnknownEmployee(u64),
    #[display(fmt = "{}", _0)]
    Store(StoreError),
}

impl std::error::Error for IntakeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IntakeError::Invalid(e) => Some(e),
            IntakeError::Store(e) => Some(e),
            IntakeError::UnknownEmployee(_) => None,
        }
    }
}

impl From<ValidationError> for IntakeError {
    fn from(e: ValidationError) -> Self {
        IntakeError::Invalid(e)
    }
}

impl From<StoreError> for IntakeError {
    fn from(e: StoreError) -> Self {
        IntakeError::Store(e)
    }
}

#[derive(Debug, Display)]
pub enum WorkflowError {
    #[display(fmt = "request {} not found", _0)]
    NotFound(u64),
    #[display(fmt = "request {} has already been decided", _0)]
    NotPending(u64),
    #[display(fmt = "no attendance data for employee {} on {}", employee_id, date)]
    NoAttendanceData {
        employee_id: u64,
        date: chrono::NaiveDate,
    },
    #[display(fmt = "adjusted start date must not be after end date")]
    InvalidAdjustment,
    #[display(fmt = "{}", _0)]
    Store(StoreError),
}

impl std::error::Error for WorkflowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorkflowError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotPending(id) => WorkflowError::NotPending(id),
            other => WorkflowError::Store(other),
        }
    }
}

impl WorkflowError {
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::NotFound(_) => "not_found",
            WorkflowError::NotPending(_) => "not_pending",
            WorkflowError::NoAttendanceData { .. } => "no_attendance_data",
            WorkflowError::InvalidAdjustment => "invalid_adjustment",
            WorkflowError::Store(_) => "storage_error",
        }
    }
}
