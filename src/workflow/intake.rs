use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use super::errors::{IntakeError, ValidationError};
use crate::model::leave_request::{NewLeaveRequest, RequestKind, span_days};
use crate::store::Store;
use crate::utils::time_format::{parse_date, parse_time};

/// A request as the employee sent it. Fields stay raw so every problem
/// surfaces as a typed [`ValidationError`] instead of a decoder message.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[schema(example = json!({
    "kind": "sick",
    "start_date": "2024-03-10",
    "end_date": "2024-03-11",
    "reason": "Flu",
    "document": "leave_documents/2024/03/5f0c.pdf"
}))]
pub struct Submission {
    /// sick | medical | annual | casual | early_leave | other
    #[schema(example = "sick")]
    pub kind: String,
    #[schema(example = "2024-03-10", format = "date")]
    pub start_date: Option<String>,
    /// Omit for a single day.
    #[schema(example = "2024-03-11", format = "date")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub reason: String,
    /// Reference returned by the document upload endpoint.
    pub document: Option<String>,
    #[schema(example = "11:00")]
    pub leaving_time: Option<String>,
    #[schema(example = "13:30")]
    pub return_time: Option<String>,
    pub destination: Option<String>,
    pub customer_name: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required_date(value: &Option<String>, field: &str) -> Result<NaiveDate, ValidationError> {
    let raw = non_blank(value)
        .ok_or_else(|| ValidationError::InvalidDate(format!("{field} is required")))?;
    parse_date(&raw)
        .map_err(|_| ValidationError::InvalidDate(format!("{field} '{raw}' is not YYYY-MM-DD")))
}

fn optional_time(
    value: &Option<String>,
    field: &'static str,
) -> Result<Option<NaiveTime>, ValidationError> {
    non_blank(value)
        .map(|raw| parse_time(&raw).map_err(|_| ValidationError::InvalidTime(field)))
        .transpose()
}

/// Pure validation of a submission into a pending request.
///
/// Order matters: kind, then document, then dates, so a sick or medical
/// request without a document always reports the missing document.
pub fn validate(
    employee_id: u64,
    submission: &Submission,
    now: DateTime<Utc>,
) -> Result<NewLeaveRequest, ValidationError> {
    let kind = RequestKind::from_str(&submission.kind.trim().to_lowercase())
        .map_err(|_| ValidationError::UnknownKind(submission.kind.clone()))?;

    let document = non_blank(&submission.document);
    if kind.requires_document() && document.is_none() {
        return Err(ValidationError::MissingDocument(kind.into()));
    }

    let start_date = required_date(&submission.start_date, "start_date")?;
    let end_date = match non_blank(&submission.end_date) {
        Some(_) => required_date(&submission.end_date, "end_date")?,
        None => start_date,
    };
    if end_date < start_date {
        return Err(ValidationError::InvalidDate(
            "end_date cannot be before start_date".into(),
        ));
    }

    let reason = submission.reason.trim().to_string();
    let (leaving_time, return_time, destination, customer_name) = if kind == RequestKind::EarlyLeave {
        if end_date != start_date {
            return Err(ValidationError::InvalidDate(
                "early leave covers a single day".into(),
            ));
        }
        let leaving_time = optional_time(&submission.leaving_time, "leaving_time")?
            .ok_or(ValidationError::MissingField("leaving_time"))?;
        let return_time = optional_time(&submission.return_time, "return_time")?;
        let destination =
            non_blank(&submission.destination).ok_or(ValidationError::MissingField("destination"))?;
        let customer_name = non_blank(&submission.customer_name)
            .ok_or(ValidationError::MissingField("customer_name"))?;
        (Some(leaving_time), return_time, Some(destination), Some(customer_name))
    } else {
        if reason.is_empty() {
            return Err(ValidationError::MissingReason);
        }
        (None, None, None, None)
    };

    Ok(NewLeaveRequest {
        employee_id,
        kind,
        start_date,
        end_date,
        reason,
        document,
        leaving_time,
        return_time,
        destination,
        customer_name,
        requested_days: span_days(start_date, end_date),
        created_at: now,
    })
}

/// Validates and persists a new `pending` request, returning its id.
#[instrument(skip(store, submission), fields(kind = %submission.kind))]
pub async fn submit(
    store: &dyn Store,
    requester_id: u64,
    submission: &Submission,
    now: DateTime<Utc>,
) -> Result<u64, IntakeError> {
    let request = validate(requester_id, submission, now).inspect_err(|e| {
        warn!(error = %e, "Rejected submission");
    })?;

    if store.find_employee(requester_id).await?.is_none() {
        return Err(IntakeError::UnknownEmployee(requester_id));
    }

    let id = store.insert_request(&request).await?;
    info!(request_id = id, days = request.requested_days, "Request submitted");
    Ok(id)
}
