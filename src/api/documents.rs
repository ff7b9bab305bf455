use crate::auth::auth::AuthUser;
use crate::documents::LocalDocumentStorage;
use crate::error::ApiError;
use actix_web::{HttpResponse, web};
use chrono::Local;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams)]
pub struct UploadQuery {
    /// Original filename, used for its extension only
    pub filename: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    /// Reference to pass as `document` when submitting a request
    #[schema(example = "leave_documents/2024/03/0f8fad5b-d9cb-469f-a165-70867728950e.pdf")]
    pub document: String,
}

/// Upload a supporting document (raw request body)
#[utoipa::path(
    post,
    path = "/api/documents",
    params(UploadQuery),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "Stored", body = UploadResponse),
        (status = 400, description = "Empty upload", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn upload_document(
    auth: AuthUser,
    storage: web::Data<LocalDocumentStorage>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    auth.employee_id()?;

    if body.is_empty() {
        return Err(ApiError::bad_request("missing_document", "Uploaded document is empty"));
    }

    let document = storage
        .save(Local::now().date_naive(), query.filename.as_deref(), body)
        .await
        .map_err(|e| ApiError::internal("Failed to store document", &e))?;

    Ok(HttpResponse::Created().json(UploadResponse { document }))
}
