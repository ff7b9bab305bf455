use crate::auth::auth::authenticate;
use crate::config::Config;
use crate::error::ApiError;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use tracing::debug;

/// Authenticates every request under the protected scope and stashes the
/// caller in the request extensions for the [`AuthUser`](crate::auth::auth::AuthUser) extractor.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    let user = match authenticate(header, &config.jwt_secret) {
        Ok(user) => user,
        Err(e) => return Ok(reject(req, e)),
    };

    debug!(user_id = user.user_id, role = user.role.id(), "Authenticated");
    req.extensions_mut().insert(user);

    next.call(req).await
}

fn reject(req: ServiceRequest, err: ApiError) -> ServiceResponse<BoxBody> {
    req.into_response(err.error_response())
}
