use crate::{
    auth::{
        jwt::{Subject, generate_access_token, generate_refresh_token, verify_token},
        password::verify_password,
    },
    config::Config,
    error::ApiError,
    models::{Claims, LoginReqDto, TokenPair, TokenType},
    store::Store,
};
use actix_web::{HttpRequest, HttpResponse, web};
use tracing::{debug, info, instrument, warn};

async fn issue_pair(
    store: &dyn Store,
    subject: &Subject,
    config: &Config,
) -> Result<TokenPair, ApiError> {
    let access_token =
        generate_access_token(subject, &config.jwt_secret, config.access_token_ttl)
            .map_err(|e| ApiError::internal("Failed to sign access token", &e))?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(|e| ApiError::internal("Failed to sign refresh token", &e))?;

    debug!(user_id = subject.user_id, jti = %refresh_claims.jti, "Storing refresh token");
    store
        .save_refresh_token(subject.user_id, &refresh_claims.jti, refresh_claims.exp as i64)
        .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

fn bearer_refresh_claims(req: &HttpRequest, secret: &str) -> Option<Claims> {
    let token = req
        .headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;
    verify_token(token, secret)
        .ok()
        .filter(|claims| claims.token_type == TokenType::Refresh)
}

/// Exchange credentials for an access and refresh token
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Tokens issued", body = TokenPair),
        (status = 400, description = "Username or password missing", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(store, config, user), fields(username = %user.username))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    store: web::Data<dyn Store>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        return Err(ApiError::bad_request(
            "missing_field",
            "Username or password required",
        ));
    }

    let account = match store.find_user(user.username.trim()).await? {
        Some(account) if account.is_active => account,
        _ => {
            info!("Invalid credentials: unknown or inactive user");
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
    };

    if let Err(e) = verify_password(&user.password, &account.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let pair = issue_pair(store.get_ref(), &Subject::from(&account), &config).await?;
    info!(user_id = account.id, "Login successful");
    Ok(HttpResponse::Ok().json(pair))
}

/// Rotate a refresh token; the old one is revoked
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Refresh token missing, invalid or revoked", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let claims = bearer_refresh_claims(&req, &config.jwt_secret)
        .ok_or_else(|| ApiError::unauthorized("Refresh token required"))?;

    if !store.revoke_refresh_token(&claims.jti).await? {
        warn!(user_id = claims.user_id, "Refresh with unknown or revoked token");
        return Err(ApiError::unauthorized("Refresh token revoked"));
    }

    let pair = issue_pair(store.get_ref(), &Subject::from(&claims), &config).await?;
    Ok(HttpResponse::Ok().json(pair))
}

/// Revoke a refresh token. Always answers 204.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    if let Some(claims) = bearer_refresh_claims(&req, &config.jwt_secret) {
        store.revoke_refresh_token(&claims.jti).await?;
    }
    Ok(HttpResponse::NoContent().finish())
}
