use crate::config::Config;
use crate::error::ApiError;
use crate::model::role::Role;
use crate::models::TokenType;
use crate::auth::jwt::verify_token;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

/// Resolves the caller from a bearer access token.
pub fn authenticate(header: Option<&str>, secret: &str) -> Result<AuthUser, ApiError> {
    let token = header
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("Authorization header must start with Bearer"))?;

    let claims =
        verify_token(token, secret).map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;
    if claims.token_type != TokenType::Access {
        return Err(ApiError::unauthorized("Access token required"));
    }

    let role = Role::from_id(claims.role).ok_or_else(|| ApiError::unauthorized("Invalid role"))?;

    Ok(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role,
        employee_id: claims.employee_id,
    })
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let Some(config) = req.app_data::<Data<Config>>() else {
            return ready(Err(ApiError::unauthorized("Authentication is not configured")));
        };

        let header = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok());
        ready(authenticate(header, &config.jwt_secret))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::forbidden("Admin only"))
        }
    }

    pub fn require_hr_or_admin(&self) -> Result<(), ApiError> {
        if self.is_reviewer() {
            Ok(())
        } else {
            Err(ApiError::forbidden("HR/Admin only"))
        }
    }

    /// Admin and HR review requests and manage attendance.
    pub fn is_reviewer(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Hr)
    }

    pub fn employee_id(&self) -> Result<u64, ApiError> {
        self.employee_id
            .ok_or_else(|| ApiError::forbidden("No employee profile"))
    }

    /// Reviewers see everyone; other users only themselves.
    pub fn require_self_or_reviewer(&self, employee_id: u64) -> Result<(), ApiError> {
        if self.is_reviewer() || self.employee_id == Some(employee_id) {
            Ok(())
        } else {
            Err(ApiError::forbidden("Not allowed to view this employee"))
        }
    }
}
