use crate::auth::auth::AuthUser;
use crate::auth::password::hash_password;
use crate::error::ApiError;
use crate::model::employee::{Employee, EmployeeCategory, NewEmployee};
use crate::model::role::Role;
use crate::model::user::NewUser;
use crate::store::Store;
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    /// Only employees of this category
    pub category: Option<EmployeeCategory>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 10)]
    pub total: usize,
}

#[derive(Deserialize, ToSchema)]
pub struct AccountReq {
    #[schema(example = "amina")]
    pub username: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AccountResponse {
    #[schema(example = 12)]
    pub user_id: u64,
    #[schema(example = "amina")]
    pub username: String,
    #[schema(example = 1)]
    pub employee_id: u64,
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = NewEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 403, description = "Forbidden", body = ErrorBody)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    payload: web::Json<NewEmployee>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    if payload.name.trim().is_empty() {
        return Err(ApiError::bad_request("missing_field", "name is required"));
    }

    let id = store.insert_employee(&payload).await?;
    let employee = store
        .find_employee(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("employee {id} not found")))?;
    info!(employee_id = id, category = employee.category.as_ref(), "Employee created");

    Ok(HttpResponse::Created().json(employee))
}

/// Get a single employee
#[utoipa::path(
    get,
    path = "/api/employees/{id}",
    params(("id" = u64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 403, description = "Forbidden", body = ErrorBody),
        (status = 404, description = "Employee not found", body = ErrorBody)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    auth.require_self_or_reviewer(id)?;

    match store.find_employee(id).await? {
        Some(employee) => Ok(HttpResponse::Ok().json(employee)),
        None => Err(ApiError::not_found(format!("employee {id} not found"))),
    }
}

/// List employees
#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Employee list", body = EmployeeListResponse),
        (status = 403, description = "Forbidden", body = ErrorBody)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    query: web::Query<EmployeeQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let data = store.list_employees(query.category).await?;
    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        total: data.len(),
        data,
    }))
}

/// Create the login account of an employee
#[utoipa::path(
    post,
    path = "/api/employees/{id}/account",
    params(("id" = u64, Path, description = "Employee ID")),
    request_body = AccountReq,
    responses(
        (status = 201, description = "Account created", body = AccountResponse),
        (status = 400, description = "Username or password missing", body = ErrorBody),
        (status = 403, description = "Forbidden", body = ErrorBody),
        (status = 404, description = "Employee not found", body = ErrorBody),
        (status = 409, description = "Username already taken", body = ErrorBody)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_account(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    path: web::Path<u64>,
    payload: web::Json<AccountReq>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let employee_id = path.into_inner();
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request(
            "missing_field",
            "Username and password must not be empty",
        ));
    }

    store
        .find_employee(employee_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("employee {employee_id} not found")))?;

    let password_hash = hash_password(&payload.password)
        .map_err(|e| ApiError::internal("Failed to hash password", &e))?;
    let user_id = store
        .insert_user(&NewUser {
            username: username.to_string(),
            password_hash,
            role: Role::Employee,
            employee_id: Some(employee_id),
        })
        .await?;
    info!(user_id, employee_id, "Employee account created");

    Ok(HttpResponse::Created().json(AccountResponse {
        user_id,
        username: username.to_string(),
        employee_id,
    }))
}
