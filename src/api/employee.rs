use crate::{
    auth::user::AuthUser,
    leave::AppService,
    model::employee::{AdminStats, Employee, NewEmployee, ProfileUpdate, UpdateEmployee},
};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct EmployeeQuery {
    #[schema(example = "Engineering")]
    /// Filter by department (exact match)
    pub department: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub total: usize,
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/admin/employees",
    request_body = NewEmployee,
    responses(
        (status = 201, description = "Employee created successfully", body = Employee),
        (status = 400, description = "Missing or malformed field", body = Object, example = json!({
            "message": "invalid input: first_name is required"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Employee code already exists")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    service: web::Data<AppService>,
    payload: web::Json<NewEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let employee = service.register_employee(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(employee))
}

#[utoipa::path(
    get,
    path = "/api/admin/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Employees ordered by name", body = EmployeeListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    service: web::Data<AppService>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    debug!(department = ?query.department, "Listing employees");
    let data = service.employees(query.department.as_deref()).await?;
    let total = data.len();

    Ok(HttpResponse::Ok().json(EmployeeListResponse { data, total }))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/admin/employees/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "employee 42 not found"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let employee = service.employee(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/admin/employees/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated successfully", body = Employee),
        (status = 400, description = "No fields or a malformed field", body = Object, example = json!({
            "message": "invalid input: no fields provided for update"
        })),
        (status = 404, description = "Employee not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<u64>,
    payload: web::Json<UpdateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let employee = service
        .update_employee(path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Own employee profile
#[utoipa::path(
    get,
    path = "/api/employees/me",
    responses(
        (status = 200, description = "Caller's employee record", body = Employee),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Token has no employee profile")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn my_profile(
    auth: AuthUser,
    service: web::Data<AppService>,
) -> actix_web::Result<impl Responder> {
    let employee = service.employee(auth.employee_id()?).await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Update own name or email
#[utoipa::path(
    put,
    path = "/api/employees/me",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Profile updated", body = Employee),
        (status = 400, description = "Unknown field or malformed value"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Token has no employee profile")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_my_profile(
    auth: AuthUser,
    service: web::Data<AppService>,
    payload: web::Json<ProfileUpdate>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;

    let employee = service
        .update_profile(employee_id, payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Admin dashboard counts
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Headcount, new hires this month and pending approvals", body = AdminStats),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn admin_stats(
    auth: AuthUser,
    service: web::Data<AppService>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let stats = service.admin_stats().await?;
    Ok(HttpResponse::Ok().json(stats))
}
