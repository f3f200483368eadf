use crate::{
    auth::user::AuthUser,
    leave::{AppService, LeaveValidation, StatusChange, SubmitOutcome},
    model::leave::{
        LeaveAccrual, LeaveBalance, LeaveRequest, LeaveRequestFilter, LeaveType,
        NewLeaveRequest,
    },
    storage::{ApprovalOutcome, DeductOutcome},
};
use actix_web::{HttpResponse, Responder, web};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LeaveDays {
    #[schema(example = "vacation")]
    pub leave_type: LeaveType,
    #[schema(example = "3", value_type = String)]
    pub days: Decimal,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub total: usize,
}

#[derive(Serialize, ToSchema)]
pub struct AccrualListResponse {
    pub data: Vec<LeaveAccrual>,
    #[schema(example = 2)]
    pub total: usize,
}

fn decided(message: &str, request: &LeaveRequest) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": message,
        "request": request
    }))
}

fn refused(message: impl Into<String>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": false,
        "message": message.into()
    }))
}

fn status_change(change: StatusChange, message: &str) -> HttpResponse {
    match change {
        StatusChange::Changed(request) => decided(message, &request),
        StatusChange::NotPending(status) => {
            refused(format!("Leave request is already {status}"))
        }
    }
}

/* =========================
Self-service
========================= */

/// Current year's balance for the caller, reconciled against earned entitlement
#[utoipa::path(
    get,
    path = "/api/leave/balance",
    responses(
        (status = 200, description = "Up-to-date leave balance", body = LeaveBalance),
        (status = 400, description = "Hire date is in the future"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 404, description = "Employee not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn my_balance(
    auth: AuthUser,
    service: web::Data<AppService>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;
    let balance = service.leave_balance(employee_id).await?;
    Ok(HttpResponse::Ok().json(balance))
}

/// Accrual history for the caller, newest first
#[utoipa::path(
    get,
    path = "/api/leave/accruals",
    responses(
        (status = 200, description = "Accrual ledger", body = AccrualListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn my_accruals(
    auth: AuthUser,
    service: web::Data<AppService>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;
    let data = service.accrual_history(employee_id).await?;
    let total = data.len();
    Ok(HttpResponse::Ok().json(AccrualListResponse { data, total }))
}

/// Check a prospective request against the caller's balance without deducting
#[utoipa::path(
    post,
    path = "/api/leave/validate",
    request_body = LeaveDays,
    responses(
        (status = 200, description = "Validation result; `valid` is false when the balance does not cover it", body = LeaveValidation),
        (status = 400, description = "Days must be positive with at most two decimals"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn validate_leave(
    auth: AuthUser,
    service: web::Data<AppService>,
    payload: web::Json<LeaveDays>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;
    let validation = service
        .validate_leave_request(employee_id, payload.leave_type, payload.days)
        .await?;
    Ok(HttpResponse::Ok().json(validation))
}

#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveRequestFilter),
    responses(
        (status = 200, description = "Caller's leave requests, newest first", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn my_leave_requests(
    auth: AuthUser,
    service: web::Data<AppService>,
    query: web::Query<LeaveRequestFilter>,
) -> actix_web::Result<impl Responder> {
    // employee_id in the query is ignored; callers only see their own
    let filter = LeaveRequestFilter {
        employee_id: Some(auth.employee_id()?),
        ..query.into_inner()
    };
    let data = service.leave_requests(&filter).await?;
    let total = data.len();
    Ok(HttpResponse::Ok().json(LeaveListResponse { data, total }))
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = NewLeaveRequest,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = Object, example = json!({
            "message": "Leave request submitted",
            "request": { "id": 1, "status": "pending", "days": "3" }
        })),
        (status = 200, description = "Rejected by the balance check; nothing stored", body = Object, example = json!({
            "success": false,
            "message": "Insufficient casual leave balance. Available: 2 days, Requested: 3 days"
        })),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn submit_leave(
    auth: AuthUser,
    service: web::Data<AppService>,
    payload: web::Json<NewLeaveRequest>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;

    match service
        .submit_leave_request(employee_id, payload.into_inner())
        .await?
    {
        SubmitOutcome::Submitted(request) => Ok(HttpResponse::Created().json(json!({
            "message": "Leave request submitted",
            "request": request
        }))),
        SubmitOutcome::Rejected(validation) => Ok(refused(validation.message)),
    }
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/cancel",
    params(
        ("leave_id" = u64, Path, description = "ID of the caller's leave request")
    ),
    responses(
        (status = 200, description = "Cancelled, or `success: false` when no longer pending", body = Object, example = json!({
            "success": true,
            "message": "Leave cancelled"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Request belongs to someone else"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;
    let change = service
        .cancel_leave_request(path.into_inner(), employee_id)
        .await?;
    Ok(status_change(change, "Leave cancelled"))
}

/* =========================
Admin
========================= */

#[utoipa::path(
    post,
    path = "/api/admin/employees/{employee_id}/leave/accruals",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Ledger rows appended by this run (empty when nothing grew)", body = AccrualListResponse),
        (status = 400, description = "Hire date is in the future"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn process_accruals(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let data = service.process_leave_accruals(path.into_inner()).await?;
    let total = data.len();
    Ok(HttpResponse::Ok().json(AccrualListResponse { data, total }))
}

#[utoipa::path(
    post,
    path = "/api/admin/employees/{employee_id}/leave/deduct",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    request_body = LeaveDays,
    responses(
        (status = 200, description = "Deduction result", body = Object, example = json!({
            "success": false,
            "message": "Insufficient leave balance",
            "available": "3"
        })),
        (status = 400, description = "Days must be positive with at most two decimals"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn deduct_leave(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<u64>,
    payload: web::Json<LeaveDays>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let outcome = service
        .deduct_leave_balance(path.into_inner(), payload.leave_type, payload.days)
        .await?;

    let body = match outcome {
        DeductOutcome::Deducted { remaining } => json!({
            "success": true,
            "message": "Leave deducted",
            "remaining": remaining
        }),
        DeductOutcome::BalanceNotFound => json!({
            "success": false,
            "message": "Leave balance not found"
        }),
        DeductOutcome::Insufficient { available } => json!({
            "success": false,
            "message": "Insufficient leave balance",
            "available": available
        }),
    };
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    get,
    path = "/api/admin/leave",
    params(LeaveRequestFilter),
    responses(
        (status = 200, description = "Leave requests, newest first", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    service: web::Data<AppService>,
    query: web::Query<LeaveRequestFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let data = service.leave_requests(&query).await?;
    let total = data.len();
    Ok(HttpResponse::Ok().json(LeaveListResponse { data, total }))
}

/* =========================
Approve leave (Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/admin/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Approved, or `success: false` with the reason", body = Object, example = json!({
            "success": true,
            "message": "Leave approved"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let approver_id = auth.employee_id()?;

    let outcome = service
        .approve_leave_request(path.into_inner(), approver_id)
        .await?;

    Ok(match outcome {
        ApprovalOutcome::Approved(request) => decided("Leave approved", &request),
        ApprovalOutcome::NotPending(status) => {
            refused(format!("Leave request is already {status}"))
        }
        ApprovalOutcome::BalanceNotFound => refused("Leave balance not found"),
        ApprovalOutcome::Insufficient { available } => refused(format!(
            "Insufficient leave balance. Available: {} days",
            available.normalize()
        )),
    })
}

/* =========================
Deny leave (Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/admin/leave/{leave_id}/deny",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to deny")
    ),
    responses(
        (status = 200, description = "Denied, or `success: false` when no longer pending", body = Object, example = json!({
            "success": true,
            "message": "Leave denied"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn deny_leave(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let approver_id = auth.employee_id()?;

    let change = service
        .deny_leave_request(path.into_inner(), approver_id)
        .await?;
    Ok(status_change(change, "Leave denied"))
}
