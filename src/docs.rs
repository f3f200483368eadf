use crate::api::employee::{EmployeeListResponse, EmployeeQuery};
use crate::api::leave::{AccrualListResponse, LeaveDays, LeaveListResponse};
use crate::leave::LeaveValidation;
use crate::model::employee::{AdminStats, Employee, NewEmployee, ProfileUpdate, UpdateEmployee};
use crate::model::leave::{
    LeaveAccrual, LeaveBalance, LeaveRequest, LeaveRequestFilter, LeaveStatus, LeaveType,
    NewLeaveRequest,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

/// Registers the `bearer_auth` scheme the paths refer to.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Leave API",
        version = "1.0.0",
        description = r#"
## Leave Accrual & Balance Service

Employees earn **casual** leave (one day per twenty working days) and **vacation**
leave (five days per completed quarter) from their hire date. Balances are
reconciled against earned entitlement before every balance-dependent operation,
and every increase is recorded in an append-only accrual ledger.

### Security
All endpoints under `/api` require a **JWT Bearer** token issued by the identity
provider. Endpoints under `/api/admin` additionally require the `admin` role.

### Response Format
Business-rule failures (insufficient balance, request no longer pending) are
returned as `200` with `success`/`valid` set to `false` and a readable message.
"#,
    ),
    paths(
        crate::api::leave::my_balance,
        crate::api::leave::my_accruals,
        crate::api::leave::validate_leave,
        crate::api::leave::my_leave_requests,
        crate::api::leave::submit_leave,
        crate::api::leave::cancel_leave,
        crate::api::leave::process_accruals,
        crate::api::leave::deduct_leave,
        crate::api::leave::leave_list,
        crate::api::leave::approve_leave,
        crate::api::leave::deny_leave,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::my_profile,
        crate::api::employee::update_my_profile,
        crate::api::employee::admin_stats
    ),
    components(
        schemas(
            LeaveType,
            LeaveStatus,
            LeaveBalance,
            LeaveAccrual,
            LeaveRequest,
            NewLeaveRequest,
            LeaveRequestFilter,
            LeaveValidation,
            LeaveDays,
            LeaveListResponse,
            AccrualListResponse,
            Employee,
            NewEmployee,
            EmployeeQuery,
            EmployeeListResponse,
            UpdateEmployee,
            ProfileUpdate,
            AdminStats
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave balance, accrual and request APIs"),
        (name = "Employee", description = "Employee management APIs"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_leave_paths_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/leave/validate"));
        assert!(doc.paths.paths.contains_key("/api/admin/leave/{leave_id}/approve"));
        assert!(doc.paths.paths.contains_key("/api/employees/me"));
        assert!(doc.paths.paths.contains_key("/api/admin/stats"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
