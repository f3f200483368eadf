use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use super::{ApprovalOutcome, DeductOutcome, LeaveStore};
use crate::error::{LeaveError, LeaveResult};
use crate::leave::accrual::{Entitlement, apply_grants, plan_accruals};
use crate::model::employee::{AdminStats, Employee, NewEmployee, UpdateEmployee};
use crate::model::leave::{
    LeaveAccrual, LeaveBalance, LeaveRequest, LeaveRequestFilter, LeaveStatus, LeaveType,
    NewLeaveRequest,
};

#[derive(Default)]
struct MemoryState {
    employees: BTreeMap<u64, Employee>,
    balances: BTreeMap<(u64, i32), LeaveBalance>,
    accruals: Vec<LeaveAccrual>,
    requests: BTreeMap<u64, LeaveRequest>,
    last_employee_id: u64,
    last_balance_id: u64,
    last_accrual_id: u64,
    last_request_id: u64,
}

fn next_id(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

impl MemoryState {
    fn deduct(
        &mut self,
        employee_id: u64,
        year: i32,
        leave_type: LeaveType,
        days: Decimal,
    ) -> DeductOutcome {
        let Some(balance) = self.balances.get_mut(&(employee_id, year)) else {
            return DeductOutcome::BalanceNotFound;
        };
        let available = balance.available(leave_type);
        if days > available {
            return DeductOutcome::Insufficient { available };
        }
        let remaining = available - days;
        balance.set_available(leave_type, remaining);
        DeductOutcome::Deducted { remaining }
    }

    /// Row for `year`, created empty; every year starts from a zero watermark.
    fn balance_for_update(&mut self, employee_id: u64, year: i32) -> &mut LeaveBalance {
        let last_balance_id = &mut self.last_balance_id;
        self.balances
            .entry((employee_id, year))
            .or_insert_with(|| LeaveBalance {
                id: next_id(last_balance_id),
                employee_id,
                year,
                casual_leave_balance: Decimal::ZERO,
                vacation_leave_balance: Decimal::ZERO,
                casual_leave_accrued: Decimal::ZERO,
                vacation_leave_accrued: Decimal::ZERO,
            })
    }
}

/// Process-local store with every operation serialized behind one lock.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> LeaveResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| LeaveError::Storage("in-memory store lock poisoned".into()))
    }
}

impl LeaveStore for MemoryStore {
    async fn get_employee(&self, id: u64) -> LeaveResult<Option<Employee>> {
        Ok(self.state()?.employees.get(&id).cloned())
    }

    async fn create_employee(&self, employee: &NewEmployee) -> LeaveResult<Employee> {
        let mut state = self.state()?;
        if state
            .employees
            .values()
            .any(|e| e.employee_code == employee.employee_code)
        {
            return Err(LeaveError::Conflict(format!(
                "employee code {} already exists",
                employee.employee_code
            )));
        }
        let id = next_id(&mut state.last_employee_id);
        let created = Employee {
            id,
            employee_code: employee.employee_code.clone(),
            first_name: employee.first_name.clone(),
            last_name: employee.last_name.clone(),
            email: employee.email.clone(),
            department: employee.department.clone(),
            position: employee.position.clone(),
            start_date: employee.start_date,
            status: "active".to_string(),
            is_admin: employee.is_admin,
        };
        state.employees.insert(id, created.clone());
        Ok(created)
    }

    async fn list_employees(&self, department: Option<&str>) -> LeaveResult<Vec<Employee>> {
        let state = self.state()?;
        let mut employees: Vec<Employee> = state
            .employees
            .values()
            .filter(|e| department.is_none_or(|d| e.department == d))
            .cloned()
            .collect();
        employees.sort_by(|a, b| {
            (&a.first_name, &a.last_name).cmp(&(&b.first_name, &b.last_name))
        });
        Ok(employees)
    }

    async fn update_employee(
        &self,
        id: u64,
        update: &UpdateEmployee,
    ) -> LeaveResult<Option<Employee>> {
        let mut state = self.state()?;
        let Some(employee) = state.employees.get_mut(&id) else {
            return Ok(None);
        };
        let update = update.clone();
        if let Some(first_name) = update.first_name {
            employee.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            employee.last_name = last_name;
        }
        if let Some(email) = update.email {
            employee.email = email;
        }
        if let Some(department) = update.department {
            employee.department = department;
        }
        if let Some(position) = update.position {
            employee.position = position;
        }
        if let Some(start_date) = update.start_date {
            employee.start_date = start_date;
        }
        if let Some(status) = update.status {
            employee.status = status;
        }
        if let Some(is_admin) = update.is_admin {
            employee.is_admin = is_admin;
        }
        Ok(Some(employee.clone()))
    }

    async fn admin_stats(&self, month_start: NaiveDate, today: NaiveDate) -> LeaveResult<AdminStats> {
        let state = self.state()?;
        let active = || state.employees.values().filter(|e| e.status == "active");
        let new_hires = active()
            .filter(|e| (month_start..=today).contains(&e.start_date))
            .count();
        let pending_approvals = state
            .requests
            .values()
            .filter(|r| r.status == LeaveStatus::Pending)
            .count();
        Ok(AdminStats {
            total_employees: active().count() as u64,
            new_hires: new_hires as u64,
            pending_approvals: pending_approvals as u64,
        })
    }

    async fn get_leave_balance(
        &self,
        employee_id: u64,
        year: i32,
    ) -> LeaveResult<Option<LeaveBalance>> {
        Ok(self.state()?.balances.get(&(employee_id, year)).cloned())
    }

    async fn reconcile_leave_balance(
        &self,
        employee_id: u64,
        year: i32,
        entitlement: &Entitlement,
        accrual_date: NaiveDate,
    ) -> LeaveResult<Vec<LeaveAccrual>> {
        let mut state = self.state()?;
        let balance = state.balance_for_update(employee_id, year);
        let grants = plan_accruals(balance, entitlement);
        apply_grants(balance, &grants);

        let mut created = Vec::with_capacity(grants.len());
        for grant in grants {
            let accrual = LeaveAccrual {
                id: next_id(&mut state.last_accrual_id),
                employee_id,
                accrual_type: grant.leave_type,
                accrual_amount: grant.amount,
                accrual_date,
                reason: grant.reason,
            };
            state.accruals.push(accrual.clone());
            created.push(accrual);
        }
        Ok(created)
    }

    async fn deduct_leave_balance(
        &self,
        employee_id: u64,
        year: i32,
        leave_type: LeaveType,
        days: Decimal,
    ) -> LeaveResult<DeductOutcome> {
        Ok(self.state()?.deduct(employee_id, year, leave_type, days))
    }

    async fn list_leave_accruals(&self, employee_id: u64) -> LeaveResult<Vec<LeaveAccrual>> {
        let state = self.state()?;
        Ok(state
            .accruals
            .iter()
            .rev()
            .filter(|a| a.employee_id == employee_id)
            .cloned()
            .collect())
    }

    async fn create_leave_request(
        &self,
        employee_id: u64,
        request: &NewLeaveRequest,
        days: Decimal,
        created_at: NaiveDateTime,
    ) -> LeaveResult<LeaveRequest> {
        let mut state = self.state()?;
        let id = next_id(&mut state.last_request_id);
        let created = LeaveRequest {
            id,
            employee_id,
            leave_type: request.leave_type,
            start_date: request.start_date,
            end_date: request.end_date,
            days,
            reason: request.reason.clone(),
            is_with_pay: request.is_with_pay,
            emergency_contact: request.emergency_contact.clone(),
            work_coverage: request.work_coverage.clone(),
            status: LeaveStatus::Pending,
            approver_id: None,
            response_date: None,
            created_at,
        };
        state.requests.insert(id, created.clone());
        Ok(created)
    }

    async fn get_leave_request(&self, id: u64) -> LeaveResult<Option<LeaveRequest>> {
        Ok(self.state()?.requests.get(&id).cloned())
    }

    async fn list_leave_requests(
        &self,
        filter: &LeaveRequestFilter,
    ) -> LeaveResult<Vec<LeaveRequest>> {
        let state = self.state()?;
        Ok(state
            .requests
            .values()
            .rev()
            .filter(|r| filter.employee_id.is_none_or(|id| r.employee_id == id))
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .cloned()
            .collect())
    }

    async fn approve_leave_request(
        &self,
        id: u64,
        approver_id: u64,
        year: i32,
        decided_at: NaiveDateTime,
    ) -> LeaveResult<ApprovalOutcome> {
        let mut state = self.state()?;
        let request = state
            .requests
            .get(&id)
            .cloned()
            .ok_or(LeaveError::LeaveRequestNotFound(id))?;
        if request.status != LeaveStatus::Pending {
            return Ok(ApprovalOutcome::NotPending(request.status));
        }

        if request.is_with_pay {
            match state.deduct(request.employee_id, year, request.leave_type, request.days) {
                DeductOutcome::Deducted { .. } => {}
                DeductOutcome::BalanceNotFound => return Ok(ApprovalOutcome::BalanceNotFound),
                DeductOutcome::Insufficient { available } => {
                    return Ok(ApprovalOutcome::Insufficient { available });
                }
            }
        }

        let approved = LeaveRequest {
            status: LeaveStatus::Approved,
            approver_id: Some(approver_id),
            response_date: Some(decided_at),
            ..request
        };
        state.requests.insert(id, approved.clone());
        Ok(ApprovalOutcome::Approved(approved))
    }

    async fn transition_leave_request(
        &self,
        id: u64,
        to: LeaveStatus,
        approver_id: Option<u64>,
        decided_at: NaiveDateTime,
    ) -> LeaveResult<bool> {
        let mut state = self.state()?;
        match state.requests.get_mut(&id) {
            Some(request) if request.status == LeaveStatus::Pending => {
                request.status = to;
                request.approver_id = approver_id;
                request.response_date = Some(decided_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
