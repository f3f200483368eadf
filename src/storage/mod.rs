//! Persistence for employees, balances, the accrual ledger and leave requests.
//!
//! Every method that reads a balance and writes it back is atomic inside the
//! store: MySQL runs it in one transaction with row locks or a conditional
//! update, the in-memory store under a single lock.

use std::future::Future;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::error::LeaveResult;
use crate::leave::accrual::Entitlement;
use crate::model::employee::{AdminStats, Employee, NewEmployee, UpdateEmployee};
use crate::model::leave::{
    LeaveAccrual, LeaveBalance, LeaveRequest, LeaveRequestFilter, LeaveStatus, LeaveType,
    NewLeaveRequest,
};

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

/// Result of a conditional balance decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeductOutcome {
    Deducted { remaining: Decimal },
    BalanceNotFound,
    /// Nothing was written.
    Insufficient { available: Decimal },
}

impl DeductOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, DeductOutcome::Deducted { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalOutcome {
    Approved(LeaveRequest),
    /// Someone already decided on the request.
    NotPending(LeaveStatus),
    BalanceNotFound,
    Insufficient { available: Decimal },
}

pub trait LeaveStore: Send + Sync {
    fn get_employee(
        &self,
        id: u64,
    ) -> impl Future<Output = LeaveResult<Option<Employee>>> + Send;

    fn create_employee(
        &self,
        employee: &NewEmployee,
    ) -> impl Future<Output = LeaveResult<Employee>> + Send;

    /// Ordered by name; `department` filters exactly.
    fn list_employees(
        &self,
        department: Option<&str>,
    ) -> impl Future<Output = LeaveResult<Vec<Employee>>> + Send;

    /// Apply the present fields. `None` when no such employee exists.
    fn update_employee(
        &self,
        id: u64,
        update: &UpdateEmployee,
    ) -> impl Future<Output = LeaveResult<Option<Employee>>> + Send;

    /// Counts for the admin dashboard; new hires started in `[month_start, today]`.
    fn admin_stats(
        &self,
        month_start: NaiveDate,
        today: NaiveDate,
    ) -> impl Future<Output = LeaveResult<AdminStats>> + Send;

    fn get_leave_balance(
        &self,
        employee_id: u64,
        year: i32,
    ) -> impl Future<Output = LeaveResult<Option<LeaveBalance>>> + Send;

    /// Fetch or create the (employee, year) row, grant entitlement growth and
    /// append one ledger row per grant. Returns the new ledger rows.
    ///
    /// A newly created row starts with zero balances and a zero watermark, so
    /// the first run of each year grants the full entitlement.
    fn reconcile_leave_balance(
        &self,
        employee_id: u64,
        year: i32,
        entitlement: &Entitlement,
        accrual_date: NaiveDate,
    ) -> impl Future<Output = LeaveResult<Vec<LeaveAccrual>>> + Send;

    /// Decrement-with-floor-check; never leaves a negative balance.
    fn deduct_leave_balance(
        &self,
        employee_id: u64,
        year: i32,
        leave_type: LeaveType,
        days: Decimal,
    ) -> impl Future<Output = LeaveResult<DeductOutcome>> + Send;

    /// Newest first.
    fn list_leave_accruals(
        &self,
        employee_id: u64,
    ) -> impl Future<Output = LeaveResult<Vec<LeaveAccrual>>> + Send;

    fn create_leave_request(
        &self,
        employee_id: u64,
        request: &NewLeaveRequest,
        days: Decimal,
        created_at: NaiveDateTime,
    ) -> impl Future<Output = LeaveResult<LeaveRequest>> + Send;

    fn get_leave_request(
        &self,
        id: u64,
    ) -> impl Future<Output = LeaveResult<Option<LeaveRequest>>> + Send;

    /// Newest first.
    fn list_leave_requests(
        &self,
        filter: &LeaveRequestFilter,
    ) -> impl Future<Output = LeaveResult<Vec<LeaveRequest>>> + Send;

    /// Re-check the request is pending, deduct paid leave, mark it approved.
    /// Any failure leaves both the balance and the request untouched.
    fn approve_leave_request(
        &self,
        id: u64,
        approver_id: u64,
        year: i32,
        decided_at: NaiveDateTime,
    ) -> impl Future<Output = LeaveResult<ApprovalOutcome>> + Send;

    /// Move a pending request to `to`. Returns false if it was no longer pending.
    fn transition_leave_request(
        &self,
        id: u64,
        to: LeaveStatus,
        approver_id: Option<u64>,
        decided_at: NaiveDateTime,
    ) -> impl Future<Output = LeaveResult<bool>> + Send;
}

/// Backend chosen at startup.
pub enum Store {
    MySql(MySqlStore),
    Memory(MemoryStore),
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            Store::MySql($store) => $call.await,
            Store::Memory($store) => $call.await,
        }
    };
}

impl LeaveStore for Store {
    async fn get_employee(&self, id: u64) -> LeaveResult<Option<Employee>> {
        dispatch!(self, s => s.get_employee(id))
    }

    async fn create_employee(&self, employee: &NewEmployee) -> LeaveResult<Employee> {
        dispatch!(self, s => s.create_employee(employee))
    }

    async fn list_employees(&self, department: Option<&str>) -> LeaveResult<Vec<Employee>> {
        dispatch!(self, s => s.list_employees(department))
    }

    async fn update_employee(
        &self,
        id: u64,
        update: &UpdateEmployee,
    ) -> LeaveResult<Option<Employee>> {
        dispatch!(self, s => s.update_employee(id, update))
    }

    async fn admin_stats(&self, month_start: NaiveDate, today: NaiveDate) -> LeaveResult<AdminStats> {
        dispatch!(self, s => s.admin_stats(month_start, today))
    }

    async fn get_leave_balance(
        &self,
        employee_id: u64,
        year: i32,
    ) -> LeaveResult<Option<LeaveBalance>> {
        dispatch!(self, s => s.get_leave_balance(employee_id, year))
    }

    async fn reconcile_leave_balance(
        &self,
        employee_id: u64,
        year: i32,
        entitlement: &Entitlement,
        accrual_date: NaiveDate,
    ) -> LeaveResult<Vec<LeaveAccrual>> {
        dispatch!(self, s => s.reconcile_leave_balance(employee_id, year, entitlement, accrual_date))
    }

    async fn deduct_leave_balance(
        &self,
        employee_id: u64,
        year: i32,
        leave_type: LeaveType,
        days: Decimal,
    ) -> LeaveResult<DeductOutcome> {
        dispatch!(self, s => s.deduct_leave_balance(employee_id, year, leave_type, days))
    }

    async fn list_leave_accruals(&self, employee_id: u64) -> LeaveResult<Vec<LeaveAccrual>> {
        dispatch!(self, s => s.list_leave_accruals(employee_id))
    }

    async fn create_leave_request(
        &self,
        employee_id: u64,
        request: &NewLeaveRequest,
        days: Decimal,
        created_at: NaiveDateTime,
    ) -> LeaveResult<LeaveRequest> {
        dispatch!(self, s => s.create_leave_request(employee_id, request, days, created_at))
    }

    async fn get_leave_request(&self, id: u64) -> LeaveResult<Option<LeaveRequest>> {
        dispatch!(self, s => s.get_leave_request(id))
    }

    async fn list_leave_requests(
        &self,
        filter: &LeaveRequestFilter,
    ) -> LeaveResult<Vec<LeaveRequest>> {
        dispatch!(self, s => s.list_leave_requests(filter))
    }

    async fn approve_leave_request(
        &self,
        id: u64,
        approver_id: u64,
        year: i32,
        decided_at: NaiveDateTime,
    ) -> LeaveResult<ApprovalOutcome> {
        dispatch!(self, s => s.approve_leave_request(id, approver_id, year, decided_at))
    }

    async fn transition_leave_request(
        &self,
        id: u64,
        to: LeaveStatus,
        approver_id: Option<u64>,
        decided_at: NaiveDateTime,
    ) -> LeaveResult<bool> {
        dispatch!(self, s => s.transition_leave_request(id, to, approver_id, decided_at))
    }
}
