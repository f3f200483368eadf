use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::clock::Clock;
use crate::error::{LeaveError, LeaveResult};
use crate::leave::accrual::Entitlement;
use crate::model::employee::{
    AdminStats, EMPLOYEE_STATUSES, Employee, NewEmployee, ProfileUpdate, UpdateEmployee,
};
use crate::model::leave::{
    LeaveAccrual, LeaveBalance, LeaveRequest, LeaveRequestFilter, LeaveStatus, LeaveType,
    NewLeaveRequest,
};
use crate::storage::{ApprovalOutcome, DeductOutcome, LeaveStore, Store};

/// Service wired into the HTTP layer.
pub type AppService = LeaveService<Store>;

/// Largest number of decimal places accepted for a day count.
const MAX_DAY_SCALE: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaveValidation {
    #[schema(example = false)]
    pub valid: bool,
    #[schema(example = "Insufficient vacation leave balance. Available: 4 days, Requested: 10 days")]
    pub message: String,
}

impl LeaveValidation {
    pub fn accepted() -> Self {
        Self {
            valid: true,
            message: "Leave request is valid".to_string(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Submitted(LeaveRequest),
    /// Failed the balance check; nothing was stored.
    Rejected(LeaveValidation),
}

/// Result of a deny or cancel.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusChange {
    Changed(LeaveRequest),
    NotPending(LeaveStatus),
}

fn ensure_valid_days(days: Decimal) -> LeaveResult<()> {
    if days <= Decimal::ZERO {
        return Err(LeaveError::invalid("days must be greater than zero"));
    }
    if days.normalize().scale() > MAX_DAY_SCALE {
        return Err(LeaveError::invalid(format!(
            "days may have at most {MAX_DAY_SCALE} decimal places"
        )));
    }
    Ok(())
}

fn ensure_present(field: &str, value: &str) -> LeaveResult<()> {
    if value.trim().is_empty() {
        return Err(LeaveError::invalid(format!("{field} is required")));
    }
    Ok(())
}

fn ensure_email(email: &str) -> LeaveResult<()> {
    if !email.contains('@') {
        return Err(LeaveError::invalid("email is not valid"));
    }
    Ok(())
}

fn ensure_valid_update(update: &UpdateEmployee) -> LeaveResult<()> {
    if update.is_empty() {
        return Err(LeaveError::invalid("no fields provided for update"));
    }
    let text_fields = [
        ("first_name", &update.first_name),
        ("last_name", &update.last_name),
        ("department", &update.department),
        ("position", &update.position),
    ];
    for (field, value) in text_fields {
        if let Some(value) = value {
            ensure_present(field, value)?;
        }
    }
    if let Some(email) = &update.email {
        ensure_email(email)?;
    }
    if let Some(status) = &update.status {
        if !EMPLOYEE_STATUSES.contains(&status.as_str()) {
            return Err(LeaveError::invalid(format!(
                "status must be one of {}",
                EMPLOYEE_STATUSES.join(", ")
            )));
        }
    }
    Ok(())
}

/// Leave accrual and balance engine plus the leave-request workflow.
///
/// Every balance-dependent operation reconciles first, so callers never see
/// entitlement that is stale by more than the current request.
pub struct LeaveService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for LeaveService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: LeaveStore> LeaveService<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn require_employee(&self, employee_id: u64) -> LeaveResult<Employee> {
        self.store
            .get_employee(employee_id)
            .await?
            .ok_or(LeaveError::EmployeeNotFound(employee_id))
    }

    async fn reconcile(&self, employee_id: u64, today: NaiveDate) -> LeaveResult<Vec<LeaveAccrual>> {
        let employee = self.require_employee(employee_id).await?;
        let entitlement = Entitlement::as_of(employee.start_date, today)?;

        let granted = self
            .store
            .reconcile_leave_balance(employee_id, today.year(), &entitlement, today)
            .await?;

        for accrual in &granted {
            info!(
                employee_id,
                leave_type = %accrual.accrual_type,
                amount = %accrual.accrual_amount,
                "Leave accrued"
            );
        }
        Ok(granted)
    }

    /// Bring the current year's balance up to date with earned entitlement.
    /// Returns the ledger rows appended by this run; empty when nothing grew.
    #[instrument(skip(self))]
    pub async fn process_leave_accruals(&self, employee_id: u64) -> LeaveResult<Vec<LeaveAccrual>> {
        self.reconcile(employee_id, self.clock.today()).await
    }

    /// Take `days` from the current year's balance. Fails as data, without
    /// writing, when the row is missing or holds fewer days.
    #[instrument(skip(self))]
    pub async fn deduct_leave_balance(
        &self,
        employee_id: u64,
        leave_type: LeaveType,
        days: Decimal,
    ) -> LeaveResult<DeductOutcome> {
        ensure_valid_days(days)?;

        let outcome = self
            .store
            .deduct_leave_balance(employee_id, self.clock.current_year(), leave_type, days)
            .await?;

        match outcome {
            DeductOutcome::Deducted { remaining } => {
                info!(employee_id, %leave_type, %days, %remaining, "Leave deducted");
            }
            DeductOutcome::BalanceNotFound => {
                warn!(employee_id, %leave_type, "Deduction without a leave balance");
            }
            DeductOutcome::Insufficient { available } => {
                warn!(employee_id, %leave_type, %days, %available, "Deduction exceeds balance");
            }
        }
        Ok(outcome)
    }

    #[instrument(skip(self))]
    pub async fn validate_leave_request(
        &self,
        employee_id: u64,
        leave_type: LeaveType,
        days: Decimal,
    ) -> LeaveResult<LeaveValidation> {
        ensure_valid_days(days)?;
        let today = self.clock.today();

        match self.reconcile(employee_id, today).await {
            Ok(_) => {}
            Err(LeaveError::EmployeeNotFound(_)) => {
                return Ok(LeaveValidation::rejected("Employee not found"));
            }
            Err(e) => return Err(e),
        }

        let Some(balance) = self
            .store
            .get_leave_balance(employee_id, today.year())
            .await?
        else {
            return Ok(LeaveValidation::rejected("Leave balance not found"));
        };

        let available = balance.available(leave_type);
        if days > available {
            return Ok(LeaveValidation::rejected(format!(
                "Insufficient {leave_type} leave balance. Available: {} days, Requested: {} days",
                available.normalize(),
                days.normalize()
            )));
        }

        Ok(LeaveValidation::accepted())
    }

    /// Current year's balance, reconciled first.
    pub async fn leave_balance(&self, employee_id: u64) -> LeaveResult<LeaveBalance> {
        let today = self.clock.today();
        self.reconcile(employee_id, today).await?;
        self.store
            .get_leave_balance(employee_id, today.year())
            .await?
            .ok_or_else(|| {
                LeaveError::Storage(format!(
                    "leave balance for employee {employee_id} missing after reconciliation"
                ))
            })
    }

    pub async fn accrual_history(&self, employee_id: u64) -> LeaveResult<Vec<LeaveAccrual>> {
        self.require_employee(employee_id).await?;
        self.store.list_leave_accruals(employee_id).await
    }

    #[instrument(skip(self, request), fields(leave_type = %request.leave_type))]
    pub async fn submit_leave_request(
        &self,
        employee_id: u64,
        request: NewLeaveRequest,
    ) -> LeaveResult<SubmitOutcome> {
        if request.end_date < request.start_date {
            return Err(LeaveError::invalid("end date is before start date"));
        }
        ensure_present("reason", &request.reason)?;
        self.require_employee(employee_id).await?;

        let days = Decimal::from(request.calendar_days());
        if request.is_with_pay {
            let validation = self
                .validate_leave_request(employee_id, request.leave_type, days)
                .await?;
            if !validation.valid {
                warn!(employee_id, message = %validation.message, "Leave request rejected");
                return Ok(SubmitOutcome::Rejected(validation));
            }
        }

        let created = self
            .store
            .create_leave_request(employee_id, &request, days, self.clock.now())
            .await?;
        info!(employee_id, request_id = created.id, %days, "Leave request submitted");
        Ok(SubmitOutcome::Submitted(created))
    }

    async fn require_request(&self, id: u64) -> LeaveResult<LeaveRequest> {
        self.store
            .get_leave_request(id)
            .await?
            .ok_or(LeaveError::LeaveRequestNotFound(id))
    }

    /// Approve a pending request, deducting paid leave in the same step.
    #[instrument(skip(self))]
    pub async fn approve_leave_request(
        &self,
        id: u64,
        approver_id: u64,
    ) -> LeaveResult<ApprovalOutcome> {
        let request = self.require_request(id).await?;
        if request.status != LeaveStatus::Pending {
            return Ok(ApprovalOutcome::NotPending(request.status));
        }

        let today = self.clock.today();
        if request.is_with_pay {
            self.reconcile(request.employee_id, today).await?;
        }

        let outcome = self
            .store
            .approve_leave_request(id, approver_id, today.year(), self.clock.now())
            .await?;

        match &outcome {
            ApprovalOutcome::Approved(approved) => {
                info!(request_id = id, approver_id, days = %approved.days, "Leave request approved");
            }
            other => warn!(request_id = id, outcome = ?other, "Leave request not approved"),
        }
        Ok(outcome)
    }

    async fn transition(
        &self,
        id: u64,
        to: LeaveStatus,
        approver_id: Option<u64>,
    ) -> LeaveResult<StatusChange> {
        let changed = self
            .store
            .transition_leave_request(id, to, approver_id, self.clock.now())
            .await?;
        let current = self.require_request(id).await?;
        if changed {
            info!(request_id = id, status = %to, "Leave request status changed");
            Ok(StatusChange::Changed(current))
        } else {
            Ok(StatusChange::NotPending(current.status))
        }
    }

    #[instrument(skip(self))]
    pub async fn deny_leave_request(&self, id: u64, approver_id: u64) -> LeaveResult<StatusChange> {
        self.require_request(id).await?;
        self.transition(id, LeaveStatus::Denied, Some(approver_id))
            .await
    }

    /// Withdraw one of the employee's own pending requests.
    #[instrument(skip(self))]
    pub async fn cancel_leave_request(
        &self,
        id: u64,
        employee_id: u64,
    ) -> LeaveResult<StatusChange> {
        let request = self.require_request(id).await?;
        if request.employee_id != employee_id {
            return Err(LeaveError::Forbidden(format!(
                "leave request {id} belongs to another employee"
            )));
        }
        self.transition(id, LeaveStatus::Cancelled, None).await
    }

    pub async fn leave_requests(&self, filter: &LeaveRequestFilter) -> LeaveResult<Vec<LeaveRequest>> {
        self.store.list_leave_requests(filter).await
    }

    pub async fn employee(&self, id: u64) -> LeaveResult<Employee> {
        self.require_employee(id).await
    }

    pub async fn employees(&self, department: Option<&str>) -> LeaveResult<Vec<Employee>> {
        self.store.list_employees(department).await
    }

    #[instrument(skip(self, employee), fields(employee_code = %employee.employee_code))]
    pub async fn register_employee(&self, employee: NewEmployee) -> LeaveResult<Employee> {
        ensure_present("employee_code", &employee.employee_code)?;
        ensure_present("first_name", &employee.first_name)?;
        ensure_present("last_name", &employee.last_name)?;
        ensure_present("department", &employee.department)?;
        ensure_present("position", &employee.position)?;
        ensure_email(&employee.email)?;

        let created = self.store.create_employee(&employee).await?;
        info!(employee_id = created.id, "Employee registered");
        Ok(created)
    }

    /// Admin edit of any profile field except the employee code.
    #[instrument(skip(self, update))]
    pub async fn update_employee(&self, id: u64, update: UpdateEmployee) -> LeaveResult<Employee> {
        ensure_valid_update(&update)?;
        if update.start_date.is_some_and(|d| d > self.clock.today()) {
            warn!(employee_id = id, "Start date moved into the future; accrual paused until then");
        }

        let updated = self
            .store
            .update_employee(id, &update)
            .await?
            .ok_or(LeaveError::EmployeeNotFound(id))?;
        info!(employee_id = id, "Employee updated");
        Ok(updated)
    }

    /// Self-service edit, limited to name and email.
    pub async fn update_profile(
        &self,
        employee_id: u64,
        profile: ProfileUpdate,
    ) -> LeaveResult<Employee> {
        self.update_employee(employee_id, profile.into()).await
    }

    /// Active headcount, this month's new hires and the approval queue length.
    pub async fn admin_stats(&self) -> LeaveResult<AdminStats> {
        let today = self.clock.today();
        let month_start = today.with_day(1).unwrap_or(today);
        self.store.admin_stats(month_start, today).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::storage::MemoryStore;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Harness {
        service: LeaveService<MemoryStore>,
        clock: Arc<FixedClock>,
        employee: Employee,
    }

    async fn harness(start_date: NaiveDate, today: NaiveDate) -> Harness {
        let clock = Arc::new(FixedClock::on(today));
        let service = LeaveService::new(Arc::new(MemoryStore::new()), clock.clone());
        let employee = service
            .register_employee(NewEmployee {
                employee_code: "EMP-007".into(),
                first_name: "Grace".into(),
                last_name: "Hopper".into(),
                email: "grace@company.com".into(),
                department: "Engineering".into(),
                position: "Engineer".into(),
                start_date,
                is_admin: false,
            })
            .await
            .unwrap();
        Harness {
            service,
            clock,
            employee,
        }
    }

    fn request(leave_type: LeaveType, start: NaiveDate, end: NaiveDate) -> NewLeaveRequest {
        NewLeaveRequest {
            leave_type,
            start_date: start,
            end_date: end,
            reason: "Family trip".into(),
            is_with_pay: true,
            emergency_contact: None,
            work_coverage: None,
        }
    }

    #[tokio::test]
    async fn reconciling_twice_changes_nothing() {
        let h = harness(date(2026, 1, 1), date(2026, 7, 1)).await;
        let id = h.employee.id;

        let first = h.service.process_leave_accruals(id).await.unwrap();
        assert_eq!(first.len(), 2);
        let before = h.service.store().get_leave_balance(id, 2026).await.unwrap();

        let second = h.service.process_leave_accruals(id).await.unwrap();
        assert!(second.is_empty());
        let after = h.service.store().get_leave_balance(id, 2026).await.unwrap();
        assert_eq!(before, after);
        assert_eq!(h.service.accrual_history(id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn crossing_a_quarter_appends_one_row() {
        let h = harness(date(2026, 1, 1), date(2026, 3, 31)).await;
        let id = h.employee.id;

        let first = h.service.process_leave_accruals(id).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].accrual_type, LeaveType::Casual);
        assert_eq!(first[0].accrual_amount, dec!(3));

        h.clock.set_date(date(2026, 4, 1));
        let second = h.service.process_leave_accruals(id).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].accrual_type, LeaveType::Vacation);
        assert_eq!(second[0].accrual_amount, dec!(5));

        let history = h.service.accrual_history(id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1], first[0]);
    }

    #[tokio::test]
    async fn deduction_never_goes_below_zero() {
        let today = date(2026, 10, 18);
        let h = harness(today - Duration::days(84), today).await;
        let id = h.employee.id;

        let balance = h.service.leave_balance(id).await.unwrap();
        assert_eq!(balance.casual_leave_balance, dec!(3));

        let outcome = h
            .service
            .deduct_leave_balance(id, LeaveType::Casual, dec!(5))
            .await
            .unwrap();
        assert_eq!(outcome, DeductOutcome::Insufficient { available: dec!(3) });

        let balance = h.service.store().get_leave_balance(id, 2026).await.unwrap().unwrap();
        assert_eq!(balance.casual_leave_balance, dec!(3.0));
    }

    #[tokio::test]
    async fn deduction_without_balance_row_fails() {
        let h = harness(date(2026, 1, 1), date(2026, 7, 1)).await;
        let outcome = h
            .service
            .deduct_leave_balance(h.employee.id, LeaveType::Casual, dec!(1))
            .await
            .unwrap();
        assert_eq!(outcome, DeductOutcome::BalanceNotFound);
    }

    #[tokio::test]
    async fn rejection_reports_available_and_requested_days() {
        let h = harness(date(2026, 1, 1), date(2026, 4, 1)).await;
        let id = h.employee.id;
        h.service.process_leave_accruals(id).await.unwrap();
        h.service
            .deduct_leave_balance(id, LeaveType::Vacation, dec!(1))
            .await
            .unwrap();

        let validation = h
            .service
            .validate_leave_request(id, LeaveType::Vacation, dec!(10))
            .await
            .unwrap();
        assert!(!validation.valid);
        assert!(validation.message.contains('4'));
        assert!(validation.message.contains("10"));
    }

    #[tokio::test]
    async fn validation_rejects_unknown_employee_as_data() {
        let h = harness(date(2026, 1, 1), date(2026, 4, 1)).await;
        let validation = h
            .service
            .validate_leave_request(999, LeaveType::Casual, dec!(1))
            .await
            .unwrap();
        assert_eq!(validation, LeaveValidation::rejected("Employee not found"));
    }

    #[tokio::test]
    async fn malformed_day_counts_are_invalid_input() {
        let h = harness(date(2026, 1, 1), date(2026, 4, 1)).await;
        for days in [dec!(0), dec!(-2), dec!(0.125)] {
            let err = h
                .service
                .validate_leave_request(h.employee.id, LeaveType::Casual, days)
                .await
                .unwrap_err();
            assert!(matches!(err, LeaveError::InvalidInput(_)), "{days}");
        }
    }

    #[tokio::test]
    async fn future_hire_date_is_invalid_input() {
        let h = harness(date(2026, 12, 1), date(2026, 10, 18)).await;
        let err = h
            .service
            .process_leave_accruals(h.employee.id)
            .await
            .unwrap_err();
        assert!(matches!(err, LeaveError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn approval_deducts_and_second_approval_is_refused() {
        let h = harness(date(2026, 1, 1), date(2026, 7, 1)).await;
        let id = h.employee.id;

        let SubmitOutcome::Submitted(submitted) = h
            .service
            .submit_leave_request(id, request(LeaveType::Vacation, date(2026, 7, 6), date(2026, 7, 8)))
            .await
            .unwrap()
        else {
            panic!("request should be accepted");
        };
        assert_eq!(submitted.days, dec!(3));
        assert_eq!(submitted.status, LeaveStatus::Pending);

        let outcome = h.service.approve_leave_request(submitted.id, 1).await.unwrap();
        assert!(matches!(outcome, ApprovalOutcome::Approved(ref r) if r.approver_id == Some(1)));

        let balance = h.service.leave_balance(id).await.unwrap();
        assert_eq!(balance.vacation_leave_balance, dec!(7));

        let again = h.service.approve_leave_request(submitted.id, 1).await.unwrap();
        assert_eq!(again, ApprovalOutcome::NotPending(LeaveStatus::Approved));
    }

    #[tokio::test]
    async fn oversized_paid_request_is_not_stored() {
        let h = harness(date(2026, 1, 1), date(2026, 7, 1)).await;
        let outcome = h
            .service
            .submit_leave_request(
                h.employee.id,
                request(LeaveType::Casual, date(2026, 7, 6), date(2026, 7, 20)),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, SubmitOutcome::Rejected(ref v) if !v.valid));
        let stored = h
            .service
            .leave_requests(&LeaveRequestFilter::default())
            .await
            .unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn unpaid_request_skips_the_balance() {
        let h = harness(date(2026, 1, 1), date(2026, 2, 1)).await;
        let mut unpaid = request(LeaveType::Vacation, date(2026, 2, 2), date(2026, 2, 13));
        unpaid.is_with_pay = false;

        let SubmitOutcome::Submitted(submitted) = h
            .service
            .submit_leave_request(h.employee.id, unpaid)
            .await
            .unwrap()
        else {
            panic!("unpaid leave should not be balance checked");
        };
        let outcome = h.service.approve_leave_request(submitted.id, 1).await.unwrap();
        assert!(matches!(outcome, ApprovalOutcome::Approved(_)));
    }

    #[tokio::test]
    async fn reversed_dates_and_blank_reason_are_invalid() {
        let h = harness(date(2026, 1, 1), date(2026, 7, 1)).await;
        let reversed = request(LeaveType::Casual, date(2026, 7, 8), date(2026, 7, 6));
        assert!(matches!(
            h.service.submit_leave_request(h.employee.id, reversed).await,
            Err(LeaveError::InvalidInput(_))
        ));

        let mut blank = request(LeaveType::Casual, date(2026, 7, 6), date(2026, 7, 6));
        blank.reason = "   ".into();
        assert!(matches!(
            h.service.submit_leave_request(h.employee.id, blank).await,
            Err(LeaveError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn only_the_owner_can_cancel() {
        let h = harness(date(2026, 1, 1), date(2026, 7, 1)).await;
        let SubmitOutcome::Submitted(submitted) = h
            .service
            .submit_leave_request(
                h.employee.id,
                request(LeaveType::Casual, date(2026, 7, 6), date(2026, 7, 6)),
            )
            .await
            .unwrap()
        else {
            panic!("request should be accepted");
        };

        let err = h
            .service
            .cancel_leave_request(submitted.id, h.employee.id + 1)
            .await
            .unwrap_err();
        assert!(matches!(err, LeaveError::Forbidden(_)));

        let change = h
            .service
            .cancel_leave_request(submitted.id, h.employee.id)
            .await
            .unwrap();
        assert!(matches!(change, StatusChange::Changed(ref r) if r.status == LeaveStatus::Cancelled));

        let deny = h.service.deny_leave_request(submitted.id, 1).await.unwrap();
        assert_eq!(deny, StatusChange::NotPending(LeaveStatus::Cancelled));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_deductions_do_not_double_spend() {
        let today = date(2026, 10, 18);
        let h = harness(today - Duration::days(140), today).await;
        let id = h.employee.id;
        let balance = h.service.leave_balance(id).await.unwrap();
        assert_eq!(balance.casual_leave_balance, dec!(5));

        let tasks: Vec<_> = (0..12)
            .map(|_| {
                let service = h.service.clone();
                tokio::spawn(async move {
                    service
                        .deduct_leave_balance(id, LeaveType::Casual, dec!(1))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut succeeded = 0;
        for task in tasks {
            if task.await.unwrap().succeeded() {
                succeeded += 1;
            }
        }
        assert_eq!(succeeded, 5);

        let balance = h.service.store().get_leave_balance(id, 2026).await.unwrap().unwrap();
        assert_eq!(balance.casual_leave_balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn january_balance_holds_the_full_entitlement() {
        let start = date(2025, 1, 1);
        let h = harness(start, date(2025, 12, 1)).await;
        let id = h.employee.id;

        h.service.process_leave_accruals(id).await.unwrap();
        let outcome = h
            .service
            .deduct_leave_balance(id, LeaveType::Casual, dec!(3))
            .await
            .unwrap();
        assert!(outcome.succeeded());

        let new_year = date(2026, 1, 2);
        h.clock.set_date(new_year);
        let entitlement = Entitlement::as_of(start, new_year).unwrap();
        let balance = h.service.leave_balance(id).await.unwrap();
        assert_eq!(balance.year, 2026);
        assert_eq!(balance.casual_leave_balance, entitlement.casual);
        assert_eq!(balance.vacation_leave_balance, entitlement.vacation);

        let validation = h
            .service
            .validate_leave_request(id, LeaveType::Casual, entitlement.casual)
            .await
            .unwrap();
        assert!(validation.valid, "{}", validation.message);
    }

    #[tokio::test]
    async fn admin_update_checks_fields() {
        let h = harness(date(2024, 1, 1), date(2026, 7, 1)).await;
        let id = h.employee.id;

        let err = h
            .service
            .update_employee(id, UpdateEmployee::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LeaveError::InvalidInput(_)));

        let retired = UpdateEmployee {
            status: Some("retired".into()),
            ..UpdateEmployee::default()
        };
        let err = h.service.update_employee(id, retired).await.unwrap_err();
        assert!(matches!(err, LeaveError::InvalidInput(_)));

        let promotion = UpdateEmployee {
            position: Some("Staff Engineer".into()),
            is_admin: Some(true),
            ..UpdateEmployee::default()
        };
        let err = h
            .service
            .update_employee(999, promotion.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, LeaveError::EmployeeNotFound(999)));

        let updated = h.service.update_employee(id, promotion).await.unwrap();
        assert_eq!(updated.position, "Staff Engineer");
        assert!(updated.is_admin);
        assert_eq!(updated.department, "Engineering");
    }

    #[tokio::test]
    async fn profile_update_changes_contact_details() {
        let h = harness(date(2024, 1, 1), date(2026, 7, 1)).await;
        let id = h.employee.id;

        let profile = ProfileUpdate {
            email: Some("grace.hopper@company.com".into()),
            ..ProfileUpdate::default()
        };
        let updated = h.service.update_profile(id, profile).await.unwrap();
        assert_eq!(updated.email, "grace.hopper@company.com");
        assert_eq!(updated.first_name, "Grace");
        assert!(!updated.is_admin);

        let bad = ProfileUpdate {
            email: Some("not-an-address".into()),
            ..ProfileUpdate::default()
        };
        let err = h.service.update_profile(id, bad).await.unwrap_err();
        assert!(matches!(err, LeaveError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn admin_stats_count_active_staff_and_pending_requests() {
        let h = harness(date(2026, 10, 5), date(2026, 10, 18)).await;
        let hire = |code: &str, start_date: NaiveDate| NewEmployee {
            employee_code: code.into(),
            first_name: "Test".into(),
            last_name: code.into(),
            email: format!("{code}@company.com"),
            department: "Engineering".into(),
            position: "Engineer".into(),
            start_date,
            is_admin: false,
        };
        let veteran = h
            .service
            .register_employee(hire("EMP-100", date(2020, 3, 1)))
            .await
            .unwrap();
        let leaver = h
            .service
            .register_employee(hire("EMP-101", date(2026, 10, 1)))
            .await
            .unwrap();
        let leaving = UpdateEmployee {
            status: Some("terminated".into()),
            ..UpdateEmployee::default()
        };
        h.service.update_employee(leaver.id, leaving).await.unwrap();

        let day = date(2026, 10, 20);
        let outcome = h
            .service
            .submit_leave_request(veteran.id, request(LeaveType::Casual, day, day))
            .await
            .unwrap();
        assert!(matches!(outcome, SubmitOutcome::Submitted(_)));

        let stats = h.service.admin_stats().await.unwrap();
        assert_eq!(
            stats,
            AdminStats {
                total_employees: 2,
                new_hires: 1,
                pending_approvals: 1,
            }
        );
    }
}
