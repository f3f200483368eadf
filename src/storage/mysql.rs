use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySqlConnection, MySqlPool};
use tracing::debug;

use super::{ApprovalOutcome, DeductOutcome, LeaveStore};
use crate::error::{LeaveError, LeaveResult};
use crate::leave::accrual::{Entitlement, plan_accruals};
use crate::model::employee::{AdminStats, Employee, NewEmployee, UpdateEmployee};
use crate::model::leave::{
    LeaveAccrual, LeaveBalance, LeaveRequest, LeaveRequestFilter, LeaveStatus, LeaveType,
    NewLeaveRequest,
};

const EMPLOYEE_COLUMNS: &str = "id, employee_code, first_name, last_name, email, department, \
     position, start_date, status, is_admin";

const BALANCE_COLUMNS: &str = "id, employee_id, year, casual_leave_balance, \
     vacation_leave_balance, casual_leave_accrued, vacation_leave_accrued";

const ACCRUAL_COLUMNS: &str =
    "id, employee_id, accrual_type, accrual_amount, accrual_date, reason";

const REQUEST_COLUMNS: &str = "id, employee_id, leave_type, start_date, end_date, days, reason, \
     is_with_pay, emergency_contact, work_coverage, status, approver_id, response_date, created_at";

/// MySQL duplicate-key SQLSTATE.
const DUPLICATE_KEY: &str = "23000";

#[derive(FromRow)]
struct AccrualRow {
    id: u64,
    employee_id: u64,
    accrual_type: String,
    accrual_amount: Decimal,
    accrual_date: NaiveDate,
    reason: String,
}

impl TryFrom<AccrualRow> for LeaveAccrual {
    type Error = LeaveError;

    fn try_from(row: AccrualRow) -> LeaveResult<Self> {
        Ok(LeaveAccrual {
            id: row.id,
            employee_id: row.employee_id,
            accrual_type: LeaveType::from_str(&row.accrual_type)?,
            accrual_amount: row.accrual_amount,
            accrual_date: row.accrual_date,
            reason: row.reason,
        })
    }
}

#[derive(FromRow)]
struct LeaveRequestRow {
    id: u64,
    employee_id: u64,
    leave_type: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    days: Decimal,
    reason: String,
    is_with_pay: bool,
    emergency_contact: Option<String>,
    work_coverage: Option<String>,
    status: String,
    approver_id: Option<u64>,
    response_date: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
}

impl TryFrom<LeaveRequestRow> for LeaveRequest {
    type Error = LeaveError;

    fn try_from(row: LeaveRequestRow) -> LeaveResult<Self> {
        Ok(LeaveRequest {
            id: row.id,
            employee_id: row.employee_id,
            leave_type: LeaveType::from_str(&row.leave_type)?,
            start_date: row.start_date,
            end_date: row.end_date,
            days: row.days,
            reason: row.reason,
            is_with_pay: row.is_with_pay,
            emergency_contact: row.emergency_contact,
            work_coverage: row.work_coverage,
            status: LeaveStatus::from_str(&row.status)?,
            approver_id: row.approver_id,
            response_date: row.response_date,
            created_at: row.created_at,
        })
    }
}

// Helper enum for typed SQLx binding
enum SqlValue<'a> {
    U64(u64),
    Str(&'a str),
    Date(NaiveDate),
    Bool(bool),
}

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

async fn lock_balance(
    conn: &mut MySqlConnection,
    employee_id: u64,
    year: i32,
) -> LeaveResult<Option<LeaveBalance>> {
    let sql = format!(
        "SELECT {BALANCE_COLUMNS} FROM leave_balances WHERE employee_id = ? AND year = ? FOR UPDATE"
    );
    let balance = sqlx::query_as::<_, LeaveBalance>(&sql)
        .bind(employee_id)
        .bind(year)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(balance)
}

/// Conditional decrement: the WHERE clause carries the floor check, so two
/// concurrent deductions can never both pass against the same days.
async fn deduct_on(
    conn: &mut MySqlConnection,
    employee_id: u64,
    year: i32,
    leave_type: LeaveType,
    days: Decimal,
) -> LeaveResult<DeductOutcome> {
    let column = leave_type.balance_column();
    let update = format!(
        "UPDATE leave_balances SET {column} = {column} - ? \
         WHERE employee_id = ? AND year = ? AND {column} >= ?"
    );
    let result = sqlx::query(&update)
        .bind(days)
        .bind(employee_id)
        .bind(year)
        .bind(days)
        .execute(&mut *conn)
        .await?;

    let select = format!("SELECT {column} FROM leave_balances WHERE employee_id = ? AND year = ?");
    let current = sqlx::query_scalar::<_, Decimal>(&select)
        .bind(employee_id)
        .bind(year)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(match (result.rows_affected(), current) {
        (_, None) => DeductOutcome::BalanceNotFound,
        (0, Some(available)) => DeductOutcome::Insufficient { available },
        (_, Some(remaining)) => DeductOutcome::Deducted { remaining },
    })
}

impl LeaveStore for MySqlStore {
    async fn get_employee(&self, id: u64) -> LeaveResult<Option<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
        let employee = sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(employee)
    }

    async fn create_employee(&self, employee: &NewEmployee) -> LeaveResult<Employee> {
        let result = sqlx::query(
            r#"
            INSERT INTO employees
            (employee_code, first_name, last_name, email, department, position, start_date, is_admin)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&employee.employee_code)
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(&employee.email)
        .bind(&employee.department)
        .bind(&employee.position)
        .bind(employee.start_date)
        .bind(employee.is_admin)
        .execute(&self.pool)
        .await;

        let result = match result {
            Ok(r) => r,
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some(DUPLICATE_KEY) => {
                return Err(LeaveError::Conflict(format!(
                    "employee code {} already exists",
                    employee.employee_code
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let id = result.last_insert_id();
        self.get_employee(id)
            .await?
            .ok_or_else(|| LeaveError::Storage(format!("employee {id} missing after insert")))
    }

    async fn list_employees(&self, department: Option<&str>) -> LeaveResult<Vec<Employee>> {
        let mut sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees");
        if department.is_some() {
            sql.push_str(" WHERE department = ?");
        }
        sql.push_str(" ORDER BY first_name, last_name");

        let mut query = sqlx::query_as::<_, Employee>(&sql);
        if let Some(department) = department {
            query = query.bind(department);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn update_employee(
        &self,
        id: u64,
        update: &UpdateEmployee,
    ) -> LeaveResult<Option<Employee>> {
        let mut sets: Vec<&str> = Vec::new();
        let mut args: Vec<SqlValue> = Vec::new();

        let text_fields = [
            ("first_name = ?", &update.first_name),
            ("last_name = ?", &update.last_name),
            ("email = ?", &update.email),
            ("department = ?", &update.department),
            ("position = ?", &update.position),
            ("status = ?", &update.status),
        ];
        for (set, value) in text_fields {
            if let Some(value) = value {
                sets.push(set);
                args.push(SqlValue::Str(value));
            }
        }
        if let Some(start_date) = update.start_date {
            sets.push("start_date = ?");
            args.push(SqlValue::Date(start_date));
        }
        if let Some(is_admin) = update.is_admin {
            sets.push("is_admin = ?");
            args.push(SqlValue::Bool(is_admin));
        }

        if !sets.is_empty() {
            let sql = format!("UPDATE employees SET {} WHERE id = ?", sets.join(", "));
            debug!(sql = %sql, "Updating employee");

            let mut query = sqlx::query(&sql);
            for arg in args {
                query = match arg {
                    SqlValue::U64(v) => query.bind(v),
                    SqlValue::Str(s) => query.bind(s),
                    SqlValue::Date(d) => query.bind(d),
                    SqlValue::Bool(b) => query.bind(b),
                };
            }
            query.bind(id).execute(&self.pool).await?;
        }

        // rows_affected is 0 for an unchanged row, so existence is read back
        self.get_employee(id).await
    }

    async fn admin_stats(&self, month_start: NaiveDate, today: NaiveDate) -> LeaveResult<AdminStats> {
        let (total_employees, new_hires) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(*),
                   CAST(COALESCE(SUM(start_date BETWEEN ? AND ?), 0) AS SIGNED)
            FROM employees
            WHERE status = 'active'
            "#,
        )
        .bind(month_start)
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        let pending_approvals = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM leave_requests WHERE status = 'pending'",
        )
        .fetch_one(&self.pool)
        .await?;

        let count = |n: i64| u64::try_from(n).unwrap_or_default();
        Ok(AdminStats {
            total_employees: count(total_employees),
            new_hires: count(new_hires),
            pending_approvals: count(pending_approvals),
        })
    }

    async fn get_leave_balance(
        &self,
        employee_id: u64,
        year: i32,
    ) -> LeaveResult<Option<LeaveBalance>> {
        let sql =
            format!("SELECT {BALANCE_COLUMNS} FROM leave_balances WHERE employee_id = ? AND year = ?");
        let balance = sqlx::query_as::<_, LeaveBalance>(&sql)
            .bind(employee_id)
            .bind(year)
            .fetch_optional(&self.pool)
            .await?;
        Ok(balance)
    }

    async fn reconcile_leave_balance(
        &self,
        employee_id: u64,
        year: i32,
        entitlement: &Entitlement,
        accrual_date: NaiveDate,
    ) -> LeaveResult<Vec<LeaveAccrual>> {
        let mut tx = self.pool.begin().await?;

        let balance = match lock_balance(&mut tx, employee_id, year).await? {
            Some(balance) => balance,
            None => {
                debug!(employee_id, year, "Creating leave balance row");
                // a concurrent reconcile may have inserted first; keep its row
                sqlx::query(
                    r#"
                    INSERT INTO leave_balances
                        (employee_id, year, casual_leave_balance, vacation_leave_balance,
                         casual_leave_accrued, vacation_leave_accrued)
                    VALUES (?, ?, 0, 0, 0, 0)
                    ON DUPLICATE KEY UPDATE id = id
                    "#,
                )
                .bind(employee_id)
                .bind(year)
                .execute(&mut *tx)
                .await?;

                lock_balance(&mut tx, employee_id, year).await?.ok_or_else(|| {
                    LeaveError::Storage(format!(
                        "leave balance for employee {employee_id} year {year} missing after insert"
                    ))
                })?
            }
        };

        let grants = plan_accruals(&balance, entitlement);
        let mut created = Vec::with_capacity(grants.len());
        for grant in grants {
            let update = format!(
                "UPDATE leave_balances SET {} = ?, {} = ? WHERE id = ?",
                grant.leave_type.balance_column(),
                grant.leave_type.accrued_column()
            );
            sqlx::query(&update)
                .bind(grant.new_balance)
                .bind(grant.new_accrued)
                .bind(balance.id)
                .execute(&mut *tx)
                .await?;

            let inserted = sqlx::query(
                r#"
                INSERT INTO leave_accruals
                    (employee_id, accrual_type, accrual_amount, accrual_date, reason)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(employee_id)
            .bind(grant.leave_type.as_ref())
            .bind(grant.amount)
            .bind(accrual_date)
            .bind(&grant.reason)
            .execute(&mut *tx)
            .await?;

            created.push(LeaveAccrual {
                id: inserted.last_insert_id(),
                employee_id,
                accrual_type: grant.leave_type,
                accrual_amount: grant.amount,
                accrual_date,
                reason: grant.reason,
            });
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn deduct_leave_balance(
        &self,
        employee_id: u64,
        year: i32,
        leave_type: LeaveType,
        days: Decimal,
    ) -> LeaveResult<DeductOutcome> {
        let mut tx = self.pool.begin().await?;
        let outcome = deduct_on(&mut tx, employee_id, year, leave_type, days).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    async fn list_leave_accruals(&self, employee_id: u64) -> LeaveResult<Vec<LeaveAccrual>> {
        let sql = format!(
            "SELECT {ACCRUAL_COLUMNS} FROM leave_accruals WHERE employee_id = ? \
             ORDER BY accrual_date DESC, id DESC"
        );
        sqlx::query_as::<_, AccrualRow>(&sql)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(LeaveAccrual::try_from)
            .collect()
    }

    async fn create_leave_request(
        &self,
        employee_id: u64,
        request: &NewLeaveRequest,
        days: Decimal,
        created_at: NaiveDateTime,
    ) -> LeaveResult<LeaveRequest> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, leave_type, start_date, end_date, days, reason, is_with_pay,
                 emergency_contact, work_coverage, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?)
            "#,
        )
        .bind(employee_id)
        .bind(request.leave_type.as_ref())
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(days)
        .bind(&request.reason)
        .bind(request.is_with_pay)
        .bind(&request.emergency_contact)
        .bind(&request.work_coverage)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_id();
        self.get_leave_request(id)
            .await?
            .ok_or_else(|| LeaveError::Storage(format!("leave request {id} missing after insert")))
    }

    async fn get_leave_request(&self, id: u64) -> LeaveResult<Option<LeaveRequest>> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = ?");
        sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(LeaveRequest::try_from)
            .transpose()
    }

    async fn list_leave_requests(
        &self,
        filter: &LeaveRequestFilter,
    ) -> LeaveResult<Vec<LeaveRequest>> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<SqlValue> = Vec::new();

        if let Some(employee_id) = filter.employee_id {
            where_sql.push_str(" AND employee_id = ?");
            args.push(SqlValue::U64(employee_id));
        }

        if let Some(status) = filter.status.as_ref() {
            where_sql.push_str(" AND status = ?");
            args.push(SqlValue::Str(status.as_ref()));
        }

        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM leave_requests{where_sql} ORDER BY created_at DESC, id DESC"
        );
        debug!(sql = %sql, "Listing leave requests");

        let mut query = sqlx::query_as::<_, LeaveRequestRow>(&sql);
        for arg in args {
            query = match arg {
                SqlValue::U64(v) => query.bind(v),
                SqlValue::Str(s) => query.bind(s),
                SqlValue::Date(d) => query.bind(d),
                SqlValue::Bool(b) => query.bind(b),
            };
        }

        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(LeaveRequest::try_from)
            .collect()
    }

    async fn approve_leave_request(
        &self,
        id: u64,
        approver_id: u64,
        year: i32,
        decided_at: NaiveDateTime,
    ) -> LeaveResult<ApprovalOutcome> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = ? FOR UPDATE");
        let request: LeaveRequest = sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(LeaveError::LeaveRequestNotFound(id))?
            .try_into()?;

        // dropping `tx` on an early return rolls everything back
        if request.status != LeaveStatus::Pending {
            return Ok(ApprovalOutcome::NotPending(request.status));
        }

        if request.is_with_pay {
            match deduct_on(&mut tx, request.employee_id, year, request.leave_type, request.days)
                .await?
            {
                DeductOutcome::Deducted { .. } => {}
                DeductOutcome::BalanceNotFound => return Ok(ApprovalOutcome::BalanceNotFound),
                DeductOutcome::Insufficient { available } => {
                    return Ok(ApprovalOutcome::Insufficient { available });
                }
            }
        }

        sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = 'approved', approver_id = ?, response_date = ?
            WHERE id = ?
            "#,
        )
        .bind(approver_id)
        .bind(decided_at)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ApprovalOutcome::Approved(LeaveRequest {
            status: LeaveStatus::Approved,
            approver_id: Some(approver_id),
            response_date: Some(decided_at),
            ..request
        }))
    }

    async fn transition_leave_request(
        &self,
        id: u64,
        to: LeaveStatus,
        approver_id: Option<u64>,
        decided_at: NaiveDateTime,
    ) -> LeaveResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, approver_id = ?, response_date = ?
            WHERE id = ?
            AND status = 'pending'
            "#,
        )
        .bind(to.as_ref())
        .bind(approver_id)
        .bind(decided_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
