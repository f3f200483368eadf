use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::{IntoParams, ToSchema};

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    /// One day per twenty working days.
    Casual,
    /// Five days per completed quarter.
    Vacation,
}

impl LeaveType {
    pub const ALL: [LeaveType; 2] = [LeaveType::Casual, LeaveType::Vacation];

    /// Column of `leave_balances` holding this type's spendable days.
    pub fn balance_column(self) -> &'static str {
        match self {
            LeaveType::Casual => "casual_leave_balance",
            LeaveType::Vacation => "vacation_leave_balance",
        }
    }

    /// Column of `leave_balances` holding this type's granted-entitlement watermark.
    pub fn accrued_column(self) -> &'static str {
        match self {
            LeaveType::Casual => "casual_leave_accrued",
            LeaveType::Vacation => "vacation_leave_accrued",
        }
    }
}

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Denied,
    Cancelled,
}

/// Current-state cache of earned days, one row per (employee, calendar year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveBalance {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = "4.00", value_type = String)]
    pub casual_leave_balance: Decimal,
    #[schema(example = "10.00", value_type = String)]
    pub vacation_leave_balance: Decimal,
    /// Casual entitlement already granted; reconciliation only grants growth past it.
    #[schema(example = "6.00", value_type = String)]
    pub casual_leave_accrued: Decimal,
    #[schema(example = "10.00", value_type = String)]
    pub vacation_leave_accrued: Decimal,
}

impl LeaveBalance {
    pub fn available(&self, leave_type: LeaveType) -> Decimal {
        match leave_type {
            LeaveType::Casual => self.casual_leave_balance,
            LeaveType::Vacation => self.vacation_leave_balance,
        }
    }

    pub fn set_available(&mut self, leave_type: LeaveType, days: Decimal) {
        match leave_type {
            LeaveType::Casual => self.casual_leave_balance = days,
            LeaveType::Vacation => self.vacation_leave_balance = days,
        }
    }

    pub fn accrued(&self, leave_type: LeaveType) -> Decimal {
        match leave_type {
            LeaveType::Casual => self.casual_leave_accrued,
            LeaveType::Vacation => self.vacation_leave_accrued,
        }
    }

    pub fn set_accrued(&mut self, leave_type: LeaveType, days: Decimal) {
        match leave_type {
            LeaveType::Casual => self.casual_leave_accrued = days,
            LeaveType::Vacation => self.vacation_leave_accrued = days,
        }
    }
}

/// Append-only audit row explaining one increase of a balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaveAccrual {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "casual")]
    pub accrual_type: LeaveType,
    /// Incremental days granted by this event, not the running total.
    #[schema(example = "1.00", value_type = String)]
    pub accrual_amount: Decimal,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub accrual_date: NaiveDate,
    #[schema(example = "Earned 1 casual day(s): 100 working days since start date")]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "vacation")]
    pub leave_type: LeaveType,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "3", value_type = String)]
    pub days: Decimal,
    #[schema(example = "Family trip")]
    pub reason: String,
    #[schema(example = true)]
    pub is_with_pay: bool,
    pub emergency_contact: Option<String>,
    pub work_coverage: Option<String>,
    #[schema(example = "pending")]
    pub status: LeaveStatus,
    pub approver_id: Option<u64>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub response_date: Option<NaiveDateTime>,
    #[schema(example = "2026-01-01T09:00:00", format = "date-time", value_type = String)]
    pub created_at: NaiveDateTime,
}

fn default_with_pay() -> bool {
    true
}

/// Leave request as submitted by an employee.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct NewLeaveRequest {
    #[schema(example = "vacation")]
    pub leave_type: LeaveType,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family trip")]
    pub reason: String,
    /// Paid leave is checked against and deducted from the balance.
    #[serde(default = "default_with_pay")]
    #[schema(example = true)]
    pub is_with_pay: bool,
    #[serde(default)]
    pub emergency_contact: Option<String>,
    #[serde(default)]
    pub work_coverage: Option<String>,
}

impl NewLeaveRequest {
    /// Calendar days covered, both ends inclusive.
    pub fn calendar_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LeaveRequestFilter {
    #[schema(example = 1000)]
    /// Filter by employee ID
    pub employee_id: Option<u64>,
    #[schema(example = "pending")]
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[test]
    fn leave_type_round_trips_through_strings() {
        assert_eq!(LeaveType::Casual.to_string(), "casual");
        assert_eq!(LeaveType::from_str("vacation").unwrap(), LeaveType::Vacation);
        assert!(LeaveType::from_str("sick").is_err());
    }

    #[test]
    fn balance_accessors_follow_leave_type() {
        let mut balance = LeaveBalance {
            id: 1,
            employee_id: 7,
            year: 2026,
            casual_leave_balance: dec!(3),
            vacation_leave_balance: dec!(10),
            casual_leave_accrued: dec!(3),
            vacation_leave_accrued: dec!(10),
        };
        assert_eq!(balance.available(LeaveType::Casual), dec!(3));
        balance.set_available(LeaveType::Vacation, dec!(5));
        assert_eq!(balance.vacation_leave_balance, dec!(5));
        assert_eq!(balance.casual_leave_balance, dec!(3));
        assert_eq!(balance.accrued(LeaveType::Vacation), dec!(10));
    }

    #[test]
    fn new_request_defaults_to_paid_leave() {
        let request: NewLeaveRequest = serde_json::from_value(serde_json::json!({
            "leave_type": "casual",
            "start_date": "2026-03-02",
            "end_date": "2026-03-04",
            "reason": "Moving house"
        }))
        .unwrap();
        assert!(request.is_with_pay);
        assert_eq!(request.calendar_days(), 3);
    }
}
