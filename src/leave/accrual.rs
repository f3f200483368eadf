//! Leave entitlement arithmetic.
//!
//! Entitlement is a pure function of the hire date and "today". Reconciliation
//! compares it with the stored balance and only ever grants the positive
//! difference, so a deduction is never undone by a later accrual run.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::error::{LeaveError, LeaveResult};
use crate::model::leave::{LeaveBalance, LeaveType};

pub const WORKING_DAYS_PER_WEEK: i64 = 5;
/// Working days needed to earn one casual day.
pub const WORKING_DAYS_PER_CASUAL_DAY: i64 = 20;
pub const MONTHS_PER_QUARTER: i64 = 3;
pub const VACATION_DAYS_PER_QUARTER: i64 = 5;

/// Days earned since the hire date, independent of days already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entitlement {
    pub working_days: i64,
    pub completed_quarters: i64,
    pub casual: Decimal,
    pub vacation: Decimal,
}

impl Entitlement {
    /// Fails for a hire date in the future instead of producing negative days.
    pub fn as_of(start_date: NaiveDate, today: NaiveDate) -> LeaveResult<Self> {
        ensure_started(start_date, today)?;

        let working_days = working_days_since(start_date, today);
        let completed_quarters = months_since(start_date, today) / MONTHS_PER_QUARTER;

        Ok(Self {
            working_days,
            completed_quarters,
            casual: Decimal::from(working_days / WORKING_DAYS_PER_CASUAL_DAY),
            vacation: Decimal::from(completed_quarters * VACATION_DAYS_PER_QUARTER),
        })
    }

    pub fn days(&self, leave_type: LeaveType) -> Decimal {
        match leave_type {
            LeaveType::Casual => self.casual,
            LeaveType::Vacation => self.vacation,
        }
    }

    fn reason(&self, leave_type: LeaveType, amount: Decimal) -> String {
        match leave_type {
            LeaveType::Casual => format!(
                "Earned {} casual day(s): {} working days since start date",
                amount.normalize(),
                self.working_days
            ),
            LeaveType::Vacation => format!(
                "Earned {} vacation day(s): {} completed quarter(s) since start date",
                amount.normalize(),
                self.completed_quarters
            ),
        }
    }
}

fn ensure_started(start_date: NaiveDate, today: NaiveDate) -> LeaveResult<()> {
    if start_date > today {
        return Err(LeaveError::invalid(format!(
            "start date {start_date} is after {today}"
        )));
    }
    Ok(())
}

/// Whole weeks since hire times five; the partial-week remainder is dropped.
pub fn working_days_since(start_date: NaiveDate, today: NaiveDate) -> i64 {
    let days = (today - start_date).num_days();
    (days / 7) * WORKING_DAYS_PER_WEEK
}

/// Calendar-month difference, ignoring the day of month.
pub fn months_since(start_date: NaiveDate, today: NaiveDate) -> i64 {
    let years = i64::from(today.year() - start_date.year());
    let months = i64::from(today.month()) - i64::from(start_date.month());
    years * 12 + months
}

pub fn casual_entitlement(start_date: NaiveDate, today: NaiveDate) -> LeaveResult<Decimal> {
    Entitlement::as_of(start_date, today).map(|e| e.casual)
}

/// Uncapped: no annual ceiling is applied.
pub fn vacation_entitlement(start_date: NaiveDate, today: NaiveDate) -> LeaveResult<Decimal> {
    Entitlement::as_of(start_date, today).map(|e| e.vacation)
}

/// A single balance increase produced by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccrualGrant {
    pub leave_type: LeaveType,
    /// Newly earned days (the delta).
    pub amount: Decimal,
    /// Spendable balance after the grant.
    pub new_balance: Decimal,
    /// Entitlement watermark after the grant, set absolutely.
    pub new_accrued: Decimal,
    pub reason: String,
}

/// Diff computed entitlement against what the balance row has already been granted.
///
/// Types whose entitlement does not exceed the watermark produce nothing, so
/// days spent since the last run stay spent.
pub fn plan_accruals(balance: &LeaveBalance, entitlement: &Entitlement) -> Vec<AccrualGrant> {
    LeaveType::ALL
        .into_iter()
        .filter_map(|leave_type| {
            let earned = entitlement.days(leave_type);
            let granted = balance.accrued(leave_type);
            if earned <= granted {
                return None;
            }
            let amount = earned - granted;
            Some(AccrualGrant {
                leave_type,
                amount,
                new_balance: balance.available(leave_type) + amount,
                new_accrued: earned,
                reason: entitlement.reason(leave_type, amount),
            })
        })
        .collect()
}

/// Apply grants to an in-memory copy of the row.
pub fn apply_grants(balance: &mut LeaveBalance, grants: &[AccrualGrant]) {
    for grant in grants {
        balance.set_available(grant.leave_type, grant.new_balance);
        balance.set_accrued(grant.leave_type, grant.new_accrued);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn balance(casual: Decimal, vacation: Decimal) -> LeaveBalance {
        LeaveBalance {
            id: 1,
            employee_id: 42,
            year: 2026,
            casual_leave_balance: casual,
            vacation_leave_balance: vacation,
            casual_leave_accrued: casual,
            vacation_leave_accrued: vacation,
        }
    }

    #[rstest]
    #[case(0, dec!(0))]
    #[case(27, dec!(0))]
    #[case(28, dec!(1))]
    #[case(139, dec!(4))]
    #[case(140, dec!(5))]
    #[case(365, dec!(13))]
    fn casual_days_follow_completed_weeks(#[case] days_ago: i64, #[case] expected: Decimal) {
        let today = date(2026, 10, 18);
        let start = today - Duration::days(days_ago);
        assert_eq!(casual_entitlement(start, today).unwrap(), expected);
    }

    #[test]
    fn partial_weeks_do_not_count_as_working_days() {
        let today = date(2026, 10, 18);
        assert_eq!(working_days_since(today - Duration::days(13), today), 5);
        assert_eq!(working_days_since(today - Duration::days(14), today), 10);
    }

    #[rstest]
    #[case(date(2026, 1, 18), dec!(15))]
    #[case(date(2026, 2, 18), dec!(10))]
    #[case(date(2026, 8, 1), dec!(0))]
    #[case(date(2025, 10, 18), dec!(20))]
    #[case(date(2023, 10, 18), dec!(60))]
    fn vacation_days_follow_completed_quarters(
        #[case] start: NaiveDate,
        #[case] expected: Decimal,
    ) {
        let today = date(2026, 10, 18);
        assert_eq!(vacation_entitlement(start, today).unwrap(), expected);
    }

    #[test]
    fn month_difference_ignores_day_of_month() {
        assert_eq!(months_since(date(2026, 1, 31), date(2026, 2, 1)), 1);
        assert_eq!(months_since(date(2025, 12, 1), date(2026, 3, 31)), 3);
        assert_eq!(months_since(date(2026, 4, 1), date(2026, 4, 30)), 0);
    }

    #[test]
    fn future_start_date_is_rejected() {
        let err = Entitlement::as_of(date(2026, 11, 1), date(2026, 10, 18)).unwrap_err();
        assert!(matches!(err, LeaveError::InvalidInput(_)));
    }

    #[test]
    fn plan_grants_only_positive_growth() {
        let entitlement = Entitlement::as_of(date(2026, 1, 1), date(2026, 7, 1)).unwrap();
        assert_eq!(entitlement.casual, dec!(6));
        assert_eq!(entitlement.vacation, dec!(10));

        let grants = plan_accruals(&balance(dec!(4), dec!(10)), &entitlement);
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].leave_type, LeaveType::Casual);
        assert_eq!(grants[0].amount, dec!(2));
        assert_eq!(grants[0].new_balance, dec!(6));
        assert!(grants[0].reason.contains("casual"));
    }

    #[test]
    fn plan_is_empty_once_balance_matches() {
        let entitlement = Entitlement::as_of(date(2026, 1, 1), date(2026, 7, 1)).unwrap();
        let mut stored = balance(Decimal::ZERO, Decimal::ZERO);
        let grants = plan_accruals(&stored, &entitlement);
        assert_eq!(grants.len(), 2);
        apply_grants(&mut stored, &grants);
        assert!(plan_accruals(&stored, &entitlement).is_empty());
    }

    #[test]
    fn deducted_days_are_not_granted_back() {
        let entitlement = Entitlement::as_of(date(2026, 1, 1), date(2026, 7, 1)).unwrap();
        let mut stored = balance(dec!(6), dec!(10));
        // three vacation days spent since the last run
        stored.set_available(LeaveType::Vacation, dec!(7));
        assert!(plan_accruals(&stored, &entitlement).is_empty());

        // growth after the spend is added on top of what is left
        let later = Entitlement::as_of(date(2026, 1, 1), date(2026, 10, 1)).unwrap();
        let grants = plan_accruals(&stored, &later);
        let vacation = grants
            .iter()
            .find(|g| g.leave_type == LeaveType::Vacation)
            .unwrap();
        assert_eq!(vacation.amount, dec!(5));
        assert_eq!(vacation.new_balance, dec!(12));
        assert_eq!(vacation.new_accrued, dec!(15));
    }

    proptest! {
        #[test]
        fn entitlement_never_decreases_as_time_passes(
            start_offset in 0i64..3_000,
            first in 0i64..2_000,
            step in 0i64..2_000,
        ) {
            let start = date(2018, 1, 1) + Duration::days(start_offset);
            let earlier = start + Duration::days(first);
            let later = earlier + Duration::days(step);

            let a = Entitlement::as_of(start, earlier).unwrap();
            let b = Entitlement::as_of(start, later).unwrap();
            prop_assert!(b.casual >= a.casual);
            prop_assert!(b.vacation >= a.vacation);
        }
    }
}
