use rust_decimal::Decimal;

use super::error::{Operation, Violation};

/// Largest amount a NUMERIC(12, 2) column holds is 9_999_999_999.99.
pub(crate) const AMOUNT_CEILING: i64 = 10_000_000_000;

/// Largest amount or balance that can be stored.
pub fn max_storable() -> Decimal {
    Decimal::new(AMOUNT_CEILING * 100 - 1, 2)
}

/// Amount bounds and loan rules applied to customer requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    pub min_deposit: Decimal,
    pub min_withdrawal: Decimal,
    pub max_withdrawal: Decimal,
    pub min_loan: Decimal,
    pub max_loan: Decimal,
    pub monthly_loan_limit: u32,
    /// Records shown by the history report when no date range is given.
    pub recent_history: i64,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            min_deposit: Decimal::from(100),
            min_withdrawal: Decimal::from(500),
            max_withdrawal: Decimal::from(20_000),
            min_loan: Decimal::from(2_000),
            max_loan: Decimal::from(1_000_000),
            monthly_loan_limit: 3,
            recent_history: 10,
        }
    }
}

impl Limits {
    pub fn check_deposit(&self, amount: Decimal) -> Result<Decimal, Violation> {
        let amount = check_amount(amount)?;
        if amount < self.min_deposit {
            return Err(Violation::BelowMinimum {
                operation: Operation::Deposit,
                minimum: self.min_deposit,
            });
        }
        Ok(amount)
    }

    /// Bounds only; whether the balance covers it is up to the account.
    pub fn check_withdrawal(&self, amount: Decimal) -> Result<Decimal, Violation> {
        let amount = check_amount(amount)?;
        if amount < self.min_withdrawal {
            return Err(Violation::BelowMinimum {
                operation: Operation::Withdrawal,
                minimum: self.min_withdrawal,
            });
        }
        if amount > self.max_withdrawal {
            return Err(Violation::AboveMaximum {
                operation: Operation::Withdrawal,
                maximum: self.max_withdrawal,
            });
        }
        Ok(amount)
    }

    pub fn check_loan(&self, amount: Decimal) -> Result<Decimal, Violation> {
        let amount = check_amount(amount)?;
        if amount < self.min_loan {
            return Err(Violation::BelowMinimum {
                operation: Operation::LoanRequest,
                minimum: self.min_loan,
            });
        }
        if amount > self.max_loan {
            return Err(Violation::AboveMaximum {
                operation: Operation::LoanRequest,
                maximum: self.max_loan,
            });
        }
        Ok(amount)
    }
}

/// Shape check shared by every operation that takes an amount.
pub fn check_amount(amount: Decimal) -> Result<Decimal, Violation> {
    let amount = amount.normalize();
    if amount <= Decimal::ZERO || amount.scale() > 2 || amount >= Decimal::from(AMOUNT_CEILING) {
        return Err(Violation::MalformedAmount);
    }
    Ok(amount)
}
