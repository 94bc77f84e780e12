use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

use super::transaction::Entry;
use crate::db::StoreError;

/// The user-facing operation an error was raised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Deposit,
    Withdrawal,
    LoanRequest,
    LoanRepayment,
    ApprovalReversal,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Operation::Deposit => "deposit",
            Operation::Withdrawal => "withdraw",
            Operation::LoanRequest => "request",
            Operation::LoanRepayment => "pay loan",
            Operation::ApprovalReversal => "reverse loan",
        };
        f.write_str(verb)
    }
}

/// A policy rule an input broke. Always reported against the `amount` field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("Amount must be positive, with at most 2 decimal places and 10 integer digits")]
    MalformedAmount,

    #[error("You need to {operation} at least {minimum} $")]
    BelowMinimum { operation: Operation, minimum: Decimal },

    #[error("You cannot {operation} more than {maximum} $")]
    AboveMaximum { operation: Operation, maximum: Decimal },

    #[error("Balance cannot exceed {maximum} $")]
    BalanceLimit { maximum: Decimal },

    #[error("You can't take more than {limit} loans in a month.")]
    MonthlyLoanLimit { limit: u32 },

    #[error("Admin has not approved your previous loan request yet. Please wait.")]
    PendingLoan,

    #[error("You have an approved loan that you haven't paid yet. Please pay it first.")]
    UnpaidLoan,
}

impl Violation {
    pub fn field(&self) -> &'static str {
        "amount"
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] Violation),

    #[error("Insufficient balance to {operation}: balance is {balance} $, {required} $ required")]
    InsufficientBalance {
        operation: Operation,
        balance: Decimal,
        required: Decimal,
    },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("an account already exists for this user")]
    AccountExists,

    #[error("cannot {action} a {state}")]
    IllegalTransition { action: &'static str, state: Entry },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violation_messages_name_the_operation() {
        let err = Violation::BelowMinimum {
            operation: Operation::Deposit,
            minimum: Decimal::from(100),
        };
        assert_eq!(err.to_string(), "You need to deposit at least 100 $");

        let err = Violation::AboveMaximum {
            operation: Operation::Withdrawal,
            maximum: Decimal::from(20000),
        };
        assert_eq!(err.to_string(), "You cannot withdraw more than 20000 $");
    }

    #[test]
    fn insufficient_balance_message() {
        let err = LedgerError::InsufficientBalance {
            operation: Operation::ApprovalReversal,
            balance: Decimal::from(10),
            required: Decimal::from(2000),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient balance to reverse loan: balance is 10 $, 2000 $ required"
        );
    }
}
