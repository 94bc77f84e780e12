use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{LedgerError, Operation, Violation};
use super::limits::max_storable;

/// Offset added to the internal id to form the customer-facing account number.
pub const ACCOUNT_NO_OFFSET: i64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Savings,
    Current,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Savings => "savings",
            AccountType::Current => "current",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "savings" => Ok(AccountType::Savings),
            "current" => Ok(AccountType::Current),
            other => Err(format!("unknown account type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub owner_id: Uuid,
    pub account_no: i64,
    pub account_type: AccountType,
    pub balance: Decimal,
    /// Loan requests made in the month of `last_loan_date`.
    pub loan_count: u32,
    pub last_loan_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Adds `amount` and returns the new balance. The account is left
    /// untouched when the result would not fit the balance column.
    pub fn credit(&mut self, amount: Decimal) -> Result<Decimal, LedgerError> {
        let maximum = max_storable();
        match self.balance.checked_add(amount) {
            Some(balance) if balance <= maximum => {
                self.balance = balance;
                Ok(balance)
            }
            _ => Err(Violation::BalanceLimit { maximum }.into()),
        }
    }

    /// Removes `amount` and returns the new balance. The account is left
    /// untouched when the balance does not cover it.
    pub fn debit(&mut self, amount: Decimal, operation: Operation) -> Result<Decimal, LedgerError> {
        if amount > self.balance {
            return Err(LedgerError::InsufficientBalance {
                operation,
                balance: self.balance,
                required: amount,
            });
        }
        self.balance -= amount;
        Ok(self.balance)
    }

    /// Zeroes the monthly loan counter when the last loan was taken in a
    /// different calendar month than `today`. Returns whether it did.
    pub fn roll_loan_month(&mut self, today: NaiveDate) -> bool {
        match self.last_loan_date {
            Some(last) if (last.year(), last.month()) != (today.year(), today.month()) => {
                self.loan_count = 0;
                true
            }
            _ => false,
        }
    }

    pub fn record_loan_request(&mut self, today: NaiveDate) {
        self.loan_count += 1;
        self.last_loan_date = Some(today);
    }
}

/// Everything needed to open an account; ids and the account number are
/// assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub owner_id: Uuid,
    pub account_type: AccountType,
    pub opened_at: DateTime<Utc>,
}
