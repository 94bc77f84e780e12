use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::Account;
use super::transaction::Transaction;

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Transaction history for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub account: Account,
    pub range: Option<DateRange>,
    /// Newest first.
    pub transactions: Vec<Transaction>,
    /// Balance at the end of the range, or the live balance without one.
    pub balance: Decimal,
}

impl Statement {
    pub fn new(account: Account, range: Option<DateRange>, transactions: Vec<Transaction>) -> Self {
        let balance = match range {
            Some(_) => transactions
                .first()
                .map(|t| t.balance_after_transaction)
                .unwrap_or(Decimal::ZERO),
            None => account.balance,
        };
        Statement {
            account,
            range,
            transactions,
            balance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let range = DateRange::new(date(3), date(5));
        assert!(range.contains(date(3)));
        assert!(range.contains(date(5)));
        assert!(!range.contains(date(6)));
        assert!(!range.contains(date(2)));
    }

    #[test]
    fn inverted_range_matches_nothing() {
        let range = DateRange::new(date(5), date(3));
        assert!(!range.contains(date(4)));
    }
}
