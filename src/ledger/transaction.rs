use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::Account;
use super::error::{LedgerError, Operation};

/// Persisted transaction type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Loan,
    LoanPaid,
}

impl TransactionType {
    pub fn code(self) -> i16 {
        match self {
            TransactionType::Deposit => 1,
            TransactionType::Withdrawal => 2,
            TransactionType::Loan => 3,
            TransactionType::LoanPaid => 4,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(TransactionType::Deposit),
            2 => Some(TransactionType::Withdrawal),
            3 => Some(TransactionType::Loan),
            4 => Some(TransactionType::LoanPaid),
            _ => None,
        }
    }
}

/// The state a transaction record is in.
///
/// Loan records move `LoanRequested -> LoanApproved -> LoanPaid` (approval can
/// also be reverted back to `LoanRequested`); the other variants are final
/// from the moment they are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entry {
    Deposit,
    Withdrawal,
    LoanRequested,
    LoanApproved,
    LoanPaid,
}

impl Entry {
    pub fn transaction_type(self) -> TransactionType {
        match self {
            Entry::Deposit => TransactionType::Deposit,
            Entry::Withdrawal => TransactionType::Withdrawal,
            Entry::LoanRequested | Entry::LoanApproved => TransactionType::Loan,
            Entry::LoanPaid => TransactionType::LoanPaid,
        }
    }

    /// The stored approval flag. Only loan records carry one.
    pub fn loan_approve(self) -> Option<bool> {
        match self {
            Entry::Deposit | Entry::Withdrawal => None,
            Entry::LoanRequested => Some(false),
            Entry::LoanApproved | Entry::LoanPaid => Some(true),
        }
    }

    /// Rebuilds the state from the stored columns. An unset flag on a loan
    /// record counts as not approved.
    pub fn from_parts(transaction_type: TransactionType, loan_approve: Option<bool>) -> Self {
        match (transaction_type, loan_approve) {
            (TransactionType::Deposit, _) => Entry::Deposit,
            (TransactionType::Withdrawal, _) => Entry::Withdrawal,
            (TransactionType::Loan, Some(true)) => Entry::LoanApproved,
            (TransactionType::Loan, _) => Entry::LoanRequested,
            (TransactionType::LoanPaid, _) => Entry::LoanPaid,
        }
    }

    /// Signed effect this record currently has on the account balance.
    ///
    /// A paid loan was credited on approval and debited on repayment, so it
    /// nets to zero.
    pub fn net_effect(self, amount: Decimal) -> Decimal {
        match self {
            Entry::Deposit | Entry::LoanApproved => amount,
            Entry::Withdrawal => -amount,
            Entry::LoanRequested | Entry::LoanPaid => Decimal::ZERO,
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Entry::Deposit => "deposit",
            Entry::Withdrawal => "withdrawal",
            Entry::LoanRequested => "requested loan",
            Entry::LoanApproved => "approved loan",
            Entry::LoanPaid => "paid loan",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    pub amount: Decimal,
    pub balance_after_transaction: Decimal,
    pub entry: Entry,
    /// Creation time, never changes.
    pub timestamp: DateTime<Utc>,
    /// When the record's latest balance effect was applied.
    pub posted_at: DateTime<Utc>,
}

impl Transaction {
    pub fn transaction_type(&self) -> TransactionType {
        self.entry.transaction_type()
    }

    pub fn loan_approve(&self) -> Option<bool> {
        self.entry.loan_approve()
    }

    /// Splits loan records out into their typed lifecycle states.
    pub fn into_loan(self) -> Result<Loan, Transaction> {
        match self.entry {
            Entry::LoanRequested => Ok(Loan::Pending(PendingLoan(self))),
            Entry::LoanApproved => Ok(Loan::Approved(ApprovedLoan(self))),
            Entry::LoanPaid => Ok(Loan::Paid(self)),
            Entry::Deposit | Entry::Withdrawal => Err(self),
        }
    }

    fn posted(mut self, entry: Entry, balance: Decimal, at: DateTime<Utc>) -> Self {
        self.entry = entry;
        self.balance_after_transaction = balance;
        self.posted_at = at;
        self
    }
}

/// A transaction about to be appended to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub account_id: i64,
    pub amount: Decimal,
    pub balance_after_transaction: Decimal,
    pub entry: Entry,
    pub timestamp: DateTime<Utc>,
}

impl NewTransaction {
    /// Stamps a record with the account's current balance.
    pub fn against(account: &Account, amount: Decimal, entry: Entry, at: DateTime<Utc>) -> Self {
        NewTransaction {
            account_id: account.id,
            amount,
            balance_after_transaction: account.balance,
            entry,
            timestamp: at,
        }
    }
}

/// A loan record split by lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loan {
    Pending(PendingLoan),
    Approved(ApprovedLoan),
    Paid(Transaction),
}

/// A loan request that has not been approved yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLoan(Transaction);

impl PendingLoan {
    /// Credits the loan to the account.
    pub fn approve(self, account: &mut Account, at: DateTime<Utc>) -> Result<Transaction, LedgerError> {
        let balance = account.credit(self.0.amount)?;
        Ok(self.0.posted(Entry::LoanApproved, balance, at))
    }

    pub fn into_inner(self) -> Transaction {
        self.0
    }
}

/// An approved loan that is still owed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovedLoan(Transaction);

impl ApprovedLoan {
    /// Takes the credit back and returns the record to the pending state.
    /// Fails without touching the account when the balance no longer covers
    /// the loan.
    pub fn revert(self, account: &mut Account, at: DateTime<Utc>) -> Result<Transaction, LedgerError> {
        let balance = account.debit(self.0.amount, Operation::ApprovalReversal)?;
        Ok(self.0.posted(Entry::LoanRequested, balance, at))
    }

    /// Pays the loan back from the account balance.
    pub fn repay(self, account: &mut Account, at: DateTime<Utc>) -> Result<Transaction, LedgerError> {
        let balance = account.debit(self.0.amount, Operation::LoanRepayment)?;
        Ok(self.0.posted(Entry::LoanPaid, balance, at))
    }

    pub fn amount(&self) -> Decimal {
        self.0.amount
    }

    pub fn into_inner(self) -> Transaction {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use uuid::Uuid;

    use super::*;
    use crate::ledger::account::AccountType;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 10, 0, 0).unwrap()
    }

    fn account(balance: i64) -> Account {
        Account {
            id: 1,
            owner_id: Uuid::nil(),
            account_no: 100001,
            account_type: AccountType::Savings,
            balance: Decimal::from(balance),
            loan_count: 0,
            last_loan_date: None,
            created_at: at(1),
        }
    }

    fn loan(amount: i64, entry: Entry, snapshot: i64) -> Transaction {
        Transaction {
            id: 7,
            account_id: 1,
            amount: Decimal::from(amount),
            balance_after_transaction: Decimal::from(snapshot),
            entry,
            timestamp: at(2),
            posted_at: at(2),
        }
    }

    #[test]
    fn stored_columns_round_trip_through_entry() {
        let cases = [
            (Entry::Deposit, 1, None),
            (Entry::Withdrawal, 2, None),
            (Entry::LoanRequested, 3, Some(false)),
            (Entry::LoanApproved, 3, Some(true)),
            (Entry::LoanPaid, 4, Some(true)),
        ];
        for (entry, code, flag) in cases {
            assert_eq!(entry.transaction_type().code(), code);
            assert_eq!(entry.loan_approve(), flag);
            let ty = TransactionType::from_code(code).unwrap();
            assert_eq!(Entry::from_parts(ty, flag), entry);
        }
        assert_eq!(TransactionType::from_code(9), None);
    }

    #[test]
    fn unset_flag_on_loan_reads_as_pending() {
        assert_eq!(Entry::from_parts(TransactionType::Loan, None), Entry::LoanRequested);
    }

    #[test]
    fn approve_credits_account_and_stamps_snapshot() {
        let mut acct = account(1000);
        let Ok(Loan::Pending(pending)) = loan(2500, Entry::LoanRequested, 1000).into_loan() else {
            panic!("expected pending loan");
        };

        let approved = pending.approve(&mut acct, at(5)).unwrap();
        assert_eq!(acct.balance, Decimal::from(3500));
        assert_eq!(approved.entry, Entry::LoanApproved);
        assert_eq!(approved.balance_after_transaction, Decimal::from(3500));
        assert_eq!(approved.posted_at, at(5));
        assert_eq!(approved.timestamp, at(2));
    }

    #[test]
    fn revert_without_funds_leaves_account_alone() {
        let mut acct = account(1000);
        let Ok(Loan::Approved(approved)) = loan(2500, Entry::LoanApproved, 3500).into_loan() else {
            panic!("expected approved loan");
        };

        let err = approved.revert(&mut acct, at(6)).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientBalance { operation: Operation::ApprovalReversal, .. }
        ));
        assert_eq!(acct.balance, Decimal::from(1000));
    }

    #[test]
    fn repay_reclassifies_record() {
        let mut acct = account(4000);
        let Ok(Loan::Approved(approved)) = loan(2500, Entry::LoanApproved, 3500).into_loan() else {
            panic!("expected approved loan");
        };

        let paid = approved.repay(&mut acct, at(9)).unwrap();
        assert_eq!(acct.balance, Decimal::from(1500));
        assert_eq!(paid.transaction_type(), TransactionType::LoanPaid);
        assert_eq!(paid.balance_after_transaction, Decimal::from(1500));
    }

    #[test]
    fn non_loan_records_are_not_loans() {
        let deposit = loan(200, Entry::Deposit, 200);
        assert!(deposit.clone().into_loan().is_err());
        assert_eq!(Entry::Deposit.net_effect(deposit.amount), Decimal::from(200));
        assert_eq!(Entry::LoanPaid.net_effect(deposit.amount), Decimal::ZERO);
    }
}
