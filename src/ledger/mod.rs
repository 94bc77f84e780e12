//! Accounts, the transaction log, and the rules that move money between them.

mod account;
mod audit;
mod clock;
mod error;
mod limits;
mod report;
mod service;
mod transaction;

pub use account::{Account, AccountType, NewAccount, ACCOUNT_NO_OFFSET};
pub use audit::{audit, AuditReport};
pub use clock::{Clock, SystemClock};
pub use error::{LedgerError, LedgerResult, Operation, Violation};
pub use limits::{check_amount, max_storable, Limits};
pub use report::{DateRange, Statement};
pub use service::{Approval, LedgerService};
pub use transaction::{
    ApprovedLoan, Entry, Loan, NewTransaction, PendingLoan, Transaction, TransactionType,
};
