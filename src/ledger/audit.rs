use rust_decimal::Decimal;
use serde::Serialize;

use super::account::Account;
use super::transaction::Transaction;

/// Result of replaying an account's transaction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub account_no: i64,
    pub balance: Decimal,
    /// Sum of the net effect of every record.
    pub replayed_balance: Decimal,
    /// Snapshot of the record whose effect was applied last.
    pub latest_snapshot: Option<Decimal>,
    pub transactions: usize,
    pub consistent: bool,
}

/// Replays `log` in posting order and checks it against the account.
///
/// Loan records are rewritten in place, so intermediate snapshots of older
/// records cannot be re-derived; the check covers the total and the record
/// posted last.
pub fn audit(account: &Account, log: &[Transaction]) -> AuditReport {
    let mut ordered: Vec<&Transaction> = log.iter().filter(|t| t.account_id == account.id).collect();
    ordered.sort_by_key(|t| (t.posted_at, t.id));

    let replayed_balance = ordered
        .iter()
        .fold(Decimal::ZERO, |acc, t| acc + t.entry.net_effect(t.amount));
    let latest_snapshot = ordered.last().map(|t| t.balance_after_transaction);

    let consistent = replayed_balance == account.balance
        && latest_snapshot.map_or(account.balance.is_zero(), |s| s == account.balance);

    AuditReport {
        account_no: account.account_no,
        balance: account.balance,
        replayed_balance,
        latest_snapshot,
        transactions: ordered.len(),
        consistent,
    }
}
