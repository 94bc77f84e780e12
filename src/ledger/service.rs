use std::sync::Arc;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::account::{Account, AccountType, NewAccount};
use super::audit::{audit, AuditReport};
use super::clock::{Clock, SystemClock};
use super::error::{LedgerError, LedgerResult, Operation, Violation};
use super::limits::{check_amount, Limits};
use super::report::{DateRange, Statement};
use super::transaction::{Entry, Loan, NewTransaction, Transaction, TransactionType};
use crate::db::{Store, StoreError, TransactionQuery, TypeFilter, UnitOfWork};
use crate::notify::{Notice, Notification, Notifier};

/// Outcome of an admin approval command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "transaction", rename_all = "snake_case")]
pub enum Approval {
    /// The loan changed state and the balance moved with it.
    Applied(Transaction),
    /// The loan was already in the requested state.
    Unchanged(Transaction),
}

impl Approval {
    pub fn transaction(&self) -> &Transaction {
        match self {
            Approval::Applied(t) | Approval::Unchanged(t) => t,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Approval::Applied(_))
    }
}

/// Every balance-affecting operation.
///
/// Each mutating call runs in a single unit of work: the account is locked,
/// the rules are checked, the account and its transaction record are written
/// and the unit is committed. Any early return drops the unit and rolls back.
///
/// Posting times are read from the clock only once the account row is held,
/// so records of one account are stamped in the order they commit.
pub struct LedgerService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    limits: Limits,
}

impl LedgerService {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>, limits: Limits) -> Self {
        Self {
            store,
            notifier,
            clock: Arc::new(SystemClock),
            limits,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn open_account(&self, owner_id: Uuid, account_type: AccountType) -> LedgerResult<Account> {
        let mut uow = self.store.begin().await?;
        if uow.lock_account_for_owner(owner_id).await?.is_some() {
            return Err(LedgerError::AccountExists);
        }

        let account = uow
            .create_account(NewAccount {
                owner_id,
                account_type,
                opened_at: self.clock.now(),
            })
            .await
            .map_err(|err| match err {
                StoreError::Conflict(_) => LedgerError::AccountExists,
                other => other.into(),
            })?;
        uow.commit().await?;

        tracing::info!(account_no = account.account_no, %owner_id, "account opened");
        Ok(account)
    }

    pub async fn account(&self, owner_id: Uuid) -> LedgerResult<Account> {
        self.store
            .account_for_owner(owner_id)
            .await?
            .ok_or(LedgerError::NotFound("account"))
    }

    pub async fn deposit(&self, owner_id: Uuid, amount: Decimal) -> LedgerResult<Transaction> {
        let amount = self.limits.check_deposit(amount)?;

        let mut uow = self.store.begin().await?;
        let mut account = lock_owned_account(uow.as_mut(), owner_id).await?;
        let now = self.posting_time(uow.as_mut(), account.id).await?;
        let balance = match account.credit(amount) {
            Ok(balance) => balance,
            Err(err) => {
                tracing::warn!(account_no = account.account_no, %amount, balance = %account.balance, "deposit exceeds balance limit");
                return Err(err);
            }
        };
        uow.update_account(&account).await?;
        let record = uow
            .insert_transaction(NewTransaction::against(&account, amount, Entry::Deposit, now))
            .await?;
        uow.commit().await?;

        tracing::info!(account_no = account.account_no, %amount, %balance, "deposit posted");
        self.notify(&account, amount, Notice::Deposit);
        Ok(record)
    }

    pub async fn withdraw(&self, owner_id: Uuid, amount: Decimal) -> LedgerResult<Transaction> {
        let amount = self.limits.check_withdrawal(amount)?;

        let mut uow = self.store.begin().await?;
        let mut account = lock_owned_account(uow.as_mut(), owner_id).await?;
        let now = self.posting_time(uow.as_mut(), account.id).await?;
        let balance = match account.debit(amount, Operation::Withdrawal) {
            Ok(balance) => balance,
            Err(err) => {
                tracing::warn!(account_no = account.account_no, %amount, balance = %account.balance, "withdrawal exceeds balance");
                return Err(err);
            }
        };
        uow.update_account(&account).await?;
        let record = uow
            .insert_transaction(NewTransaction::against(&account, amount, Entry::Withdrawal, now))
            .await?;
        uow.commit().await?;

        tracing::info!(account_no = account.account_no, %amount, %balance, "withdrawal posted");
        self.notify(&account, amount, Notice::Withdrawal);
        Ok(record)
    }

    /// Files a loan request. The balance does not move until an admin
    /// approves it.
    pub async fn request_loan(&self, owner_id: Uuid, amount: Decimal) -> LedgerResult<Transaction> {
        let amount = self.limits.check_loan(amount)?;

        let mut uow = self.store.begin().await?;
        let mut account = lock_owned_account(uow.as_mut(), owner_id).await?;
        let now = self.posting_time(uow.as_mut(), account.id).await?;
        let today = now.date_naive();
        let rolled_over = account.roll_loan_month(today);

        if let Err(violation) = self.loan_eligibility(uow.as_mut(), &account).await? {
            tracing::warn!(account_no = account.account_no, %amount, reason = %violation, "loan request rejected");
            // the new month's counter reset stands even though the request does not
            if rolled_over {
                uow.update_account(&account).await?;
                uow.commit().await?;
            }
            return Err(violation.into());
        }

        account.record_loan_request(today);
        uow.update_account(&account).await?;
        let record = uow
            .insert_transaction(NewTransaction::against(&account, amount, Entry::LoanRequested, now))
            .await?;
        uow.commit().await?;

        tracing::info!(
            account_no = account.account_no,
            %amount,
            loan_count = account.loan_count,
            transaction_id = record.id,
            "loan requested"
        );
        self.notify(&account, amount, Notice::LoanRequest);
        Ok(record)
    }

    async fn loan_eligibility(&self, uow: &mut dyn UnitOfWork, account: &Account) -> LedgerResult<Result<(), Violation>> {
        if account.loan_count >= self.limits.monthly_loan_limit {
            return Ok(Err(Violation::MonthlyLoanLimit {
                limit: self.limits.monthly_loan_limit,
            }));
        }

        let loans = uow
            .transactions(&TransactionQuery::for_account(account.id).types(TypeFilter::Only(TransactionType::Loan)))
            .await?;
        if loans.iter().any(|t| t.entry == Entry::LoanRequested) {
            return Ok(Err(Violation::PendingLoan));
        }
        if loans.iter().any(|t| t.entry == Entry::LoanApproved) {
            return Ok(Err(Violation::UnpaidLoan));
        }
        Ok(Ok(()))
    }

    /// The caller's loan records that are still of type LOAN.
    pub async fn loans(&self, owner_id: Uuid) -> LedgerResult<Vec<Transaction>> {
        let account = self.account(owner_id).await?;
        let query = TransactionQuery::for_account(account.id).types(TypeFilter::Only(TransactionType::Loan));
        Ok(self.store.transactions(&query).await?)
    }

    /// Pays back an approved loan in full.
    pub async fn repay_loan(&self, owner_id: Uuid, transaction_id: i64) -> LedgerResult<Transaction> {
        let mut uow = self.store.begin().await?;
        let mut account = lock_owned_account(uow.as_mut(), owner_id).await?;

        let loan = match uow.lock_transaction(transaction_id).await? {
            Some(t) if t.account_id == account.id => t.into_loan(),
            _ => return Err(LedgerError::NotFound("loan")),
        };
        let Ok(Loan::Approved(loan)) = loan else {
            return Err(LedgerError::NotFound("loan"));
        };

        let now = self.posting_time(uow.as_mut(), account.id).await?;
        let amount = loan.amount();
        let paid = match loan.repay(&mut account, now) {
            Ok(paid) => paid,
            Err(err) => {
                tracing::warn!(account_no = account.account_no, transaction_id, %amount, "insufficient balance to pay loan");
                return Err(err);
            }
        };
        uow.update_account(&account).await?;
        uow.update_transaction(&paid).await?;
        uow.commit().await?;

        tracing::info!(account_no = account.account_no, transaction_id, %amount, balance = %account.balance, "loan paid");
        Ok(paid)
    }

    /// Transaction history for the caller. With a range every matching record
    /// is returned; without one only the most recent few.
    pub async fn statement(&self, owner_id: Uuid, range: Option<DateRange>) -> LedgerResult<Statement> {
        let account = self.account(owner_id).await?;
        let mut query = TransactionQuery::for_account(account.id).range(range);
        if range.is_none() {
            query = query.limit(self.limits.recent_history);
        }
        let transactions = self.store.transactions(&query).await?;
        Ok(Statement::new(account, range, transactions))
    }

    /// Admin: records a loan directly, optionally already approved.
    pub async fn create_loan(&self, account_no: i64, amount: Decimal, approved: bool) -> LedgerResult<Transaction> {
        let amount = check_amount(amount)?;

        let mut uow = self.store.begin().await?;
        let mut account = uow
            .lock_account_by_number(account_no)
            .await?
            .ok_or(LedgerError::NotFound("account"))?;
        let now = self.posting_time(uow.as_mut(), account.id).await?;

        let entry = if approved {
            account.credit(amount)?;
            uow.update_account(&account).await?;
            Entry::LoanApproved
        } else {
            Entry::LoanRequested
        };
        let record = uow
            .insert_transaction(NewTransaction::against(&account, amount, entry, now))
            .await?;
        uow.commit().await?;

        tracing::info!(account_no, %amount, approved, transaction_id = record.id, "loan recorded by admin");
        self.notify(&account, amount, Notice::LoanApproval);
        Ok(record)
    }

    /// Admin: credits a pending loan to its account.
    pub async fn approve_loan(&self, transaction_id: i64) -> LedgerResult<Approval> {
        let mut uow = self.store.begin().await?;
        let (mut account, loan) = lock_loan(uow.as_mut(), transaction_id).await?;

        let pending = match loan {
            Loan::Pending(pending) => pending,
            Loan::Approved(approved) => return Ok(Approval::Unchanged(approved.into_inner())),
            Loan::Paid(_) => {
                return Err(LedgerError::IllegalTransition {
                    action: "approve",
                    state: Entry::LoanPaid,
                })
            }
        };
        let now = self.posting_time(uow.as_mut(), account.id).await?;
        let approved = match pending.approve(&mut account, now) {
            Ok(approved) => approved,
            Err(err) => {
                tracing::warn!(account_no = account.account_no, transaction_id, "loan approval exceeds balance limit");
                return Err(err);
            }
        };
        uow.update_account(&account).await?;
        uow.update_transaction(&approved).await?;
        uow.commit().await?;

        tracing::info!(account_no = account.account_no, transaction_id, amount = %approved.amount, balance = %account.balance, "loan approved");
        self.notify(&account, approved.amount, Notice::LoanApproval);
        Ok(Approval::Applied(approved))
    }

    /// Admin: takes back an approved loan. Refused, with nothing written,
    /// when the balance no longer covers the loan.
    pub async fn revert_loan_approval(&self, transaction_id: i64) -> LedgerResult<Approval> {
        let mut uow = self.store.begin().await?;
        let (mut account, loan) = lock_loan(uow.as_mut(), transaction_id).await?;

        let approved = match loan {
            Loan::Approved(approved) => approved,
            Loan::Pending(pending) => return Ok(Approval::Unchanged(pending.into_inner())),
            Loan::Paid(_) => {
                return Err(LedgerError::IllegalTransition {
                    action: "revert",
                    state: Entry::LoanPaid,
                })
            }
        };
        let now = self.posting_time(uow.as_mut(), account.id).await?;
        let reverted = match approved.revert(&mut account, now) {
            Ok(reverted) => reverted,
            Err(err) => {
                tracing::warn!(account_no = account.account_no, transaction_id, "insufficient balance to reverse loan");
                return Err(err);
            }
        };
        uow.update_account(&account).await?;
        uow.update_transaction(&reverted).await?;
        uow.commit().await?;

        tracing::info!(account_no = account.account_no, transaction_id, amount = %reverted.amount, balance = %account.balance, "loan approval reverted");
        self.notify(&account, reverted.amount, Notice::LoanApproval);
        Ok(Approval::Applied(reverted))
    }

    /// Admin: sets the approval flag, dispatching to approve or revert.
    pub async fn set_loan_approval(&self, transaction_id: i64, approved: bool) -> LedgerResult<Approval> {
        if approved {
            self.approve_loan(transaction_id).await
        } else {
            self.revert_loan_approval(transaction_id).await
        }
    }

    /// Admin: listing of every transaction, split by whether it is a loan.
    pub async fn all_transactions(&self, loans: bool) -> LedgerResult<Vec<Transaction>> {
        let types = if loans {
            TypeFilter::Only(TransactionType::Loan)
        } else {
            TypeFilter::Except(TransactionType::Loan)
        };
        let query = TransactionQuery::default().types(types);
        Ok(self.store.transactions(&query).await?)
    }

    /// Admin: replays an account's log against its balance.
    pub async fn audit_account(&self, account_no: i64) -> LedgerResult<AuditReport> {
        let account = self
            .store
            .account_by_number(account_no)
            .await?
            .ok_or(LedgerError::NotFound("account"))?;
        let log = self.store.transactions(&TransactionQuery::for_account(account.id)).await?;

        let report = audit(&account, &log);
        if !report.consistent {
            tracing::error!(
                account_no,
                balance = %report.balance,
                replayed = %report.replayed_balance,
                "ledger replay does not match account balance"
            );
        }
        Ok(report)
    }

    /// Posting time for a write to a locked account: the clock, truncated to
    /// the database's microsecond precision, and always after the account's
    /// last posting even when the clock steps back.
    async fn posting_time(&self, uow: &mut dyn UnitOfWork, account_id: i64) -> LedgerResult<DateTime<Utc>> {
        let now = self.clock.now();
        let now = now.duration_trunc(TimeDelta::microseconds(1)).unwrap_or(now);
        match uow.last_posted_at(account_id).await? {
            Some(last) if now <= last => Ok(last + TimeDelta::microseconds(1)),
            _ => Ok(now),
        }
    }

    fn notify(&self, account: &Account, amount: Decimal, notice: Notice) {
        self.notifier.notify(Notification::new(account.owner_id, amount, notice));
    }
}

async fn lock_owned_account(uow: &mut dyn UnitOfWork, owner_id: Uuid) -> LedgerResult<Account> {
    uow.lock_account_for_owner(owner_id)
        .await?
        .ok_or(LedgerError::NotFound("account"))
}

/// Locks a loan record together with its account, account first so admin
/// commands and customer repayments take locks in the same order.
async fn lock_loan(uow: &mut dyn UnitOfWork, transaction_id: i64) -> LedgerResult<(Account, Loan)> {
    let account_id = uow
        .transaction(transaction_id)
        .await?
        .ok_or(LedgerError::NotFound("loan"))?
        .account_id;
    let account = uow
        .lock_account(account_id)
        .await?
        .ok_or(LedgerError::NotFound("account"))?;
    let loan = uow
        .lock_transaction(transaction_id)
        .await?
        .ok_or(LedgerError::NotFound("loan"))?
        .into_loan()
        .map_err(|_| LedgerError::NotFound("loan"))?;
    Ok((account, loan))
}
