use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{Store, StoreError, StoreResult, TransactionQuery, UnitOfWork};
use crate::ledger::{Account, NewAccount, NewTransaction, Transaction, ACCOUNT_NO_OFFSET};

#[derive(Debug, Clone, Default)]
struct State {
    accounts: BTreeMap<i64, Account>,
    transactions: BTreeMap<i64, Transaction>,
    last_account_id: i64,
    last_transaction_id: i64,
}

impl State {
    fn account_for_owner(&self, owner_id: Uuid) -> Option<Account> {
        self.accounts.values().find(|a| a.owner_id == owner_id).cloned()
    }

    fn account_by_number(&self, account_no: i64) -> Option<Account> {
        self.accounts.values().find(|a| a.account_no == account_no).cloned()
    }

    fn transactions(&self, query: &TransactionQuery) -> Vec<Transaction> {
        let mut found: Vec<Transaction> = self
            .transactions
            .values()
            .filter(|t| query.matches(t))
            .cloned()
            .collect();
        found.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        if let Some(limit) = query.limit {
            found.truncate(usize::try_from(limit).unwrap_or(0));
        }
        found
    }
}

/// In-process store. Intended for tests and local runs.
///
/// A unit of work holds the store's single lock for its whole lifetime and
/// works on a copy of the state, which replaces the shared state on commit.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, working }))
    }

    async fn account_for_owner(&self, owner_id: Uuid) -> StoreResult<Option<Account>> {
        Ok(self.state.lock().await.account_for_owner(owner_id))
    }

    async fn account_by_number(&self, account_no: i64) -> StoreResult<Option<Account>> {
        Ok(self.state.lock().await.account_by_number(account_no))
    }

    async fn transactions(&self, query: &TransactionQuery) -> StoreResult<Vec<Transaction>> {
        Ok(self.state.lock().await.transactions(query))
    }
}

struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<State>,
    working: State,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn create_account(&mut self, new_account: NewAccount) -> StoreResult<Account> {
        if self.working.account_for_owner(new_account.owner_id).is_some() {
            return Err(StoreError::Conflict(format!("accounts.owner_id = {}", new_account.owner_id)));
        }
        self.working.last_account_id += 1;
        let id = self.working.last_account_id;
        let account = Account {
            id,
            owner_id: new_account.owner_id,
            account_no: ACCOUNT_NO_OFFSET + id,
            account_type: new_account.account_type,
            balance: Default::default(),
            loan_count: 0,
            last_loan_date: None,
            created_at: new_account.opened_at,
        };
        self.working.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn lock_account_for_owner(&mut self, owner_id: Uuid) -> StoreResult<Option<Account>> {
        Ok(self.working.account_for_owner(owner_id))
    }

    async fn lock_account(&mut self, account_id: i64) -> StoreResult<Option<Account>> {
        Ok(self.working.accounts.get(&account_id).cloned())
    }

    async fn lock_account_by_number(&mut self, account_no: i64) -> StoreResult<Option<Account>> {
        Ok(self.working.account_by_number(account_no))
    }

    async fn update_account(&mut self, account: &Account) -> StoreResult<()> {
        match self.working.accounts.get_mut(&account.id) {
            Some(stored) => {
                *stored = account.clone();
                Ok(())
            }
            None => Err(StoreError::Database(sqlx::Error::RowNotFound)),
        }
    }

    async fn insert_transaction(&mut self, new_transaction: NewTransaction) -> StoreResult<Transaction> {
        if !self.working.accounts.contains_key(&new_transaction.account_id) {
            return Err(StoreError::Corrupt(format!(
                "transaction references missing account {}",
                new_transaction.account_id
            )));
        }
        self.working.last_transaction_id += 1;
        let transaction = Transaction {
            id: self.working.last_transaction_id,
            account_id: new_transaction.account_id,
            amount: new_transaction.amount,
            balance_after_transaction: new_transaction.balance_after_transaction,
            entry: new_transaction.entry,
            timestamp: new_transaction.timestamp,
            posted_at: new_transaction.timestamp,
        };
        self.working.transactions.insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn transaction(&mut self, id: i64) -> StoreResult<Option<Transaction>> {
        Ok(self.working.transactions.get(&id).cloned())
    }

    async fn lock_transaction(&mut self, id: i64) -> StoreResult<Option<Transaction>> {
        Ok(self.working.transactions.get(&id).cloned())
    }

    async fn update_transaction(&mut self, transaction: &Transaction) -> StoreResult<()> {
        match self.working.transactions.get_mut(&transaction.id) {
            Some(stored) => {
                // creation time and ownership are fixed once written
                stored.amount = transaction.amount;
                stored.balance_after_transaction = transaction.balance_after_transaction;
                stored.entry = transaction.entry;
                stored.posted_at = transaction.posted_at;
                Ok(())
            }
            None => Err(StoreError::Database(sqlx::Error::RowNotFound)),
        }
    }

    async fn transactions(&mut self, query: &TransactionQuery) -> StoreResult<Vec<Transaction>> {
        Ok(self.working.transactions(query))
    }

    async fn last_posted_at(&mut self, account_id: i64) -> StoreResult<Option<DateTime<Utc>>> {
        Ok(self
            .working
            .transactions
            .values()
            .filter(|t| t.account_id == account_id)
            .map(|t| t.posted_at)
            .max())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryUnitOfWork { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
