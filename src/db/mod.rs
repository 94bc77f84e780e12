use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::ledger::{Account, DateRange, NewAccount, NewTransaction, Transaction, TransactionType};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Which transaction types a listing should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeFilter {
    #[default]
    Any,
    Only(TransactionType),
    Except(TransactionType),
}

impl TypeFilter {
    pub fn matches(&self, transaction_type: TransactionType) -> bool {
        match self {
            TypeFilter::Any => true,
            TypeFilter::Only(t) => *t == transaction_type,
            TypeFilter::Except(t) => *t != transaction_type,
        }
    }
}

/// A listing of transactions, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionQuery {
    pub account_id: Option<i64>,
    pub types: TypeFilter,
    /// Inclusive range on the UTC creation date.
    pub range: Option<DateRange>,
    pub limit: Option<i64>,
}

impl TransactionQuery {
    pub fn for_account(account_id: i64) -> Self {
        TransactionQuery {
            account_id: Some(account_id),
            ..Default::default()
        }
    }

    pub fn types(mut self, types: TypeFilter) -> Self {
        self.types = types;
        self
    }

    pub fn range(mut self, range: Option<DateRange>) -> Self {
        self.range = range;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, t: &Transaction) -> bool {
        self.account_id.map_or(true, |id| id == t.account_id)
            && self.types.matches(t.transaction_type())
            && self.range.map_or(true, |r| r.contains(t.timestamp.date_naive()))
    }
}

/// Persistence for accounts and their transaction log.
///
/// Plain reads go straight to the store; anything that writes goes through a
/// [`UnitOfWork`].
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;

    async fn account_for_owner(&self, owner_id: Uuid) -> StoreResult<Option<Account>>;

    async fn account_by_number(&self, account_no: i64) -> StoreResult<Option<Account>>;

    async fn transactions(&self, query: &TransactionQuery) -> StoreResult<Vec<Transaction>>;
}

/// One atomic scope of writes.
///
/// Accounts and transactions fetched with `lock_*` stay locked until the
/// unit ends. Nothing is persisted unless [`UnitOfWork::commit`] is called;
/// dropping the unit rolls it back.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn create_account(&mut self, new_account: NewAccount) -> StoreResult<Account>;

    async fn lock_account_for_owner(&mut self, owner_id: Uuid) -> StoreResult<Option<Account>>;

    async fn lock_account(&mut self, account_id: i64) -> StoreResult<Option<Account>>;

    async fn lock_account_by_number(&mut self, account_no: i64) -> StoreResult<Option<Account>>;

    async fn update_account(&mut self, account: &Account) -> StoreResult<()>;

    async fn insert_transaction(&mut self, new_transaction: NewTransaction) -> StoreResult<Transaction>;

    /// Reads a transaction without locking it.
    async fn transaction(&mut self, id: i64) -> StoreResult<Option<Transaction>>;

    async fn lock_transaction(&mut self, id: i64) -> StoreResult<Option<Transaction>>;

    async fn update_transaction(&mut self, transaction: &Transaction) -> StoreResult<()>;

    async fn transactions(&mut self, query: &TransactionQuery) -> StoreResult<Vec<Transaction>>;

    /// Latest `posted_at` among the account's records.
    async fn last_posted_at(&mut self, account_id: i64) -> StoreResult<Option<DateTime<Utc>>>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
