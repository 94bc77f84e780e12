use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{Store, StoreError, StoreResult, TransactionQuery, TypeFilter, UnitOfWork};
use crate::ledger::{Account, Entry, NewAccount, NewTransaction, Transaction, TransactionType, ACCOUNT_NO_OFFSET};

const ACCOUNT_COLUMNS: &str =
    "id, owner_id, account_no, account_type, balance, loan_count, last_loan_date, created_at";

const TRANSACTION_COLUMNS: &str =
    "id, account_id, amount, balance_after_transaction, transaction_type, loan_approve, created_at, posted_at";

#[derive(Debug, FromRow)]
struct AccountRow {
    id: i64,
    owner_id: Uuid,
    account_no: i64,
    account_type: String,
    balance: Decimal,
    loan_count: i32,
    last_loan_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account {
            id: row.id,
            owner_id: row.owner_id,
            account_no: row.account_no,
            account_type: row.account_type.parse().map_err(StoreError::Corrupt)?,
            balance: row.balance,
            loan_count: u32::try_from(row.loan_count)
                .map_err(|_| StoreError::Corrupt(format!("account {} has loan_count {}", row.id, row.loan_count)))?,
            last_loan_date: row.last_loan_date,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: i64,
    account_id: i64,
    amount: Decimal,
    balance_after_transaction: Decimal,
    transaction_type: i16,
    loan_approve: Option<bool>,
    created_at: DateTime<Utc>,
    posted_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let transaction_type = TransactionType::from_code(row.transaction_type).ok_or_else(|| {
            StoreError::Corrupt(format!("transaction {} has type code {}", row.id, row.transaction_type))
        })?;
        Ok(Transaction {
            id: row.id,
            account_id: row.account_id,
            amount: row.amount,
            balance_after_transaction: row.balance_after_transaction,
            entry: Entry::from_parts(transaction_type, row.loan_approve),
            timestamp: row.created_at,
            posted_at: row.posted_at,
        })
    }
}

fn map_unique_violation(err: sqlx::Error) -> StoreError {
    match err.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => StoreError::Conflict(db_err.message().to_string()),
        _ => StoreError::Database(err),
    }
}

/// How an account row is looked up.
enum AccountFilter {
    Id(i64),
    Number(i64),
    Owner(Uuid),
}

async fn fetch_account<'e, E>(executor: E, filter: AccountFilter, lock: bool) -> StoreResult<Option<Account>>
where
    E: PgExecutor<'e>,
{
    let mut query_builder = QueryBuilder::<Postgres>::new(format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE "));
    match filter {
        AccountFilter::Id(id) => query_builder.push("id = ").push_bind(id),
        AccountFilter::Number(account_no) => query_builder.push("account_no = ").push_bind(account_no),
        AccountFilter::Owner(owner_id) => query_builder.push("owner_id = ").push_bind(owner_id),
    };
    if lock {
        query_builder.push(" FOR UPDATE");
    }

    let row = query_builder
        .build_query_as::<AccountRow>()
        .fetch_optional(executor)
        .await?;
    row.map(Account::try_from).transpose()
}

async fn fetch_transaction<'e, E>(executor: E, id: i64, lock: bool) -> StoreResult<Option<Transaction>>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1{}",
        if lock { " FOR UPDATE" } else { "" }
    );
    let row = sqlx::query_as::<_, TransactionRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    row.map(Transaction::try_from).transpose()
}

async fn fetch_transactions<'e, E>(executor: E, query: &TransactionQuery) -> StoreResult<Vec<Transaction>>
where
    E: PgExecutor<'e>,
{
    let mut query_builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE TRUE"));

    if let Some(account_id) = query.account_id {
        query_builder.push(" AND account_id = ").push_bind(account_id);
    }
    match query.types {
        TypeFilter::Any => {}
        TypeFilter::Only(t) => {
            query_builder.push(" AND transaction_type = ").push_bind(t.code());
        }
        TypeFilter::Except(t) => {
            query_builder.push(" AND transaction_type <> ").push_bind(t.code());
        }
    }
    if let Some(range) = query.range {
        query_builder
            .push(" AND (created_at AT TIME ZONE 'UTC')::date BETWEEN ")
            .push_bind(range.start)
            .push(" AND ")
            .push_bind(range.end);
    }
    query_builder.push(" ORDER BY created_at DESC, id DESC");
    if let Some(limit) = query.limit {
        query_builder.push(" LIMIT ").push_bind(limit);
    }

    query_builder
        .build_query_as::<TransactionRow>()
        .fetch_all(executor)
        .await?
        .into_iter()
        .map(Transaction::try_from)
        .collect()
}

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn account_for_owner(&self, owner_id: Uuid) -> StoreResult<Option<Account>> {
        fetch_account(&self.pool, AccountFilter::Owner(owner_id), false).await
    }

    async fn account_by_number(&self, account_no: i64) -> StoreResult<Option<Account>> {
        fetch_account(&self.pool, AccountFilter::Number(account_no), false).await
    }

    async fn transactions(&self, query: &TransactionQuery) -> StoreResult<Vec<Transaction>> {
        fetch_transactions(&self.pool, query).await
    }
}

/// A database transaction; rolled back by sqlx when dropped uncommitted.
struct PgUnitOfWork {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn create_account(&mut self, new_account: NewAccount) -> StoreResult<Account> {
        let sql = format!(
            r#"
            WITH next AS (SELECT nextval(pg_get_serial_sequence('accounts', 'id')) AS id)
            INSERT INTO accounts (id, owner_id, account_no, account_type, balance, loan_count, created_at)
            SELECT next.id, $1, next.id + $2, $3, 0, 0, $4 FROM next
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(new_account.owner_id)
            .bind(ACCOUNT_NO_OFFSET)
            .bind(new_account.account_type.as_str())
            .bind(new_account.opened_at)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_unique_violation)?;
        Account::try_from(row)
    }

    async fn lock_account_for_owner(&mut self, owner_id: Uuid) -> StoreResult<Option<Account>> {
        fetch_account(&mut *self.tx, AccountFilter::Owner(owner_id), true).await
    }

    async fn lock_account(&mut self, account_id: i64) -> StoreResult<Option<Account>> {
        fetch_account(&mut *self.tx, AccountFilter::Id(account_id), true).await
    }

    async fn lock_account_by_number(&mut self, account_no: i64) -> StoreResult<Option<Account>> {
        fetch_account(&mut *self.tx, AccountFilter::Number(account_no), true).await
    }

    async fn update_account(&mut self, account: &Account) -> StoreResult<()> {
        let loan_count = i32::try_from(account.loan_count)
            .map_err(|_| StoreError::Corrupt(format!("loan_count {} out of range", account.loan_count)))?;
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = $1, loan_count = $2, last_loan_date = $3
            WHERE id = $4
            "#,
        )
        .bind(account.balance)
        .bind(loan_count)
        .bind(account.last_loan_date)
        .bind(account.id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Database(sqlx::Error::RowNotFound));
        }
        Ok(())
    }

    async fn insert_transaction(&mut self, new_transaction: NewTransaction) -> StoreResult<Transaction> {
        let sql = format!(
            r#"
            INSERT INTO transactions
                (account_id, amount, balance_after_transaction, transaction_type, loan_approve, created_at, posted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {TRANSACTION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(new_transaction.account_id)
            .bind(new_transaction.amount)
            .bind(new_transaction.balance_after_transaction)
            .bind(new_transaction.entry.transaction_type().code())
            .bind(new_transaction.entry.loan_approve())
            .bind(new_transaction.timestamp)
            .fetch_one(&mut *self.tx)
            .await?;
        Transaction::try_from(row)
    }

    async fn transaction(&mut self, id: i64) -> StoreResult<Option<Transaction>> {
        fetch_transaction(&mut *self.tx, id, false).await
    }

    async fn lock_transaction(&mut self, id: i64) -> StoreResult<Option<Transaction>> {
        fetch_transaction(&mut *self.tx, id, true).await
    }

    async fn update_transaction(&mut self, transaction: &Transaction) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET transaction_type = $1, loan_approve = $2, balance_after_transaction = $3, posted_at = $4
            WHERE id = $5
            "#,
        )
        .bind(transaction.transaction_type().code())
        .bind(transaction.loan_approve())
        .bind(transaction.balance_after_transaction)
        .bind(transaction.posted_at)
        .bind(transaction.id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Database(sqlx::Error::RowNotFound));
        }
        Ok(())
    }

    async fn transactions(&mut self, query: &TransactionQuery) -> StoreResult<Vec<Transaction>> {
        fetch_transactions(&mut *self.tx, query).await
    }

    async fn last_posted_at(&mut self, account_id: i64) -> StoreResult<Option<DateTime<Utc>>> {
        let posted_at = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT MAX(posted_at) FROM transactions WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(posted_at)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let PgUnitOfWork { tx } = *self;
        tx.commit().await.map_err(Into::into)
    }
}
