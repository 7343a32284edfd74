//! Local store repository backed by `SQLite`.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::warn;

use super::model::{IntegrityReport, StorageStats, SyncMetadata};
use crate::{Account, Error, Result, Transaction, TransactionKind};

/// Durable local store for accounts, transactions, and sync metadata.
///
/// Also owns the schema for the action queue table so that [`reset`] can
/// wipe everything in one transaction and [`storage_stats`] can count
/// queued actions.
///
/// [`reset`]: LocalStore::reset
/// [`storage_stats`]: LocalStore::storage_stats
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    /// Opens (or creates) the store at the given database path.
    ///
    /// Schema creation is idempotent; opening an existing store is safe.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageInit`] if the database cannot be opened or
    /// the schema cannot be created.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(|e| Error::StorageInit(e.to_string()))?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Creates an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageInit`] if the database connection fails or
    /// schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| Error::StorageInit(e.to_string()))?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// The underlying connection pool, shared with the action queue.
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        let statements = [
            r"
            CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL DEFAULT '',
                account_number TEXT NOT NULL DEFAULT '',
                balance_minor INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS transactions (
                account_id TEXT NOT NULL,
                id TEXT NOT NULL,
                amount_minor INTEGER NOT NULL,
                balance_after_minor INTEGER NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                kind TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                UNIQUE(account_id, id)
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS queued_actions (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                payload TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                retry_count INTEGER NOT NULL DEFAULT 0,
                last_error TEXT,
                queued_at TEXT NOT NULL,
                next_attempt_at TEXT
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS sync_metadata (
                scope TEXT PRIMARY KEY,
                last_sync TEXT
            )
            ",
            r"
            CREATE INDEX IF NOT EXISTS idx_transactions_account
            ON transactions(account_id, timestamp DESC)
            ",
            r"
            CREATE INDEX IF NOT EXISTS idx_queued_actions_status
            ON queued_actions(status, queued_at)
            ",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| Error::StorageInit(e.to_string()))?;
        }

        Ok(())
    }

    /// Returns all cached accounts, ordered by identifier.
    ///
    /// An empty store yields an empty list, never an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn all_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r"
            SELECT id, name, account_number, balance_minor, updated_at
            FROM accounts
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(account_from_row).collect())
    }

    /// Returns one cached account, or `None` when not cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn account(&self, account_id: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            r"
            SELECT id, name, account_number, balance_minor, updated_at
            FROM accounts
            WHERE id = ?
            ",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().and_then(account_from_row))
    }

    /// Upserts one account snapshot by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn store_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO accounts (id, name, account_number, balance_minor, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                account_number = excluded.account_number,
                balance_minor = excluded.balance_minor,
                updated_at = excluded.updated_at
            ",
        )
        .bind(&account.id)
        .bind(&account.name)
        .bind(&account.account_number)
        .bind(account.balance_minor)
        .bind(account.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Upserts a batch of account snapshots.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn store_accounts(&self, accounts: &[Account]) -> Result<()> {
        for account in accounts {
            self.store_account(account).await?;
        }
        Ok(())
    }

    /// Returns the most recent transactions for an account.
    ///
    /// Ordered newest first; ties on timestamp break by identifier so the
    /// order is deterministic.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn transactions_for_account(
        &self,
        account_id: &str,
        limit: u32,
    ) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r"
            SELECT account_id, id, amount_minor, balance_after_minor, description, kind, timestamp
            FROM transactions
            WHERE account_id = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            ",
        )
        .bind(account_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(transaction_from_row).collect())
    }

    /// Upserts one transaction by (account, identifier).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn store_transaction(&self, transaction: &Transaction) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO transactions
                (account_id, id, amount_minor, balance_after_minor, description, kind, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(account_id, id) DO UPDATE SET
                amount_minor = excluded.amount_minor,
                balance_after_minor = excluded.balance_after_minor,
                description = excluded.description,
                kind = excluded.kind,
                timestamp = excluded.timestamp
            ",
        )
        .bind(&transaction.account_id)
        .bind(&transaction.id)
        .bind(transaction.amount_minor)
        .bind(transaction.balance_after_minor)
        .bind(&transaction.description)
        .bind(transaction.kind.as_str())
        .bind(transaction.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Upserts a batch of transactions.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn store_transactions(&self, transactions: &[Transaction]) -> Result<()> {
        for transaction in transactions {
            self.store_transaction(transaction).await?;
        }
        Ok(())
    }

    /// Returns record counts and the estimated database size.
    ///
    /// The size is best effort and reported as zero when it cannot be
    /// determined; counts are authoritative.
    ///
    /// # Errors
    ///
    /// Returns an error if a count query fails.
    pub async fn storage_stats(&self) -> Result<StorageStats> {
        let accounts = self.count("accounts").await?;
        let transactions = self.count("transactions").await?;
        let queued_actions = self.count("queued_actions").await?;

        let page_count: i64 = sqlx::query_scalar(r"PRAGMA page_count")
            .fetch_one(&self.pool)
            .await
            .unwrap_or(0);
        let page_size: i64 = sqlx::query_scalar(r"PRAGMA page_size")
            .fetch_one(&self.pool)
            .await
            .unwrap_or(0);

        Ok(StorageStats {
            accounts,
            transactions,
            queued_actions,
            total_size_bytes: u64::try_from(page_count.saturating_mul(page_size)).unwrap_or(0),
        })
    }

    /// Reads sync metadata for a scope, or `None` when never synced.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn sync_metadata(&self, scope: &str) -> Result<Option<SyncMetadata>> {
        let row = sqlx::query(r"SELECT scope, last_sync FROM sync_metadata WHERE scope = ?")
            .bind(scope)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| {
            let last_sync: Option<String> = row.get("last_sync");
            SyncMetadata {
                scope: row.get("scope"),
                last_sync: last_sync
                    .as_deref()
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    .map(|dt| dt.with_timezone(&Utc)),
            }
        }))
    }

    /// Records a successful sync timestamp for a scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn set_sync_metadata(&self, scope: &str, last_sync: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO sync_metadata (scope, last_sync)
            VALUES (?, ?)
            ON CONFLICT(scope) DO UPDATE SET last_sync = excluded.last_sync
            ",
        )
        .bind(scope)
        .bind(last_sync.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Checks the stored data for structural problems without mutating it.
    ///
    /// Looks for orphaned transactions, duplicate identifiers, malformed
    /// monetary columns, and unknown transaction kinds. Repair is an
    /// explicit operator action ([`reset`](LocalStore::reset)), never
    /// automatic.
    ///
    /// # Errors
    ///
    /// Returns an error if a check query fails.
    pub async fn validate_integrity(&self) -> Result<IntegrityReport> {
        let mut errors = Vec::new();

        let orphaned: Vec<SqliteRow> = sqlx::query(
            r"
            SELECT t.account_id, t.id
            FROM transactions t
            LEFT JOIN accounts a ON a.id = t.account_id
            WHERE a.id IS NULL
            ",
        )
        .fetch_all(&self.pool)
        .await?;
        for row in &orphaned {
            let account_id: String = row.get("account_id");
            let id: String = row.get("id");
            errors.push(format!(
                "orphaned transaction {id} references missing account {account_id}"
            ));
        }

        let duplicates: Vec<SqliteRow> = sqlx::query(
            r"
            SELECT account_id, id, COUNT(*) AS copies
            FROM transactions
            GROUP BY account_id, id
            HAVING COUNT(*) > 1
            ",
        )
        .fetch_all(&self.pool)
        .await?;
        for row in &duplicates {
            let id: String = row.get("id");
            let copies: i64 = row.get("copies");
            errors.push(format!("duplicate transaction id {id} ({copies} copies)"));
        }

        let bad_balances: Vec<SqliteRow> =
            sqlx::query(r"SELECT id FROM accounts WHERE typeof(balance_minor) != 'integer'")
                .fetch_all(&self.pool)
                .await?;
        for row in &bad_balances {
            let id: String = row.get("id");
            errors.push(format!("account {id} has a non-integer balance"));
        }

        let bad_amounts: Vec<SqliteRow> = sqlx::query(
            r"
            SELECT id FROM transactions
            WHERE typeof(amount_minor) != 'integer'
               OR typeof(balance_after_minor) != 'integer'
            ",
        )
        .fetch_all(&self.pool)
        .await?;
        for row in &bad_amounts {
            let id: String = row.get("id");
            errors.push(format!("transaction {id} has a non-integer amount"));
        }

        let bad_kinds: Vec<SqliteRow> =
            sqlx::query(r"SELECT id, kind FROM transactions WHERE kind NOT IN ('credit', 'debit')")
                .fetch_all(&self.pool)
                .await?;
        for row in &bad_kinds {
            let id: String = row.get("id");
            let kind: String = row.get("kind");
            errors.push(format!("transaction {id} has unknown kind '{kind}'"));
        }

        Ok(IntegrityReport {
            valid: errors.is_empty(),
            errors,
        })
    }

    /// Irreversibly wipes all stored data in a single transaction.
    ///
    /// Clears accounts, transactions, queued actions, and sync metadata.
    /// Either everything is wiped or nothing is.
    ///
    /// # Errors
    ///
    /// Returns an error if the wipe cannot be committed; no partial wipe
    /// is observable in that case.
    pub async fn reset(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for table in ["accounts", "transactions", "queued_actions", "sync_metadata"] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn count(&self, table: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

fn account_from_row(row: &SqliteRow) -> Option<Account> {
    let updated_at_str: String = row.get("updated_at");
    let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
        .ok()?
        .with_timezone(&Utc);

    Some(Account {
        id: row.get("id"),
        name: row.get("name"),
        account_number: row.get("account_number"),
        balance_minor: row.get("balance_minor"),
        updated_at,
    })
}

fn transaction_from_row(row: &SqliteRow) -> Option<Transaction> {
    let timestamp_str: String = row.get("timestamp");
    let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
        .ok()?
        .with_timezone(&Utc);

    let kind = match row.get::<String, _>("kind").as_str() {
        "credit" => TransactionKind::Credit,
        "debit" => TransactionKind::Debit,
        other => {
            warn!(kind = other, "skipping transaction with unknown kind");
            return None;
        }
    };

    Some(Transaction {
        account_id: row.get("account_id"),
        id: row.get("id"),
        amount_minor: row.get("amount_minor"),
        balance_after_minor: row.get("balance_after_minor"),
        description: row.get("description"),
        kind,
        timestamp,
    })
}
