use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::models::AggregatedRow;
use sqlx::sqlite::{Sqlite, SqlitePool, SqlitePoolOptions};
use sqlx::{Column, Executor, QueryBuilder, Statement};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub mod chunked;
pub mod table;

pub use chunked::{read_chunked, ChunkedReader};
pub use table::{Cell, Table};

/// Rows per multi-row INSERT; 4 binds each keeps us well under SQLite's parameter limit.
const INSERT_BATCH_ROWS: usize = 500;

/// Client for the single-file trade store.
///
/// The connection is opened on first use and cached. Call [`TradeStore::close`]
/// when done; it releases the connection once, and dropping an unclosed store
/// releases it as well. The store is meant for one sequential user, so every
/// operation takes `&mut self`.
pub struct TradeStore {
    db_path: PathBuf,
    table_name: String,
    pool: Option<SqlitePool>,
}

impl TradeStore {
    /// Prepare a store for `config`. Does not touch the database yet.
    pub fn open(config: &StoreConfig) -> Self {
        Self {
            db_path: config.db_path.clone(),
            table_name: config.table_name.clone(),
            pool: None,
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Configured trade table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn is_open(&self) -> bool {
        self.pool.is_some()
    }

    async fn pool(&mut self) -> Result<&SqlitePool> {
        let pool = match self.pool.take() {
            Some(pool) => pool,
            None => {
                let database_url = format!("sqlite://{}?mode=rwc", self.db_path.to_string_lossy());
                debug!(url = %database_url, "Connecting to SQLite database");
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .connect(&database_url)
                    .await?
            }
        };
        Ok(self.pool.insert(pool))
    }

    /// Release the connection. Returns `true` if one was open.
    pub async fn close(&mut self) -> bool {
        match self.pool.take() {
            Some(pool) => {
                pool.close().await;
                debug!(path = %self.db_path.display(), "Closed SQLite database");
                true
            }
            None => false,
        }
    }

    /// Append rows to `table`, creating it first if it does not exist.
    /// Returns the number of inserted rows.
    pub async fn load(&mut self, table: &str, rows: &[AggregatedRow]) -> Result<u64> {
        let table = quote_identifier(table)?;
        let pool = self.pool().await?;

        let mut tx = pool.begin().await?;
        let create = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                PERIOD TEXT NOT NULL,
                DECLARANT_ISO TEXT NOT NULL,
                TRADE_TYPE TEXT NOT NULL,
                VALUE_IN_EUROS REAL NOT NULL
            )",
            table
        );
        sqlx::query(&create).execute(&mut *tx).await?;

        let mut inserted = 0;
        for batch in rows.chunks(INSERT_BATCH_ROWS) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
                "INSERT INTO {} (PERIOD, DECLARANT_ISO, TRADE_TYPE, VALUE_IN_EUROS) ",
                table
            ));
            builder.push_values(batch, |mut b, row| {
                b.push_bind(row.period_label())
                    .push_bind(row.declarant.clone())
                    .push_bind(row.trade_type.code())
                    .push_bind(row.value);
            });
            inserted += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Run a read query.
    pub async fn query(&mut self, sql: &str) -> Result<Table> {
        self.query_with(sql, &[]).await
    }

    /// Run a read query with positional text parameters (`$1`, `$2`, ...).
    /// Column names come from the prepared statement, so an empty result still has them.
    pub async fn query_with(&mut self, sql: &str, params: &[&str]) -> Result<Table> {
        let pool = self.pool().await?;
        let statement = pool.prepare(sql).await?;
        let columns = statement
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();

        let mut query = statement.query();
        for param in params {
            query = query.bind(*param);
        }
        let rows = query.fetch_all(pool).await?;
        Table::from_rows(columns, &rows)
    }

    /// Build a multi-column index, columns in the given order.
    /// Re-running with the same name is a no-op.
    pub async fn create_index(&mut self, table: &str, index_name: &str, columns: &[&str]) -> Result<()> {
        if columns.is_empty() {
            return Err(Error::invalid_argument("Need at least one column to create index"));
        }
        let quoted = columns
            .iter()
            .map(|column| quote_identifier(column))
            .collect::<Result<Vec<_>>>()?;

        let sql = format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            quote_identifier(index_name)?,
            quote_identifier(table)?,
            quoted.join(", ")
        );
        let pool = self.pool().await?;
        sqlx::query(&sql).execute(pool).await?;
        info!(index = index_name, table, columns = ?columns, "Index ready");
        Ok(())
    }

    pub async fn table_exists(&mut self, table: &str) -> Result<bool> {
        let pool = self.pool().await?;
        let found: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = $1")
                .bind(table)
                .fetch_optional(pool)
                .await?;
        Ok(found.is_some())
    }

    pub async fn index_exists(&mut self, index_name: &str) -> Result<bool> {
        let pool = self.pool().await?;
        let found: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'index' AND name = $1")
                .bind(index_name)
                .fetch_optional(pool)
                .await?;
        Ok(found.is_some())
    }
}

/// Accept only plain SQL identifiers (`[A-Za-z_][A-Za-z0-9_]*`).
/// Table, index and column names are spliced into SQL text, values never are.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::invalid_argument(format!("'{}' is not a valid SQL identifier", name)))
    }
}

/// Validate `name` and wrap it in double quotes, so keywords like `order` work as names.
pub fn quote_identifier(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name))
}
