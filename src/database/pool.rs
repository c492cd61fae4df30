use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OpenFlags, Row};
use std::time::Duration;

use crate::config::StoreConfig;
use crate::error::{AppError, AppResult};
use crate::store::{RowSet, StoreValue};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

pub fn create_pool(config: &StoreConfig) -> AppResult<DbPool> {
    let flags = if config.read_only {
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI
    } else {
        OpenFlags::default()
    };
    let busy_timeout = Duration::from_millis(config.busy_timeout_ms);

    let manager = SqliteConnectionManager::file(&config.database_path)
        .with_flags(flags)
        .with_init(move |conn| conn.busy_timeout(busy_timeout));

    Pool::builder()
        .max_size(config.max_connections)
        .build(manager)
        .map_err(|e| AppError::Internal(format!("Failed to open media store: {}", e)))
}

pub fn get_connection(pool: &DbPool) -> AppResult<DbConn> {
    pool.get().map_err(AppError::Pool)
}

/// Runs `sql` and reads every row into a [`RowSet`] before the statement and
/// connection are handed back.
pub fn fetch_rows(conn: &DbConn, sql: &str, params: &[StoreValue]) -> rusqlite::Result<RowSet> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
    let mut values = Vec::new();
    while let Some(row) = rows.next()? {
        values.push(read_row(row, width)?);
    }

    Ok(RowSet::new(columns, values))
}

fn read_row(row: &Row<'_>, width: usize) -> rusqlite::Result<Vec<StoreValue>> {
    (0..width)
        .map(|i| row.get_ref(i).map(StoreValue::from))
        .collect()
}
