use rusqlite::ErrorCode;

use crate::database::queries::compile;
use crate::database::{fetch_rows, DbPool};
use crate::error::LoadError;
use crate::store::{MediaStore, RowCursor, StoreQuery};

/// [`MediaStore`] backed by a pooled SQLite database with one table per
/// collection.
#[derive(Clone)]
pub struct SqliteMediaStore {
    pool: DbPool,
}

impl SqliteMediaStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl std::fmt::Debug for SqliteMediaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteMediaStore")
            .field("connections", &self.pool.state().connections)
            .finish()
    }
}

impl MediaStore for SqliteMediaStore {
    fn query(&self, query: &StoreQuery) -> Result<Option<Box<dyn RowCursor>>, LoadError> {
        let compiled = compile(query)?;
        let conn = self.pool.get()?;

        let rows = fetch_rows(&conn, &compiled.sql, &compiled.params).map_err(classify)?;
        tracing::debug!(
            "Queried {} ({} args): {} rows",
            query.collection,
            compiled.params.len(),
            rows.count()
        );

        Ok(Some(Box::new(rows)))
    }
}

/// Maps a SQLite failure onto the load error taxonomy.
pub fn classify(error: rusqlite::Error) -> LoadError {
    match &error {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::PermissionDenied
            | ErrorCode::AuthorizationForStatementDenied
            | ErrorCode::ReadOnly
            | ErrorCode::CannotOpen => LoadError::permission_denied(error),
            ErrorCode::ConstraintViolation
            | ErrorCode::TypeMismatch
            | ErrorCode::ParameterOutOfRange
            | ErrorCode::ApiMisuse
            | ErrorCode::TooBig
            // SQLITE_ERROR: unknown table or column, syntax errors.
            | ErrorCode::Unknown => LoadError::invalid_arguments(error),
            _ => LoadError::transient(error),
        },
        rusqlite::Error::InvalidParameterCount(_, _)
        | rusqlite::Error::InvalidParameterName(_)
        | rusqlite::Error::InvalidColumnIndex(_)
        | rusqlite::Error::InvalidColumnName(_)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::ToSqlConversionFailure(_)
        | rusqlite::Error::MultipleStatement
        | rusqlite::Error::InvalidQuery => LoadError::invalid_arguments(error),
        _ => LoadError::transient(error),
    }
}
