use crate::database::DbConn;
use crate::error::AppResult;
use crate::store::columns;

const SCHEMA: &str = include_str!("../../schema.sql");

/// Creates the `images` and `videos` tables. Only used for local and test
/// stores; production stores are owned by someone else.
pub fn init_media_store(conn: &DbConn) -> AppResult<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Columns the gateway relies on that `table` does not have.
pub fn missing_columns(conn: &DbConn, table: &str) -> AppResult<Vec<&'static str>> {
    let existing: std::collections::HashSet<String> = {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
        rows.filter_map(|r| r.ok()).collect()
    };

    Ok(columns::ALL
        .iter()
        .copied()
        .filter(|c| !existing.contains(*c))
        .collect())
}
