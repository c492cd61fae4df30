use crate::error::LoadError;
use crate::store::{columns, StoreQuery, StoreValue};

/// SQL text plus the parameters to bind, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<StoreValue>,
}

/// Turns a [`StoreQuery`] into a `SELECT` against the collection's table.
///
/// Only known columns may be projected or ordered on, and the selection must
/// carry exactly one argument per placeholder.
pub fn compile(query: &StoreQuery) -> Result<CompiledQuery, LoadError> {
    if query.projection.is_empty() {
        return Err(LoadError::invalid_arguments("projection is empty"));
    }
    if let Some(unknown) = query.projection.iter().find(|c| !columns::is_known(c)) {
        return Err(LoadError::invalid_arguments(format!(
            "cannot project unknown column '{}'",
            unknown
        )));
    }

    let placeholders = query.placeholder_count();
    if placeholders != query.args.len() {
        return Err(LoadError::invalid_arguments(format!(
            "selection has {} placeholders but {} arguments",
            placeholders,
            query.args.len()
        )));
    }

    if query.offset < 0 {
        return Err(LoadError::invalid_arguments(format!(
            "offset must not be negative, got {}",
            query.offset
        )));
    }

    let mut sql = format!(
        "SELECT {}\n  FROM {}",
        query.projection.join("\n     , "),
        query.collection.table()
    );
    let mut params = query.args.clone();

    if !query.selection.trim().is_empty() {
        sql.push_str("\n WHERE ");
        sql.push_str(&query.selection);
    }

    if let Some(order_by) = &query.order_by {
        validate_order_by(order_by)?;
        sql.push_str("\n ORDER BY ");
        sql.push_str(order_by);
    }

    match query.limit {
        Some(limit) if limit < 0 => {
            return Err(LoadError::invalid_arguments(format!(
                "limit must not be negative, got {}",
                limit
            )));
        }
        Some(limit) => {
            sql.push_str("\n LIMIT ? OFFSET ?");
            params.push(StoreValue::Integer(limit));
            params.push(StoreValue::Integer(query.offset));
        }
        None if query.offset > 0 => {
            sql.push_str("\n LIMIT -1 OFFSET ?");
            params.push(StoreValue::Integer(query.offset));
        }
        None => {}
    }

    Ok(CompiledQuery { sql, params })
}

fn validate_order_by(order_by: &str) -> Result<(), LoadError> {
    for term in order_by.split(',') {
        let mut parts = term.split_whitespace();
        let column = parts.next().unwrap_or_default();
        let direction = parts.next();

        let valid = columns::is_known(column)
            && parts.next().is_none()
            && direction.map_or(true, |d| {
                d.eq_ignore_ascii_case("ASC") || d.eq_ignore_ascii_case("DESC")
            });

        if !valid {
            return Err(LoadError::invalid_arguments(format!(
                "invalid sort term '{}'",
                term.trim()
            )));
        }
    }
    Ok(())
}
