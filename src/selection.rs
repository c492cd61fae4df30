//! Compiles a [`MediaFilter`] and an optional album scope into a store
//! predicate.

use crate::constants::{CAMERA_ALBUM_ID, CAMERA_BUCKET_NAME, UNSCOPED_ALBUM_PREFIX};
use crate::models::{MediaFilter, UNBOUNDED};
use crate::store::{columns, StoreValue};

/// Clauses joined by `AND` plus their positional arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub clauses: Vec<String>,
    pub args: Vec<StoreValue>,
}

impl Selection {
    pub fn clause_string(&self) -> String {
        self.clauses.join(" AND ")
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    fn push(&mut self, clause: String, arg: impl Into<StoreValue>) {
        self.clauses.push(clause);
        self.args.push(arg.into());
    }
}

pub fn build_selection(filter: &MediaFilter, album_id: Option<&str>) -> Selection {
    let mut selection = Selection::default();

    match album_id {
        Some(CAMERA_ALBUM_ID) => {
            selection.push(
                format!("{} = ?", columns::BUCKET_DISPLAY_NAME),
                CAMERA_BUCKET_NAME,
            );
        }
        Some(id) if !id.starts_with(UNSCOPED_ALBUM_PREFIX) => {
            selection.push(format!("{} = ?", columns::BUCKET_ID), id);
        }
        _ => {}
    }

    if filter.min_size_bytes > 0 {
        selection.push(format!("{} >= ?", columns::SIZE), filter.min_size_bytes);
    }
    if filter.max_size_bytes < UNBOUNDED {
        selection.push(format!("{} <= ?", columns::SIZE), filter.max_size_bytes);
    }

    if filter.after_date > 0 {
        selection.push(format!("{} >= ?", columns::DATE_TAKEN), filter.after_date);
    }
    if filter.before_date < UNBOUNDED {
        selection.push(format!("{} <= ?", columns::DATE_TAKEN), filter.before_date);
    }

    if !filter.mime_types.is_empty() {
        let mut conditions = Vec::with_capacity(filter.mime_types.len());
        for mime in &filter.mime_types {
            match mime.as_str() {
                "image/*" => conditions.push(format!("{} LIKE 'image/%'", columns::MIME_TYPE)),
                "video/*" => conditions.push(format!("{} LIKE 'video/%'", columns::MIME_TYPE)),
                literal => {
                    conditions.push(format!("{} = ?", columns::MIME_TYPE));
                    selection.args.push(StoreValue::from(literal));
                }
            }
        }
        selection.clauses.push(format!("({})", conditions.join(" OR ")));
    }

    tracing::trace!(
        "Built selection with {} clauses for album {:?}",
        selection.clauses.len(),
        album_id
    );
    selection
}
