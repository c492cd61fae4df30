//! Abstraction over the externally-owned media store.
//!
//! The store holds two flat collections of records, one for images and one
//! for videos. Callers describe what they want with a [`StoreQuery`] and read
//! the answer through a [`RowCursor`] that lives only as long as the call that
//! consumes it.

mod cursor;

pub use cursor::*;

use std::fmt;

use crate::constants::{IMAGES_CONTENT_URI, VIDEOS_CONTENT_URI};
use crate::error::LoadError;

/// Column names understood by every store implementation.
pub mod columns {
    pub const ID: &str = "_id";
    pub const DISPLAY_NAME: &str = "_display_name";
    pub const DATE_TAKEN: &str = "datetaken";
    pub const MIME_TYPE: &str = "mime_type";
    pub const SIZE: &str = "_size";
    pub const BUCKET_ID: &str = "bucket_id";
    pub const BUCKET_DISPLAY_NAME: &str = "bucket_display_name";

    pub const ALL: [&str; 7] = [
        ID,
        DISPLAY_NAME,
        DATE_TAKEN,
        MIME_TYPE,
        SIZE,
        BUCKET_ID,
        BUCKET_DISPLAY_NAME,
    ];

    pub fn is_known(name: &str) -> bool {
        ALL.contains(&name)
    }
}

/// Newest capture first; ties broken by descending id so repeated loads see
/// the same order.
pub const NEWEST_FIRST: &str = "datetaken DESC, _id DESC";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Images,
    Videos,
}

impl Collection {
    pub const BOTH: [Collection; 2] = [Collection::Images, Collection::Videos];

    pub fn table(self) -> &'static str {
        match self {
            Collection::Images => "images",
            Collection::Videos => "videos",
        }
    }

    pub fn content_uri(self) -> &'static str {
        match self {
            Collection::Images => IMAGES_CONTENT_URI,
            Collection::Videos => VIDEOS_CONTENT_URI,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// A single query against one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
    pub collection: Collection,
    pub projection: Vec<&'static str>,
    /// Clause string with `?` placeholders; empty matches every row.
    pub selection: String,
    pub args: Vec<StoreValue>,
    pub order_by: Option<String>,
    pub limit: Option<i64>,
    pub offset: i64,
}

impl StoreQuery {
    pub fn new(collection: Collection, projection: &[&'static str]) -> Self {
        Self {
            collection,
            projection: projection.to_vec(),
            selection: String::new(),
            args: Vec::new(),
            order_by: None,
            limit: None,
            offset: 0,
        }
    }

    pub fn selection(mut self, selection: impl Into<String>, args: Vec<StoreValue>) -> Self {
        self.selection = selection.into();
        self.args = args;
        self
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn window(mut self, offset: i64, limit: i64) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    pub fn placeholder_count(&self) -> usize {
        self.selection.matches('?').count()
    }
}

/// Gateway to the external store.
///
/// Calls block; async callers dispatch them with `spawn_blocking`. `Ok(None)`
/// means the store produced no cursor at all, which callers treat like an
/// empty result.
pub trait MediaStore: Send + Sync {
    fn query(&self, query: &StoreQuery) -> Result<Option<Box<dyn RowCursor>>, LoadError>;
}

impl<S: MediaStore + ?Sized> MediaStore for std::sync::Arc<S> {
    fn query(&self, query: &StoreQuery) -> Result<Option<Box<dyn RowCursor>>, LoadError> {
        (**self).query(query)
    }
}
