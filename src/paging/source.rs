use std::sync::Arc;
use tracing::{debug, error};

use crate::error::{LoadError, LoadErrorKind};
use crate::models::{MediaFilter, MediaItem, MediaPage, MediaType, MediaUri};
use crate::selection::{build_selection, Selection};
use crate::store::{columns, MediaStore, RowCursor, StoreQuery, NEWEST_FIRST};

const PAGE_PROJECTION: [&str; 5] = [
    columns::ID,
    columns::DISPLAY_NAME,
    columns::DATE_TAKEN,
    columns::MIME_TYPE,
    columns::SIZE,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadParams {
    pub key: Option<i64>,
    pub load_size: i64,
}

impl LoadParams {
    pub fn first(load_size: i64) -> Self {
        Self {
            key: None,
            load_size,
        }
    }

    pub fn at(key: i64, load_size: i64) -> Self {
        Self {
            key: Some(key),
            load_size,
        }
    }
}

/// Pages loaded so far in one stream plus the position the consumer last
/// looked at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagingState {
    pub pages: Vec<MediaPage>,
    pub anchor_position: Option<usize>,
}

impl PagingState {
    pub fn item_count(&self) -> usize {
        self.pages.iter().map(|p| p.items.len()).sum()
    }

    /// Page holding `position`, clamped to the first or last loaded page.
    pub fn closest_page_to_position(&self, position: usize) -> Option<&MediaPage> {
        let mut start = 0;
        for page in &self.pages {
            let end = start + page.items.len();
            if position < end {
                return Some(page);
            }
            start = end;
        }
        self.pages.last()
    }
}

/// Offset-keyed page loader over one collection, bound to one filter and
/// album scope.
pub struct PagingSource {
    store: Arc<dyn MediaStore>,
    media_type: MediaType,
    filter: MediaFilter,
    album_id: Option<String>,
    selection: Selection,
}

impl PagingSource {
    pub fn new(
        store: Arc<dyn MediaStore>,
        media_type: MediaType,
        filter: MediaFilter,
        album_id: Option<String>,
    ) -> Self {
        let selection = build_selection(&filter, album_id.as_deref());
        Self {
            store,
            media_type,
            filter,
            album_id,
            selection,
        }
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn album_id(&self) -> Option<&str> {
        self.album_id.as_deref()
    }

    /// Key to restart from so the anchor stays in view, if anything was
    /// loaded.
    pub fn refresh_key(&self, state: &PagingState) -> Option<i64> {
        let anchor = state.anchor_position?;
        let page = state.closest_page_to_position(anchor)?;
        page.prev_key
            .map(|k| k + 1)
            .or_else(|| page.next_key.map(|k| k - 1))
    }

    /// Loads one page. Blocks on the store.
    pub fn load(&self, params: LoadParams) -> Result<MediaPage, LoadError> {
        match self.try_load(params) {
            Ok(page) => Ok(page),
            Err(e) => {
                match e.kind() {
                    LoadErrorKind::PermissionDenied => error!("Media load refused: {}", e),
                    LoadErrorKind::InvalidArguments => error!("Media load rejected: {}", e),
                    LoadErrorKind::Transient => error!("Media load failed: {}", e),
                }
                Err(e)
            }
        }
    }

    fn try_load(&self, params: LoadParams) -> Result<MediaPage, LoadError> {
        if params.load_size <= 0 {
            return Err(LoadError::invalid_arguments(format!(
                "page size must be positive, got {}",
                params.load_size
            )));
        }
        let offset = params.key.unwrap_or(0);
        if offset < 0 {
            return Err(LoadError::invalid_arguments(format!(
                "offset must not be negative, got {}",
                offset
            )));
        }
        self.filter.validate()?;

        let items = self.load_chunk(offset, params.load_size)?;
        debug!(
            "Loaded {} {} items at offset {} (album {:?})",
            items.len(),
            self.media_type,
            offset,
            self.album_id
        );

        let next_key = if (items.len() as i64) < params.load_size {
            None
        } else {
            Some(offset + params.load_size)
        };
        let prev_key = if offset == 0 { None } else { Some(offset - 1) };

        Ok(MediaPage {
            items,
            prev_key,
            next_key,
        })
    }

    fn load_chunk(&self, offset: i64, limit: i64) -> Result<Vec<MediaItem>, LoadError> {
        let query = StoreQuery::new(self.media_type.collection(), &PAGE_PROJECTION)
            .selection(self.selection.clause_string(), self.selection.args.clone())
            .order_by(NEWEST_FIRST)
            .window(offset, limit);

        match self.store.query(&query)? {
            Some(mut cursor) => parse_cursor(cursor.as_mut(), self.media_type),
            None => Ok(Vec::new()),
        }
    }
}

/// Rows take their URI from the collection that was queried. A row without a
/// mime type also takes that collection's media type.
fn parse_cursor(cursor: &mut dyn RowCursor, queried: MediaType) -> Result<Vec<MediaItem>, LoadError> {
    let id_col = cursor.column_index(columns::ID)?;
    let name_col = cursor.column_index(columns::DISPLAY_NAME)?;
    let mime_col = cursor.column_index(columns::MIME_TYPE)?;

    let mut items = Vec::with_capacity(cursor.count());
    while cursor.move_to_next() {
        let id = cursor
            .get_i64(id_col)?
            .ok_or_else(|| LoadError::invalid_arguments("row without an id"))?;
        let mime = cursor.get_string(mime_col)?;

        items.push(MediaItem {
            id,
            uri: MediaUri::new(queried.collection(), id),
            name: cursor.get_string(name_col)?.unwrap_or_default(),
            media_type: mime
                .as_deref()
                .map_or(queried, |mime| MediaType::from_mime(Some(mime))),
        });
    }
    Ok(items)
}
