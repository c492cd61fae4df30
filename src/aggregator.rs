use indexmap::IndexMap;
use std::sync::Arc;
use tracing::debug;

use crate::constants::{
    ALL_IMAGES_ALBUM_ID, ALL_VIDEOS_ALBUM_ID, CAMERA_ALBUM_ID, CAMERA_BUCKET_NAME,
};
use crate::error::LoadError;
use crate::models::{Album, MediaUri};
use crate::store::{columns, Collection, MediaStore, StoreQuery, StoreValue, NEWEST_FIRST};

const BUCKET_PROJECTION: [&str; 4] = [
    columns::ID,
    columns::BUCKET_ID,
    columns::BUCKET_DISPLAY_NAME,
    columns::DATE_TAKEN,
];

const ID_PROJECTION: [&str; 1] = [columns::ID];

/// Builds the album list: one album per bucket plus the "All Images",
/// "All Videos" and "Camera" albums.
pub struct AlbumAggregator {
    store: Arc<dyn MediaStore>,
}

impl AlbumAggregator {
    pub fn new(store: Arc<dyn MediaStore>) -> Self {
        Self { store }
    }

    /// Runs every sub-query concurrently on blocking workers. The first
    /// failing sub-query fails the whole aggregation.
    pub async fn aggregate(&self) -> Result<Vec<Album>, LoadError> {
        let (mut buckets, video_buckets, all_images, all_videos, camera) = tokio::try_join!(
            self.blocking(|store| scan_buckets(store, Collection::Images)),
            self.blocking(|store| scan_buckets(store, Collection::Videos)),
            self.blocking(|store| collection_album(store, Collection::Images)),
            self.blocking(|store| collection_album(store, Collection::Videos)),
            self.blocking(camera_album),
        )?;

        merge_buckets(&mut buckets, video_buckets);

        let mut albums: Vec<Album> = buckets.into_values().collect();
        albums.extend([all_images, all_videos, camera]);
        debug!("Aggregated {} albums", albums.len());

        Ok(albums)
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, LoadError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn MediaStore) -> Result<T, LoadError> + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(store.as_ref())).await?
    }
}

/// Groups one collection by bucket, newest row first. The first row seen for
/// a bucket becomes its cover.
fn scan_buckets(
    store: &dyn MediaStore,
    collection: Collection,
) -> Result<IndexMap<String, Album>, LoadError> {
    let query = StoreQuery::new(collection, &BUCKET_PROJECTION).order_by(NEWEST_FIRST);
    let mut buckets = IndexMap::new();

    let Some(mut cursor) = store.query(&query)? else {
        return Ok(buckets);
    };

    let id_col = cursor.column_index(columns::ID)?;
    let bucket_col = cursor.column_index(columns::BUCKET_ID)?;
    let name_col = cursor.column_index(columns::BUCKET_DISPLAY_NAME)?;

    while cursor.move_to_next() {
        let Some(bucket_id) = cursor.get_string(bucket_col)? else {
            continue;
        };

        if let Some(album) = buckets.get_mut(&bucket_id) {
            album.media_count += 1;
            continue;
        }

        let id = cursor
            .get_i64(id_col)?
            .ok_or_else(|| LoadError::invalid_arguments("row without an id"))?;
        let name = cursor.get_string(name_col)?.unwrap_or_default();
        buckets.insert(
            bucket_id.clone(),
            Album {
                id: bucket_id,
                name,
                cover_uri: MediaUri::new(collection, id),
                media_count: 1,
            },
        );
    }

    Ok(buckets)
}

/// Adds `other`'s counts into `into`. Covers already present are kept.
fn merge_buckets(into: &mut IndexMap<String, Album>, other: IndexMap<String, Album>) {
    for (bucket_id, album) in other {
        match into.get_mut(&bucket_id) {
            Some(existing) => existing.media_count += album.media_count,
            None => {
                into.insert(bucket_id, album);
            }
        }
    }
}

fn collection_album(store: &dyn MediaStore, collection: Collection) -> Result<Album, LoadError> {
    let (id, name) = match collection {
        Collection::Images => (ALL_IMAGES_ALBUM_ID, "All Images"),
        Collection::Videos => (ALL_VIDEOS_ALBUM_ID, "All Videos"),
    };

    let everything = StoreQuery::new(collection, &ID_PROJECTION);
    Ok(Album {
        id: id.to_string(),
        name: name.to_string(),
        cover_uri: newest(store, everything.clone())?.unwrap_or_else(MediaUri::empty),
        media_count: count(store, &everything)?,
    })
}

fn camera_album(store: &dyn MediaStore) -> Result<Album, LoadError> {
    let in_camera = |collection| {
        StoreQuery::new(collection, &ID_PROJECTION).selection(
            format!("{} = ?", columns::BUCKET_DISPLAY_NAME),
            vec![StoreValue::from(CAMERA_BUCKET_NAME)],
        )
    };
    let images = in_camera(Collection::Images);
    let videos = in_camera(Collection::Videos);

    let media_count = count(store, &images)? + count(store, &videos)?;
    let cover_uri = match newest(store, images)? {
        Some(uri) => uri,
        None => newest(store, videos)?.unwrap_or_else(MediaUri::empty),
    };

    Ok(Album {
        id: CAMERA_ALBUM_ID.to_string(),
        name: CAMERA_BUCKET_NAME.to_string(),
        cover_uri,
        media_count,
    })
}

fn count(store: &dyn MediaStore, query: &StoreQuery) -> Result<i64, LoadError> {
    Ok(store
        .query(query)?
        .map_or(0, |cursor| cursor.count() as i64))
}

fn newest(store: &dyn MediaStore, query: StoreQuery) -> Result<Option<MediaUri>, LoadError> {
    let collection = query.collection;
    let query = query.order_by(NEWEST_FIRST).window(0, 1);

    let Some(mut cursor) = store.query(&query)? else {
        return Ok(None);
    };
    if !cursor.move_to_first() {
        return Ok(None);
    }
    let id_col = cursor.column_index(columns::ID)?;
    Ok(cursor
        .get_i64(id_col)?
        .map(|id| MediaUri::new(collection, id)))
}
