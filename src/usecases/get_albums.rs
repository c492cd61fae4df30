use std::sync::Arc;
use tracing::{debug, info};

use crate::aggregator::AlbumAggregator;
use crate::error::{AppError, AppResult};
use crate::models::{Album, MediaFilter};
use crate::producer::Producer;
use crate::retry::{with_retry, RetryPolicy};
use crate::store::MediaStore;

/// Album list for the gallery's album screen.
pub struct GetAlbums {
    aggregator: Arc<AlbumAggregator>,
    retry: RetryPolicy,
}

impl GetAlbums {
    pub fn new(store: Arc<dyn MediaStore>, retry: RetryPolicy) -> Self {
        Self {
            aggregator: Arc::new(AlbumAggregator::new(store)),
            retry,
        }
    }

    /// Emits an empty list right away, then the processed album list or the
    /// error that ended the load. Consecutive equal lists are emitted once.
    ///
    /// The filter is recorded but does not narrow the albums.
    pub fn invoke(&self, filter: MediaFilter) -> Producer<AppResult<Vec<Album>>> {
        let aggregator = self.aggregator.clone();
        let retry = self.retry;

        Producer::spawn(move |emitter| async move {
            let mut emitter =
                emitter.distinct_by(|albums: &AppResult<Vec<Album>>| albums.as_ref().ok().cloned());
            debug!("Loading albums with filter {:?}", filter);

            if !emitter.emit(Ok(Vec::new())).await {
                return;
            }

            let loaded = with_retry(&retry, emitter.token(), "Album aggregation", || {
                aggregator.aggregate()
            })
            .await;

            let result = match loaded {
                None => return,
                Some(Ok(albums)) => process_albums(albums),
                Some(Err(e)) => Err(AppError::AlbumLoadFailed(e)),
            };
            emitter.emit(result).await;
        })
    }

    /// Drains [`GetAlbums::invoke`] and returns its final list.
    pub async fn snapshot(&self, filter: MediaFilter) -> AppResult<Vec<Album>> {
        let mut producer = self.invoke(filter);
        let mut latest = Vec::new();
        while let Some(albums) = producer.next().await {
            latest = albums?;
        }
        Ok(latest)
    }
}

/// Drops cache folders and empty albums, then orders by size, largest first.
/// Albums of equal size keep their relative order.
fn process_albums(albums: Vec<Album>) -> AppResult<Vec<Album>> {
    let mut albums: Vec<Album> = albums
        .into_iter()
        .filter(|a| !a.name.to_lowercase().contains("cache"))
        .filter(|a| a.media_count != 0)
        .collect();
    albums.sort_by(|a, b| b.media_count.cmp(&a.media_count));

    if albums.is_empty() {
        return Err(AppError::NoAlbumsFound);
    }
    info!("Loaded {} albums", albums.len());
    Ok(albums)
}
