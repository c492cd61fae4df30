use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::debug;

use crate::config::PagingConfig;
use crate::error::{AppError, AppResult, LoadError};
use crate::models::MediaPage;
use crate::paging::{LoadParams, PagingSource, PagingState};
use crate::producer::{Emitter, Producer};
use crate::retry::{with_retry, RetryPolicy};

/// Continuous page stream over one [`PagingSource`].
///
/// The first page is loaded right away. Each following page is loaded only
/// once the consumer reports, through [`MediaStream::access`], a position
/// within the prefetch distance of the end of what has been loaded. A single
/// driver task does all loading, so at most one load is in flight.
pub struct MediaStream {
    producer: Producer<AppResult<MediaPage>>,
    position: watch::Sender<Option<usize>>,
    state: Arc<Mutex<PagingState>>,
    source: Arc<PagingSource>,
}

impl MediaStream {
    pub fn start(
        source: Arc<PagingSource>,
        config: &PagingConfig,
        retry: RetryPolicy,
        initial_key: Option<i64>,
    ) -> Self {
        let state = Arc::new(Mutex::new(PagingState::default()));
        let (position, position_rx) = watch::channel(None);

        let driver = Driver {
            source: source.clone(),
            state: state.clone(),
            page_size: config.page_size,
            prefetch_distance: config.prefetch_distance,
            retry,
        };
        let producer = Producer::spawn(move |emitter| driver.run(emitter, position_rx, initial_key));

        Self {
            producer,
            position,
            state,
            source,
        }
    }

    /// Next page, a terminal error, or `None` once the end of the data was
    /// reached or the stream was cancelled.
    pub async fn next(&mut self) -> Option<AppResult<MediaPage>> {
        self.producer.next().await
    }

    /// Reports that the consumer is looking at `position` (0-based, counted
    /// over every item emitted so far).
    pub fn access(&self, position: usize) {
        lock(&self.state).anchor_position = Some(position);
        self.position.send_replace(Some(position));
    }

    pub fn loaded_count(&self) -> usize {
        lock(&self.state).item_count()
    }

    pub fn snapshot(&self) -> PagingState {
        lock(&self.state).clone()
    }

    /// Key a replacement stream should start from to keep the last accessed
    /// position in view.
    pub fn refresh_key(&self) -> Option<i64> {
        self.source.refresh_key(&lock(&self.state))
    }

    /// Stops loading. Any in-flight load or backoff is abandoned and its
    /// result discarded.
    pub fn cancel(&mut self) {
        self.producer.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.producer.is_cancelled()
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("media_type", &self.source.media_type())
            .field("album_id", &self.source.album_id())
            .field("loaded", &self.loaded_count())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

fn lock(state: &Mutex<PagingState>) -> MutexGuard<'_, PagingState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Driver {
    source: Arc<PagingSource>,
    state: Arc<Mutex<PagingState>>,
    page_size: i64,
    prefetch_distance: usize,
    retry: RetryPolicy,
}

impl Driver {
    async fn run(
        self,
        emitter: Emitter<AppResult<MediaPage>>,
        mut position: watch::Receiver<Option<usize>>,
        initial_key: Option<i64>,
    ) {
        let mut key = initial_key;

        loop {
            let params = LoadParams {
                key,
                load_size: self.page_size,
            };

            let page = match self.load(params, &emitter).await {
                None => return,
                Some(Err(e)) => {
                    emitter.emit(Err(e)).await;
                    return;
                }
                Some(Ok(page)) => page,
            };

            let next_key = page.next_key;
            lock(&self.state).pages.push(page.clone());
            if !emitter.emit(Ok(page)).await {
                return;
            }

            let Some(next_key) = next_key else {
                debug!("Reached end of {} media", self.source.media_type());
                return;
            };

            if !self.wait_for_demand(&emitter, &mut position).await {
                return;
            }
            key = Some(next_key);
        }
    }

    async fn load(
        &self,
        params: LoadParams,
        emitter: &Emitter<AppResult<MediaPage>>,
    ) -> Option<AppResult<MediaPage>> {
        with_retry(&self.retry, emitter.token(), "Media page load", || {
            let source = self.source.clone();
            async move {
                tokio::task::spawn_blocking(move || source.load(params))
                    .await
                    .map_err(LoadError::from)
                    .and_then(|loaded| loaded)
                    .map_err(AppError::from_media_failure)
            }
        })
        .await
    }

    /// Waits until the consumer is within the prefetch distance of the loaded
    /// window's end. Returns `false` if the stream went away meanwhile.
    async fn wait_for_demand(
        &self,
        emitter: &Emitter<AppResult<MediaPage>>,
        position: &mut watch::Receiver<Option<usize>>,
    ) -> bool {
        loop {
            let loaded = lock(&self.state).item_count();
            let current = *position.borrow_and_update();
            if current.is_some_and(|p| p.saturating_add(self.prefetch_distance) >= loaded) {
                return true;
            }

            tokio::select! {
                biased;
                _ = emitter.token().cancelled() => return false,
                changed = position.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadErrorKind;
    use crate::models::{MediaFilter, MediaType};
    use crate::store::{MediaStore, RowCursor, StoreQuery};
    use crate::test_utils::{create_test_store, insert_image, TestMedia};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn config() -> PagingConfig {
        PagingConfig::default()
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    fn seeded_source(rows: i64) -> (crate::test_utils::TestStore, Arc<PagingSource>) {
        let store = create_test_store();
        for id in 1..=rows {
            insert_image(&store, TestMedia::new(id, "a.jpg"));
        }
        let source = PagingSource::new(store.gateway(), MediaType::Image, MediaFilter::default(), None);
        (store, Arc::new(source))
    }

    #[tokio::test]
    async fn test_first_page_loads_without_demand() {
        let (_store, source) = seeded_source(150);
        let mut stream = MediaStream::start(source, &config(), fast_retry(), None);

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.items.len(), 60);
        assert_eq!(first.next_key, Some(60));
        assert_eq!(stream.loaded_count(), 60);
    }

    #[tokio::test]
    async fn test_next_page_waits_for_prefetch_distance() {
        let (_store, source) = seeded_source(150);
        let mut stream = MediaStream::start(source, &config(), fast_retry(), None);
        stream.next().await.unwrap().unwrap();

        // 39 + 20 < 60: not close enough to the end yet.
        stream.access(39);
        let early = tokio::time::timeout(Duration::from_millis(100), stream.next()).await;
        assert!(early.is_err(), "no page should load before demand");

        stream.access(40);
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.items.len(), 60);
        assert_eq!(second.prev_key, Some(59));
        assert_eq!(second.next_key, Some(120));

        stream.access(119);
        let third = stream.next().await.unwrap().unwrap();
        assert_eq!(third.items.len(), 30);
        assert_eq!(third.next_key, None);

        assert!(stream.next().await.is_none());
        assert_eq!(stream.loaded_count(), 150);
    }

    #[tokio::test]
    async fn test_huge_access_position_still_loads_next_page() {
        let (_store, source) = seeded_source(150);
        let mut stream = MediaStream::start(source, &config(), fast_retry(), None);
        stream.next().await.unwrap().unwrap();

        stream.access(usize::MAX);
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.items.len(), 60);
        assert_eq!(second.next_key, Some(120));

        let third = stream.next().await.unwrap().unwrap();
        assert_eq!(third.items.len(), 30);
        assert!(stream.next().await.is_none());
        assert!(!stream.is_cancelled());
    }

    #[tokio::test]
    async fn test_resume_from_initial_key() {
        let (_store, source) = seeded_source(100);
        let mut stream = MediaStream::start(source, &config(), fast_retry(), Some(70));

        let page = stream.next().await.unwrap().unwrap();
        assert_eq!(page.items.len(), 30);
        assert_eq!(page.prev_key, Some(69));
        assert_eq!(page.items[0].id, 30);
    }

    #[tokio::test]
    async fn test_refresh_key_follows_anchor() {
        let (_store, source) = seeded_source(150);
        let mut stream = MediaStream::start(source, &config(), fast_retry(), None);
        stream.next().await.unwrap().unwrap();
        stream.access(50);
        stream.next().await.unwrap().unwrap();

        stream.access(75);
        assert_eq!(stream.refresh_key(), Some(60));
        assert_eq!(stream.snapshot().pages.len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_ends_stream_without_more_pages() {
        let (_store, source) = seeded_source(150);
        let mut stream = MediaStream::start(source, &config(), fast_retry(), None);
        stream.next().await.unwrap().unwrap();

        stream.access(59);
        stream.cancel();
        assert!(stream.next().await.is_none());
        assert!(stream.is_cancelled());
    }

    struct CountingStore {
        calls: AtomicUsize,
        kind: LoadErrorKind,
    }

    impl MediaStore for CountingStore {
        fn query(&self, _query: &StoreQuery) -> Result<Option<Box<dyn RowCursor>>, LoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(LoadError::new(self.kind, "store unavailable"))
        }
    }

    #[tokio::test]
    async fn test_transient_errors_surface_as_unknown_after_retries() {
        let store = Arc::new(CountingStore {
            calls: AtomicUsize::new(0),
            kind: LoadErrorKind::Transient,
        });
        let source = PagingSource::new(store.clone(), MediaType::Image, MediaFilter::default(), None);
        let mut stream = MediaStream::start(Arc::new(source), &config(), fast_retry(), None);

        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, AppError::Unknown(_)));
        assert_eq!(store.calls.load(Ordering::SeqCst), 4);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_permission_errors_are_not_retried() {
        let store = Arc::new(CountingStore {
            calls: AtomicUsize::new(0),
            kind: LoadErrorKind::PermissionDenied,
        });
        let source = PagingSource::new(store.clone(), MediaType::Image, MediaFilter::default(), None);
        let mut stream = MediaStream::start(Arc::new(source), &config(), fast_retry(), None);

        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }
}
