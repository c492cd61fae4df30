use std::sync::Arc;
use tracing::debug;

use crate::config::PagingConfig;
use crate::error::{AppError, AppResult};
use crate::models::{MediaFilter, MediaPage, MediaType};
use crate::paging::{MediaStream, PagingSource};
use crate::retry::RetryPolicy;
use crate::store::MediaStore;

/// Scroll state carried over from an earlier stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrowseOptions {
    /// Offset to resume from; `None` starts at the newest item.
    pub initial_key: Option<i64>,
}

impl BrowseOptions {
    pub fn resume_at(key: i64) -> Self {
        Self {
            initial_key: Some(key),
        }
    }
}

/// Paged media listing for one media type, optionally scoped to an album.
pub struct GetMedia {
    store: Arc<dyn MediaStore>,
    paging: PagingConfig,
    retry: RetryPolicy,
}

impl GetMedia {
    pub fn new(store: Arc<dyn MediaStore>, paging: PagingConfig, retry: RetryPolicy) -> Self {
        Self {
            store,
            paging,
            retry,
        }
    }

    pub fn invoke(
        &self,
        media_type: MediaType,
        filter: MediaFilter,
        album_id: Option<String>,
        options: BrowseOptions,
    ) -> MediaStream {
        self.stream(media_type, filter, album_id, options, &self.paging)
    }

    /// Loads the single page starting at `key`.
    pub async fn page(
        &self,
        media_type: MediaType,
        filter: MediaFilter,
        album_id: Option<String>,
        key: Option<i64>,
        page_size: i64,
    ) -> AppResult<MediaPage> {
        let paging = PagingConfig {
            page_size,
            ..self.paging.clone()
        };
        let options = BrowseOptions { initial_key: key };

        let mut stream = self.stream(media_type, filter, album_id, options, &paging);
        match stream.next().await {
            Some(page) => page,
            None => Err(AppError::Internal(
                "Media stream ended before its first page".to_string(),
            )),
        }
    }

    fn stream(
        &self,
        media_type: MediaType,
        filter: MediaFilter,
        album_id: Option<String>,
        options: BrowseOptions,
        paging: &PagingConfig,
    ) -> MediaStream {
        debug!(
            "Browsing {} media in album {:?} from key {:?}",
            media_type, album_id, options.initial_key
        );
        let source = PagingSource::new(self.store.clone(), media_type, filter, album_id);
        MediaStream::start(Arc::new(source), paging, self.retry, options.initial_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_store, insert_image, insert_video, TestMedia};
    use std::time::Duration;

    fn use_case(store: &crate::test_utils::TestStore) -> GetMedia {
        let retry = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::ZERO,
        };
        GetMedia::new(store.gateway(), PagingConfig::default(), retry)
    }

    #[tokio::test]
    async fn test_eighty_rows_arrive_as_sixty_then_twenty() {
        let store = create_test_store();
        for id in 1..=80 {
            insert_image(&store, TestMedia::new(id, "img.jpg"));
        }

        let mut stream = use_case(&store).invoke(
            MediaType::Image,
            MediaFilter::default(),
            None,
            BrowseOptions::default(),
        );

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.items.len(), 60);
        assert_eq!(first.prev_key, None);
        assert_eq!(first.next_key, Some(60));

        stream.access(45);
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.items.len(), 20);
        assert_eq!(second.prev_key, Some(59));
        assert_eq!(second.next_key, None);

        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_album_scope_and_resume() {
        let store = create_test_store();
        for id in 1..=10 {
            let media = TestMedia::new(id, "v.mp4");
            let media = if id % 2 == 0 {
                media.bucket("trip", "Trip")
            } else {
                media.bucket("other", "Other")
            };
            insert_video(&store, media);
        }

        let mut stream = use_case(&store).invoke(
            MediaType::Video,
            MediaFilter::default(),
            Some("trip".to_string()),
            BrowseOptions::resume_at(2),
        );

        let page = stream.next().await.unwrap().unwrap();
        let ids: Vec<i64> = page.items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![6, 4, 2]);
        assert!(page.items.iter().all(|i| i.media_type == MediaType::Video));
    }

    #[tokio::test]
    async fn test_single_page_honors_page_size() {
        let store = create_test_store();
        for id in 1..=5 {
            insert_image(&store, TestMedia::new(id, "img.jpg"));
        }

        let page = use_case(&store)
            .page(MediaType::Image, MediaFilter::default(), None, Some(2), 2)
            .await
            .unwrap();
        let ids: Vec<i64> = page.items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![3, 2]);
        assert_eq!(page.prev_key, Some(1));
        assert_eq!(page.next_key, Some(4));
    }

    #[tokio::test]
    async fn test_invalid_filter_is_reported_not_retried() {
        let store = create_test_store();
        let filter = MediaFilter::default().with_size_range(10, 5);

        let err = use_case(&store)
            .page(MediaType::Image, filter, None, None, 60)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArguments(_)));
    }
}
