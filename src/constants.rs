use once_cell::sync::Lazy;
use std::path::PathBuf;

pub static DATA_DIR: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("MOMENTO_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/data"))
});

pub static CONFIG_PATH: Lazy<PathBuf> = Lazy::new(|| DATA_DIR.join("gallery.yaml"));
pub static MEDIA_STORE_PATH: Lazy<PathBuf> = Lazy::new(|| DATA_DIR.join("media.sqlite"));

pub const IMAGES_CONTENT_URI: &str = "content://media/external/images/media";
pub const VIDEOS_CONTENT_URI: &str = "content://media/external/video/media";

pub const ALL_IMAGES_ALBUM_ID: &str = "ALL_IMAGES";
pub const ALL_VIDEOS_ALBUM_ID: &str = "ALL_VIDEOS";
pub const CAMERA_ALBUM_ID: &str = "CAMERA";
/// Album ids with this prefix span a whole collection and add no scope clause.
pub const UNSCOPED_ALBUM_PREFIX: &str = "ALL_";
pub const CAMERA_BUCKET_NAME: &str = "Camera";

pub const DEFAULT_PAGE_SIZE: i64 = 60;
pub const DEFAULT_PREFETCH_DISTANCE: usize = 20;
pub const MAX_PAGE_SIZE: i64 = 500;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;
