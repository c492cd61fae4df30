use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::MediaFilter;
use crate::store::Collection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn collection(self) -> Collection {
        match self {
            MediaType::Image => Collection::Images,
            MediaType::Video => Collection::Videos,
        }
    }

    /// Video iff the mime type is in the `video/` family; everything else is
    /// treated as an image.
    pub fn from_mime(mime_type: Option<&str>) -> Self {
        match mime_type {
            Some(mime) if mime.starts_with("video/") => MediaType::Video,
            _ => MediaType::Image,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Image => write!(f, "IMAGE"),
            MediaType::Video => write!(f, "VIDEO"),
        }
    }
}

/// Opaque locator of a single record in the store. The empty locator stands
/// for "no item".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaUri(String);

impl MediaUri {
    pub fn new(collection: Collection, id: i64) -> Self {
        Self(format!("{}/{}", collection.content_uri(), id))
    }

    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: i64,
    pub uri: MediaUri,
    pub name: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
}

/// One page produced by the paging engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPage {
    pub items: Vec<MediaItem>,
    pub prev_key: Option<i64>,
    pub next_key: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaListRequest {
    pub media_type: MediaType,
    #[serde(default)]
    pub filter: MediaFilter,
    pub album_id: Option<String>,
    pub key: Option<i64>,
    pub page_size: Option<i64>,
}
