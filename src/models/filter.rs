use chrono::DateTime;
use indexmap::IndexSet;
use serde::{de, Deserialize, Deserializer};

use crate::error::LoadError;

/// Value of the size and date upper bounds when no bound is requested.
pub const UNBOUNDED: i64 = i64::MAX;

/// Restricts which records a media or album query sees. Dates are epoch
/// milliseconds of the capture date.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFilter {
    #[serde(default)]
    pub min_size_bytes: i64,
    #[serde(default = "unbounded")]
    pub max_size_bytes: i64,
    #[serde(default, deserialize_with = "deserialize_date")]
    pub after_date: i64,
    #[serde(default = "unbounded", deserialize_with = "deserialize_date")]
    pub before_date: i64,
    #[serde(default = "default_mime_types")]
    pub mime_types: IndexSet<String>,
}

fn unbounded() -> i64 {
    UNBOUNDED
}

fn default_mime_types() -> IndexSet<String> {
    ["image/*", "video/*"].into_iter().map(String::from).collect()
}

impl Default for MediaFilter {
    fn default() -> Self {
        Self {
            min_size_bytes: 0,
            max_size_bytes: unbounded(),
            after_date: 0,
            before_date: unbounded(),
            mime_types: default_mime_types(),
        }
    }
}

impl MediaFilter {
    /// A filter with no bounds and no mime restriction; compiles to an empty
    /// predicate.
    pub fn unrestricted() -> Self {
        Self {
            mime_types: IndexSet::new(),
            ..Self::default()
        }
    }

    pub fn with_size_range(mut self, min: i64, max: i64) -> Self {
        self.min_size_bytes = min;
        self.max_size_bytes = max;
        self
    }

    pub fn with_date_range(mut self, after: i64, before: i64) -> Self {
        self.after_date = after;
        self.before_date = before;
        self
    }

    pub fn with_mime_types<I, S>(mut self, mime_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mime_types = mime_types.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        if self.min_size_bytes < 0 {
            return Err(LoadError::invalid_arguments(format!(
                "minSizeBytes must not be negative, got {}",
                self.min_size_bytes
            )));
        }
        if self.max_size_bytes < self.min_size_bytes {
            return Err(LoadError::invalid_arguments(format!(
                "maxSizeBytes {} is below minSizeBytes {}",
                self.max_size_bytes, self.min_size_bytes
            )));
        }
        if self.after_date < 0 {
            return Err(LoadError::invalid_arguments(format!(
                "afterDate must not be negative, got {}",
                self.after_date
            )));
        }
        if self.before_date < self.after_date {
            return Err(LoadError::invalid_arguments(format!(
                "beforeDate {} is before afterDate {}",
                self.before_date, self.after_date
            )));
        }
        if let Some(blank) = self.mime_types.iter().find(|m| m.trim().is_empty()) {
            return Err(LoadError::invalid_arguments(format!(
                "mime type pattern {:?} is blank",
                blank
            )));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DateBound {
    Millis(i64),
    Text(String),
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match DateBound::deserialize(deserializer)? {
        DateBound::Millis(ms) => Ok(ms),
        DateBound::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.timestamp_millis())
            .map_err(|e| de::Error::custom(format!("invalid date {:?}: {}", text, e))),
    }
}
