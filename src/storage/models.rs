use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A shortened URL owned by one anonymous user.
///
/// The zero value (`UrlRecord::default()`) is what lookups return when
/// nothing matches; check [`UrlRecord::is_empty`] rather than comparing fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    pub user_id: String,
    pub full: String,
    pub short: String,
    #[serde(default)]
    pub deleted: bool,
}

impl UrlRecord {
    pub fn new(user_id: impl Into<String>, full: impl Into<String>, short: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            full: full.into(),
            short: short.into(),
            deleted: false,
        }
    }

    /// True for the zero-value "not found" record.
    pub fn is_empty(&self) -> bool {
        self.full.is_empty() && self.short.is_empty()
    }
}

/// Aggregate counters computed on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub urls: usize,
    pub users: usize,
}

/// One line of the append-only file log.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StoredRecord {
    pub uuid: String,
    pub user_id: String,
    pub short_url: String,
    pub original_url: String,
    #[serde(default)]
    pub is_deleted: bool,
}

impl StoredRecord {
    pub fn from_record(record: &UrlRecord) -> Self {
        Self {
            uuid: Uuid::new_v4().to_string(),
            user_id: record.user_id.clone(),
            short_url: record.short.clone(),
            original_url: record.full.clone(),
            is_deleted: record.deleted,
        }
    }

    pub fn into_record(self) -> UrlRecord {
        UrlRecord {
            user_id: self.user_id,
            full: self.original_url,
            short: self.short_url,
            deleted: self.is_deleted,
        }
    }

    pub fn matches_full(&self, full: &str) -> bool {
        !self.is_deleted && self.original_url == full
    }

    pub fn matches_short(&self, short: &str) -> bool {
        self.short_url == short
    }

    pub fn owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}
