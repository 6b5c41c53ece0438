//! Request/response bodies of the HTTP API

use serde::{Deserialize, Serialize};

use crate::storage::Stats;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortenRequest {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub result: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequestItem {
    pub correlation_id: String,
    pub original_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchResponseItem {
    pub correlation_id: String,
    pub short_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserUrlItem {
    pub short_url: String,
    pub original_url: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatsResponse {
    pub urls: usize,
    pub users: usize,
}

impl From<Stats> for StatsResponse {
    fn from(stats: Stats) -> Self {
        Self {
            urls: stats.urls,
            users: stats.users,
        }
    }
}
