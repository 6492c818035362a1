// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One fetched entry, in the field names the candidate loader accepts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchedEntry {
    pub id: String,
    pub url: String,
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    pub published: String, // RFC 3339, as delivered
    pub updated: Option<String>,
    pub categories: Vec<String>,
}

/// Result of one fetch: every entry inside the window, newest first, followed by entries
/// that could not be windowed (no id or no parsable date).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchSnapshot {
    pub generated_at: DateTime<Utc>,
    pub lookback_days: i64,
    pub cutoff: DateTime<Utc>,
    pub categories: Vec<String>,
    pub query: String,
    pub total_entries_scanned: usize,
    pub total_recent_entries: usize,
    #[serde(default)]
    pub unwindowed_entries: usize,
    pub items: Vec<FetchedEntry>,
}

#[async_trait::async_trait]
pub trait CandidateSource {
    async fn fetch_recent(&self) -> Result<FetchSnapshot>;
    fn name(&self) -> &'static str;
}
