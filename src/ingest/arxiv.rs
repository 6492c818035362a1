// src/ingest/arxiv.rs
//! arXiv Atom API source.
//!
//! Pages through the category query (newest submissions first), keeps entries published
//! inside the trailing lookback window, and stops at the first page holding only older
//! entries, at `max_scan`, or at the reported total. Entries are de-duplicated by id and
//! returned newest first. No category filtering happens after the fetch.
//!
//! Entries without an id or with an unparsable `published` date cannot be windowed. They are
//! kept after the recent entries so the candidate loader records them as malformed.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::{info, warn};

use crate::candidate::parse_timestamp;
use crate::config::FetchConfig;
use crate::ingest::types::{CandidateSource, FetchSnapshot, FetchedEntry};
use crate::text::normalize_text;

pub const ARXIV_API: &str = "https://export.arxiv.org/api/query";
const USER_AGENT: &str = concat!("paper-radar/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "totalResults", alias = "opensearch:totalResults", default)]
    total_results: Option<String>,
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    #[serde(rename = "author", default)]
    authors: Vec<Author>,
    #[serde(rename = "category", default)]
    categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Category {
    #[serde(rename = "@term")]
    term: Option<String>,
}

/// One parsed API page.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomPage {
    pub total_results: Option<usize>,
    pub entries: Vec<FetchedEntry>,
}

/// `http://arxiv.org/abs/2503.01234v1` → `2503.01234v1`
fn arxiv_id(entry_url: &str) -> String {
    entry_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

pub fn parse_feed(xml: &str) -> Result<AtomPage> {
    let feed: Feed = from_str(xml).context("parsing arxiv atom xml")?;
    let entries = feed
        .entries
        .into_iter()
        .map(|e| {
            let url = e.id.as_deref().map(str::trim).unwrap_or_default().to_string();
            FetchedEntry {
                id: arxiv_id(&url),
                url,
                title: normalize_text(e.title.as_deref().unwrap_or_default()),
                authors: e
                    .authors
                    .into_iter()
                    .filter_map(|a| a.name)
                    .map(|n| normalize_text(&n))
                    .filter(|n| !n.is_empty())
                    .collect(),
                summary: normalize_text(e.summary.as_deref().unwrap_or_default()),
                published: e.published.unwrap_or_default().trim().to_string(),
                updated: e.updated.map(|u| u.trim().to_string()),
                categories: e
                    .categories
                    .into_iter()
                    .filter_map(|c| c.term)
                    .filter(|t| !t.is_empty())
                    .collect(),
            }
        })
        .collect();
    Ok(AtomPage {
        total_results: feed.total_results.and_then(|t| t.trim().parse().ok()),
        entries,
    })
}

/// Accumulates pages until the window is exhausted.
#[derive(Debug)]
pub struct WindowCollector {
    cutoff: DateTime<Utc>,
    recent: BTreeMap<String, FetchedEntry>,
    /// No id or no parsable date; kept in arrival order.
    unwindowed: Vec<FetchedEntry>,
    scanned: usize,
}

impl WindowCollector {
    pub fn new(cutoff: DateTime<Utc>) -> Self {
        Self {
            cutoff,
            recent: BTreeMap::new(),
            unwindowed: Vec::new(),
            scanned: 0,
        }
    }

    /// Take one page; false once the page held nothing inside the window.
    pub fn absorb(&mut self, entries: Vec<FetchedEntry>) -> bool {
        if entries.is_empty() {
            return false;
        }
        let mut older_only = true;
        for e in entries {
            self.scanned += 1;
            let ts = parse_timestamp(&e.published).filter(|_| !e.id.is_empty());
            let Some(ts) = ts else {
                warn!(target: "ingest", id = %e.id, published = %e.published, "entry kept without window check");
                if e.id.is_empty() || !self.unwindowed.iter().any(|u| u.id == e.id) {
                    self.unwindowed.push(e);
                }
                continue;
            };
            if ts >= self.cutoff {
                older_only = false;
                self.recent.insert(e.id.clone(), e);
            }
        }
        !older_only
    }

    pub fn scanned(&self) -> usize {
        self.scanned
    }

    /// Entries inside the window so far.
    pub fn recent(&self) -> usize {
        self.recent.len()
    }

    pub fn unwindowed(&self) -> usize {
        self.unwindowed.len()
    }

    /// Entries inside the window, newest first (ties by id), then the unwindowed ones.
    pub fn into_items(self) -> Vec<FetchedEntry> {
        let mut items: Vec<(DateTime<Utc>, FetchedEntry)> = self
            .recent
            .into_values()
            .filter_map(|e| parse_timestamp(&e.published).map(|t| (t, e)))
            .collect();
        items.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
        items
            .into_iter()
            .map(|(_, e)| e)
            .chain(self.unwindowed)
            .collect()
    }
}

pub fn build_query(categories: &[String]) -> String {
    categories
        .iter()
        .map(|c| format!("cat:{c}"))
        .collect::<Vec<_>>()
        .join(" OR ")
}

enum Mode {
    /// Pre-recorded pages served in order (tests, offline runs).
    Fixture(Mutex<Vec<String>>),
    Http {
        endpoint: String,
        client: reqwest::Client,
    },
}

pub struct ArxivSource {
    cfg: FetchConfig,
    mode: Mode,
}

impl ArxivSource {
    pub fn http(cfg: FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(90))
            .build()
            .context("building arxiv http client")?;
        Ok(Self {
            cfg,
            mode: Mode::Http {
                endpoint: ARXIV_API.to_string(),
                client,
            },
        })
    }

    pub fn from_pages(cfg: FetchConfig, pages: Vec<String>) -> Self {
        let mut pages = pages;
        pages.reverse(); // popped from the back
        Self {
            cfg,
            mode: Mode::Fixture(Mutex::new(pages)),
        }
    }

    async fn fetch_page(&self, query: &str, start: usize) -> Result<Option<String>> {
        match &self.mode {
            Mode::Fixture(pages) => {
                let mut g = pages
                    .lock()
                    .map_err(|_| anyhow::anyhow!("fixture pages lock poisoned"))?;
                Ok(g.pop())
            }
            Mode::Http { endpoint, client } => {
                let start_s = start.to_string();
                let size_s = self.cfg.batch_size.to_string();
                let resp = client
                    .get(endpoint)
                    .query(&[
                        ("search_query", query),
                        ("start", start_s.as_str()),
                        ("max_results", size_s.as_str()),
                        ("sortBy", "submittedDate"),
                        ("sortOrder", "descending"),
                    ])
                    .send()
                    .await
                    .context("arxiv http get()")?
                    .error_for_status()
                    .context("arxiv http status")?;
                Ok(Some(resp.text().await.context("arxiv http .text()")?))
            }
        }
    }
}

#[async_trait]
impl CandidateSource for ArxivSource {
    async fn fetch_recent(&self) -> Result<FetchSnapshot> {
        let now = Utc::now();
        let cutoff = now - Duration::days(self.cfg.lookback_days.max(0));
        let query = build_query(&self.cfg.categories);
        let mut collector = WindowCollector::new(cutoff);
        let mut total: Option<usize> = None;
        let mut start = 0usize;

        while start < self.cfg.max_scan {
            let Some(xml) = self.fetch_page(&query, start).await? else {
                break;
            };
            let page = parse_feed(&xml)?;
            if total.is_none() {
                total = page.total_results;
            }
            let n = page.entries.len();
            if !collector.absorb(page.entries) {
                break;
            }
            start += n;
            if total.is_some_and(|t| start >= t) {
                break;
            }
        }

        let scanned = collector.scanned();
        let recent = collector.recent();
        let unwindowed = collector.unwindowed();
        let items = collector.into_items();
        info!(
            target: "ingest",
            provider = self.name(),
            scanned,
            recent,
            unwindowed,
            lookback_days = self.cfg.lookback_days,
            "arxiv fetch complete"
        );
        Ok(FetchSnapshot {
            generated_at: now,
            lookback_days: self.cfg.lookback_days,
            cutoff,
            categories: self.cfg.categories.clone(),
            query,
            total_entries_scanned: scanned,
            total_recent_entries: recent,
            unwindowed_entries: unwindowed,
            items,
        })
    }

    fn name(&self) -> &'static str {
        "arxiv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_and_query() {
        assert_eq!(arxiv_id("http://arxiv.org/abs/2503.01234v1"), "2503.01234v1");
        assert_eq!(arxiv_id("http://arxiv.org/abs/astro-ph/0101001v2/"), "0101001v2");
        assert_eq!(
            build_query(&["astro-ph.GA".into(), "astro-ph.CO".into()]),
            "cat:astro-ph.GA OR cat:astro-ph.CO"
        );
    }
}
