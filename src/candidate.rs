// src/candidate.rs
//! Candidate Batch: newly published documents evaluated in one run.
//!
//! Entries are parsed leniently (`RawCandidate`, every field optional) and then validated.
//! Invalid entries become [`MalformedEntry`] diagnostics instead of disappearing, so
//! `scanned_count` always equals the number of entries in the input.

use crate::error::{RadarError, Result};
use crate::text::normalize_text;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// A validated candidate document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub r#abstract: String,
    /// Ordered as delivered by the source; the first one is the primary category.
    pub categories: Vec<String>,
    pub published_at: DateTime<Utc>,
    pub link: String,
}

impl Candidate {
    pub fn primary_category(&self) -> Option<&str> {
        self.categories.first().map(String::as_str)
    }

    /// Title, abstract and categories as one searchable text.
    pub fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.title,
            self.r#abstract,
            self.categories.join(" ")
        )
    }

    /// Validate a raw entry. `position` names entries that have no id.
    pub fn try_from_raw(raw: RawCandidate, position: usize) -> Result<Self> {
        let id = raw
            .id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let label = id.clone().unwrap_or_else(|| format!("#{position}"));
        let Some(id) = id else {
            return Err(RadarError::malformed(label, "id"));
        };

        let title = raw.title.as_deref().map(normalize_text).unwrap_or_default();
        if title.is_empty() {
            return Err(RadarError::malformed(label, "title"));
        }
        let r#abstract = raw
            .r#abstract
            .as_deref()
            .map(normalize_text)
            .unwrap_or_default();
        if r#abstract.is_empty() {
            return Err(RadarError::malformed(label, "abstract"));
        }
        let Some(published_at) = raw.published_at.as_deref().and_then(parse_timestamp) else {
            return Err(RadarError::malformed(label, "published_at"));
        };

        let mut categories: Vec<String> = Vec::new();
        for c in raw.categories.unwrap_or_default() {
            let c = c.trim().to_string();
            if !c.is_empty() && !categories.contains(&c) {
                categories.push(c);
            }
        }

        let link = raw
            .link
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| format!("https://arxiv.org/abs/{id}"));

        Ok(Self {
            authors: raw
                .authors
                .unwrap_or_default()
                .into_iter()
                .map(|a| normalize_text(&a))
                .filter(|a| !a.is_empty())
                .collect(),
            id,
            title,
            r#abstract,
            categories,
            published_at,
            link,
        })
    }
}

/// RFC 3339 timestamps, or bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}

/// Unvalidated input entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCandidate {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Option<Vec<String>>,
    #[serde(default, alias = "summary")]
    pub r#abstract: Option<String>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default, alias = "published")]
    pub published_at: Option<String>,
    #[serde(default, alias = "url")]
    pub link: Option<String>,
}

/// An entry that failed validation; kept for diagnostics and near-miss reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MalformedEntry {
    /// Candidate id, or `#<position>` when the entry has none.
    pub id: String,
    pub title: Option<String>,
    pub missing: String,
    pub position: usize,
}

/// One run's input: every entry either validated or recorded as malformed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandidateBatch {
    pub candidates: Vec<Candidate>,
    pub malformed: Vec<MalformedEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BatchFile {
    Bare(Vec<serde_json::Value>),
    Snapshot { items: Vec<serde_json::Value> },
}

impl CandidateBatch {
    /// Validate raw entries in order. Nothing is dropped: invalid entries are recorded.
    pub fn from_raw(raw: Vec<RawCandidate>) -> Self {
        let mut batch = Self::default();
        for (position, r) in raw.into_iter().enumerate() {
            let title = r.title.clone();
            match Candidate::try_from_raw(r, position) {
                Ok(c) => batch.candidates.push(c),
                Err(RadarError::MalformedCandidate { id, missing }) => {
                    warn!(target: "scoring", %id, %missing, "malformed candidate excluded");
                    batch.malformed.push(MalformedEntry {
                        id,
                        title,
                        missing,
                        position,
                    });
                }
                Err(other) => {
                    // try_from_raw only reports malformed entries
                    batch.malformed.push(MalformedEntry {
                        id: format!("#{position}"),
                        title,
                        missing: other.to_string(),
                        position,
                    });
                }
            }
        }
        batch
    }

    pub fn from_candidates(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            malformed: Vec::new(),
        }
    }

    /// Parse a JSON array (or `{ "items": [...] }` fetch snapshot).
    /// Entries that are not even JSON objects of the right shape count as malformed.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let file: BatchFile =
            serde_json::from_str(s).map_err(|e| RadarError::json("candidate batch", e))?;
        let values = match file {
            BatchFile::Bare(v) => v,
            BatchFile::Snapshot { items } => items,
        };
        let raw = values
            .into_iter()
            .map(|v| serde_json::from_value::<RawCandidate>(v).unwrap_or_default())
            .collect();
        Ok(Self::from_raw(raw))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| RadarError::io(path, e))?;
        let batch = Self::from_json_str(&content)?;
        info!(
            target: "scoring",
            path = %path.display(),
            valid = batch.candidates.len(),
            malformed = batch.malformed.len(),
            "candidate batch loaded"
        );
        Ok(batch)
    }

    /// Number of input entries, valid or not.
    pub fn scanned_count(&self) -> usize {
        self.candidates.len() + self.malformed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scanned_count() == 0
    }
}

/// Markdown overview of a batch: counts per category and the covered time span.
pub fn batch_snapshot_markdown(batch: &CandidateBatch) -> String {
    let mut per_cat: BTreeMap<&str, usize> = BTreeMap::new();
    for c in &batch.candidates {
        for cat in &c.categories {
            *per_cat.entry(cat.as_str()).or_insert(0) += 1;
        }
    }
    let newest = batch.candidates.iter().map(|c| c.published_at).max();
    let oldest = batch.candidates.iter().map(|c| c.published_at).min();

    let mut lines = vec![
        "# Candidate Batch Snapshot".to_string(),
        String::new(),
        format!("- Entries scanned: {}", batch.scanned_count()),
        format!("- Valid: {}", batch.candidates.len()),
        format!("- Malformed: {}", batch.malformed.len()),
    ];
    if let (Some(o), Some(n)) = (oldest, newest) {
        lines.push(format!("- Window: {} .. {}", o.to_rfc3339(), n.to_rfc3339()));
    }
    lines.push(String::new());
    lines.push("## Categories".into());
    for (cat, n) in per_cat {
        lines.push(format!("- {cat}: {n}"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps() {
        assert!(parse_timestamp("2025-03-01T12:00:00Z").is_some());
        assert!(parse_timestamp("2025-03-01").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn malformed_entries_are_recorded_not_dropped() {
        let json = r#"[
            {"id": "2501.1", "title": "Ok", "summary": "Fine abstract.",
             "published": "2025-01-02T00:00:00Z", "categories": ["astro-ph.GA", "astro-ph.GA"]},
            {"id": "2501.2", "title": "No abstract", "published_at": "2025-01-02"},
            {"title": "No id", "abstract": "x", "published_at": "2025-01-02"},
            42
        ]"#;
        let b = CandidateBatch::from_json_str(json).unwrap();
        assert_eq!(b.scanned_count(), 4);
        assert_eq!(b.candidates.len(), 1);
        assert_eq!(b.candidates[0].categories, vec!["astro-ph.GA"]);
        assert_eq!(b.candidates[0].link, "https://arxiv.org/abs/2501.1");

        let missing: Vec<_> = b.malformed.iter().map(|m| m.missing.as_str()).collect();
        assert_eq!(missing, vec!["abstract", "id", "id"]);
        assert_eq!(b.malformed[1].id, "#2");
        assert_eq!(b.malformed[0].title.as_deref(), Some("No abstract"));
    }

    #[test]
    fn snapshot_markdown_counts_categories() {
        let json = r#"{"items": [
            {"id": "a", "title": "T", "abstract": "A", "published_at": "2025-01-02",
             "categories": ["astro-ph.CO", "gr-qc"]}
        ]}"#;
        let md = batch_snapshot_markdown(&CandidateBatch::from_json_str(json).unwrap());
        assert!(md.contains("- astro-ph.CO: 1"));
        assert!(md.contains("- gr-qc: 1"));
    }
}
