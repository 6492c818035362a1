// src/reference.rs
//! Reference Corpus: the user's bibliographic library, loaded from JSON.
//!
//! Accepts a bare array of records or a library snapshot `{ "items": [...] }`.
//! Field aliases cover the reference-manager export shape (`key`, `abstractNote`,
//! `publicationTitle`, `date`).

use crate::error::{RadarError, Result};
use crate::text::normalize_text;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Item types that never carry bibliographic content.
const SKIP_TYPES: &[&str] = &["attachment", "note", "annotation"];

/// One bibliographic entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    #[serde(alias = "key")]
    pub id: String,
    pub title: String,
    #[serde(default, alias = "abstractNote")]
    pub r#abstract: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, alias = "publicationTitle")]
    pub venue: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    /// Free-form date as exported; only used to derive `year`.
    #[serde(default, skip_serializing)]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "tags_lenient")]
    pub tags: BTreeSet<String>,
    #[serde(default, alias = "itemType")]
    pub item_type: Option<String>,
}

/// Tags come either as plain strings or as `{ "tag": "..." }` objects.
fn tags_lenient<'de, D>(de: D) -> std::result::Result<BTreeSet<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TagRepr {
        Plain(String),
        Object { tag: String },
    }
    let raw: Option<Vec<TagRepr>> = Option::deserialize(de)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|t| match t {
            TagRepr::Plain(s) => s,
            TagRepr::Object { tag } => tag,
        })
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect())
}

/// First 4-digit run that looks like a year.
pub fn parse_year(date: &str) -> Option<i32> {
    let bytes = date.as_bytes();
    let mut i = 0;
    while i + 4 <= bytes.len() {
        let window = &bytes[i..i + 4];
        let before_ok = i == 0 || !bytes[i - 1].is_ascii_digit();
        let after_ok = i + 4 == bytes.len() || !bytes[i + 4].is_ascii_digit();
        if before_ok && after_ok && window.iter().all(u8::is_ascii_digit) {
            let y: i32 = date[i..i + 4].parse().ok()?;
            if (1000..=2999).contains(&y) {
                return Some(y);
            }
        }
        i += 1;
    }
    None
}

/// The full set of records for one profile build.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReferenceCorpus {
    pub records: Vec<ReferenceRecord>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CorpusFile {
    Bare(Vec<ReferenceRecord>),
    Snapshot { items: Vec<ReferenceRecord> },
}

impl ReferenceCorpus {
    pub fn new(records: Vec<ReferenceRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Parse from a JSON string, normalising text and dropping untitled/non-bibliographic items.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let file: CorpusFile =
            serde_json::from_str(s).map_err(|e| RadarError::json("reference corpus", e))?;
        let raw = match file {
            CorpusFile::Snapshot { items } => items,
            CorpusFile::Bare(v) => v,
        };
        let total = raw.len();

        let mut records = Vec::with_capacity(total);
        for mut r in raw {
            if r
                .item_type
                .as_deref()
                .is_some_and(|t| SKIP_TYPES.contains(&t))
            {
                continue;
            }
            r.title = normalize_text(&r.title);
            if r.title.is_empty() {
                continue;
            }
            r.r#abstract = normalize_text(&r.r#abstract);
            if r.year.is_none() {
                r.year = r.date.as_deref().and_then(parse_year);
            }
            r.venue = r
                .venue
                .map(|v| normalize_text(&v))
                .filter(|v| !v.is_empty());
            records.push(r);
        }

        debug!(
            target: "profile",
            total,
            kept = records.len(),
            "reference corpus parsed"
        );
        Ok(Self { records })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| RadarError::io(path, e))?;
        let corpus = Self::from_json_str(&content)?;
        info!(
            target: "profile",
            path = %path.display(),
            records = corpus.len(),
            "reference corpus loaded"
        );
        Ok(corpus)
    }

    /// Latest publication year present in the corpus.
    pub fn max_year(&self) -> Option<i32> {
        self.records.iter().filter_map(|r| r.year).max()
    }
}

fn most_common<'a, I>(items: I, n: usize) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for it in items {
        *counts.entry(it).or_insert(0) += 1;
    }
    let mut v: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(k, c)| (k.to_string(), c))
        .collect();
    v.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    v.truncate(n);
    v
}

/// Markdown overview of the library: types, venues, tags, sample titles.
pub fn corpus_snapshot_markdown(corpus: &ReferenceCorpus) -> String {
    let mut lines = vec![
        "# Reference Library Snapshot".to_string(),
        String::new(),
        format!("- Readable items: {}", corpus.len()),
    ];
    if let Some(y) = corpus.max_year() {
        lines.push(format!("- Latest year: {y}"));
    }

    lines.push(String::new());
    lines.push("## Top Item Types".into());
    let types = corpus
        .records
        .iter()
        .map(|r| r.item_type.as_deref().unwrap_or("unknown"));
    for (t, c) in most_common(types, 15) {
        lines.push(format!("- {t}: {c}"));
    }

    lines.push(String::new());
    lines.push("## Top Venues".into());
    let venues = corpus.records.iter().filter_map(|r| r.venue.as_deref());
    for (v, c) in most_common(venues, 15) {
        lines.push(format!("- {v}: {c}"));
    }

    lines.push(String::new());
    lines.push("## Top Tags".into());
    let tags = corpus
        .records
        .iter()
        .flat_map(|r| r.tags.iter().map(String::as_str));
    for (t, c) in most_common(tags, 25) {
        lines.push(format!("- {t}: {c}"));
    }

    lines.push(String::new());
    lines.push("## Sample Titles".into());
    for r in corpus.records.iter().take(30) {
        lines.push(format!("- {}", r.title));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_parsing() {
        assert_eq!(parse_year("2023-05-01"), Some(2023));
        assert_eq!(parse_year("May 2019"), Some(2019));
        assert_eq!(parse_year("12345"), None);
        assert_eq!(parse_year(""), None);
    }

    #[test]
    fn loads_snapshot_shape_with_aliases() {
        let json = r#"{
            "generated_at_utc": "2025-01-01T00:00:00+00:00",
            "items": [
                {"key": "A1", "itemType": "journalArticle", "title": " Cosmic <i>dawn</i> ",
                 "abstractNote": "21-cm signal.", "publicationTitle": "ApJ",
                 "date": "2024-02-01", "tags": [{"tag": "Reionization"}, {"tag": " "}]},
                {"key": "A2", "itemType": "attachment", "title": "PDF"},
                {"key": "A3", "itemType": "journalArticle", "title": "   "}
            ]
        }"#;
        let c = ReferenceCorpus::from_json_str(json).unwrap();
        assert_eq!(c.len(), 1);
        let r = &c.records[0];
        assert_eq!(r.id, "A1");
        assert_eq!(r.title, "Cosmic dawn");
        assert_eq!(r.year, Some(2024));
        assert_eq!(r.venue.as_deref(), Some("ApJ"));
        assert_eq!(r.tags.iter().collect::<Vec<_>>(), vec!["reionization"]);
    }

    #[test]
    fn loads_bare_array() {
        let json = r#"[{"id": "x", "title": "T", "abstract": "A", "tags": ["Galaxies"]}]"#;
        let c = ReferenceCorpus::from_json_str(json).unwrap();
        assert_eq!(c.records[0].tags.iter().next().unwrap(), "galaxies");
    }

    #[test]
    fn snapshot_markdown_lists_sections() {
        let json = r#"[{"id": "x", "title": "T", "venue": "MNRAS", "tags": ["agn"]}]"#;
        let md = corpus_snapshot_markdown(&ReferenceCorpus::from_json_str(json).unwrap());
        assert!(md.contains("- Readable items: 1"));
        assert!(md.contains("- MNRAS: 1"));
        assert!(md.contains("- agn: 1"));
        assert!(md.contains("## Sample Titles"));
    }
}
