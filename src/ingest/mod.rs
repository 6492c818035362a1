// src/ingest/mod.rs
//! Candidate fetch collaborator: pulls the trailing window of new papers and writes the
//! snapshot the `run` command later loads as a Candidate Batch.
pub mod arxiv;
pub mod types;

use crate::error::{RadarError, Result};
use crate::ingest::types::{CandidateSource, FetchSnapshot};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Run one source and return its snapshot.
pub async fn fetch_with(source: &dyn CandidateSource) -> anyhow::Result<FetchSnapshot> {
    let snap = source.fetch_recent().await?;
    info!(
        target: "ingest",
        provider = source.name(),
        recent = snap.total_recent_entries,
        "snapshot ready"
    );
    Ok(snap)
}

/// Write the snapshot as pretty JSON via temp file + rename.
pub fn write_snapshot(path: &Path, snap: &FetchSnapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snap).map_err(|e| RadarError::json("fetch snapshot", e))?;
    let write = || -> std::io::Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)?;
        f.write_all(json.as_bytes())?;
        fs::rename(&tmp, path)
    };
    write().map_err(|e| RadarError::io(path, e))
}

/// Markdown overview of a fetch: window, counts, categories, sample titles.
pub fn snapshot_markdown(snap: &FetchSnapshot) -> String {
    let mut per_cat: BTreeMap<&str, usize> = BTreeMap::new();
    for it in &snap.items {
        for c in &it.categories {
            *per_cat.entry(c.as_str()).or_insert(0) += 1;
        }
    }
    let mut cats: Vec<(&str, usize)> = per_cat.into_iter().collect();
    cats.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let mut lines = vec![
        format!("# arXiv Last {} Days", snap.lookback_days),
        String::new(),
        format!("- Generated (UTC): {}", snap.generated_at.to_rfc3339()),
        format!("- Cutoff (UTC): {}", snap.cutoff.to_rfc3339()),
        format!("- Entries scanned: {}", snap.total_entries_scanned),
        format!("- Recent entries: {}", snap.total_recent_entries),
        format!("- Entries without id or date: {}", snap.unwindowed_entries),
        String::new(),
        "## Category Counts".to_string(),
    ];
    lines.extend(cats.into_iter().map(|(c, n)| format!("- {c}: {n}")));
    lines.push(String::new());
    lines.push("## Sample Titles".to_string());
    lines.extend(
        snap.items
            .iter()
            .take(30)
            .map(|it| format!("- [{}] {}", it.id, it.title)),
    );
    lines.join("\n")
}
