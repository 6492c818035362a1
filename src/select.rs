// src/select.rs
//! Selector: scored candidates → top-K, near misses and run statistics.
//!
//! Ordering is total: fit score desc, then `published_at` desc, then id asc.
//! The walk enforces the per-topic cap and drops near-duplicate titles; every candidate
//! that does not make the list gets a concrete [`ExclusionReason`]. When the eligible pool
//! runs out, top-K shrinks and the shortfall is reported, never padded.

use crate::config::SelectionConfig;
use crate::error::{RadarError, Result};
use crate::metrics::{ensure_described, SELECTED};
use crate::scoring::{ScoredBatch, ScoredCandidate};
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use strsim::normalized_levenshtein;
use tracing::{info, warn};

/// Why a candidate is not in the top-K.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExclusionReason {
    DuplicateTopic { topic: String },
    NearDuplicateTitle { of: String },
    DuplicateId,
    BelowThreshold { min: u8 },
    OutsideTopK { cutoff: u8 },
    Malformed { missing: String },
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateTopic { topic } => {
                write!(f, "duplicate topic: `{topic}` is already represented")
            }
            Self::NearDuplicateTitle { of } => write!(f, "near-duplicate title of {of}"),
            Self::DuplicateId => f.write_str("duplicate id in batch"),
            Self::BelowThreshold { min } => write!(f, "below threshold (min fit score {min})"),
            Self::OutsideTopK { cutoff } => write!(f, "outscored (top-K cutoff {cutoff})"),
            Self::Malformed { missing } => write!(f, "malformed entry: missing {missing}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearMiss {
    pub id: String,
    pub title: Option<String>,
    pub link: Option<String>,
    /// None for malformed entries, which were never scored.
    pub fit_score: Option<u8>,
    pub published_at: Option<DateTime<Utc>>,
    pub reason: ExclusionReason,
}

impl NearMiss {
    fn scored(c: &ScoredCandidate, reason: ExclusionReason) -> Self {
        Self {
            id: c.candidate.id.clone(),
            title: Some(c.candidate.title.clone()),
            link: Some(c.candidate.link.clone()),
            fit_score: Some(c.fit_score),
            published_at: Some(c.candidate.published_at),
            reason,
        }
    }
}

/// A counted data-quality note attached to the run: one malformed input entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub id: String,
    /// Zero-based position in the input batch.
    pub position: usize,
    pub missing: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "excluded at position {}: missing {}",
            self.position, self.missing
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionResult {
    pub scanned_count: usize,
    pub requested_k: usize,
    pub top_k: Vec<ScoredCandidate>,
    /// Mean of the selected scores rounded to one decimal; 0.0 when nothing was selected.
    pub average_top_k_score: f64,
    pub near_misses: Vec<NearMiss>,
    pub diagnostics: Vec<Diagnostic>,
}

impl SelectionResult {
    /// How many slots of the requested K stayed empty.
    pub fn shortfall(&self) -> usize {
        self.requested_k.saturating_sub(self.top_k.len())
    }
}

/// Fit score desc → published_at desc → id asc.
pub fn total_order(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.fit_score
        .cmp(&a.fit_score)
        .then_with(|| b.candidate.published_at.cmp(&a.candidate.published_at))
        .then_with(|| a.candidate.id.cmp(&b.candidate.id))
}

/// Arithmetic mean rounded to one decimal.
pub fn average_score(scores: &[u8]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let mean = scores.iter().map(|&s| s as f64).sum::<f64>() / scores.len() as f64;
    (mean * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Default)]
pub struct Selector {
    cfg: SelectionConfig,
}

impl Selector {
    pub fn new(cfg: SelectionConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.cfg
    }

    pub fn select(&self, batch: ScoredBatch) -> Result<SelectionResult> {
        let scanned_count = batch.scanned_count();
        if scanned_count == 0 {
            return Err(RadarError::EmptyBatch);
        }
        ensure_described();

        let ScoredBatch {
            mut scored,
            malformed,
        } = batch;
        scored.sort_by(total_order);

        let k = self.cfg.top_k;
        let max_per_topic = self.cfg.max_per_topic.max(1);
        let mut top_k: Vec<ScoredCandidate> = Vec::with_capacity(k);
        let mut excluded: Vec<NearMiss> = Vec::new();
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut per_topic: HashMap<String, usize> = HashMap::new();

        for c in scored {
            let reason = self.exclusion(&c, &top_k, &seen_ids, &per_topic);
            seen_ids.insert(c.candidate.id.clone());
            match reason {
                Some(r) => excluded.push(NearMiss::scored(&c, r)),
                None => {
                    *per_topic.entry(c.primary_topic.clone()).or_insert(0) += 1;
                    top_k.push(c);
                }
            }
        }
        debug_assert!(per_topic.values().all(|&n| n <= max_per_topic));

        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut malformed_misses = Vec::with_capacity(malformed.len());
        for m in &malformed {
            diagnostics.push(Diagnostic {
                id: m.id.clone(),
                position: m.position,
                missing: m.missing.clone(),
            });
            malformed_misses.push(NearMiss {
                id: m.id.clone(),
                title: m.title.clone(),
                link: None,
                fit_score: None,
                published_at: None,
                reason: ExclusionReason::Malformed {
                    missing: m.missing.clone(),
                },
            });
        }

        let near_misses: Vec<NearMiss> = excluded
            .into_iter()
            .chain(malformed_misses)
            .take(self.cfg.near_misses)
            .collect();

        let scores: Vec<u8> = top_k.iter().map(|c| c.fit_score).collect();
        let result = SelectionResult {
            scanned_count,
            requested_k: k,
            average_top_k_score: average_score(&scores),
            top_k,
            near_misses,
            diagnostics,
        };

        counter!(SELECTED).increment(result.top_k.len() as u64);
        if result.shortfall() > 0 {
            warn!(
                target: "select",
                requested = k,
                selected = result.top_k.len(),
                "not enough eligible candidates; top-K shrinks"
            );
        }
        info!(
            target: "select",
            scanned = result.scanned_count,
            selected = result.top_k.len(),
            near_misses = result.near_misses.len(),
            average = result.average_top_k_score,
            "selection complete"
        );
        Ok(result)
    }

    fn exclusion(
        &self,
        c: &ScoredCandidate,
        top_k: &[ScoredCandidate],
        seen_ids: &HashSet<String>,
        per_topic: &HashMap<String, usize>,
    ) -> Option<ExclusionReason> {
        if seen_ids.contains(&c.candidate.id) {
            return Some(ExclusionReason::DuplicateId);
        }
        if c.fit_score < self.cfg.min_fit_score {
            return Some(ExclusionReason::BelowThreshold {
                min: self.cfg.min_fit_score,
            });
        }
        if per_topic.get(&c.primary_topic).copied().unwrap_or(0) >= self.cfg.max_per_topic.max(1)
        {
            return Some(ExclusionReason::DuplicateTopic {
                topic: c.primary_topic.clone(),
            });
        }
        let title = c.candidate.title.to_lowercase();
        if let Some(twin) = top_k.iter().find(|s| {
            normalized_levenshtein(&title, &s.candidate.title.to_lowercase())
                >= self.cfg.title_similarity
        }) {
            return Some(ExclusionReason::NearDuplicateTitle {
                of: twin.candidate.id.clone(),
            });
        }
        if top_k.len() >= self.cfg.top_k {
            return Some(ExclusionReason::OutsideTopK {
                cutoff: top_k.last().map_or(0, |s| s.fit_score),
            });
        }
        None
    }
}
