// src/profile/builder.rs
//! Profile Builder: reference corpus → Interest Profile.
//!
//! Clustering is keyword/tag based and fully deterministic:
//! 1. every record contributes its content terms (title + abstract) and its tags,
//!    weighted by recency relative to the newest record in the corpus;
//! 2. terms supported by ≥ `min_support` records are ranked by that weight;
//! 3. walking the ranking, a term either seeds a new topic bucket or, when its supporting
//!    records overlap an existing bucket (Jaccard ≥ `merge_overlap`), joins that bucket
//!    as an extra keyword;
//! 4. buckets are ranked by corpus share × recency.
//!
//! Every record is processed; records that land in no bucket are counted as unclustered.

use super::{
    default_dimension_cues, Dimension, InterestProfile, ProfileSource, ScoringWeights, Topic,
    PROFILE_SCHEMA_VERSION,
};
use crate::error::{RadarError, Result};
use crate::reference::{ReferenceCorpus, ReferenceRecord};
use crate::text::tokenize;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Method vocabulary the builder looks for to extend the method-alignment cues.
const METHOD_LEXICON: &[&str] = &[
    "simulation",
    "simulations",
    "hydrodynamical",
    "n-body",
    "bayesian",
    "mcmc",
    "inference",
    "emulator",
    "neural",
    "deep-learning",
    "spectroscopy",
    "spectroscopic",
    "photometry",
    "photometric",
    "astrometry",
    "interferometry",
    "radiative",
    "modelling",
    "modeling",
    "likelihood",
    "lensing",
    "timing",
    "polarimetry",
];

/// Tunables. Defaults produce 5–10 topics with 2–4 evidence titles each.
#[derive(Debug, Clone)]
pub struct BuilderParams {
    pub min_topics: usize,
    pub max_topics: usize,
    pub min_support: usize,
    pub max_evidence: usize,
    pub max_topic_keywords: usize,
    pub merge_overlap: f64,
    /// Terms present in more than this share of a ≥ 10 record corpus are too generic.
    pub max_doc_share: f64,
    /// A single mention this many years older than the newest record is stale.
    pub stale_years: i32,
    pub max_positive: usize,
    pub max_negative: usize,
    pub max_must_watch: usize,
}

impl Default for BuilderParams {
    fn default() -> Self {
        Self {
            min_topics: 5,
            max_topics: 10,
            min_support: 2,
            max_evidence: 4,
            max_topic_keywords: 6,
            merge_overlap: 0.6,
            max_doc_share: 0.6,
            stale_years: 5,
            max_positive: 25,
            max_negative: 10,
            max_must_watch: 3,
        }
    }
}

#[derive(Debug, Default)]
struct TermStats {
    docs: BTreeSet<usize>,
    weight: f64,
    is_tag: bool,
}

#[derive(Debug)]
struct Bucket {
    label: String,
    keywords: Vec<String>,
    docs: BTreeSet<usize>,
}

/// Derives profiles; holds only parameters.
#[derive(Debug, Clone, Default)]
pub struct ProfileBuilder {
    params: BuilderParams,
}

fn recency_weight(year: Option<i32>, max_year: Option<i32>) -> f64 {
    match (year, max_year) {
        (Some(y), Some(max)) => {
            let age = f64::from((max - y).max(0));
            1.0 / (1.0 + age / 3.0)
        }
        _ => 0.5,
    }
}

fn jaccard(a: &BTreeSet<usize>, b: &BTreeSet<usize>) -> f64 {
    let inter = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        inter as f64 / union as f64
    }
}

/// Hex SHA-256 over the sorted record ids.
pub fn corpus_fingerprint(corpus: &ReferenceCorpus) -> String {
    let mut ids: Vec<&str> = corpus.records.iter().map(|r| r.id.as_str()).collect();
    ids.sort_unstable();
    let mut hasher = Sha256::new();
    for id in ids {
        hasher.update(id.as_bytes());
        hasher.update(b"\n");
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

impl ProfileBuilder {
    pub fn new(params: BuilderParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &BuilderParams {
        &self.params
    }

    /// Build a fresh profile. `previous_revision` is the revision being replaced, if any.
    pub fn build(
        &self,
        corpus: &ReferenceCorpus,
        previous_revision: Option<u64>,
    ) -> Result<InterestProfile> {
        let p = &self.params;
        let n = corpus.len();
        if n == 0 {
            return Err(RadarError::insufficient(0, "reference corpus is empty"));
        }
        let max_year = corpus.max_year();
        let recency: Vec<f64> = corpus
            .records
            .iter()
            .map(|r| recency_weight(r.year, max_year))
            .collect();

        // (1) term statistics over every record
        let mut stats: BTreeMap<String, TermStats> = BTreeMap::new();
        for (i, rec) in corpus.records.iter().enumerate() {
            let text_terms: BTreeSet<String> =
                tokenize(&format!("{} {}", rec.title, rec.r#abstract))
                    .into_iter()
                    .collect();
            for t in &text_terms {
                let s = stats.entry(t.clone()).or_default();
                s.docs.insert(i);
                s.weight += recency[i];
            }
            for tag in &rec.tags {
                let s = stats.entry(tag.clone()).or_default();
                s.is_tag = true;
                // tags are explicit signals from the user: count double
                s.weight += if s.docs.insert(i) {
                    2.0 * recency[i]
                } else {
                    recency[i]
                };
            }
        }

        // (2) candidate terms
        let mut ranked: Vec<(&String, &TermStats)> = stats
            .iter()
            .filter(|(_, s)| s.docs.len() >= p.min_support && !self.too_common(s.docs.len(), n))
            .collect();
        ranked.sort_by(|a, b| b.1.weight.total_cmp(&a.1.weight).then_with(|| a.0.cmp(b.0)));

        // (3) greedy bucketing
        let mut buckets: Vec<Bucket> = Vec::new();
        for (term, s) in &ranked {
            if let Some(b) = buckets
                .iter_mut()
                .find(|b| jaccard(&b.docs, &s.docs) >= p.merge_overlap)
            {
                if b.keywords.len() < p.max_topic_keywords {
                    b.keywords.push((*term).clone());
                }
                continue;
            }
            if buckets.len() >= p.max_topics {
                continue;
            }
            let distinct_titles: BTreeSet<&str> = s
                .docs
                .iter()
                .map(|&i| corpus.records[i].title.as_str())
                .collect();
            if distinct_titles.len() < 2 {
                continue;
            }
            buckets.push(Bucket {
                label: (*term).clone(),
                keywords: vec![(*term).clone()],
                docs: s.docs.clone(),
            });
        }

        if buckets.len() < p.min_topics {
            return Err(RadarError::insufficient(
                n,
                format!(
                    "only {} topics supported by {}+ records (need {})",
                    buckets.len(),
                    p.min_support,
                    p.min_topics
                ),
            ));
        }

        // (4) rank by share × recency
        let mut scored: Vec<(f64, Bucket)> = buckets
            .into_iter()
            .map(|b| {
                let share = b.docs.len() as f64 / n as f64;
                let mean_recency =
                    b.docs.iter().map(|&i| recency[i]).sum::<f64>() / b.docs.len() as f64;
                (share * (0.5 + 0.5 * mean_recency), b)
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.label.cmp(&b.1.label)));
        let rank_total: f64 = scored.iter().map(|(r, _)| r).sum();

        let mut assigned: BTreeSet<usize> = BTreeSet::new();
        let mut topics = Vec::with_capacity(scored.len());
        let mut topic_docs = Vec::with_capacity(scored.len());
        for (rank, mut b) in scored {
            assigned.extend(b.docs.iter().copied());
            self.extend_keywords(&mut b, &stats, n);
            topics.push(Topic {
                evidence: self.evidence(&b, &corpus.records),
                label: b.label.clone(),
                weight: ((rank / rank_total) * 1000.0).round() / 1000.0,
                keywords: b.keywords.clone(),
            });
            topic_docs.push(b.docs);
        }
        let unclustered = n - assigned.len();

        // (5) keyword sets
        let must_watch_topics: BTreeSet<String> = topics
            .iter()
            .zip(&topic_docs)
            .filter(|(_, docs)| {
                let recent = docs
                    .iter()
                    .filter(|&&i| match (corpus.records[i].year, max_year) {
                        (Some(y), Some(max)) => y >= max - 1,
                        _ => false,
                    })
                    .count();
                docs.len() >= 3 && recent * 2 >= docs.len()
            })
            .map(|(t, _)| t.label.clone())
            .take(p.max_must_watch)
            .collect();

        let topic_terms: BTreeSet<&str> = topics
            .iter()
            .flat_map(|t| t.keywords.iter().map(String::as_str))
            .collect();
        let negative_keywords: BTreeSet<String> = stats
            .iter()
            .filter(|(term, s)| {
                s.is_tag
                    && s.docs.len() == 1
                    && !topic_terms.contains(term.as_str())
                    && s.docs.iter().all(|&i| match (corpus.records[i].year, max_year) {
                        (Some(y), Some(max)) => max - y >= p.stale_years,
                        _ => false,
                    })
            })
            .map(|(term, _)| term.clone())
            .take(p.max_negative)
            .collect();

        let positive_keywords: BTreeSet<String> = ranked
            .iter()
            .map(|(term, _)| (*term).clone())
            .filter(|t| !negative_keywords.contains(t))
            .take(p.max_positive)
            .chain(topics.iter().map(|t| t.label.clone()))
            .collect();

        // (6) dimension cues: defaults plus method terms the library actually uses
        let mut dimension_cues = default_dimension_cues();
        let method = dimension_cues
            .entry(Dimension::MethodAlignment)
            .or_default();
        for term in METHOD_LEXICON {
            if stats.contains_key(*term) && !method.iter().any(|m| m == term) {
                method.push(term.to_string());
            }
        }

        let narrative_sections = self.narrative(
            n,
            unclustered,
            max_year,
            &topics,
            &must_watch_topics,
            &negative_keywords,
        );

        let profile = InterestProfile {
            schema_version: PROFILE_SCHEMA_VERSION,
            revision: previous_revision.map_or(1, |r| r + 1),
            source: ProfileSource::Corpus,
            generated_at: Some(Utc::now()),
            corpus_fingerprint: Some(corpus_fingerprint(corpus)),
            corpus_size: n,
            topics,
            scoring_weights: ScoringWeights::default(),
            positive_keywords,
            negative_keywords,
            must_watch_topics,
            dimension_cues,
            narrative_sections,
        };

        for issue in profile.validation_issues() {
            warn!(target: "profile", %issue, "profile data-quality issue");
        }
        info!(
            target: "profile",
            records = n,
            topics = profile.topics.len(),
            unclustered,
            positive = profile.positive_keywords.len(),
            negative = profile.negative_keywords.len(),
            must_watch = profile.must_watch_topics.len(),
            revision = profile.revision,
            "interest profile built"
        );
        Ok(profile)
    }

    /// Add distinguishing co-occurring terms: frequent inside the bucket, rare outside.
    fn extend_keywords(&self, b: &mut Bucket, stats: &BTreeMap<String, TermStats>, n: usize) {
        let p = &self.params;
        let mut co: Vec<(usize, &String)> = stats
            .iter()
            .filter(|(term, s)| !b.keywords.contains(term) && !self.too_common(s.docs.len(), n))
            .filter_map(|(term, s)| {
                let inside = s.docs.intersection(&b.docs).count();
                (inside >= p.min_support && inside * 2 >= s.docs.len()).then_some((inside, term))
            })
            .collect();
        co.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        for (_, term) in co {
            if b.keywords.len() >= p.max_topic_keywords {
                break;
            }
            b.keywords.push(term.clone());
        }
    }

    fn too_common(&self, df: usize, n: usize) -> bool {
        n >= 10 && (df as f64) > self.params.max_doc_share * n as f64
    }

    /// 2–4 titles: label-in-title first, then newest, then alphabetical.
    fn evidence(&self, b: &Bucket, records: &[ReferenceRecord]) -> Vec<String> {
        let label = b.label.to_lowercase();
        let mut docs: Vec<&ReferenceRecord> = b.docs.iter().map(|&i| &records[i]).collect();
        docs.sort_by(|x, y| {
            let xt = x.title.to_lowercase().contains(&label);
            let yt = y.title.to_lowercase().contains(&label);
            yt.cmp(&xt)
                .then_with(|| y.year.cmp(&x.year))
                .then_with(|| x.title.cmp(&y.title))
        });
        let mut out: Vec<String> = Vec::new();
        for d in docs {
            if !out.contains(&d.title) {
                out.push(d.title.clone());
            }
            if out.len() == self.params.max_evidence {
                break;
            }
        }
        out
    }

    fn narrative(
        &self,
        n: usize,
        unclustered: usize,
        max_year: Option<i32>,
        topics: &[Topic],
        must_watch: &BTreeSet<String>,
        negative: &BTreeSet<String>,
    ) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        let latest = max_year.map_or_else(|| "unknown".to_string(), |y| y.to_string());
        out.insert(
            "summary".to_string(),
            format!(
                "Built from {n} reference records ({} in {} topics, {unclustered} unclustered); latest year {latest}.",
                n - unclustered,
                topics.len()
            ),
        );
        let focus: Vec<&str> = topics.iter().take(3).map(|t| t.label.as_str()).collect();
        out.insert(
            "focus".to_string(),
            format!("Strongest topics: {}.", focus.join(", ")),
        );
        if !must_watch.is_empty() {
            let v: Vec<&str> = must_watch.iter().map(String::as_str).collect();
            out.insert(
                "watch".to_string(),
                format!("Recently active, always surfaced: {}.", v.join(", ")),
            );
        }
        if !negative.is_empty() {
            let v: Vec<&str> = negative.iter().map(String::as_str).collect();
            out.insert(
                "deprioritized".to_string(),
                format!("Single stale mentions, suppressed: {}.", v.join(", ")),
            );
        }
        out
    }
}
