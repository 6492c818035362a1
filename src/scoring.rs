// src/scoring.rs
//! Candidate Scorer: Interest Profile × Candidate → Fit Score (0..=100) + rationale.
//!
//! Every dimension is scored independently against title + abstract + categories:
//!
//! ```text
//! dim_score = baseline + (1 - baseline) * signal        (signal in [0,1])
//! weighted  = Σ weight_d * dim_score_d / Σ weight_d * 100
//! raw       = weighted + min(boost_cap, boost * positive_hits)
//! fit       = clamp(floor(raw + 0.5), 0, 100)           (round half up)
//! ```
//!
//! Keyword adjustments run last: a negative keyword caps the score at
//! `negative_ceiling`, then a must-watch match lifts it to at least `must_watch_floor`.
//! A document that matches nothing still gets the baseline score; keywords only adjust.

use crate::candidate::{Candidate, CandidateBatch, MalformedEntry, RawCandidate};
use crate::config::ScoringConfig;
use crate::error::Result;
use crate::metrics::{ensure_described, CANDIDATES_MALFORMED, CANDIDATES_SCANNED, SCORE_MS};
use crate::profile::{Dimension, InterestProfile, Topic};
use crate::text::TermIndex;
use metrics::{counter, histogram};
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

/// Hits at which a topic's keyword signal saturates.
const TOPIC_SATURATION: f64 = 2.0;
/// Positive keyword hits at which the topical signal saturates on its own.
const POSITIVE_SATURATION: f64 = 3.0;
/// Cue hits at which a non-topical dimension saturates.
const CUE_SATURATION: f64 = 2.0;

pub const UNCLUSTERED: &str = "unclustered";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionScore {
    pub dimension: Dimension,
    pub weight: u32,
    /// Raw match signal in [0,1].
    pub signal: f64,
    /// Baseline-lifted score in [0,1].
    pub score: f64,
    pub matched: Vec<String>,
}

/// How a fit score came about.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub dimensions: Vec<DimensionScore>,
    /// Weighted dimension sum on the 0..100 scale.
    pub weighted: f64,
    pub positive_hits: Vec<String>,
    pub positive_boost: u32,
    pub negative_hits: Vec<String>,
    pub must_watch_hits: Vec<String>,
    /// Score before rounding and keyword clamps.
    pub raw: f64,
}

/// One reason a candidate scored the way it did. Rendered to text per report language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RationalePart {
    Topic { topic: String, terms: Vec<String> },
    Positive { terms: Vec<String> },
    Cues { dimension: Dimension, terms: Vec<String> },
    Suppressed { ceiling: u8, terms: Vec<String> },
    MustWatch { floor: u8, topics: Vec<String> },
    /// Nothing in the profile matched.
    Baseline,
}

impl fmt::Display for RationalePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Topic { topic, terms } => {
                write!(f, "matches topic `{topic}` ({})", terms.join(", "))
            }
            Self::Positive { terms } => write!(f, "positive: {}", terms.join(", ")),
            Self::Cues { dimension, terms } => write!(f, "{dimension} cues: {}", terms.join(", ")),
            Self::Suppressed { ceiling, terms } => {
                write!(f, "suppressed to <= {ceiling} by {}", terms.join(", "))
            }
            Self::MustWatch { floor, topics } => {
                write!(f, "must-watch floor {floor} ({})", topics.join(", "))
            }
            Self::Baseline => f.write_str("no profile keywords matched; baseline dimension score"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub fit_score: u8,
    pub rationale: Vec<RationalePart>,
    /// Topic label used by the diversity constraint.
    pub primary_topic: String,
    pub breakdown: ScoreBreakdown,
}

/// Scored candidates in input order plus the entries excluded as malformed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoredBatch {
    pub scored: Vec<ScoredCandidate>,
    pub malformed: Vec<MalformedEntry>,
}

impl ScoredBatch {
    pub fn scanned_count(&self) -> usize {
        self.scored.len() + self.malformed.len()
    }
}

/// Round half up to an integer, clamped to 0..=100.
pub fn round_fit(raw: f64) -> u8 {
    if !raw.is_finite() {
        return 0;
    }
    (raw + 0.5).floor().clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone, Default)]
pub struct Scorer {
    cfg: ScoringConfig,
}

impl Scorer {
    pub fn new(cfg: ScoringConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.cfg
    }

    /// Validate one raw entry and score it; malformed entries fail with `MalformedCandidate`.
    pub fn try_score(
        &self,
        profile: &InterestProfile,
        raw: RawCandidate,
        position: usize,
    ) -> Result<ScoredCandidate> {
        let candidate = Candidate::try_from_raw(raw, position)?;
        Ok(self.score(profile, &candidate))
    }

    /// Score every valid candidate of the batch; malformed entries pass through.
    pub fn score_batch(&self, profile: &InterestProfile, batch: &CandidateBatch) -> ScoredBatch {
        ensure_described();
        let t0 = Instant::now();
        let scored: Vec<ScoredCandidate> = batch
            .candidates
            .iter()
            .map(|c| self.score(profile, c))
            .collect();
        let ms = t0.elapsed().as_secs_f64() * 1000.0;

        histogram!(SCORE_MS).record(ms);
        counter!(CANDIDATES_SCANNED).increment(batch.scanned_count() as u64);
        counter!(CANDIDATES_MALFORMED).increment(batch.malformed.len() as u64);
        info!(
            target: "scoring",
            scanned = batch.scanned_count(),
            scored = scored.len(),
            malformed = batch.malformed.len(),
            profile_revision = profile.revision,
            elapsed_ms = ms,
            "candidate batch scored"
        );

        ScoredBatch {
            scored,
            malformed: batch.malformed.clone(),
        }
    }

    pub fn score(&self, profile: &InterestProfile, candidate: &Candidate) -> ScoredCandidate {
        let index = TermIndex::new(&candidate.search_text());
        let baseline = self.cfg.dimension_baseline.clamp(0.0, 1.0);

        let topic_hits: Vec<Vec<String>> = profile
            .topics
            .iter()
            .map(|t| index.matches(&t.keywords))
            .collect();
        let positive_hits = index.matches(&profile.positive_keywords);
        let negative_hits = index.matches(&profile.negative_keywords);
        let must_watch_hits = must_watch_matches(profile, &index, &topic_hits);

        let weights = if profile.scoring_weights.total() == 0 {
            Default::default()
        } else {
            profile.scoring_weights.clone()
        };
        let total_weight = weights.total().max(1) as f64;

        let mut dimensions = Vec::with_capacity(Dimension::ALL.len());
        let mut weighted = 0.0;
        for d in Dimension::ALL {
            let (signal, matched) = match d {
                Dimension::TopicalRelevance => {
                    topical_signal(profile, &topic_hits, positive_hits.len())
                }
                other => {
                    let m = index.matches(profile.cues(other));
                    ((m.len() as f64 / CUE_SATURATION).min(1.0), m)
                }
            };
            let score = baseline + (1.0 - baseline) * signal;
            let weight = weights.get(d);
            weighted += weight as f64 * score;
            dimensions.push(DimensionScore {
                dimension: d,
                weight,
                signal,
                score,
                matched,
            });
        }
        let weighted = weighted / total_weight * 100.0;

        let positive_boost = (u32::from(self.cfg.positive_boost) * positive_hits.len() as u32)
            .min(u32::from(self.cfg.positive_boost_cap));
        let raw = weighted + positive_boost as f64;

        let mut fit = round_fit(raw);
        if !negative_hits.is_empty() {
            fit = fit.min(self.cfg.negative_ceiling);
        }
        if !must_watch_hits.is_empty() {
            fit = fit.max(self.cfg.must_watch_floor);
        }

        let primary_topic = primary_topic(&profile.topics, &topic_hits, candidate);
        let breakdown = ScoreBreakdown {
            dimensions,
            weighted,
            positive_hits,
            positive_boost,
            negative_hits,
            must_watch_hits,
            raw,
        };
        let rationale = rationale(&primary_topic, &breakdown, &self.cfg);

        debug!(
            target: "scoring",
            id = %candidate.id,
            fit,
            raw,
            topic = %primary_topic,
            "candidate scored"
        );

        ScoredCandidate {
            candidate: candidate.clone(),
            fit_score: fit,
            rationale,
            primary_topic,
            breakdown,
        }
    }
}

// best topic signal, or positive-keyword density if that is higher
fn topical_signal(
    profile: &InterestProfile,
    topic_hits: &[Vec<String>],
    positive_hits: usize,
) -> (f64, Vec<String>) {
    let wmax = profile.max_topic_weight();
    let mut best = 0.0_f64;
    let mut matched = Vec::new();
    for (topic, hits) in profile.topics.iter().zip(topic_hits) {
        if hits.is_empty() {
            continue;
        }
        let rel = if wmax > 0.0 {
            (topic.weight / wmax).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let s = (hits.len() as f64 / TOPIC_SATURATION).min(1.0) * (0.5 + 0.5 * rel);
        if s > best {
            best = s;
            matched = hits.clone();
        }
    }
    let pos = (positive_hits as f64 / POSITIVE_SATURATION).min(1.0);
    (best.max(pos), matched)
}

// a must-watch entry matches on its own phrase, or through the keywords of the topic it names
fn must_watch_matches(
    profile: &InterestProfile,
    index: &TermIndex,
    topic_hits: &[Vec<String>],
) -> Vec<String> {
    profile
        .must_watch_topics
        .iter()
        .filter(|label| {
            index.contains(label)
                || profile
                    .topics
                    .iter()
                    .zip(topic_hits)
                    .any(|(t, h)| t.label == **label && !h.is_empty())
        })
        .cloned()
        .collect()
}

/// Topic with the most keyword hits (earlier topic wins ties), else the primary category.
fn primary_topic(topics: &[Topic], topic_hits: &[Vec<String>], candidate: &Candidate) -> String {
    let mut best: Option<(usize, usize)> = None;
    for (i, hits) in topic_hits.iter().enumerate() {
        if hits.is_empty() {
            continue;
        }
        if best.map_or(true, |(_, n)| hits.len() > n) {
            best = Some((i, hits.len()));
        }
    }
    match best {
        Some((i, _)) => topics[i].label.clone(),
        None => match candidate.primary_category() {
            Some(cat) => format!("category:{cat}"),
            None => UNCLUSTERED.to_string(),
        },
    }
}

fn rationale(primary_topic: &str, b: &ScoreBreakdown, cfg: &ScoringConfig) -> Vec<RationalePart> {
    let mut parts = Vec::new();
    if let Some(topical) = b
        .dimensions
        .iter()
        .find(|d| d.dimension == Dimension::TopicalRelevance)
        .filter(|d| !d.matched.is_empty())
    {
        parts.push(RationalePart::Topic {
            topic: primary_topic.to_string(),
            terms: topical.matched.clone(),
        });
    }
    if !b.positive_hits.is_empty() {
        parts.push(RationalePart::Positive {
            terms: b.positive_hits.clone(),
        });
    }
    let strongest = b
        .dimensions
        .iter()
        .filter(|d| d.dimension != Dimension::TopicalRelevance && !d.matched.is_empty())
        .max_by(|a, c| a.signal.total_cmp(&c.signal));
    if let Some(d) = strongest {
        parts.push(RationalePart::Cues {
            dimension: d.dimension,
            terms: d.matched.clone(),
        });
    }
    if !b.negative_hits.is_empty() {
        parts.push(RationalePart::Suppressed {
            ceiling: cfg.negative_ceiling,
            terms: b.negative_hits.clone(),
        });
    }
    if !b.must_watch_hits.is_empty() {
        parts.push(RationalePart::MustWatch {
            floor: cfg.must_watch_floor,
            topics: b.must_watch_hits.clone(),
        });
    }
    if parts.is_empty() {
        parts.push(RationalePart::Baseline);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn cand(id: &str, title: &str, abs: &str) -> Candidate {
        Candidate {
            id: id.into(),
            title: title.into(),
            authors: vec!["A. Author".into()],
            r#abstract: abs.into(),
            categories: vec!["astro-ph.GA".into()],
            published_at: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
            link: format!("https://arxiv.org/abs/{id}"),
        }
    }

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(round_fit(10.5), 11);
        assert_eq!(round_fit(10.49), 10);
        assert_eq!(round_fit(-3.0), 0);
        assert_eq!(round_fit(140.0), 100);
        assert_eq!(round_fit(f64::NAN), 0);
    }

    #[test]
    fn zero_match_gets_baseline_not_zero() {
        let p = InterestProfile::default_template();
        let s = Scorer::default().score(&p, &cand("x", "Quarterly report", "Nothing relevant here."));
        assert_eq!(s.fit_score, 10);
        assert_eq!(s.primary_topic, "category:astro-ph.GA");
        assert_eq!(s.rationale, vec![RationalePart::Baseline]);
    }

    #[test]
    fn topic_match_beats_baseline_and_sets_primary_topic() {
        let p = InterestProfile::default_template();
        let s = Scorer::default().score(
            &p,
            &cand(
                "c1",
                "Dark matter halos and large-scale structure",
                "We run simulations of dark energy cosmology.",
            ),
        );
        assert_eq!(s.primary_topic, "cosmology");
        assert!(s.fit_score > 40, "got {}", s.fit_score);
        assert!(matches!(
            &s.rationale[0],
            RationalePart::Topic { topic, .. } if topic == "cosmology"
        ));
    }

    #[test]
    fn negative_clamps_and_must_watch_floors() {
        let mut p = InterestProfile::default_template();
        p.negative_keywords.insert("dark matter".into());
        let scorer = Scorer::default();
        let c = cand(
            "c2",
            "Dark matter halos and large-scale structure",
            "Dark energy cosmology simulations.",
        );
        assert!(scorer.score(&p, &c).fit_score <= 20);

        p.must_watch_topics.insert("fast radio burst".into());
        let fr = cand("c3", "A fast radio burst", "Short abstract.");
        assert!(scorer.score(&p, &fr).fit_score >= 70);

        // both: the floor wins
        let both = cand("c4", "Dark matter and a fast radio burst", "Short abstract.");
        assert_eq!(scorer.score(&p, &both).fit_score, 70);
    }

    #[test]
    fn malformed_raw_entry_is_an_error() {
        let p = InterestProfile::default_template();
        let raw = RawCandidate {
            id: Some("z".into()),
            title: Some("Title".into()),
            ..Default::default()
        };
        let err = Scorer::default().try_score(&p, raw, 0).unwrap_err();
        assert!(matches!(err, crate::error::RadarError::MalformedCandidate { .. }));
    }
}
