// src/profile/mod.rs
//! Interest Profile: the reusable scoring model derived from the reference library.
//!
//! - `builder`: derives a profile from a reference corpus (explicit refresh only)
//! - `store`:   JSON persistence with atomic replace and template fallback
//!
//! A profile is read-only once built. Replacing it means building a new value and
//! swapping the stored file; nothing mutates a profile in place during a run.

pub mod builder;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub use builder::{BuilderParams, ProfileBuilder};
pub use store::{ProfileOrigin, ProfileStore};

pub const PROFILE_SCHEMA_VERSION: u32 = 1;
/// Weights of all dimensions always add up to this.
pub const WEIGHT_TOTAL: u32 = 100;

/// Scoring dimensions. Each is scored independently in [0,1] and combined by weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    TopicalRelevance,
    MethodAlignment,
    DataPipelineFit,
    PotentialImpact,
    ExperimentalFeasibility,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::TopicalRelevance,
        Dimension::MethodAlignment,
        Dimension::DataPipelineFit,
        Dimension::PotentialImpact,
        Dimension::ExperimentalFeasibility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::TopicalRelevance => "topical_relevance",
            Dimension::MethodAlignment => "method_alignment",
            Dimension::DataPipelineFit => "data_pipeline_fit",
            Dimension::PotentialImpact => "potential_impact",
            Dimension::ExperimentalFeasibility => "experimental_feasibility",
        }
    }

    /// Default share of the 100-point budget.
    pub fn default_weight(&self) -> u32 {
        match self {
            Dimension::TopicalRelevance => 35,
            Dimension::MethodAlignment => 25,
            Dimension::DataPipelineFit => 15,
            Dimension::PotentialImpact => 15,
            Dimension::ExperimentalFeasibility => 10,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named dimension → integer weight; a valid set sums to exactly [`WEIGHT_TOTAL`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoringWeights(pub BTreeMap<Dimension, u32>);

impl Default for ScoringWeights {
    fn default() -> Self {
        Self(
            Dimension::ALL
                .iter()
                .map(|d| (*d, d.default_weight()))
                .collect(),
        )
    }
}

impl ScoringWeights {
    pub fn get(&self, d: Dimension) -> u32 {
        self.0.get(&d).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }

    pub fn is_valid(&self) -> bool {
        self.total() == WEIGHT_TOTAL
    }

    /// Rescale to sum to 100 with the largest-remainder method.
    /// An all-zero (or empty) map falls back to the default taxonomy.
    pub fn normalized(&self) -> Self {
        let total = self.total();
        if total == 0 {
            return Self::default();
        }
        if total == WEIGHT_TOTAL {
            return self.clone();
        }

        let mut floors: BTreeMap<Dimension, u32> = BTreeMap::new();
        let mut remainders: Vec<(u64, Dimension)> = Vec::new();
        for (d, w) in &self.0 {
            let scaled = u64::from(*w) * u64::from(WEIGHT_TOTAL);
            floors.insert(*d, (scaled / u64::from(total)) as u32);
            remainders.push((scaled % u64::from(total), *d));
        }
        // largest remainder first; ties broken by dimension order
        remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        let mut missing = WEIGHT_TOTAL - floors.values().sum::<u32>();
        for (_, d) in remainders {
            if missing == 0 {
                break;
            }
            if let Some(w) = floors.get_mut(&d) {
                *w += 1;
                missing -= 1;
            }
        }
        Self(floors)
    }
}

/// One topic bucket of the profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub label: String,
    /// Relative importance; weights of all topics sum to ~1.0.
    pub weight: f64,
    /// Terms that place a document in this topic (label first).
    pub keywords: Vec<String>,
    /// 2–4 representative reference titles (empty for template topics).
    #[serde(default)]
    pub evidence: Vec<String>,
}

/// Where the profile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileSource {
    Template,
    Corpus,
}

/// The derived, versioned scoring model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestProfile {
    pub schema_version: u32,
    /// Bumped on every explicit refresh.
    pub revision: u64,
    pub source: ProfileSource,
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
    /// SHA-256 over the sorted reference ids the profile was built from.
    #[serde(default)]
    pub corpus_fingerprint: Option<String>,
    #[serde(default)]
    pub corpus_size: usize,
    pub topics: Vec<Topic>,
    pub scoring_weights: ScoringWeights,
    #[serde(default)]
    pub positive_keywords: BTreeSet<String>,
    #[serde(default)]
    pub negative_keywords: BTreeSet<String>,
    #[serde(default)]
    pub must_watch_topics: BTreeSet<String>,
    /// Cue vocabularies for the non-topical dimensions.
    #[serde(default)]
    pub dimension_cues: BTreeMap<Dimension, Vec<String>>,
    #[serde(default)]
    pub narrative_sections: BTreeMap<String, String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Built-in cue vocabularies shared by the template and corpus-built profiles.
pub fn default_dimension_cues() -> BTreeMap<Dimension, Vec<String>> {
    let mut cues = BTreeMap::new();
    cues.insert(
        Dimension::MethodAlignment,
        strings(&[
            "simulation",
            "simulations",
            "bayesian",
            "machine learning",
            "neural network",
            "inference",
            "spectroscopy",
            "photometry",
            "emulator",
            "mcmc",
        ]),
    );
    cues.insert(
        Dimension::DataPipelineFit,
        strings(&[
            "survey",
            "catalog",
            "catalogue",
            "pipeline",
            "data release",
            "archival",
            "dataset",
            "calibration",
            "light curves",
            "sample",
        ]),
    );
    cues.insert(
        Dimension::PotentialImpact,
        strings(&[
            "first",
            "discovery",
            "novel",
            "unprecedented",
            "tension",
            "constraints",
            "breakthrough",
            "tightest",
            "detection",
        ]),
    );
    cues.insert(
        Dimension::ExperimentalFeasibility,
        strings(&[
            "publicly available",
            "open source",
            "code",
            "public data",
            "reproducible",
            "archival",
            "released",
            "software",
        ]),
    );
    cues
}

impl InterestProfile {
    /// Built-in template used when no corpus-derived profile exists.
    pub fn default_template() -> Self {
        let topic = |label: &str, weight: f64, kw: &[&str]| Topic {
            label: label.to_string(),
            weight,
            keywords: strings(kw),
            evidence: Vec::new(),
        };
        let topics = vec![
            topic(
                "galaxy evolution",
                0.24,
                &["galaxy evolution", "galaxies", "star formation", "high-redshift"],
            ),
            topic(
                "cosmology",
                0.22,
                &["cosmology", "dark energy", "dark matter", "large-scale structure"],
            ),
            topic(
                "exoplanets",
                0.20,
                &["exoplanet", "exoplanets", "planetary", "transit"],
            ),
            topic(
                "stellar astrophysics",
                0.18,
                &["stellar", "stars", "binary", "asteroseismology"],
            ),
            topic(
                "high-energy transients",
                0.16,
                &["transient", "supernova", "gamma-ray", "black hole"],
            ),
        ];
        let positive_keywords = topics
            .iter()
            .flat_map(|t| t.keywords.iter().cloned())
            .collect();

        let mut narrative_sections = BTreeMap::new();
        narrative_sections.insert(
            "summary".to_string(),
            "Generic template profile; build one from a reference library for personal ranking."
                .to_string(),
        );

        Self {
            schema_version: PROFILE_SCHEMA_VERSION,
            revision: 0,
            source: ProfileSource::Template,
            generated_at: None,
            corpus_fingerprint: None,
            corpus_size: 0,
            topics,
            scoring_weights: ScoringWeights::default(),
            positive_keywords,
            negative_keywords: BTreeSet::new(),
            must_watch_topics: BTreeSet::new(),
            dimension_cues: default_dimension_cues(),
            narrative_sections,
        }
    }

    /// Terms that sit in both the positive and the negative set (a data-quality defect).
    pub fn keyword_conflicts(&self) -> Vec<String> {
        self.positive_keywords
            .intersection(&self.negative_keywords)
            .cloned()
            .collect()
    }

    /// Highest topic weight (for relative topic scoring).
    pub fn max_topic_weight(&self) -> f64 {
        self.topics
            .iter()
            .map(|t| t.weight)
            .fold(0.0_f64, f64::max)
    }

    pub fn cues(&self, d: Dimension) -> &[String] {
        self.dimension_cues
            .get(&d)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Structural problems; an empty list means the profile is usable as is.
    pub fn validation_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !self.scoring_weights.is_valid() {
            issues.push(format!(
                "scoring weights sum to {} instead of {WEIGHT_TOTAL}",
                self.scoring_weights.total()
            ));
        }
        if self.source == ProfileSource::Corpus {
            if !(5..=10).contains(&self.topics.len()) {
                issues.push(format!("{} topics (expected 5-10)", self.topics.len()));
            }
            for t in &self.topics {
                if !(2..=4).contains(&t.evidence.len()) {
                    issues.push(format!(
                        "topic `{}` has {} evidence titles (expected 2-4)",
                        t.label,
                        t.evidence.len()
                    ));
                }
            }
        }
        for term in self.keyword_conflicts() {
            issues.push(format!("`{term}` is both a positive and a negative keyword"));
        }
        issues
    }
}
