// src/config.rs
//! Runtime configuration from `config/radar.toml`.
//!
//! Resolution:
//! 1) `$RADAR_CONFIG_PATH` (must exist)
//! 2) `config/radar.toml`
//! 3) built-in defaults
//!
//! Numeric overrides `RADAR_TOP_K` / `RADAR_NEAR_MISSES` are applied last.
//!
//! Relative paths inside a config file (`[profile]`, `summarizer.cache_dir`) are resolved
//! against the directory holding that file. Built-in defaults stay relative to the working
//! directory.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::profile::store::{DEFAULT_PROFILE_PATH, DEFAULT_TEMPLATE_PATH};

pub const DEFAULT_CONFIG_PATH: &str = "config/radar.toml";
pub const ENV_CONFIG_PATH: &str = "RADAR_CONFIG_PATH";
pub const ENV_TOP_K: &str = "RADAR_TOP_K";
pub const ENV_NEAR_MISSES: &str = "RADAR_NEAR_MISSES";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    pub selection: SelectionConfig,
    pub scoring: ScoringConfig,
    pub profile: ProfilePaths,
    pub summarizer: SummarizerConfig,
    pub fetch: FetchConfig,
}

/// Selector knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub top_k: usize,
    pub near_misses: usize,
    pub max_per_topic: usize,
    /// Candidates scoring below this are not eligible for top-K.
    pub min_fit_score: u8,
    /// Normalized Levenshtein similarity at which two titles count as the same paper.
    pub title_similarity: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            near_misses: 3,
            max_per_topic: 1,
            min_fit_score: 0,
            title_similarity: 0.90,
        }
    }
}

/// Scorer knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub must_watch_floor: u8,
    pub negative_ceiling: u8,
    /// Points added per distinct positive keyword hit.
    pub positive_boost: u8,
    pub positive_boost_cap: u8,
    /// Minimum per-dimension score in [0,1] for a document matching nothing.
    pub dimension_baseline: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            must_watch_floor: 70,
            negative_ceiling: 20,
            positive_boost: 3,
            positive_boost_cap: 15,
            dimension_baseline: 0.10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProfilePaths {
    pub path: PathBuf,
    pub template_path: PathBuf,
}

impl Default for ProfilePaths {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_PROFILE_PATH),
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarizerKind {
    Extractive,
    Command,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub kind: SummarizerKind,
    /// argv of the external reasoning engine; the prompt goes to stdin.
    pub command: Vec<String>,
    /// Cache directory; no caching when unset.
    pub cache_dir: Option<PathBuf>,
    pub max_sentences: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            kind: SummarizerKind::Extractive,
            command: Vec::new(),
            cache_dir: None,
            max_sentences: 3,
        }
    }
}

/// arXiv fetch window (collaborator only).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub lookback_days: i64,
    pub batch_size: usize,
    pub max_scan: usize,
    pub categories: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            lookback_days: 2,
            batch_size: 200,
            max_scan: 2000,
            categories: [
                "astro-ph",
                "astro-ph.CO",
                "astro-ph.EP",
                "astro-ph.GA",
                "astro-ph.HE",
                "astro-ph.IM",
                "astro-ph.SR",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

// parse optional positive integer env
fn parse_count_env(raw: Option<String>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
}

impl RadarConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: RadarConfig = toml::from_str(s).context("parsing radar config")?;
        Ok(cfg.sanitized())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading radar config from {}", path.display()))?;
        let mut cfg = Self::from_toml_str(&content)?;
        if let Some(dir) = path.parent() {
            cfg.resolve_paths(dir);
        }
        Ok(cfg)
    }

    /// Anchor relative file paths at `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let anchor = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        anchor(&mut self.profile.path);
        anchor(&mut self.profile.template_path);
        if let Some(dir) = self.summarizer.cache_dir.as_mut() {
            anchor(dir);
        }
    }

    /// Env path → default path → defaults, then env overrides.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default.exists() {
                Self::load_from(&default)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(k) = parse_count_env(std::env::var(ENV_TOP_K).ok()) {
            self.selection.top_k = k;
        }
        if let Some(m) = parse_count_env(std::env::var(ENV_NEAR_MISSES).ok()) {
            self.selection.near_misses = m;
        }
    }

    /// Clamp values into usable ranges.
    fn sanitized(mut self) -> Self {
        let s = &mut self.scoring;
        s.must_watch_floor = s.must_watch_floor.min(100);
        s.negative_ceiling = s.negative_ceiling.min(100);
        if !s.dimension_baseline.is_finite() {
            s.dimension_baseline = ScoringConfig::default().dimension_baseline;
        }
        s.dimension_baseline = s.dimension_baseline.clamp(0.0, 1.0);

        let sel = &mut self.selection;
        sel.max_per_topic = sel.max_per_topic.max(1);
        sel.min_fit_score = sel.min_fit_score.min(100);
        if !sel.title_similarity.is_finite() {
            sel.title_similarity = SelectionConfig::default().title_similarity;
        }
        sel.title_similarity = sel.title_similarity.clamp(0.0, 1.0);
        self
    }
}
