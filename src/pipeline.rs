// src/pipeline.rs
//! One radar run: Interest Profile + Candidate Batch → Selection Result + summaries.
//!
//! The profile and the whole batch are materialized before scoring starts. Corpus-level
//! failures end the run with the failing stage attached; no partial result is returned.

use crate::candidate::CandidateBatch;
use crate::config::{RadarConfig, ScoringConfig, SelectionConfig};
use crate::error::{RadarError, Result};
use crate::profile::{InterestProfile, ProfileBuilder, ProfileOrigin, ProfileStore};
use crate::reference::ReferenceCorpus;
use crate::report::SummaryLine;
use crate::scoring::Scorer;
use crate::select::{SelectionResult, Selector};
use crate::summarize::Summarizer;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutput {
    pub profile_revision: u64,
    pub selection: SelectionResult,
    pub summaries: Vec<SummaryLine>,
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    scorer: Scorer,
    selector: Selector,
}

impl Pipeline {
    pub fn new(scoring: ScoringConfig, selection: SelectionConfig) -> Self {
        Self {
            scorer: Scorer::new(scoring),
            selector: Selector::new(selection),
        }
    }

    pub fn from_config(cfg: &RadarConfig) -> Self {
        Self::new(cfg.scoring.clone(), cfg.selection.clone())
    }

    pub fn run(
        &self,
        profile: &InterestProfile,
        batch: &CandidateBatch,
        summarizer: &dyn Summarizer,
    ) -> Result<RunOutput> {
        if batch.is_empty() {
            return Err(RadarError::EmptyBatch);
        }
        let scored = self.scorer.score_batch(profile, batch);
        let selection = self.selector.select(scored)?;

        let summaries: Vec<SummaryLine> = selection
            .top_k
            .iter()
            .map(|sc| SummaryLine {
                id: sc.candidate.id.clone(),
                summary: summarizer.summarize(&sc.candidate, profile),
            })
            .collect();

        info!(
            target: "pipeline",
            profile_revision = profile.revision,
            summarizer = summarizer.name(),
            scanned = selection.scanned_count,
            selected = selection.top_k.len(),
            "run complete"
        );
        Ok(RunOutput {
            profile_revision: profile.revision,
            selection,
            summaries,
        })
    }
}

/// Pick the profile for this run.
///
/// With a corpus (explicit refresh) a new profile is built and stored atomically. An
/// `InsufficientData` build falls back to the stored profile or the template; any other
/// failure is returned.
pub fn resolve_profile(
    corpus: Option<&ReferenceCorpus>,
    store: &ProfileStore,
    builder: &ProfileBuilder,
) -> Result<(InterestProfile, ProfileOrigin)> {
    if let Some(corpus) = corpus {
        match builder.build(corpus, store.stored_revision()) {
            Ok(profile) => {
                store.replace(&profile)?;
                return Ok((
                    profile,
                    ProfileOrigin::Built {
                        records: corpus.len(),
                    },
                ));
            }
            Err(e @ RadarError::InsufficientData { .. }) => {
                warn!(
                    target: "pipeline",
                    error = %e,
                    "profile refresh failed; falling back to previous profile or template"
                );
            }
            Err(e) => return Err(e),
        }
    }
    store.resolve()
}
