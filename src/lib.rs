// src/lib.rs
// Public library surface for the `radar` binary and integration tests.

pub mod candidate;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod profile;
pub mod reference;
pub mod report;
pub mod scoring;
pub mod select;
pub mod summarize;
pub mod text;

// Fetch collaborator (arXiv Atom API)
pub mod ingest;

// ---- Re-exports for stable public API ----
pub use crate::candidate::{Candidate, CandidateBatch};
pub use crate::error::{RadarError, Result, Stage};
pub use crate::pipeline::{resolve_profile, Pipeline, RunOutput};
pub use crate::profile::{InterestProfile, ProfileBuilder, ProfileStore};
pub use crate::reference::ReferenceCorpus;
pub use crate::report::{assemble, Language, SHARE_MARKER};
pub use crate::scoring::{ScoredCandidate, Scorer};
pub use crate::select::{SelectionResult, Selector};

/// Targets of the library's tracing events.
pub const LOG_TARGETS: [&str; 5] = ["profile", "scoring", "select", "pipeline", "ingest"];

/// Default `EnvFilter` directives: info for every radar target, warn for everything else.
pub fn default_log_filter() -> String {
    let mut directives: Vec<String> = LOG_TARGETS.iter().map(|t| format!("{t}=info")).collect();
    directives.push("warn".to_string());
    directives.join(",")
}
