// src/metrics.rs
//! Metric names and one-time descriptions.
//!
//! The crate only emits through the `metrics` facade; installing a recorder
//! (and exporting) is left to the embedding process.

use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

pub const CANDIDATES_SCANNED: &str = "radar_candidates_scanned_total";
pub const CANDIDATES_MALFORMED: &str = "radar_candidates_malformed_total";
pub const SELECTED: &str = "radar_selected_total";
pub const SCORE_MS: &str = "radar_score_ms";

/// Register descriptions once per process.
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(CANDIDATES_SCANNED, "Candidate entries scanned per run.");
        describe_counter!(
            CANDIDATES_MALFORMED,
            "Candidate entries excluded for missing fields."
        );
        describe_counter!(SELECTED, "Candidates placed in the top-K.");
        describe_histogram!(SCORE_MS, "Batch scoring time in milliseconds.");
    });
}
