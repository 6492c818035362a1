// src/error.rs
//! Error taxonomy for the radar pipeline.
//!
//! Library code returns [`RadarError`]; the binary wraps it with `anyhow` context.
//! Every variant knows the pipeline [`Stage`] it belongs to, so a failed run can say
//! which stage failed and why.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Profile,
    Scoring,
    Selection,
    Report,
    Io,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Profile => "profile",
            Stage::Scoring => "scoring",
            Stage::Selection => "selection",
            Stage::Report => "report",
            Stage::Io => "io",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RadarError {
    /// Reference corpus is empty or too small to derive a profile.
    #[error("insufficient reference data ({records} records): {reason}")]
    InsufficientData { records: usize, reason: String },

    /// A candidate is missing a required field. Recovered by exclusion.
    #[error("malformed candidate `{id}`: missing {missing}")]
    MalformedCandidate { id: String, missing: String },

    /// Nothing to rank this run.
    #[error("candidate batch is empty; no recommendation possible")]
    EmptyBatch,

    /// Neither a stored profile nor a template could be loaded.
    #[error("no interest profile available: {reason}")]
    ProfileUnavailable { reason: String },

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in {what}: {source}")]
    Json {
        what: String,
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RadarError>;

impl RadarError {
    pub fn malformed(id: impl Into<String>, missing: impl Into<String>) -> Self {
        Self::MalformedCandidate {
            id: id.into(),
            missing: missing.into(),
        }
    }

    pub fn insufficient(records: usize, reason: impl Into<String>) -> Self {
        Self::InsufficientData {
            records,
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(what: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            what: what.into(),
            source,
        }
    }

    /// Stage the error belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            Self::InsufficientData { .. } | Self::ProfileUnavailable { .. } => Stage::Profile,
            Self::MalformedCandidate { .. } => Stage::Scoring,
            Self::EmptyBatch => Stage::Selection,
            Self::Io { .. } | Self::Json { .. } => Stage::Io,
        }
    }

    /// True for errors that end the run without a selection result.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MalformedCandidate { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_and_fatality() {
        assert_eq!(RadarError::EmptyBatch.stage(), Stage::Selection);
        assert!(RadarError::EmptyBatch.is_fatal());

        let m = RadarError::malformed("2501.00001", "abstract");
        assert_eq!(m.stage(), Stage::Scoring);
        assert!(!m.is_fatal());
        assert_eq!(
            m.to_string(),
            "malformed candidate `2501.00001`: missing abstract"
        );

        let i = RadarError::insufficient(0, "empty corpus");
        assert_eq!(i.stage().to_string(), "profile");
    }
}
