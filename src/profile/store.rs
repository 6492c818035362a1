// src/profile/store.rs
//! Persisted Interest Profile.
//!
//! One JSON file holds the current profile. Replacement writes a temp file next to it and
//! renames over the old one, so a reader never sees a half-written profile. When no stored
//! profile exists, the template file is used; when neither loads, the run cannot proceed.

use super::InterestProfile;
use crate::error::{RadarError, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_PROFILE_PATH: &str = "data/interest_profile.json";
pub const DEFAULT_TEMPLATE_PATH: &str = "config/profile_template.json";

/// Where the active profile came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileOrigin {
    /// Freshly built from a reference corpus of this many records.
    Built { records: usize },
    Stored(PathBuf),
    Template(PathBuf),
}

/// Paths of the stored profile and of the fallback template.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    profile_path: PathBuf,
    template_path: PathBuf,
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::new(DEFAULT_PROFILE_PATH, DEFAULT_TEMPLATE_PATH)
    }
}

/// Parse and sanity-check a profile file. Weights not summing to 100 are rescaled.
pub fn load_profile_file(path: &Path) -> Result<InterestProfile> {
    let bytes = fs::read(path).map_err(|e| RadarError::io(path, e))?;
    let mut profile: InterestProfile = serde_json::from_slice(&bytes)
        .map_err(|e| RadarError::json(path.display().to_string(), e))?;
    if !profile.scoring_weights.is_valid() {
        warn!(
            target: "profile",
            path = %path.display(),
            total = profile.scoring_weights.total(),
            "scoring weights do not sum to 100; rescaling"
        );
        profile.scoring_weights = profile.scoring_weights.normalized();
    }
    for term in profile.keyword_conflicts() {
        warn!(target: "profile", %term, "keyword is both positive and negative");
    }
    Ok(profile)
}

/// Write `profile` to `path` via temp file + rename.
pub fn save_profile_atomic(path: &Path, profile: &InterestProfile) -> Result<()> {
    let write = || -> io::Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(profile)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp = path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)?;
        f.write_all(json.as_bytes())?;
        f.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    };
    write().map_err(|e| RadarError::io(path, e))
}

impl ProfileStore {
    pub fn new(profile_path: impl Into<PathBuf>, template_path: impl Into<PathBuf>) -> Self {
        Self {
            profile_path: profile_path.into(),
            template_path: template_path.into(),
        }
    }

    pub fn profile_path(&self) -> &Path {
        &self.profile_path
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    /// The stored profile, if one exists and parses.
    pub fn load_stored(&self) -> Result<InterestProfile> {
        load_profile_file(&self.profile_path)
    }

    /// Revision of the stored profile, if any (used to number the next build).
    pub fn stored_revision(&self) -> Option<u64> {
        self.load_stored().ok().map(|p| p.revision)
    }

    /// Replace the stored profile wholesale.
    pub fn replace(&self, profile: &InterestProfile) -> Result<()> {
        save_profile_atomic(&self.profile_path, profile)?;
        info!(
            target: "profile",
            path = %self.profile_path.display(),
            revision = profile.revision,
            "interest profile replaced"
        );
        Ok(())
    }

    /// Stored profile → template file → `ProfileUnavailable`.
    pub fn resolve(&self) -> Result<(InterestProfile, ProfileOrigin)> {
        let stored_err = match self.load_stored() {
            Ok(p) => return Ok((p, ProfileOrigin::Stored(self.profile_path.clone()))),
            Err(e) => e,
        };
        match load_profile_file(&self.template_path) {
            Ok(p) => {
                warn!(
                    target: "profile",
                    reason = %stored_err,
                    template = %self.template_path.display(),
                    "no stored interest profile; using template"
                );
                Ok((p, ProfileOrigin::Template(self.template_path.clone())))
            }
            Err(template_err) => Err(RadarError::ProfileUnavailable {
                reason: format!("stored profile: {stored_err}; template: {template_err}"),
            }),
        }
    }
}
