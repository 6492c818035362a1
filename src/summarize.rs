// src/summarize.rs
//! Pluggable reasoning engine for the natural-language summary of a selected paper.
//!
//! - [`ExtractiveSummarizer`]: default, first sentences of the abstract.
//! - [`FixedSummarizer`]: returns the same text for every candidate (tests/local runs).
//! - [`CommandSummarizer`]: pipes a prompt to an external command and reads stdout;
//!   falls back to the extractive summary on any failure.
//! - [`CachingSummarizer`]: file cache keyed by SHA-256 of (candidate id, profile revision).

use crate::candidate::Candidate;
use crate::config::{SummarizerConfig, SummarizerKind};
use crate::profile::InterestProfile;
use crate::text::sentences;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Hard cap on summary length, in characters.
pub const MAX_SUMMARY_CHARS: usize = 600;

pub trait Summarizer: Send + Sync {
    fn summarize(&self, candidate: &Candidate, profile: &InterestProfile) -> String;
    fn name(&self) -> &'static str;
}

pub type DynSummarizer = Box<dyn Summarizer>;

/// Single line, no control characters, at most `max` chars. Collapses whitespace.
pub fn sanitize_line(input: &str, max: usize) -> String {
    let mut out = String::with_capacity(input.len().min(max));
    let mut prev_space = false;
    let mut n = 0;
    for ch in input.chars() {
        let c = if ch.is_whitespace() || ch.is_control() {
            ' '
        } else {
            ch
        };
        if c == ' ' {
            if !prev_space && !out.is_empty() {
                out.push(' ');
                n += 1;
            }
            prev_space = true;
        } else {
            out.push(c);
            n += 1;
            prev_space = false;
        }
        if n >= max {
            break;
        }
    }
    out.trim().to_string()
}

// ------------------------------------------------------------
// Extractive / fixed
// ------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ExtractiveSummarizer {
    max_sentences: usize,
}

impl Default for ExtractiveSummarizer {
    fn default() -> Self {
        Self::new(3)
    }
}

impl ExtractiveSummarizer {
    pub fn new(max_sentences: usize) -> Self {
        Self {
            max_sentences: max_sentences.clamp(1, 3),
        }
    }

    pub fn extract(&self, candidate: &Candidate) -> String {
        let picked = sentences(&candidate.r#abstract)
            .into_iter()
            .take(self.max_sentences)
            .collect::<Vec<_>>()
            .join(" ");
        sanitize_line(&picked, MAX_SUMMARY_CHARS)
    }
}

impl Summarizer for ExtractiveSummarizer {
    fn summarize(&self, candidate: &Candidate, _profile: &InterestProfile) -> String {
        self.extract(candidate)
    }
    fn name(&self) -> &'static str {
        "extractive"
    }
}

/// Test double.
#[derive(Debug, Clone)]
pub struct FixedSummarizer(pub String);

impl Summarizer for FixedSummarizer {
    fn summarize(&self, _candidate: &Candidate, _profile: &InterestProfile) -> String {
        self.0.clone()
    }
    fn name(&self) -> &'static str {
        "fixed"
    }
}

// ------------------------------------------------------------
// External command
// ------------------------------------------------------------

pub struct CommandSummarizer {
    program: String,
    args: Vec<String>,
    fallback: ExtractiveSummarizer,
}

impl CommandSummarizer {
    /// `argv[0]` is the program; None when `argv` is empty.
    pub fn new(argv: &[String], fallback: ExtractiveSummarizer) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            fallback,
        })
    }

    fn run(&self, prompt: &str) -> io::Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(prompt.as_bytes())?;
        }
        let out = child.wait_with_output()?;
        if !out.status.success() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("summarizer exited with {}", out.status),
            ));
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

/// Prompt handed to the external engine on stdin.
pub fn build_prompt(candidate: &Candidate, profile: &InterestProfile) -> String {
    let topics: Vec<&str> = profile.topics.iter().map(|t| t.label.as_str()).collect();
    format!(
        "Summarize this paper in 2-3 sentences for a researcher interested in: {}.\n\
         Title: {}\nAuthors: {}\nCategories: {}\nAbstract: {}\n",
        topics.join(", "),
        candidate.title,
        candidate.authors.join(", "),
        candidate.categories.join(", "),
        candidate.r#abstract
    )
}

impl Summarizer for CommandSummarizer {
    fn summarize(&self, candidate: &Candidate, profile: &InterestProfile) -> String {
        match self.run(&build_prompt(candidate, profile)) {
            Ok(text) => {
                let line = sanitize_line(&text, MAX_SUMMARY_CHARS);
                if line.is_empty() {
                    warn!(target: "pipeline", id = %candidate.id, "summarizer returned nothing; using extractive");
                    self.fallback.extract(candidate)
                } else {
                    line
                }
            }
            Err(e) => {
                warn!(
                    target: "pipeline",
                    id = %candidate.id,
                    program = %self.program,
                    error = %e,
                    "summarizer command failed; using extractive"
                );
                self.fallback.extract(candidate)
            }
        }
    }
    fn name(&self) -> &'static str {
        "command"
    }
}

// ------------------------------------------------------------
// Caching wrapper
// ------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct CachedSummary {
    id: String,
    revision: u64,
    summary: String,
}

pub struct CachingSummarizer<S: Summarizer> {
    inner: S,
    cache_dir: PathBuf,
}

impl<S: Summarizer> CachingSummarizer<S> {
    pub fn new(inner: S, cache_dir: PathBuf) -> Self {
        let _ = fs::create_dir_all(&cache_dir); // best-effort
        Self { inner, cache_dir }
    }
}

impl<S: Summarizer> Summarizer for CachingSummarizer<S> {
    fn summarize(&self, candidate: &Candidate, profile: &InterestProfile) -> String {
        let key = cache_key(&candidate.id, profile.revision);
        if let Some(hit) = read_cache_file(&self.cache_dir, &key) {
            debug!(target: "pipeline", id = %candidate.id, "summary cache hit");
            return hit.summary;
        }
        let summary = self.inner.summarize(candidate, profile);
        if !summary.is_empty() {
            let entry = CachedSummary {
                id: candidate.id.clone(),
                revision: profile.revision,
                summary: summary.clone(),
            };
            if let Err(e) = write_cache_file(&self.cache_dir, &key, &entry) {
                warn!(target: "pipeline", error = %e, "could not write summary cache");
            }
        }
        summary
    }
    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

fn cache_key(id: &str, revision: u64) -> String {
    let mut h = Sha256::new();
    h.update(id.as_bytes());
    h.update(b"\n");
    h.update(revision.to_le_bytes());
    format!("{:x}", h.finalize())
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

fn read_cache_file(dir: &Path, key: &str) -> Option<CachedSummary> {
    let mut file = fs::File::open(cache_path(dir, key)).ok()?;
    let mut buf = String::new();
    file.read_to_string(&mut buf).ok()?;
    serde_json::from_str(&buf).ok()
}

fn write_cache_file(dir: &Path, key: &str, value: &CachedSummary) -> io::Result<()> {
    let path = cache_path(dir, key);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut f = fs::File::create(&tmp)?;
    f.write_all(json.as_bytes())?;
    fs::rename(tmp, path)?;
    Ok(())
}

// ------------------------------------------------------------
// Factory
// ------------------------------------------------------------

pub fn build_summarizer(cfg: &SummarizerConfig) -> DynSummarizer {
    let extractive = ExtractiveSummarizer::new(cfg.max_sentences);
    match (cfg.kind, &cfg.cache_dir) {
        (SummarizerKind::Command, cache) => {
            let Some(cmd) = CommandSummarizer::new(&cfg.command, extractive.clone()) else {
                warn!(target: "pipeline", "summarizer kind is `command` but no command is set; using extractive");
                return Box::new(extractive);
            };
            match cache {
                Some(dir) => Box::new(CachingSummarizer::new(cmd, dir.clone())),
                None => Box::new(cmd),
            }
        }
        // extractive output is deterministic; nothing to cache
        (SummarizerKind::Extractive, _) => Box::new(extractive),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cand(abs: &str) -> Candidate {
        Candidate {
            id: "2503.00001".into(),
            title: "T".into(),
            authors: vec![],
            r#abstract: abs.into(),
            categories: vec![],
            published_at: Utc::now(),
            link: String::new(),
        }
    }

    #[test]
    fn sanitize_collapses_and_caps() {
        assert_eq!(sanitize_line("  a\n\tb  c ", 100), "a b c");
        assert_eq!(sanitize_line("星系演化 研究", 100), "星系演化 研究");
        assert_eq!(sanitize_line(&"x".repeat(50), 10).chars().count(), 10);
    }

    #[test]
    fn extractive_takes_leading_sentences() {
        let s = ExtractiveSummarizer::new(2).extract(&cand("One. Two! Three? Four."));
        assert_eq!(s, "One. Two!");
    }

    #[test]
    fn missing_command_falls_back_to_extractive() {
        let cfg = SummarizerConfig {
            kind: SummarizerKind::Command,
            ..Default::default()
        };
        assert_eq!(build_summarizer(&cfg).name(), "extractive");

        let cmd = CommandSummarizer::new(
            &["/nonexistent/radar-summarizer".to_string()],
            ExtractiveSummarizer::default(),
        )
        .unwrap();
        let p = InterestProfile::default_template();
        assert_eq!(cmd.summarize(&cand("Only sentence."), &p), "Only sentence.");
    }

    struct Counting(AtomicUsize);
    impl Summarizer for Counting {
        fn summarize(&self, _c: &Candidate, _p: &InterestProfile) -> String {
            self.0.fetch_add(1, Ordering::SeqCst);
            "cached text".into()
        }
        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[test]
    fn cache_is_keyed_by_id_and_revision() {
        let dir = tempfile::tempdir().unwrap();
        let s = CachingSummarizer::new(Counting(AtomicUsize::new(0)), dir.path().to_path_buf());
        let mut p = InterestProfile::default_template();
        let c = cand("x.");
        assert_eq!(s.summarize(&c, &p), "cached text");
        assert_eq!(s.summarize(&c, &p), "cached text");
        assert_eq!(s.inner.0.load(Ordering::SeqCst), 1);

        p.revision += 1;
        s.summarize(&c, &p);
        assert_eq!(s.inner.0.load(Ordering::SeqCst), 2);
    }
}
