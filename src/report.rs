// src/report.rs
//! Report Assembler: one Selection Result → one terminal-facing report in one language.
//!
//! Every top-K field is rendered (title, authors, link, summary, reason, score), near misses
//! get a one-line reason, and the text always ends with [`SHARE_MARKER`] followed by the
//! compact shareable message. Reasons, exclusions and diagnostics arrive as structured data
//! and are worded here, so one report never mixes languages. Nothing here touches
//! persistent storage.

use crate::error::{RadarError, Result};
use crate::profile::Dimension;
use crate::scoring::{RationalePart, ScoredCandidate};
use crate::select::{Diagnostic, ExclusionReason, NearMiss, SelectionResult};
use serde::Serialize;
use std::fmt::Write as _;
use std::str::FromStr;

/// Fixed closing section header delimiting the shareable message.
pub const SHARE_MARKER: &str = "==== SHAREABLE DIGEST ====";

const MAX_LISTED_AUTHORS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "zh" | "cn" | "chinese" => Ok(Self::Zh),
            other => Err(format!("unsupported language `{other}` (expected en|zh)")),
        }
    }
}

/// Summarizer output for one selected candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryLine {
    pub id: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub rank: usize,
    pub id: String,
    pub title: String,
    pub authors: String,
    pub link: String,
    pub summary: String,
    pub reason: String,
    pub score: u8,
    pub primary_topic: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub language: Language,
    pub scanned_count: usize,
    pub requested_k: usize,
    pub average_top_k_score: f64,
    pub shortfall: usize,
    pub entries: Vec<ReportEntry>,
    pub near_misses: Vec<NearMiss>,
    pub diagnostics: Vec<Diagnostic>,
}

/// First three authors, then "et al." when more remain.
pub fn format_authors(authors: &[String]) -> String {
    if authors.len() > MAX_LISTED_AUTHORS {
        format!("{} et al.", authors[..MAX_LISTED_AUTHORS].join(", "))
    } else {
        authors.join(", ")
    }
}

struct Labels {
    title: &'static str,
    scanned: &'static str,
    selected: &'static str,
    average: &'static str,
    top: &'static str,
    authors: &'static str,
    unknown_authors: &'static str,
    link: &'static str,
    score: &'static str,
    summary: &'static str,
    reason: &'static str,
    near: &'static str,
    none: &'static str,
    diagnostics: &'static str,
    share_head: &'static str,
}

fn labels(lang: Language) -> Labels {
    match lang {
        Language::En => Labels {
            title: "# Paper Radar Digest",
            scanned: "Scanned",
            selected: "Selected",
            average: "Average fit",
            top: "## Top picks",
            authors: "Authors",
            unknown_authors: "(unknown)",
            link: "Link",
            score: "Score",
            summary: "Summary",
            reason: "Why",
            near: "## Near misses",
            none: "(none)",
            diagnostics: "## Diagnostics",
            share_head: "Today's paper picks",
        },
        Language::Zh => Labels {
            title: "# 论文雷达日报",
            scanned: "扫描",
            selected: "入选",
            average: "平均匹配分",
            top: "## 今日精选",
            authors: "作者",
            unknown_authors: "（未知）",
            link: "链接",
            score: "得分",
            summary: "摘要",
            reason: "推荐理由",
            near: "## 遗憾落选",
            none: "（无）",
            diagnostics: "## 诊断",
            share_head: "今日论文精选",
        },
    }
}

fn shortfall_line(lang: Language, selected: usize, k: usize) -> String {
    match lang {
        Language::En => format!(
            "Note: only {selected} of {k} slots filled; not enough eligible candidates."
        ),
        Language::Zh => format!("注意：仅选出 {selected}/{k} 篇，合格候选不足。"),
    }
}

fn field_label(lang: Language, field: &str) -> String {
    match (lang, field) {
        (Language::En, f) => f.to_string(),
        (Language::Zh, "id") => "编号".to_string(),
        (Language::Zh, "title") => "标题".to_string(),
        (Language::Zh, "abstract") => "摘要".to_string(),
        (Language::Zh, "published_at") => "发布时间".to_string(),
        (Language::Zh, f) => f.to_string(),
    }
}

fn dimension_label(lang: Language, d: Dimension) -> &'static str {
    match lang {
        Language::En => d.as_str(),
        Language::Zh => match d {
            Dimension::TopicalRelevance => "主题相关性",
            Dimension::MethodAlignment => "方法契合度",
            Dimension::DataPipelineFit => "数据管线契合度",
            Dimension::PotentialImpact => "潜在影响",
            Dimension::ExperimentalFeasibility => "实验可行性",
        },
    }
}

fn reason_text(lang: Language, r: &ExclusionReason) -> String {
    match lang {
        Language::En => r.to_string(),
        Language::Zh => match r {
            ExclusionReason::DuplicateTopic { topic } => format!("主题重复：`{topic}` 已有代表"),
            ExclusionReason::NearDuplicateTitle { of } => format!("标题与 {of} 几乎相同"),
            ExclusionReason::DuplicateId => "批次内编号重复".to_string(),
            ExclusionReason::BelowThreshold { min } => format!("低于阈值（最低 {min} 分）"),
            ExclusionReason::OutsideTopK { cutoff } => format!("分数不足（入选线 {cutoff}）"),
            ExclusionReason::Malformed { missing } => {
                format!("条目不完整：缺少{}", field_label(lang, missing))
            }
        },
    }
}

fn rationale_text(lang: Language, part: &RationalePart) -> String {
    match lang {
        Language::En => part.to_string(),
        Language::Zh => match part {
            RationalePart::Topic { topic, terms } => {
                format!("契合主题「{topic}」（{}）", terms.join("、"))
            }
            RationalePart::Positive { terms } => format!("正向关键词：{}", terms.join("、")),
            RationalePart::Cues { dimension, terms } => format!(
                "{}线索：{}",
                dimension_label(lang, *dimension),
                terms.join("、")
            ),
            RationalePart::Suppressed { ceiling, terms } => {
                format!("因 {} 封顶 {ceiling} 分", terms.join("、"))
            }
            RationalePart::MustWatch { floor, topics } => {
                format!("必看主题 {}，保底 {floor} 分", topics.join("、"))
            }
            RationalePart::Baseline => "未命中画像关键词，按基线计分".to_string(),
        },
    }
}

/// Fit score plus rationale as one sentence.
fn reason_line(lang: Language, sc: &ScoredCandidate) -> String {
    let parts: Vec<String> = sc.rationale.iter().map(|p| rationale_text(lang, p)).collect();
    match lang {
        Language::En => format!("Fit {}/100: {}.", sc.fit_score, parts.join("; ")),
        Language::Zh => format!("匹配分 {}/100：{}。", sc.fit_score, parts.join("；")),
    }
}

fn diagnostic_text(lang: Language, d: &Diagnostic) -> String {
    match lang {
        Language::En => d.to_string(),
        Language::Zh => format!(
            "第 {} 条被排除：缺少{}",
            d.position,
            field_label(lang, &d.missing)
        ),
    }
}

impl Report {
    pub fn build(result: &SelectionResult, summaries: &[SummaryLine], language: Language) -> Self {
        let entries = result
            .top_k
            .iter()
            .enumerate()
            .map(|(i, sc)| {
                let line = summaries.iter().find(|s| s.id == sc.candidate.id);
                ReportEntry {
                    rank: i + 1,
                    id: sc.candidate.id.clone(),
                    title: sc.candidate.title.clone(),
                    authors: format_authors(&sc.candidate.authors),
                    link: sc.candidate.link.clone(),
                    summary: line.map(|l| l.summary.clone()).unwrap_or_default(),
                    reason: reason_line(language, sc),
                    score: sc.fit_score,
                    primary_topic: sc.primary_topic.clone(),
                }
            })
            .collect();
        Self {
            language,
            scanned_count: result.scanned_count,
            requested_k: result.requested_k,
            average_top_k_score: result.average_top_k_score,
            shortfall: result.shortfall(),
            entries,
            near_misses: result.near_misses.clone(),
            diagnostics: result.diagnostics.clone(),
        }
    }

    /// Compact message placed after [`SHARE_MARKER`].
    pub fn share_message(&self) -> String {
        let l = labels(self.language);
        let mut out = format!("{} ({}/{})", l.share_head, self.entries.len(), self.scanned_count);
        for e in &self.entries {
            let _ = write!(out, "\n{}. {} [{}] {}", e.rank, e.title, e.score, e.link);
        }
        out
    }

    pub fn render_text(&self) -> String {
        let l = labels(self.language);
        let mut out = String::new();
        let _ = writeln!(out, "{}", l.title);
        let _ = writeln!(
            out,
            "{}: {} | {}: {}/{} | {}: {:.1}",
            l.scanned,
            self.scanned_count,
            l.selected,
            self.entries.len(),
            self.requested_k,
            l.average,
            self.average_top_k_score
        );
        if self.shortfall > 0 {
            let _ = writeln!(
                out,
                "{}",
                shortfall_line(self.language, self.entries.len(), self.requested_k)
            );
        }

        let _ = writeln!(out, "\n{}", l.top);
        if self.entries.is_empty() {
            let _ = writeln!(out, "{}", l.none);
        }
        for e in &self.entries {
            let authors = if e.authors.is_empty() {
                l.unknown_authors
            } else {
                e.authors.as_str()
            };
            let _ = writeln!(out, "{}. {}", e.rank, e.title);
            let _ = writeln!(out, "   {}: {}", l.authors, authors);
            let _ = writeln!(out, "   {}: {}", l.link, e.link);
            let _ = writeln!(out, "   {}: {}/100", l.score, e.score);
            let _ = writeln!(out, "   {}: {}", l.summary, e.summary);
            let _ = writeln!(out, "   {}: {}", l.reason, e.reason);
        }

        let _ = writeln!(out, "\n{}", l.near);
        if self.near_misses.is_empty() {
            let _ = writeln!(out, "{}", l.none);
        }
        for n in &self.near_misses {
            let name = n.title.as_deref().unwrap_or(&n.id);
            let reason = reason_text(self.language, &n.reason);
            match n.fit_score {
                Some(s) => {
                    let _ = writeln!(out, "- {name} [{s}]: {reason}");
                }
                None => {
                    let _ = writeln!(out, "- {name}: {reason}");
                }
            }
        }

        if !self.diagnostics.is_empty() {
            let _ = writeln!(out, "\n{}", l.diagnostics);
            for d in &self.diagnostics {
                let _ = writeln!(out, "- {}: {}", d.id, diagnostic_text(self.language, d));
            }
        }

        let _ = writeln!(out, "\n{SHARE_MARKER}");
        out.push_str(&self.share_message());
        out.push('\n');
        out
    }
}

/// Render the Selection Result as a text report in `language`.
pub fn assemble(result: &SelectionResult, summaries: &[SummaryLine], language: Language) -> String {
    Report::build(result, summaries, language).render_text()
}

pub fn render_json(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(|e| RadarError::json("report", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authors_truncate_after_three() {
        let a: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        assert_eq!(format_authors(&a), "A, B, C et al.");
        assert_eq!(format_authors(&a[..3]), "A, B, C");
        assert_eq!(format_authors(&[]), "");
    }

    #[test]
    fn language_parsing() {
        assert_eq!("EN".parse::<Language>().unwrap(), Language::En);
        assert_eq!("zh".parse::<Language>().unwrap(), Language::Zh);
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn rationale_is_worded_per_language() {
        let parts = [
            RationalePart::Topic {
                topic: "cosmology".into(),
                terms: vec!["dark energy".into()],
            },
            RationalePart::Cues {
                dimension: Dimension::PotentialImpact,
                terms: vec!["constraints".into()],
            },
        ];
        let en: Vec<String> = parts.iter().map(|p| rationale_text(Language::En, p)).collect();
        assert_eq!(en[0], "matches topic `cosmology` (dark energy)");
        assert_eq!(en[1], "potential_impact cues: constraints");

        let zh: Vec<String> = parts.iter().map(|p| rationale_text(Language::Zh, p)).collect();
        assert_eq!(zh[0], "契合主题「cosmology」（dark energy）");
        assert_eq!(zh[1], "潜在影响线索：constraints");
    }

    #[test]
    fn diagnostics_are_worded_per_language() {
        let d = Diagnostic {
            id: "a2".into(),
            position: 1,
            missing: "abstract".into(),
        };
        assert_eq!(diagnostic_text(Language::En, &d), "excluded at position 1: missing abstract");
        assert_eq!(diagnostic_text(Language::Zh, &d), "第 1 条被排除：缺少摘要");
    }
}
