use paper_radar::report::{render_json, Report};
use paper_radar::summarize::FixedSummarizer;
use paper_radar::{assemble, CandidateBatch, InterestProfile, Language, Pipeline, SHARE_MARKER};

const CANDIDATES: &str = r#"[
  {"id": "2503.10001", "title": "Dark energy constraints from a cosmology survey",
   "authors": ["Ada", "Ben", "Cy", "Dee", "Eve"],
   "abstract": "We present the tightest dark energy constraints. A public catalog is released.",
   "published_at": "2025-03-02T10:00:00Z", "categories": ["astro-ph.CO"],
   "link": "https://arxiv.org/abs/2503.10001"},
  {"id": "2503.10002", "title": "Dark matter and dark energy in cosmology revisited",
   "authors": ["Fay", "Gus"], "abstract": "Dark matter cosmology with simulations.",
   "published_at": "2025-03-02T08:00:00Z", "categories": ["astro-ph.CO"]},
  {"id": "2503.10003", "title": "Exoplanet transit timing",
   "authors": ["Hal", "Ivy", "Jo"], "abstract": "Transit photometry of an exoplanet.",
   "published_at": "2025-03-01T08:00:00Z", "categories": ["astro-ph.EP"]},
  {"id": "2503.10004", "title": "Broken", "published_at": "2025-03-01T08:00:00Z"}
]"#;

fn run(lang: Language) -> (String, Report) {
    let profile = InterestProfile::default_template();
    let batch = CandidateBatch::from_json_str(CANDIDATES).unwrap();
    let out = Pipeline::default()
        .run(&profile, &batch, &FixedSummarizer("Two sentence summary. It is fixed.".into()))
        .unwrap();
    (
        assemble(&out.selection, &out.summaries, lang),
        Report::build(&out.selection, &out.summaries, lang),
    )
}

#[test]
fn text_report_carries_every_field_and_the_marker() {
    let (text, report) = run(Language::En);
    assert_eq!(report.entries.len(), 2);
    for e in &report.entries {
        assert!(text.contains(&e.title));
        assert!(text.contains(&e.link));
        assert!(text.contains(&format!("{}/100", e.score)));
        assert!(text.contains(&e.reason));
    }
    assert!(text.contains("Ada, Ben, Cy et al."));
    assert!(text.contains("Two sentence summary. It is fixed."));
    assert!(text.contains("Scanned: 4"));
    assert!(text.contains("missing abstract"));
    assert!(text.contains("duplicate topic"));
    assert_eq!(text.matches(SHARE_MARKER).count(), 1);

    let tail = text.split(SHARE_MARKER).nth(1).unwrap();
    assert!(tail.contains("https://arxiv.org/abs/2503.10001"));
}

#[test]
fn chinese_report_keeps_the_same_marker() {
    let (text, _) = run(Language::Zh);
    assert!(text.contains("今日精选"));
    assert!(text.contains("主题重复"));
    assert!(text.contains(SHARE_MARKER));
    assert!(!text.contains("Top picks"));
}

// English wording of labels, reasons, exclusions and diagnostics
const ENGLISH_TEMPLATE: &[&str] = &[
    "Top picks",
    "Near misses",
    "Diagnostics",
    "Scanned",
    "Why",
    "Note:",
    "Fit ",
    "matches topic",
    "positive:",
    " cues:",
    "suppressed to",
    "must-watch floor",
    "baseline dimension score",
    "duplicate topic",
    "outscored",
    "malformed entry",
    "excluded at position",
    "missing ",
];

#[test]
fn chinese_report_has_no_english_template_text() {
    let (text, report) = run(Language::Zh);
    for phrase in ENGLISH_TEMPLATE {
        assert!(!text.contains(phrase), "found `{phrase}` in:\n{text}");
    }
    for e in &report.entries {
        assert!(e.reason.starts_with("匹配分"), "{}", e.reason);
        assert!(text.contains(&e.reason));
    }
    assert!(text.contains("条目不完整：缺少摘要"));
    assert!(text.contains("第 3 条被排除：缺少摘要"));
    assert_eq!(report.diagnostics.len(), 1);
}

#[test]
fn english_report_has_english_reasons() {
    let (text, report) = run(Language::En);
    for e in &report.entries {
        assert!(e.reason.starts_with(&format!("Fit {}/100: ", e.score)), "{}", e.reason);
    }
    assert!(text.contains("excluded at position 3: missing abstract"));
    assert!(!text.contains("匹配分"));
}

#[test]
fn json_report_round_trips_as_value() {
    let (_, report) = run(Language::En);
    let json = render_json(&report).unwrap();
    let v: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(v["language"], "en");
    assert_eq!(v["scanned_count"], 4);
    assert_eq!(v["entries"].as_array().unwrap().len(), 2);
    assert_eq!(v["near_misses"][0]["reason"]["kind"], "duplicate_topic");
}
