use chrono::{Duration, TimeZone, Utc};
use paper_radar::candidate::Candidate;
use paper_radar::config::SelectionConfig;
use paper_radar::scoring::{ScoreBreakdown, ScoredBatch, ScoredCandidate};
use paper_radar::select::ExclusionReason;
use paper_radar::{CandidateBatch, InterestProfile, Scorer, Selector};
use std::collections::HashSet;

fn scored(id: &str, score: u8, topic: &str, published_day: i64) -> ScoredCandidate {
    ScoredCandidate {
        candidate: Candidate {
            id: id.into(),
            title: format!("Title {id}"),
            authors: vec![],
            r#abstract: "Abstract.".into(),
            categories: vec!["astro-ph.GA".into()],
            published_at: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
                + Duration::days(published_day),
            link: String::new(),
        },
        fit_score: score,
        rationale: vec![],
        primary_topic: topic.into(),
        breakdown: ScoreBreakdown {
            dimensions: vec![],
            weighted: score as f64,
            positive_hits: vec![],
            positive_boost: 0,
            negative_hits: vec![],
            must_watch_hits: vec![],
            raw: score as f64,
        },
    }
}

fn batch_of(items: Vec<ScoredCandidate>) -> ScoredBatch {
    ScoredBatch {
        scored: items,
        malformed: vec![],
    }
}

/// 120 candidates spread over the template topics and many categories.
fn daily_batch() -> CandidateBatch {
    let themes = [
        "dark matter cosmology",
        "exoplanet transit",
        "stellar binary",
        "galaxy evolution",
        "supernova transient",
        "solar wind",
        "interstellar dust",
        "radio instrumentation",
    ];
    let cats = [
        "astro-ph.CO",
        "astro-ph.EP",
        "astro-ph.SR",
        "astro-ph.GA",
        "astro-ph.HE",
        "physics.space-ph",
        "astro-ph.IM",
        "gr-qc",
    ];
    let base = Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap();
    let candidates = (0..120)
        .map(|i| Candidate {
            id: format!("2503.{i:05}"),
            title: format!("On {} number {i}", themes[i % themes.len()]),
            authors: vec!["X".into()],
            r#abstract: format!("We study {} with a survey sample.", themes[(i / 3) % themes.len()]),
            categories: vec![cats[i % cats.len()].into()],
            published_at: base - Duration::minutes(i as i64 * 17),
            link: format!("https://arxiv.org/abs/2503.{i:05}"),
        })
        .collect();
    CandidateBatch::from_candidates(candidates)
}

#[test]
fn daily_scenario_k5_m3() {
    let profile = InterestProfile::default_template();
    let scored = Scorer::default().score_batch(&profile, &daily_batch());
    let r = Selector::default().select(scored).unwrap();

    assert_eq!(r.scanned_count, 120);
    assert_eq!(r.top_k.len(), 5);
    assert_eq!(r.near_misses.len(), 3);
    assert_eq!(r.shortfall(), 0);
    assert!(r.top_k.windows(2).all(|w| w[0].fit_score >= w[1].fit_score));

    let topics: HashSet<&str> = r.top_k.iter().map(|c| c.primary_topic.as_str()).collect();
    assert_eq!(topics.len(), 5, "one representative per topic");

    let mean = r.top_k.iter().map(|c| c.fit_score as f64).sum::<f64>() / 5.0;
    assert_eq!(r.average_top_k_score, (mean * 10.0).round() / 10.0);
}

#[test]
fn selection_is_deterministic() {
    let profile = InterestProfile::default_template();
    let scorer = Scorer::default();
    let a = Selector::default()
        .select(scorer.score_batch(&profile, &daily_batch()))
        .unwrap();
    let b = Selector::default()
        .select(scorer.score_batch(&profile, &daily_batch()))
        .unwrap();
    assert_eq!(a, b);

    // input order does not matter
    let mut reversed = daily_batch();
    reversed.candidates.reverse();
    let c = Selector::default()
        .select(scorer.score_batch(&profile, &reversed))
        .unwrap();
    let ids = |r: &paper_radar::SelectionResult| {
        r.top_k.iter().map(|s| s.candidate.id.clone()).collect::<Vec<_>>()
    };
    assert_eq!(ids(&a), ids(&c));
}

#[test]
fn equal_scores_prefer_more_recent() {
    let r = Selector::new(SelectionConfig {
        max_per_topic: 2,
        ..Default::default()
    })
    .select(batch_of(vec![
        scored("older", 88, "t", 0),
        scored("newer", 88, "t", 1),
    ]))
    .unwrap();
    assert_eq!(r.top_k[0].candidate.id, "newer");
    assert_eq!(r.top_k[1].candidate.id, "older");
}

#[test]
fn equal_score_and_date_fall_back_to_id() {
    let r = Selector::new(SelectionConfig {
        max_per_topic: 5,
        ..Default::default()
    })
    .select(batch_of(vec![scored("b", 50, "t", 0), scored("a", 50, "t", 0)]))
    .unwrap();
    assert_eq!(r.top_k[0].candidate.id, "a");
}

#[test]
fn diversity_caps_each_topic() {
    let items: Vec<_> = (0..10)
        .map(|i| scored(&format!("c{i}"), 90 - i as u8, ["x", "y"][i % 2], 0))
        .collect();
    let r = Selector::default().select(batch_of(items)).unwrap();
    assert_eq!(r.top_k.len(), 2);
    assert_eq!(r.shortfall(), 3);
    assert_eq!(r.near_misses.len(), 3);
    assert!(r
        .near_misses
        .iter()
        .all(|n| matches!(n.reason, ExclusionReason::DuplicateTopic { .. })));
}

#[test]
fn near_misses_shrink_with_remaining_pool() {
    let r = Selector::default()
        .select(batch_of(vec![
            scored("a", 80, "t1", 0),
            scored("b", 70, "t2", 0),
            scored("c", 60, "t2", 0),
        ]))
        .unwrap();
    assert_eq!(r.top_k.len(), 2);
    assert_eq!(r.near_misses.len(), 1);
    assert_eq!(r.near_misses[0].id, "c");
}
