use chrono::{Duration, TimeZone, Utc};
use paper_radar::candidate::{Candidate, RawCandidate};
use paper_radar::config::ScoringConfig;
use paper_radar::{CandidateBatch, InterestProfile, Scorer};

fn cand(i: usize, title: &str, abs: &str, cat: &str) -> Candidate {
    Candidate {
        id: format!("2503.{i:05}"),
        title: title.into(),
        authors: vec!["A. One".into(), "B. Two".into()],
        r#abstract: abs.into(),
        categories: vec![cat.into()],
        published_at: Utc.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap() - Duration::minutes(i as i64),
        link: format!("https://arxiv.org/abs/2503.{i:05}"),
    }
}

fn mixed_batch(n: usize) -> CandidateBatch {
    let texts = [
        ("Dark matter halos in cosmology", "We constrain dark energy with a new survey.", "astro-ph.CO"),
        ("Transit spectroscopy of exoplanets", "Planetary atmospheres from transit data.", "astro-ph.EP"),
        ("Asteroseismology of binary stars", "Stellar oscillations observed by photometry.", "astro-ph.SR"),
        ("Instrument control software", "Firmware description for a detector.", "astro-ph.IM"),
        ("A supernova in a nearby galaxy", "The transient shows gamma-ray emission.", "astro-ph.HE"),
    ];
    let candidates = (0..n)
        .map(|i| {
            let (t, a, c) = texts[i % texts.len()];
            cand(i, &format!("{t} ({i})"), a, c)
        })
        .collect();
    CandidateBatch::from_candidates(candidates)
}

#[test]
fn every_candidate_is_scored_once_in_range() {
    let profile = InterestProfile::default_template();
    let batch = mixed_batch(57);
    let scored = Scorer::default().score_batch(&profile, &batch);
    assert_eq!(scored.scored.len(), 57);
    assert_eq!(scored.scanned_count(), 57);
    for (sc, c) in scored.scored.iter().zip(&batch.candidates) {
        assert_eq!(sc.candidate.id, c.id, "input order kept");
        assert!(sc.fit_score <= 100);
        assert!(!sc.rationale.is_empty());
    }
}

#[test]
fn malformed_entries_are_counted_not_scored() {
    let raw = vec![
        RawCandidate {
            id: Some("ok".into()),
            title: Some("Cosmology".into()),
            r#abstract: Some("Dark energy.".into()),
            published_at: Some("2025-03-01".into()),
            categories: Some(vec!["astro-ph.CO".into()]),
            ..Default::default()
        },
        RawCandidate {
            id: Some("no-abstract".into()),
            title: Some("Cosmology".into()),
            published_at: Some("2025-03-01".into()),
            ..Default::default()
        },
    ];
    let batch = CandidateBatch::from_raw(raw);
    let scored = Scorer::default().score_batch(&InterestProfile::default_template(), &batch);
    assert_eq!(scored.scanned_count(), 2);
    assert_eq!(scored.scored.len(), 1);
    assert_eq!(scored.malformed[0].id, "no-abstract");
    assert_eq!(scored.malformed[0].missing, "abstract");
}

#[test]
fn negative_keyword_clamps_every_match() {
    let mut profile = InterestProfile::default_template();
    profile.negative_keywords.insert("supernova".into());
    let cfg = ScoringConfig::default();
    let scored = Scorer::new(cfg.clone()).score_batch(&profile, &mixed_batch(40));
    let hits: Vec<_> = scored
        .scored
        .iter()
        .filter(|s| !s.breakdown.negative_hits.is_empty())
        .collect();
    assert_eq!(hits.len(), 8);
    assert!(hits.iter().all(|s| s.fit_score <= cfg.negative_ceiling));
}

#[test]
fn must_watch_floor_holds_without_other_matches() {
    let mut profile = InterestProfile::default_template();
    profile.must_watch_topics.insert("kilonova".into());
    let c = cand(1, "A kilonova candidate", "Short note.", "astro-ph.HE");
    let s = Scorer::default().score(&profile, &c);
    assert!(s.fit_score >= 70);
    assert_eq!(s.breakdown.must_watch_hits, vec!["kilonova".to_string()]);
}

#[test]
fn unmatched_candidate_keeps_dimension_score() {
    let profile = InterestProfile::default_template();
    let c = cand(2, "Instrument control", "Firmware description.", "physics.ins-det");
    let s = Scorer::default().score(&profile, &c);
    assert!(s.fit_score > 0);
    assert_eq!(s.primary_topic, "category:physics.ins-det");
}

#[test]
fn custom_baseline_changes_floor() {
    let profile = InterestProfile::default_template();
    let c = cand(3, "Instrument control", "Firmware description.", "physics.ins-det");
    let s = Scorer::new(ScoringConfig {
        dimension_baseline: 0.2,
        ..Default::default()
    })
    .score(&profile, &c);
    assert_eq!(s.fit_score, 20);
}
