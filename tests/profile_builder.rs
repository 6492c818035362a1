use paper_radar::profile::{Dimension, ProfileSource, WEIGHT_TOTAL};
use paper_radar::reference::ReferenceRecord;
use paper_radar::{ProfileBuilder, RadarError, ReferenceCorpus};
use std::collections::BTreeSet;

fn rec(id: &str, title: &str, abs: &str, year: i32, tags: &[&str]) -> ReferenceRecord {
    ReferenceRecord {
        id: id.into(),
        title: title.into(),
        r#abstract: abs.into(),
        authors: vec!["Doe, J.".into()],
        venue: Some("ApJ".into()),
        year: Some(year),
        date: None,
        tags: tags.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
        item_type: Some("journalArticle".into()),
    }
}

/// Six disjoint interest groups of three papers each, plus one stale single-tag record.
fn library() -> ReferenceCorpus {
    let groups = [
        ("pulsar", "neutron"),
        ("exoplanet", "atmosphere"),
        ("quasar", "accretion"),
        ("reionization", "twenty-one"),
        ("asteroseismology", "oscillation"),
        ("lensing", "shear"),
    ];
    let mut records = Vec::new();
    for (g, (term, partner)) in groups.iter().enumerate() {
        for j in 0..3 {
            records.push(rec(
                &format!("r{g}{j}"),
                &format!("{term} {partner} results {}", j + 1),
                &format!("We examine {term} {partner} properties in detail."),
                2023 + (j as i32 % 2),
                &[],
            ));
        }
    }
    records.push(rec(
        "stale",
        "Coronal loops revisited",
        "Coronal loop heating.",
        2012,
        &["heliophysics"],
    ));
    ReferenceCorpus::new(records)
}

#[test]
fn builds_profile_satisfying_invariants() {
    let corpus = library();
    let profile = ProfileBuilder::default().build(&corpus, Some(4)).expect("build ok");

    assert_eq!(profile.source, ProfileSource::Corpus);
    assert_eq!(profile.revision, 5);
    assert_eq!(profile.corpus_size, corpus.len());
    assert!((5..=10).contains(&profile.topics.len()), "{} topics", profile.topics.len());
    for t in &profile.topics {
        assert!((2..=4).contains(&t.evidence.len()), "topic {} evidence", t.label);
    }
    assert_eq!(profile.scoring_weights.total(), WEIGHT_TOTAL);
    assert_eq!(profile.scoring_weights.get(Dimension::TopicalRelevance), 35);
    assert!(profile.validation_issues().is_empty(), "{:?}", profile.validation_issues());
    assert!(profile.keyword_conflicts().is_empty());
}

#[test]
fn keyword_sets_reflect_the_library() {
    let profile = ProfileBuilder::default().build(&library(), None).unwrap();
    assert_eq!(profile.revision, 1);
    assert!(profile.negative_keywords.contains("heliophysics"));
    assert!(profile.positive_keywords.contains("pulsar"));
    assert!(!profile.must_watch_topics.is_empty());
    assert!(profile.must_watch_topics.len() <= 3);
    let labels: Vec<&str> = profile.topics.iter().map(|t| t.label.as_str()).collect();
    for mw in &profile.must_watch_topics {
        assert!(labels.contains(&mw.as_str()));
    }
    // method cues pick up corpus vocabulary
    assert!(profile
        .cues(Dimension::MethodAlignment)
        .iter()
        .any(|c| c == "lensing"));
}

#[test]
fn too_few_topics_is_insufficient_data() {
    let corpus = ReferenceCorpus::new(vec![
        rec("a", "Pulsar one", "Pulsar.", 2024, &[]),
        rec("b", "Pulsar two", "Pulsar.", 2024, &[]),
    ]);
    let err = ProfileBuilder::default().build(&corpus, None).unwrap_err();
    assert!(matches!(err, RadarError::InsufficientData { records: 2, .. }));
}

#[test]
fn build_is_deterministic() {
    let a = ProfileBuilder::default().build(&library(), None).unwrap();
    let b = ProfileBuilder::default().build(&library(), None).unwrap();
    assert_eq!(a.topics, b.topics);
    assert_eq!(a.positive_keywords, b.positive_keywords);
    assert_eq!(a.corpus_fingerprint, b.corpus_fingerprint);
}
