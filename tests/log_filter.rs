use paper_radar::summarize::FixedSummarizer;
use paper_radar::{default_log_filter, CandidateBatch, InterestProfile, Pipeline};
use std::io;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

const ONE: &str = r#"[{"id": "2503.20001", "title": "Dark energy constraints",
  "abstract": "Dark energy cosmology.", "published_at": "2025-03-02T10:00:00Z",
  "categories": ["astro-ph.CO"]}]"#;

#[test]
fn default_filter_keeps_library_info_events() {
    let sink = Captured::default();
    let writer = sink.clone();
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::new(default_log_filter()))
        .with(fmt::layer().with_ansi(false).with_writer(move || writer.clone()));

    tracing::subscriber::with_default(subscriber, || {
        let batch = CandidateBatch::from_json_str(ONE).unwrap();
        Pipeline::default()
            .run(
                &InterestProfile::default_template(),
                &batch,
                &FixedSummarizer("fixed".into()),
            )
            .unwrap();
    });

    let out = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
    assert!(out.contains("candidate batch scored"), "{out}");
    assert!(out.contains("selection complete"), "{out}");
    assert!(out.contains("run complete"), "{out}");
}

#[test]
fn default_filter_names_every_target() {
    let filter = default_log_filter();
    for t in paper_radar::LOG_TARGETS {
        assert!(filter.contains(&format!("{t}=info")), "{filter}");
    }
    assert!(filter.ends_with(",warn"));
}
