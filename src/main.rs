//! Paper Radar: binary entrypoint.
//! Wires config, profile resolution, the scoring/selection pipeline and the report.
//!
//! Logs go to stderr; the report goes to stdout.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use paper_radar::config::RadarConfig;
use paper_radar::ingest::{self, arxiv::ArxivSource};
use paper_radar::profile::store::save_profile_atomic;
use paper_radar::profile::ProfileOrigin;
use paper_radar::report::{render_json, Report};
use paper_radar::summarize::build_summarizer;
use paper_radar::{
    candidate, reference, resolve_profile, CandidateBatch, InterestProfile, Language, Pipeline,
    ProfileBuilder, ProfileStore, RadarError, ReferenceCorpus,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "radar", version, about = "Rank new papers against your reference library")]
struct Cli {
    /// TOML config (defaults to $RADAR_CONFIG_PATH, then config/radar.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a candidate batch and print the digest
    Run(RunArgs),
    /// Build, show or export the interest profile
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Fetch the recent arXiv window into a snapshot file
    Fetch(FetchArgs),
    /// Print a markdown overview of a corpus or candidate file
    Snapshot(SnapshotArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Candidate batch JSON (array or fetch snapshot)
    #[arg(long)]
    candidates: PathBuf,
    /// Reference corpus JSON; when given, the profile is rebuilt first
    #[arg(long)]
    corpus: Option<PathBuf>,
    #[arg(long, default_value = "en")]
    lang: Language,
    #[arg(long, env = "RADAR_TOP_K")]
    top_k: Option<usize>,
    #[arg(long, env = "RADAR_NEAR_MISSES")]
    near_misses: Option<usize>,
    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    /// Rebuild the stored profile from a reference corpus
    Build {
        #[arg(long)]
        corpus: PathBuf,
    },
    /// Print the active profile (stored, else template)
    Show,
    /// Write the built-in template profile
    Template {
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct FetchArgs {
    #[arg(long)]
    output: PathBuf,
    /// Optional markdown summary next to the snapshot
    #[arg(long)]
    summary: Option<PathBuf>,
    #[arg(long)]
    days: Option<i64>,
}

#[derive(Args, Debug)]
struct SnapshotArgs {
    #[arg(long, conflicts_with = "candidates", required_unless_present = "candidates")]
    corpus: Option<PathBuf>,
    #[arg(long)]
    candidates: Option<PathBuf>,
}

/// Compact logs by default; JSON lines when RADAR_LOG_JSON=1.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(paper_radar::default_log_filter()));
    let json = std::env::var("RADAR_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

/// Attach the failing stage to a pipeline error.
fn staged(e: RadarError) -> anyhow::Error {
    let stage = e.stage();
    anyhow::Error::new(e).context(format!("{stage} stage failed"))
}

fn load_config(path: Option<&PathBuf>) -> Result<RadarConfig> {
    match path {
        Some(p) => {
            let mut cfg = RadarConfig::load_from(p)?;
            cfg.apply_env_overrides();
            Ok(cfg)
        }
        None => RadarConfig::load_default(),
    }
}

fn store_for(cfg: &RadarConfig) -> ProfileStore {
    ProfileStore::new(&cfg.profile.path, &cfg.profile.template_path)
}

fn cmd_run(mut cfg: RadarConfig, args: RunArgs) -> Result<()> {
    if let Some(k) = args.top_k {
        cfg.selection.top_k = k;
    }
    if let Some(m) = args.near_misses {
        cfg.selection.near_misses = m;
    }
    let store = store_for(&cfg);

    let corpus = args
        .corpus
        .as_deref()
        .map(ReferenceCorpus::load)
        .transpose()
        .map_err(staged)?;
    let (profile, origin) =
        resolve_profile(corpus.as_ref(), &store, &ProfileBuilder::default()).map_err(staged)?;
    tracing::info!(target: "pipeline", ?origin, revision = profile.revision, "profile ready");

    let batch = CandidateBatch::load(&args.candidates).map_err(staged)?;
    let summarizer = build_summarizer(&cfg.summarizer);
    let out = Pipeline::from_config(&cfg)
        .run(&profile, &batch, summarizer.as_ref())
        .map_err(staged)?;

    let report = Report::build(&out.selection, &out.summaries, args.lang);
    if args.json {
        println!("{}", render_json(&report).map_err(staged)?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

fn cmd_profile(cfg: &RadarConfig, cmd: ProfileCommand) -> Result<()> {
    let store = store_for(cfg);
    match cmd {
        ProfileCommand::Build { corpus } => {
            let corpus = ReferenceCorpus::load(&corpus).map_err(staged)?;
            let (profile, origin) = resolve_profile(Some(&corpus), &store, &ProfileBuilder::default())
                .map_err(staged)?;
            match origin {
                ProfileOrigin::Built { records } => println!(
                    "built profile revision {} from {records} records ({} topics) -> {}",
                    profile.revision,
                    profile.topics.len(),
                    store.profile_path().display()
                ),
                other => println!("corpus too small; kept {other:?}"),
            }
        }
        ProfileCommand::Show => {
            let (profile, origin) = store.resolve().map_err(staged)?;
            eprintln!("profile source: {origin:?}");
            println!(
                "{}",
                serde_json::to_string_pretty(&profile).context("serializing profile")?
            );
        }
        ProfileCommand::Template { out } => {
            let path = out.unwrap_or_else(|| store.template_path().to_path_buf());
            save_profile_atomic(&path, &InterestProfile::default_template()).map_err(staged)?;
            println!("wrote template profile to {}", path.display());
        }
    }
    Ok(())
}

async fn cmd_fetch(mut cfg: RadarConfig, args: FetchArgs) -> Result<()> {
    if let Some(d) = args.days {
        cfg.fetch.lookback_days = d;
    }
    let source = ArxivSource::http(cfg.fetch.clone())?;
    let snap = ingest::fetch_with(&source).await?;
    ingest::write_snapshot(&args.output, &snap).map_err(staged)?;
    if let Some(summary) = &args.summary {
        std::fs::write(summary, ingest::snapshot_markdown(&snap))
            .with_context(|| format!("writing {}", summary.display()))?;
    }
    println!(
        "wrote {} recent entries ({} without id or date) to {}",
        snap.total_recent_entries,
        snap.unwindowed_entries,
        args.output.display()
    );
    Ok(())
}

fn cmd_snapshot(args: SnapshotArgs) -> Result<()> {
    if let Some(p) = args.corpus {
        let corpus = ReferenceCorpus::load(&p).map_err(staged)?;
        println!("{}", reference::corpus_snapshot_markdown(&corpus));
    } else if let Some(p) = args.candidates {
        let batch = CandidateBatch::load(&p).map_err(staged)?;
        println!("{}", candidate::batch_snapshot_markdown(&batch));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env if present (RADAR_CONFIG_PATH, RADAR_TOP_K, RUST_LOG ...)
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let result = match load_config(cli.config.as_ref()) {
        Err(e) => Err(e),
        Ok(cfg) => match cli.command {
            Command::Run(args) => cmd_run(cfg, args),
            Command::Profile(cmd) => cmd_profile(&cfg, cmd),
            Command::Fetch(args) => cmd_fetch(cfg, args).await,
            Command::Snapshot(args) => cmd_snapshot(args),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("radar: {e:#}");
            ExitCode::FAILURE
        }
    }
}
