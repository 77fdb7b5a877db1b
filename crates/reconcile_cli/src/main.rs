use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use reconcile_core::progress::ProgressHandler;
use reconcile_core::{ReconcileInput, ReconcileRunner, ReconcileSettings};
use reconcile_report::{write_route_tracks, ReconciliationReport, ReportSummaryContext};

#[derive(Debug, Parser)]
#[command(name = "route-reconcile")]
#[command(about = "Compare community-mapped transit routes with provider route patterns")]
struct Args {
    /// JSON input document with community and provider geometry per route
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Report path; the report goes to stdout when omitted
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    #[arg(short = 'p', long = "pretty")]
    pretty: bool,

    /// Overlap tolerance in meters for every route, replacing mode defaults
    #[arg(short = 't', long = "tolerance")]
    tolerance: Option<f64>,

    #[arg(long = "ok-threshold")]
    ok_threshold: Option<f64>,

    #[arg(long = "investigate-threshold")]
    investigate_threshold: Option<f64>,

    /// Maximum distance in meters from a stop to the nearest provider platform
    #[arg(long = "stop-tolerance")]
    stop_tolerance: Option<f64>,

    /// Worker threads; all cores when omitted
    #[arg(long = "threads")]
    threads: Option<usize>,

    /// Directory for one GPX track per assembled community direction
    #[arg(long = "gpx")]
    gpx: Option<PathBuf>,

    #[arg(long = "no-progress", alias = "no_progress")]
    no_progress: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let settings = build_settings(&args)?;
    if let Some(threads) = args.threads.filter(|count| *count > 0) {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("configure worker threads")?;
    }

    let data = fs::read_to_string(&args.input)
        .with_context(|| format!("read input {}", args.input.display()))?;
    let input: ReconcileInput = serde_json::from_str(&data)
        .with_context(|| format!("parse input {}", args.input.display()))?;
    info!(
        "{} routes loaded from {}",
        input.routes.len(),
        args.input.display()
    );

    let mut runner = ReconcileRunner::new(settings);
    let progress = if args.no_progress {
        None
    } else {
        let handler = Arc::new(IndicatifHandler::new());
        runner = runner.with_progress(handler.clone());
        Some(handler)
    };

    let started_at = Instant::now();
    let outcomes = runner.run(&input.routes);
    let elapsed = started_at.elapsed();
    if let Some(progress) = progress {
        progress.bar.finish_with_message("Reconciliation complete");
    }

    if let Some(dir) = args.gpx.as_ref() {
        fs::create_dir_all(dir).with_context(|| format!("create gpx dir {}", dir.display()))?;
        let mut written = 0;
        for outcome in &outcomes {
            written += write_route_tracks(dir, outcome)
                .with_context(|| format!("write gpx tracks for route {}", outcome.line_ref))?
                .len();
        }
        info!("{} GPX tracks written to {}", written, dir.display());
    }

    let context = ReportSummaryContext::new()
        .with_input(&args.input)
        .with_tool_version(env!("CARGO_PKG_VERSION"))
        .with_threads(rayon::current_num_threads())
        .with_elapsed_seconds(elapsed.as_secs_f64());
    let report = ReconciliationReport::from_outcomes(&outcomes, context);
    if report.summary.counts.errors > 0 {
        warn!("{} error notices reported", report.summary.counts.errors);
    }

    match args.output.as_ref() {
        Some(path) => {
            report.write_json_with_format(path, args.pretty)?;
            info!("report written to {}", path.display());
        }
        None => println!("{}", report.to_json_string(args.pretty)?),
    }
    Ok(())
}

fn build_settings(args: &Args) -> anyhow::Result<ReconcileSettings> {
    let mut settings = ReconcileSettings::default();
    if let Some(tolerance) = args.tolerance {
        if !tolerance.is_finite() || tolerance < 0.0 {
            bail!("--tolerance must be a non-negative number of meters");
        }
        settings.tolerance_override_m = Some(tolerance);
    }
    if let Some(threshold) = args.ok_threshold {
        settings.ok_threshold = parse_fraction("--ok-threshold", threshold)?;
    }
    if let Some(threshold) = args.investigate_threshold {
        settings.investigate_threshold = parse_fraction("--investigate-threshold", threshold)?;
    }
    if settings.investigate_threshold > settings.ok_threshold {
        bail!(
            "--investigate-threshold {} is above --ok-threshold {}",
            settings.investigate_threshold,
            settings.ok_threshold
        );
    }
    if let Some(distance) = args.stop_tolerance {
        if !distance.is_finite() || distance < 0.0 {
            bail!("--stop-tolerance must be a non-negative number of meters");
        }
        settings.stop_distance_tolerance_m = distance;
    }
    Ok(settings)
}

fn parse_fraction(flag: &str, value: f64) -> anyhow::Result<f64> {
    if !(0.0..=1.0).contains(&value) {
        bail!("{} must be between 0 and 1, got {}", flag, value);
    }
    Ok(value)
}

struct IndicatifHandler {
    bar: ProgressBar,
}

impl IndicatifHandler {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        bar.set_message("Waiting to reconcile...");
        Self { bar }
    }
}

impl ProgressHandler for IndicatifHandler {
    fn set_total_routes(&self, count: usize) {
        self.bar.set_length(count as u64);
        self.bar.set_message("Starting reconciliation...");
    }

    fn on_start_route(&self, line_ref: &str) {
        self.bar.set_message(format!("Route {}", line_ref));
    }

    fn on_finish_route(&self, _line_ref: &str) {
        self.bar.inc(1);
    }
}
