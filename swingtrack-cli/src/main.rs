//! Swingtrack CLI: seed a store, rebuild inflections, resolve targets, export.
//!
//! Commands:
//! - `init`: create the schema and add symbols to the watch list
//! - `rebuild`: recompute every tracked symbol's inflections
//! - `refresh`: resolve pending targets against newly stored bars
//! - `show`: print one symbol's inflections
//! - `export`: write inflections as CSV
//! - `report`: print a saved rebuild report

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking;
use tracing_subscriber::{prelude::*, EnvFilter};

use swingtrack_core::domain::Inflection;
use swingtrack_runner::export::{
    export_inflections_csv, generate_report, load_artifacts, save_artifacts,
};
use swingtrack_runner::{
    rebuild, resolve_pending, InflectionStore, RebuildOptions, RebuildReport, SqliteStore,
    SwingConfig, SymbolOutcome,
};

#[derive(Parser, Debug)]
#[command(
    name = "swingtrack",
    about = "Swingtrack CLI: price inflections and swing targets"
)]
struct Cli {
    /// TOML config file. Missing values use built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path. Overrides `[store] path`.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Also append logs to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the schema and track symbols.
    Init {
        /// Symbols to add to the watch list.
        #[arg(long, num_args = 1..)]
        track: Vec<String>,
    },
    /// Recompute inflections for every tracked symbol.
    Rebuild {
        /// Last day of the bar window (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<String>,

        /// Calendar days of bars to load before the as-of date.
        #[arg(long)]
        lookback_days: Option<i64>,

        /// Minimum swing between opposite inflections, in percent.
        #[arg(long)]
        min_change: Option<f64>,

        /// Bars on each side of the detection window's centre.
        #[arg(long)]
        half_window: Option<usize>,

        /// Analyze symbols one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Save report.json, report.md and inflections.csv under this directory.
        #[arg(long)]
        report_dir: Option<PathBuf>,
    },
    /// Resolve pending targets against the bars now stored.
    Refresh,
    /// Print one symbol's inflections.
    Show {
        symbol: String,

        /// Only rows whose target has not been reached.
        #[arg(long, default_value_t = false)]
        pending: bool,
    },
    /// Write inflections as CSV.
    Export {
        /// Limit to one symbol.
        #[arg(long)]
        symbol: Option<String>,

        /// Output file. Defaults to stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the report saved by `rebuild --report-dir`.
    Report {
        /// Artifact directory (`rebuild_<as-of>_<time>`).
        dir: PathBuf,

        /// Print the full Markdown report instead of the summary.
        #[arg(long, default_value_t = false)]
        markdown: bool,
    },
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stderr keeps stdout free for `export`.
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if let Some(path) = log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|err| anyhow!("failed to create log directory {parent:?}: {err}"))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| anyhow!("failed to open log file {path:?}: {err}"))?;
        let (writer, guard) = non_blocking(file);
        // The writer flushes on drop of the guard; keep it for the process lifetime.
        let _guard = Box::leak(Box::new(guard));
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer);
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .with(file_layer)
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing: {err}"))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing: {err}"))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;

    let config = match &cli.config {
        Some(path) => SwingConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SwingConfig::default(),
    };
    let db_path = cli.db.clone().unwrap_or_else(|| config.store.path.clone());

    match cli.command {
        Commands::Init { track } => run_init(&db_path, &track),
        Commands::Rebuild {
            as_of,
            lookback_days,
            min_change,
            half_window,
            sequential,
            report_dir,
        } => {
            let overrides = RebuildOverrides {
                as_of,
                lookback_days,
                min_change,
                half_window,
                sequential,
            };
            run_rebuild(&db_path, &config, overrides, report_dir.as_deref())
        }
        Commands::Refresh => run_refresh(&db_path),
        Commands::Show { symbol, pending } => run_show(&db_path, &symbol, pending),
        Commands::Export { symbol, out } => run_export(&db_path, symbol.as_deref(), out.as_deref()),
        Commands::Report { dir, markdown } => run_report(&dir, markdown),
    }
}

fn open_store(db_path: &Path) -> Result<SqliteStore> {
    SqliteStore::open(db_path).with_context(|| format!("failed to open {}", db_path.display()))
}

fn run_init(db_path: &Path, symbols: &[String]) -> Result<()> {
    let store = open_store(db_path)?;
    let mut added = 0;
    for symbol in symbols {
        let symbol = symbol.trim().to_uppercase();
        if store.track_symbol(&symbol)? {
            added += 1;
        }
    }
    println!(
        "Initialized {} ({added} new symbol(s) tracked)",
        db_path.display()
    );
    Ok(())
}

#[derive(Debug, Default)]
struct RebuildOverrides {
    as_of: Option<String>,
    lookback_days: Option<i64>,
    min_change: Option<f64>,
    half_window: Option<usize>,
    sequential: bool,
}

impl RebuildOverrides {
    /// Merge CLI flags over the config file and validate the result.
    fn apply(self, config: &SwingConfig) -> Result<SwingConfig> {
        let mut merged = config.clone();
        if let Some(days) = self.lookback_days {
            merged.batch.bar_lookback_days = days;
        }
        if let Some(pct) = self.min_change {
            merged.filter.min_change_percent = pct;
        }
        if let Some(w) = self.half_window {
            merged.detector.half_window = w;
        }
        if self.sequential {
            merged.batch.parallel = false;
        }
        merged.validate()?;
        Ok(merged)
    }

    fn as_of(&self) -> Result<Option<NaiveDate>> {
        self.as_of
            .as_deref()
            .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
            .transpose()
            .context("--as-of must be YYYY-MM-DD")
    }
}

fn run_rebuild(
    db_path: &Path,
    config: &SwingConfig,
    overrides: RebuildOverrides,
    report_dir: Option<&Path>,
) -> Result<()> {
    let as_of = overrides.as_of()?;
    let merged = overrides.apply(config)?;

    let now = Local::now().naive_local();
    let opts = RebuildOptions {
        as_of: as_of.unwrap_or_else(|| now.date()),
        bar_lookback_days: merged.batch.bar_lookback_days,
        parallel: merged.batch.parallel,
        updated_at: now,
    };

    let mut store = open_store(db_path)?;
    let report = rebuild(&mut store, &merged.to_pipeline_params(), &opts)?;
    print_summary(&report);

    if let Some(dir) = report_dir {
        let rows = store.all_inflections()?;
        let run_dir = save_artifacts(&report, &rows, dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }

    Ok(())
}

fn print_summary(report: &RebuildReport) {
    println!();
    println!("=== Rebuild: {} to {} ===", report.window_start, report.as_of);
    println!(
        "Symbols: {} written, {} skipped, {} failed",
        report.written_count(),
        report.skipped_count(),
        report.failed_count()
    );
    println!("Rows:    {} cleared, {} written", report.rows_cleared, report.rows_written);
    for (symbol, entry) in &report.symbols {
        match &entry.outcome {
            SymbolOutcome::Written { .. } => {}
            SymbolOutcome::Skipped { reason } => println!("  {symbol}: skipped ({reason:?})"),
            SymbolOutcome::Failed { stage, error } => {
                println!("  {symbol}: FAILED at {stage:?}: {error}")
            }
        }
    }
    if report.is_zero_progress() {
        println!("WARNING: no rows written");
    }
}

fn run_report(dir: &Path, markdown: bool) -> Result<()> {
    let report = load_artifacts(dir)?;
    if markdown {
        print!("{}", generate_report(&report));
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn run_refresh(db_path: &Path) -> Result<()> {
    let mut store = open_store(db_path)?;
    let report = resolve_pending(&mut store, Local::now().naive_local())?;
    println!(
        "Examined {}: {} resolved, {} still pending, {} target prices filled, {} failed",
        report.examined,
        report.resolved,
        report.still_pending,
        report.target_prices_filled,
        report.failed
    );
    Ok(())
}

fn fmt_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".into())
}

fn run_show(db_path: &Path, symbol: &str, pending_only: bool) -> Result<()> {
    let store = open_store(db_path)?;
    let rows: Vec<Inflection> = store
        .inflections_for(&symbol.to_uppercase())?
        .into_iter()
        .filter(|r| !pending_only || !r.is_resolved())
        .collect();

    if rows.is_empty() {
        println!("No inflections for {symbol}");
        return Ok(());
    }

    println!(
        "{:<10} {:<4} {:>10} {:>10} {:>8} {:>10} {:>5}",
        "date", "kind", "price", "close", "change", "target", "days"
    );
    for r in &rows {
        println!(
            "{:<10} {:<4} {:>10.4} {:>10.4} {:>8} {:>10} {:>5}",
            r.date,
            r.kind.as_str(),
            r.price,
            r.close,
            fmt_opt(r.target_change.map(|c| format!("{:.2}%", c * 100.0))),
            fmt_opt(r.target_price.map(|p| format!("{p:.4}"))),
            fmt_opt(r.days_to_target),
        );
    }
    Ok(())
}

fn run_export(db_path: &Path, symbol: Option<&str>, out: Option<&Path>) -> Result<()> {
    let store = open_store(db_path)?;
    let rows = match symbol {
        Some(s) => store.inflections_for(&s.to_uppercase())?,
        None => store.all_inflections()?,
    };
    let csv = export_inflections_csv(&rows)?;

    match out {
        Some(path) => {
            std::fs::write(path, csv)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(rows = rows.len(), path = %path.display(), "exported inflections");
        }
        None => print!("{csv}"),
    }
    Ok(())
}
