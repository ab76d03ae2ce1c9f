//! Export: inflection tables as CSV, batch reports as JSON and Markdown.
//!
//! Serialized reports carry a `schema_version`; newer versions than this
//! build understands are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use swingtrack_core::domain::Inflection;

use crate::rebuild::{RebuildReport, SymbolOutcome, SCHEMA_VERSION};

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_report_json(report: &RebuildReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize RebuildReport to JSON")
}

/// Deserialize a `RebuildReport`, rejecting unknown schema versions.
pub fn import_report_json(json: &str) -> Result<RebuildReport> {
    let report: RebuildReport =
        serde_json::from_str(json).context("failed to deserialize RebuildReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV ────────────────────────────────────────────────────────────

fn opt_cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Inflection rows as CSV; null columns are empty cells.
///
/// Columns: symbol, date, kind, price, close, target_change, target_price,
/// days_to_target, last_updated
pub fn export_inflections_csv(rows: &[Inflection]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "date",
        "kind",
        "price",
        "close",
        "target_change",
        "target_price",
        "days_to_target",
        "last_updated",
    ])?;

    for r in rows {
        wtr.write_record([
            r.symbol.as_str(),
            &r.date.to_string(),
            r.kind.as_str(),
            &format!("{:.4}", r.price),
            &format!("{:.4}", r.close),
            &opt_cell(r.target_change.map(|v| format!("{v:.4}"))),
            &opt_cell(r.target_price.map(|v| format!("{v:.4}"))),
            &opt_cell(r.days_to_target),
            &r.last_updated.format("%Y-%m-%d %H:%M:%S").to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Markdown ───────────────────────────────────────────────────────

/// Human-readable summary of a rebuild.
pub fn generate_report(report: &RebuildReport) -> String {
    let mut md = String::with_capacity(1024);

    md.push_str("# Rebuild Report\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!(
        "| Window | {} to {} |\n",
        report.window_start, report.as_of
    ));
    md.push_str(&format!("| Rows cleared | {} |\n", report.rows_cleared));
    md.push_str(&format!("| Rows written | {} |\n", report.rows_written));
    md.push_str(&format!(
        "| Symbols | {} written, {} skipped, {} failed |\n",
        report.written_count(),
        report.skipped_count(),
        report.failed_count()
    ));
    md.push_str(&format!("| Params hash | {} |\n", report.params_hash));
    md.push('\n');

    md.push_str("## Symbols\n\n");
    md.push_str("| Symbol | Outcome | Bars | Candidates | Retained | Resolved |\n");
    md.push_str("| --- | --- | ---: | ---: | ---: | ---: |\n");
    for (symbol, entry) in &report.symbols {
        let outcome = match &entry.outcome {
            SymbolOutcome::Written { rows } => format!("written ({rows})"),
            SymbolOutcome::Skipped { reason } => format!("skipped ({reason:?})"),
            SymbolOutcome::Failed { stage, error } => format!("failed at {stage:?}: {error}"),
        };
        let c = &entry.counts;
        md.push_str(&format!(
            "| {symbol} | {outcome} | {} | {} | {} | {} |\n",
            c.bars, c.candidates, c.retained, c.resolved
        ));
    }

    md
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `report.json`, `report.md` and `inflections.csv` into a new
/// `rebuild_{as_of}_{timestamp}/` directory under `output_dir`.
///
/// Returns the path to the created directory.
pub fn save_artifacts(
    report: &RebuildReport,
    rows: &[Inflection],
    output_dir: &Path,
) -> Result<PathBuf> {
    let dirname = format!(
        "rebuild_{}_{}",
        report.as_of.format("%Y%m%d"),
        chrono::Local::now().format("%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("report.json"), export_report_json(report)?)?;
    std::fs::write(run_dir.join("report.md"), generate_report(report))?;
    std::fs::write(run_dir.join("inflections.csv"), export_inflections_csv(rows)?)?;

    Ok(run_dir)
}

/// Load a `RebuildReport` from an artifact directory.
pub fn load_artifacts(dir: &Path) -> Result<RebuildReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_report_json(&json)
}
