//! Result export — JSON, CSV and plain-text summaries.
//!
//! - **JSON**: walk-forward reports, train/test search outcomes, single backtests
//! - **CSV**: one row per walk-forward window for spreadsheet analysis
//! - **Text**: stability summary printed by the CLI

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::metrics::Metrics;
use crate::walk_forward::{WalkForwardReport, WindowResult};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ─── JSON export ────────────────────────────────────────────────────

/// Pretty JSON for any result type.
pub fn export_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize result to JSON")
}

pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = export_json(value)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

// ─── CSV export ─────────────────────────────────────────────────────

/// One row per window: bounds, scores, headline test metrics, best params.
pub fn export_windows_csv(windows: &[WindowResult]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "window",
        "train_start",
        "train_end",
        "test_start",
        "test_end",
        "train_score",
        "test_score",
        "profit_after_fee",
        "profit_per_day",
        "sharpe_ratio",
        "max_drawdown",
        "hit_rate",
        "fee_charges",
        "failed_trials",
        "best_params",
    ])?;

    for w in windows {
        let m = &w.test_metrics;
        wtr.write_record([
            &w.index.to_string(),
            &w.window.train_start.format(TIMESTAMP_FORMAT).to_string(),
            &w.window.train_end.format(TIMESTAMP_FORMAT).to_string(),
            &w.window.test_start.format(TIMESTAMP_FORMAT).to_string(),
            &w.window.test_end.format(TIMESTAMP_FORMAT).to_string(),
            &format!("{:.6}", w.train_score),
            &format!("{:.6}", w.test_score),
            &format!("{:.2}", m.profit_after_fee),
            &format!("{:.4}", m.profit_per_day),
            &format!("{:.4}", m.sharpe_ratio),
            &format!("{:.2}", m.max_drawdown.value),
            &format!("{:.4}", m.hit_rate),
            &m.fee_charges.to_string(),
            &w.failed_trials.to_string(),
            &w.best_params.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `walk_forward.json` and `windows.csv` under `output_dir`.
///
/// Returns the written paths.
pub fn save_walk_forward(report: &WalkForwardReport, output_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let json_path = output_dir.join("walk_forward.json");
    write_json(report, &json_path)?;

    let csv_path = output_dir.join("windows.csv");
    let csv = export_windows_csv(&report.windows)?;
    std::fs::write(&csv_path, csv)
        .with_context(|| format!("failed to write {}", csv_path.display()))?;

    Ok(vec![json_path, csv_path])
}

// ─── Text summaries ─────────────────────────────────────────────────

pub fn metrics_summary(metrics: &Metrics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "profit after fee : {:.2}", metrics.profit_after_fee);
    let _ = writeln!(
        out,
        "fees             : {:.2} ({} changes)",
        metrics.total_fee, metrics.fee_charges
    );
    let _ = writeln!(out, "trading days     : {}", metrics.trading_days);
    let _ = writeln!(out, "profit per day   : {:.4}", metrics.profit_per_day);
    let _ = writeln!(out, "profit per year  : {:.2}", metrics.profit_per_year);
    let _ = writeln!(out, "sharpe ratio     : {:.4}", metrics.sharpe_ratio);
    let _ = writeln!(
        out,
        "max drawdown     : {:.2} (bars {}..{})",
        metrics.max_drawdown.value, metrics.max_drawdown.start, metrics.max_drawdown.end
    );
    let _ = writeln!(
        out,
        "hit rate         : {:.2}% of {} closed positions",
        metrics.hit_rate * 100.0,
        metrics.closed_positions
    );
    out
}

pub fn stability_summary(report: &WalkForwardReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "windows: {}", report.windows.len());
    let _ = writeln!(out, "\nparameter stability");
    let _ = writeln!(
        out,
        "  {:<24} {:>10} {:>10} {:>10} {:>10}",
        "name", "mean", "std", "min", "max"
    );
    for (name, s) in &report.parameter_stability {
        let _ = writeln!(
            out,
            "  {:<24} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
            name, s.mean, s.std, s.min, s.max
        );
    }
    let _ = writeln!(out, "\nperformance stability");
    let _ = writeln!(out, "  {:<24} {:>12} {:>12}", "metric", "mean", "std");
    for (name, s) in &report.performance_stability {
        let _ = writeln!(out, "  {:<24} {:>12.4} {:>12.4}", name, s.mean, s.std);
    }
    out
}
