use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::info;

use crate::bootstrap::{BootstrapConfig, resampling_rng, summarize_rows};
use crate::cli::SummarizeArgs;
use crate::model::ModeSummary;
use crate::report::{read_report, write_summary_table};

#[derive(Debug, Serialize)]
struct SummarizeResponse {
    report: String,
    rows: usize,
    bootstrap_iterations: usize,
    seed: Option<u64>,
    modes: Vec<ModeSummary>,
}

pub fn run(args: SummarizeArgs) -> Result<()> {
    let config = BootstrapConfig {
        iterations: args.bootstrap.bootstrap_iterations,
        low_percentile: args.bootstrap.ci_low,
        high_percentile: args.bootstrap.ci_high,
    };
    let (rows, summaries) = summarize_report(&args.report, &config, args.bootstrap.seed)?;

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        let response = SummarizeResponse {
            report: args.report.display().to_string(),
            rows,
            bootstrap_iterations: config.iterations,
            seed: args.bootstrap.seed,
            modes: summaries,
        };
        serde_json::to_writer_pretty(&mut output, &response)
            .context("failed to serialize summary json output")?;
        writeln!(output)?;
    } else {
        write_summary_table(&mut output, &summaries)?;
    }
    output.flush()?;
    Ok(())
}

/// Recomputes per-mode aggregates from a saved report. Returns the row count
/// alongside the summaries.
pub fn summarize_report(
    path: &Path,
    config: &BootstrapConfig,
    seed: Option<u64>,
) -> Result<(usize, Vec<ModeSummary>)> {
    config.validate()?;

    let rows = read_report(path)?;
    if rows.is_empty() {
        bail!("report has no rows: {}", path.display());
    }
    info!(path = %path.display(), rows = rows.len(), "loaded relevance report");

    let mut rng = resampling_rng(seed);
    Ok((rows.len(), summarize_rows(&rows, config, &mut rng)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContextMode, EvaluationRow};
    use crate::report::write_report;

    fn row(mode: ContextMode, plan_score: f64, recall: f64) -> EvaluationRow {
        EvaluationRow {
            question: "Q".to_string(),
            mode,
            recommendation_count: 2,
            plan_score,
            personal_score: 1.0,
            lift: 1.0 - plan_score,
            recall,
            latency_seconds: 2.0,
        }
    }

    #[test]
    fn saved_report_is_reaggregated_per_mode() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("relevance_scores.csv");
        let rows = vec![
            row(ContextMode::Question, 0.0, 0.0),
            row(ContextMode::Full, 0.5, 0.25),
            row(ContextMode::Full, 1.0, 0.75),
        ];
        write_report(&path, &rows).expect("write report");

        let config = BootstrapConfig {
            iterations: 200,
            ..BootstrapConfig::default()
        };
        let (count, summaries) =
            summarize_report(&path, &config, Some(7)).expect("summary should succeed");

        assert_eq!(count, 3);
        let modes = summaries.iter().map(|summary| summary.mode).collect::<Vec<ContextMode>>();
        assert_eq!(modes, vec![ContextMode::Full, ContextMode::Question]);

        let full = &summaries[0];
        assert_eq!(full.rows, 2);
        assert_eq!(full.plan.mean, 0.75);
        assert_eq!(full.recall.mean, 0.5);
        assert!(full.recall.ci.is_none());
        let ci = full.plan.ci.expect("plan interval");
        assert!(ci.low >= 0.5 && ci.high <= 1.0 && ci.low <= ci.high);
    }

    #[test]
    fn same_seed_reproduces_intervals() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("relevance_scores.csv");
        let rows = (0..12)
            .map(|index| row(ContextMode::NoPlan, f64::from(index % 4) / 4.0, 0.0))
            .collect::<Vec<EvaluationRow>>();
        write_report(&path, &rows).expect("write report");

        let config = BootstrapConfig {
            iterations: 300,
            ..BootstrapConfig::default()
        };
        let (_, first) = summarize_report(&path, &config, Some(11)).expect("first");
        let (_, second) = summarize_report(&path, &config, Some(11)).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn header_only_report_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.csv");
        write_report(&path, &[]).expect("write header");

        let error = summarize_report(&path, &BootstrapConfig::default(), Some(1))
            .expect_err("empty report should fail");
        assert!(format!("{error:#}").contains("no rows"));
    }
}
