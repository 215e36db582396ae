use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::model::{ContextMode, EvaluationRow, MetricStat, ModeSummary};
use crate::util::ensure_parent_directory;

pub const REPORT_HEADER: [&str; 8] = [
    "Question",
    "Mode",
    "#Rec",
    "PlanScore",
    "PersonalScore",
    "Lift",
    "Recall",
    "Latency",
];

pub fn format_latency(seconds: f64) -> String {
    format!("{seconds:.2}s")
}

fn row_record(row: &EvaluationRow) -> [String; 8] {
    [
        row.question.clone(),
        row.mode.as_str().to_string(),
        row.recommendation_count.to_string(),
        row.plan_score.to_string(),
        row.personal_score.to_string(),
        row.lift.to_string(),
        row.recall.to_string(),
        format_latency(row.latency_seconds),
    ]
}

pub fn write_report_to<W: Write>(writer: W, rows: &[EvaluationRow]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer
        .write_record(REPORT_HEADER)
        .context("failed to write report header")?;
    for row in rows {
        csv_writer
            .write_record(row_record(row))
            .context("failed to write report row")?;
    }
    csv_writer.flush().context("failed to flush report")?;
    Ok(())
}

pub fn write_report(path: &Path, rows: &[EvaluationRow]) -> Result<()> {
    ensure_parent_directory(path)?;
    let file = File::create(path)
        .with_context(|| format!("failed to create report: {}", path.display()))?;
    write_report_to(file, rows).with_context(|| format!("failed to write report: {}", path.display()))
}

pub fn read_report(path: &Path) -> Result<Vec<EvaluationRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("failed to open report: {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("failed to read report header: {}", path.display()))?;
    if headers.iter().collect::<Vec<&str>>() != REPORT_HEADER {
        bail!("unexpected report header in {}: {:?}", path.display(), headers);
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let line = index + 2;
        let record =
            record.with_context(|| format!("failed to read {} line {line}", path.display()))?;
        let row = parse_record(&record)
            .with_context(|| format!("invalid report row at {} line {line}", path.display()))?;
        rows.push(row);
    }
    Ok(rows)
}

fn parse_record(record: &csv::StringRecord) -> Result<EvaluationRow> {
    if record.len() != REPORT_HEADER.len() {
        bail!("expected {} fields, found {}", REPORT_HEADER.len(), record.len());
    }

    let mode_raw = &record[1];
    let Some(mode) = ContextMode::parse(mode_raw) else {
        bail!("unknown mode: {mode_raw:?}");
    };
    let latency_raw = record[7].trim();
    let latency_seconds = latency_raw
        .strip_suffix('s')
        .unwrap_or(latency_raw)
        .parse::<f64>()
        .with_context(|| format!("invalid latency: {latency_raw:?}"))?;

    Ok(EvaluationRow {
        question: record[0].to_string(),
        mode,
        recommendation_count: record[2]
            .trim()
            .parse::<usize>()
            .with_context(|| format!("invalid recommendation count: {:?}", &record[2]))?,
        plan_score: parse_score(&record[3], "PlanScore")?,
        personal_score: parse_score(&record[4], "PersonalScore")?,
        lift: parse_score(&record[5], "Lift")?,
        recall: parse_score(&record[6], "Recall")?,
        latency_seconds,
    })
}

fn parse_score(raw: &str, column: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .with_context(|| format!("invalid {column}: {raw:?}"))
}

fn format_interval(stat: &MetricStat, signed: bool) -> String {
    match (stat.ci, signed) {
        (Some(ci), false) => format!("CI[{:.3},{:.3}]", ci.low, ci.high),
        (Some(ci), true) => format!("CI[{:+.3},{:+.3}]", ci.low, ci.high),
        (None, _) => "CI[n/a]".to_string(),
    }
}

/// One console line per mode: means with intervals, recall as a mean only.
pub fn format_summary_line(summary: &ModeSummary) -> String {
    format!(
        "{:<9}  Plan {:.3} {}  Personal {:.3} {}  Lift {:+.3} {}  Recall {:.3}",
        summary.mode.as_str(),
        summary.plan.mean,
        format_interval(&summary.plan, false),
        summary.personal.mean,
        format_interval(&summary.personal, false),
        summary.lift.mean,
        format_interval(&summary.lift, true),
        summary.recall.mean,
    )
}

pub fn write_summary_table<W: Write>(output: &mut W, summaries: &[ModeSummary]) -> Result<()> {
    writeln!(output, "\n=== Aggregate metrics (90% CI) ===")?;
    for summary in summaries {
        writeln!(output, "{}", format_summary_line(summary))?;
    }
    output.flush()?;
    Ok(())
}

/// Appends `word_count,latency_seconds` per model call.
pub struct LatencyLog {
    writer: csv::Writer<File>,
}

impl LatencyLog {
    pub fn open(path: &Path) -> Result<Self> {
        ensure_parent_directory(path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open latency log: {}", path.display()))?;
        Ok(Self {
            writer: csv::Writer::from_writer(file),
        })
    }

    pub fn append(&mut self, reply: &str, latency_seconds: f64) -> Result<()> {
        let word_count = reply.split_whitespace().count();
        self.writer
            .write_record([word_count.to_string(), latency_seconds.to_string()])
            .context("failed to append latency log row")?;
        self.writer.flush().context("failed to flush latency log")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConfidenceInterval;

    fn sample_rows() -> Vec<EvaluationRow> {
        vec![
            EvaluationRow {
                question: "Which courses, if any, should I retake?".to_string(),
                mode: ContextMode::Full,
                recommendation_count: 4,
                plan_score: 0.5,
                personal_score: 0.75,
                lift: 0.25,
                recall: 0.2,
                latency_seconds: 3.456,
            },
            EvaluationRow {
                question: "What next?".to_string(),
                mode: ContextMode::NoPlan,
                recommendation_count: 0,
                plan_score: 0.0,
                personal_score: 0.0,
                lift: 0.0,
                recall: 0.0,
                latency_seconds: 0.5,
            },
        ]
    }

    #[test]
    fn report_has_fixed_header_and_unit_suffixed_latency() {
        let mut buffer = Vec::new();
        write_report_to(&mut buffer, &sample_rows()).expect("report should serialize");
        let text = String::from_utf8(buffer).expect("utf8");

        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Question,Mode,#Rec,PlanScore,PersonalScore,Lift,Recall,Latency")
        );
        assert_eq!(
            lines.next(),
            Some("\"Which courses, if any, should I retake?\",full,4,0.5,0.75,0.25,0.2,3.46s")
        );
        assert_eq!(lines.next(), Some("What next?,noPlan,0,0,0,0,0,0.50s"));
    }

    #[test]
    fn written_report_reads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out").join("relevance_scores.csv");
        write_report(&path, &sample_rows()).expect("report should write");

        let rows = read_report(&path).expect("report should read");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].question, "Which courses, if any, should I retake?");
        assert_eq!(rows[0].mode, ContextMode::Full);
        assert_eq!(rows[0].latency_seconds, 3.46);
        assert_eq!(rows[1], sample_rows()[1]);
    }

    #[test]
    fn read_report_rejects_unknown_modes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.csv");
        std::fs::write(
            &path,
            "Question,Mode,#Rec,PlanScore,PersonalScore,Lift,Recall,Latency\nQ,partial,1,0,0,0,0,1.00s\n",
        )
        .expect("write fixture");

        let error = read_report(&path).expect_err("unknown mode should fail");
        assert!(format!("{error:#}").contains("unknown mode"), "unexpected error: {error:#}");
    }

    #[test]
    fn write_report_fails_when_target_is_a_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(write_report(dir.path(), &sample_rows()).is_err());
    }

    #[test]
    fn summary_line_shows_signed_lift_and_recall_mean_only() {
        let summary = ModeSummary {
            mode: ContextMode::Full,
            rows: 3,
            plan: MetricStat {
                mean: 0.5,
                ci: Some(ConfidenceInterval { low: 0.25, high: 0.75 }),
            },
            personal: MetricStat {
                mean: 0.625,
                ci: Some(ConfidenceInterval { low: 0.5, high: 0.75 }),
            },
            lift: MetricStat {
                mean: 0.125,
                ci: Some(ConfidenceInterval { low: -0.25, high: 0.5 }),
            },
            recall: MetricStat { mean: 0.2, ci: None },
        };

        assert_eq!(
            format_summary_line(&summary),
            "full       Plan 0.500 CI[0.250,0.750]  Personal 0.625 CI[0.500,0.750]  Lift +0.125 CI[-0.250,+0.500]  Recall 0.200"
        );
    }

    #[test]
    fn latency_log_appends_word_counts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("latency_log.csv");
        {
            let mut log = LatencyLog::open(&path).expect("open log");
            log.append("CPS 2232: Data Structure", 1.5).expect("append");
        }
        {
            let mut log = LatencyLog::open(&path).expect("reopen log");
            log.append("", 0.25).expect("append");
        }

        let text = std::fs::read_to_string(&path).expect("read log");
        assert_eq!(text, "4,1.5\n0,0.25\n");
    }
}
