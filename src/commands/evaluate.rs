use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::bootstrap::{BootstrapConfig, resampling_rng, summarize_rows};
use crate::cli::EvaluateArgs;
use crate::commands::sources::load_sources;
use crate::llm::{AdvisorModel, OllamaClient, OllamaConfig};
use crate::mention::{MentionConfig, MentionExtractor};
use crate::model::{
    ContextMode, EvaluationRow, EvaluationRunSummary, Grade, RunCounts, RunSettings,
};
use crate::prompt::build_prompt;
use crate::report::{LatencyLog, write_report, write_summary_table};
use crate::scoring::score;
use crate::student::{PlanSet, TranscriptRecord};
use crate::util::{
    now_utc_string, read_nonempty_lines, source_hash, utc_compact_string, write_json_pretty,
};


const PROGRESS_QUESTION_CHARS: usize = 38;

/// Immutable inputs threaded through every scoring call of a run.
pub struct EvaluationContext<'a> {
    pub extractor: &'a MentionExtractor,
    pub plan: &'a PlanSet,
    pub transcript: &'a TranscriptRecord,
    pub low_grade_threshold: Grade,
}

#[derive(Debug)]
pub struct EvaluationOutcome {
    pub rows: Vec<EvaluationRow>,
    pub failed_calls: usize,
}

pub fn run(args: EvaluateArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("eval-{}", utc_compact_string(started_ts));

    let bootstrap = BootstrapConfig {
        iterations: args.bootstrap.bootstrap_iterations,
        low_percentile: args.bootstrap.ci_low,
        high_percentile: args.bootstrap.ci_high,
    };
    bootstrap.validate()?;

    let sources = load_sources(&args.sources)?;
    let questions = read_nonempty_lines(&args.questions)
        .with_context(|| format!("failed to load questions: {}", args.questions.display()))?;
    if questions.is_empty() {
        bail!("question file has no questions: {}", args.questions.display());
    }

    let mention_config = MentionConfig {
        fuzzy_threshold: args.matching.fuzzy_threshold,
        fuzzy_scope: args.matching.fuzzy_scope,
    };
    let extractor = MentionExtractor::new(&sources.catalog, mention_config)?;
    let client = OllamaClient::new(OllamaConfig {
        base_url: args.ollama_url.clone(),
        model: args.model.clone(),
        stream: !args.no_stream,
        timeout: Duration::from_secs(args.timeout_secs),
    })?;
    let mut latency_log = match &args.latency_log {
        Some(path) => Some(LatencyLog::open(path)?),
        None => None,
    };

    info!(
        run_id = %run_id,
        model = %args.model,
        questions = questions.len(),
        modes = ContextMode::ALL.len(),
        "starting evaluation"
    );

    let context = EvaluationContext {
        extractor: &extractor,
        plan: &sources.plan,
        transcript: &sources.profile.transcript,
        low_grade_threshold: args.sources.low_grade_threshold,
    };
    let mut stdout = io::stdout().lock();
    let outcome = evaluate_questions(
        &context,
        &client,
        &questions,
        latency_log.as_mut(),
        &mut stdout,
    )?;

    write_report(&args.out_csv, &outcome.rows)?;
    writeln!(stdout, "Saved \u{2192} {}", args.out_csv.display())?;
    info!(path = %args.out_csv.display(), rows = outcome.rows.len(), "wrote relevance report");

    let mut rng = resampling_rng(args.bootstrap.seed);
    let summaries = summarize_rows(&outcome.rows, &bootstrap, &mut rng);
    write_summary_table(&mut stdout, &summaries)?;

    let summary_path = args
        .summary_path
        .clone()
        .unwrap_or_else(|| default_summary_path(&args.out_csv));
    let summary = EvaluationRunSummary {
        manifest_version: 1,
        run_id,
        started_at,
        generated_at: now_utc_string(),
        student: sources.profile.username.clone(),
        major: sources.profile.major.clone(),
        report_path: args.out_csv.display().to_string(),
        settings: RunSettings {
            model: args.model.clone(),
            ollama_url: args.ollama_url.clone(),
            stream: !args.no_stream,
            timeout_secs: args.timeout_secs,
            low_grade_threshold: args.sources.low_grade_threshold.to_string(),
            fuzzy_threshold: mention_config.fuzzy_threshold,
            fuzzy_scope: mention_config.fuzzy_scope.as_str().to_string(),
            bootstrap_iterations: bootstrap.iterations,
            ci_low_percentile: bootstrap.low_percentile,
            ci_high_percentile: bootstrap.high_percentile,
            seed: args.bootstrap.seed,
        },
        counts: RunCounts {
            questions: questions.len(),
            rows: outcome.rows.len(),
            failed_calls: outcome.failed_calls,
            catalog_entries: sources.catalog.len(),
            plan_courses: sources.plan.len(),
            transcript_courses: sources.profile.transcript.len(),
        },
        source_hashes: vec![
            source_hash(&sources.catalog_path)?,
            source_hash(&sources.plan_path)?,
            source_hash(&args.questions)?,
        ],
        modes: summaries,
    };
    write_json_pretty(&summary_path, &summary)?;
    info!(path = %summary_path.display(), failed_calls = outcome.failed_calls, "wrote run summary");

    Ok(())
}

/// Runs every question under every mode, in order, one model call at a time.
pub fn evaluate_questions<M: AdvisorModel, W: Write>(
    context: &EvaluationContext<'_>,
    model: &M,
    questions: &[String],
    mut latency_log: Option<&mut LatencyLog>,
    progress: &mut W,
) -> Result<EvaluationOutcome> {
    let mut rows = Vec::with_capacity(questions.len() * ContextMode::ALL.len());
    let mut failed_calls = 0usize;

    for question in questions {
        for mode in ContextMode::ALL {
            let prompt = build_prompt(
                mode,
                question,
                context.transcript,
                context.plan,
                context.low_grade_threshold,
            );
            let reply = model.ask(&prompt);
            if let Some(log) = latency_log.as_deref_mut() {
                log.append(&reply.text, reply.latency_seconds)?;
            }

            let recommendations = if reply.failed {
                failed_calls += 1;
                warn!(mode = %mode, model = model.name(), "scoring failed call with no recommendations");
                Default::default()
            } else {
                context.extractor.extract(&reply.text)
            };

            let card = score(
                &recommendations,
                context.plan,
                context.transcript,
                context.low_grade_threshold,
            );
            let row = EvaluationRow {
                question: question.clone(),
                mode,
                recommendation_count: recommendations.len(),
                plan_score: card.plan_score,
                personal_score: card.personal_score,
                lift: card.lift,
                recall: card.recall,
                latency_seconds: reply.latency_seconds,
            };
            writeln!(progress, "{}", progress_line(&row))?;
            rows.push(row);
        }
    }

    Ok(EvaluationOutcome { rows, failed_calls })
}

pub fn progress_line(row: &EvaluationRow) -> String {
    let preview = row
        .question
        .chars()
        .take(PROGRESS_QUESTION_CHARS)
        .collect::<String>();
    format!(
        "[{}] {}\u{2026} Rec:{} Plan:{:.3} Pers:{:.3}",
        row.mode, preview, row.recommendation_count, row.plan_score, row.personal_score
    )
}

pub fn default_summary_path(report_path: &Path) -> PathBuf {
    report_path.with_extension("summary.json")
}
