use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::bootstrap::{
    DEFAULT_BOOTSTRAP_ITERATIONS, DEFAULT_CI_HIGH_PERCENTILE, DEFAULT_CI_LOW_PERCENTILE,
};
use crate::llm::{DEFAULT_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_TIMEOUT_SECS};
use crate::mention::{DEFAULT_FUZZY_THRESHOLD, FuzzyScope};
use crate::model::{ContextMode, Grade};
use crate::scoring::DEFAULT_LOW_GRADE_THRESHOLD;

#[derive(Parser, Debug)]
#[command(
    name = "course-eval",
    version,
    about = "Relevance evaluation for LLM course recommendations"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask the model every question under all four context modes and score the replies
    Evaluate(EvaluateArgs),
    /// Print the exact prompt sent for one question and mode
    Prompt(PromptArgs),
    /// List the catalog courses mentioned in a reply
    Mentions(MentionsArgs),
    /// Recompute aggregate statistics from an existing report
    Summarize(SummarizeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Directory holding account.txt, enrolled_courses.txt, course_list.txt and <major>_plan.txt
    #[arg(long, default_value = ".")]
    pub data_dir: PathBuf,

    #[arg(long, default_value = "user@smartcourse.com")]
    pub student: String,

    #[arg(long)]
    pub catalog_path: Option<PathBuf>,

    /// Overrides the plan resolved from the student's major
    #[arg(long)]
    pub plan_path: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_LOW_GRADE_THRESHOLD, value_parser = clap::value_parser!(Grade))]
    pub low_grade_threshold: Grade,
}

#[derive(Args, Debug, Clone)]
pub struct MatchArgs {
    #[arg(long, default_value_t = DEFAULT_FUZZY_THRESHOLD)]
    pub fuzzy_threshold: f64,

    #[arg(long, value_enum, default_value_t = FuzzyScope::WholeText)]
    pub fuzzy_scope: FuzzyScope,
}

#[derive(Args, Debug, Clone)]
pub struct BootstrapArgs {
    #[arg(long, default_value_t = DEFAULT_BOOTSTRAP_ITERATIONS)]
    pub bootstrap_iterations: usize,

    #[arg(long, default_value_t = DEFAULT_CI_LOW_PERCENTILE)]
    pub ci_low: f64,

    #[arg(long, default_value_t = DEFAULT_CI_HIGH_PERCENTILE)]
    pub ci_high: f64,

    /// Fixes the resampling RNG; omit for an entropy-seeded run
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    #[command(flatten)]
    pub matching: MatchArgs,

    #[command(flatten)]
    pub bootstrap: BootstrapArgs,

    #[arg(long, default_value = "evaluation_questions.txt")]
    pub questions: PathBuf,

    #[arg(long, default_value = "relevance_scores.csv")]
    pub out_csv: PathBuf,

    /// JSON run summary; defaults to the report path with a .summary.json extension
    #[arg(long)]
    pub summary_path: Option<PathBuf>,

    #[arg(long)]
    pub latency_log: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, default_value = DEFAULT_OLLAMA_URL)]
    pub ollama_url: String,

    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Request a single JSON body instead of a streamed reply
    #[arg(long, default_value_t = false)]
    pub no_stream: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PromptArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    #[arg(long, value_enum, default_value_t = ContextMode::Full)]
    pub mode: ContextMode,

    #[arg(long)]
    pub question: String,
}

#[derive(Args, Debug, Clone)]
pub struct MentionsArgs {
    #[arg(long, default_value = "course_list.txt")]
    pub catalog_path: PathBuf,

    /// Reply text to scan; reads stdin when omitted
    #[arg(long)]
    pub text_file: Option<PathBuf>,

    #[command(flatten)]
    pub matching: MatchArgs,
}

#[derive(Args, Debug, Clone)]
pub struct SummarizeArgs {
    #[arg(long, default_value = "relevance_scores.csv")]
    pub report: PathBuf,

    #[command(flatten)]
    pub bootstrap: BootstrapArgs,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_defaults_match_documented_values() {
        let cli = Cli::try_parse_from(["course-eval", "evaluate"]).expect("defaults should parse");
        let Commands::Evaluate(args) = cli.command else {
            panic!("expected evaluate command");
        };

        assert_eq!(args.sources.student, "user@smartcourse.com");
        assert_eq!(args.sources.low_grade_threshold, Grade::BMinus);
        assert_eq!(args.model, "llama3.1:8b");
        assert_eq!(args.ollama_url, "http://127.0.0.1:11434");
        assert_eq!(args.bootstrap.bootstrap_iterations, 10_000);
        assert_eq!(args.matching.fuzzy_threshold, 0.8);
        assert_eq!(args.matching.fuzzy_scope, FuzzyScope::WholeText);
        assert_eq!(args.out_csv, PathBuf::from("relevance_scores.csv"));
        assert!(!args.no_stream);
        assert!(args.bootstrap.seed.is_none());
    }

    #[test]
    fn prompt_accepts_canonical_mode_names() {
        let cli = Cli::try_parse_from([
            "course-eval",
            "prompt",
            "--mode",
            "noTranscript",
            "--question",
            "What next?",
            "--low-grade-threshold",
            "C+",
        ])
        .expect("prompt args should parse");
        let Commands::Prompt(args) = cli.command else {
            panic!("expected prompt command");
        };

        assert_eq!(args.mode, ContextMode::NoTranscript);
        assert_eq!(args.sources.low_grade_threshold, Grade::CPlus);
    }

    #[test]
    fn invalid_grade_threshold_is_rejected() {
        let result = Cli::try_parse_from([
            "course-eval",
            "evaluate",
            "--low-grade-threshold",
            "E",
        ]);
        assert!(result.is_err());
    }
}
