use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Letter grades from best to worst. The declaration order is the ordinal rank.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    AMinus,
    BPlus,
    B,
    BMinus,
    CPlus,
    C,
    D,
    F,
}

impl Grade {
    pub const ALL: [Grade; 9] = [
        Self::A,
        Self::AMinus,
        Self::BPlus,
        Self::B,
        Self::BMinus,
        Self::CPlus,
        Self::C,
        Self::D,
        Self::F,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::AMinus => "A-",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::BMinus => "B-",
            Self::CPlus => "C+",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }

    /// 0 for `A` up to 8 for `F`.
    pub fn rank(self) -> usize {
        self as usize
    }

    pub fn parse(symbol: &str) -> Option<Self> {
        let symbol = symbol.trim();
        Self::ALL.into_iter().find(|grade| grade.as_str() == symbol)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match Self::parse(value) {
            Some(grade) => Ok(grade),
            None => bail!("unknown grade symbol: {value:?} (expected one of A, A-, B+, B, B-, C+, C, D, F)"),
        }
    }
}

/// Which student data is embedded in the prompt sent to the model.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, ValueEnum, Serialize, Deserialize)]
pub enum ContextMode {
    #[value(name = "full")]
    #[serde(rename = "full")]
    Full,
    #[value(name = "noTranscript")]
    #[serde(rename = "noTranscript")]
    NoTranscript,
    #[value(name = "noPlan")]
    #[serde(rename = "noPlan")]
    NoPlan,
    #[value(name = "question")]
    #[serde(rename = "question")]
    Question,
}

impl ContextMode {
    pub const ALL: [ContextMode; 4] = [
        Self::Full,
        Self::NoTranscript,
        Self::NoPlan,
        Self::Question,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::NoTranscript => "noTranscript",
            Self::NoPlan => "noPlan",
            Self::Question => "question",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == value.trim())
    }
}

impl fmt::Display for ContextMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreCard {
    pub plan_score: f64,
    pub personal_score: f64,
    pub lift: f64,
    pub recall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRow {
    pub question: String,
    pub mode: ContextMode,
    pub recommendation_count: usize,
    pub plan_score: f64,
    pub personal_score: f64,
    pub lift: f64,
    pub recall: f64,
    pub latency_seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricStat {
    pub mean: f64,
    pub ci: Option<ConfidenceInterval>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeSummary {
    pub mode: ContextMode,
    pub rows: usize,
    pub plan: MetricStat,
    pub personal: MetricStat,
    pub lift: MetricStat,
    pub recall: MetricStat,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceHash {
    pub path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSettings {
    pub model: String,
    pub ollama_url: String,
    pub stream: bool,
    pub timeout_secs: u64,
    pub low_grade_threshold: String,
    pub fuzzy_threshold: f64,
    pub fuzzy_scope: String,
    pub bootstrap_iterations: usize,
    pub ci_low_percentile: f64,
    pub ci_high_percentile: f64,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunCounts {
    pub questions: usize,
    pub rows: usize,
    pub failed_calls: usize,
    pub catalog_entries: usize,
    pub plan_courses: usize,
    pub transcript_courses: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationRunSummary {
    pub manifest_version: u32,
    pub run_id: String,
    pub started_at: String,
    pub generated_at: String,
    pub student: String,
    pub major: String,
    pub report_path: String,
    pub settings: RunSettings,
    pub counts: RunCounts,
    pub source_hashes: Vec<SourceHash>,
    pub modes: Vec<ModeSummary>,
}
