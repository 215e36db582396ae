use std::collections::BTreeSet;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use regex::Regex;

use crate::catalog::Catalog;

mod similarity;

pub use similarity::sequence_ratio;

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.8;

/// What the fuzzy fallback compares against each catalog label.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum FuzzyScope {
    /// The whole reply at once. Reproduces the historical metric.
    #[default]
    WholeText,
    /// Each non-empty reply line on its own.
    PerLine,
}

impl FuzzyScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WholeText => "whole-text",
            Self::PerLine => "per-line",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MentionConfig {
    pub fuzzy_threshold: f64,
    pub fuzzy_scope: FuzzyScope,
}

impl Default for MentionConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            fuzzy_scope: FuzzyScope::WholeText,
        }
    }
}

#[derive(Debug)]
struct FuzzyLabel {
    label: String,
    lowered: String,
}

#[derive(Debug)]
struct CodePattern {
    pattern: Regex,
    label: String,
}

/// Finds catalog courses mentioned in free-text model replies.
#[derive(Debug)]
pub struct MentionExtractor {
    patterns: Vec<CodePattern>,
    labels: Vec<FuzzyLabel>,
    config: MentionConfig,
}

impl MentionExtractor {
    pub fn new(catalog: &Catalog, config: MentionConfig) -> Result<Self> {
        if !(0.0..=1.0).contains(&config.fuzzy_threshold) {
            bail!(
                "fuzzy threshold must be within [0, 1], got {}",
                config.fuzzy_threshold
            );
        }

        let mut patterns = Vec::with_capacity(catalog.code_index().len());
        for entry in catalog.code_index() {
            if entry.code.is_empty() {
                continue;
            }
            let source = format!(r"(?i)\b{}\b", regex::escape(&entry.code));
            let pattern = Regex::new(&source)
                .with_context(|| format!("failed to compile course code pattern: {}", entry.code))?;
            patterns.push(CodePattern {
                pattern,
                label: entry.label.clone(),
            });
        }

        let labels = catalog
            .entries()
            .iter()
            .map(|entry| FuzzyLabel {
                label: entry.label.clone(),
                lowered: entry.label.to_lowercase(),
            })
            .collect::<Vec<FuzzyLabel>>();

        Ok(Self {
            patterns,
            labels,
            config,
        })
    }

    pub fn config(&self) -> MentionConfig {
        self.config
    }

    /// Exact whole-word code matches; the fuzzy fallback only runs when none hit.
    pub fn extract(&self, text: &str) -> BTreeSet<String> {
        if text.trim().is_empty() {
            return BTreeSet::new();
        }

        let exact = self.exact_matches(text);
        if !exact.is_empty() {
            return exact;
        }

        self.fuzzy_matches(text)
    }

    fn exact_matches(&self, text: &str) -> BTreeSet<String> {
        self.patterns
            .iter()
            .filter(|code| code.pattern.is_match(text))
            .map(|code| code.label.clone())
            .collect()
    }

    fn fuzzy_matches(&self, text: &str) -> BTreeSet<String> {
        let candidates = match self.config.fuzzy_scope {
            FuzzyScope::WholeText => vec![text.to_lowercase()],
            FuzzyScope::PerLine => text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_lowercase)
                .collect::<Vec<String>>(),
        };

        let mut found = BTreeSet::new();
        for entry in &self.labels {
            let hit = candidates.iter().any(|candidate| {
                sequence_ratio(candidate, &entry.lowered) > self.config.fuzzy_threshold
            });
            if hit {
                found.insert(entry.label.clone());
            }
        }
        found
    }
}
