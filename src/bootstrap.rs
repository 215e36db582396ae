use anyhow::{Result, bail};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::{ConfidenceInterval, ContextMode, EvaluationRow, MetricStat, ModeSummary};

pub const DEFAULT_BOOTSTRAP_ITERATIONS: usize = 10_000;
pub const DEFAULT_CI_LOW_PERCENTILE: f64 = 0.05;
pub const DEFAULT_CI_HIGH_PERCENTILE: f64 = 0.95;

#[derive(Debug, Clone, Copy)]
pub struct BootstrapConfig {
    pub iterations: usize,
    pub low_percentile: f64,
    pub high_percentile: f64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_BOOTSTRAP_ITERATIONS,
            low_percentile: DEFAULT_CI_LOW_PERCENTILE,
            high_percentile: DEFAULT_CI_HIGH_PERCENTILE,
        }
    }
}

impl BootstrapConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.low_percentile)
            || !(0.0..=1.0).contains(&self.high_percentile)
            || self.low_percentile >= self.high_percentile
        {
            bail!(
                "confidence percentiles must satisfy 0 <= low < high <= 1, got ({}, {})",
                self.low_percentile,
                self.high_percentile
            );
        }
        Ok(())
    }
}

/// Seeded runs are reproducible; unseeded runs draw from OS entropy.
pub fn resampling_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Percentile interval over `iterations` resampled means.
///
/// Bootstrap means are sorted ascending and read at index `floor(N * low)`
/// for the lower bound and `ceil(N * high) - 1` for the upper bound, both
/// clamped to the sequence.
pub fn bootstrap_interval<R: Rng + ?Sized>(
    samples: &[f64],
    config: &BootstrapConfig,
    rng: &mut R,
) -> Option<ConfidenceInterval> {
    if samples.is_empty() || config.iterations == 0 {
        return None;
    }

    let iterations = config.iterations;
    let mut means = Vec::<f64>::with_capacity(iterations);
    for _ in 0..iterations {
        let mut total = 0.0_f64;
        for _ in 0..samples.len() {
            total += samples[rng.gen_range(0..samples.len())];
        }
        means.push(total / samples.len() as f64);
    }

    means.sort_by(|left, right| left.total_cmp(right));
    let last = iterations - 1;
    let low_index = ((iterations as f64) * config.low_percentile).floor() as usize;
    let high_index = ((iterations as f64) * config.high_percentile).ceil() as usize;

    Some(ConfidenceInterval {
        low: means[low_index.min(last)],
        high: means[high_index.saturating_sub(1).min(last)],
    })
}

pub fn aggregate<R: Rng + ?Sized>(
    samples: &[f64],
    config: &BootstrapConfig,
    rng: &mut R,
) -> MetricStat {
    MetricStat {
        mean: mean(samples),
        ci: bootstrap_interval(samples, config, rng),
    }
}

/// Per-mode statistics in the fixed mode order. Recall is reported as a
/// mean only.
pub fn summarize_rows<R: Rng + ?Sized>(
    rows: &[EvaluationRow],
    config: &BootstrapConfig,
    rng: &mut R,
) -> Vec<ModeSummary> {
    let mut summaries = Vec::new();

    for mode in ContextMode::ALL {
        let group = rows
            .iter()
            .filter(|row| row.mode == mode)
            .collect::<Vec<&EvaluationRow>>();
        if group.is_empty() {
            continue;
        }

        let plan = group.iter().map(|row| row.plan_score).collect::<Vec<f64>>();
        let personal = group
            .iter()
            .map(|row| row.personal_score)
            .collect::<Vec<f64>>();
        let lift = group.iter().map(|row| row.lift).collect::<Vec<f64>>();
        let recall = group.iter().map(|row| row.recall).collect::<Vec<f64>>();

        summaries.push(ModeSummary {
            mode,
            rows: group.len(),
            plan: aggregate(&plan, config, rng),
            personal: aggregate(&personal, config, rng),
            lift: aggregate(&lift, config, rng),
            recall: MetricStat {
                mean: mean(&recall),
                ci: None,
            },
        });
    }

    summaries
}
