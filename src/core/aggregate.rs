use tracing::{debug, info};

use super::engine::simulate_path;
use super::error::SimulationError;
use super::sampling::Rng;
use super::types::{
    AggregateResult, DownsideShock, RunStatus, RunSummary, ShockCounts, ShockPosterior,
    SimulationConfig,
};

/// Running totals over independent run summaries.
///
/// Two accumulators built from disjoint sets of runs can be merged in any
/// order; sums, counts and the final-value sample are the only state.
#[derive(Debug, Clone, Default)]
pub struct StressAccumulator {
    runs: u64,
    insolvent_runs: u64,
    depleted_runs: u64,
    total_final_value: f64,
    hits: ShockCounts,
    final_values: Vec<f64>,
}

impl StressAccumulator {
    pub fn with_capacity(runs: usize) -> Self {
        Self {
            final_values: Vec::with_capacity(runs),
            ..Self::default()
        }
    }

    pub fn record(&mut self, summary: &RunSummary) {
        self.runs += 1;
        if summary.insolvent {
            self.insolvent_runs += 1;
        }
        if summary.status == RunStatus::Depleted {
            self.depleted_runs += 1;
        }
        self.total_final_value += summary.final_value;
        self.hits.add(&summary.hits);
        self.final_values.push(summary.final_value);
    }

    pub fn merge(mut self, other: StressAccumulator) -> Self {
        self.runs += other.runs;
        self.insolvent_runs += other.insolvent_runs;
        self.depleted_runs += other.depleted_runs;
        self.total_final_value += other.total_final_value;
        self.hits.add(&other.hits);
        self.final_values.extend(other.final_values);
        self
    }

    pub fn runs(&self) -> u64 {
        self.runs
    }

    pub fn finish(mut self, months: u32) -> AggregateResult {
        let runs = self.runs;
        let (average_final_value, insolvency_share) = if runs == 0 {
            (0.0, 0.0)
        } else {
            (
                self.total_final_value / runs as f64,
                self.insolvent_runs as f64 / runs as f64,
            )
        };

        AggregateResult {
            runs,
            months,
            insolvent_runs: self.insolvent_runs,
            depleted_runs: self.depleted_runs,
            total_final_value: self.total_final_value,
            average_final_value,
            median_final_value: percentile(&mut self.final_values, 50.0),
            p10_final_value: percentile(&mut self.final_values, 10.0),
            insolvency_probability_pct: 100.0 * insolvency_share,
            insolvency_ci_half_width_pct: 100.0 * binomial_ci_half_width(insolvency_share, runs),
            posterior: ShockPosterior::from_counts(&self.hits, runs, months),
            total_hits: self.hits,
        }
    }
}

pub fn run_stress_test(config: &SimulationConfig) -> Result<AggregateResult, SimulationError> {
    config.validate()?;
    info!(
        runs = config.runs,
        months = config.months,
        seed = config.seed,
        severity_model = ?config.severity_model,
        "starting stress test"
    );

    let mut acc = StressAccumulator::with_capacity(config.runs as usize);
    for run in 0..u64::from(config.runs) {
        let mut rng = Rng::for_run(config.seed, run);
        let summary = simulate_path(config, &mut rng, None)?;
        if summary.status == RunStatus::Depleted {
            debug!(run, month = summary.months_survived, "fund depleted");
        }
        acc.record(&summary);
    }

    let result = acc.finish(config.months);
    info!(
        insolvency_pct = result.insolvency_probability_pct,
        average_final_value = result.average_final_value,
        depleted_runs = result.depleted_runs,
        "stress test finished"
    );
    Ok(result)
}

/// Laplace-smoothed monthly occurrence rate over every month of every run.
pub fn posterior_probability(total_hits: u64, runs: u64, months: u32) -> f64 {
    let denom = runs as f64 * months as f64 + 2.0;
    (total_hits as f64 + 1.0) / denom
}

impl ShockPosterior {
    pub fn from_counts(hits: &ShockCounts, runs: u64, months: u32) -> Self {
        let p = |shock: DownsideShock| posterior_probability(hits.get(shock), runs, months);
        Self {
            recession: p(DownsideShock::Recession),
            war: p(DownsideShock::War),
            pandemic: p(DownsideShock::Pandemic),
            black_swan: p(DownsideShock::BlackSwan),
        }
    }
}

fn binomial_ci_half_width(p: f64, n: u64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = p.clamp(0.0, 1.0);
    1.96 * (p * (1.0 - p) / n as f64).sqrt()
}

fn percentile(values: &mut [f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.sort_by(|a, b| a.total_cmp(b));

    let n = values.len();
    if n == 1 {
        return values[0];
    }

    let rank = (p / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        values[lower]
    } else {
        let w = rank - lower as f64;
        values[lower] * (1.0 - w) + values[upper] * w
    }
}
