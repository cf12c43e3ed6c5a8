use super::error::SimulationError;
use super::sampling::Rng;
use super::severity::{bull_gain, downside_severity};
use super::types::{
    DownsideProbabilities, DownsideShock, MonthTracePoint, RunStatus, RunSummary, ShockCounts,
    SimulationConfig, TriggeredShock,
};

const HEALTH_MIN: f64 = 0.7;
const HEALTH_MAX: f64 = 1.3;

#[derive(Debug)]
struct RunState {
    fund: f64,
    probabilities: DownsideProbabilities,
    hits: ShockCounts,
}

impl RunState {
    fn new(config: &SimulationConfig) -> Self {
        Self {
            fund: config.initial_fund,
            probabilities: DownsideProbabilities::from_base(&config.base_probabilities),
            hits: ShockCounts::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MarketRegime {
    pub health: f64,
    pub drift: f64,
    pub volatility: f64,
}

#[derive(Debug)]
struct MonthOutcome {
    gbm_return: f64,
    triggered: Vec<TriggeredShock>,
    total_loss: f64,
    bull_gain: f64,
    fund_after: f64,
}

/// Replays run `run_index` with the same stream the aggregator would use.
pub fn simulate_run(
    config: &SimulationConfig,
    run_index: u64,
) -> Result<RunSummary, SimulationError> {
    config.validate()?;
    let mut rng = Rng::for_run(config.seed, run_index);
    simulate_path(config, &mut rng, None)
}

pub fn run_path_trace(
    config: &SimulationConfig,
    run_index: u64,
) -> Result<(RunSummary, Vec<MonthTracePoint>), SimulationError> {
    config.validate()?;
    let mut rng = Rng::for_run(config.seed, run_index);
    let mut trace = Vec::with_capacity(config.months as usize);
    let summary = simulate_path(config, &mut rng, Some(&mut trace))?;
    Ok((summary, trace))
}

pub(crate) fn simulate_path(
    config: &SimulationConfig,
    rng: &mut Rng,
    mut trace: Option<&mut Vec<MonthTracePoint>>,
) -> Result<RunSummary, SimulationError> {
    let mut state = RunState::new(config);
    let mut status = RunStatus::Completed;
    let mut months_survived = config.months;

    for month in 0..config.months {
        let regime = market_regime(config, state.fund);
        let outcome = evaluate_month(config, &mut state, &regime, rng)?;

        let depleted = outcome.fund_after <= 0.0;
        if depleted {
            state.fund = 0.0;
            status = RunStatus::Depleted;
            months_survived = month;
        } else {
            state.fund = outcome.fund_after;
            update_probabilities(
                &mut state.probabilities,
                &state.hits,
                month,
                config.learning_rate,
            );
        }

        if let Some(rows) = trace.as_deref_mut() {
            rows.push(MonthTracePoint {
                month,
                health: regime.health,
                drift: regime.drift,
                volatility: regime.volatility,
                gbm_return: outcome.gbm_return,
                triggered: outcome.triggered,
                total_loss: outcome.total_loss,
                bull_gain: outcome.bull_gain,
                fund: state.fund,
                probabilities: state.probabilities,
            });
        }

        if depleted {
            break;
        }
    }

    Ok(RunSummary {
        final_value: state.fund,
        insolvent: state.fund < config.floor,
        status,
        months_survived,
        hits: state.hits,
    })
}

/// Drift falls and volatility rises as the fund drops below its starting value.
pub(crate) fn market_regime(config: &SimulationConfig, fund: f64) -> MarketRegime {
    let health = (fund / config.initial_fund).clamp(HEALTH_MIN, HEALTH_MAX);
    MarketRegime {
        health,
        drift: config.base_drift * (0.90 + 0.20 * health),
        volatility: config.base_volatility * (1.0 + (1.0 - health) * 0.4),
    }
}

fn gbm_return(regime: &MarketRegime, dt: f64, z: f64) -> f64 {
    let mu = (regime.drift - 0.5 * regime.volatility * regime.volatility) * dt;
    let sigma = regime.volatility * dt.sqrt();
    (mu + sigma * z).exp() - 1.0
}

fn evaluate_month(
    config: &SimulationConfig,
    state: &mut RunState,
    regime: &MarketRegime,
    rng: &mut Rng,
) -> Result<MonthOutcome, SimulationError> {
    let gbm = gbm_return(regime, config.dt, rng.standard_normal());

    let mut triggered = Vec::new();
    let mut total_loss = 0.0;
    for shock in DownsideShock::ALL {
        if rng.uniform() < state.probabilities.get(shock) {
            let severity = downside_severity(config, shock, rng)?;
            total_loss += severity;
            state.hits.increment(shock);
            triggered.push(TriggeredShock { shock, severity });
        }
    }
    let total_loss = total_loss.min(config.max_monthly_loss);

    // Bull probability is fixed at its base value for the whole run.
    let bull = if rng.uniform() < config.base_probabilities.bull {
        bull_gain(config, rng)?
    } else {
        0.0
    };

    let rtn = gbm - total_loss + bull;
    let fund_after = state.fund * (1.0 + rtn) - config.monthly_payout;

    Ok(MonthOutcome {
        gbm_return: gbm,
        triggered,
        total_loss,
        bull_gain: bull,
        fund_after,
    })
}

/// Moves each downside probability toward its Laplace-smoothed in-run hit
/// rate, then clamps it into the shock's band.
pub(crate) fn update_probabilities(
    probabilities: &mut DownsideProbabilities,
    hits: &ShockCounts,
    month: u32,
    learning_rate: f64,
) {
    for shock in DownsideShock::ALL {
        let empirical = (hits.get(shock) as f64 + 1.0) / (month as f64 + 2.0);
        let blended =
            probabilities.get(shock) * (1.0 - learning_rate) + learning_rate * empirical;
        let (lo, hi) = shock.probability_band();
        probabilities.set(shock, blended.clamp(lo, hi));
    }
}
