mod aggregate;
mod engine;
mod error;
mod sampling;
mod severity;
mod types;

pub use aggregate::{StressAccumulator, posterior_probability, run_stress_test};
pub use engine::{run_path_trace, simulate_run};
pub use error::SimulationError;
pub use sampling::{
    NEG_BINOMIAL_MAX_TRIALS, Rng, sample_binomial_severity, sample_exponential, sample_gamma,
    sample_neg_binomial_severity,
};
pub use severity::{
    black_swan_severity, bull_severity, pandemic_severity, recession_severity, war_severity,
};
pub use types::{
    AggregateResult, DownsideProbabilities, DownsideShock, MonthTracePoint, RunStatus,
    RunSummary, SeverityModel, ShockCounts, ShockPosterior, ShockRates, SimulationConfig,
    TriggeredShock,
};
