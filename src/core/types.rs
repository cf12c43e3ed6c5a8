use serde::{Deserialize, Serialize};

use super::error::SimulationError;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeverityModel {
    /// Per-shock named distributions (negative-binomial, binomial, gamma).
    Distributional,
    /// Flat `u * maxValue` draw for every shock.
    Uniform,
}

/// The four shocks that subtract from the monthly return and adapt their
/// working probability within a run.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DownsideShock {
    Recession,
    War,
    Pandemic,
    BlackSwan,
}

impl DownsideShock {
    pub const ALL: [DownsideShock; 4] = [
        DownsideShock::Recession,
        DownsideShock::War,
        DownsideShock::Pandemic,
        DownsideShock::BlackSwan,
    ];

    /// Inclusive band the working probability is clamped into after each update.
    pub fn probability_band(self) -> (f64, f64) {
        match self {
            DownsideShock::Recession => (0.0001, 0.0200),
            DownsideShock::War => (0.00005, 0.0100),
            DownsideShock::Pandemic => (0.00005, 0.0100),
            DownsideShock::BlackSwan => (0.00001, 0.0050),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DownsideShock::Recession => "Recession",
            DownsideShock::War => "War",
            DownsideShock::Pandemic => "Pandemic",
            DownsideShock::BlackSwan => "Black Swan",
        }
    }
}

/// One value per shock type, used both for base probabilities and magnitude caps.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShockRates {
    pub recession: f64,
    pub war: f64,
    pub pandemic: f64,
    pub black_swan: f64,
    pub bull: f64,
}

impl ShockRates {
    pub fn downside(&self, shock: DownsideShock) -> f64 {
        match shock {
            DownsideShock::Recession => self.recession,
            DownsideShock::War => self.war,
            DownsideShock::Pandemic => self.pandemic,
            DownsideShock::BlackSwan => self.black_swan,
        }
    }

    fn entries(&self) -> [(&'static str, f64); 5] {
        [
            ("recession", self.recession),
            ("war", self.war),
            ("pandemic", self.pandemic),
            ("blackSwan", self.black_swan),
            ("bull", self.bull),
        ]
    }
}

/// Working probabilities of the downside shocks inside one run.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownsideProbabilities {
    pub recession: f64,
    pub war: f64,
    pub pandemic: f64,
    pub black_swan: f64,
}

impl DownsideProbabilities {
    pub fn from_base(base: &ShockRates) -> Self {
        Self {
            recession: base.recession,
            war: base.war,
            pandemic: base.pandemic,
            black_swan: base.black_swan,
        }
    }

    pub fn get(&self, shock: DownsideShock) -> f64 {
        match shock {
            DownsideShock::Recession => self.recession,
            DownsideShock::War => self.war,
            DownsideShock::Pandemic => self.pandemic,
            DownsideShock::BlackSwan => self.black_swan,
        }
    }

    pub fn set(&mut self, shock: DownsideShock, value: f64) {
        match shock {
            DownsideShock::Recession => self.recession = value,
            DownsideShock::War => self.war = value,
            DownsideShock::Pandemic => self.pandemic = value,
            DownsideShock::BlackSwan => self.black_swan = value,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShockCounts {
    pub recession: u64,
    pub war: u64,
    pub pandemic: u64,
    pub black_swan: u64,
}

impl ShockCounts {
    pub fn get(&self, shock: DownsideShock) -> u64 {
        match shock {
            DownsideShock::Recession => self.recession,
            DownsideShock::War => self.war,
            DownsideShock::Pandemic => self.pandemic,
            DownsideShock::BlackSwan => self.black_swan,
        }
    }

    pub fn increment(&mut self, shock: DownsideShock) {
        match shock {
            DownsideShock::Recession => self.recession += 1,
            DownsideShock::War => self.war += 1,
            DownsideShock::Pandemic => self.pandemic += 1,
            DownsideShock::BlackSwan => self.black_swan += 1,
        }
    }

    pub fn add(&mut self, other: &ShockCounts) {
        self.recession += other.recession;
        self.war += other.war;
        self.pandemic += other.pandemic;
        self.black_swan += other.black_swan;
    }

    pub fn total(&self) -> u64 {
        self.recession + self.war + self.pandemic + self.black_swan
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    pub initial_fund: f64,
    pub base_drift: f64,
    pub base_volatility: f64,
    pub months: u32,
    pub runs: u32,
    pub floor: f64,
    pub monthly_payout: f64,
    pub dt: f64,
    pub base_probabilities: ShockRates,
    pub magnitude_caps: ShockRates,
    pub max_monthly_loss: f64,
    pub gamma_cap: f64,
    pub learning_rate: f64,
    pub severity_model: SeverityModel,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_fund: 1_000_000_000.0,
            base_drift: 0.07,
            base_volatility: 0.10,
            months: 10 * 12,
            runs: 1_000_000,
            floor: 700_000_000.0,
            monthly_payout: 3_000_000.0,
            dt: 1.0 / 12.0,
            base_probabilities: ShockRates {
                recession: 0.0020,
                war: 0.0005,
                pandemic: 0.0005,
                black_swan: 0.0003,
                bull: 0.0400,
            },
            magnitude_caps: ShockRates {
                recession: 0.04,
                war: 0.03,
                pandemic: 0.06,
                black_swan: 0.10,
                bull: 0.03,
            },
            max_monthly_loss: 0.25,
            gamma_cap: 5.0,
            learning_rate: 0.002,
            severity_model: SeverityModel::Distributional,
            seed: 42,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), SimulationError> {
        let finite = [
            ("initialFund", self.initial_fund),
            ("baseDrift", self.base_drift),
            ("baseVolatility", self.base_volatility),
            ("floor", self.floor),
            ("monthlyPayout", self.monthly_payout),
            ("dt", self.dt),
            ("maxMonthlyLoss", self.max_monthly_loss),
            ("gammaCap", self.gamma_cap),
            ("learningRate", self.learning_rate),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(SimulationError::invalid_config(field, "must be finite"));
            }
        }

        if self.initial_fund <= 0.0 {
            return Err(SimulationError::invalid_config("initialFund", "must be > 0"));
        }
        if self.runs == 0 {
            return Err(SimulationError::invalid_config("runs", "must be > 0"));
        }
        if self.months == 0 {
            return Err(SimulationError::invalid_config("months", "must be > 0"));
        }
        if self.dt <= 0.0 {
            return Err(SimulationError::invalid_config("dt", "must be > 0"));
        }
        if self.base_volatility < 0.0 {
            return Err(SimulationError::invalid_config("baseVolatility", "must be >= 0"));
        }
        if self.floor < 0.0 {
            return Err(SimulationError::invalid_config("floor", "must be >= 0"));
        }
        if self.monthly_payout < 0.0 {
            return Err(SimulationError::invalid_config("monthlyPayout", "must be >= 0"));
        }
        for (name, p) in self.base_probabilities.entries() {
            if !(0.0..=1.0).contains(&p) {
                return Err(SimulationError::invalid_config(
                    "baseProbabilities",
                    format!("{name} must be between 0 and 1"),
                ));
            }
        }
        for (name, cap) in self.magnitude_caps.entries() {
            if !cap.is_finite() || cap < 0.0 {
                return Err(SimulationError::invalid_config(
                    "magnitudeCaps",
                    format!("{name} must be finite and >= 0"),
                ));
            }
        }
        if self.max_monthly_loss < 0.0 {
            return Err(SimulationError::invalid_config("maxMonthlyLoss", "must be >= 0"));
        }
        if self.gamma_cap <= 0.0 {
            return Err(SimulationError::invalid_config("gammaCap", "must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.learning_rate) {
            return Err(SimulationError::invalid_config(
                "learningRate",
                "must be between 0 and 1",
            ));
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    Completed,
    Depleted,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub final_value: f64,
    pub insolvent: bool,
    pub status: RunStatus,
    pub months_survived: u32,
    pub hits: ShockCounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggeredShock {
    pub shock: DownsideShock,
    pub severity: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthTracePoint {
    pub month: u32,
    pub health: f64,
    pub drift: f64,
    pub volatility: f64,
    pub gbm_return: f64,
    pub triggered: Vec<TriggeredShock>,
    pub total_loss: f64,
    pub bull_gain: f64,
    pub fund: f64,
    pub probabilities: DownsideProbabilities,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShockPosterior {
    pub recession: f64,
    pub war: f64,
    pub pandemic: f64,
    pub black_swan: f64,
}

impl ShockPosterior {
    pub fn get(&self, shock: DownsideShock) -> f64 {
        match shock {
            DownsideShock::Recession => self.recession,
            DownsideShock::War => self.war,
            DownsideShock::Pandemic => self.pandemic,
            DownsideShock::BlackSwan => self.black_swan,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub runs: u64,
    pub months: u32,
    pub insolvent_runs: u64,
    pub depleted_runs: u64,
    pub total_final_value: f64,
    pub average_final_value: f64,
    pub median_final_value: f64,
    pub p10_final_value: f64,
    pub insolvency_probability_pct: f64,
    pub insolvency_ci_half_width_pct: f64,
    pub total_hits: ShockCounts,
    pub posterior: ShockPosterior,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.months, 120);
        assert_eq!(config.runs, 1_000_000);
    }

    #[test]
    fn validate_rejects_probability_above_one() {
        let mut config = SimulationConfig::default();
        config.base_probabilities.war = 1.5;
        let err = config.validate().expect_err("must reject probability > 1");
        assert!(err.to_string().contains("war"));
    }

    #[test]
    fn validate_rejects_negative_cap() {
        let mut config = SimulationConfig::default();
        config.magnitude_caps.bull = -0.01;
        let err = config.validate().expect_err("must reject negative cap");
        assert!(err.to_string().contains("bull"));
    }

    #[test]
    fn validate_rejects_non_finite_and_zero_counts() {
        let mut config = SimulationConfig::default();
        config.base_drift = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.runs = 0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.gamma_cap = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn shock_counts_accessors_line_up() {
        let mut counts = ShockCounts::default();
        counts.increment(DownsideShock::War);
        counts.increment(DownsideShock::War);
        counts.increment(DownsideShock::BlackSwan);
        assert_eq!(counts.get(DownsideShock::War), 2);
        assert_eq!(counts.get(DownsideShock::BlackSwan), 1);
        assert_eq!(counts.total(), 3);

        let mut sum = counts;
        sum.add(&counts);
        assert_eq!(sum.war, 4);
    }

    #[test]
    fn probabilities_reset_from_base() {
        let base = SimulationConfig::default().base_probabilities;
        let mut probs = DownsideProbabilities::from_base(&base);
        probs.set(DownsideShock::Pandemic, 0.009);
        assert_eq!(probs.get(DownsideShock::Pandemic), 0.009);
        for shock in [DownsideShock::Recession, DownsideShock::War, DownsideShock::BlackSwan] {
            assert_eq!(probs.get(shock), base.downside(shock));
        }
    }

    #[test]
    fn base_probabilities_start_inside_their_bands() {
        let base = SimulationConfig::default().base_probabilities;
        for shock in DownsideShock::ALL {
            let (lo, hi) = shock.probability_band();
            let p = base.downside(shock);
            assert!((lo..=hi).contains(&p), "{shock:?} base {p} outside [{lo}, {hi}]");
        }
    }
}
