//! Shock severity models. Each shock type owns its distribution family and
//! parameters; callers only pick the shock.

use super::error::SimulationError;
use super::sampling::{
    Rng, sample_binomial_severity, sample_gamma, sample_neg_binomial_severity,
};
use super::types::{DownsideShock, SeverityModel, SimulationConfig};

const RECESSION_R: u32 = 2;
const RECESSION_P: f64 = 0.25;
const WAR_N: u32 = 8;
const WAR_P: f64 = 0.15;
const PANDEMIC_K: u32 = 3;
const BLACK_SWAN_R: u32 = 4;
const BLACK_SWAN_P: f64 = 0.18;
const BULL_N: u32 = 8;
const BULL_P: f64 = 0.30;

pub fn recession_severity(rng: &mut Rng, max_drop: f64) -> Result<f64, SimulationError> {
    sample_neg_binomial_severity(rng, RECESSION_R, RECESSION_P, max_drop)
}

pub fn war_severity(rng: &mut Rng, max_drop: f64) -> Result<f64, SimulationError> {
    sample_binomial_severity(rng, WAR_N, WAR_P, max_drop)
}

/// Gamma(3, 1) draw capped at `gamma_cap`, then normalised onto `[0, max_drop]`.
pub fn pandemic_severity(
    rng: &mut Rng,
    max_drop: f64,
    gamma_cap: f64,
) -> Result<f64, SimulationError> {
    if gamma_cap.is_nan() || gamma_cap <= 0.0 {
        return Err(SimulationError::InvalidSamplerParameter {
            name: "gamma_cap",
            value: gamma_cap,
        });
    }
    let g = sample_gamma(rng, PANDEMIC_K).min(gamma_cap);
    Ok(g / gamma_cap * max_drop)
}

pub fn black_swan_severity(rng: &mut Rng, max_drop: f64) -> Result<f64, SimulationError> {
    sample_neg_binomial_severity(rng, BLACK_SWAN_R, BLACK_SWAN_P, max_drop)
}

pub fn bull_severity(rng: &mut Rng, max_gain: f64) -> Result<f64, SimulationError> {
    sample_binomial_severity(rng, BULL_N, BULL_P, max_gain)
}

/// Severity of a triggered downside shock under the configured model.
pub fn downside_severity(
    config: &SimulationConfig,
    shock: DownsideShock,
    rng: &mut Rng,
) -> Result<f64, SimulationError> {
    let cap = config.magnitude_caps.downside(shock);
    if config.severity_model == SeverityModel::Uniform {
        return Ok(rng.uniform() * cap);
    }

    match shock {
        DownsideShock::Recession => recession_severity(rng, cap),
        DownsideShock::War => war_severity(rng, cap),
        DownsideShock::Pandemic => pandemic_severity(rng, cap, config.gamma_cap),
        DownsideShock::BlackSwan => black_swan_severity(rng, cap),
    }
}

pub fn bull_gain(config: &SimulationConfig, rng: &mut Rng) -> Result<f64, SimulationError> {
    let cap = config.magnitude_caps.bull;
    match config.severity_model {
        SeverityModel::Uniform => Ok(rng.uniform() * cap),
        SeverityModel::Distributional => bull_severity(rng, cap),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{any, prop_assert, proptest};

    #[test]
    fn pandemic_severity_saturates_at_cap() {
        // A tiny gamma cap makes almost every draw saturate.
        let mut rng = Rng::new(17);
        let saturated = (0..1000)
            .filter(|_| pandemic_severity(&mut rng, 0.06, 1e-9).unwrap() == 0.06)
            .count();
        assert!(saturated > 990, "only {saturated} draws saturated");
    }

    #[test]
    fn pandemic_severity_rejects_non_positive_cap() {
        let mut rng = Rng::new(17);
        assert!(pandemic_severity(&mut rng, 0.06, 0.0).is_err());
        assert!(pandemic_severity(&mut rng, 0.06, f64::NAN).is_err());
    }

    #[test]
    fn zero_caps_give_zero_severity() {
        let mut config = SimulationConfig::default();
        config.magnitude_caps.recession = 0.0;
        config.magnitude_caps.war = 0.0;
        config.magnitude_caps.pandemic = 0.0;
        config.magnitude_caps.black_swan = 0.0;
        config.magnitude_caps.bull = 0.0;
        let mut rng = Rng::new(99);
        for shock in DownsideShock::ALL {
            assert_eq!(downside_severity(&config, shock, &mut rng).unwrap(), 0.0);
        }
        assert_eq!(bull_gain(&config, &mut rng).unwrap(), 0.0);
    }

    #[test]
    fn war_mean_severity_matches_binomial_share() {
        let mut rng = Rng::new(33);
        let draws = 50_000;
        let mean = (0..draws)
            .map(|_| war_severity(&mut rng, 1.0).unwrap())
            .sum::<f64>()
            / draws as f64;
        assert!((mean - WAR_P).abs() < 0.01, "war mean {mean}");
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_every_model_stays_within_its_cap(seed in any::<u64>(), uniform in any::<bool>()) {
            let mut config = SimulationConfig::default();
            if uniform {
                config.severity_model = SeverityModel::Uniform;
            }
            let mut rng = Rng::new(seed);
            for _ in 0..20 {
                for shock in DownsideShock::ALL {
                    let cap = config.magnitude_caps.downside(shock);
                    let sev = downside_severity(&config, shock, &mut rng).unwrap();
                    prop_assert!((0.0..=cap).contains(&sev), "{shock:?}: {sev} > {cap}");
                }
                let gain = bull_gain(&config, &mut rng).unwrap();
                prop_assert!((0.0..=config.magnitude_caps.bull).contains(&gain));
            }
        }
    }
}
