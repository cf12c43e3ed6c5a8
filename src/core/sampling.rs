use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

use super::error::SimulationError;

/// Trial budget for the negative-binomial sampler. With the fixed shock
/// parameters the expected trial count is below 25, so this is never reached
/// unless `p` is pathologically small.
pub const NEG_BINOMIAL_MAX_TRIALS: u32 = 1_000_000;

pub(crate) fn derive_seed(base_seed: u64, run_index: u64) -> u64 {
    let mixed = base_seed ^ run_index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    splitmix64(mixed)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Seeded random source owned by a single run.
pub struct Rng {
    inner: StdRng,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    pub fn for_run(base_seed: u64, run_index: u64) -> Self {
        Self::new(derive_seed(base_seed, run_index))
    }

    /// Uniform draw in [0, 1); never returns exactly 1.0.
    pub fn uniform(&mut self) -> f64 {
        self.inner.gen_range(0.0..1.0)
    }

    pub fn standard_normal(&mut self) -> f64 {
        StandardNormal.sample(&mut self.inner)
    }
}

/// Exponential(1) by inverse transform: `-ln(1 - u)`.
pub fn sample_exponential(rng: &mut Rng) -> f64 {
    let u = rng.uniform();
    -(1.0 - u).ln()
}

/// Gamma(k, 1) as the sum of `k` independent Exponential(1) draws.
pub fn sample_gamma(rng: &mut Rng, k: u32) -> f64 {
    (0..k).map(|_| sample_exponential(rng)).sum()
}

/// Fraction of `n` Bernoulli(`p`) successes, scaled into `[0, max_value]`.
pub fn sample_binomial_severity(
    rng: &mut Rng,
    n: u32,
    p: f64,
    max_value: f64,
) -> Result<f64, SimulationError> {
    if n == 0 {
        return Err(SimulationError::InvalidSamplerParameter {
            name: "n",
            value: 0.0,
        });
    }
    check_probability("p", p)?;

    let successes = (0..n).filter(|_| rng.uniform() < p).count();
    Ok(successes as f64 / n as f64 * max_value)
}

/// Failures observed before the `r`-th success, mapped to
/// `min(failures / (failures + r), 1) * max_value`.
pub fn sample_neg_binomial_severity(
    rng: &mut Rng,
    r: u32,
    p: f64,
    max_value: f64,
) -> Result<f64, SimulationError> {
    let failures = neg_binomial_failures(rng, r, p, NEG_BINOMIAL_MAX_TRIALS)?;
    let ratio = (failures as f64 / (failures as f64 + r as f64)).min(1.0);
    Ok(ratio * max_value)
}

fn neg_binomial_failures(
    rng: &mut Rng,
    r: u32,
    p: f64,
    max_trials: u32,
) -> Result<u32, SimulationError> {
    if r == 0 {
        return Err(SimulationError::InvalidSamplerParameter {
            name: "r",
            value: 0.0,
        });
    }
    if p.is_nan() || p <= 0.0 || p > 1.0 {
        return Err(SimulationError::InvalidSamplerParameter { name: "p", value: p });
    }

    let mut successes = 0_u32;
    let mut failures = 0_u32;
    for _ in 0..max_trials {
        if rng.uniform() < p {
            successes += 1;
            if successes == r {
                return Ok(failures);
            }
        } else {
            failures += 1;
        }
    }

    Err(SimulationError::SamplingExhausted {
        successes_needed: r,
        p,
        max_trials,
    })
}

fn check_probability(name: &'static str, p: f64) -> Result<(), SimulationError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(SimulationError::InvalidSamplerParameter { name, value: p })
    }
}
