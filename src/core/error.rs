use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("invalid config field `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("invalid sampler parameter `{name}` = {value}")]
    InvalidSamplerParameter { name: &'static str, value: f64 },

    /// The negative-binomial sampler gave up before observing enough successes.
    #[error(
        "negative-binomial sampling exhausted: {successes_needed} successes at p = {p} not reached within {max_trials} trials"
    )]
    SamplingExhausted {
        successes_needed: u32,
        p: f64,
        max_trials: u32,
    },
}

impl SimulationError {
    pub(crate) fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_message_names_the_field() {
        let err = SimulationError::invalid_config("runs", "must be > 0");
        assert_eq!(err.to_string(), "invalid config field `runs`: must be > 0");
    }

    #[test]
    fn exhausted_message_reports_budget() {
        let err = SimulationError::SamplingExhausted {
            successes_needed: 4,
            p: 0.18,
            max_trials: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("4 successes"));
        assert!(msg.contains("within 10 trials"));
    }
}
