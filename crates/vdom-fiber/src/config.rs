use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SchedulerError, SchedulerResult};

/// Timing knobs for the [`Scheduler`](crate::Scheduler).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Time one slice may spend on diff units, nominally one display frame.
    pub frame_budget: Duration,
    /// The fallback timer fires after `fallback_factor` frame budgets when
    /// no frame callback arrived.
    pub fallback_factor: u32,
    /// Timeout hint passed with idle-time requests.
    pub idle_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let frame_budget = Duration::from_secs(1) / 30;
        Self {
            frame_budget,
            fallback_factor: 2,
            idle_timeout: frame_budget,
        }
    }
}

impl SchedulerConfig {
    /// A config with the given frame budget and derived defaults.
    pub fn with_frame_budget(frame_budget: Duration) -> Self {
        Self {
            frame_budget,
            idle_timeout: frame_budget,
            ..Default::default()
        }
    }

    /// Delay of the fallback timer armed alongside each frame request.
    pub fn fallback_delay(&self) -> Duration {
        self.frame_budget.saturating_mul(self.fallback_factor)
    }

    pub fn validate(&self) -> SchedulerResult<()> {
        if self.frame_budget.is_zero() {
            return Err(SchedulerError::InvalidConfig(
                "frame_budget must be positive".into(),
            ));
        }
        if self.fallback_factor == 0 {
            return Err(SchedulerError::InvalidConfig(
                "fallback_factor must be at least 1".into(),
            ));
        }
        if self.frame_budget.checked_mul(self.fallback_factor).is_none() {
            return Err(SchedulerError::InvalidConfig(format!(
                "fallback delay of {} x {:?} overflows",
                self.fallback_factor, self.frame_budget
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.frame_budget, Duration::from_nanos(33_333_333));
        assert_eq!(config.fallback_delay(), Duration::from_nanos(66_666_666));
        assert_eq!(config.idle_timeout, config.frame_budget);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let zero = SchedulerConfig::with_frame_budget(Duration::ZERO);
        assert!(matches!(zero.validate(), Err(SchedulerError::InvalidConfig(_))));

        let no_fallback = SchedulerConfig {
            fallback_factor: 0,
            ..Default::default()
        };
        assert!(no_fallback.validate().is_err());
    }

    #[test]
    fn overflowing_fallback_delay_is_rejected() {
        let config: SchedulerConfig = toml::from_str(
            "fallback_factor = 4000000000\n[frame_budget]\nsecs = 10000000000\nnanos = 0\n",
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(SchedulerError::InvalidConfig(_))
        ));
        assert_eq!(config.fallback_delay(), Duration::MAX);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: SchedulerConfig = toml::from_str("fallback_factor = 3\n").unwrap();
        assert_eq!(config.fallback_factor, 3);
        assert_eq!(config.frame_budget, SchedulerConfig::default().frame_budget);
    }

    #[test]
    fn json_roundtrip() {
        let config = SchedulerConfig::with_frame_budget(Duration::from_millis(8));
        let json = serde_json::to_string(&config).unwrap();
        let back: SchedulerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
