use crate::battery::DEFAULT_DECAY_STEP_PERCENT;
use crate::error::ConfigError;
use crate::sector::{SectorSeed, FULL_CHARGE_PERCENT};
use crate::transition::DEFAULT_LOW_BATTERY_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

const DEFAULT_DECAY_INTERVAL_MS: u64 = 5_000;
const DEFAULT_ALARM_INTERVAL_MS: u64 = 30_000;
const DEFAULT_HISTORY_DISPLAY_LIMIT: usize = 10;

/// Engine configuration. Every field has a default, so a partial JSON file
/// only needs to name what it overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    pub low_battery_threshold: u8,
    pub decay_interval_ms: u64,
    pub decay_step_percent: u8,
    pub alarm_interval_ms: u64,
    pub alarm_injection_enabled: bool,
    pub rng_seed: Option<u64>,
    pub seed_sectors: Vec<SectorSeed>,
    pub history_display_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            low_battery_threshold: DEFAULT_LOW_BATTERY_THRESHOLD,
            decay_interval_ms: DEFAULT_DECAY_INTERVAL_MS,
            decay_step_percent: DEFAULT_DECAY_STEP_PERCENT,
            alarm_interval_ms: DEFAULT_ALARM_INTERVAL_MS,
            alarm_injection_enabled: true,
            rng_seed: None,
            seed_sectors: Vec::new(),
            history_display_limit: DEFAULT_HISTORY_DISPLAY_LIMIT,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.low_battery_threshold > FULL_CHARGE_PERCENT {
            return Err(ConfigError::Invalid(format!(
                "low_battery_threshold {} exceeds {}",
                self.low_battery_threshold, FULL_CHARGE_PERCENT
            )));
        }
        if self.decay_interval_ms == 0 || self.alarm_interval_ms == 0 {
            return Err(ConfigError::Invalid("intervals must be non-zero".into()));
        }
        if self.alarm_interval_ms <= self.decay_interval_ms {
            return Err(ConfigError::Invalid(format!(
                "alarm_interval_ms {} must be longer than decay_interval_ms {}",
                self.alarm_interval_ms, self.decay_interval_ms
            )));
        }
        if self.decay_step_percent == 0 {
            return Err(ConfigError::Invalid("decay_step_percent must be at least 1".into()));
        }
        Ok(())
    }

    /// Demo registry of `count` sectors with numbered addresses.
    pub fn with_generated_sectors(mut self, count: usize) -> Self {
        self.seed_sectors = (1..=count)
            .map(|n| SectorSeed::new(format!("Sector street {n}"), format!("{n:03}")))
            .collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.low_battery_threshold, 20);
        assert!(config.alarm_interval_ms > config.decay_interval_ms);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(r#"{"decay_interval_ms": 100, "alarm_interval_ms": 400}"#).unwrap();
        assert_eq!(config.decay_interval_ms, 100);
        assert_eq!(config.alarm_interval_ms, 400);
        assert_eq!(config.low_battery_threshold, 20);
        assert!(config.seed_sectors.is_empty());
    }

    #[test]
    fn test_seed_sectors_from_json() {
        let config = EngineConfig::from_json(
            r#"{"seed_sectors": [{"address": "1 Quay St", "number": "A1"}, {"address": "2 Quay St", "number": "A2", "battery_percent": 15}]}"#,
        )
        .unwrap();
        assert_eq!(config.seed_sectors.len(), 2);
        assert_eq!(config.seed_sectors[1].battery_percent, Some(15));
    }

    #[test]
    fn test_alarm_interval_must_exceed_decay() {
        let err = EngineConfig::from_json(r#"{"decay_interval_ms": 1000, "alarm_interval_ms": 1000}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(EngineConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_generated_sectors() {
        let config = EngineConfig::default().with_generated_sectors(3);
        assert_eq!(config.seed_sectors.len(), 3);
        assert_eq!(config.seed_sectors[2].number, "003");
    }
}
