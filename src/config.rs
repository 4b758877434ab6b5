use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::RigError;

/// Hard bounds on the requested test parameters.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ConfigLimits {
    pub min_sampling_rate_hz: u32,
    pub max_sampling_rate_hz: u32,
    pub min_test_duration_ms: u32,
    pub max_test_duration_ms: u32,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        // NI myDAQ tops out at 200 kS/s per channel.
        Self {
            min_sampling_rate_hz: 1,
            max_sampling_rate_hz: 200_000,
            min_test_duration_ms: 1,
            max_test_duration_ms: 600_000,
        }
    }
}

/// Test configuration, loaded once from `input.json` at run start and
/// passed by shared reference into the pipeline. Never mutated by the core.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestConfig {
    pub sampling_rate_hz: u32,
    pub test_duration_ms: u32,
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,
    #[serde(default = "default_start_threshold_fraction")]
    pub start_threshold_fraction: f64,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default)]
    pub limits: ConfigLimits,
}

fn default_smoothing_window() -> usize {
    5
}

fn default_start_threshold_fraction() -> f64 {
    0.05
}

fn default_output_dir() -> String {
    ".".to_owned()
}

impl TestConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: TestConfig =
            serde_json::from_str(&contents).map_err(|source| RigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        info!(
            "loaded test configuration from {}: {} Hz for {} ms",
            path.display(),
            config.sampling_rate_hz,
            config.test_duration_ms
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RigError> {
        let limits = &self.limits;
        if self.sampling_rate_hz < limits.min_sampling_rate_hz
            || self.sampling_rate_hz > limits.max_sampling_rate_hz
        {
            return Err(RigError::Config(format!(
                "sampling rate {} Hz outside [{}, {}]",
                self.sampling_rate_hz, limits.min_sampling_rate_hz, limits.max_sampling_rate_hz
            )));
        }
        if self.test_duration_ms < limits.min_test_duration_ms
            || self.test_duration_ms > limits.max_test_duration_ms
        {
            return Err(RigError::Config(format!(
                "test duration {} ms outside [{}, {}]",
                self.test_duration_ms, limits.min_test_duration_ms, limits.max_test_duration_ms
            )));
        }
        if self.smoothing_window == 0 {
            return Err(RigError::Config("smoothing window must be >= 1".into()));
        }
        if !(0.0..1.0).contains(&self.start_threshold_fraction) {
            return Err(RigError::Config(format!(
                "start threshold fraction {} outside [0, 1)",
                self.start_threshold_fraction
            )));
        }
        Ok(())
    }

    /// Number of samples in one burst. Truncates toward zero, matching the
    /// acquisition hardware's integer sample count.
    pub fn num_samples(&self) -> usize {
        (self.sampling_rate_hz as u64 * self.test_duration_ms as u64 / 1000) as usize
    }

    pub fn test_duration_s(&self) -> f64 {
        self.test_duration_ms as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> TestConfig {
        TestConfig {
            sampling_rate_hz: 10_000,
            test_duration_ms: 500,
            smoothing_window: 5,
            start_threshold_fraction: 0.05,
            output_dir: ".".into(),
            limits: ConfigLimits::default(),
        }
    }

    #[test]
    fn num_samples_truncates_toward_zero() {
        let mut config = base_config();
        config.sampling_rate_hz = 3;
        config.test_duration_ms = 500;
        // 3 * 500 / 1000 = 1.5 -> 1
        assert_eq!(config.num_samples(), 1);
        config.sampling_rate_hz = 10_000;
        assert_eq!(config.num_samples(), 5000);
    }

    #[test]
    fn duration_in_seconds() {
        let config = base_config();
        assert!((config.test_duration_s() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rejects_out_of_bounds_rate() {
        let mut config = base_config();
        config.sampling_rate_hz = 1_000_000;
        assert!(matches!(config.validate(), Err(RigError::Config(_))));
    }

    #[test]
    fn parses_minimal_json_with_defaults() {
        let json = r#"{"sampling_rate_hz": 20000, "test_duration_ms": 250}"#;
        let config: TestConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.smoothing_window, 5);
        assert!((config.start_threshold_fraction - 0.05).abs() < 1e-12);
        assert_eq!(config.num_samples(), 5000);
    }
}
