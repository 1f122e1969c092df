//! Engine configuration
//!
//! Heuristic coefficients that have no normative closed form live here so
//! they can be tuned per project without touching the formulas. Defaults
//! reproduce the reference constants. A configuration is usually loaded from
//! an `engine.toml` file:
//!
//! ```toml
//! [masking]
//! base_limit = 0.99
//! per_device_penalty = 0.01
//!
//! [category]
//! cat4 = 0.9
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading the configuration file
    #[error("I/O error: {0}")]
    Io(String),

    /// TOML parsing error
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// A coefficient is outside its permitted range
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fault-masking upper limit coefficients
    pub masking: MaskingConfig,
    /// Test-channel diagnostic coverage coefficients
    pub test_channel: TestChannelConfig,
    /// PFHd formula defaults
    pub pfhd: PfhdConfig,
    /// Category advisor confidence weights
    pub category: CategoryWeights,
}

/// Coefficients of the fault-masking upper limit L(n, r)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskingConfig {
    /// Limit for a single series device at nominal demand
    pub base_limit: f64,
    /// Reduction per series device beyond the first
    pub per_device_penalty: f64,
    /// Cap on the cumulative per-device reduction
    pub max_penalty: f64,
    /// Demand rates below this are considered low demand
    pub low_demand_threshold: f64,
    /// Scale applied to the limit at low demand
    pub low_demand_scale: f64,
    /// Lowest limit ever returned
    pub floor: f64,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            base_limit: 0.99,
            per_device_penalty: 0.01,
            max_penalty: 0.15,
            low_demand_threshold: 0.1,
            low_demand_scale: 0.9,
            floor: 0.5,
        }
    }
}

/// Coefficients of the test-channel DC estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestChannelConfig {
    /// Upper bound for DCtest
    pub max_dc: f64,
    /// DCtest = r * fallback_factor when no test parameters are given
    pub fallback_factor: f64,
}

impl Default for TestChannelConfig {
    fn default() -> Self {
        Self {
            max_dc: 0.99,
            fallback_factor: 0.1,
        }
    }
}

/// Defaults used by the redundant-architecture PFHd formulas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PfhdConfig {
    /// β used when no device of a redundant subsystem specifies one
    pub default_beta: f64,
    /// Proof-test interval T1 (hours)
    pub proof_test_interval_hours: f64,
    /// Diagnostic test interval T2 (hours)
    pub diagnostic_test_interval_hours: f64,
}

impl Default for PfhdConfig {
    fn default() -> Self {
        Self {
            default_beta: 0.1,
            proof_test_interval_hours: 8760.0, // 1 year
            diagnostic_test_interval_hours: 24.0,
        }
    }
}

/// Confidence attached to each category advisor rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryWeights {
    pub baseline: f64,
    pub cat1: f64,
    pub cat2: f64,
    pub cat3: f64,
    pub cat4: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            baseline: 0.3,
            cat1: 0.6,
            cat2: 0.7,
            cat3: 0.8,
            cat4: 0.9,
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration from a TOML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a configuration from a TOML string
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig =
            toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every coefficient is inside its permitted range
    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.masking;
        check_fraction("masking.base_limit", m.base_limit)?;
        check_fraction("masking.floor", m.floor)?;
        check_fraction("masking.per_device_penalty", m.per_device_penalty)?;
        check_fraction("masking.max_penalty", m.max_penalty)?;
        check_fraction("masking.low_demand_threshold", m.low_demand_threshold)?;
        check_fraction("masking.low_demand_scale", m.low_demand_scale)?;
        if m.floor > m.base_limit {
            return Err(ConfigError::Validation(format!(
                "masking.floor ({}) exceeds masking.base_limit ({})",
                m.floor, m.base_limit
            )));
        }

        check_fraction("test_channel.max_dc", self.test_channel.max_dc)?;
        check_fraction(
            "test_channel.fallback_factor",
            self.test_channel.fallback_factor,
        )?;

        check_fraction("pfhd.default_beta", self.pfhd.default_beta)?;
        check_positive(
            "pfhd.proof_test_interval_hours",
            self.pfhd.proof_test_interval_hours,
        )?;
        check_positive(
            "pfhd.diagnostic_test_interval_hours",
            self.pfhd.diagnostic_test_interval_hours,
        )?;

        let w = &self.category;
        for (name, value) in [
            ("category.baseline", w.baseline),
            ("category.cat1", w.cat1),
            ("category.cat2", w.cat2),
            ("category.cat3", w.cat3),
            ("category.cat4", w.cat4),
        ] {
            check_fraction(name, value)?;
        }

        Ok(())
    }
}

fn check_fraction(name: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )))
    }
}

fn check_positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "{} must be positive, got {}",
            name, value
        )))
    }
}
