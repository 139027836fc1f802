//! Configuration for grid interpolation.

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// Configuration for the interpolators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// How many grid steps outside `[0, 1]` a fractional index may reach
    /// before extrapolation becomes a fatal error.
    pub max_extrapolation_steps: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            max_extrapolation_steps: 1.0,
        }
    }
}

impl GridConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("MOD_MAX_EXTRAPOLATION_STEPS") {
            if let Ok(steps) = val.parse() {
                config.max_extrapolation_steps = steps;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.max_extrapolation_steps.is_finite() || self.max_extrapolation_steps < 0.0 {
            return Err(GridError::ConfigError(format!(
                "max_extrapolation_steps must be a non-negative number, got {}",
                self.max_extrapolation_steps
            )));
        }
        Ok(())
    }
}
