//! Kernel configuration: time grid and random seed.
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::SNNError;

/// The configuration of a simulation context.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KernelConfig {
    /// The computation step size (ms).
    pub resolution: f64,
    /// The number of tics per ms, the finest time unit of the kernel.
    pub tics_per_ms: f64,
    /// The seed from which the random number generators of the nodes are derived.
    pub rng_seed: u64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        KernelConfig {
            resolution: 0.1,
            tics_per_ms: 1000.0,
            rng_seed: 0,
        }
    }
}

impl KernelConfig {
    /// Create a new configuration with the given resolution (ms) and number of tics per ms.
    pub fn build(resolution: f64, tics_per_ms: f64, rng_seed: u64) -> Result<Self, SNNError> {
        let config = KernelConfig {
            resolution,
            tics_per_ms,
            rng_seed,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the resolution is positive and a whole number of tics.
    pub fn validate(&self) -> Result<(), SNNError> {
        if !(self.tics_per_ms.is_finite() && self.tics_per_ms > 0.0) {
            return Err(SNNError::InvalidParameter(format!(
                "tics_per_ms must be positive and finite, got {}",
                self.tics_per_ms
            )));
        }
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(SNNError::InvalidParameter(format!(
                "The resolution must be positive and finite, got {}",
                self.resolution
            )));
        }

        let tics = self.resolution * self.tics_per_ms;
        if tics.round() < 1.0 || (tics - tics.round()).abs() > 1e-9 * tics.max(1.0) {
            return Err(SNNError::InvalidParameter(format!(
                "The resolution ({} ms) must be a multiple of the tic ({} ms)",
                self.resolution,
                self.tic()
            )));
        }
        Ok(())
    }

    /// Returns the duration of a tic (ms).
    pub fn tic(&self) -> f64 {
        1.0 / self.tics_per_ms
    }

    /// Returns the absolute tolerance (ms) used to match times on the grid, half a tic.
    pub fn time_tolerance(&self) -> f64 {
        0.5 * self.tic()
    }

    /// Load a configuration from a JSON file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, SNNError> {
        let file = File::open(path).map_err(|e| SNNError::IOError(e.to_string()))?;
        let reader = BufReader::new(file);
        let config: KernelConfig =
            serde_json::from_reader(reader).map_err(|e| SNNError::IOError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
