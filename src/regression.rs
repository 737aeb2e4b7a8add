//! Accuracy regression of the stepwise integration against the closed-form response.
//!
//! A precise Poisson spike train is sampled once, then replayed into a fresh neuron at several
//! resolutions h = 2^k. With exact integration, the membrane potential at the end of the simulation
//! is independent of h and agrees with the closed form up to machine precision.
use log;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::alpha::response::{dc_response, evaluate};
use crate::core::neuron::NeuronParameters;
use crate::core::spike::SpikeTrain;
use crate::error::SNNError;
use crate::kernel::config::KernelConfig;
use crate::kernel::connection::SynapseSpec;
use crate::kernel::context::SimulationContext;

/// The configuration of the accuracy regression.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegressionConfig {
    /// The kernel used to sample the spike train; its tics and seed are kept for the replays.
    pub kernel: KernelConfig,
    /// The parameters of the replay neuron.
    pub neuron: NeuronParameters,
    /// The simulated duration (ms).
    pub duration: f64,
    /// The rate of the Poisson generator (Hz).
    pub rate: f64,
    /// The weight of the replayed spikes (pA).
    pub weight: f64,
    /// The delay of the replayed spikes (ms).
    pub delay: f64,
    /// The smallest resolution is 2^min_exponent ms.
    pub min_exponent: i32,
    /// The resolutions are 2^k ms for k = min_exponent, min_exponent + 2, ..., below max_exponent.
    pub max_exponent: i32,
    /// The absolute tolerance on the membrane potential (mV).
    pub tolerance: f64,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        RegressionConfig {
            kernel: KernelConfig {
                resolution: 1.0,
                tics_per_ms: 1024.0,
                rng_seed: 0,
            },
            neuron: NeuronParameters::build(10.0, 0.3, 250.0, 0.0, 1500.0, 0.0)
                .expect("The default replay neuron parameters are valid"),
            duration: 6.0,
            rate: 16000.0,
            weight: 65.0,
            delay: 1.0,
            min_exponent: -10,
            max_exponent: 2,
            tolerance: 1e-12,
        }
    }
}

impl RegressionConfig {
    /// Check the configuration, the neuron parameters being validated on construction.
    pub fn validate(&self) -> Result<(), SNNError> {
        self.kernel.validate()?;
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(SNNError::InvalidParameter(format!(
                "The duration must be positive, got {}",
                self.duration
            )));
        }
        if self.min_exponent >= self.max_exponent {
            return Err(SNNError::InvalidParameter(format!(
                "The exponent range [{}, {}) is empty",
                self.min_exponent, self.max_exponent
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(SNNError::InvalidParameter(format!(
                "The tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }

    /// Returns the resolutions at which the spike train is replayed.
    pub fn resolutions(&self) -> Vec<f64> {
        (self.min_exponent..self.max_exponent)
            .step_by(2)
            .map(|exponent| 2.0_f64.powi(exponent))
            .collect()
    }

    /// Load a configuration from a JSON file.
    /// Unreadable files and invalid JSON yield `IOError`, invalid parameters are reported as such.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, SNNError> {
        let file = File::open(path).map_err(|e| SNNError::IOError(e.to_string()))?;
        let reader = BufReader::new(file);
        let mut value: Value =
            serde_json::from_reader(reader).map_err(|e| SNNError::IOError(e.to_string()))?;

        // The neuron section is validated on its own, to keep the validation error
        let neuron = match value.as_object_mut().and_then(|map| map.remove("neuron")) {
            Some(neuron) => Some(NeuronParameters::from_value(neuron)?),
            None => None,
        };
        let mut config: RegressionConfig = serde_json::from_value(value)
            .map_err(|e| SNNError::InvalidParameter(e.to_string()))?;
        if let Some(neuron) = neuron {
            config.neuron = neuron;
        }
        config.validate()?;
        Ok(config)
    }
}

/// The outcome of a replay at a single resolution.
#[derive(Debug, PartialEq, Clone, Copy, Serialize)]
pub struct ResolutionReport {
    /// The resolution (ms).
    pub resolution: f64,
    /// The simulated membrane potential at the end of the replay (mV).
    pub potential: f64,
    /// The closed-form membrane potential (mV).
    pub reference: f64,
}

impl ResolutionReport {
    /// Returns the absolute deviation from the closed form.
    pub fn error(&self) -> f64 {
        (self.potential - self.reference).abs()
    }
}

/// The outcome of the regression.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct RegressionReport {
    /// The sampled spike times (ms).
    pub spike_times: Vec<f64>,
    pub resolutions: Vec<ResolutionReport>,
}

impl RegressionReport {
    /// Returns the largest deviation from the closed form over all resolutions.
    pub fn max_error(&self) -> f64 {
        self.resolutions
            .iter()
            .map(|report| report.error())
            .fold(0.0, f64::max)
    }

    /// Returns true if every replay agrees with the closed form within the tolerance.
    pub fn passed(&self, tolerance: f64) -> bool {
        self.resolutions
            .iter()
            .all(|report| report.error() <= tolerance)
    }
}

/// Returns the spike times recorded from a precise Poisson generator over the configured duration.
pub fn sample_spike_times(config: &RegressionConfig) -> Result<Vec<f64>, SNNError> {
    let mut context = SimulationContext::new(config.kernel.clone())?;
    let generator = context.create("poisson_generator_ps", json!({ "rate": config.rate }))?;
    let recorder = context.create("spike_recorder", json!({}))?;
    context.connect(generator, recorder, &SynapseSpec::default())?;
    context.simulate(config.duration)?;

    let times = context.get(recorder, "events", Some("times"))?;
    let times: Vec<f64> = serde_json::from_value(times)
        .map_err(|e| SNNError::UnknownField(format!("events.times: {}", e)))?;
    log::info!(
        "{} spikes sampled in {} ms (expected number of spikes is {})",
        times.len(),
        config.duration,
        config.rate / 1000.0 * config.duration
    );
    Ok(times)
}

/// Returns the closed-form membrane potential at the end of the simulation.
pub fn reference_potential(config: &RegressionConfig, spike_times: &[f64]) -> Result<f64, SNNError> {
    let spike_train = SpikeTrain::from_times(spike_times, config.weight, config.delay)?;
    let sample = evaluate(&spike_train, config.duration, &config.neuron, config.weight)?;
    Ok(config.neuron.e_l()
        + dc_response(config.duration, &config.neuron, config.neuron.i_e())
        + sample.potential)
}

/// Replay the spike times into a fresh neuron at the given resolution and returns the final membrane potential.
pub fn replay(
    config: &RegressionConfig,
    spike_times: &[f64],
    resolution: f64,
) -> Result<f64, SNNError> {
    let kernel = KernelConfig::build(
        resolution,
        config.kernel.tics_per_ms,
        config.kernel.rng_seed,
    )?;
    let mut context = SimulationContext::new(kernel)?;

    let generator = context.create(
        "spike_generator",
        json!({ "start": 0.0, "spike_times": spike_times, "precise_times": true }),
    )?;
    let mut neuron_params = json!(config.neuron);
    neuron_params["V_m"] = json!(config.neuron.e_l());
    let neuron = context.create("iaf_psc_alpha_ps", neuron_params)?;
    context.connect(
        generator,
        neuron,
        &SynapseSpec::new(config.weight, config.delay),
    )?;
    context.simulate(config.duration)?;

    let potential = context.get(neuron, "V_m", None)?;
    potential
        .as_f64()
        .ok_or_else(|| SNNError::UnknownField(format!("V_m: {}", potential)))
}

/// Run the regression: sample the spike train, then replay it at every configured resolution.
pub fn run_regression(config: &RegressionConfig) -> Result<RegressionReport, SNNError> {
    config.validate()?;
    let spike_times = sample_spike_times(config)?;
    run_regression_with(config, spike_times)
}

/// Run the regression on the provided spike times.
pub fn run_regression_with(
    config: &RegressionConfig,
    spike_times: Vec<f64>,
) -> Result<RegressionReport, SNNError> {
    config.validate()?;
    let reference = reference_potential(config, &spike_times)?;

    let resolutions = config
        .resolutions()
        .into_iter()
        .map(|resolution| {
            let potential = replay(config, &spike_times, resolution)?;
            let report = ResolutionReport {
                resolution,
                potential,
                reference,
            };
            log::info!(
                "h = {} ms: V_m = {} mV (closed form: {} mV, error: {:e} mV)",
                resolution,
                potential,
                reference,
                report.error()
            );
            Ok(report)
        })
        .collect::<Result<Vec<ResolutionReport>, SNNError>>()?;

    Ok(RegressionReport {
        spike_times,
        resolutions,
    })
}
