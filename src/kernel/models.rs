//! The node models provided by the simulation context.
//!
//! Every model is created from a JSON dictionary of parameters using the model's parameter names.
//! Unknown keys are rejected.
use rand::distributions::{Bernoulli, Distribution};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

use crate::alpha::neuron::AlphaNeuron;
use crate::core::neuron::NeuronParametersData;
use crate::core::spike::PoissonProcess;
use crate::core::utils::{ceil_to_grid, num_steps};
use crate::core::DEGENERACY_TOLERANCE;
use crate::error::SNNError;

/// The available node models.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Model {
    IafPscAlphaPs,
    PoissonGeneratorPs,
    SpikeGenerator,
    DcGenerator,
    SpikeRecorder,
    Multimeter,
    SpikeDilutor,
}

impl Model {
    /// Returns the model with the given name.
    pub fn from_name(name: &str) -> Result<Self, SNNError> {
        match name {
            "iaf_psc_alpha_ps" => Ok(Model::IafPscAlphaPs),
            "poisson_generator_ps" => Ok(Model::PoissonGeneratorPs),
            "spike_generator" => Ok(Model::SpikeGenerator),
            "dc_generator" => Ok(Model::DcGenerator),
            "spike_recorder" => Ok(Model::SpikeRecorder),
            "multimeter" => Ok(Model::Multimeter),
            "spike_dilutor" => Ok(Model::SpikeDilutor),
            _ => Err(SNNError::UnknownModel(name.to_string())),
        }
    }

    /// Returns the model name.
    pub fn name(&self) -> &'static str {
        match self {
            Model::IafPscAlphaPs => "iaf_psc_alpha_ps",
            Model::PoissonGeneratorPs => "poisson_generator_ps",
            Model::SpikeGenerator => "spike_generator",
            Model::DcGenerator => "dc_generator",
            Model::SpikeRecorder => "spike_recorder",
            Model::Multimeter => "multimeter",
            Model::SpikeDilutor => "spike_dilutor",
        }
    }

    /// Returns true if the model emits spikes.
    pub fn is_spike_source(&self) -> bool {
        matches!(
            self,
            Model::PoissonGeneratorPs | Model::SpikeGenerator | Model::SpikeDilutor
        )
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Deserialize model parameters from a JSON dictionary, null standing for the empty dictionary.
fn parse_params<T: for<'de> Deserialize<'de>>(model: Model, params: Value) -> Result<T, SNNError> {
    let params = match params {
        Value::Null => Value::Object(Map::new()),
        params => params,
    };
    serde_json::from_value(params)
        .map_err(|e| SNNError::InvalidParameter(format!("{}: {}", model, e)))
}

fn check_window(start: f64, stop: Option<f64>) -> Result<(), SNNError> {
    if !start.is_finite() {
        return Err(SNNError::InvalidParameter(format!(
            "start must be finite, got {}",
            start
        )));
    }
    if let Some(stop) = stop {
        if stop.is_nan() || stop < start {
            return Err(SNNError::InvalidParameter(format!(
                "stop ({}) must not precede start ({})",
                stop, start
            )));
        }
    }
    Ok(())
}

/// Returns the part of the step (t0, t1] within the activity window (start, stop], if not empty.
fn active_part(t0: f64, t1: f64, start: f64, stop: Option<f64>) -> Option<(f64, f64)> {
    let lo = t0.max(start);
    let hi = stop.map_or(t1, |stop| t1.min(stop));
    match lo < hi {
        true => Some((lo, hi)),
        false => None,
    }
}

/// Build a neuron of model iaf_psc_alpha_ps.
/// The dictionary holds the neuron parameters and optionally the initial membrane potential V_m.
/// The inhibitory time constant tau_syn_in is accepted if it matches the synaptic time constant.
pub fn build_neuron(id: usize, params: Value, resolution: f64) -> Result<AlphaNeuron, SNNError> {
    let mut params = match params {
        Value::Null => Map::new(),
        Value::Object(map) => map,
        other => {
            return Err(SNNError::InvalidParameter(format!(
                "{}: expected a dictionary, got {}",
                Model::IafPscAlphaPs,
                other
            )))
        }
    };

    let v_m = match params.remove("V_m") {
        Some(value) => Some(value.as_f64().ok_or_else(|| {
            SNNError::InvalidParameter(format!("V_m must be a number, got {}", value))
        })?),
        None => None,
    };
    let tau_syn_in = match params.remove("tau_syn_in") {
        Some(value) => Some(value.as_f64().ok_or_else(|| {
            SNNError::InvalidParameter(format!("tau_syn_in must be a number, got {}", value))
        })?),
        None => None,
    };

    // Parsed then validated separately, so that degenerate time constants are reported as such
    let data: NeuronParametersData = parse_params(Model::IafPscAlphaPs, Value::Object(params))?;
    let neuron_params = data.build()?;
    if let Some(tau_syn_in) = tau_syn_in {
        let tau_syn = neuron_params.tau_syn();
        if (tau_syn_in - tau_syn).abs() > DEGENERACY_TOLERANCE * tau_syn {
            return Err(SNNError::InvalidParameter(format!(
                "tau_syn_in ({}) must match tau_syn ({})",
                tau_syn_in, tau_syn
            )));
        }
    }

    match v_m {
        Some(v_m) if !v_m.is_finite() => Err(SNNError::InvalidParameter(format!(
            "V_m must be finite, got {}",
            v_m
        ))),
        Some(v_m) => Ok(AlphaNeuron::new_from(id, neuron_params, resolution, v_m)),
        None => Ok(AlphaNeuron::new(id, neuron_params, resolution)),
    }
}

/// Returns the status dictionary of a neuron.
pub fn neuron_status(neuron: &AlphaNeuron) -> Value {
    let mut status = match serde_json::to_value(neuron.params()) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    status.insert("model".to_string(), json!(Model::IafPscAlphaPs.name()));
    status.insert("V_m".to_string(), json!(neuron.potential()));
    status.insert("I_syn".to_string(), json!(neuron.synaptic_current()));
    status.insert("t".to_string(), json!(neuron.time()));
    Value::Object(status)
}

/// The parameters of a precise Poisson generator.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoissonGeneratorParams {
    /// The mean rate (Hz).
    pub rate: f64,
    /// The generator is active after start (ms).
    #[serde(default)]
    pub start: f64,
    /// The generator is active until stop (ms), forever if none.
    #[serde(default)]
    pub stop: Option<f64>,
    /// The dead time after each spike (ms).
    #[serde(default)]
    pub dead_time: f64,
}

/// A generator producing one independent Poisson spike train with exact spike times per target.
#[derive(Debug, Clone)]
pub struct PoissonGenerator {
    params: PoissonGeneratorParams,
    rng: ChaCha8Rng,
    /// The processes attached to the outgoing connections, by connection index.
    processes: Vec<(usize, PoissonProcess)>,
}

impl PoissonGenerator {
    /// Create a new generator. The random number generator is seeded from the kernel seed and the node ID.
    pub fn build(id: usize, params: Value, seed: u64) -> Result<Self, SNNError> {
        let params: PoissonGeneratorParams = parse_params(Model::PoissonGeneratorPs, params)?;
        check_window(params.start, params.stop)?;
        // Fails early for invalid rate or dead time
        PoissonProcess::build(params.rate, params.dead_time)?;

        Ok(PoissonGenerator {
            params,
            rng: ChaCha8Rng::seed_from_u64(seed.wrapping_add(id as u64)),
            processes: vec![],
        })
    }

    /// Attach a new independent process to an outgoing connection.
    pub fn add_target(&mut self, connection_index: usize) -> Result<(), SNNError> {
        let process = PoissonProcess::build(self.params.rate, self.params.dead_time)?;
        self.processes.push((connection_index, process));
        Ok(())
    }

    /// Returns the spikes emitted in the step (t0, t1], as (connection index, time) pairs.
    pub fn emit(&mut self, t0: f64, t1: f64) -> Vec<(usize, f64)> {
        let (lo, hi) = match active_part(t0, t1, self.params.start, self.params.stop) {
            Some(part) => part,
            None => return vec![],
        };
        let rng = &mut self.rng;
        self.processes
            .iter_mut()
            .flat_map(|(index, process)| {
                process
                    .advance(lo, hi, &mut *rng)
                    .into_iter()
                    .map(|time| (*index, time))
                    .collect::<Vec<(usize, f64)>>()
            })
            .collect()
    }

    pub fn status(&self) -> Value {
        let mut status = json!(self.params);
        status["model"] = json!(Model::PoissonGeneratorPs.name());
        status
    }
}

/// The parameters of a spike generator.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpikeGeneratorParams {
    /// The spike times (ms), sorted.
    #[serde(default)]
    pub spike_times: Vec<f64>,
    /// Emit the spike times as they are, instead of on the time grid.
    #[serde(default)]
    pub precise_times: bool,
    /// Round off-grid spike times up to the grid instead of rejecting them.
    #[serde(default)]
    pub allow_offgrid_times: bool,
    /// The generator is active after start (ms).
    #[serde(default)]
    pub start: f64,
    /// The generator is active until stop (ms), forever if none.
    #[serde(default)]
    pub stop: Option<f64>,
}

/// A generator replaying a list of spike times to all its targets.
#[derive(Debug, Clone)]
pub struct SpikeGenerator {
    params: SpikeGeneratorParams,
    /// The emission times, on the grid unless precise.
    times: Vec<f64>,
    /// The index of the next time to emit.
    next: usize,
}

impl SpikeGenerator {
    /// Create a new generator on the grid of the given step (ms).
    /// Off-grid times are rejected, unless precise or explicitly allowed (then rounded up to the grid).
    pub fn build(params: Value, step: f64, tolerance: f64) -> Result<Self, SNNError> {
        let params: SpikeGeneratorParams = parse_params(Model::SpikeGenerator, params)?;
        check_window(params.start, params.stop)?;

        if let Some(time) = params.spike_times.iter().find(|time| !time.is_finite()) {
            return Err(SNNError::InvalidParameter(format!(
                "Spike times must be finite, got {}",
                time
            )));
        }
        if !crate::core::spike::is_separated(&params.spike_times, 0.0) {
            return Err(SNNError::InvalidParameter(
                "Spike times must be sorted".to_string(),
            ));
        }

        let times = match params.precise_times {
            true => params.spike_times.clone(),
            false => params
                .spike_times
                .iter()
                .map(|&time| match num_steps(time, step, tolerance) {
                    Some(n) => Ok(n as f64 * step),
                    None if params.allow_offgrid_times => Ok(ceil_to_grid(time, step, tolerance)),
                    None => Err(SNNError::InvalidParameter(format!(
                        "Spike time {} is not on the grid of step {}",
                        time, step
                    ))),
                })
                .collect::<Result<Vec<f64>, SNNError>>()?,
        };

        Ok(SpikeGenerator {
            params,
            times,
            next: 0,
        })
    }

    /// Returns the times emitted in the step (t0, t1].
    pub fn emit(&mut self, t0: f64, t1: f64) -> Vec<f64> {
        let mut emitted = vec![];
        while let Some(&time) = self.times.get(self.next) {
            if time > t1 {
                break;
            }
            self.next += 1;
            if active_part(t0, t1, self.params.start, self.params.stop)
                .is_some_and(|(lo, hi)| time > lo && time <= hi)
            {
                emitted.push(time);
            }
        }
        emitted
    }

    pub fn status(&self) -> Value {
        let mut status = json!(self.params);
        status["model"] = json!(Model::SpikeGenerator.name());
        status
    }
}

/// The parameters of a spike dilutor.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpikeDilutorParams {
    /// The probability to copy a spike to a target.
    #[serde(default = "default_p_copy")]
    pub p_copy: f64,
    /// The dilutor is active after start (ms).
    #[serde(default)]
    pub start: f64,
    /// The dilutor is active until stop (ms), forever if none.
    #[serde(default)]
    pub stop: Option<f64>,
}

fn default_p_copy() -> f64 {
    1.0
}

/// A device repeating the spikes it receives (the mother spikes) to each of its targets independently,
/// with the copy probability. The copies are emitted at the arrival time of the mother spikes.
#[derive(Debug, Clone)]
pub struct SpikeDilutor {
    params: SpikeDilutorParams,
    copy: Bernoulli,
    rng: ChaCha8Rng,
    /// The arrival times of the mother spikes not emitted yet.
    pending: Vec<f64>,
}

impl SpikeDilutor {
    /// Create a new dilutor. The random number generator is seeded from the kernel seed and the node ID.
    pub fn build(id: usize, params: Value, seed: u64) -> Result<Self, SNNError> {
        let params: SpikeDilutorParams = parse_params(Model::SpikeDilutor, params)?;
        check_window(params.start, params.stop)?;
        let copy = Bernoulli::new(params.p_copy).map_err(|_| {
            SNNError::InvalidParameter(format!(
                "The copy probability must be in [0, 1], got {}",
                params.p_copy
            ))
        })?;

        Ok(SpikeDilutor {
            params,
            copy,
            rng: ChaCha8Rng::seed_from_u64(seed.wrapping_add(id as u64)),
            pending: vec![],
        })
    }

    /// Buffer a mother spike arriving at the given time.
    pub fn receive(&mut self, time: f64) {
        self.pending.push(time);
    }

    /// Returns the copies emitted in the step (t0, t1] to the given outgoing connections,
    /// as (connection index, time) pairs.
    pub fn emit(&mut self, t0: f64, t1: f64, connections: &[usize]) -> Vec<(usize, f64)> {
        self.pending.sort_by(|a, b| b.total_cmp(a));
        let mut emitted = vec![];
        while let Some(&time) = self.pending.last() {
            if time > t1 {
                break;
            }
            self.pending.pop();
            let active = active_part(t0, t1, self.params.start, self.params.stop)
                .is_some_and(|(lo, hi)| time > lo && time <= hi);
            if !active {
                continue;
            }
            for index in connections.iter() {
                if self.copy.sample(&mut self.rng) {
                    emitted.push((*index, time));
                }
            }
        }
        emitted
    }

    /// Returns the number of mother spikes not emitted yet.
    pub fn num_pending(&self) -> usize {
        self.pending.len()
    }

    pub fn status(&self) -> Value {
        let mut status = json!(self.params);
        status["model"] = json!(Model::SpikeDilutor.name());
        status
    }
}

/// The parameters of a constant current generator.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DcGenerator {
    /// The current amplitude (pA).
    #[serde(default)]
    pub amplitude: f64,
}

impl DcGenerator {
    pub fn build(params: Value) -> Result<Self, SNNError> {
        let generator: DcGenerator = parse_params(Model::DcGenerator, params)?;
        if !generator.amplitude.is_finite() {
            return Err(SNNError::InvalidParameter(format!(
                "amplitude must be finite, got {}",
                generator.amplitude
            )));
        }
        Ok(generator)
    }

    pub fn status(&self) -> Value {
        let mut status = json!(self);
        status["model"] = json!(Model::DcGenerator.name());
        status
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SpikeRecorderParams {}

/// A device recording the senders and emission times of the spikes it receives.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct SpikeRecorder {
    senders: Vec<usize>,
    times: Vec<f64>,
}

impl SpikeRecorder {
    pub fn build(params: Value) -> Result<Self, SNNError> {
        let _: SpikeRecorderParams = parse_params(Model::SpikeRecorder, params)?;
        Ok(SpikeRecorder::default())
    }

    pub fn record(&mut self, sender: usize, time: f64) {
        self.senders.push(sender);
        self.times.push(time);
    }

    /// Returns the recorded spike times.
    pub fn times(&self) -> &[f64] {
        &self.times[..]
    }

    /// Returns the IDs of the senders of the recorded spikes.
    pub fn senders(&self) -> &[usize] {
        &self.senders[..]
    }

    pub fn status(&self) -> Value {
        json!({
            "model": Model::SpikeRecorder.name(),
            "n_events": self.times.len(),
            "events": {
                "senders": self.senders,
                "times": self.times,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MultimeterParams {
    #[serde(default = "default_interval")]
    interval: f64,
}

fn default_interval() -> f64 {
    1.0
}

/// A device sampling the membrane potential of the neurons it is connected to.
#[derive(Debug, PartialEq, Clone)]
pub struct Multimeter {
    /// The sampling interval (ms).
    interval: f64,
    /// The sampling interval in steps.
    interval_steps: usize,
    /// The IDs of the sampled neurons.
    targets: Vec<usize>,
    senders: Vec<usize>,
    times: Vec<f64>,
    potentials: Vec<f64>,
}

impl Multimeter {
    /// Create a new multimeter, the interval must be a positive multiple of the step (ms).
    pub fn build(params: Value, step: f64, tolerance: f64) -> Result<Self, SNNError> {
        let params: MultimeterParams = parse_params(Model::Multimeter, params)?;
        let interval_steps = match num_steps(params.interval, step, tolerance) {
            Some(n) if n > 0 => n,
            _ => {
                return Err(SNNError::InvalidParameter(format!(
                    "The multimeter interval ({} ms) must be a positive multiple of the resolution ({} ms)",
                    params.interval, step
                )))
            }
        };
        Ok(Multimeter {
            interval: params.interval,
            interval_steps,
            targets: vec![],
            senders: vec![],
            times: vec![],
            potentials: vec![],
        })
    }

    pub fn add_target(&mut self, target_id: usize) {
        self.targets.push(target_id);
    }

    /// Returns the IDs of the sampled neurons.
    pub fn targets(&self) -> &[usize] {
        &self.targets[..]
    }

    /// Returns true if a sample is due at the end of the given step.
    pub fn is_due(&self, num_steps: usize) -> bool {
        num_steps % self.interval_steps == 0
    }

    pub fn record(&mut self, sender: usize, time: f64, potential: f64) {
        self.senders.push(sender);
        self.times.push(time);
        self.potentials.push(potential);
    }

    pub fn status(&self) -> Value {
        json!({
            "model": Model::Multimeter.name(),
            "interval": self.interval,
            "n_events": self.times.len(),
            "events": {
                "senders": self.senders,
                "times": self.times,
                "V_m": self.potentials,
            },
        })
    }
}

/// A node of the simulation context.
#[derive(Debug, Clone)]
pub enum Node {
    Neuron(AlphaNeuron),
    PoissonGenerator(PoissonGenerator),
    SpikeGenerator(SpikeGenerator),
    DcGenerator(DcGenerator),
    SpikeRecorder(SpikeRecorder),
    Multimeter(Multimeter),
    SpikeDilutor(SpikeDilutor),
}

impl Node {
    /// Returns the model of the node.
    pub fn model(&self) -> Model {
        match self {
            Node::Neuron(_) => Model::IafPscAlphaPs,
            Node::PoissonGenerator(_) => Model::PoissonGeneratorPs,
            Node::SpikeGenerator(_) => Model::SpikeGenerator,
            Node::DcGenerator(_) => Model::DcGenerator,
            Node::SpikeRecorder(_) => Model::SpikeRecorder,
            Node::Multimeter(_) => Model::Multimeter,
            Node::SpikeDilutor(_) => Model::SpikeDilutor,
        }
    }

    /// Returns the status dictionary of the node.
    pub fn status(&self) -> Value {
        match self {
            Node::Neuron(neuron) => neuron_status(neuron),
            Node::PoissonGenerator(generator) => generator.status(),
            Node::SpikeGenerator(generator) => generator.status(),
            Node::DcGenerator(generator) => generator.status(),
            Node::SpikeRecorder(recorder) => recorder.status(),
            Node::Multimeter(multimeter) => multimeter.status(),
            Node::SpikeDilutor(dilutor) => dilutor.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spike::is_separated;

    const STEP: f64 = 0.25;
    const TOLERANCE: f64 = 0.0005;

    #[test]
    fn test_model_names() {
        for name in [
            "iaf_psc_alpha_ps",
            "poisson_generator_ps",
            "spike_generator",
            "dc_generator",
            "spike_recorder",
            "multimeter",
            "spike_dilutor",
        ] {
            assert_eq!(Model::from_name(name).unwrap().name(), name);
        }
        assert_eq!(
            Model::from_name("iaf_psc_exp"),
            Err(SNNError::UnknownModel("iaf_psc_exp".to_string()))
        );
    }

    #[test]
    fn test_build_neuron() {
        let neuron = build_neuron(
            3,
            json!({"E_L": 0.0, "V_m": 0.0, "V_th": 1500.0, "tau_m": 10.0, "tau_syn_ex": 0.3, "tau_syn_in": 0.3, "C_m": 250.0}),
            0.1,
        )
        .unwrap();
        assert_eq!(neuron.id(), 3);
        assert_eq!(neuron.potential(), 0.0);
        assert_eq!(neuron.params().tau_syn(), 0.3);

        // Defaults
        let neuron = build_neuron(0, Value::Null, 0.1).unwrap();
        assert_eq!(neuron.potential(), -70.0);
        let neuron = build_neuron(0, json!({"V_m": -65.0}), 0.1).unwrap();
        assert_eq!(neuron.potential(), -65.0);

        assert!(matches!(
            build_neuron(0, json!({"tau_syn": 0.3, "tau_syn_in": 0.5}), 0.1),
            Err(SNNError::InvalidParameter(_))
        ));
        assert!(matches!(
            build_neuron(0, json!({"tau_m": 2.0, "tau_syn": 2.0}), 0.1),
            Err(SNNError::DegenerateParameters(_))
        ));
        assert!(matches!(
            build_neuron(0, json!({"tau_m": 0.0}), 0.1),
            Err(SNNError::InvalidParameter(_))
        ));
        assert!(matches!(
            build_neuron(0, json!({"g_L": 16.7}), 0.1),
            Err(SNNError::InvalidParameter(_))
        ));
        assert!(matches!(
            build_neuron(0, json!({"V_m": "rest"}), 0.1),
            Err(SNNError::InvalidParameter(_))
        ));
        assert!(build_neuron(0, json!([1.0]), 0.1).is_err());
    }

    #[test]
    fn test_neuron_status() {
        let neuron = build_neuron(0, json!({"I_e": 10.0}), 0.1).unwrap();
        let status = neuron_status(&neuron);
        assert_eq!(status["model"], json!("iaf_psc_alpha_ps"));
        assert_eq!(status["V_m"], json!(-70.0));
        assert_eq!(status["I_e"], json!(10.0));
        assert_eq!(status["tau_syn"], json!(2.0));
        assert_eq!(status["t"], json!(0.0));
    }

    #[test]
    fn test_poisson_generator() {
        let mut generator =
            PoissonGenerator::build(0, json!({"rate": 16000.0, "start": 1.0, "stop": 5.0}), 42)
                .unwrap();
        generator.add_target(0).unwrap();
        generator.add_target(1).unwrap();

        let mut times: [Vec<f64>; 2] = [vec![], vec![]];
        for k in 0..40 {
            for (index, time) in generator.emit(k as f64 * STEP, (k + 1) as f64 * STEP) {
                assert!(time > k as f64 * STEP && time <= (k + 1) as f64 * STEP);
                times[index].push(time);
            }
        }
        for times in times.iter() {
            assert!(times.iter().all(|&t| t > 1.0 && t <= 5.0));
            assert!(is_separated(times, 0.0));
            // 64 spikes expected
            assert!(times.len() > 30 && times.len() < 100);
        }
        // Independent trains per target
        assert_ne!(times[0], times[1]);
    }

    #[test]
    fn test_poisson_generator_invalid() {
        assert!(PoissonGenerator::build(0, json!({}), 0).is_err());
        assert!(PoissonGenerator::build(0, json!({"rate": -1.0}), 0).is_err());
        assert!(PoissonGenerator::build(0, json!({"rate": 1000.0, "dead_time": 1.0}), 0).is_err());
        assert!(PoissonGenerator::build(0, json!({"rate": 10.0, "start": 5.0, "stop": 1.0}), 0).is_err());
        assert!(PoissonGenerator::build(0, json!({"rate": 10.0, "origin": 1.0}), 0).is_err());
    }

    #[test]
    fn test_spike_generator_precise() {
        let mut generator = SpikeGenerator::build(
            json!({"spike_times": [0.0, 0.1, 0.25, 0.3, 1.0], "precise_times": true}),
            STEP,
            TOLERANCE,
        )
        .unwrap();
        // A spike at the start of the activity window is not emitted
        assert_eq!(generator.emit(0.0, 0.25), vec![0.1, 0.25]);
        assert_eq!(generator.emit(0.25, 0.5), vec![0.3]);
        assert!(generator.emit(0.5, 0.75).is_empty());
        assert_eq!(generator.emit(0.75, 1.0), vec![1.0]);
    }

    #[test]
    fn test_spike_generator_grid() {
        assert!(matches!(
            SpikeGenerator::build(json!({"spike_times": [0.5, 0.6]}), STEP, TOLERANCE),
            Err(SNNError::InvalidParameter(_))
        ));

        let mut generator = SpikeGenerator::build(
            json!({"spike_times": [0.5, 0.6, 0.75], "allow_offgrid_times": true}),
            STEP,
            TOLERANCE,
        )
        .unwrap();
        assert_eq!(generator.emit(0.25, 0.5), vec![0.5]);
        assert_eq!(generator.emit(0.5, 0.75), vec![0.75, 0.75]);
    }

    #[test]
    fn test_spike_generator_window() {
        let mut generator = SpikeGenerator::build(
            json!({"spike_times": [1.0, 2.0, 3.0, 4.0], "start": 1.0, "stop": 3.0}),
            1.0,
            TOLERANCE,
        )
        .unwrap();
        let emitted: Vec<f64> = (0..5)
            .flat_map(|k| generator.emit(k as f64, (k + 1) as f64))
            .collect();
        assert_eq!(emitted, vec![2.0, 3.0]);
    }

    #[test]
    fn test_spike_generator_invalid() {
        assert!(SpikeGenerator::build(json!({"spike_times": [2.0, 1.0]}), 1.0, TOLERANCE).is_err());
        assert!(SpikeGenerator::build(json!({"spike_times": [1.0], "weights": [1.0]}), 1.0, TOLERANCE).is_err());
        assert!(SpikeGenerator::build(json!({"spike_times": "1.0"}), 1.0, TOLERANCE).is_err());
    }

    #[test]
    fn test_spike_dilutor() {
        let connections = [3, 5];
        let mut dilutor = SpikeDilutor::build(0, json!({}), 0).unwrap();
        assert_eq!(dilutor.status()["p_copy"], json!(1.0));
        dilutor.receive(0.6);
        dilutor.receive(0.1);
        dilutor.receive(0.25);
        assert_eq!(
            dilutor.emit(0.0, 0.25, &connections),
            vec![(3, 0.1), (5, 0.1), (3, 0.25), (5, 0.25)]
        );
        assert_eq!(dilutor.num_pending(), 1);
        assert!(dilutor.emit(0.25, 0.5, &connections).is_empty());
        assert_eq!(dilutor.emit(0.5, 0.75, &connections), vec![(3, 0.6), (5, 0.6)]);

        let mut dilutor = SpikeDilutor::build(0, json!({"p_copy": 0.0}), 0).unwrap();
        dilutor.receive(0.1);
        assert!(dilutor.emit(0.0, 0.25, &connections).is_empty());
        assert_eq!(dilutor.num_pending(), 0);

        // Mother spikes outside the activity window are dropped
        let mut dilutor =
            SpikeDilutor::build(0, json!({"start": 1.0, "stop": 2.0}), 0).unwrap();
        dilutor.receive(1.0);
        dilutor.receive(1.5);
        dilutor.receive(2.5);
        let emitted: Vec<(usize, f64)> = (0..3)
            .flat_map(|k| dilutor.emit(k as f64, (k + 1) as f64, &connections[..1]))
            .collect();
        assert_eq!(emitted, vec![(3, 1.5)]);
    }

    #[test]
    fn test_spike_dilutor_copies() {
        // Every target draws independently
        let connections: Vec<usize> = (0..4).collect();
        let mut dilutor = SpikeDilutor::build(0, json!({"p_copy": 0.3}), 42).unwrap();
        for k in 0..1000 {
            dilutor.receive(0.001 * (k + 1) as f64);
        }
        let emitted = dilutor.emit(0.0, 1.0, &connections);
        for index in connections.iter() {
            let copies = emitted.iter().filter(|(i, _)| i == index).count();
            // 300 copies expected
            assert!(copies > 230 && copies < 370);
        }
    }

    #[test]
    fn test_spike_dilutor_invalid() {
        for p_copy in [-0.1, 1.5, f64::NAN] {
            assert!(matches!(
                SpikeDilutor::build(0, json!({ "p_copy": p_copy }), 0),
                Err(SNNError::InvalidParameter(_))
            ));
        }
        assert!(SpikeDilutor::build(0, json!({"p_copy": 1.0, "n": 2}), 0).is_err());
        assert!(SpikeDilutor::build(0, json!({"start": 2.0, "stop": 1.0}), 0).is_err());
    }

    #[test]
    fn test_devices() {
        let generator = DcGenerator::build(json!({"amplitude": 100.0})).unwrap();
        assert_eq!(generator.status()["amplitude"], json!(100.0));
        assert!(DcGenerator::build(json!({"amplitude": 1.0, "start": 0.0})).is_err());

        let mut recorder = SpikeRecorder::build(json!({})).unwrap();
        recorder.record(0, 0.5);
        recorder.record(1, 0.75);
        let status = recorder.status();
        assert_eq!(status["n_events"], json!(2));
        assert_eq!(status["events"]["times"], json!([0.5, 0.75]));
        assert_eq!(status["events"]["senders"], json!([0, 1]));
        assert!(SpikeRecorder::build(json!({"record_to": "ascii"})).is_err());

        let multimeter = Multimeter::build(json!({"interval": 0.5}), STEP, TOLERANCE).unwrap();
        assert!(multimeter.is_due(4));
        assert!(!multimeter.is_due(3));
        assert!(Multimeter::build(json!({"interval": 0.3}), STEP, TOLERANCE).is_err());
        assert!(Multimeter::build(json!({"interval": 0.0}), STEP, TOLERANCE).is_err());
    }
}
