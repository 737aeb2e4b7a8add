//! The simulation context, owning the nodes, their connections and the clock.
use log;
use rayon::prelude::*;
use serde_json::Value;

use crate::core::utils::num_steps;
use crate::core::MIN_PARALLEL_NEURONS;
use crate::error::SNNError;
use crate::kernel::config::KernelConfig;
use crate::kernel::connection::{Connection, SynapseSpec};
use crate::kernel::models::{
    build_neuron, DcGenerator, Model, Multimeter, Node, PoissonGenerator, SpikeDilutor,
    SpikeGenerator, SpikeRecorder,
};

/// A simulation context: nodes are created and connected, then simulated on the time grid of the kernel.
/// Several contexts may coexist, each with its own configuration and clock.
#[derive(Debug)]
pub struct SimulationContext {
    config: KernelConfig,
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    // The indices of the outgoing connections, by source node.
    outgoing: Vec<Vec<usize>>,
    num_neurons: usize,
    // The number of simulated steps.
    num_steps: usize,
}

impl Default for SimulationContext {
    fn default() -> Self {
        SimulationContext {
            config: KernelConfig::default(),
            nodes: vec![],
            connections: vec![],
            outgoing: vec![],
            num_neurons: 0,
            num_steps: 0,
        }
    }
}

impl SimulationContext {
    /// Create a new empty context with the given configuration.
    pub fn new(config: KernelConfig) -> Result<Self, SNNError> {
        config.validate()?;
        Ok(SimulationContext {
            config,
            ..Default::default()
        })
    }

    /// Drop all nodes and connections, rewind the clock, and restore the default configuration.
    pub fn reset(&mut self) {
        log::debug!("Resetting the simulation context");
        *self = SimulationContext::default();
    }

    /// Change the configuration. This is only possible before any node is created and before the clock advanced.
    pub fn set_config(&mut self, config: KernelConfig) -> Result<(), SNNError> {
        if !self.nodes.is_empty() || self.num_steps > 0 {
            return Err(SNNError::InvalidOperation(
                "The kernel configuration cannot change once nodes exist or time has advanced"
                    .to_string(),
            ));
        }
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Returns the current time (ms).
    pub fn time(&self) -> f64 {
        self.num_steps as f64 * self.config.resolution
    }

    /// Returns the number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of connections.
    pub fn num_connections(&self) -> usize {
        self.connections.len()
    }

    fn node(&self, id: usize) -> Result<&Node, SNNError> {
        self.nodes.get(id).ok_or(SNNError::UnknownNode(id))
    }

    /// Create a new node of the given model and returns its ID.
    pub fn create(&mut self, model: &str, params: Value) -> Result<usize, SNNError> {
        let model = Model::from_name(model)?;
        let id = self.nodes.len();
        let resolution = self.config.resolution;
        let tolerance = self.config.time_tolerance();

        let node = match model {
            Model::IafPscAlphaPs => {
                let mut neuron = build_neuron(id, params, resolution)?;
                neuron.set_time(self.time());
                Node::Neuron(neuron)
            }
            Model::PoissonGeneratorPs => Node::PoissonGenerator(PoissonGenerator::build(
                id,
                params,
                self.config.rng_seed,
            )?),
            Model::SpikeGenerator => {
                Node::SpikeGenerator(SpikeGenerator::build(params, resolution, tolerance)?)
            }
            Model::DcGenerator => Node::DcGenerator(DcGenerator::build(params)?),
            Model::SpikeRecorder => Node::SpikeRecorder(SpikeRecorder::build(params)?),
            Model::Multimeter => {
                Node::Multimeter(Multimeter::build(params, resolution, tolerance)?)
            }
            Model::SpikeDilutor => {
                Node::SpikeDilutor(SpikeDilutor::build(id, params, self.config.rng_seed)?)
            }
        };

        if let Node::Neuron(_) = node {
            self.num_neurons += 1;
        }
        self.nodes.push(node);
        self.outgoing.push(vec![]);
        log::debug!("Node {} created ({})", id, model);
        Ok(id)
    }

    /// Connect the source node to the target node.
    /// Spike sources connect to neurons and spike recorders, current generators and multimeters to neurons.
    /// Generators also connect to spike dilutors, which repeat the spikes to their own targets.
    pub fn connect(
        &mut self,
        source_id: usize,
        target_id: usize,
        syn_spec: &SynapseSpec,
    ) -> Result<(), SNNError> {
        let source_model = self.node(source_id)?.model();
        let target_model = self.node(target_id)?.model();
        let connection = Connection::build(source_id, target_id, syn_spec)?;

        match (source_model, target_model) {
            (source, Model::IafPscAlphaPs | Model::SpikeRecorder) if source.is_spike_source() => {}
            (Model::PoissonGeneratorPs | Model::SpikeGenerator, Model::SpikeDilutor) => {}
            (Model::DcGenerator | Model::Multimeter, Model::IafPscAlphaPs) => {}
            (source, target) => {
                return Err(SNNError::InvalidConnection(format!(
                    "{} (node {}) cannot connect to {} (node {})",
                    source, source_id, target, target_id
                )))
            }
        }

        let index = self.connections.len();
        let mut dc_current = None;
        match &mut self.nodes[source_id] {
            Node::PoissonGenerator(generator) => generator.add_target(index)?,
            Node::DcGenerator(generator) => dc_current = Some(generator.amplitude * syn_spec.weight),
            Node::Multimeter(multimeter) => multimeter.add_target(target_id),
            _ => {}
        }
        if let (Some(amplitude), Node::Neuron(neuron)) = (dc_current, &mut self.nodes[target_id]) {
            neuron.add_dc_current(amplitude);
        }

        log::debug!(
            "Node {} connected to node {} (weight={}, delay={})",
            source_id,
            target_id,
            connection.weight(),
            connection.delay()
        );
        self.outgoing[source_id].push(index);
        self.connections.push(connection);
        Ok(())
    }

    /// Advance the simulation by the given duration (ms), which must be a whole number of steps.
    /// If a neuron reaches the threshold, the simulation stops at the end of the step in which it happened and
    /// the crossing is returned. The context stays consistent and the simulation may be resumed.
    pub fn simulate(&mut self, duration: f64) -> Result<(), SNNError> {
        let resolution = self.config.resolution;
        let total_steps = num_steps(duration, resolution, self.config.time_tolerance())
            .ok_or_else(|| {
                SNNError::InvalidParameter(format!(
                    "The duration ({} ms) must be a non-negative multiple of the resolution ({} ms)",
                    duration, resolution
                ))
            })?;

        log::info!(
            "Starting simulation of {} ms ({} steps of {} ms, {} nodes)...",
            duration,
            total_steps,
            resolution,
            self.nodes.len()
        );

        // For logging purposes
        let log_interval = (total_steps / 10).max(1);

        for k in 0..total_steps {
            self.step()?;
            if (k + 1) % log_interval == 0 {
                log::debug!(
                    "Simulation progress: {:.0}% (Time: {:.4} ms)",
                    100.0 * (k + 1) as f64 / total_steps as f64,
                    self.time()
                );
            }
        }

        log::info!("Simulation completed successfully at t={} ms", self.time());
        Ok(())
    }

    /// Simulate a single step (t0, t1].
    fn step(&mut self) -> Result<(), SNNError> {
        let resolution = self.config.resolution;
        let t0 = self.num_steps as f64 * resolution;
        let t1 = (self.num_steps + 1) as f64 * resolution;

        // 1. Collect the spikes emitted in the step as (connection index, emission time)
        let mut deliveries: Vec<(usize, f64)> = vec![];
        for (id, node) in self.nodes.iter_mut().enumerate() {
            match node {
                Node::PoissonGenerator(generator) => deliveries.extend(generator.emit(t0, t1)),
                Node::SpikeGenerator(generator) => {
                    let times = generator.emit(t0, t1);
                    for index in self.outgoing[id].iter() {
                        deliveries.extend(times.iter().map(|time| (*index, *time)));
                    }
                }
                _ => {}
            }
        }

        // 2. Route the spikes to their targets, then the copies made by the dilutors
        self.route(deliveries, t0, t1);
        let mut copies: Vec<(usize, f64)> = vec![];
        for (id, node) in self.nodes.iter_mut().enumerate() {
            if let Node::SpikeDilutor(dilutor) = node {
                copies.extend(dilutor.emit(t0, t1, &self.outgoing[id]));
            }
        }
        self.route(copies, t0, t1);

        // 3. Integrate all neurons to the end of the step, using parallel computation if there are many neurons.
        // Threshold crossings are reported once the step is complete, so that the clock and the neurons agree.
        let update = move |node: &mut Node| match node {
            Node::Neuron(neuron) => neuron.update(t1).err(),
            _ => None,
        };
        let failures: Vec<SNNError> = if self.num_neurons > MIN_PARALLEL_NEURONS {
            self.nodes.par_iter_mut().filter_map(update).collect()
        } else {
            self.nodes.iter_mut().filter_map(update).collect()
        };
        self.num_steps += 1;

        // 4. Sample the membrane potentials
        let mut samples: Vec<(usize, usize, f64)> = vec![];
        for (id, node) in self.nodes.iter().enumerate() {
            if let Node::Multimeter(multimeter) = node {
                if multimeter.is_due(self.num_steps) {
                    for target_id in multimeter.targets() {
                        if let Some(Node::Neuron(neuron)) = self.nodes.get(*target_id) {
                            samples.push((id, *target_id, neuron.potential()));
                        }
                    }
                }
            }
        }
        for (id, target_id, potential) in samples {
            if let Node::Multimeter(multimeter) = &mut self.nodes[id] {
                multimeter.record(target_id, t1, potential);
            }
        }

        if failures.len() > 1 {
            log::debug!("{} neurons reached the threshold in ({}, {}]", failures.len(), t0, t1);
        }
        match failures.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Deliver the spikes, given as (connection index, emission time) pairs, to the targets of their connections.
    fn route(&mut self, deliveries: Vec<(usize, f64)>, t0: f64, t1: f64) {
        if !deliveries.is_empty() {
            log::trace!("{} spikes routed in ({}, {}]", deliveries.len(), t0, t1);
        }
        for (index, time) in deliveries {
            let connection = &self.connections[index];
            match &mut self.nodes[connection.target_id()] {
                Node::Neuron(neuron) => {
                    neuron.receive(time + connection.delay(), connection.weight())
                }
                Node::SpikeRecorder(recorder) => recorder.record(connection.source_id(), time),
                Node::SpikeDilutor(dilutor) => dilutor.receive(time + connection.delay()),
                _ => {}
            }
        }
    }

    /// Returns the status dictionary of a node.
    pub fn status(&self, id: usize) -> Result<Value, SNNError> {
        Ok(self.node(id)?.status())
    }

    /// Returns a field of the status dictionary of a node, or an entry of this field if a subfield is provided.
    pub fn get(&self, id: usize, field: &str, subfield: Option<&str>) -> Result<Value, SNNError> {
        let status = self.status(id)?;
        let value = status
            .get(field)
            .ok_or_else(|| SNNError::UnknownField(field.to_string()))?;
        match subfield {
            None => Ok(value.clone()),
            Some(subfield) => value
                .get(subfield)
                .cloned()
                .ok_or_else(|| SNNError::UnknownField(format!("{}.{}", field, subfield))),
        }
    }
}
