//! Alpha neuron related implementations.
use log;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::alpha::propagator::{AlphaState, Propagator};
use crate::core::neuron::NeuronParameters;
use crate::core::DEGENERACY_TOLERANCE;
use crate::error::SNNError;

/// A spike waiting to reach the neuron.
#[derive(Debug, Clone, Copy)]
struct PendingSpike {
    /// The effective arrival time.
    time: f64,
    /// The weight of the synapse.
    weight: f64,
    /// The reception order, to deliver simultaneous spikes in the order they were sent.
    order: u64,
}

impl PartialEq for PendingSpike {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PendingSpike {}

impl PartialOrd for PendingSpike {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingSpike {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.order.cmp(&other.order))
    }
}

/// A leaky integrate-and-fire neuron with alpha-shaped synaptic currents, integrated exactly on a time grid.
/// Spikes are taken into account at their precise arrival time within the grid step.
#[derive(Debug, Clone)]
pub struct AlphaNeuron {
    // The neuron ID.
    id: usize,
    // The neuron parameters.
    params: NeuronParameters,
    // The sub-threshold state, relative to the resting potential.
    state: AlphaState,
    // The time up to which the state has been integrated.
    time: f64,
    // The current injected by connected current generators (pA).
    dc_current: f64,
    // The propagator over a full grid step.
    step_propagator: Propagator,
    // The spikes which did not reach the neuron yet, earliest first.
    pending: BinaryHeap<Reverse<PendingSpike>>,
    // The number of received spikes.
    num_received: u64,
}

impl AlphaNeuron {
    /// Create a new neuron at rest, integrated on a grid with the given resolution (ms).
    pub fn new(id: usize, params: NeuronParameters, resolution: f64) -> Self {
        let step_propagator = Propagator::new(&params, resolution);
        AlphaNeuron {
            id,
            params,
            state: AlphaState::default(),
            time: 0.0,
            dc_current: 0.0,
            step_propagator,
            pending: BinaryHeap::new(),
            num_received: 0,
        }
    }

    /// Create a new neuron with the given initial membrane potential (mV).
    pub fn new_from(id: usize, params: NeuronParameters, resolution: f64, v_m: f64) -> Self {
        let mut neuron = AlphaNeuron::new(id, params, resolution);
        neuron.state.v = v_m - neuron.params.e_l();
        neuron
    }

    /// Returns the neuron ID.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns the neuron parameters.
    pub fn params(&self) -> &NeuronParameters {
        &self.params
    }

    /// Returns the (absolute) membrane potential (mV).
    pub fn potential(&self) -> f64 {
        self.params.e_l() + self.state.v
    }

    /// Returns the synaptic current (pA).
    pub fn synaptic_current(&self) -> f64 {
        self.state.i
    }

    /// Returns the time up to which the neuron has been integrated.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Set the time up to which the neuron is integrated, for neurons joining a running simulation.
    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    /// Returns the number of spikes received so far, delivered or not.
    pub fn num_received(&self) -> u64 {
        self.num_received
    }

    /// Returns the number of spikes which did not reach the neuron yet.
    pub fn num_pending(&self) -> usize {
        self.pending.len()
    }

    /// Add a constant current (pA) to the neuron input.
    pub fn add_dc_current(&mut self, amplitude: f64) {
        self.dc_current += amplitude;
    }

    /// Buffer a spike reaching the neuron at the given effective time.
    pub fn receive(&mut self, time: f64, weight: f64) {
        self.pending.push(Reverse(PendingSpike {
            time,
            weight,
            order: self.num_received,
        }));
        self.num_received += 1;
    }

    /// Integrate the neuron state up to the end of the current grid step.
    /// The spikes arriving at or before the end of the step are applied at their exact time.
    /// The function returns an error if the membrane potential reaches the firing threshold, reporting the first
    /// crossing observed in the step. The step is integrated to its end nonetheless, all due spikes applied.
    /// Nothing happens if the neuron is already integrated up to the given time.
    pub fn update(&mut self, end: f64) -> Result<(), SNNError> {
        if end <= self.time {
            return Ok(());
        }
        let i_ext = self.params.i_e() + self.dc_current;
        let mut split = false;
        let mut crossing: Option<SNNError> = None;

        while let Some(Reverse(spike)) = self.pending.peek().copied() {
            if spike.time > end {
                break;
            }
            self.pending.pop();

            let interval = spike.time - self.time;
            if interval > 0.0 {
                self.state
                    .propagate(&Propagator::new(&self.params, interval), i_ext);
                self.time = spike.time;
                split = true;
                // The jump only affects the current derivative, not the potential
                crossing = crossing.or_else(|| self.check_threshold().err());
            }
            self.state.receive(&self.params, spike.weight);
        }

        let interval = end - self.time;
        let full_step = (interval - self.step_propagator.interval()).abs()
            <= DEGENERACY_TOLERANCE * interval;
        if !split && full_step {
            self.state.propagate(&self.step_propagator, i_ext);
        } else if interval > 0.0 {
            self.state
                .propagate(&Propagator::new(&self.params, interval), i_ext);
        }
        self.time = end;

        match crossing.or_else(|| self.check_threshold().err()) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn check_threshold(&self) -> Result<(), SNNError> {
        let potential = self.potential();
        if potential >= self.params.v_th() {
            log::debug!(
                "Neuron {} reached the threshold at t={} (V_m={})",
                self.id,
                self.time,
                potential
            );
            return Err(SNNError::ThresholdExceeded {
                time: self.time,
                potential,
            });
        }
        Ok(())
    }
}
