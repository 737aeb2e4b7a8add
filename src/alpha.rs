//! Neurons with alpha-shaped postsynaptic currents.
//!
//! - [`response`]: Closed-form membrane responses to precisely timed spikes
//! - [`propagator`]: Exact propagation of the sub-threshold state over arbitrary intervals
//! - [`neuron`]: A neuron integrated on a time grid, with spikes handled at their exact arrival time
pub mod neuron;
pub mod propagator;
pub mod response;
