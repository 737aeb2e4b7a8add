//! Core module defining the main components of the Rusty PSP library.
//!
//! This module provides the model-independent building blocks:
//!
//! - [`neuron`]: The validated parameters of a leaky integrate-and-fire neuron
//! - [`spike`]: Precisely timed spike events, spike trains and Poisson sampling
//! - [`utils`]: Time grid helpers and response samples
//!
//! # Examples
//!
//! ```
//! use rusty_psp::core::neuron::NeuronParameters;
//! use rusty_psp::core::spike::SpikeTrain;
//!
//! // A neuron with fast synapses and a slow membrane
//! let params = NeuronParameters::build(10.0, 0.3, 250.0, 0.0, 1500.0, 0.0).unwrap();
//! assert_eq!(params.tau_m(), 10.0);
//!
//! // Three spikes replayed with a common weight and a 1 ms delay
//! let spike_train = SpikeTrain::from_times(&[2.0, 0.5, 1.25], 65.0, 1.0).unwrap();
//! assert_eq!(spike_train.len(), 3);
//! assert_eq!(spike_train.events()[0].effective_time(), 1.5);
//! ```
pub mod neuron;
pub mod spike;
pub mod utils;

/// The relative tolerance below which the synaptic and membrane time constants are considered equal.
pub const DEGENERACY_TOLERANCE: f64 = 1e-12;
/// Minimum number of neurons to consider parallel processing.
pub const MIN_PARALLEL_NEURONS: usize = 100;
/// Minimum number of query times to consider parallel processing.
pub const MIN_PARALLEL_SAMPLES: usize = 1000;
