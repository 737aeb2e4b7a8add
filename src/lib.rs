//! This crate provides the exact sub-threshold integration of leaky integrate-and-fire neurons
//! with alpha-shaped postsynaptic currents, driven by precisely timed spikes.
//!
//! # Closed-Form Responses
//!
//! ```rust
//! use rusty_psp::alpha::response::evaluate;
//! use rusty_psp::core::neuron::NeuronParameters;
//! use rusty_psp::core::spike::SpikeTrain;
//!
//! let params = NeuronParameters::build(10.0, 0.3, 250.0, 0.0, 1500.0, 0.0).unwrap();
//! let spike_train = SpikeTrain::from_times(&[0.0], 65.0, 0.0).unwrap();
//!
//! let sample = evaluate(&spike_train, 1.0, &params, 65.0).unwrap();
//! assert!((sample.potential - 0.16986810381700023598).abs() < 1e-14);
//! ```
//!
//! # Stepwise Integration
//!
//! ```rust
//! use rusty_psp::alpha::neuron::AlphaNeuron;
//! use rusty_psp::core::neuron::NeuronParameters;
//!
//! let params = NeuronParameters::build(10.0, 0.3, 250.0, 0.0, 1500.0, 0.0).unwrap();
//! let mut neuron = AlphaNeuron::new(0, params, 0.25);
//! neuron.receive(0.1, 65.0);
//! for k in 0..4 {
//!     neuron.update((k + 1) as f64 * 0.25).unwrap();
//! }
//! assert!(neuron.potential() > 0.0);
//! ```
//!
//! # Simulating
//!
//! See [`kernel::context::SimulationContext`] and [`regression::run_regression`].
pub mod alpha;
pub mod core;
pub mod error;
pub mod kernel;
pub mod regression;
