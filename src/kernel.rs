//! A small simulation kernel hosting precise-timing neurons, spike sources and recording devices.
//!
//! # Examples
//!
//! ```
//! use rusty_psp::kernel::config::KernelConfig;
//! use rusty_psp::kernel::connection::SynapseSpec;
//! use rusty_psp::kernel::context::SimulationContext;
//! use serde_json::json;
//!
//! let mut context = SimulationContext::new(KernelConfig::build(0.125, 1024.0, 0).unwrap()).unwrap();
//! let generator = context
//!     .create("spike_generator", json!({"spike_times": [0.3, 1.7], "precise_times": true}))
//!     .unwrap();
//! let neuron = context.create("iaf_psc_alpha_ps", json!({"E_L": 0.0, "V_th": 1500.0})).unwrap();
//! context.connect(generator, neuron, &SynapseSpec::new(65.0, 1.0)).unwrap();
//!
//! context.simulate(5.0).unwrap();
//! assert!(context.get(neuron, "V_m", None).unwrap().as_f64().unwrap() > 0.0);
//! ```
pub mod config;
pub mod connection;
pub mod context;
pub mod models;
