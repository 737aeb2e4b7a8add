//! Exact propagation of the sub-threshold state of an alpha-PSC neuron over arbitrary intervals.
//!
//! The state (dI, I, V), relative to the resting potential, obeys
//! dI' = -dI / tau_syn, I' = dI - I / tau_syn, V' = -V / tau_m + (I + I_ext) / C_m.
//! The linear system is integrated exactly; the coefficients are expressed with expm1 and the state is
//! updated incrementally, which keeps the rounding errors independent of the interval length.
use serde::{Deserialize, Serialize};

use crate::core::neuron::NeuronParameters;

/// The exact propagator of the sub-threshold state over a fixed interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Propagator {
    interval: f64,
    expm1_m: f64,
    expm1_syn: f64,
    p30: f64,
    p31: f64,
    p32: f64,
}

impl Propagator {
    /// Returns the propagator over the given interval (ms).
    pub fn new(params: &NeuronParameters, interval: f64) -> Self {
        let a = params.rate_difference();
        let c_m = params.c_m();
        let expm1_m = (-interval / params.tau_m()).exp_m1();
        let expm1_syn = (-interval / params.tau_syn()).exp_m1();
        let decay_syn = 1.0 + expm1_syn;

        Propagator {
            interval,
            expm1_m,
            expm1_syn,
            p30: -params.tau_m() / c_m * expm1_m,
            p31: (expm1_m - expm1_syn - decay_syn * a * interval) / (c_m * a * a),
            p32: (expm1_m - expm1_syn) / (c_m * a),
        }
    }

    /// Returns the interval covered by the propagator.
    pub fn interval(&self) -> f64 {
        self.interval
    }
}

/// The sub-threshold state of an alpha-PSC neuron, relative to the resting potential.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AlphaState {
    /// Derivative of the synaptic current (pA/ms).
    pub di: f64,
    /// Synaptic current (pA).
    pub i: f64,
    /// Membrane potential relative to E_L (mV).
    pub v: f64,
}

impl AlphaState {
    /// Propagate the state over the propagator interval, under the constant external current i_ext (pA).
    pub fn propagate(&mut self, propagator: &Propagator, i_ext: f64) {
        let decay_syn = 1.0 + propagator.expm1_syn;
        self.v += propagator.expm1_m * self.v
            + propagator.p31 * self.di
            + propagator.p32 * self.i
            + propagator.p30 * i_ext;
        self.i += propagator.expm1_syn * self.i + decay_syn * propagator.interval * self.di;
        self.di += propagator.expm1_syn * self.di;
    }

    /// Apply the jump caused by a spike arriving along a synapse of the given weight.
    pub fn receive(&mut self, params: &NeuronParameters, weight: f64) {
        self.di += weight * params.psc_initial_value();
    }
}
