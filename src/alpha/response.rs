//! Closed-form membrane responses of a neuron with alpha-shaped synaptic currents.
//!
//! The sub-threshold dynamics are linear and time-invariant, so the potential at any time
//! is the superposition of the responses to each input spike. No time step is involved:
//! the values returned here are the limit every exact stepwise integration agrees with.
use rayon::prelude::*;
use std::f64::consts::E;

use crate::core::neuron::NeuronParameters;
use crate::core::spike::SpikeTrain;
use crate::core::utils::ResponseSample;
use crate::core::MIN_PARALLEL_SAMPLES;
use crate::error::SNNError;

/// Returns the membrane potential deviation, t ms after the arrival of a single spike, for a neuron initially at rest.
/// The response is zero before the spike arrives.
pub fn alpha_response(t: f64, params: &NeuronParameters, weight: f64) -> f64 {
    if t < 0.0 {
        return 0.0;
    }
    let a = params.rate_difference();
    let exp_m = (-t / params.tau_m()).exp();
    let exp_syn = (-t / params.tau_syn()).exp();
    let prefactor = weight * E / (params.tau_syn() * params.c_m());
    prefactor * ((exp_m - exp_syn) / (a * a) - t * exp_syn / a)
}

/// Returns the membrane potential deviation, t ms after a constant current is switched on, for a neuron initially at rest.
pub fn dc_response(t: f64, params: &NeuronParameters, amplitude: f64) -> f64 {
    if t < 0.0 {
        return 0.0;
    }
    -amplitude * params.tau_m() / params.c_m() * (-t / params.tau_m()).exp_m1()
}

/// Returns the membrane potential deviation at the query time, every spike being transmitted with the same weight.
/// Spikes arriving after the query time do not contribute.
pub fn evaluate(
    spike_train: &SpikeTrain,
    query_time: f64,
    params: &NeuronParameters,
    weight: f64,
) -> Result<ResponseSample, SNNError> {
    params.validate()?;
    let potential = spike_train.events()[..spike_train.causal_len(query_time)]
        .iter()
        .fold(0.0, |acc, event| {
            acc + alpha_response(query_time - event.effective_time(), params, weight)
        });
    Ok(ResponseSample {
        time: query_time,
        potential,
    })
}

/// Returns the membrane potential deviation at the query time, every spike being transmitted with its own weight.
pub fn evaluate_weighted(
    spike_train: &SpikeTrain,
    query_time: f64,
    params: &NeuronParameters,
) -> Result<ResponseSample, SNNError> {
    params.validate()?;
    let potential = spike_train.events()[..spike_train.causal_len(query_time)]
        .iter()
        .fold(0.0, |acc, event| {
            acc + alpha_response(
                query_time - event.effective_time(),
                params,
                event.weight(),
            )
        });
    Ok(ResponseSample {
        time: query_time,
        potential,
    })
}

/// Returns the absolute membrane potential at the query time of a neuron at rest (E_L) at time 0,
/// driven by its constant current I_e and by the weighted spikes.
pub fn membrane_potential(
    spike_train: &SpikeTrain,
    query_time: f64,
    params: &NeuronParameters,
) -> Result<ResponseSample, SNNError> {
    let sample = evaluate_weighted(spike_train, query_time, params)?;
    Ok(ResponseSample {
        time: query_time,
        potential: params.e_l() + dc_response(query_time, params, params.i_e()) + sample.potential,
    })
}

/// Returns the membrane potential deviation at each query time, using parallel computation if there are many query times.
pub fn evaluate_many(
    spike_train: &SpikeTrain,
    query_times: &[f64],
    params: &NeuronParameters,
    weight: f64,
) -> Result<Vec<ResponseSample>, SNNError> {
    if query_times.len() > MIN_PARALLEL_SAMPLES {
        query_times
            .par_iter()
            .map(|&time| evaluate(spike_train, time, params, weight))
            .collect()
    } else {
        query_times
            .iter()
            .map(|&time| evaluate(spike_train, time, params, weight))
            .collect()
    }
}
