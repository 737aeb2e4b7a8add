//! Utility functions and types.
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// The membrane potential of a neuron at a given time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResponseSample {
    pub time: f64,
    pub potential: f64,
}

impl PartialEq for ResponseSample {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.potential == other.potential
    }
}

impl PartialOrd for ResponseSample {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.potential.partial_cmp(&other.potential) {
            Some(Ordering::Equal) => self.time.partial_cmp(&other.time),
            other => other,
        }
    }
}

/// Returns the number of steps of the given length covering the duration, if the duration is a whole number of steps.
/// The tolerance is absolute and expressed in the same unit as the duration.
pub fn num_steps(duration: f64, step: f64, tolerance: f64) -> Option<usize> {
    if !(duration.is_finite() && step > 0.0) || duration < -tolerance {
        return None;
    }
    let n = (duration / step).round();
    if (duration - n * step).abs() <= tolerance {
        Some(n.max(0.0) as usize)
    } else {
        None
    }
}

/// Returns the earliest grid point at or after the given time.
/// Times within the tolerance of a grid point are mapped to that grid point.
pub fn ceil_to_grid(time: f64, step: f64, tolerance: f64) -> f64 {
    let n = (time / step).round();
    if (time - n * step).abs() <= tolerance {
        n * step
    } else {
        (time / step).ceil() * step
    }
}
