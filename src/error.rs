//! Error module for the Rusty PSP library.
use std::error::Error;
use std::fmt;

/// Error types for the library.
#[derive(Debug, PartialEq)]
pub enum SNNError {
    /// Error for synaptic and membrane time constants too close for the closed-form response.
    DegenerateParameters(String),
    /// Error for invalid parameters, e.g., non-positive time constant or negative delay.
    InvalidParameter(String),
    /// Error for invalid operation, e.g., changing the resolution after nodes were created.
    InvalidOperation(String),
    /// Error for a model name the simulation context does not provide.
    UnknownModel(String),
    /// Error for a node handle that does not exist in the simulation context.
    UnknownNode(usize),
    /// Error for a status field that is not exposed by a node.
    UnknownField(String),
    /// Error for a connection between incompatible nodes.
    InvalidConnection(String),
    /// The membrane potential reached the firing threshold, leaving the sub-threshold regime.
    ThresholdExceeded { time: f64, potential: f64 },
    /// Error for I/O operations.
    IOError(String),
}

impl fmt::Display for SNNError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SNNError::DegenerateParameters(e) => write!(f, "Degenerate parameters: {}", e),
            SNNError::InvalidParameter(e) => write!(f, "Invalid parameters: {}", e),
            SNNError::InvalidOperation(e) => write!(f, "Invalid operation: {}", e),
            SNNError::UnknownModel(e) => write!(f, "Unknown model: {}", e),
            SNNError::UnknownNode(id) => write!(f, "Unknown node: {}", id),
            SNNError::UnknownField(e) => write!(f, "Unknown field: {}", e),
            SNNError::InvalidConnection(e) => write!(f, "Invalid connection: {}", e),
            SNNError::ThresholdExceeded { time, potential } => write!(
                f,
                "Sub-threshold regime left at t={} ms with V_m={} mV",
                time, potential
            ),
            SNNError::IOError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for SNNError {}
