//! Module implementing the connections between the nodes of a simulation context.
use serde::{Deserialize, Serialize};

use crate::error::SNNError;

/// The synapse properties of a new connection.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SynapseSpec {
    /// Connection weight (pA for spike inputs, a factor for currents).
    pub weight: f64,
    /// Connection delay (ms).
    pub delay: f64,
}

impl Default for SynapseSpec {
    fn default() -> Self {
        SynapseSpec {
            weight: 1.0,
            delay: 1.0,
        }
    }
}

impl SynapseSpec {
    pub fn new(weight: f64, delay: f64) -> Self {
        SynapseSpec { weight, delay }
    }
}

/// A connection between two nodes.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// ID of the source node
    source_id: usize,
    /// ID of the target node
    target_id: usize,
    /// Connection weight
    weight: f64,
    /// Connection delay (must be non-negative)
    delay: f64,
}

impl Connection {
    /// Create a new connection with the specified synapse.
    /// Returns an error if the weight is not finite or if the delay is negative.
    pub fn build(source_id: usize, target_id: usize, syn_spec: &SynapseSpec) -> Result<Self, SNNError> {
        if !syn_spec.weight.is_finite() {
            return Err(SNNError::InvalidParameter(format!(
                "Connection weight must be finite, got {}",
                syn_spec.weight
            )));
        }
        if !(syn_spec.delay.is_finite() && syn_spec.delay >= 0.0) {
            return Err(SNNError::InvalidParameter(format!(
                "Connection delay must be non-negative, got {}",
                syn_spec.delay
            )));
        }

        Ok(Connection {
            source_id,
            target_id,
            weight: syn_spec.weight,
            delay: syn_spec.delay,
        })
    }

    /// Returns the ID of the source node.
    pub fn source_id(&self) -> usize {
        self.source_id
    }

    /// Returns the ID of the target node.
    pub fn target_id(&self) -> usize {
        self.target_id
    }

    /// Returns the weight of the connection.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Returns the delay of the connection.
    pub fn delay(&self) -> f64 {
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_build() {
        let connection = Connection::build(0, 1, &SynapseSpec::new(65.0, 1.0)).unwrap();
        assert_eq!(connection.source_id(), 0);
        assert_eq!(connection.target_id(), 1);
        assert_eq!(connection.weight(), 65.0);
        assert_eq!(connection.delay(), 1.0);

        assert!(Connection::build(0, 1, &SynapseSpec::new(-1.0, 0.0)).is_ok());
    }

    #[test]
    fn test_connection_build_invalid() {
        assert!(matches!(
            Connection::build(0, 1, &SynapseSpec::new(0.5, -1.0)),
            Err(SNNError::InvalidParameter(_))
        ));
        assert!(matches!(
            Connection::build(0, 1, &SynapseSpec::new(f64::NAN, 1.0)),
            Err(SNNError::InvalidParameter(_))
        ));
        assert!(Connection::build(0, 1, &SynapseSpec::new(1.0, f64::INFINITY)).is_err());
    }

    #[test]
    fn test_synapse_spec_default() {
        assert_eq!(SynapseSpec::default(), SynapseSpec::new(1.0, 1.0));
        let spec: SynapseSpec = serde_json::from_str(r#"{"weight": 65.0}"#).unwrap();
        assert_eq!(spec, SynapseSpec::new(65.0, 1.0));
    }
}
