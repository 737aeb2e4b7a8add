//! Module implementing the parameters of a leaky integrate-and-fire neuron.

use serde::{Deserialize, Serialize};

use crate::core::DEGENERACY_TOLERANCE;
use crate::error::SNNError;

/// The intrinsic parameters of a leaky integrate-and-fire neuron with alpha-shaped synaptic currents.
/// The parameters are validated on construction and immutable afterward.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct NeuronParameters {
    /// Membrane time constant (ms).
    tau_m: f64,
    /// Synaptic time constant (ms).
    tau_syn: f64,
    /// Membrane capacitance (pF).
    #[serde(rename = "C_m")]
    c_m: f64,
    /// Resting (leak) potential (mV).
    #[serde(rename = "E_L")]
    e_l: f64,
    /// Firing threshold (mV).
    #[serde(rename = "V_th")]
    v_th: f64,
    /// Constant external current (pA).
    #[serde(rename = "I_e")]
    i_e: f64,
}

/// The raw, unvalidated neuron parameters as found in a dictionary, missing keys taking their default value.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NeuronParametersData {
    #[serde(default = "default_tau_m")]
    pub tau_m: f64,
    #[serde(default = "default_tau_syn", alias = "tau_syn_ex")]
    pub tau_syn: f64,
    #[serde(default = "default_c_m", rename = "C_m")]
    pub c_m: f64,
    #[serde(default = "default_e_l", rename = "E_L")]
    pub e_l: f64,
    #[serde(default = "default_v_th", rename = "V_th")]
    pub v_th: f64,
    #[serde(default, rename = "I_e")]
    pub i_e: f64,
}

impl NeuronParametersData {
    /// Validate the raw parameters.
    pub fn build(self) -> Result<NeuronParameters, SNNError> {
        NeuronParameters::build(
            self.tau_m,
            self.tau_syn,
            self.c_m,
            self.e_l,
            self.v_th,
            self.i_e,
        )
    }
}

impl<'de> Deserialize<'de> for NeuronParameters {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        NeuronParametersData::deserialize(deserializer)?
            .build()
            .map_err(serde::de::Error::custom)
    }
}

fn default_tau_m() -> f64 {
    10.0
}

fn default_tau_syn() -> f64 {
    2.0
}

fn default_c_m() -> f64 {
    250.0
}

fn default_e_l() -> f64 {
    -70.0
}

fn default_v_th() -> f64 {
    -55.0
}

impl Default for NeuronParameters {
    fn default() -> Self {
        NeuronParameters {
            tau_m: default_tau_m(),
            tau_syn: default_tau_syn(),
            c_m: default_c_m(),
            e_l: default_e_l(),
            v_th: default_v_th(),
            i_e: 0.0,
        }
    }
}

impl NeuronParameters {
    /// Create a new set of neuron parameters.
    /// The function returns an error for non-positive or non-finite time constants and capacitance,
    /// and for (numerically) equal synaptic and membrane time constants.
    pub fn build(
        tau_m: f64,
        tau_syn: f64,
        c_m: f64,
        e_l: f64,
        v_th: f64,
        i_e: f64,
    ) -> Result<Self, SNNError> {
        let params = NeuronParameters {
            tau_m,
            tau_syn,
            c_m,
            e_l,
            v_th,
            i_e,
        };
        params.validate()?;
        Ok(params)
    }

    /// Create a new set of neuron parameters from a JSON dictionary, missing keys taking their default value.
    /// Malformed dictionaries yield `InvalidParameter`, while validation errors are returned as they are.
    pub fn from_value(value: serde_json::Value) -> Result<Self, SNNError> {
        let data: NeuronParametersData = serde_json::from_value(value)
            .map_err(|e| SNNError::InvalidParameter(e.to_string()))?;
        data.build()
    }

    /// Check the parameters satisfy the requirements of the closed-form response.
    pub fn validate(&self) -> Result<(), SNNError> {
        for (name, value) in [
            ("tau_m", self.tau_m),
            ("tau_syn", self.tau_syn),
            ("C_m", self.c_m),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SNNError::InvalidParameter(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }

        for (name, value) in [("E_L", self.e_l), ("I_e", self.i_e)] {
            if !value.is_finite() {
                return Err(SNNError::InvalidParameter(format!(
                    "{} must be finite, got {}",
                    name, value
                )));
            }
        }

        if self.v_th.is_nan() {
            return Err(SNNError::InvalidParameter(
                "V_th must not be NaN".to_string(),
            ));
        }

        if (self.tau_syn - self.tau_m).abs() <= DEGENERACY_TOLERANCE * self.tau_m.max(self.tau_syn)
        {
            return Err(SNNError::DegenerateParameters(format!(
                "tau_syn ({}) and tau_m ({}) must differ",
                self.tau_syn, self.tau_m
            )));
        }

        Ok(())
    }

    /// Returns the membrane time constant (ms).
    pub fn tau_m(&self) -> f64 {
        self.tau_m
    }

    /// Returns the synaptic time constant (ms).
    pub fn tau_syn(&self) -> f64 {
        self.tau_syn
    }

    /// Returns the membrane capacitance (pF).
    pub fn c_m(&self) -> f64 {
        self.c_m
    }

    /// Returns the resting potential (mV).
    pub fn e_l(&self) -> f64 {
        self.e_l
    }

    /// Returns the firing threshold (mV).
    pub fn v_th(&self) -> f64 {
        self.v_th
    }

    /// Returns the constant external current (pA).
    pub fn i_e(&self) -> f64 {
        self.i_e
    }

    /// Returns the rate difference 1/tau_syn - 1/tau_m (1/ms), never zero for valid parameters.
    pub fn rate_difference(&self) -> f64 {
        1.0 / self.tau_syn - 1.0 / self.tau_m
    }

    /// Returns the jump of the synaptic current derivative caused by a unit-weight spike.
    /// It yields a current peaking at 1 pA, tau_syn after the spike.
    pub fn psc_initial_value(&self) -> f64 {
        std::f64::consts::E / self.tau_syn
    }
}
