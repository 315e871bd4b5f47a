pub mod quantile;
pub mod sample_size;
pub mod sensitivity;
pub mod power;

use serde::{Deserialize, Serialize};
use crate::config::StatisticsConfig;
use crate::error::{PlanError, PlanResult};
use crate::models::DesignType;

pub use quantile::ZQuantiles;
pub use sample_size::{BioequivalenceLayout, DesignInputs, EquivalenceMargins, SampleSizeCalculator};
pub use sensitivity::SensitivitySweep;
pub use power::{PowerEstimate, PowerSimulator};

/// Error rates and attrition shared by every sample-size formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Assumptions {
    pub alpha: f64,
    pub power: f64,
    pub dropout_rate: f64,
}

impl Default for Assumptions {
    fn default() -> Self {
        Self::from_config(&StatisticsConfig::default())
    }
}

impl Assumptions {
    pub fn from_config(config: &StatisticsConfig) -> Self {
        Self {
            alpha: config.alpha,
            power: config.power,
            dropout_rate: config.dropout_rate,
        }
    }
    
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }
    
    pub fn with_power(mut self, power: f64) -> Self {
        self.power = power;
        self
    }
    
    pub fn with_dropout(mut self, dropout_rate: f64) -> Self {
        self.dropout_rate = dropout_rate;
        self
    }
    
    pub fn validate(&self) -> PlanResult<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(PlanError::invalid("alpha", format!("{} must lie in (0, 1)", self.alpha)));
        }
        if !(self.power > 0.0 && self.power < 1.0) {
            return Err(PlanError::invalid("power", format!("{} must lie in (0, 1)", self.power)));
        }
        if !(self.dropout_rate >= 0.0 && self.dropout_rate < 1.0) {
            return Err(PlanError::invalid(
                "dropout_rate",
                format!("{} must lie in [0, 1)", self.dropout_rate),
            ));
        }
        Ok(())
    }
}

/// Inputs echoed back with every result so a reported N can be traced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationInputs {
    pub effect_size: Option<f64>,
    pub std_dev: Option<f64>,
    pub standardized_effect: Option<f64>,
    pub cv_percent: Option<f64>,
    pub theta1: Option<f64>,
    pub theta2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<BioequivalenceLayout>,
    pub alpha: f64,
    pub power: f64,
    pub dropout_rate: f64,
    pub z_alpha: f64,
    pub z_beta: f64,
}

/// Control arm of an unequally allocated parallel design.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceArm {
    /// Treatment-arm subjects per reference-arm subject.
    pub allocation_ratio: f64,
    pub n: u32,
    pub n_adjusted: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSizeResult {
    pub design_type: DesignType,
    pub number_of_arms: u32,
    /// Subjects per arm; per treatment arm when `reference_arm` is set.
    pub n_per_arm: u32,
    pub n_per_arm_adjusted: u32,
    pub total_n: u32,
    pub total_n_adjusted: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_arm: Option<ReferenceArm>,
    pub inputs: CalculationInputs,
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_assumption_bounds() {
        assert!(Assumptions::default().validate().is_ok());
        assert!(Assumptions::default().with_alpha(0.0).validate().is_err());
        assert!(Assumptions::default().with_power(1.0).validate().is_err());
        assert!(Assumptions::default().with_dropout(1.0).validate().is_err());
        assert!(Assumptions::default().with_dropout(-0.1).validate().is_err());
        assert!(Assumptions::default().with_dropout(0.0).validate().is_ok());
    }
}
