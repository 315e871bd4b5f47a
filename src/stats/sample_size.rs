use std::fmt;
use std::str::FromStr;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use super::{Assumptions, CalculationInputs, ReferenceArm, SampleSizeResult, SensitivitySweep, ZQuantiles};
use crate::config::PlannerConfig;
use crate::error::{PlanError, PlanResult};
use crate::models::DesignType;

/// Tolerance for float noise when a formula lands exactly on an integer.
const CEIL_TOLERANCE: f64 = 1e-9;

/// Bioequivalence acceptance range on the ratio of geometric means.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquivalenceMargins {
    pub theta1: f64,
    pub theta2: f64,
}

impl Default for EquivalenceMargins {
    fn default() -> Self {
        Self { theta1: 0.80, theta2: 1.25 }
    }
}

impl EquivalenceMargins {
    fn validate(&self) -> PlanResult<()> {
        if !(self.theta1 > 0.0 && self.theta1 < 1.0 && self.theta2 > 1.0 && self.theta2.is_finite()) {
            return Err(PlanError::invalid(
                "theta",
                format!("margins must satisfy 0 < theta1 < 1 < theta2 (got {} / {})", self.theta1, self.theta2),
            ));
        }
        Ok(())
    }
    
    /// Narrower of the two log-scale margins.
    fn log_margin(&self) -> f64 {
        self.theta2.ln().min(-self.theta1.ln())
    }
}

/// How the bioequivalence subjects are arranged. A 2x2 crossover reports
/// subjects per sequence; a parallel layout reports subjects per group and
/// needs twice the subjects, since nobody serves as their own control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BioequivalenceLayout {
    #[default]
    Crossover,
    Parallel,
}

impl BioequivalenceLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            BioequivalenceLayout::Crossover => "crossover",
            BioequivalenceLayout::Parallel => "parallel",
        }
    }
    
    /// Multiplier on (z_alpha + z_beta)^2 sigma_w^2 / delta^2 for the total N.
    fn variance_factor(&self) -> f64 {
        match self {
            BioequivalenceLayout::Crossover => 2.0,
            BioequivalenceLayout::Parallel => 4.0,
        }
    }
    
    /// Name of the unit `n_per_arm` counts.
    pub fn unit_label(&self) -> &'static str {
        match self {
            BioequivalenceLayout::Crossover => "Sequence",
            BioequivalenceLayout::Parallel => "Group",
        }
    }
}

impl FromStr for BioequivalenceLayout {
    type Err = PlanError;
    
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "crossover" => Ok(BioequivalenceLayout::Crossover),
            "parallel" => Ok(BioequivalenceLayout::Parallel),
            other => Err(PlanError::invalid(
                "layout",
                format!("unknown bioequivalence layout '{}'", other),
            )),
        }
    }
}

impl fmt::Display for BioequivalenceLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn equal_allocation() -> f64 {
    1.0
}

/// Everything one calculation needs, tagged by design family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "design", rename_all = "lowercase")]
pub enum DesignInputs {
    Parallel {
        effect_size: f64,
        std_dev: f64,
        number_of_arms: u32,
        #[serde(default = "equal_allocation")]
        allocation_ratio: f64,
        assumptions: Assumptions,
    },
    Crossover {
        effect_size: f64,
        std_dev_within: f64,
        assumptions: Assumptions,
    },
    Bioequivalence {
        cv_percent: f64,
        margins: EquivalenceMargins,
        #[serde(default)]
        layout: BioequivalenceLayout,
        assumptions: Assumptions,
    },
}

impl DesignInputs {
    pub fn design_type(&self) -> DesignType {
        match self {
            DesignInputs::Parallel { .. } => DesignType::Parallel,
            DesignInputs::Crossover { .. } => DesignType::Crossover,
            DesignInputs::Bioequivalence { .. } => DesignType::Bioequivalence,
        }
    }
    
    /// Replaces the swept assumption axis: the effect size, or the CV% for
    /// bioequivalence inputs.
    pub fn with_effect(&self, value: f64) -> Self {
        let mut inputs = self.clone();
        match &mut inputs {
            DesignInputs::Parallel { effect_size, .. }
            | DesignInputs::Crossover { effect_size, .. } => *effect_size = value,
            DesignInputs::Bioequivalence { cv_percent, .. } => *cv_percent = value,
        }
        inputs
    }
    
    pub fn with_dropout(&self, dropout_rate: f64) -> Self {
        let mut inputs = self.clone();
        match &mut inputs {
            DesignInputs::Parallel { assumptions, .. }
            | DesignInputs::Crossover { assumptions, .. }
            | DesignInputs::Bioequivalence { assumptions, .. } => {
                assumptions.dropout_rate = dropout_rate;
            }
        }
        inputs
    }
}

#[derive(Debug, Clone)]
pub struct SampleSizeCalculator {
    quantiles: ZQuantiles,
    defaults: Assumptions,
}

impl SampleSizeCalculator {
    pub fn new(config: &PlannerConfig) -> Self {
        Self {
            quantiles: ZQuantiles::from_config(config),
            defaults: Assumptions::from_config(&config.statistics),
        }
    }
    
    pub fn default_assumptions(&self) -> Assumptions {
        self.defaults
    }
    
    pub fn calculate(&self, inputs: &DesignInputs) -> PlanResult<SampleSizeResult> {
        match inputs {
            DesignInputs::Parallel { effect_size, std_dev, number_of_arms, allocation_ratio, assumptions } => {
                self.calculate_parallel_design_with_allocation(
                    *effect_size, *std_dev, *number_of_arms, *allocation_ratio, assumptions,
                )
            }
            DesignInputs::Crossover { effect_size, std_dev_within, assumptions } => {
                self.calculate_crossover_design(*effect_size, *std_dev_within, assumptions)
            }
            DesignInputs::Bioequivalence { cv_percent, margins, layout, assumptions } => {
                self.calculate_bioequivalence_design_with_layout(*cv_percent, *margins, *layout, assumptions)
            }
        }
    }
    
    /// Two-sided two-sample comparison of means. With more than two arms each
    /// pairwise comparison is sized independently, with no multiplicity
    /// correction.
    pub fn calculate_parallel_design(
        &self,
        effect_size: f64,
        std_dev: f64,
        number_of_arms: u32,
        assumptions: &Assumptions,
    ) -> PlanResult<SampleSizeResult> {
        self.calculate_parallel_design_with_allocation(effect_size, std_dev, number_of_arms, 1.0, assumptions)
    }
    
    /// Parallel design where every treatment arm enrols `allocation_ratio`
    /// subjects per subject in the reference (control) arm. The arm sizes keep
    /// the variance of each treatment-vs-reference contrast equal to the 1:1
    /// design: n_ref = n (1 + 1/r) / 2 and n_trt = n (1 + r) / 2.
    pub fn calculate_parallel_design_with_allocation(
        &self,
        effect_size: f64,
        std_dev: f64,
        number_of_arms: u32,
        allocation_ratio: f64,
        assumptions: &Assumptions,
    ) -> PlanResult<SampleSizeResult> {
        info!(
            "Calculating sample size for parallel design ({} arms, allocation 1:{})",
            number_of_arms, allocation_ratio
        );
        
        if number_of_arms < 2 {
            return Err(PlanError::invalid(
                "number_of_arms",
                format!("parallel comparison needs at least 2 arms (got {})", number_of_arms),
            ));
        }
        if !(allocation_ratio > 0.0 && allocation_ratio.is_finite()) {
            return Err(PlanError::invalid(
                "allocation_ratio",
                format!("{} must be finite and positive", allocation_ratio),
            ));
        }
        validate_effect(effect_size, std_dev, "std_dev")?;
        assumptions.validate()?;
        
        let z_alpha = self.quantiles.quantile(1.0 - assumptions.alpha / 2.0)?;
        let z_beta = self.quantiles.quantile(assumptions.power)?;
        
        let spread = std_dev / effect_size;
        let n = 2.0 * (z_alpha + z_beta).powi(2) * spread * spread;
        debug!("Unrounded parallel n per arm (1:1): {:.4}", n);
        
        let inputs = CalculationInputs {
            effect_size: Some(effect_size),
            std_dev: Some(std_dev),
            standardized_effect: Some(effect_size / std_dev),
            cv_percent: None,
            theta1: None,
            theta2: None,
            layout: None,
            alpha: assumptions.alpha,
            power: assumptions.power,
            dropout_rate: assumptions.dropout_rate,
            z_alpha,
            z_beta,
        };
        
        if allocation_ratio == 1.0 {
            return assemble(DesignType::Parallel, number_of_arms, ceil_count(n)?, None, inputs);
        }
        
        let n_reference = n * (1.0 + 1.0 / allocation_ratio) / 2.0;
        let n_treatment = n * (1.0 + allocation_ratio) / 2.0;
        debug!("Unequal allocation: reference {:.4}, treatment {:.4}", n_reference, n_treatment);
        
        assemble(
            DesignType::Parallel,
            number_of_arms,
            ceil_count(n_treatment)?,
            Some((allocation_ratio, ceil_count(n_reference)?)),
            inputs,
        )
    }
    
    /// Paired within-subject comparison; every subject is their own control,
    /// so the result reports a single subject pool.
    pub fn calculate_crossover_design(
        &self,
        effect_size: f64,
        std_dev_within: f64,
        assumptions: &Assumptions,
    ) -> PlanResult<SampleSizeResult> {
        info!("Calculating sample size for crossover design");
        
        validate_effect(effect_size, std_dev_within, "std_dev_within")?;
        assumptions.validate()?;
        
        let z_alpha = self.quantiles.quantile(1.0 - assumptions.alpha / 2.0)?;
        let z_beta = self.quantiles.quantile(assumptions.power)?;
        
        let spread = std_dev_within / effect_size;
        let n = (z_alpha + z_beta).powi(2) * spread * spread;
        debug!("Unrounded crossover n: {:.4}", n);
        
        let inputs = CalculationInputs {
            effect_size: Some(effect_size),
            std_dev: Some(std_dev_within),
            standardized_effect: Some(effect_size / std_dev_within),
            cv_percent: None,
            theta1: None,
            theta2: None,
            layout: None,
            alpha: assumptions.alpha,
            power: assumptions.power,
            dropout_rate: assumptions.dropout_rate,
            z_alpha,
            z_beta,
        };
        
        assemble(DesignType::Crossover, 1, ceil_count(n)?, None, inputs)
    }
    
    /// Two one-sided tests on the log scale for a 2x2 crossover, assuming a
    /// true ratio of 1. Reports per-sequence and total subjects.
    pub fn calculate_bioequivalence_design(
        &self,
        cv_percent: f64,
        margins: EquivalenceMargins,
        assumptions: &Assumptions,
    ) -> PlanResult<SampleSizeResult> {
        self.calculate_bioequivalence_design_with_layout(
            cv_percent, margins, BioequivalenceLayout::Crossover, assumptions,
        )
    }
    
    pub fn calculate_bioequivalence_design_with_layout(
        &self,
        cv_percent: f64,
        margins: EquivalenceMargins,
        layout: BioequivalenceLayout,
        assumptions: &Assumptions,
    ) -> PlanResult<SampleSizeResult> {
        info!(
            "Calculating sample size for {} bioequivalence design (CV {}%, {}-{})",
            layout, cv_percent, margins.theta1, margins.theta2
        );
        
        if !(cv_percent > 0.0 && cv_percent.is_finite()) {
            return Err(PlanError::invalid(
                "cv_percent",
                format!("{} must be a positive percentage", cv_percent),
            ));
        }
        margins.validate()?;
        assumptions.validate()?;
        
        let z_alpha = self.quantiles.quantile(1.0 - assumptions.alpha)?;
        let z_beta = self.quantiles.quantile(assumptions.power)?;
        
        let cv = cv_percent / 100.0;
        let sigma_w2 = (1.0 + cv * cv).ln();
        let delta = margins.log_margin();
        let total = layout.variance_factor() * (z_alpha + z_beta).powi(2) * sigma_w2 / delta.powi(2);
        debug!("Unrounded bioequivalence total N: {:.4} (sigma_w^2 = {:.5})", total, sigma_w2);
        
        let inputs = CalculationInputs {
            effect_size: None,
            std_dev: Some(sigma_w2.sqrt()),
            standardized_effect: None,
            cv_percent: Some(cv_percent),
            theta1: Some(margins.theta1),
            theta2: Some(margins.theta2),
            layout: Some(layout),
            alpha: assumptions.alpha,
            power: assumptions.power,
            dropout_rate: assumptions.dropout_rate,
            z_alpha,
            z_beta,
        };
        
        assemble(DesignType::Bioequivalence, 2, ceil_count(total / 2.0)?, None, inputs)
    }
    
    /// Lazy grid over effect sizes (outer) and dropout rates (inner).
    pub fn sensitivity_analysis<'a>(
        &'a self,
        base: DesignInputs,
        effect_size_range: &'a [f64],
        dropout_rate_range: &'a [f64],
    ) -> SensitivitySweep<'a> {
        info!(
            "Sensitivity analysis for {} design over {} x {} grid",
            base.design_type(),
            effect_size_range.len(),
            dropout_rate_range.len()
        );
        SensitivitySweep::new(self, base, effect_size_range, dropout_rate_range)
    }
}

fn validate_effect(effect_size: f64, std_dev: f64, std_dev_field: &str) -> PlanResult<()> {
    if !effect_size.is_finite() {
        return Err(PlanError::invalid("effect_size", "must be finite"));
    }
    if effect_size == 0.0 {
        return Err(PlanError::invalid(
            "effect_size",
            "zero effect size implies an infinite sample size",
        ));
    }
    if !(std_dev > 0.0 && std_dev.is_finite()) {
        return Err(PlanError::invalid(
            std_dev_field,
            format!("{} must be finite and positive", std_dev),
        ));
    }
    Ok(())
}

fn ceil_count(n: f64) -> PlanResult<u32> {
    if !n.is_finite() {
        return Err(PlanError::invalid(
            "effect_size",
            format!("sample size evaluates to {}; effect and variability are out of range", n),
        ));
    }
    let n = (n - CEIL_TOLERANCE).ceil().max(1.0);
    if n > u32::MAX as f64 {
        return Err(PlanError::invalid(
            "effect_size",
            "effect is too small relative to its variability; sample size overflows",
        ));
    }
    Ok(n as u32)
}

/// `reference` carries the allocation ratio and the reference-arm size when
/// arms are unequal; `n_per_arm` then counts each of the other arms.
fn assemble(
    design_type: DesignType,
    number_of_arms: u32,
    n_per_arm: u32,
    reference: Option<(f64, u32)>,
    inputs: CalculationInputs,
) -> PlanResult<SampleSizeResult> {
    let retention = 1.0 - inputs.dropout_rate;
    let adjust = |n: u32| ceil_count(n as f64 / retention);
    
    let n_per_arm_adjusted = adjust(n_per_arm)?;
    let reference_arm = match reference {
        Some((allocation_ratio, n)) => Some(ReferenceArm {
            allocation_ratio,
            n,
            n_adjusted: adjust(n)?,
        }),
        None => None,
    };
    
    let total = |per_arm: u32, reference_n: Option<u32>| {
        let (fixed, repeated_arms) = match reference_n {
            Some(n) => (n, number_of_arms.saturating_sub(1)),
            None => (0, number_of_arms),
        };
        per_arm
            .checked_mul(repeated_arms)
            .and_then(|t| t.checked_add(fixed))
            .ok_or_else(|| PlanError::invalid("number_of_arms", "total sample size overflows"))
    };
    let total_n = total(n_per_arm, reference_arm.map(|r| r.n))?;
    let total_n_adjusted = total(n_per_arm_adjusted, reference_arm.map(|r| r.n_adjusted))?;
    
    info!(
        "Sample size calculated: {} per arm (total: {}, {} before dropout adjustment)",
        n_per_arm_adjusted, total_n_adjusted, total_n
    );
    
    Ok(SampleSizeResult {
        design_type,
        number_of_arms,
        n_per_arm,
        n_per_arm_adjusted,
        total_n,
        total_n_adjusted,
        reference_arm,
        inputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    
    fn calculator() -> SampleSizeCalculator {
        SampleSizeCalculator::new(&PlannerConfig::default())
    }
    
    fn reference_parallel(effect: f64, sd: f64, alpha: f64, power: f64) -> u32 {
        let q = ZQuantiles::from_config(&PlannerConfig::default());
        let z = q.quantile(1.0 - alpha / 2.0).unwrap() + q.quantile(power).unwrap();
        (2.0 * z * z * sd * sd / (effect * effect)).ceil() as u32
    }
    
    #[test]
    fn test_parallel_reference_scenario() {
        let result = calculator()
            .calculate_parallel_design(300.0, 500.0, 2, &Assumptions::default())
            .unwrap();
        
        assert_eq!(result.n_per_arm, reference_parallel(300.0, 500.0, 0.05, 0.8));
        assert_eq!(result.n_per_arm, 44);
        assert_eq!(result.total_n, 88);
        assert_eq!(result.n_per_arm_adjusted, 44);
        assert_eq!(result.total_n_adjusted, 88);
        assert_relative_eq!(result.inputs.standardized_effect.unwrap(), 0.6, epsilon = 1e-12);
    }
    
    #[test]
    fn test_parallel_dropout_adjustment() {
        let assumptions = Assumptions::default().with_dropout(0.15);
        let result = calculator().calculate_parallel_design(300.0, 500.0, 3, &assumptions).unwrap();
        
        assert_eq!(result.n_per_arm, 44);
        assert_eq!(result.n_per_arm_adjusted, 52); // ceil(44 / 0.85)
        assert_eq!(result.total_n, 132);
        assert_eq!(result.total_n_adjusted, 156);
    }
    
    #[test]
    fn test_adjusted_totals_are_consistent() {
        let calc = calculator();
        for &(effect, sd, arms, dropout) in &[
            (1.0, 1.0, 2u32, 0.0),
            (-12.5, 30.0, 4, 0.2),
            (0.3, 2.0, 2, 0.5),
            (50.0, 10.0, 5, 0.05),
        ] {
            let assumptions = Assumptions::default().with_dropout(dropout);
            let r = calc.calculate_parallel_design(effect, sd, arms, &assumptions).unwrap();
            assert!(r.n_per_arm_adjusted >= r.n_per_arm);
            assert!(r.total_n_adjusted >= r.total_n);
            assert_eq!(r.total_n_adjusted, r.n_per_arm_adjusted * arms);
            assert!(r.n_per_arm >= 1);
        }
    }
    
    #[test]
    fn test_monotonic_in_dropout() {
        let calc = calculator();
        let mut previous = 0;
        for dropout in [0.0, 0.05, 0.1, 0.2, 0.35, 0.5, 0.9] {
            let assumptions = Assumptions::default().with_dropout(dropout);
            let r = calc.calculate_parallel_design(200.0, 500.0, 2, &assumptions).unwrap();
            assert!(r.total_n_adjusted >= previous);
            previous = r.total_n_adjusted;
        }
    }
    
    #[test]
    fn test_monotonic_in_effect_magnitude() {
        let calc = calculator();
        let mut previous = 0;
        for effect in [500.0, 400.0, -300.0, 250.0, -100.0, 10.0] {
            let r = calc.calculate_parallel_design(effect, 500.0, 2, &Assumptions::default()).unwrap();
            assert!(r.n_per_arm >= previous);
            previous = r.n_per_arm;
        }
    }
    
    #[test]
    fn test_parallel_rejects_invalid_inputs() {
        let calc = calculator();
        let a = Assumptions::default();
        
        assert!(matches!(
            calc.calculate_parallel_design(0.0, 500.0, 2, &a),
            Err(PlanError::InvalidInput { ref field, .. }) if field == "effect_size"
        ));
        assert!(calc.calculate_parallel_design(300.0, 0.0, 2, &a).is_err());
        assert!(calc.calculate_parallel_design(300.0, -1.0, 2, &a).is_err());
        assert!(calc.calculate_parallel_design(300.0, 500.0, 1, &a).is_err());
        assert!(calc.calculate_parallel_design(f64::INFINITY, 500.0, 2, &a).is_err());
        assert!(calc.calculate_parallel_design(300.0, 500.0, 2, &a.with_alpha(1.2)).is_err());
        assert!(calc.calculate_parallel_design(300.0, 500.0, 2, &a.with_dropout(1.0)).is_err());
    }
    
    #[test]
    fn test_crossover_has_no_factor_two() {
        let result = calculator()
            .calculate_crossover_design(300.0, 500.0, &Assumptions::default().with_dropout(0.1))
            .unwrap();
        
        assert_eq!(result.number_of_arms, 1);
        assert_eq!(result.n_per_arm, 22);
        assert_eq!(result.total_n, 22);
        assert_eq!(result.n_per_arm_adjusted, 25); // ceil(22 / 0.9)
        assert_eq!(result.total_n_adjusted, 25);
    }
    
    #[test]
    fn test_crossover_rejects_zero_effect() {
        assert!(calculator()
            .calculate_crossover_design(0.0, 1.0, &Assumptions::default())
            .is_err());
    }
    
    #[test]
    fn test_bioequivalence_default_margins() {
        let result = calculator()
            .calculate_bioequivalence_design(25.0, EquivalenceMargins::default(), &Assumptions::default())
            .unwrap();
        
        // N = 2 (z_0.95 + z_0.8)^2 ln(1.0625) / ln(1.25)^2 = 15.05
        assert_eq!(result.number_of_arms, 2);
        assert_eq!(result.n_per_arm, 8);
        assert_eq!(result.total_n, 16);
        assert_eq!(result.inputs.theta1, Some(0.8));
    }
    
    #[test]
    fn test_bioequivalence_grows_with_cv() {
        let calc = calculator();
        let a = Assumptions::default().with_dropout(0.15);
        let low = calc.calculate_bioequivalence_design(15.0, EquivalenceMargins::default(), &a).unwrap();
        let high = calc.calculate_bioequivalence_design(40.0, EquivalenceMargins::default(), &a).unwrap();
        assert!(high.total_n_adjusted > low.total_n_adjusted);
    }
    
    #[test]
    fn test_bioequivalence_rejects_bad_inputs() {
        let calc = calculator();
        let a = Assumptions::default();
        assert!(calc.calculate_bioequivalence_design(0.0, EquivalenceMargins::default(), &a).is_err());
        assert!(calc.calculate_bioequivalence_design(
            25.0, EquivalenceMargins { theta1: 1.0, theta2: 1.25 }, &a
        ).is_err());
        assert!(calc.calculate_bioequivalence_design(
            25.0, EquivalenceMargins { theta1: 0.8, theta2: 0.95 }, &a
        ).is_err());
    }
    
    #[test]
    fn test_asymmetric_margins_use_narrower_side() {
        let calc = calculator();
        let a = Assumptions::default();
        let narrow = calc.calculate_bioequivalence_design(
            30.0, EquivalenceMargins { theta1: 0.9, theta2: 1.25 }, &a
        ).unwrap();
        let wide = calc.calculate_bioequivalence_design(30.0, EquivalenceMargins::default(), &a).unwrap();
        assert!(narrow.total_n > wide.total_n);
    }
    
    #[test]
    fn test_extreme_magnitudes_keep_standardized_effect() {
        let calc = calculator();
        let a = Assumptions::default();
        let unit = calc.calculate_parallel_design(1.0, 1.0, 2, &a).unwrap();
        assert_eq!(unit.n_per_arm, 16);
        
        for scale in [1e200, 1e-200] {
            let r = calc.calculate_parallel_design(scale, scale, 2, &a).unwrap();
            assert_eq!(r.n_per_arm, unit.n_per_arm);
            assert_eq!(r.total_n, 32);
            
            let c = calc.calculate_crossover_design(scale, scale, &a).unwrap();
            assert_eq!(c.n_per_arm, 8);
        }
    }
    
    #[test]
    fn test_unrepresentable_sample_size_is_rejected() {
        let calc = calculator();
        let a = Assumptions::default();
        assert!(matches!(
            calc.calculate_parallel_design(1e-200, 1e200, 2, &a),
            Err(PlanError::InvalidInput { ref field, .. }) if field == "effect_size"
        ));
        assert!(calc.calculate_crossover_design(1e-200, 1e200, &a).is_err());
        assert!(calc.calculate_parallel_design(1e-6, 1e6, 2, &a).is_err());
    }
    
    #[test]
    fn test_unequal_allocation_keeps_contrast_variance() {
        let calc = calculator();
        let a = Assumptions::default();
        let equal = calc.calculate_parallel_design(300.0, 500.0, 2, &a).unwrap();
        let r = calc.calculate_parallel_design_with_allocation(300.0, 500.0, 2, 2.0, &a).unwrap();
        
        // n = 43.60 at 1:1; reference n (1 + 1/2) / 2, treatment n (1 + 2) / 2
        let reference = r.reference_arm.unwrap();
        assert_eq!(reference.n, 33);
        assert_eq!(r.n_per_arm, 66);
        assert_eq!(r.total_n, 99);
        assert_relative_eq!(reference.allocation_ratio, 2.0);
        assert!(r.total_n > equal.total_n);
        
        let unrounded = 2.0 * (r.inputs.z_alpha + r.inputs.z_beta).powi(2) * (500.0f64 / 300.0).powi(2);
        let variance = 1.0 / reference.n as f64 + 1.0 / r.n_per_arm as f64;
        assert!(variance <= 2.0 / unrounded);
    }
    
    #[test]
    fn test_unequal_allocation_with_dropout_and_arms() {
        let calc = calculator();
        let a = Assumptions::default().with_dropout(0.1);
        let r = calc.calculate_parallel_design_with_allocation(300.0, 500.0, 3, 2.0, &a).unwrap();
        let reference = r.reference_arm.unwrap();
        
        assert_eq!(reference.n_adjusted, 37); // ceil(33 / 0.9)
        assert_eq!(r.n_per_arm_adjusted, 74); // ceil(66 / 0.9)
        assert_eq!(r.total_n, 33 + 2 * 66);
        assert_eq!(r.total_n_adjusted, 37 + 2 * 74);
    }
    
    #[test]
    fn test_equal_allocation_matches_default() {
        let calc = calculator();
        let a = Assumptions::default();
        let explicit = calc.calculate_parallel_design_with_allocation(300.0, 500.0, 2, 1.0, &a).unwrap();
        let default = calc.calculate_parallel_design(300.0, 500.0, 2, &a).unwrap();
        assert_eq!(explicit, default);
        assert!(explicit.reference_arm.is_none());
    }
    
    #[test]
    fn test_invalid_allocation_ratio() {
        let calc = calculator();
        let a = Assumptions::default();
        for ratio in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                calc.calculate_parallel_design_with_allocation(300.0, 500.0, 2, ratio, &a),
                Err(PlanError::InvalidInput { ref field, .. }) if field == "allocation_ratio"
            ));
        }
    }
    
    #[test]
    fn test_parallel_bioequivalence_doubles_per_group() {
        let calc = calculator();
        let a = Assumptions::default();
        let crossover = calc
            .calculate_bioequivalence_design(25.0, EquivalenceMargins::default(), &a)
            .unwrap();
        let parallel = calc
            .calculate_bioequivalence_design_with_layout(
                25.0, EquivalenceMargins::default(), BioequivalenceLayout::Parallel, &a,
            )
            .unwrap();
        
        // total N = 4 (z_0.95 + z_0.8)^2 ln(1.0625) / ln(1.25)^2 = 30.11, 16 per group
        assert_eq!(parallel.number_of_arms, 2);
        assert_eq!(parallel.n_per_arm, 16);
        assert_eq!(parallel.total_n, 32);
        assert_eq!(parallel.inputs.layout, Some(BioequivalenceLayout::Parallel));
        assert_eq!(crossover.inputs.layout, Some(BioequivalenceLayout::Crossover));
        assert!(parallel.total_n >= 2 * crossover.total_n - 2);
    }
    
    #[test]
    fn test_design_inputs_defaults_from_json() {
        let parallel: DesignInputs = serde_json::from_str(
            r#"{"design": "parallel", "effect_size": 300.0, "std_dev": 500.0, "number_of_arms": 2,
                "assumptions": {"alpha": 0.05, "power": 0.8, "dropout_rate": 0.0}}"#,
        ).unwrap();
        assert!(matches!(parallel, DesignInputs::Parallel { allocation_ratio, .. } if allocation_ratio == 1.0));
        assert_eq!(calculator().calculate(&parallel).unwrap().total_n, 88);
        
        let be: DesignInputs = serde_json::from_str(
            r#"{"design": "bioequivalence", "cv_percent": 25.0, "margins": {"theta1": 0.8, "theta2": 1.25},
                "layout": "parallel", "assumptions": {"alpha": 0.05, "power": 0.8, "dropout_rate": 0.0}}"#,
        ).unwrap();
        assert_eq!(calculator().calculate(&be).unwrap().n_per_arm, 16);
        
        assert_eq!("Parallel".parse::<BioequivalenceLayout>().unwrap(), BioequivalenceLayout::Parallel);
        assert!("williams".parse::<BioequivalenceLayout>().is_err());
    }
    
    #[test]
    fn test_crossover_rejects_invalid_inputs() {
        let calc = calculator();
        let a = Assumptions::default();
        for sd in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                calc.calculate_crossover_design(300.0, sd, &a),
                Err(PlanError::InvalidInput { ref field, .. }) if field == "std_dev_within"
            ));
        }
        assert!(calc.calculate_crossover_design(300.0, 500.0, &a.with_alpha(0.0)).is_err());
        assert!(calc.calculate_crossover_design(300.0, 500.0, &a.with_alpha(1.0)).is_err());
        assert!(calc.calculate_crossover_design(300.0, 500.0, &a.with_power(0.0)).is_err());
        assert!(calc.calculate_crossover_design(300.0, 500.0, &a.with_power(1.5)).is_err());
        assert!(calc.calculate_crossover_design(300.0, 500.0, &a.with_dropout(1.0)).is_err());
    }
    
    #[test]
    fn test_bioequivalence_rejects_invalid_assumptions() {
        let calc = calculator();
        let a = Assumptions::default();
        let margins = EquivalenceMargins::default();
        assert!(matches!(
            calc.calculate_bioequivalence_design(25.0, margins, &a.with_alpha(-0.05)),
            Err(PlanError::InvalidInput { ref field, .. }) if field == "alpha"
        ));
        assert!(matches!(
            calc.calculate_bioequivalence_design(25.0, margins, &a.with_power(1.0)),
            Err(PlanError::InvalidInput { ref field, .. }) if field == "power"
        ));
        assert!(calc.calculate_bioequivalence_design(25.0, margins, &a.with_dropout(-0.1)).is_err());
        assert!(calc.calculate_bioequivalence_design(f64::NAN, margins, &a).is_err());
    }
}
