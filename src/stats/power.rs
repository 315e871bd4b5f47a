use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use super::SampleSizeResult;
use crate::error::{PlanError, PlanResult};
use crate::models::DesignType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerEstimate {
    pub design_type: DesignType,
    pub subjects_per_arm: u32,
    pub replicates: usize,
    pub rejections: usize,
    pub empirical_power: f64,
    pub target_power: f64,
}

/// Monte-Carlo re-check of a computed sample size: simulate trials of the
/// unadjusted size under the assumed effect and count z-test rejections.
pub struct PowerSimulator {
    rng: StdRng,
}

impl PowerSimulator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }
    
    pub fn simulate(&mut self, result: &SampleSizeResult, replicates: usize) -> PlanResult<PowerEstimate> {
        if replicates == 0 {
            return Err(PlanError::invalid("replicates", "at least one replicate is required"));
        }
        
        let inputs = &result.inputs;
        let (effect, sd) = match (result.design_type, inputs.effect_size, inputs.std_dev) {
            (DesignType::Parallel, Some(e), Some(sd)) | (DesignType::Crossover, Some(e), Some(sd)) => (e, sd),
            _ => return Err(PlanError::invalid(
                "design_type",
                format!("power simulation supports parallel and crossover results, not {}", result.design_type),
            )),
        };
        
        info!(
            "Simulating power for {} design: {} replicates of n = {}",
            result.design_type, replicates, result.n_per_arm
        );
        
        let n = result.n_per_arm as usize;
        let n_control = result.reference_arm.map_or(n, |r| r.n as usize);
        let noise = Normal::new(0.0, sd).map_err(|e| PlanError::invalid("std_dev", e.to_string()))?;
        
        let mut rejections = 0;
        for replicate in 0..replicates {
            let statistic = match result.design_type {
                DesignType::Parallel => self.parallel_statistic(&noise, effect, sd, n_control, n),
                _ => self.paired_statistic(&noise, effect, sd, n),
            };
            if statistic.abs() > inputs.z_alpha {
                rejections += 1;
            }
            if replicate > 0 && replicate % 1000 == 0 {
                debug!("Replicate {}/{}: {} rejections", replicate, replicates, rejections);
            }
        }
        
        let empirical_power = rejections as f64 / replicates as f64;
        info!("Empirical power {:.3} (target {:.3})", empirical_power, inputs.power);
        
        Ok(PowerEstimate {
            design_type: result.design_type,
            subjects_per_arm: result.n_per_arm,
            replicates,
            rejections,
            empirical_power,
            target_power: inputs.power,
        })
    }
    
    fn parallel_statistic(
        &mut self,
        noise: &Normal<f64>,
        effect: f64,
        sd: f64,
        n_control: usize,
        n_treated: usize,
    ) -> f64 {
        let control: f64 = (0..n_control).map(|_| noise.sample(&mut self.rng)).sum::<f64>() / n_control as f64;
        let treated: f64 = (0..n_treated).map(|_| effect + noise.sample(&mut self.rng)).sum::<f64>() / n_treated as f64;
        let standard_error = sd * (1.0 / n_control as f64 + 1.0 / n_treated as f64).sqrt();
        (treated - control) / standard_error
    }
    
    fn paired_statistic(&mut self, noise: &Normal<f64>, effect: f64, sd: f64, n: usize) -> f64 {
        let mean_diff: f64 = (0..n).map(|_| effect + noise.sample(&mut self.rng)).sum::<f64>() / n as f64;
        mean_diff / (sd / (n as f64).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlannerConfig;
    use crate::stats::{Assumptions, EquivalenceMargins, SampleSizeCalculator};
    
    #[test]
    fn test_parallel_power_near_target() {
        let calculator = SampleSizeCalculator::new(&PlannerConfig::default());
        let result = calculator
            .calculate_parallel_design(300.0, 500.0, 2, &Assumptions::default())
            .unwrap();
        
        let mut simulator = PowerSimulator::new(Some(42));
        let estimate = simulator.simulate(&result, 2000).unwrap();
        assert_eq!(estimate.replicates, 2000);
        assert!((estimate.empirical_power - 0.8).abs() < 0.05, "power {}", estimate.empirical_power);
    }
    
    #[test]
    fn test_crossover_power_near_target() {
        let calculator = SampleSizeCalculator::new(&PlannerConfig::default());
        let result = calculator
            .calculate_crossover_design(2.0, 4.0, &Assumptions::default().with_power(0.9))
            .unwrap();
        
        let estimate = PowerSimulator::new(Some(7)).simulate(&result, 2000).unwrap();
        assert!((estimate.empirical_power - 0.9).abs() < 0.05, "power {}", estimate.empirical_power);
    }
    
    #[test]
    fn test_unequal_allocation_power_near_target() {
        let calculator = SampleSizeCalculator::new(&PlannerConfig::default());
        let result = calculator
            .calculate_parallel_design_with_allocation(300.0, 500.0, 2, 2.0, &Assumptions::default())
            .unwrap();
        
        let estimate = PowerSimulator::new(Some(11)).simulate(&result, 2000).unwrap();
        assert!((estimate.empirical_power - 0.8).abs() < 0.05, "power {}", estimate.empirical_power);
    }
    
    #[test]
    fn test_same_seed_same_estimate() {
        let calculator = SampleSizeCalculator::new(&PlannerConfig::default());
        let result = calculator
            .calculate_parallel_design(1.0, 2.0, 2, &Assumptions::default())
            .unwrap();
        
        let a = PowerSimulator::new(Some(1)).simulate(&result, 200).unwrap();
        let b = PowerSimulator::new(Some(1)).simulate(&result, 200).unwrap();
        assert_eq!(a, b);
    }
    
    #[test]
    fn test_bioequivalence_not_supported() {
        let calculator = SampleSizeCalculator::new(&PlannerConfig::default());
        let result = calculator
            .calculate_bioequivalence_design(25.0, EquivalenceMargins::default(), &Assumptions::default())
            .unwrap();
        assert!(PowerSimulator::new(Some(1)).simulate(&result, 10).is_err());
        assert!(PowerSimulator::new(Some(1)).simulate(&result, 0).is_err());
    }
}
