pub mod compare;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use crate::config::{DesignRulesConfig, PlannerConfig};
use crate::error::{PlanError, PlanResult};
use crate::models::{DesignType, Drug, PKProfile, StudyDesign};

pub use compare::compare_design_types;

/// Caller intent that can override or steer the rule list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignConstraints {
    pub forced_design: Option<DesignType>,
    pub bioequivalence_intent: bool,
    pub max_study_duration_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignViolation {
    pub field: String,
    pub message: String,
}

impl DesignViolation {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self { field: field.to_string(), message: message.into() }
    }
}

/// Decision rules in priority order; the first that applies wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesignRule {
    ForcedDesign,
    ShortHalfLifeCrossover,
    BioequivalenceIntent,
    Parallel,
}

impl DesignRule {
    pub const PRIORITY: [DesignRule; 4] = [
        DesignRule::ForcedDesign,
        DesignRule::ShortHalfLifeCrossover,
        DesignRule::BioequivalenceIntent,
        DesignRule::Parallel,
    ];
    
    pub fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<StudyDesign> {
        match self {
            DesignRule::ForcedDesign => {
                let design_type = ctx.constraints.forced_design?;
                Some(match design_type {
                    DesignType::Parallel => ctx.design(DesignType::Parallel, ctx.treatments),
                    DesignType::Crossover => ctx.design(DesignType::Crossover, ctx.treatments)
                        .with_washout(ctx.washout_days()),
                    DesignType::Bioequivalence => ctx.design(DesignType::Bioequivalence, 2),
                })
            }
            DesignRule::ShortHalfLifeCrossover => {
                let half_life = ctx.half_life_hours?;
                if ctx.treatments < 2 || half_life >= ctx.rules.half_life_threshold_hours {
                    return None;
                }
                
                let washout = ctx.washout_days();
                if let Some(limit) = ctx.constraints.max_study_duration_days {
                    let periods = ctx.treatments as u64;
                    let span = periods * ctx.duration_days as u64 + (periods - 1) * washout as u64;
                    if span > limit as u64 {
                        debug!("Crossover span {} days exceeds limit of {} days", span, limit);
                        return None;
                    }
                }
                Some(ctx.design(DesignType::Crossover, ctx.treatments).with_washout(washout))
            }
            DesignRule::BioequivalenceIntent => {
                if ctx.treatments >= 2 && ctx.constraints.bioequivalence_intent {
                    Some(ctx.design(DesignType::Bioequivalence, 2))
                } else {
                    None
                }
            }
            DesignRule::Parallel => Some(ctx.design(DesignType::Parallel, ctx.treatments)),
        }
    }
}

/// Facts the rules decide on, resolved once per recommendation.
#[derive(Debug, Clone)]
pub struct RuleContext<'a> {
    pub rules: &'a DesignRulesConfig,
    pub constraints: &'a DesignConstraints,
    pub treatments: u32,
    pub half_life_hours: Option<f64>,
    pub duration_days: u32,
}

impl<'a> RuleContext<'a> {
    fn design(&self, design_type: DesignType, arms: u32) -> StudyDesign {
        StudyDesign::new(design_type, arms, self.duration_days)
    }
    
    /// Multiple of the half-life in whole days, never below the configured floor.
    pub fn washout_days(&self) -> u32 {
        let derived = self.half_life_hours
            .map(|h| (self.rules.washout_multiplier * h / 24.0).ceil() as u32)
            .unwrap_or(0);
        derived.max(self.rules.min_washout_days)
    }
}

#[derive(Debug, Clone)]
pub struct DesignSelector {
    rules: DesignRulesConfig,
}

impl DesignSelector {
    pub fn new(config: &PlannerConfig) -> Self {
        Self { rules: config.design.clone() }
    }
    
    pub fn recommend_design(
        &self,
        drug: &Drug,
        pk_profile: &PKProfile,
        number_of_treatments: u32,
        constraints: &DesignConstraints,
    ) -> PlanResult<StudyDesign> {
        info!("Recommending study design for {}", drug);
        
        drug.validate()?;
        if number_of_treatments < 1 {
            return Err(PlanError::invalid(
                "number_of_treatments",
                "at least one treatment is required",
            ));
        }
        if let Some(forced) = constraints.forced_design {
            if forced.is_comparative() && number_of_treatments < 2 {
                return Err(PlanError::invalid(
                    "constraints.forced_design",
                    format!("a {} design needs at least 2 treatments", forced),
                ));
            }
        }
        
        let ctx = RuleContext {
            rules: &self.rules,
            constraints,
            treatments: number_of_treatments,
            half_life_hours: pk_profile.half_life_hours().filter(|h| *h > 0.0),
            duration_days: self.rules.duration_for_indication(&drug.indication),
        };
        debug!(
            "Rule context: {} treatment(s), half-life {:?} h, duration {} days",
            ctx.treatments, ctx.half_life_hours, ctx.duration_days
        );
        
        let (rule, design) = DesignRule::PRIORITY.iter()
            .find_map(|rule| rule.evaluate(&ctx).map(|design| (*rule, design)))
            .unwrap_or_else(|| (DesignRule::Parallel, ctx.design(DesignType::Parallel, ctx.treatments)));
        
        info!("Rule {:?} selected: {}", rule, design);
        Ok(design)
    }
    
    /// Advisory consistency check; an empty list means the design is coherent.
    pub fn validate_design(&self, design: &StudyDesign) -> Vec<DesignViolation> {
        let mut violations = Vec::new();
        
        if design.number_of_arms == 0 {
            violations.push(DesignViolation::new("number_of_arms", "design has no arms"));
        } else if design.design_type.is_comparative() && design.number_of_arms < 2 {
            violations.push(DesignViolation::new(
                "number_of_arms",
                format!("{} design requires at least 2 arms", design.design_type),
            ));
        }
        
        if design.treatment_duration_days == 0 {
            violations.push(DesignViolation::new(
                "treatment_duration_days",
                "treatment duration must be positive",
            ));
        }
        
        match (design.design_type, design.washout_period_days) {
            (DesignType::Crossover, None) | (DesignType::Crossover, Some(0)) => {
                violations.push(DesignViolation::new(
                    "washout_period_days",
                    "crossover design must specify a positive washout period",
                ));
            }
            (DesignType::Crossover, Some(_)) | (_, None) => {}
            (other, Some(_)) => {
                violations.push(DesignViolation::new(
                    "washout_period_days",
                    format!("washout period is only meaningful for crossover, not {}", other),
                ));
            }
        }
        
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PKParameter;
    
    fn drug(indication: &str) -> Drug {
        Drug::new("Drug A", "compound-a", indication, "Tablet", "Oral").unwrap()
    }
    
    fn profile_with_half_life(hours: f64) -> PKProfile {
        let mut profile = PKProfile::new(&drug("Lung cancer"));
        profile.add_parameter(PKParameter::new("t1/2", hours, "h").unwrap());
        profile
    }
    
    fn selector() -> DesignSelector {
        DesignSelector::new(&PlannerConfig::default())
    }
    
    #[test]
    fn test_short_half_life_gives_crossover() {
        let design = selector()
            .recommend_design(&drug("Lung cancer"), &profile_with_half_life(12.0), 2, &DesignConstraints::default())
            .unwrap();
        
        assert_eq!(design.design_type, DesignType::Crossover);
        assert_eq!(design.number_of_arms, 2);
        // 5 x 12 h = 2.5 days, raised to the 7 day floor
        assert_eq!(design.washout_period_days, Some(7));
        assert_eq!(design.treatment_duration_days, 84);
    }
    
    #[test]
    fn test_washout_above_floor() {
        let config = PlannerConfig::from_json(r#"{ "design": { "half_life_threshold_hours": 72.0 } }"#).unwrap();
        let design = DesignSelector::new(&config)
            .recommend_design(&drug("Hypertension"), &profile_with_half_life(40.0), 2, &DesignConstraints::default())
            .unwrap();
        
        // ceil(5 x 40 / 24) = 9
        assert_eq!(design.washout_period_days, Some(9));
    }
    
    #[test]
    fn test_long_half_life_gives_parallel() {
        let design = selector()
            .recommend_design(&drug("Lung cancer"), &profile_with_half_life(36.0), 2, &DesignConstraints::default())
            .unwrap();
        assert_eq!(design.design_type, DesignType::Parallel);
        assert_eq!(design.washout_period_days, None);
    }
    
    #[test]
    fn test_single_treatment_is_single_arm_parallel() {
        let design = selector()
            .recommend_design(&drug("Lung cancer"), &profile_with_half_life(4.0), 1, &DesignConstraints::default())
            .unwrap();
        assert_eq!(design.design_type, DesignType::Parallel);
        assert_eq!(design.number_of_arms, 1);
    }
    
    #[test]
    fn test_unknown_pk_with_bioequivalence_intent() {
        let constraints = DesignConstraints { bioequivalence_intent: true, ..Default::default() };
        let empty = PKProfile::new(&drug("Bioequivalence study"));
        let design = selector()
            .recommend_design(&drug("Bioequivalence study"), &empty, 3, &constraints)
            .unwrap();
        
        assert_eq!(design.design_type, DesignType::Bioequivalence);
        assert_eq!(design.number_of_arms, 2);
        assert_eq!(design.treatment_duration_days, 28);
    }
    
    #[test]
    fn test_short_half_life_outranks_bioequivalence_intent() {
        let constraints = DesignConstraints { bioequivalence_intent: true, ..Default::default() };
        let design = selector()
            .recommend_design(&drug("Bioequivalence study"), &profile_with_half_life(1.0), 2, &constraints)
            .unwrap();
        assert_eq!(design.design_type, DesignType::Crossover);
    }
    
    #[test]
    fn test_duration_limit_skips_crossover() {
        let constraints = DesignConstraints { max_study_duration_days: Some(100), ..Default::default() };
        let design = selector()
            .recommend_design(&drug("Lung cancer"), &profile_with_half_life(12.0), 2, &constraints)
            .unwrap();
        // 2 x 84 + 7 exceeds 100 days
        assert_eq!(design.design_type, DesignType::Parallel);
    }
    
    #[test]
    fn test_forced_design_wins() {
        let constraints = DesignConstraints { forced_design: Some(DesignType::Crossover), ..Default::default() };
        let empty = PKProfile::new(&drug("Lung cancer"));
        let design = selector().recommend_design(&drug("Lung cancer"), &empty, 3, &constraints).unwrap();
        
        assert_eq!(design.design_type, DesignType::Crossover);
        assert_eq!(design.number_of_arms, 3);
        assert_eq!(design.washout_period_days, Some(7));
    }
    
    #[test]
    fn test_invalid_requests() {
        let s = selector();
        let profile = profile_with_half_life(12.0);
        assert!(s.recommend_design(&drug("Lung cancer"), &profile, 0, &DesignConstraints::default()).is_err());
        
        let forced = DesignConstraints { forced_design: Some(DesignType::Bioequivalence), ..Default::default() };
        assert!(s.recommend_design(&drug("Lung cancer"), &profile, 1, &forced).is_err());
        
        let mut nameless = drug("Lung cancer");
        nameless.name.clear();
        assert!(s.recommend_design(&nameless, &profile, 2, &DesignConstraints::default()).is_err());
    }
    
    #[test]
    fn test_rules_in_isolation() {
        let rules = DesignRulesConfig::default();
        let constraints = DesignConstraints::default();
        let ctx = RuleContext {
            rules: &rules,
            constraints: &constraints,
            treatments: 2,
            half_life_hours: None,
            duration_days: 28,
        };
        
        assert!(DesignRule::ForcedDesign.evaluate(&ctx).is_none());
        assert!(DesignRule::ShortHalfLifeCrossover.evaluate(&ctx).is_none());
        assert!(DesignRule::BioequivalenceIntent.evaluate(&ctx).is_none());
        assert_eq!(DesignRule::Parallel.evaluate(&ctx).unwrap().number_of_arms, 2);
        assert_eq!(ctx.washout_days(), 7);
    }
    
    #[test]
    fn test_recommended_designs_validate_cleanly() {
        let s = selector();
        let profiles = [
            PKProfile::new(&drug("Lung cancer")),
            profile_with_half_life(0.5),
            profile_with_half_life(12.0),
            profile_with_half_life(200.0),
        ];
        let constraint_sets = [
            DesignConstraints::default(),
            DesignConstraints { bioequivalence_intent: true, ..Default::default() },
            DesignConstraints { max_study_duration_days: Some(30), ..Default::default() },
            DesignConstraints { forced_design: Some(DesignType::Crossover), ..Default::default() },
        ];
        
        for profile in &profiles {
            for constraints in &constraint_sets {
                for treatments in 1..=4 {
                    let Ok(design) = s.recommend_design(&drug("Colorectal carcinoma"), profile, treatments, constraints) else {
                        continue;
                    };
                    assert!(s.validate_design(&design).is_empty(), "{:?}", design);
                }
            }
        }
    }
    
    #[test]
    fn test_validate_reports_violations() {
        let s = selector();
        
        let crossover = StudyDesign::new(DesignType::Crossover, 1, 0);
        let fields: Vec<String> = s.validate_design(&crossover).into_iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["number_of_arms", "treatment_duration_days", "washout_period_days"]);
        
        let parallel = StudyDesign::new(DesignType::Parallel, 0, 28).with_washout(5);
        assert_eq!(s.validate_design(&parallel).len(), 2);
        
        let ok = StudyDesign::new(DesignType::Crossover, 2, 14).with_washout(7);
        assert!(s.validate_design(&ok).is_empty());
    }
}
