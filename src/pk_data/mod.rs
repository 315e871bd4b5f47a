use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use crate::error::{PlanError, PlanResult};
use crate::models::{Drug, PKParameter, PKProfile};

pub trait PkDataSource {
    fn search_pk_data(&self, drug: &Drug, parameter_names: Option<&[&str]>) -> PlanResult<PKProfile>;
    
    fn comparative_data(&self, drugs: &[Drug]) -> PlanResult<BTreeMap<String, PKProfile>> {
        info!("Getting comparative PK data for {} drugs", drugs.len());
        drugs.iter()
            .map(|drug| Ok((drug.name.clone(), self.search_pk_data(drug, None)?)))
            .collect()
    }
}

/// Canned literature values; stands in for a real publication search.
#[derive(Debug, Clone, Default)]
pub struct MockPkSource;

impl PkDataSource for MockPkSource {
    fn search_pk_data(&self, drug: &Drug, parameter_names: Option<&[&str]>) -> PlanResult<PKProfile> {
        info!("Searching PK data for drug: {}", drug.name);
        
        let mut profile = PKProfile::new(drug);
        profile.study_reference = Some("Mock PubMed Reference".to_string());
        for (key, value) in [("age_range", "18-65"), ("gender", "mixed"), ("health_status", "healthy volunteers")] {
            profile.population_characteristics.insert(key.to_string(), value.to_string());
        }
        
        let canned = [
            ("Cmax", 125.5, "ng/mL", 0.25),
            ("AUC", 1850.0, "ng*h/mL", 0.30),
            ("Tmax", 2.5, "hours", 0.15),
            ("t1/2", 8.5, "hours", 0.20),
        ];
        
        for (name, value, unit, cv) in canned {
            let wanted = parameter_names
                .map(|names| names.iter().any(|n| n.eq_ignore_ascii_case(name)))
                .unwrap_or(true);
            if wanted {
                profile.add_parameter(
                    PKParameter::new(name, value, unit)?.with_cv(cv).with_source("PubMed:12345678")
                );
            }
        }
        
        if profile.parameters.is_empty() {
            warn!("No PK parameters matched the requested names for {}", drug.name);
        }
        info!("Found {} PK parameters", profile.parameters.len());
        Ok(profile)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CvCategory {
    Low,
    Medium,
    High,
}

impl CvCategory {
    pub fn coefficient_of_variation(&self) -> f64 {
        match self {
            CvCategory::Low => 0.15,
            CvCategory::Medium => 0.25,
            CvCategory::High => 0.40,
        }
    }
}

impl FromStr for CvCategory {
    type Err = PlanError;
    
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(CvCategory::Low),
            "medium" => Ok(CvCategory::Medium),
            "high" => Ok(CvCategory::High),
            other => Err(PlanError::invalid(
                "cv_category",
                format!("expected low, medium or high, got '{}'", other),
            )),
        }
    }
}

/// Request for the bioequivalence PK lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyInput {
    pub drug_name: String,
    pub fasting: bool,
    pub cv_category: CvCategory,
}

/// Representative bioequivalence profile for a generic oral capsule.
pub fn pk_parameters_for(input: &StudyInput) -> PlanResult<PKProfile> {
    let cv = input.cv_category.coefficient_of_variation();
    let condition = if input.fasting { "fasted" } else { "fed" };
    
    let drug = Drug::new(&input.drug_name, &input.drug_name, "Bioequivalence study", "Capsule", "Oral")?;
    let mut profile = PKProfile::new(&drug);
    profile.study_reference = Some("Internal PK database".to_string());
    profile.population_characteristics.insert("condition".to_string(), condition.to_string());
    profile.population_characteristics.insert(
        "cv_category".to_string(),
        format!("{:?}", input.cv_category).to_lowercase(),
    );
    
    profile.add_parameter(PKParameter::new("Cmax", 580.0, "ng/mL")?.with_cv(cv).with_source("PK-DB"));
    profile.add_parameter(PKParameter::new("AUC", 1200.0, "ng*h/mL")?.with_cv(cv).with_source("PK-DB"));
    profile.add_parameter(PKParameter::new("Tmax", 1.5, "h")?.with_cv(0.40).with_source("PK-DB"));
    profile.add_parameter(PKParameter::new("t1/2", 1.0, "h")?.with_cv(0.20).with_source("PK-DB"));
    
    info!(
        "PK parameters for {} ({}, CV={:?}): {} params",
        input.drug_name, condition, input.cv_category, profile.parameters.len()
    );
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    
    fn drug(name: &str) -> Drug {
        Drug::new(name, name, "Breast cancer", "Tablet", "Oral").unwrap()
    }
    
    #[test]
    fn test_mock_source_returns_canned_profile() {
        let profile = MockPkSource.search_pk_data(&drug("Letrozole"), None).unwrap();
        assert_eq!(profile.parameters.len(), 4);
        assert_eq!(profile.half_life_hours(), Some(8.5));
        assert_eq!(profile.drug_name, "Letrozole");
    }
    
    #[test]
    fn test_mock_source_filters_by_name() {
        let profile = MockPkSource.search_pk_data(&drug("Letrozole"), Some(&["cmax", "AUC"][..])).unwrap();
        let names: Vec<&str> = profile.parameters.iter().map(|p| p.parameter_name.as_str()).collect();
        assert_eq!(names, vec!["Cmax", "AUC"]);
        assert_eq!(profile.half_life_hours(), None);
    }
    
    #[test]
    fn test_comparative_data_keyed_by_name() {
        let data = MockPkSource.comparative_data(&[drug("A"), drug("B")]).unwrap();
        assert_eq!(data.keys().cloned().collect::<Vec<_>>(), vec!["A", "B"]);
    }
    
    #[test]
    fn test_bioequivalence_profile_uses_cv_category() {
        let input = StudyInput {
            drug_name: "Omeprazole".to_string(),
            fasting: false,
            cv_category: "high".parse().unwrap(),
        };
        let profile = pk_parameters_for(&input).unwrap();
        
        assert_eq!(profile.get_parameter("Cmax").unwrap().coefficient_of_variation, Some(0.40));
        assert_eq!(profile.population_characteristics["condition"], "fed");
        assert_eq!(profile.half_life_hours(), Some(1.0));
    }
    
    #[test]
    fn test_unknown_cv_category() {
        assert!("extreme".parse::<CvCategory>().is_err());
    }
}
