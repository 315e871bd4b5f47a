use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use super::{Drug, PKProfile};
use crate::error::{PlanError, PlanResult};
use crate::stats::SampleSizeResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesignType {
    Parallel,
    Crossover,
    Bioequivalence,
}

impl DesignType {
    pub const ALL: [DesignType; 3] = [
        DesignType::Parallel,
        DesignType::Crossover,
        DesignType::Bioequivalence,
    ];
    
    pub fn as_str(&self) -> &'static str {
        match self {
            DesignType::Parallel => "parallel",
            DesignType::Crossover => "crossover",
            DesignType::Bioequivalence => "bioequivalence",
        }
    }
    
    /// Designs that compare at least two treatments.
    pub fn is_comparative(&self) -> bool {
        matches!(self, DesignType::Crossover | DesignType::Bioequivalence)
    }
}

impl fmt::Display for DesignType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DesignType {
    type Err = PlanError;
    
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "parallel" => Ok(DesignType::Parallel),
            "crossover" => Ok(DesignType::Crossover),
            "bioequivalence" | "be" => Ok(DesignType::Bioequivalence),
            other => Err(PlanError::invalid(
                "design_type",
                format!("unknown design type '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Blinding {
    OpenLabel,
    SingleBlind,
    DoubleBlind,
}

impl fmt::Display for Blinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Blinding::OpenLabel => "open-label",
            Blinding::SingleBlind => "single-blind",
            Blinding::DoubleBlind => "double-blind",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyDesign {
    pub design_type: DesignType,
    pub number_of_arms: u32,
    pub treatment_duration_days: u32,
    pub washout_period_days: Option<u32>,
    pub blinding: Blinding,
    pub randomized: bool,
    pub stratification_factors: Vec<String>,
}

impl StudyDesign {
    pub fn new(design_type: DesignType, number_of_arms: u32, treatment_duration_days: u32) -> Self {
        Self {
            design_type,
            number_of_arms,
            treatment_duration_days,
            washout_period_days: None,
            blinding: Blinding::DoubleBlind,
            randomized: true,
            stratification_factors: Vec::new(),
        }
    }
    
    pub fn with_washout(mut self, days: u32) -> Self {
        self.washout_period_days = Some(days);
        self
    }
    
    /// Single-arm parallel designs have no between-arm comparison to power.
    pub fn needs_sample_size(&self) -> bool {
        !(self.design_type == DesignType::Parallel && self.number_of_arms < 2)
    }
}

impl fmt::Display for StudyDesign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} design with {} arm(s)", self.design_type, self.number_of_arms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointType {
    Primary,
    Secondary,
    Exploratory,
}

impl fmt::Display for EndpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EndpointType::Primary => "Primary",
            EndpointType::Secondary => "Secondary",
            EndpointType::Exploratory => "Exploratory",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    pub endpoint_type: EndpointType,
    pub description: String,
    pub measurement_timepoints: Vec<u32>,
}

impl Endpoint {
    pub fn new(name: &str, endpoint_type: EndpointType, description: &str) -> PlanResult<Self> {
        if name.trim().is_empty() {
            return Err(PlanError::invalid("endpoint.name", "must not be empty"));
        }
        Ok(Self {
            name: name.to_string(),
            endpoint_type,
            description: description.to_string(),
            measurement_timepoints: Vec::new(),
        })
    }
    
    pub fn with_timepoints(mut self, days: &[u32]) -> Self {
        self.measurement_timepoints = days.to_vec();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyPopulation {
    pub min_age: u32,
    pub max_age: u32,
    pub sex: String,
    pub disease_stage: Option<String>,
    pub prior_treatment: Option<String>,
    pub inclusion_criteria: Vec<String>,
    pub exclusion_criteria: Vec<String>,
}

impl StudyPopulation {
    pub fn new(min_age: u32, max_age: u32, sex: &str) -> PlanResult<Self> {
        if min_age > max_age {
            return Err(PlanError::invalid(
                "population.age_range",
                format!("minimum age {} exceeds maximum age {}", min_age, max_age),
            ));
        }
        Ok(Self {
            min_age,
            max_age,
            sex: sex.to_string(),
            disease_stage: None,
            prior_treatment: None,
            inclusion_criteria: Vec::new(),
            exclusion_criteria: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalStudy {
    pub study_id: String,
    pub title: String,
    pub drug: Drug,
    pub design: StudyDesign,
    pub sample_size: Option<u32>,
    pub endpoints: Vec<Endpoint>,
    pub pk_profile: Option<PKProfile>,
    pub population: Option<StudyPopulation>,
    pub created_at: DateTime<Utc>,
}

impl ClinicalStudy {
    pub fn new(study_id: &str, title: &str, drug: Drug, design: StudyDesign) -> Self {
        Self {
            study_id: study_id.to_string(),
            title: title.to_string(),
            drug,
            design,
            sample_size: None,
            endpoints: Vec::new(),
            pk_profile: None,
            population: None,
            created_at: Utc::now(),
        }
    }
    
    pub fn add_endpoint(&mut self, endpoint: Endpoint) {
        self.endpoints.push(endpoint);
    }
    
    /// Records the dropout-adjusted total from a computed result. The result
    /// must belong to the same design family as the study and, except for
    /// crossover results (one subject pool), to the same number of arms.
    pub fn apply_sample_size(&mut self, result: &SampleSizeResult) -> PlanResult<()> {
        if result.design_type != self.design.design_type {
            return Err(PlanError::invalid(
                "sample_size",
                format!(
                    "result computed for a {} design but the study uses a {} design",
                    result.design_type, self.design.design_type
                ),
            ));
        }
        let expected_arms = match self.design.design_type {
            DesignType::Crossover => None,
            DesignType::Parallel => Some(self.design.number_of_arms),
            DesignType::Bioequivalence => Some(2),
        };
        if let Some(arms) = expected_arms {
            if result.number_of_arms != arms || self.design.number_of_arms != arms {
                return Err(PlanError::invalid(
                    "sample_size",
                    format!(
                        "result computed for {} arm(s) but the study design has {}",
                        result.number_of_arms, self.design.number_of_arms
                    ),
                ));
            }
        }
        self.sample_size = Some(result.total_n_adjusted);
        Ok(())
    }
    
    pub fn primary_endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter().filter(|e| e.endpoint_type == EndpointType::Primary)
    }
}

impl fmt::Display for ClinicalStudy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Study {}: {}", self.study_id, self.title)
    }
}
