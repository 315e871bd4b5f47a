use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::error::PlanError;
use crate::models::{Blinding, ClinicalStudy, DesignType, StudyDesign};

const MIN_STUDY_ID_LEN: usize = 5;
const MIN_TITLE_LEN: usize = 10;
const MIN_SAMPLE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RegulatoryBody {
    Fda,
    Ema,
    Nmpa,
}

impl fmt::Display for RegulatoryBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RegulatoryBody::Fda => "FDA",
            RegulatoryBody::Ema => "EMA",
            RegulatoryBody::Nmpa => "NMPA",
        })
    }
}

impl FromStr for RegulatoryBody {
    type Err = PlanError;
    
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "FDA" => Ok(RegulatoryBody::Fda),
            "EMA" => Ok(RegulatoryBody::Ema),
            "NMPA" => Ok(RegulatoryBody::Nmpa),
            other => Err(PlanError::invalid(
                "regulatory_body",
                format!("unsupported regulatory body '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegulatoryViolation {
    pub severity: Severity,
    pub category: String,
    pub description: String,
    pub recommendation: String,
}

impl RegulatoryViolation {
    fn new(severity: Severity, category: &str, description: &str, recommendation: &str) -> Self {
        Self {
            severity,
            category: category.to_string(),
            description: description.to_string(),
            recommendation: recommendation.to_string(),
        }
    }
}

pub struct RegulatoryChecker {
    body: RegulatoryBody,
}

impl RegulatoryChecker {
    pub fn new(body: RegulatoryBody) -> Self {
        info!("RegulatoryChecker initialized for {}", body);
        Self { body }
    }
    
    pub fn body(&self) -> RegulatoryBody {
        self.body
    }
    
    pub fn check_study_compliance(&self, study: &ClinicalStudy) -> Vec<RegulatoryViolation> {
        info!("Checking regulatory compliance for study {}", study.study_id);
        
        let mut violations = Vec::new();
        violations.extend(check_identification(study));
        violations.extend(check_design(&study.design));
        violations.extend(check_endpoints(study));
        violations.extend(check_sample_size(study.sample_size));
        
        info!("Found {} compliance issues", violations.len());
        violations
    }
    
    /// Good Clinical Practice obligations; only the protocol flag depends on the study.
    pub fn check_gcp_compliance(&self, study: &ClinicalStudy) -> Vec<(&'static str, bool)> {
        debug!("Checking GCP compliance for {}", study.study_id);
        vec![
            ("protocol_available", !study.title.is_empty() && !study.study_id.is_empty()),
            ("ethics_approval_required", true),
            ("informed_consent_required", true),
            ("data_management_plan_required", true),
            ("monitoring_plan_required", true),
            ("investigator_qualification_required", true),
            ("adverse_event_reporting_required", true),
        ]
    }
    
    pub fn regulatory_checklist(&self) -> Vec<(&'static str, Vec<String>)> {
        let items = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        vec![
            ("protocol", items(&[
                "Protocol title and version",
                "Study objectives",
                "Study design description",
                "Patient population definition",
                "Inclusion/exclusion criteria",
                "Treatment plan",
                "Endpoints definition",
                "Sample size justification",
                "Statistical analysis plan",
            ])),
            ("ethics", items(&[
                "IRB/IEC approval",
                "Informed consent form",
                "Patient information sheet",
            ])),
            ("regulatory", vec![
                format!("{} IND/CTA submission", self.body),
                "Clinical trial registration (e.g., ClinicalTrials.gov)".to_string(),
                "Insurance/indemnity".to_string(),
                "Investigator's Brochure".to_string(),
            ]),
            ("quality", items(&[
                "Standard Operating Procedures (SOPs)",
                "Case Report Forms (CRFs)",
                "Data management plan",
                "Monitoring plan",
                "Quality control procedures",
            ])),
            ("safety", items(&[
                "Adverse event definitions",
                "Safety monitoring plan",
                "DSMB charter (if applicable)",
                "Stopping rules",
            ])),
        ]
    }
}

fn check_identification(study: &ClinicalStudy) -> Vec<RegulatoryViolation> {
    let mut violations = Vec::new();
    
    if study.study_id.trim().len() < MIN_STUDY_ID_LEN {
        violations.push(RegulatoryViolation::new(
            Severity::Critical,
            "identification",
            "Study ID is missing or too short",
            "Provide a valid study identifier (e.g., protocol number)",
        ));
    }
    
    if study.title.trim().len() < MIN_TITLE_LEN {
        violations.push(RegulatoryViolation::new(
            Severity::Major,
            "identification",
            "Study title is missing or insufficient",
            "Provide a descriptive study title",
        ));
    }
    
    violations
}

fn check_design(design: &StudyDesign) -> Vec<RegulatoryViolation> {
    let mut violations = Vec::new();
    
    if design.blinding == Blinding::OpenLabel {
        violations.push(RegulatoryViolation::new(
            Severity::Minor,
            "design",
            "Open-label design may require additional justification",
            "Consider blinding or provide rationale for open-label",
        ));
    }
    
    if !design.randomized {
        violations.push(RegulatoryViolation::new(
            Severity::Major,
            "design",
            "Non-randomized design",
            "Randomization is strongly recommended for regulatory approval",
        ));
    }
    
    if design.design_type == DesignType::Crossover && design.washout_period_days.unwrap_or(0) == 0 {
        violations.push(RegulatoryViolation::new(
            Severity::Major,
            "design",
            "Crossover design missing washout period",
            "Specify adequate washout period (typically 5 half-lives)",
        ));
    }
    
    violations
}

fn check_endpoints(study: &ClinicalStudy) -> Vec<RegulatoryViolation> {
    if study.endpoints.is_empty() {
        return vec![RegulatoryViolation::new(
            Severity::Critical,
            "endpoints",
            "No endpoints defined",
            "Define at least one primary endpoint",
        )];
    }
    
    let mut violations = Vec::new();
    let primary = study.primary_endpoints().count();
    
    if primary == 0 {
        violations.push(RegulatoryViolation::new(
            Severity::Critical,
            "endpoints",
            "No primary endpoint defined",
            "Define at least one primary endpoint",
        ));
    } else if primary > 2 {
        violations.push(RegulatoryViolation::new(
            Severity::Minor,
            "endpoints",
            "Multiple primary endpoints may complicate analysis",
            "Consider limiting to 1-2 primary endpoints",
        ));
    }
    
    violations
}

fn check_sample_size(sample_size: Option<u32>) -> Vec<RegulatoryViolation> {
    match sample_size {
        Some(n) if n >= MIN_SAMPLE_SIZE => Vec::new(),
        _ => vec![RegulatoryViolation::new(
            Severity::Major,
            "sample_size",
            "Sample size is missing or too small",
            "Provide justified sample size calculation",
        )],
    }
}
