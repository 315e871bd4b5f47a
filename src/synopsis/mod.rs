pub mod templates;

use chrono::Utc;
use log::info;
use std::fmt::Write;
use std::str::FromStr;
use crate::error::{PlanError, PlanResult};
use crate::models::{ClinicalStudy, DesignType};
use crate::regulatory::{RegulatoryBody, RegulatoryViolation};
use crate::stats::SampleSizeResult;

const MAJOR_RULE: &str = "================================================================================";
const MINOR_RULE: &str = "--------------------------------------------------------------------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynopsisSection {
    Title,
    Background,
    Objectives,
    StudyDesign,
    StudyPopulation,
    Treatment,
    Endpoints,
    StatisticalAnalysis,
    SampleSize,
    Regulatory,
}

impl FromStr for SynopsisSection {
    type Err = PlanError;
    
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "title" => Ok(SynopsisSection::Title),
            "background" => Ok(SynopsisSection::Background),
            "objectives" => Ok(SynopsisSection::Objectives),
            "study_design" => Ok(SynopsisSection::StudyDesign),
            "study_population" => Ok(SynopsisSection::StudyPopulation),
            "treatment" => Ok(SynopsisSection::Treatment),
            "endpoints" => Ok(SynopsisSection::Endpoints),
            "statistical_analysis" => Ok(SynopsisSection::StatisticalAnalysis),
            "sample_size" => Ok(SynopsisSection::SampleSize),
            "regulatory" => Ok(SynopsisSection::Regulatory),
            other => Err(PlanError::invalid("section", format!("unknown section '{}'", other))),
        }
    }
}

/// Assembles protocol synopses from already computed study fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct SynopsisGenerator;

impl SynopsisGenerator {
    pub fn full_synopsis(
        &self,
        study: &ClinicalStudy,
        sample_size: Option<&SampleSizeResult>,
        body: RegulatoryBody,
    ) -> String {
        info!("Generating full synopsis for study {}", study.study_id);
        
        let mut sections = vec![SynopsisSection::Title, SynopsisSection::Background];
        if !study.endpoints.is_empty() {
            sections.push(SynopsisSection::Objectives);
        }
        sections.extend([
            SynopsisSection::StudyDesign,
            SynopsisSection::StudyPopulation,
            SynopsisSection::Treatment,
        ]);
        if !study.endpoints.is_empty() {
            sections.push(SynopsisSection::Endpoints);
        }
        sections.push(SynopsisSection::StatisticalAnalysis);
        if sample_size.is_some() {
            sections.push(SynopsisSection::SampleSize);
        }
        sections.push(SynopsisSection::Regulatory);
        
        let mut text = String::new();
        for (i, section) in sections.iter().enumerate() {
            // Sections listed above never need a missing input.
            if let Ok(body_text) = self.section(*section, study, sample_size, body) {
                text.push('\n');
                text.push_str(&body_text);
            }
            let rule = if i == 0 || i == sections.len() - 1 { MAJOR_RULE } else { MINOR_RULE };
            let _ = writeln!(text, "\n{}", rule);
        }
        
        info!("Synopsis generation completed");
        text
    }
    
    pub fn section(
        &self,
        section: SynopsisSection,
        study: &ClinicalStudy,
        sample_size: Option<&SampleSizeResult>,
        body: RegulatoryBody,
    ) -> PlanResult<String> {
        Ok(match section {
            SynopsisSection::Title => templates::title_section(study),
            SynopsisSection::Background => templates::background_section(&study.drug),
            SynopsisSection::Objectives => templates::objectives_section(&study.endpoints),
            SynopsisSection::StudyDesign => templates::study_design_section(&study.design),
            SynopsisSection::StudyPopulation => templates::study_population_section(study.population.as_ref()),
            SynopsisSection::Treatment => templates::treatment_section(&study.drug, &study.design),
            SynopsisSection::Endpoints => templates::endpoints_section(&study.endpoints),
            SynopsisSection::StatisticalAnalysis => {
                templates::statistical_analysis_section(&study.design, study.sample_size)
            }
            SynopsisSection::SampleSize => {
                let result = sample_size.ok_or_else(|| PlanError::invalid(
                    "sample_size",
                    "no sample size calculation available for this section",
                ))?;
                templates::sample_size_section(result)
            }
            SynopsisSection::Regulatory => templates::regulatory_section(body),
        })
    }
    
    /// Markdown rendition including the PK table and compliance findings.
    pub fn markdown(
        &self,
        study: &ClinicalStudy,
        sample_size: Option<&SampleSizeResult>,
        violations: &[RegulatoryViolation],
        body: RegulatoryBody,
    ) -> String {
        let drug = &study.drug;
        let mut md = String::new();
        
        let _ = writeln!(md, "# {}\n", study.title);
        let _ = writeln!(md, "**Protocol:** {}  ", study.study_id);
        let _ = writeln!(md, "**Drug:** {}  ", drug);
        let _ = writeln!(md, "**Indication:** {}  ", drug.indication);
        let _ = writeln!(md, "**Date:** {}\n", study.created_at.format("%Y-%m-%d"));
        
        let _ = writeln!(md, "## Background\n");
        let _ = writeln!(
            md,
            "{} is a {} formulation containing {}, administered via the {} route.\n",
            drug.name,
            drug.dosage_form.to_lowercase(),
            drug.active_ingredient,
            drug.route_of_administration.to_lowercase(),
        );
        
        if let Some(profile) = study.pk_profile.as_ref().filter(|p| !p.parameters.is_empty()) {
            let _ = writeln!(md, "## PK Parameters\n");
            let _ = writeln!(md, "| Parameter | Value | Unit | CV |");
            let _ = writeln!(md, "|-----------|------:|------|---:|");
            for p in &profile.parameters {
                let cv = p.coefficient_of_variation
                    .map(|cv| format!("{:.0}%", cv * 100.0))
                    .unwrap_or_else(|| "-".to_string());
                let _ = writeln!(md, "| {} | {} | {} | {} |", p.parameter_name, p.value, p.unit, cv);
            }
            md.push('\n');
        }
        
        let design = &study.design;
        let _ = writeln!(md, "## Study Design\n");
        let _ = writeln!(md, "- **Type:** {}", design.design_type);
        let _ = writeln!(md, "- **Arms:** {}", design.number_of_arms);
        let _ = writeln!(md, "- **Treatment duration:** {} days", design.treatment_duration_days);
        let _ = writeln!(md, "- **Blinding:** {}", design.blinding);
        if let Some(washout) = design.washout_period_days {
            let _ = writeln!(md, "- **Washout:** {} days", washout);
        }
        md.push('\n');
        
        if let Some(population) = &study.population {
            let _ = writeln!(md, "## Study Population\n");
            let _ = writeln!(md, "- Age: {}-{} years", population.min_age, population.max_age);
            let _ = writeln!(md, "- Sex: {}", population.sex);
            for (heading, criteria) in [
                ("Inclusion criteria", &population.inclusion_criteria),
                ("Exclusion criteria", &population.exclusion_criteria),
            ] {
                if !criteria.is_empty() {
                    let _ = writeln!(md, "\n**{}:**", heading);
                    for criterion in criteria {
                        let _ = writeln!(md, "- {}", criterion);
                    }
                }
            }
            md.push('\n');
        }
        
        let _ = writeln!(md, "## Sample Size\n");
        match sample_size {
            Some(result) => {
                if result.design_type == DesignType::Crossover {
                    let _ = writeln!(md, "- **N (adjusted):** {}", result.total_n_adjusted);
                } else {
                    let _ = writeln!(md, "- **N per arm (adjusted):** {}", result.n_per_arm_adjusted);
                    if let Some(reference) = result.reference_arm {
                        let _ = writeln!(
                            md,
                            "- **N reference arm (adjusted):** {} (1:{})",
                            reference.n_adjusted, reference.allocation_ratio
                        );
                    }
                    let _ = writeln!(md, "- **Total N (adjusted):** {}", result.total_n_adjusted);
                }
                let _ = writeln!(md, "- alpha = {}", result.inputs.alpha);
                let _ = writeln!(md, "- Power = {}", result.inputs.power);
                let _ = writeln!(md, "- Dropout rate = {:.0}%", result.inputs.dropout_rate * 100.0);
            }
            None => {
                let _ = writeln!(md, "Not calculated.");
            }
        }
        md.push('\n');
        
        let _ = writeln!(md, "## Regulatory Compliance\n");
        if violations.is_empty() {
            let _ = writeln!(md, "No issues found; study is compliant.");
        } else {
            for v in violations {
                let _ = writeln!(md, "- **[{}]** {}: {}", v.severity.to_string().to_uppercase(), v.category, v.description);
            }
        }
        md.push('\n');
        
        let _ = writeln!(md, "---");
        let _ = writeln!(
            md,
            "*Generated on {} for {} submission.*",
            Utc::now().format("%Y-%m-%d %H:%M"),
            body,
        );
        
        md
    }
    
    pub fn summary(&self, study: &ClinicalStudy) -> Vec<(&'static str, String)> {
        vec![
            ("study_id", study.study_id.clone()),
            ("title", study.title.clone()),
            ("drug", study.drug.to_string()),
            ("design", study.design.to_string()),
            ("sample_size", study.sample_size.map(|n| n.to_string()).unwrap_or_else(|| "Not calculated".to_string())),
            ("num_endpoints", study.endpoints.len().to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlannerConfig;
    use crate::models::{Drug, Endpoint, EndpointType, StudyDesign, StudyPopulation};
    use crate::stats::{Assumptions, BioequivalenceLayout, EquivalenceMargins, SampleSizeCalculator};
    
    fn study() -> ClinicalStudy {
        let drug = Drug::new("Drug A", "compound-a", "Non-small cell lung cancer", "Tablet", "Oral").unwrap();
        let mut study = ClinicalStudy::new(
            "ONC-2024-007",
            "Randomised phase II study of Drug A",
            drug,
            StudyDesign::new(DesignType::Parallel, 2, 84),
        );
        study.add_endpoint(
            Endpoint::new("PFS", EndpointType::Primary, "Progression-free survival")
                .unwrap()
                .with_timepoints(&[28, 56, 84]),
        );
        let mut population = StudyPopulation::new(18, 75, "all").unwrap();
        population.inclusion_criteria.push("ECOG 0-1".to_string());
        study.population = Some(population);
        study
    }
    
    fn result() -> SampleSizeResult {
        SampleSizeCalculator::new(&PlannerConfig::default())
            .calculate_parallel_design(300.0, 500.0, 2, &Assumptions::default().with_dropout(0.15))
            .unwrap()
    }
    
    #[test]
    fn test_full_synopsis_contains_sections_in_order() {
        let text = SynopsisGenerator.full_synopsis(&study(), Some(&result()), RegulatoryBody::Fda);
        let headings = [
            "STUDY SYNOPSIS",
            "BACKGROUND AND RATIONALE",
            "STUDY OBJECTIVES",
            "STUDY DESIGN",
            "STUDY POPULATION",
            "TREATMENT",
            "STUDY ENDPOINTS",
            "STATISTICAL ANALYSIS",
            "SAMPLE SIZE CALCULATION",
            "REGULATORY CONSIDERATIONS",
        ];
        let positions: Vec<usize> = headings.iter().map(|h| text.find(h).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(text.contains("Assessment Timepoints: Day 28, Day 56, Day 84"));
        assert!(text.contains("Sample Size per Group: 52"));
        assert!(text.trim_end().ends_with(MAJOR_RULE));
    }
    
    #[test]
    fn test_synopsis_without_sample_size_skips_section() {
        let text = SynopsisGenerator.full_synopsis(&study(), None, RegulatoryBody::Ema);
        assert!(!text.contains("SAMPLE SIZE CALCULATION"));
        assert!(text.contains("EMA regulations and guidance"));
    }
    
    #[test]
    fn test_sample_size_section_requires_result() {
        let section: SynopsisSection = "sample-size".parse().unwrap();
        assert!(SynopsisGenerator.section(section, &study(), None, RegulatoryBody::Fda).is_err());
        assert!("appendix".parse::<SynopsisSection>().is_err());
    }
    
    #[test]
    fn test_markdown_lists_violations() {
        let violations = vec![RegulatoryViolation {
            severity: crate::regulatory::Severity::Major,
            category: "sample_size".to_string(),
            description: "Sample size is missing or too small".to_string(),
            recommendation: String::new(),
        }];
        let md = SynopsisGenerator.markdown(&study(), Some(&result()), &violations, RegulatoryBody::Fda);
        
        assert!(md.starts_with("# Randomised phase II study of Drug A"));
        assert!(md.contains("- **Total N (adjusted):** 104"));
        assert!(md.contains("**[MAJOR]** sample_size"));
        assert!(md.contains("**Inclusion criteria:**"));
    }
    
    #[test]
    fn test_sample_size_section_reports_arm_layout() {
        let calculator = SampleSizeCalculator::new(&PlannerConfig::default());
        let a = Assumptions::default();
        
        let unequal = calculator.calculate_parallel_design_with_allocation(300.0, 500.0, 2, 2.0, &a).unwrap();
        let text = templates::sample_size_section(&unequal);
        assert!(text.contains("Sample Size per Group: 66"));
        assert!(text.contains("Reference Group: 33 (allocation 1:2)"));
        assert!(text.contains("Total Sample Size: 99"));
        
        let crossover_be = calculator
            .calculate_bioequivalence_design(25.0, EquivalenceMargins::default(), &a)
            .unwrap();
        assert!(templates::sample_size_section(&crossover_be).contains("Sample Size per Sequence: 8"));
        
        let parallel_be = calculator
            .calculate_bioequivalence_design_with_layout(
                25.0, EquivalenceMargins::default(), BioequivalenceLayout::Parallel, &a,
            )
            .unwrap();
        assert!(templates::sample_size_section(&parallel_be).contains("Sample Size per Group: 16"));
    }
    
    #[test]
    fn test_summary() {
        let mut s = study();
        s.apply_sample_size(&result()).unwrap();
        let summary = SynopsisGenerator.summary(&s);
        assert_eq!(summary[3].1, "parallel design with 2 arm(s)");
        assert_eq!(summary[4].1, "104");
    }
}
