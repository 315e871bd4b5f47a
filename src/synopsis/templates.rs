use std::fmt::Write;
use crate::models::{ClinicalStudy, DesignType, Drug, Endpoint, EndpointType, StudyDesign, StudyPopulation};
use crate::regulatory::RegulatoryBody;
use crate::stats::SampleSizeResult;

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn title_section(study: &ClinicalStudy) -> String {
    format!(
        "STUDY SYNOPSIS\n\nProtocol Number: {}\nTitle: {}\nDrug: {}\nIndication: {}\n\nDate: {}\n",
        study.study_id,
        study.title,
        study.drug,
        study.drug.indication,
        study.created_at.format("%Y-%m-%d"),
    )
}

pub fn background_section(drug: &Drug) -> String {
    format!(
        "BACKGROUND AND RATIONALE\n\n\
         {name} is a {form} formulation containing {ingredient} for the treatment of {indication}. \
         The drug is administered via the {route} route.\n\n\
         This study aims to evaluate the pharmacokinetic properties and safety profile of {name} \
         in the target patient population.\n",
        name = drug.name,
        form = drug.dosage_form.to_lowercase(),
        ingredient = drug.active_ingredient,
        indication = drug.indication,
        route = drug.route_of_administration.to_lowercase(),
    )
}

pub fn objectives_section(endpoints: &[Endpoint]) -> String {
    let mut text = String::from("STUDY OBJECTIVES\n\n");
    
    for (heading, kind) in [
        ("Primary Objectives", EndpointType::Primary),
        ("Secondary Objectives", EndpointType::Secondary),
    ] {
        let matching: Vec<&Endpoint> = endpoints.iter().filter(|e| e.endpoint_type == kind).collect();
        if matching.is_empty() {
            continue;
        }
        let _ = writeln!(text, "{}:", heading);
        for (i, endpoint) in matching.iter().enumerate() {
            let _ = writeln!(text, "{}. {}: {}", i + 1, endpoint.name, endpoint.description);
        }
        text.push('\n');
    }
    
    text
}

pub fn study_design_section(design: &StudyDesign) -> String {
    let mut text = format!(
        "STUDY DESIGN\n\nDesign Type: {}\nNumber of Arms: {}\nTreatment Duration: {} days\nBlinding: {}\nRandomization: {}\n",
        capitalize(design.design_type.as_str()),
        design.number_of_arms,
        design.treatment_duration_days,
        capitalize(&design.blinding.to_string()),
        if design.randomized { "Yes" } else { "No" },
    );
    
    if let Some(washout) = design.washout_period_days {
        let _ = writeln!(text, "Washout Period: {} days", washout);
    }
    if !design.stratification_factors.is_empty() {
        let _ = writeln!(text, "Stratification Factors: {}", design.stratification_factors.join(", "));
    }
    
    text
}

pub fn study_population_section(population: Option<&StudyPopulation>) -> String {
    let Some(population) = population else {
        return "STUDY POPULATION\n\nTo be determined based on study requirements.\n".to_string();
    };
    
    let mut text = format!(
        "STUDY POPULATION\n\nAge Range: {}-{} years\nSex: {}\n",
        population.min_age,
        population.max_age,
        capitalize(&population.sex),
    );
    
    if let Some(stage) = &population.disease_stage {
        let _ = writeln!(text, "Disease Stage: {}", stage);
    }
    if let Some(prior) = &population.prior_treatment {
        let _ = writeln!(text, "Prior Treatment: {}", prior);
    }
    
    for (heading, criteria) in [
        ("Inclusion Criteria", &population.inclusion_criteria),
        ("Exclusion Criteria", &population.exclusion_criteria),
    ] {
        if criteria.is_empty() {
            continue;
        }
        let _ = writeln!(text, "\n{}:", heading);
        for (i, criterion) in criteria.iter().enumerate() {
            let _ = writeln!(text, "{}. {}", i + 1, criterion);
        }
    }
    
    text
}

pub fn treatment_section(drug: &Drug, design: &StudyDesign) -> String {
    format!(
        "TREATMENT\n\nInvestigational Product: {}\nActive Ingredient: {}\nDosage Form: {}\nRoute of Administration: {}\n\n\
         Treatment Duration: {} days\nNumber of Treatment Arms: {}\n",
        drug.name,
        drug.active_ingredient,
        drug.dosage_form,
        drug.route_of_administration,
        design.treatment_duration_days,
        design.number_of_arms,
    )
}

pub fn endpoints_section(endpoints: &[Endpoint]) -> String {
    let mut text = String::from("STUDY ENDPOINTS\n\n");
    
    for endpoint in endpoints {
        let _ = writeln!(text, "{} Endpoint: {}", endpoint.endpoint_type, endpoint.name);
        let _ = writeln!(text, "Description: {}", endpoint.description);
        if !endpoint.measurement_timepoints.is_empty() {
            let days: Vec<String> = endpoint.measurement_timepoints.iter().map(|d| format!("Day {}", d)).collect();
            let _ = writeln!(text, "Assessment Timepoints: {}", days.join(", "));
        }
        text.push('\n');
    }
    
    text
}

pub fn statistical_analysis_section(design: &StudyDesign, sample_size: Option<u32>) -> String {
    let mut text = String::from(
        "STATISTICAL ANALYSIS\n\nAnalysis Population:\n\
         - Intent-to-Treat (ITT) population\n\
         - Per-Protocol (PP) population\n\
         - Safety population\n\n\
         Primary Analysis:\n\
         Statistical tests will be performed at a significance level of alpha = 0.05 (two-sided).\n",
    );
    
    text.push('\n');
    text.push_str(match design.design_type {
        DesignType::Parallel => "For parallel design, between-group comparisons will be performed using appropriate statistical tests (t-test, ANOVA, etc.).\n",
        DesignType::Crossover => "For crossover design, within-subject comparisons will be performed accounting for period and sequence effects.\n",
        DesignType::Bioequivalence => "Bioequivalence will be concluded if the 90% confidence interval of the geometric mean ratio lies within the acceptance margins (two one-sided tests).\n",
    });
    
    if let Some(n) = sample_size {
        let _ = writeln!(text, "\nPlanned enrolment: {} subjects.", n);
    }
    
    text
}

pub fn sample_size_section(result: &SampleSizeResult) -> String {
    let mut text = String::from("SAMPLE SIZE CALCULATION\n\n");
    let _ = writeln!(text, "Design: {}", capitalize(result.design_type.as_str()));
    
    match result.design_type {
        DesignType::Crossover => {
            let _ = writeln!(text, "Total Subjects: {}", result.total_n_adjusted);
        }
        DesignType::Parallel | DesignType::Bioequivalence => {
            let label = match result.inputs.layout {
                Some(layout) => layout.unit_label(),
                None => "Group",
            };
            let _ = writeln!(text, "Sample Size per {}: {}", label, result.n_per_arm_adjusted);
            if let Some(reference) = result.reference_arm {
                let _ = writeln!(
                    text,
                    "Reference Group: {} (allocation 1:{})",
                    reference.n_adjusted, reference.allocation_ratio
                );
            }
            let _ = writeln!(text, "Total Sample Size: {}", result.total_n_adjusted);
        }
    }
    
    let inputs = &result.inputs;
    let _ = writeln!(text, "\nStatistical Parameters:");
    let _ = writeln!(text, "- Significance Level (alpha): {}", inputs.alpha);
    let _ = writeln!(text, "- Power (1-beta): {}", inputs.power);
    let _ = writeln!(text, "- Expected Dropout Rate: {:.0}%", inputs.dropout_rate * 100.0);
    if let Some(effect) = inputs.effect_size {
        let _ = writeln!(text, "- Expected Effect Size: {}", effect);
    }
    if let (Some(cv), Some(t1), Some(t2)) = (inputs.cv_percent, inputs.theta1, inputs.theta2) {
        let _ = writeln!(text, "- Intra-subject CV: {}%", cv);
        let _ = writeln!(text, "- Acceptance Range: {:.2}-{:.2}", t1, t2);
    }
    
    text
}

pub fn regulatory_section(body: RegulatoryBody) -> String {
    format!(
        "REGULATORY CONSIDERATIONS\n\nThis study will be conducted in accordance with:\n\
         - Good Clinical Practice (GCP) guidelines\n\
         - Declaration of Helsinki\n\
         - {} regulations and guidance\n\
         - Local regulatory requirements\n\n\
         Ethics:\n\
         - Ethics Committee/IRB approval will be obtained before study initiation\n\
         - Written informed consent will be obtained from all participants\n\n\
         Registration:\n\
         - The study will be registered on ClinicalTrials.gov (or equivalent registry)\n",
        body,
    )
}
