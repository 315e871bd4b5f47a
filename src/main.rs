use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

mod cli;
mod config;
mod design;
mod error;
mod models;
mod output;
mod pk_data;
mod regulatory;
mod stats;
mod synopsis;

use crate::cli::{AssumptionArgs, Cli, Command, ConstraintArgs, DrugArgs, ProtocolArgs, SimulationArgs};
use crate::config::PlannerConfig;
use crate::design::{DesignConstraints, DesignSelector};
use crate::models::{
    ClinicalStudy, DesignType, Drug, Endpoint, EndpointType, PKParameter, PKProfile, StudyPopulation,
};
use crate::pk_data::{pk_parameters_for, MockPkSource, PkDataSource, StudyInput};
use crate::regulatory::RegulatoryChecker;
use crate::stats::{
    Assumptions, DesignInputs, EquivalenceMargins, PowerSimulator, SampleSizeCalculator, SampleSizeResult,
};
use crate::synopsis::SynopsisGenerator;

fn main() -> Result<()> {
    let cli = Cli::parse();
    
    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }
    
    let config = match &cli.config {
        Some(path) => {
            let config = PlannerConfig::from_file(path)
                .with_context(|| format!("loading configuration from {:?}", path))?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => PlannerConfig::default(),
    };
    
    match cli.command {
        Command::Recommend(args) => {
            let drug = build_drug(&args.drug)?;
            let profile = match args.half_life {
                Some(hours) => {
                    let mut profile = PKProfile::new(&drug);
                    profile.add_parameter(PKParameter::new("t1/2", hours, "h")?);
                    profile
                }
                None => MockPkSource.search_pk_data(&drug, None)?,
            };
            
            let selector = DesignSelector::new(&config);
            let design = selector.recommend_design(&drug, &profile, args.treatments, &constraints(&args.constraints))?;
            let violations = selector.validate_design(&design);
            print_json(&serde_json::json!({ "design": design, "violations": violations }))?;
        }
        Command::Parallel(args) => {
            let calculator = SampleSizeCalculator::new(&config);
            let assumptions = resolve_assumptions(&calculator, &args.assumptions);
            let result = calculator.calculate_parallel_design_with_allocation(
                args.effect_size, args.std_dev, args.arms, args.allocation_ratio, &assumptions,
            )?;
            report_sample_size(&result, &args.simulation)?;
        }
        Command::Crossover(args) => {
            let calculator = SampleSizeCalculator::new(&config);
            let assumptions = resolve_assumptions(&calculator, &args.assumptions);
            let result = calculator.calculate_crossover_design(args.effect_size, args.std_dev, &assumptions)?;
            report_sample_size(&result, &args.simulation)?;
        }
        Command::Bioequivalence(args) => {
            let calculator = SampleSizeCalculator::new(&config);
            let assumptions = resolve_assumptions(&calculator, &args.assumptions);
            let margins = EquivalenceMargins { theta1: args.theta1, theta2: args.theta2 };
            let result = calculator.calculate_bioequivalence_design_with_layout(
                args.cv_percent, margins, args.layout, &assumptions,
            )?;
            print_json(&result)?;
        }
        Command::Sensitivity(args) => {
            let calculator = SampleSizeCalculator::new(&config);
            let assumptions = resolve_assumptions(&calculator, &AssumptionArgs {
                alpha: args.alpha,
                power: args.power,
                dropout: None,
            });
            
            let base = match args.design {
                DesignType::Parallel => DesignInputs::Parallel {
                    effect_size: args.effect_sizes[0],
                    std_dev: args.std_dev.context("--std-dev is required for parallel designs")?,
                    number_of_arms: args.arms,
                    allocation_ratio: args.allocation_ratio,
                    assumptions,
                },
                DesignType::Crossover => DesignInputs::Crossover {
                    effect_size: args.effect_sizes[0],
                    std_dev_within: args.std_dev.context("--std-dev is required for crossover designs")?,
                    assumptions,
                },
                DesignType::Bioequivalence => DesignInputs::Bioequivalence {
                    cv_percent: args.effect_sizes[0],
                    margins: EquivalenceMargins { theta1: args.theta1, theta2: args.theta2 },
                    layout: args.layout,
                    assumptions,
                },
            };
            
            let results: Vec<SampleSizeResult> = calculator
                .sensitivity_analysis(base, &args.effect_sizes, &args.dropout_rates)
                .collect::<Result<_, _>>()?;
            
            match &args.output {
                Some(path) => {
                    output::save_sensitivity_csv(&results, path)?;
                    info!("Sensitivity grid saved to {:?}", path);
                }
                None => print_json(&results)?,
            }
        }
        Command::Compare(args) => {
            print_json(&design::compare_design_types(args.first, args.second))?;
        }
        Command::Protocol(args) => run_protocol(&config, &args)?,
    }
    
    Ok(())
}

fn build_drug(args: &DrugArgs) -> Result<Drug> {
    let ingredient = args.ingredient.as_deref().unwrap_or(&args.drug);
    Ok(Drug::new(&args.drug, ingredient, &args.indication, &args.dosage_form, &args.route)?)
}

fn constraints(args: &ConstraintArgs) -> DesignConstraints {
    DesignConstraints {
        forced_design: args.force_design,
        bioequivalence_intent: args.bioequivalence,
        max_study_duration_days: args.max_duration,
    }
}

fn resolve_assumptions(calculator: &SampleSizeCalculator, args: &AssumptionArgs) -> Assumptions {
    let defaults = calculator.default_assumptions();
    Assumptions {
        alpha: args.alpha.unwrap_or(defaults.alpha),
        power: args.power.unwrap_or(defaults.power),
        dropout_rate: args.dropout.unwrap_or(defaults.dropout_rate),
    }
}

fn report_sample_size(result: &SampleSizeResult, simulation: &SimulationArgs) -> Result<()> {
    print_json(result)?;
    
    if let Some(replicates) = simulation.simulate_power {
        let estimate = PowerSimulator::new(simulation.seed).simulate(result, replicates)?;
        if estimate.empirical_power + 0.05 < estimate.target_power {
            warn!(
                "Empirical power {:.3} falls short of the {:.3} target",
                estimate.empirical_power, estimate.target_power
            );
        }
        print_json(&estimate)?;
    }
    
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_protocol(config: &PlannerConfig, args: &ProtocolArgs) -> Result<()> {
    let bioequivalence = args.constraints.bioequivalence
        || args.constraints.force_design == Some(DesignType::Bioequivalence);
    
    let profile = if bioequivalence {
        pk_parameters_for(&StudyInput {
            drug_name: args.drug.drug.clone(),
            fasting: !args.fed,
            cv_category: args.cv_category,
        })?
    } else {
        MockPkSource.search_pk_data(&build_drug(&args.drug)?, None)?
    };
    let drug = build_drug(&args.drug)?;
    
    let selector = DesignSelector::new(config);
    let design = selector.recommend_design(&drug, &profile, args.treatments, &constraints(&args.constraints))?;
    for violation in selector.validate_design(&design) {
        warn!("Design issue in {}: {}", violation.field, violation.message);
    }
    
    let calculator = SampleSizeCalculator::new(config);
    let assumptions = resolve_assumptions(&calculator, &args.assumptions);
    let sample_size = match design.design_type {
        _ if !design.needs_sample_size() => {
            warn!(
                "Single-arm {} design has no comparison to power; skipping sample size calculation",
                design.design_type
            );
            None
        }
        DesignType::Parallel => Some(calculator.calculate_parallel_design_with_allocation(
            args.effect_size, args.std_dev, design.number_of_arms, args.allocation_ratio, &assumptions,
        )?),
        DesignType::Crossover => Some(calculator.calculate_crossover_design(
            args.effect_size, args.std_dev, &assumptions,
        )?),
        DesignType::Bioequivalence => {
            let cv_percent = match args.cv_percent {
                Some(cv) => cv,
                None => profile.get_parameter("Cmax")
                    .and_then(|p| p.coefficient_of_variation)
                    .map(|cv| cv * 100.0)
                    .context("no CV available; pass --cv-percent")?,
            };
            Some(calculator.calculate_bioequivalence_design_with_layout(
                cv_percent, EquivalenceMargins::default(), args.layout, &assumptions,
            )?)
        }
    };
    
    let mut study = ClinicalStudy::new(&args.study_id, &args.title, drug, design.clone());
    if let Some(result) = &sample_size {
        study.apply_sample_size(result)?;
    }
    for endpoint in default_endpoints(design.design_type)? {
        study.add_endpoint(endpoint);
    }
    study.population = Some(default_population(design.design_type)?);
    study.pk_profile = Some(profile);
    
    let checker = RegulatoryChecker::new(args.body);
    let violations = checker.check_study_compliance(&study);
    
    let generator = SynopsisGenerator;
    if let Some(section) = args.section {
        println!("{}", generator.section(section, &study, sample_size.as_ref(), checker.body())?);
        return Ok(());
    }
    
    let synopsis_text = generator.full_synopsis(&study, sample_size.as_ref(), checker.body());
    let synopsis_markdown = generator.markdown(&study, sample_size.as_ref(), &violations, checker.body());
    
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating output directory {:?}", args.output))?;
    output::save_protocol(&output::ProtocolBundle {
        study: &study,
        design: &design,
        sample_size: sample_size.as_ref(),
        violations: &violations,
        synopsis_text: &synopsis_text,
        synopsis_markdown: &synopsis_markdown,
    }, &args.output)?;
    
    for (key, value) in generator.summary(&study) {
        println!("{:<14} {}", key, value);
    }
    println!("{:<14} {}", "issues", violations.len());
    
    Ok(())
}

fn default_endpoints(design_type: DesignType) -> Result<Vec<Endpoint>> {
    let timepoints = [1, 2, 4, 8, 12, 24];
    Ok(match design_type {
        DesignType::Bioequivalence | DesignType::Crossover => vec![
            Endpoint::new("AUC0-t", EndpointType::Primary, "Area under the plasma concentration-time curve")?
                .with_timepoints(&timepoints),
            Endpoint::new("Cmax", EndpointType::Primary, "Peak plasma concentration")?
                .with_timepoints(&timepoints),
        ],
        DesignType::Parallel => vec![
            Endpoint::new("Progression-free survival", EndpointType::Primary, "Time from randomisation to progression or death")?,
            Endpoint::new("Objective response rate", EndpointType::Secondary, "Proportion of patients with complete or partial response")?
                .with_timepoints(&[56, 84]),
        ],
    })
}

fn default_population(design_type: DesignType) -> Result<StudyPopulation> {
    let population = match design_type {
        DesignType::Bioequivalence | DesignType::Crossover => {
            let mut population = StudyPopulation::new(18, 55, "all")?;
            population.inclusion_criteria = vec![
                "Healthy volunteers".to_string(),
                "BMI 18.5-30 kg/m2".to_string(),
                "Non-smoker".to_string(),
            ];
            population.exclusion_criteria = vec![
                "Known hypersensitivity to the study drug".to_string(),
                "Clinically significant illness within 4 weeks".to_string(),
            ];
            population
        }
        DesignType::Parallel => {
            let mut population = StudyPopulation::new(18, 75, "all")?;
            population.disease_stage = Some("Advanced or metastatic".to_string());
            population.inclusion_criteria = vec![
                "Histologically confirmed diagnosis".to_string(),
                "ECOG performance status 0-1".to_string(),
                "Measurable disease per RECIST 1.1".to_string(),
            ];
            population.exclusion_criteria = vec![
                "Untreated CNS metastases".to_string(),
                "Inadequate organ function".to_string(),
            ];
            population
        }
    };
    Ok(population)
}
