use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use crate::models::DesignType;
use crate::pk_data::CvCategory;
use crate::regulatory::RegulatoryBody;
use crate::stats::BioequivalenceLayout;
use crate::synopsis::SynopsisSection;

#[derive(Debug, Parser)]
#[command(name = "trial_planner")]
#[command(about = "Oncology trial planning: study design, sample size and protocol synopsis")]
pub struct Cli {
    /// Planner configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    
    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
    
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Recommend a study design for a drug
    Recommend(RecommendArgs),
    /// Sample size for a parallel-group comparison of means
    Parallel(ParallelArgs),
    /// Sample size for a within-subject crossover comparison
    Crossover(CrossoverArgs),
    /// Sample size for a 2x2 bioequivalence study
    Bioequivalence(BioequivalenceArgs),
    /// Sample sizes over an effect-size x dropout-rate grid
    Sensitivity(SensitivityArgs),
    /// Compare two design types
    Compare(CompareArgs),
    /// Run the full planning workflow and write protocol artefacts
    Protocol(ProtocolArgs),
}

#[derive(Debug, Args)]
pub struct DrugArgs {
    /// Drug name
    #[arg(long)]
    pub drug: String,
    
    /// Active ingredient (defaults to the drug name)
    #[arg(long)]
    pub ingredient: Option<String>,
    
    #[arg(long, default_value = "Solid tumor")]
    pub indication: String,
    
    #[arg(long, default_value = "Tablet")]
    pub dosage_form: String,
    
    #[arg(long, default_value = "Oral")]
    pub route: String,
}

#[derive(Debug, Args)]
pub struct ConstraintArgs {
    /// Bypass the rule list and use this design
    #[arg(long)]
    pub force_design: Option<DesignType>,
    
    /// The treatments are formulations to be shown bioequivalent
    #[arg(long)]
    pub bioequivalence: bool,
    
    /// Upper bound on total study span in days
    #[arg(long)]
    pub max_duration: Option<u32>,
}

#[derive(Debug, Args)]
pub struct AssumptionArgs {
    /// Significance level (defaults to the configured value)
    #[arg(long)]
    pub alpha: Option<f64>,
    
    /// Target power (defaults to the configured value)
    #[arg(long)]
    pub power: Option<f64>,
    
    /// Expected dropout rate in [0, 1)
    #[arg(long)]
    pub dropout: Option<f64>,
}

#[derive(Debug, Args)]
pub struct SimulationArgs {
    /// Re-check the result with this many simulated trials
    #[arg(long)]
    pub simulate_power: Option<usize>,
    
    /// Random seed for reproducibility
    #[arg(short, long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Args)]
pub struct RecommendArgs {
    #[command(flatten)]
    pub drug: DrugArgs,
    
    #[command(flatten)]
    pub constraints: ConstraintArgs,
    
    /// Number of treatments to compare
    #[arg(long, default_value_t = 1)]
    pub treatments: u32,
    
    /// Use this half-life (hours) instead of the PK lookup
    #[arg(long)]
    pub half_life: Option<f64>,
}

#[derive(Debug, Args)]
pub struct ParallelArgs {
    #[arg(long, allow_hyphen_values = true)]
    pub effect_size: f64,
    
    #[arg(long)]
    pub std_dev: f64,
    
    #[arg(long, default_value_t = 2)]
    pub arms: u32,
    
    /// Treatment-arm subjects per reference-arm subject
    #[arg(long, default_value_t = 1.0)]
    pub allocation_ratio: f64,
    
    #[command(flatten)]
    pub assumptions: AssumptionArgs,
    
    #[command(flatten)]
    pub simulation: SimulationArgs,
}

#[derive(Debug, Args)]
pub struct CrossoverArgs {
    #[arg(long, allow_hyphen_values = true)]
    pub effect_size: f64,
    
    /// Within-subject standard deviation
    #[arg(long)]
    pub std_dev: f64,
    
    #[command(flatten)]
    pub assumptions: AssumptionArgs,
    
    #[command(flatten)]
    pub simulation: SimulationArgs,
}

#[derive(Debug, Args)]
pub struct BioequivalenceArgs {
    /// Intra-subject coefficient of variation, percent
    #[arg(long)]
    pub cv_percent: f64,
    
    #[arg(long, default_value_t = 0.80)]
    pub theta1: f64,
    
    #[arg(long, default_value_t = 1.25)]
    pub theta2: f64,
    
    /// Arrangement of a bioequivalence study (crossover or parallel)
    #[arg(long, default_value = "crossover")]
    pub layout: BioequivalenceLayout,
    
    #[command(flatten)]
    pub assumptions: AssumptionArgs,
}

#[derive(Debug, Args)]
pub struct SensitivityArgs {
    #[arg(long, default_value = "parallel")]
    pub design: DesignType,
    
    /// Effect sizes to sweep (CV% for bioequivalence)
    #[arg(long, value_delimiter = ',', num_args = 1.., allow_hyphen_values = true, required = true)]
    pub effect_sizes: Vec<f64>,
    
    #[arg(long, value_delimiter = ',', num_args = 1.., default_value = "0")]
    pub dropout_rates: Vec<f64>,
    
    /// Standard deviation (within-subject for crossover)
    #[arg(long)]
    pub std_dev: Option<f64>,
    
    #[arg(long, default_value_t = 2)]
    pub arms: u32,
    
    /// Treatment-arm subjects per reference-arm subject
    #[arg(long, default_value_t = 1.0)]
    pub allocation_ratio: f64,
    
    #[arg(long, default_value_t = 0.80)]
    pub theta1: f64,
    
    #[arg(long, default_value_t = 1.25)]
    pub theta2: f64,
    
    /// Arrangement of a bioequivalence study (crossover or parallel)
    #[arg(long, default_value = "crossover")]
    pub layout: BioequivalenceLayout,
    
    #[arg(long)]
    pub alpha: Option<f64>,
    
    #[arg(long)]
    pub power: Option<f64>,
    
    /// Write the grid to this CSV file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    #[arg(long)]
    pub first: DesignType,
    
    #[arg(long)]
    pub second: DesignType,
}

#[derive(Debug, Args)]
pub struct ProtocolArgs {
    #[command(flatten)]
    pub drug: DrugArgs,
    
    #[command(flatten)]
    pub constraints: ConstraintArgs,
    
    #[arg(long)]
    pub study_id: String,
    
    #[arg(long)]
    pub title: String,
    
    #[arg(long, default_value_t = 2)]
    pub treatments: u32,
    
    #[arg(long, default_value_t = 300.0, allow_hyphen_values = true)]
    pub effect_size: f64,
    
    #[arg(long, default_value_t = 500.0)]
    pub std_dev: f64,
    
    /// Treatment-arm subjects per reference-arm subject
    #[arg(long, default_value_t = 1.0)]
    pub allocation_ratio: f64,
    
    /// CV% for bioequivalence sizing (defaults to the Cmax CV of the PK profile)
    #[arg(long)]
    pub cv_percent: Option<f64>,
    
    #[arg(long, default_value = "low")]
    pub cv_category: CvCategory,
    
    /// Arrangement of a bioequivalence study (crossover or parallel)
    #[arg(long, default_value = "crossover")]
    pub layout: BioequivalenceLayout,
    
    /// Fed rather than fasted conditions for bioequivalence lookups
    #[arg(long)]
    pub fed: bool,
    
    #[command(flatten)]
    pub assumptions: AssumptionArgs,
    
    #[arg(long, default_value = "FDA")]
    pub body: RegulatoryBody,
    
    /// Print only this synopsis section
    #[arg(long)]
    pub section: Option<SynopsisSection>,
    
    /// Output directory
    #[arg(short, long)]
    pub output: PathBuf,
}
