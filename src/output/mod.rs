use crate::error::PlanResult;
use crate::models::{ClinicalStudy, StudyDesign};
use crate::regulatory::RegulatoryViolation;
use crate::stats::SampleSizeResult;
use serde::Serialize;
use std::path::Path;
use std::fs::File;
use log::info;

/// Everything the protocol workflow produces, written side by side.
pub struct ProtocolBundle<'a> {
    pub study: &'a ClinicalStudy,
    pub design: &'a StudyDesign,
    /// Absent when the design has no comparison to size.
    pub sample_size: Option<&'a SampleSizeResult>,
    pub violations: &'a [RegulatoryViolation],
    pub synopsis_text: &'a str,
    pub synopsis_markdown: &'a str,
}

pub fn save_protocol<P: AsRef<Path>>(bundle: &ProtocolBundle<'_>, output_dir: P) -> PlanResult<()> {
    let output_path = output_dir.as_ref();
    
    save_json(bundle.study, output_path.join("study.json"))?;
    save_json(bundle.design, output_path.join("design.json"))?;
    if let Some(result) = bundle.sample_size {
        save_json(result, output_path.join("sample_size.json"))?;
    }
    save_json(&bundle.violations, output_path.join("violations.json"))?;
    
    std::fs::write(output_path.join("synopsis.txt"), bundle.synopsis_text)?;
    std::fs::write(output_path.join("synopsis.md"), bundle.synopsis_markdown)?;
    
    info!("Protocol artefacts saved to {:?}", output_path);
    Ok(())
}

pub fn save_json<T: Serialize + ?Sized, P: AsRef<Path>>(value: &T, path: P) -> PlanResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

/// One row per grid cell, in sweep order.
pub fn save_sensitivity_csv<P: AsRef<Path>>(results: &[SampleSizeResult], path: P) -> PlanResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    
    writer.write_record(&[
        "DESIGN", "EFFECT", "DROPOUT_RATE", "ARMS",
        "N_PER_ARM", "N_PER_ARM_ADJUSTED", "TOTAL_N", "TOTAL_N_ADJUSTED",
        "REFERENCE_N_ADJUSTED",
    ])?;
    
    for result in results {
        // Bioequivalence sweeps vary the CV% in the effect column.
        let effect = result.inputs.effect_size.or(result.inputs.cv_percent).unwrap_or(0.0);
        writer.write_record(&[
            result.design_type.to_string(),
            effect.to_string(),
            result.inputs.dropout_rate.to_string(),
            result.number_of_arms.to_string(),
            result.n_per_arm.to_string(),
            result.n_per_arm_adjusted.to_string(),
            result.total_n.to_string(),
            result.total_n_adjusted.to_string(),
            result.reference_arm.map(|r| r.n_adjusted.to_string()).unwrap_or_default(),
        ])?;
    }
    
    writer.flush()?;
    info!("Wrote {} sensitivity rows", results.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlannerConfig;
    use crate::models::{DesignType, Drug};
    use crate::stats::{Assumptions, DesignInputs, SampleSizeCalculator};
    use tempfile::TempDir;
    
    #[test]
    fn test_sensitivity_csv_rows() {
        let calculator = SampleSizeCalculator::new(&PlannerConfig::default());
        let base = DesignInputs::Parallel {
            effect_size: 300.0,
            std_dev: 500.0,
            number_of_arms: 2,
            allocation_ratio: 1.0,
            assumptions: Assumptions::default(),
        };
        let effects = [200.0, 300.0];
        let dropouts = [0.0, 0.1];
        let results: Vec<SampleSizeResult> = calculator
            .sensitivity_analysis(base, &effects, &dropouts)
            .collect::<PlanResult<_>>()
            .unwrap();
        
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sensitivity.csv");
        save_sensitivity_csv(&results, &path).unwrap();
        
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(&rows[1][0], "parallel");
        assert_eq!(&rows[1][1], "200");
        assert_eq!(&rows[1][7], "220");
        assert_eq!(&rows[1][8], "");
    }
    
    #[test]
    fn test_protocol_without_sample_size() {
        let drug = Drug::new("Drug A", "compound-a", "Lung cancer", "Tablet", "Oral").unwrap();
        let design = StudyDesign::new(DesignType::Parallel, 1, 84);
        let study = ClinicalStudy::new("ONC-002", "Single-arm study of Drug A", drug, design.clone());
        
        let dir = TempDir::new().unwrap();
        save_protocol(&ProtocolBundle {
            study: &study,
            design: &design,
            sample_size: None,
            violations: &[],
            synopsis_text: "STUDY SYNOPSIS",
            synopsis_markdown: "# Study Synopsis",
        }, dir.path()).unwrap();
        
        assert!(dir.path().join("study.json").exists());
        assert!(dir.path().join("synopsis.md").exists());
        assert!(!dir.path().join("sample_size.json").exists());
    }
    
    #[test]
    fn test_save_json_round_trips_result() {
        let calculator = SampleSizeCalculator::new(&PlannerConfig::default());
        let result = calculator
            .calculate_crossover_design(1.0, 2.0, &Assumptions::default())
            .unwrap();
        
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("result.json");
        save_json(&result, &path).unwrap();
        
        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: SampleSizeResult = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, result);
    }
}
