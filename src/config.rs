use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{PlanError, PlanResult};

/// Static planning configuration. Every threshold the design rules and the
/// sample-size formulas consult lives here so callers can override it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub design: DesignRulesConfig,
    pub statistics: StatisticsConfig,
    pub z_table: Vec<ZTableEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignRulesConfig {
    pub half_life_threshold_hours: f64,
    pub washout_multiplier: f64,
    pub min_washout_days: u32,
    pub default_duration_days: u32,
    pub duration_by_indication: Vec<IndicationDuration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicationDuration {
    pub keyword: String,
    pub days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    pub alpha: f64,
    pub power: f64,
    pub dropout_rate: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ZTableEntry {
    pub probability: f64,
    pub z: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            design: DesignRulesConfig::default(),
            statistics: StatisticsConfig::default(),
            z_table: default_z_table(),
        }
    }
}

impl Default for DesignRulesConfig {
    fn default() -> Self {
        let oncology = [
            "cancer", "carcinoma", "tumor", "tumour", "oncology",
            "lymphoma", "leukemia", "leukaemia", "melanoma", "sarcoma", "myeloma",
        ];
        let mut duration_by_indication: Vec<IndicationDuration> = oncology.iter()
            .map(|keyword| IndicationDuration { keyword: keyword.to_string(), days: 84 })
            .collect();
        duration_by_indication.push(IndicationDuration {
            keyword: "bioequivalence".to_string(),
            days: 28,
        });
        
        Self {
            half_life_threshold_hours: 24.0,
            washout_multiplier: 5.0,
            min_washout_days: 7,
            default_duration_days: 28,
            duration_by_indication,
        }
    }
}

impl DesignRulesConfig {
    /// Treatment duration for an indication, matched by case-insensitive
    /// keyword. A crude heuristic, not a clinical judgement.
    pub fn duration_for_indication(&self, indication: &str) -> u32 {
        let indication = indication.to_lowercase();
        self.duration_by_indication.iter()
            .find(|entry| indication.contains(&entry.keyword.to_lowercase()))
            .map(|entry| entry.days)
            .unwrap_or(self.default_duration_days)
    }
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            power: 0.80,
            dropout_rate: 0.0,
        }
    }
}

pub fn default_z_table() -> Vec<ZTableEntry> {
    [
        (0.80, 0.841_621_233_6),
        (0.85, 1.036_433_389_5),
        (0.90, 1.281_551_565_5),
        (0.95, 1.644_853_626_9),
        (0.975, 1.959_963_985_0),
        (0.99, 2.326_347_874_0),
        (0.995, 2.575_829_303_5),
    ]
    .iter()
    .map(|&(probability, z)| ZTableEntry { probability, z })
    .collect()
}

impl PlannerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> PlanResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
    
    pub fn from_json(content: &str) -> PlanResult<Self> {
        let mut config: PlannerConfig = serde_json::from_str(content)?;
        if config.z_table.is_empty() {
            config.z_table = default_z_table();
        }
        config.validate()?;
        Ok(config)
    }
    
    pub fn validate(&self) -> PlanResult<()> {
        self.validate_design_rules()?;
        self.validate_statistics()?;
        
        for entry in &self.z_table {
            if !(entry.probability > 0.0 && entry.probability < 1.0) || !entry.z.is_finite() {
                return Err(PlanError::Config(
                    format!("z-table entry {:?} is out of range", entry)
                ));
            }
        }
        
        Ok(())
    }
    
    fn validate_design_rules(&self) -> PlanResult<()> {
        let rules = &self.design;
        
        if !(rules.half_life_threshold_hours > 0.0) {
            return Err(PlanError::Config(
                "Half-life threshold must be positive".to_string()
            ));
        }
        
        if !(rules.washout_multiplier > 0.0) {
            return Err(PlanError::Config(
                "Washout multiplier must be positive".to_string()
            ));
        }
        
        if rules.min_washout_days == 0 || rules.default_duration_days == 0 {
            return Err(PlanError::Config(
                "Minimum washout and default duration must be at least one day".to_string()
            ));
        }
        
        if let Some(entry) = rules.duration_by_indication.iter()
            .find(|entry| entry.days == 0 || entry.keyword.trim().is_empty()) {
            return Err(PlanError::Config(
                format!("Invalid indication duration entry for '{}'", entry.keyword)
            ));
        }
        
        Ok(())
    }
    
    fn validate_statistics(&self) -> PlanResult<()> {
        let stats = &self.statistics;
        
        if !(stats.alpha > 0.0 && stats.alpha < 1.0) {
            return Err(PlanError::Config("Default alpha must lie in (0, 1)".to_string()));
        }
        if !(stats.power > 0.0 && stats.power < 1.0) {
            return Err(PlanError::Config("Default power must lie in (0, 1)".to_string()));
        }
        if !(stats.dropout_rate >= 0.0 && stats.dropout_rate < 1.0) {
            return Err(PlanError::Config("Default dropout rate must lie in [0, 1)".to_string()));
        }
        
        Ok(())
    }
}
