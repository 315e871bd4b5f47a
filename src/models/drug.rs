use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use crate::error::{PlanError, PlanResult};

const HALF_LIFE_NAMES: [&str; 5] = ["t1/2", "t_half", "half-life", "half_life", "halflife"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drug {
    pub name: String,
    pub active_ingredient: String,
    pub indication: String,
    pub dosage_form: String,
    pub route_of_administration: String,
    pub manufacturer: Option<String>,
    pub approval_status: Option<String>,
}

impl Drug {
    pub fn new(
        name: &str,
        active_ingredient: &str,
        indication: &str,
        dosage_form: &str,
        route_of_administration: &str,
    ) -> PlanResult<Self> {
        let drug = Self {
            name: name.trim().to_string(),
            active_ingredient: active_ingredient.trim().to_string(),
            indication: indication.to_string(),
            dosage_form: dosage_form.to_string(),
            route_of_administration: route_of_administration.to_string(),
            manufacturer: None,
            approval_status: None,
        };
        drug.validate()?;
        Ok(drug)
    }
    
    pub fn validate(&self) -> PlanResult<()> {
        if self.name.trim().is_empty() {
            return Err(PlanError::invalid("drug.name", "must not be empty"));
        }
        if self.active_ingredient.trim().is_empty() {
            return Err(PlanError::invalid("drug.active_ingredient", "must not be empty"));
        }
        Ok(())
    }
}

impl fmt::Display for Drug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.active_ingredient)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PKParameter {
    pub parameter_name: String,
    pub value: f64,
    pub unit: String,
    pub coefficient_of_variation: Option<f64>,
    pub source: Option<String>,
}

impl PKParameter {
    pub fn new(parameter_name: &str, value: f64, unit: &str) -> PlanResult<Self> {
        if !value.is_finite() {
            return Err(PlanError::invalid(
                "pk_parameter.value",
                format!("{} must be a finite number", parameter_name),
            ));
        }
        if unit.trim().is_empty() {
            return Err(PlanError::invalid(
                "pk_parameter.unit",
                format!("{} has no unit", parameter_name),
            ));
        }
        
        Ok(Self {
            parameter_name: parameter_name.to_string(),
            value,
            unit: unit.to_string(),
            coefficient_of_variation: None,
            source: None,
        })
    }
    
    pub fn with_cv(mut self, cv: f64) -> Self {
        self.coefficient_of_variation = Some(cv);
        self
    }
    
    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }
    
    /// Value converted to hours when the unit is a time unit.
    pub fn value_in_hours(&self) -> Option<f64> {
        let unit = self.unit.trim().to_lowercase();
        match unit.as_str() {
            "h" | "hr" | "hrs" | "hour" | "hours" => Some(self.value),
            "min" | "mins" | "minute" | "minutes" => Some(self.value / 60.0),
            "d" | "day" | "days" => Some(self.value * 24.0),
            _ => None,
        }
    }
}

impl fmt::Display for PKParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {}", self.parameter_name, self.value, self.unit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PKProfile {
    pub drug_name: String,
    pub parameters: Vec<PKParameter>,
    pub study_reference: Option<String>,
    pub population_characteristics: BTreeMap<String, String>,
}

impl PKProfile {
    pub fn new(drug: &Drug) -> Self {
        Self {
            drug_name: drug.name.clone(),
            parameters: Vec::new(),
            study_reference: None,
            population_characteristics: BTreeMap::new(),
        }
    }
    
    pub fn add_parameter(&mut self, parameter: PKParameter) {
        self.parameters.push(parameter);
    }
    
    pub fn get_parameter(&self, parameter_name: &str) -> Option<&PKParameter> {
        self.parameters.iter()
            .find(|p| p.parameter_name.eq_ignore_ascii_case(parameter_name))
    }
    
    /// Terminal half-life in hours, if the profile carries one with a time unit.
    pub fn half_life_hours(&self) -> Option<f64> {
        self.parameters.iter()
            .find(|p| HALF_LIFE_NAMES.iter().any(|name| p.parameter_name.eq_ignore_ascii_case(name)))
            .and_then(PKParameter::value_in_hours)
    }
}
