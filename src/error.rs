use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    
    #[error("Invalid input for `{field}`: {message}")]
    InvalidInput { field: String, message: String },
    
    #[error("Invalid planner configuration: {0}")]
    Config(String),
}

impl PlanError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        PlanError::InvalidInput {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub type PlanResult<T> = Result<T, PlanError>;
