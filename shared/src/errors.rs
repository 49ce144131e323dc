//! Shared error types for the bootstrap workspace

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Missing required environment variable: {name}")]
    MissingVar { name: String },

    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },

    #[error("Invalid retry budget for {stage}: {reason}")]
    InvalidBudget { stage: String, reason: String },
}

impl SharedError {
    pub fn missing(name: &str) -> Self {
        Self::MissingVar { name: name.to_string() }
    }

    pub fn invalid(field: &str, value: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.to_string(),
            value: value.into(),
        }
    }
}

pub type SharedResult<T> = Result<T, SharedError>;
