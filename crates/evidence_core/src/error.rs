use thiserror::Error;

use crate::store::StoreError;

/// Faults raised by the evidence engine.
///
/// Expected business non-events (a player who has not tested yet, a legacy
/// rule string that does not parse) are never reported through this type;
/// they come back inline as [`crate::rules::RuleOutcomeReason`].
#[derive(Error, Debug)]
pub enum EvidenceError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid performance domain: {0}")]
    InvalidDomain(String),

    #[error("Invalid skill category: {0}")]
    InvalidCategory(String),

    #[error("Invalid gender code: {0}")]
    InvalidGender(String),

    #[error("Invalid benchmark reading: {0}")]
    InvalidReading(f64),

    #[error("Write conflict on breaking point {id} after {attempts} attempts")]
    Conflict { id: String, attempts: u32 },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Test catalog error: {0}")]
    Catalog(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EvidenceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        EvidenceError::NotFound { entity, id: id.to_string() }
    }

    /// Whether the caller may retry the same call and expect a different outcome.
    pub fn is_recoverable(&self) -> bool {
        match self {
            EvidenceError::Conflict { .. } => true,
            EvidenceError::Store(err) => err.is_recoverable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, EvidenceError>;
