use thiserror::Error;

use crate::entities::TermId;

#[derive(Debug, Error)]
pub enum LiricalError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Disease catalog is empty")]
    EmptyCatalog,

    #[error("No pretest probabilities were provided for any disease")]
    EmptyPretest,

    #[error("Invalid pretest probability {probability} for {disease_id} (must be in (0, 1])")]
    InvalidPretest { disease_id: TermId, probability: f64 },

    #[error("Phenotype term {0} is both observed and negated")]
    InconsistentPhenotype(TermId),

    #[error("Numeric domain error: {0}")]
    NumericDomain(String),

    #[error("Invalid likelihood ratio {value} ({context})")]
    InvalidLikelihoodRatio { value: f64, context: String },

    #[error("Malformed background table at line {line}: {reason}")]
    BackgroundTable { line: usize, reason: String },

    #[error("Pathogenicity score {0} is outside [0, 1]")]
    PathogenicityOutOfRange(f64),

    #[error("Invalid age interval: {0}")]
    InvalidAge(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LiricalError {
    /// Configuration-level failures abort the run before scoring starts.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LiricalError::Config(_)
                | LiricalError::EmptyCatalog
                | LiricalError::EmptyPretest
                | LiricalError::InconsistentPhenotype(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LiricalError>;
