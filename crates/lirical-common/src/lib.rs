//! lirical-common — Shared types, errors, and traits used across all LIRICAL crates.

pub mod error;
pub mod entities;
pub mod temporal;
pub mod variant;
pub mod evidence;
pub mod proband;
pub mod ontology;
pub mod scoring_config;

// Re-export commonly used types
pub use entities::{Disease, DiseaseCatalog, GeneIdentifier, ModeOfInheritance, PhenotypeAnnotation, TermId};
pub use error::{LiricalError, Result};
pub use evidence::{
    AnalysisMetadata, AnalysisResults, ComponentDetail, DiseaseResult, GenotypeMatchType,
    LikelihoodRatioComponent, LikelihoodRatioKind, PhenotypeMatchType, TermLikelihoodRatio,
};
pub use ontology::{InMemoryOntology, PhenotypeOntology};
pub use proband::{Proband, Sex};
pub use scoring_config::ScoringConfig;
pub use temporal::{Age, TemporalInterval};
pub use variant::{ClinVarSignificance, GenotypeSummary, VariantCall, Zygosity};
