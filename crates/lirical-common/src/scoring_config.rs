//! Tunable parameters for a scoring run.
//!
//! Loaded as the `[scoring]` table of `lirical.toml`; every field has a default
//! so partial tables are accepted.

use serde::{Deserialize, Serialize};

use crate::error::{LiricalError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    // ── Genotype ──────────────────────────────────────────────────────────────

    /// Variants at or above this pathogenicity count toward the burden.
    #[serde(default = "default_pathogenicity_threshold")]
    pub pathogenicity_threshold: f64,

    /// Background λ used for genes absent from the background table.
    #[serde(default = "default_background_lambda")]
    pub default_background_lambda: f64,

    /// Penalise genes carrying more predicted pathogenic alleles than the mode expects.
    #[serde(default)]
    pub strict: bool,

    /// Score a disease gene without qualifying variants below neutral.
    #[serde(default)]
    pub penalize_missing_variants: bool,

    /// LR for a dominant gene without qualifying variants; squared for recessive.
    #[serde(default = "default_no_variant_lr")]
    pub no_variant_lr: f64,

    /// LR per pathogenic ClinVar allele satisfying the mode of inheritance.
    #[serde(default = "default_clinvar_pathogenic_lr")]
    pub clinvar_pathogenic_lr: f64,

    // ── Candidate filtering ──────────────────────────────────────────────────

    #[serde(default)]
    pub disregard_diseases_without_deleterious_variants: bool,

    /// Keep diseases with no known gene when genotype evidence is present.
    #[serde(default = "default_true")]
    pub use_global: bool,

    // ── Onset ────────────────────────────────────────────────────────────────

    /// Overlapping onset windows score as implausible instead of fractional.
    #[serde(default)]
    pub onset_strict: bool,

    // ── Execution ────────────────────────────────────────────────────────────

    /// Worker threads; 0 = available parallelism.
    #[serde(default)]
    pub worker_threads: usize,

    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_pathogenicity_threshold() -> f64 { 0.8 }
fn default_background_lambda() -> f64 { 0.1 }
fn default_no_variant_lr() -> f64 { 0.05 }
fn default_clinvar_pathogenic_lr() -> f64 { 1000.0 }
fn default_true() -> bool { true }

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            pathogenicity_threshold: default_pathogenicity_threshold(),
            default_background_lambda: default_background_lambda(),
            strict: false,
            penalize_missing_variants: false,
            no_variant_lr: default_no_variant_lr(),
            clinvar_pathogenic_lr: default_clinvar_pathogenic_lr(),
            disregard_diseases_without_deleterious_variants: false,
            use_global: default_true(),
            onset_strict: false,
            worker_threads: 0,
            timeout_ms: None,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.pathogenicity_threshold) {
            return Err(LiricalError::Config(format!(
                "pathogenicity_threshold {} must be in [0, 1]",
                self.pathogenicity_threshold
            )));
        }
        if !self.default_background_lambda.is_finite() || self.default_background_lambda <= 0.0 {
            return Err(LiricalError::Config(format!(
                "default_background_lambda {} must be positive",
                self.default_background_lambda
            )));
        }
        if !(self.no_variant_lr > 0.0 && self.no_variant_lr <= 1.0) {
            return Err(LiricalError::Config(format!("no_variant_lr {} must be in (0, 1]", self.no_variant_lr)));
        }
        if !self.clinvar_pathogenic_lr.is_finite() || self.clinvar_pathogenic_lr < 1.0 {
            return Err(LiricalError::Config(format!(
                "clinvar_pathogenic_lr {} must be at least 1",
                self.clinvar_pathogenic_lr
            )));
        }
        Ok(())
    }
}
