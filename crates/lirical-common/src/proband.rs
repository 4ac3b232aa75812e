/// The evidence presented for one analysis run.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::entities::TermId;
use crate::error::{LiricalError, Result};
use crate::temporal::Age;
use crate::variant::GenotypeSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Female,
    Male,
    Other,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proband {
    pub sample_id: String,
    #[serde(default)]
    pub observed: Vec<TermId>,
    #[serde(default)]
    pub negated: Vec<TermId>,
    #[serde(default)]
    pub age: Option<Age>,
    #[serde(default)]
    pub sex: Option<Sex>,
    /// Per-gene burden. Empty for phenotype-only analyses.
    #[serde(default)]
    pub genotypes: Vec<GenotypeSummary>,
}

impl Proband {
    pub fn new(sample_id: impl Into<String>) -> Self {
        Self {
            sample_id: sample_id.into(),
            observed: vec![],
            negated: vec![],
            age: None,
            sex: None,
            genotypes: vec![],
        }
    }

    pub fn observe(mut self, term: &str) -> Self {
        self.observed.push(TermId::from(term));
        self
    }

    pub fn negate(mut self, term: &str) -> Self {
        self.negated.push(TermId::from(term));
        self
    }

    pub fn with_age(mut self, age: Age) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_sex(mut self, sex: Sex) -> Self {
        self.sex = Some(sex);
        self
    }

    pub fn with_genotypes(mut self, genotypes: Vec<GenotypeSummary>) -> Self {
        self.genotypes = genotypes;
        self
    }

    pub fn has_genotype_evidence(&self) -> bool {
        !self.genotypes.is_empty()
    }

    /// Rejects a term claimed as both present and absent.
    pub fn validate(&self) -> Result<()> {
        let observed: BTreeSet<&TermId> = self.observed.iter().collect();
        if let Some(term) = self.negated.iter().find(|t| observed.contains(t)) {
            return Err(LiricalError::InconsistentPhenotype(term.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observed_and_negated_conflict() {
        let proband = Proband::new("s1").observe("HP:0001250").negate("HP:0001250");
        match proband.validate() {
            Err(LiricalError::InconsistentPhenotype(t)) => assert_eq!(t.as_str(), "HP:0001250"),
            other => panic!("expected inconsistency, got {other:?}"),
        }
    }

    #[test]
    fn test_disjoint_terms_validate() {
        let proband = Proband::new("s1").observe("HP:0001250").negate("HP:0001166");
        assert!(proband.validate().is_ok());
        assert!(!proband.has_genotype_evidence());
    }
}
