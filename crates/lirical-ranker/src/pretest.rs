//! Pretest (prior) disease probabilities.

use std::collections::{HashMap, HashSet};

use lirical_common::entities::{DiseaseCatalog, TermId};
use lirical_common::error::{LiricalError, Result};

pub trait PretestProbabilityProvider: Send + Sync {
    /// `None` means the disease is not part of this analysis.
    fn pretest_probability(&self, disease_id: &TermId) -> Option<f64>;

    /// Number of diseases with a defined probability.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Uniform ──────────────────────────────────────────────────────────────────

/// `1/N` for each of the N supplied diseases.
#[derive(Debug, Clone)]
pub struct UniformPretestProbability {
    ids: HashSet<TermId>,
    probability: f64,
}

impl UniformPretestProbability {
    pub fn new(ids: impl IntoIterator<Item = TermId>) -> Result<Self> {
        let ids: HashSet<TermId> = ids.into_iter().collect();
        if ids.is_empty() {
            return Err(LiricalError::EmptyPretest);
        }
        let probability = 1.0 / ids.len() as f64;
        Ok(Self { ids, probability })
    }

    /// Uniform over catalog diseases whose identifier prefix is in `prefixes`, e.g. `["OMIM"]`.
    pub fn for_databases(catalog: &DiseaseCatalog, prefixes: &[&str]) -> Result<Self> {
        Self::new(
            catalog
                .ids()
                .filter(|id| prefixes.iter().any(|p| id.prefix().eq_ignore_ascii_case(p)))
                .cloned(),
        )
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl PretestProbabilityProvider for UniformPretestProbability {
    fn pretest_probability(&self, disease_id: &TermId) -> Option<f64> {
        self.ids.contains(disease_id).then_some(self.probability)
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

// ── Explicit ─────────────────────────────────────────────────────────────────

/// Externally informed priors, e.g. from prevalence data.
#[derive(Debug, Clone)]
pub struct ExplicitPretestProbability {
    probabilities: HashMap<TermId, f64>,
}

impl ExplicitPretestProbability {
    pub fn new(probabilities: HashMap<TermId, f64>) -> Result<Self> {
        if probabilities.is_empty() {
            return Err(LiricalError::EmptyPretest);
        }
        if let Some((id, p)) = probabilities.iter().find(|(_, p)| !(**p > 0.0 && **p <= 1.0)) {
            return Err(LiricalError::InvalidPretest { disease_id: id.clone(), probability: *p });
        }
        Ok(Self { probabilities })
    }
}

impl PretestProbabilityProvider for ExplicitPretestProbability {
    fn pretest_probability(&self, disease_id: &TermId) -> Option<f64> {
        self.probabilities.get(disease_id).copied()
    }

    fn len(&self) -> usize {
        self.probabilities.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lirical_test_utils::*;

    #[test]
    fn test_uniform_over_catalog() {
        let catalog = toy_catalog();
        let uniform = UniformPretestProbability::new(catalog.ids().cloned()).unwrap();
        let total: f64 = catalog.ids().filter_map(|id| uniform.pretest_probability(id)).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(uniform.pretest_probability(&term(MARFAN)), Some(0.2));
        assert_eq!(uniform.pretest_probability(&term("OMIM:000000")), None);
    }

    #[test]
    fn test_uniform_restricted_to_databases() {
        let uniform = UniformPretestProbability::for_databases(&toy_catalog(), &["OMIM"]).unwrap();
        assert_eq!(uniform.len(), 4);
        assert_eq!(uniform.pretest_probability(&term(UNANNOTATED)), None);
        assert!(UniformPretestProbability::for_databases(&toy_catalog(), &["DECIPHER"]).is_err());
    }

    #[test]
    fn test_explicit_validates_range() {
        let bad = HashMap::from([(term(MARFAN), 0.0)]);
        assert!(matches!(ExplicitPretestProbability::new(bad), Err(LiricalError::InvalidPretest { .. })));
        let bad = HashMap::from([(term(MARFAN), f64::NAN)]);
        assert!(ExplicitPretestProbability::new(bad).is_err());
        assert!(matches!(ExplicitPretestProbability::new(HashMap::new()), Err(LiricalError::EmptyPretest)));

        let ok = ExplicitPretestProbability::new(HashMap::from([(term(MARFAN), 1.0)])).unwrap();
        assert_eq!(ok.pretest_probability(&term(MARFAN)), Some(1.0));
        assert_eq!(ok.pretest_probability(&term(LEIGH)), None);
    }
}
