//! Disease-onset evidence.
//!
//! A disease whose onset window lies entirely before the proband's age is fully
//! explainable; one whose onset lies entirely after it is implausible.

use std::collections::BTreeMap;
use std::sync::Arc;

use lirical_common::entities::{Disease, DiseaseCatalog, TermId};
use lirical_common::error::Result;
use lirical_common::evidence::{ComponentDetail, LikelihoodRatioComponent, LikelihoodRatioKind};
use lirical_common::temporal::{Age, TemporalInterval, TemporalOverlap};

const EPSILON: f64 = 1e-8;

pub trait DiseaseOnsetProbability: Send + Sync {
    /// Probability that the disease is observable in a proband of this age.
    fn disease_observable_given_age(&self, disease_id: &TermId, age: &Age) -> f64;

    /// Probability of observing the presentation at this age without the disease.
    fn disease_not_observable_given_age(&self, disease_id: &TermId, age: &Age) -> f64;
}

// ── Interval-backed ──────────────────────────────────────────────────────────

/// Uses each disease's onset interval; diseases with unknown onset are always observable.
pub struct IntervalOnsetProbability {
    onsets: BTreeMap<TermId, Option<TemporalInterval>>,
    strict: bool,
}

impl IntervalOnsetProbability {
    pub fn new(catalog: &DiseaseCatalog, strict: bool) -> Self {
        let onsets = catalog.iter().map(|d| (d.id.clone(), d.onset)).collect();
        Self { onsets, strict }
    }

    fn observable(&self, onset: Option<&TemporalInterval>, age: &Age) -> f64 {
        let Some(onset) = onset else {
            return 1.0 - EPSILON;
        };
        match onset.overlap_with(age) {
            TemporalOverlap::Before => 1.0 - EPSILON,
            TemporalOverlap::After => EPSILON,
            TemporalOverlap::Overlapping if self.strict => EPSILON,
            TemporalOverlap::Overlapping => onset.fraction_at_or_before(age.upper).clamp(EPSILON, 1.0 - EPSILON),
        }
    }
}

impl DiseaseOnsetProbability for IntervalOnsetProbability {
    fn disease_observable_given_age(&self, disease_id: &TermId, age: &Age) -> f64 {
        self.observable(self.onsets.get(disease_id).and_then(Option::as_ref), age)
    }

    /// Mean observability across the catalog, independent of `disease_id`.
    fn disease_not_observable_given_age(&self, _disease_id: &TermId, age: &Age) -> f64 {
        if self.onsets.is_empty() {
            return 1.0 - EPSILON;
        }
        let sum: f64 = self.onsets.values().map(|o| self.observable(o.as_ref(), age)).sum();
        sum / self.onsets.len() as f64
    }
}

// ── Uninformative ────────────────────────────────────────────────────────────

/// Returns the same probability for both hypotheses, so the onset LR is always 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct UninformativeOnsetProbability;

impl DiseaseOnsetProbability for UninformativeOnsetProbability {
    fn disease_observable_given_age(&self, _disease_id: &TermId, _age: &Age) -> f64 {
        0.5
    }

    fn disease_not_observable_given_age(&self, _disease_id: &TermId, _age: &Age) -> f64 {
        0.5
    }
}

// ── Likelihood ratio ─────────────────────────────────────────────────────────

pub struct DiseaseOnsetLikelihoodRatio {
    probability: Arc<dyn DiseaseOnsetProbability>,
}

impl DiseaseOnsetLikelihoodRatio {
    pub fn new(probability: Arc<dyn DiseaseOnsetProbability>) -> Self {
        Self { probability }
    }

    /// `None` when the age is unknown or the disease has no onset data.
    pub fn ratio(&self, disease: &Disease, age: Option<&Age>) -> Result<Option<LikelihoodRatioComponent>> {
        let (Some(age), Some(_)) = (age, disease.onset.as_ref()) else {
            return Ok(None);
        };
        let observable = self.probability.disease_observable_given_age(&disease.id, age);
        let not_observable = self.probability.disease_not_observable_given_age(&disease.id, age);
        let component = LikelihoodRatioComponent::try_new(
            LikelihoodRatioKind::Onset,
            disease.id.clone(),
            observable / not_observable,
            format!("P(observable | age)={observable:.4}; P(observable | age, ¬D)={not_observable:.4}"),
            ComponentDetail::Onset { observable, not_observable },
        )?;
        Ok(Some(component))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lirical_test_utils::*;

    fn interval() -> IntervalOnsetProbability {
        IntervalOnsetProbability::new(&toy_catalog(), false)
    }

    #[test]
    fn test_onset_before_age_is_observable() {
        let p = interval().disease_observable_given_age(&term(DRAVET), &Age::years(10.0));
        assert!((p - (1.0 - EPSILON)).abs() < 1e-15);
    }

    #[test]
    fn test_onset_after_age_is_implausible() {
        let p = interval().disease_observable_given_age(&term(MARFAN), &Age::years(0.5));
        assert_eq!(p, EPSILON);
    }

    #[test]
    fn test_overlapping_onset_uses_upper_bound() {
        let age = Age::interval(10.0 * 365.25, 15.0 * 365.25).unwrap();
        let p = interval().disease_observable_given_age(&term(MARFAN), &age);
        assert!((p - 14.0 / 29.0).abs() < 1e-9);

        let strict = IntervalOnsetProbability::new(&toy_catalog(), true);
        assert_eq!(strict.disease_observable_given_age(&term(MARFAN), &age), EPSILON);
    }

    #[test]
    fn test_not_observable_is_catalog_mean() {
        let p = interval().disease_not_observable_given_age(&term(DRAVET), &Age::years(10.0));
        let expected = (9.0 / 29.0 + 4.0 * (1.0 - EPSILON)) / 5.0;
        assert!((p - expected).abs() < 1e-9);
    }

    #[test]
    fn test_ratio_requires_age_and_onset() {
        let lr = DiseaseOnsetLikelihoodRatio::new(Arc::new(interval()));
        assert!(lr.ratio(&dravet(), None).unwrap().is_none());
        assert!(lr.ratio(&ectopia_lentis_familial(), Some(&Age::years(3.0))).unwrap().is_none());

        let c = lr.ratio(&dravet(), Some(&Age::years(10.0))).unwrap().unwrap();
        assert!(c.ratio() > 1.0);
        let c = lr.ratio(&marfan(), Some(&Age::years(0.5))).unwrap().unwrap();
        assert!(c.ratio() < 1e-6);
    }

    #[test]
    fn test_uninformative_is_neutral() {
        let lr = DiseaseOnsetLikelihoodRatio::new(Arc::new(UninformativeOnsetProbability));
        let c = lr.ratio(&marfan(), Some(&Age::years(0.5))).unwrap().unwrap();
        assert!(c.is_neutral());
    }
}
