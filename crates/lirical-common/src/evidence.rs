/// Likelihood-ratio evidence and the ranked results produced per analysis run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{GeneIdentifier, TermId};
use crate::error::{LiricalError, Result};

// ---------------------------------------------------------------------------
// Match types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikelihoodRatioKind {
    Phenotype,
    Genotype,
    Onset,
}

/// How an observed or negated query term related to the disease profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhenotypeMatchType {
    ExactMatch,
    DiseaseTermSubclassOfQuery,
    QueryTermSubclassOfDiseaseTerm,
    NonRootCommonAncestor,
    NoMatchBelowRoot,
    QueryTermPresentButExcludedInDisease,
    ExcludedQueryTermExcludedInDisease,
    ExcludedQueryTermNotPresentInDisease,
    ExcludedQueryTermPresentInDisease,
    UnusualBackgroundFrequency,
    NoPhenotypeAnnotations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenotypeMatchType {
    NoVariantsDetectedAd,
    NoVariantsDetectedAr,
    OnePathogenicClinVarAlleleInAd,
    TwoPathogenicClinVarAllelesInAr,
    HighNumberOfObservedPredictedPathogenicVariants,
    LiricalGtModel,
    NeutralFallback,
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// Per-term phenotype evidence retained for explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermLikelihoodRatio {
    pub query: TermId,
    pub negated: bool,
    pub ratio: f64,
    pub match_type: PhenotypeMatchType,
    /// Disease term (or common ancestor) the query was matched to.
    #[serde(default)]
    pub matched_term: Option<TermId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentDetail {
    Phenotype {
        terms: Vec<TermLikelihoodRatio>,
    },
    Genotype {
        gene: Option<GeneIdentifier>,
        match_type: GenotypeMatchType,
        pathogenic_allele_count: u32,
        pathogenicity_sum: f64,
        lambda_background: Option<f64>,
    },
    Onset {
        observable: f64,
        not_observable: f64,
    },
    None,
}

/// One tagged piece of evidence for a disease.
///
/// The ratio is held as a natural logarithm so that products over many terms
/// cannot underflow. A component is never zero, negative or NaN: sources that
/// cannot compute a ratio report [`LikelihoodRatioComponent::neutral`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikelihoodRatioComponent {
    pub kind: LikelihoodRatioKind,
    pub disease: TermId,
    pub ln_ratio: f64,
    pub explanation: String,
    pub detail: ComponentDetail,
}

impl LikelihoodRatioComponent {
    pub fn try_new(
        kind: LikelihoodRatioKind,
        disease: TermId,
        ratio: f64,
        explanation: impl Into<String>,
        detail: ComponentDetail,
    ) -> Result<Self> {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(LiricalError::InvalidLikelihoodRatio {
                value: ratio,
                context: format!("{kind:?} for {disease}"),
            });
        }
        Self::try_from_ln(kind, disease, ratio.ln(), explanation, detail)
    }

    pub fn try_from_ln(
        kind: LikelihoodRatioKind,
        disease: TermId,
        ln_ratio: f64,
        explanation: impl Into<String>,
        detail: ComponentDetail,
    ) -> Result<Self> {
        if !ln_ratio.is_finite() {
            return Err(LiricalError::InvalidLikelihoodRatio {
                value: ln_ratio.exp(),
                context: format!("{kind:?} for {disease}"),
            });
        }
        Ok(Self { kind, disease, ln_ratio, explanation: explanation.into(), detail })
    }

    /// LR = 1.0 exactly.
    pub fn neutral(kind: LikelihoodRatioKind, disease: TermId, explanation: impl Into<String>) -> Self {
        Self {
            kind,
            disease,
            ln_ratio: 0.0,
            explanation: explanation.into(),
            detail: ComponentDetail::None,
        }
    }

    pub fn with_detail(mut self, detail: ComponentDetail) -> Self {
        self.detail = detail;
        self
    }

    pub fn ratio(&self) -> f64 {
        self.ln_ratio.exp()
    }

    pub fn log10_ratio(&self) -> f64 {
        self.ln_ratio / std::f64::consts::LN_10
    }

    pub fn is_neutral(&self) -> bool {
        self.ln_ratio == 0.0
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseResult {
    pub disease_id: TermId,
    pub disease_name: String,
    pub pretest_probability: f64,
    pub components: Vec<LikelihoodRatioComponent>,
    /// Natural log of the composite likelihood ratio.
    pub ln_composite_lr: f64,
    pub posttest_probability: f64,
}

impl DiseaseResult {
    /// Combines components with the pretest odds. With no informative evidence
    /// the posttest probability is the pretest probability, bit for bit.
    pub fn new(
        disease_id: TermId,
        disease_name: impl Into<String>,
        pretest_probability: f64,
        components: Vec<LikelihoodRatioComponent>,
    ) -> Self {
        let ln_composite_lr: f64 = components.iter().map(|c| c.ln_ratio).sum();
        let posttest_probability = posttest(pretest_probability, ln_composite_lr);
        Self {
            disease_id,
            disease_name: disease_name.into(),
            pretest_probability,
            components,
            ln_composite_lr,
            posttest_probability,
        }
    }

    pub fn composite_lr(&self) -> f64 {
        self.ln_composite_lr.exp()
    }

    pub fn log10_composite_lr(&self) -> f64 {
        self.ln_composite_lr / std::f64::consts::LN_10
    }

    pub fn component(&self, kind: LikelihoodRatioKind) -> Option<&LikelihoodRatioComponent> {
        self.components.iter().find(|c| c.kind == kind)
    }
}

fn posttest(pretest: f64, ln_lr: f64) -> f64 {
    if ln_lr == 0.0 || pretest >= 1.0 {
        return pretest;
    }
    let ln_odds = pretest.ln() - (1.0 - pretest).ln() + ln_lr;
    if ln_odds >= 0.0 {
        1.0 / (1.0 + (-ln_odds).exp())
    } else {
        let e = ln_odds.exp();
        e / (1.0 + e)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub run_id: Uuid,
    pub analysis_date: DateTime<Utc>,
    #[serde(default)]
    pub sample_id: Option<String>,
    pub diseases_evaluated: usize,
    /// Diseases without a pretest probability or filtered by options.
    pub diseases_skipped: usize,
    pub genes_with_variants: usize,
    pub elapsed_ms: u64,
}

impl AnalysisMetadata {
    pub fn new(sample_id: Option<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            analysis_date: Utc::now(),
            sample_id,
            diseases_evaluated: 0,
            diseases_skipped: 0,
            genes_with_variants: 0,
            elapsed_ms: 0,
        }
    }
}

/// Ranked output of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub results: Vec<DiseaseResult>,
    /// False when the run hit its timeout and the ranking is partial.
    pub complete: bool,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub metadata: AnalysisMetadata,
}

impl AnalysisResults {
    pub fn top(&self, n: usize) -> &[DiseaseResult] {
        &self.results[..n.min(self.results.len())]
    }

    pub fn get(&self, disease_id: &TermId) -> Option<&DiseaseResult> {
        self.results.iter().find(|r| &r.disease_id == disease_id)
    }

    /// 1-based rank of a disease.
    pub fn rank_of(&self, disease_id: &TermId) -> Option<usize> {
        self.results.iter().position(|r| &r.disease_id == disease_id).map(|i| i + 1)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(ratio: f64) -> LikelihoodRatioComponent {
        LikelihoodRatioComponent::try_new(
            LikelihoodRatioKind::Phenotype,
            TermId::from("OMIM:1"),
            ratio,
            "test",
            ComponentDetail::None,
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_invalid_ratios() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let r = LikelihoodRatioComponent::try_new(
                LikelihoodRatioKind::Genotype,
                TermId::from("OMIM:1"),
                bad,
                "bad",
                ComponentDetail::None,
            );
            assert!(r.is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn test_no_evidence_keeps_pretest() {
        let p = 1.0 / 7.0;
        let result = DiseaseResult::new(TermId::from("OMIM:1"), "d", p, vec![]);
        assert_eq!(result.composite_lr(), 1.0);
        assert_eq!(result.posttest_probability, p);

        let neutral = LikelihoodRatioComponent::neutral(LikelihoodRatioKind::Onset, TermId::from("OMIM:1"), "n/a");
        let result = DiseaseResult::new(TermId::from("OMIM:1"), "d", p, vec![neutral]);
        assert_eq!(result.posttest_probability, p);
    }

    #[test]
    fn test_posttest_from_odds() {
        // pretest 0.5 → odds 1; LR 3 → odds 3 → 0.75
        let result = DiseaseResult::new(TermId::from("OMIM:1"), "d", 0.5, vec![component(3.0)]);
        assert!((result.posttest_probability - 0.75).abs() < 1e-12);
        assert!((result.log10_composite_lr() - 3f64.log10()).abs() < 1e-12);
    }

    #[test]
    fn test_extreme_lr_stays_in_unit_interval() {
        let huge = LikelihoodRatioComponent::try_from_ln(
            LikelihoodRatioKind::Phenotype,
            TermId::from("OMIM:1"),
            2000.0,
            "huge",
            ComponentDetail::None,
        )
        .unwrap();
        let result = DiseaseResult::new(TermId::from("OMIM:1"), "d", 1e-4, vec![huge]);
        assert!(result.posttest_probability <= 1.0 && result.posttest_probability > 0.99);

        let tiny = LikelihoodRatioComponent::try_from_ln(
            LikelihoodRatioKind::Phenotype,
            TermId::from("OMIM:1"),
            -2000.0,
            "tiny",
            ComponentDetail::None,
        )
        .unwrap();
        let result = DiseaseResult::new(TermId::from("OMIM:1"), "d", 1e-4, vec![tiny]);
        assert!(result.posttest_probability >= 0.0 && result.posttest_probability < 1e-10);
    }

    #[test]
    fn test_top_and_rank() {
        let results = AnalysisResults {
            results: vec![
                DiseaseResult::new(TermId::from("OMIM:2"), "b", 0.5, vec![component(10.0)]),
                DiseaseResult::new(TermId::from("OMIM:1"), "a", 0.5, vec![]),
            ],
            complete: true,
            warnings: vec![],
            metadata: AnalysisMetadata::new(None),
        };
        assert_eq!(results.top(5).len(), 2);
        assert_eq!(results.top(1)[0].disease_id, TermId::from("OMIM:2"));
        assert_eq!(results.rank_of(&TermId::from("OMIM:1")), Some(2));
        assert!(results.get(&TermId::from("OMIM:3")).is_none());
    }
}
