//! Genotype likelihood ratios.
//!
//! The proband's weighted pathogenic burden in a gene is scored under two
//! Poisson models: the disease model with λ = 1 (dominant) or 2 (recessive) and
//! the population background with the gene's λ. ClinVar pathogenic alleles and
//! genes without qualifying variants are handled by fixed ratios first.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use lirical_common::entities::{Disease, GeneIdentifier, ModeOfInheritance, TermId};
use lirical_common::error::{LiricalError, Result};
use lirical_common::evidence::{ComponentDetail, GenotypeMatchType, LikelihoodRatioComponent, LikelihoodRatioKind};
use lirical_common::scoring_config::ScoringConfig;
use lirical_common::variant::GenotypeSummary;

use crate::background::BackgroundFrequencyModel;
use crate::poisson::PoissonDistribution;

/// Down-weighting per surplus allele when more pathogenic alleles are called than the mode expects.
const HEURISTIC_PATH_ALLELE_COUNT_ABOVE_LAMBDA_D: f64 = 0.10;
const EPSILON: f64 = 1e-5;

pub struct GenotypeLikelihoodRatio {
    background: Arc<BackgroundFrequencyModel>,
    dominant: PoissonDistribution,
    recessive: PoissonDistribution,
    config: ScoringConfig,
}

/// Best-scoring gene for a disease plus any recoveries made on the way.
#[derive(Debug, Clone)]
pub struct GenotypeEvaluation {
    pub component: LikelihoodRatioComponent,
    pub warnings: Vec<String>,
}

impl GenotypeLikelihoodRatio {
    pub fn new(background: Arc<BackgroundFrequencyModel>, config: ScoringConfig) -> Result<Self> {
        Ok(Self {
            background,
            dominant: PoissonDistribution::new(1.0)?,
            recessive: PoissonDistribution::new(2.0)?,
            config,
        })
    }

    fn disease_model(&self, mode: ModeOfInheritance) -> &PoissonDistribution {
        if mode.is_recessive() { &self.recessive } else { &self.dominant }
    }

    /// Genotype component for one disease-associated gene. `summary` is `None`
    /// when the proband has no calls in the gene.
    pub fn evaluate_gene(
        &self,
        disease: &Disease,
        gene: &GeneIdentifier,
        summary: Option<&GenotypeSummary>,
    ) -> Result<LikelihoodRatioComponent> {
        let recessive = disease.modes_of_inheritance.contains(&ModeOfInheritance::AutosomalRecessive);

        let Some(summary) = summary.filter(|s| s.has_variants()) else {
            return self.no_variants(disease, gene, recessive, None);
        };

        let clinvar = summary.pathogenic_clinvar_allele_count;
        if clinvar > 0 {
            if recessive {
                if clinvar == 2 {
                    return self.component(
                        disease,
                        self.config.clinvar_pathogenic_lr.powi(2),
                        format!("{}: two pathogenic ClinVar alleles (autosomal recessive)", gene.symbol),
                        self.detail(gene, GenotypeMatchType::TwoPathogenicClinVarAllelesInAr, summary, None),
                    );
                }
            } else {
                return self.component(
                    disease,
                    self.config.clinvar_pathogenic_lr,
                    format!("{}: pathogenic ClinVar allele", gene.symbol),
                    self.detail(gene, GenotypeMatchType::OnePathogenicClinVarAlleleInAd, summary, None),
                );
            }
        }

        let allele_count = summary.pathogenic_allele_count;
        let burden = summary.pathogenicity_sum;
        if allele_count == 0 || burden < EPSILON {
            return self.no_variants(disease, gene, recessive, Some(summary));
        }

        let mut lambda_background = self.background.expected_rate(&gene.id);
        // A gene with high background is best explained by background variation.
        if lambda_background > 1.0 {
            lambda_background = lambda_background.min(allele_count as f64);
        }
        let background = PoissonDistribution::new(lambda_background)?;
        let ln_b = background.ln_probability(burden)?;

        let modes: Vec<ModeOfInheritance> = if disease.modes_of_inheritance.is_empty() {
            debug!(disease = %disease.id, "No mode of inheritance; assuming autosomal dominant");
            vec![ModeOfInheritance::AutosomalDominant]
        } else {
            disease.modes_of_inheritance.clone()
        };

        // (ln LR, mode, strict heuristic applied)
        let mut best: Option<(f64, ModeOfInheritance, bool)> = None;
        for mode in modes {
            let lambda_disease = mode.expected_pathogenic_alleles();
            let candidate = if self.config.strict && allele_count as f64 > lambda_disease + EPSILON {
                let heuristic = HEURISTIC_PATH_ALLELE_COUNT_ABOVE_LAMBDA_D * (allele_count as f64 - lambda_disease);
                Some((heuristic.ln(), mode, true))
            } else {
                let ln_d = self.disease_model(mode).ln_probability(burden)?;
                if ln_d.is_finite() && ln_b.is_finite() {
                    Some((ln_d - ln_b, mode, false))
                } else {
                    None
                }
            };
            if let Some(c) = candidate {
                if best.map(|(b, _, _)| c.0 > b).unwrap_or(true) {
                    best = Some(c);
                }
            }
        }

        // No finite candidate: reported as a numeric failure so that `ratio` records a
        // neutral component with a warning instead of applying a fixed penalty.
        let Some((ln_lr, mode, heuristic)) = best else {
            return Err(LiricalError::NumericDomain(format!(
                "{}: burden {burden:.3} has zero probability under λ_background={lambda_background}",
                gene.symbol
            )));
        };

        let (match_type, explanation) = if heuristic {
            (
                GenotypeMatchType::HighNumberOfObservedPredictedPathogenicVariants,
                format!(
                    "{}: {allele_count} predicted pathogenic alleles exceed the {} model",
                    gene.symbol,
                    mode.label()
                ),
            )
        } else {
            (
                GenotypeMatchType::LiricalGtModel,
                format!(
                    "{}: log10(LR)={:.3}; mode {}; weighted pathogenic count {burden:.2}; λ_disease={}; λ_background={lambda_background:.4}",
                    gene.symbol,
                    ln_lr / std::f64::consts::LN_10,
                    mode.label(),
                    mode.expected_pathogenic_alleles(),
                ),
            )
        };
        LikelihoodRatioComponent::try_from_ln(
            LikelihoodRatioKind::Genotype,
            disease.id.clone(),
            ln_lr,
            explanation,
            self.detail(gene, match_type, summary, Some(lambda_background)),
        )
    }

    /// Genotype component for a disease: the best of its genes. `None` for
    /// diseases without a gene association. Failures for a gene degrade to a
    /// neutral ratio and a warning.
    pub fn ratio(&self, disease: &Disease, genotypes: &HashMap<TermId, GenotypeSummary>) -> Option<GenotypeEvaluation> {
        let mut warnings = Vec::new();
        let mut best: Option<LikelihoodRatioComponent> = None;
        for gene in &disease.genes {
            let component = match self.evaluate_gene(disease, gene, genotypes.get(&gene.id)) {
                Ok(c) => c,
                Err(e) => {
                    warn!(disease = %disease.id, gene = %gene.symbol, "Genotype LR fell back to neutral: {e}");
                    warnings.push(format!("{} / {}: {e}", disease.id, gene.symbol));
                    neutral_fallback(disease, gene, &e)
                }
            };
            if best.as_ref().map(|b| component.ln_ratio > b.ln_ratio).unwrap_or(true) {
                best = Some(component);
            }
        }
        best.map(|component| GenotypeEvaluation { component, warnings })
    }

    fn no_variants(
        &self,
        disease: &Disease,
        gene: &GeneIdentifier,
        recessive: bool,
        summary: Option<&GenotypeSummary>,
    ) -> Result<LikelihoodRatioComponent> {
        let match_type = if recessive {
            GenotypeMatchType::NoVariantsDetectedAr
        } else {
            GenotypeMatchType::NoVariantsDetectedAd
        };
        let empty = GenotypeSummary::empty(gene.clone());
        let detail = self.detail(gene, match_type, summary.unwrap_or(&empty), None);
        if !self.config.penalize_missing_variants {
            return Ok(LikelihoodRatioComponent::neutral(
                LikelihoodRatioKind::Genotype,
                disease.id.clone(),
                format!("{}: no qualifying variants", gene.symbol),
            )
            .with_detail(detail));
        }
        let lr = if recessive { self.config.no_variant_lr.powi(2) } else { self.config.no_variant_lr };
        self.component(disease, lr, format!("{}: no qualifying variants detected", gene.symbol), detail)
    }

    fn component(&self, disease: &Disease, lr: f64, explanation: String, detail: ComponentDetail) -> Result<LikelihoodRatioComponent> {
        LikelihoodRatioComponent::try_new(LikelihoodRatioKind::Genotype, disease.id.clone(), lr, explanation, detail)
    }

    fn detail(
        &self,
        gene: &GeneIdentifier,
        match_type: GenotypeMatchType,
        summary: &GenotypeSummary,
        lambda_background: Option<f64>,
    ) -> ComponentDetail {
        ComponentDetail::Genotype {
            gene: Some(gene.clone()),
            match_type,
            pathogenic_allele_count: summary.pathogenic_allele_count,
            pathogenicity_sum: summary.pathogenicity_sum,
            lambda_background,
        }
    }
}

fn neutral_fallback(disease: &Disease, gene: &GeneIdentifier, err: &LiricalError) -> LikelihoodRatioComponent {
    LikelihoodRatioComponent::neutral(
        LikelihoodRatioKind::Genotype,
        disease.id.clone(),
        format!("{}: neutral after numeric failure ({err})", gene.symbol),
    )
    .with_detail(ComponentDetail::Genotype {
        gene: Some(gene.clone()),
        match_type: GenotypeMatchType::NeutralFallback,
        pathogenic_allele_count: 0,
        pathogenicity_sum: 0.0,
        lambda_background: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::{Bin, GeneBins};
    use lirical_common::variant::Zygosity;

    fn gene(id: &str, symbol: &str) -> GeneIdentifier {
        GeneIdentifier::new(id, symbol)
    }

    fn summary(gene: GeneIdentifier, alleles: u32, clinvar: u32, burden: f64) -> GenotypeSummary {
        GenotypeSummary {
            gene,
            total_calls: alleles.max(clinvar).max(1),
            variant_count: alleles,
            pathogenicity_sum: burden,
            pathogenic_allele_count: alleles,
            pathogenic_clinvar_allele_count: clinvar,
            most_damaging: Zygosity::Heterozygous,
        }
    }

    fn disease_with(gene: &GeneIdentifier, mode: ModeOfInheritance) -> Disease {
        Disease::new("OMIM:1", "test").with_gene(gene.clone()).with_inheritance(mode)
    }

    fn calculator(background: BackgroundFrequencyModel, config: ScoringConfig) -> GenotypeLikelihoodRatio {
        GenotypeLikelihoodRatio::new(Arc::new(background), config).unwrap()
    }

    fn model_with(gene: &GeneIdentifier, lambda: f64) -> BackgroundFrequencyModel {
        let mut model = BackgroundFrequencyModel::empty(0.1);
        model.insert(GeneBins { gene: gene.clone(), benign: Bin::new(), pathogenic: Bin::from_totals(lambda, 1) });
        model
    }

    fn penalizing() -> ScoringConfig {
        ScoringConfig { penalize_missing_variants: true, ..Default::default() }
    }

    #[test]
    fn test_one_clinvar_allele_dominant() {
        let g = gene("Fake:123", "FAKE_SYMBOL");
        let glr = calculator(BackgroundFrequencyModel::empty(0.1), ScoringConfig::default());
        let c = glr
            .evaluate_gene(&disease_with(&g, ModeOfInheritance::AutosomalDominant), &g, Some(&summary(g.clone(), 1, 1, 0.8)))
            .unwrap();
        assert!((c.ratio() - 1000.0).abs() < 1e-6);
        assert!(matches!(c.detail, ComponentDetail::Genotype { match_type: GenotypeMatchType::OnePathogenicClinVarAlleleInAd, .. }));
    }

    #[test]
    fn test_two_clinvar_alleles_recessive() {
        let g = gene("Fake:123", "FAKE_SYMBOL");
        let glr = calculator(BackgroundFrequencyModel::empty(0.1), ScoringConfig::default());
        let c = glr
            .evaluate_gene(&disease_with(&g, ModeOfInheritance::AutosomalRecessive), &g, Some(&summary(g.clone(), 2, 2, 1.6)))
            .unwrap();
        assert!((c.ratio() / 1e6 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_three_clinvar_alleles_recessive_use_poisson_model() {
        let g = gene("Fake:123", "FAKE_SYMBOL");
        let glr = calculator(BackgroundFrequencyModel::empty(0.1), ScoringConfig::default());
        let c = glr
            .evaluate_gene(&disease_with(&g, ModeOfInheritance::AutosomalRecessive), &g, Some(&summary(g.clone(), 3, 3, 2.4)))
            .unwrap();
        assert!(matches!(c.detail, ComponentDetail::Genotype { match_type: GenotypeMatchType::LiricalGtModel, .. }));
        assert!((c.ratio() / 1e6 - 1.0).abs() > 1e-3);
    }

    #[test]
    fn test_high_background_lambda_capped_at_allele_count() {
        let g = gene("NCBIGene:3106", "HLA-B");
        let glr = calculator(model_with(&g, 5.0), ScoringConfig::default());
        let c = glr
            .evaluate_gene(&disease_with(&g, ModeOfInheritance::AutosomalDominant), &g, Some(&summary(g.clone(), 2, 0, 1.8)))
            .unwrap();

        let ln_d = PoissonDistribution::new(1.0).unwrap().ln_probability(1.8).unwrap();
        let ln_capped = PoissonDistribution::new(2.0).unwrap().ln_probability(1.8).unwrap();
        let ln_uncapped = PoissonDistribution::new(5.0).unwrap().ln_probability(1.8).unwrap();
        assert!((c.ln_ratio - (ln_d - ln_capped)).abs() < 1e-9, "{}", c.ln_ratio);
        assert!((c.ln_ratio - (ln_d - ln_uncapped)).abs() > 1e-3);
        match c.detail {
            ComponentDetail::Genotype { lambda_background: Some(lambda), .. } => assert!((lambda - 2.0).abs() < 1e-12),
            other => panic!("unexpected detail {other:?}"),
        }
    }

    #[test]
    fn test_no_variants_is_neutral_by_default() {
        let g = gene("NCBIGene:3106", "HLA-B");
        let glr = calculator(model_with(&g, 8.7418), ScoringConfig::default());
        let c = glr.evaluate_gene(&disease_with(&g, ModeOfInheritance::AutosomalDominant), &g, None).unwrap();
        assert!(c.is_neutral());
    }

    #[test]
    fn test_no_variants_penalised_when_enabled() {
        let g = gene("NCBIGene:3106", "HLA-B");
        let glr = calculator(model_with(&g, 8.7418), penalizing());
        let ad = glr.evaluate_gene(&disease_with(&g, ModeOfInheritance::AutosomalDominant), &g, None).unwrap();
        assert!((ad.ratio() - 0.05).abs() < 1e-9);
        let ar = glr
            .evaluate_gene(&disease_with(&g, ModeOfInheritance::AutosomalRecessive), &g, Some(&summary(g.clone(), 0, 0, 0.0)))
            .unwrap();
        assert!((ar.ratio() - 0.0025).abs() < 1e-9);
        assert!(matches!(ar.detail, ComponentDetail::Genotype { match_type: GenotypeMatchType::NoVariantsDetectedAr, .. }));
    }

    #[test]
    fn test_poisson_model_many_alleles() {
        let g = gene("NCBIGene:7068", "THRB");
        let glr = calculator(model_with(&g, 0.006973), ScoringConfig::default());
        let c = glr
            .evaluate_gene(&disease_with(&g, ModeOfInheritance::AutosomalRecessive), &g, Some(&summary(g.clone(), 56, 0, 44.8)))
            .unwrap();
        assert!(matches!(c.detail, ComponentDetail::Genotype { match_type: GenotypeMatchType::LiricalGtModel, .. }));
        assert!((c.log10_ratio() - 109.235).abs() < 1e-3, "{}", c.log10_ratio());
    }

    #[test]
    fn test_strict_mode_downweights_excess_alleles() {
        let g = gene("NCBIGene:7068", "THRB");
        let config = ScoringConfig { strict: true, ..Default::default() };
        let glr = calculator(model_with(&g, 0.006973), config);
        let c = glr
            .evaluate_gene(&disease_with(&g, ModeOfInheritance::AutosomalDominant), &g, Some(&summary(g.clone(), 3, 0, 2.7)))
            .unwrap();
        assert!((c.ratio() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_gene_uses_default_lambda() {
        let g = gene("NCBIGene:1", "NOVEL");
        let glr = calculator(BackgroundFrequencyModel::empty(0.1), ScoringConfig::default());
        let c = glr
            .evaluate_gene(&disease_with(&g, ModeOfInheritance::AutosomalDominant), &g, Some(&summary(g.clone(), 1, 0, 0.9)))
            .unwrap();
        let d = PoissonDistribution::new(1.0).unwrap().probability(0.9).unwrap();
        let b = PoissonDistribution::new(0.1).unwrap().probability(0.9).unwrap();
        assert!((c.ratio() - d / b).abs() < 1e-9);
    }

    #[test]
    fn test_zero_background_falls_back_to_neutral() {
        let g = gene("NCBIGene:2", "ZERO");
        let glr = calculator(model_with(&g, 0.0), ScoringConfig::default());
        let disease = disease_with(&g, ModeOfInheritance::AutosomalDominant);
        assert!(matches!(
            glr.evaluate_gene(&disease, &g, Some(&summary(g.clone(), 1, 0, 0.9))),
            Err(LiricalError::NumericDomain(_))
        ));

        let genotypes = HashMap::from([(g.id.clone(), summary(g.clone(), 1, 0, 0.9))]);
        let evaluation = glr.ratio(&disease, &genotypes).unwrap();
        assert!(evaluation.component.is_neutral());
        assert_eq!(evaluation.warnings.len(), 1);
    }

    #[test]
    fn test_best_gene_selected() {
        let a = gene("NCBIGene:10", "A");
        let b = gene("NCBIGene:11", "B");
        let disease = Disease::new("OMIM:2", "two genes")
            .with_gene(a.clone())
            .with_gene(b.clone())
            .with_inheritance(ModeOfInheritance::AutosomalDominant);
        let glr = calculator(BackgroundFrequencyModel::empty(0.1), ScoringConfig::default());
        let genotypes = HashMap::from([(b.id.clone(), summary(b.clone(), 1, 1, 0.9))]);
        let evaluation = glr.ratio(&disease, &genotypes).unwrap();
        assert!((evaluation.component.ratio() - 1000.0).abs() < 1e-6);
        assert!(evaluation.warnings.is_empty());
    }

    #[test]
    fn test_disease_without_genes_has_no_component() {
        let glr = calculator(BackgroundFrequencyModel::empty(0.1), ScoringConfig::default());
        assert!(glr.ratio(&Disease::new("OMIM:3", "no genes"), &HashMap::new()).is_none());
    }
}
