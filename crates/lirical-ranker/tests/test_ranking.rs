//! End-to-end ranking over the toy catalog.

use std::sync::Arc;

use lirical_common::entities::DiseaseCatalog;
use lirical_common::error::LiricalError;
use lirical_common::evidence::{ComponentDetail, DiseaseResult, GenotypeMatchType, LikelihoodRatioComponent, LikelihoodRatioKind};
use lirical_common::proband::Proband;
use lirical_common::scoring_config::ScoringConfig;
use lirical_common::temporal::Age;
use lirical_common::variant::{ClinVarSignificance, Zygosity};
use lirical_ranker::{aggregate, rank, BackgroundFrequencyModel, Bin, LiricalEngine, PoissonDistribution, UniformPretestProbability};
use lirical_test_utils::*;

fn engine_with(catalog: DiseaseCatalog, background: BackgroundFrequencyModel, config: ScoringConfig) -> LiricalEngine {
    let catalog = Arc::new(catalog);
    let pretest = UniformPretestProbability::new(catalog.ids().cloned()).unwrap();
    LiricalEngine::new(catalog, Arc::new(toy_ontology()), Arc::new(background), Arc::new(pretest), config).unwrap()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn engine() -> LiricalEngine {
    engine_with(toy_catalog(), BackgroundFrequencyModel::empty(0.1), ScoringConfig::default())
}

#[test]
fn test_background_bin_accumulates_percentages() {
    let mut bin = Bin::new();
    for pct in [0.01, 0.02, 0.03] {
        bin.add(pct);
    }
    assert!((bin.frequency() - 0.0006).abs() < 1e-4);
    assert_eq!(bin.count(), 3);
}

#[test]
fn test_poisson_reference_probabilities() {
    for (lambda, k, expected) in [(2.2, 3.0, 0.1966387), (3.2, 3.0, 0.222616), (0.0001, 1.0, 9.999e-05)] {
        let p = PoissonDistribution::new(lambda).unwrap().probability(k).unwrap();
        assert!((p - expected).abs() < 1e-5, "λ={lambda} k={k}: {p}");
    }
}

#[test]
fn test_unknown_gene_symbol_has_no_bin() {
    let table = "symbol\tgeneID\tfreqsum-benign\tcount-benign\tfreqsum-path\tcount-path\n\
                 FBN1\t2200\t0.31\t200\t0.0012\t9\n";
    let model = BackgroundFrequencyModel::from_reader(table.as_bytes(), 0.1).unwrap();
    assert!(model.frequency_bin_by_symbol("FBN1").is_some());
    assert!(model.frequency_bin_by_symbol("NOT_A_GENE").is_none());
}

#[test]
fn test_single_informative_disease_moves_alone() {
    let catalog = toy_catalog();
    let n = catalog.len() as f64;
    let mut results: Vec<DiseaseResult> = catalog
        .iter()
        .map(|d| {
            let component = if d.id == term(DRAVET) {
                LikelihoodRatioComponent::try_new(LikelihoodRatioKind::Phenotype, d.id.clone(), 10.0, "LR 10", ComponentDetail::None)
                    .unwrap()
            } else {
                LikelihoodRatioComponent::neutral(LikelihoodRatioKind::Phenotype, d.id.clone(), "neutral")
            };
            DiseaseResult::new(d.id.clone(), d.name.clone(), 1.0 / n, vec![component])
        })
        .collect();
    rank(&mut results);

    assert_eq!(results[0].disease_id, term(DRAVET));
    assert!(results[0].posttest_probability > 1.0 / n);
    for r in &results[1..] {
        assert_eq!(r.posttest_probability, 1.0 / n);
    }
    let rest: Vec<_> = results[1..].iter().map(|r| r.disease_id.clone()).collect();
    let mut sorted = rest.clone();
    sorted.sort();
    assert_eq!(rest, sorted);
}

#[test]
fn test_marfan_case_with_fbn1_variant() {
    init_tracing();
    let calls = vec![variant(fbn1(), 48_700_000, Zygosity::Heterozygous, 0.97)];
    let proband = marfan_proband()
        .with_age(Age::years(12.0))
        .with_genotypes(aggregate(&calls, 0.8).unwrap());

    let results = engine().analyze(&proband).unwrap();
    assert!(results.complete);
    assert_eq!(results.rank_of(&term(MARFAN)), Some(1));

    let marfan = results.get(&term(MARFAN)).unwrap();
    assert_eq!(marfan.components.len(), 3);
    let genotype = marfan.component(LikelihoodRatioKind::Genotype).unwrap();
    assert!(genotype.ratio() > 1.0);
    assert!(marfan.posttest_probability > marfan.pretest_probability);
}

#[test]
fn test_recessive_case_ranks_leigh_first() {
    let calls = vec![variant(surf1(), 136_218_000, Zygosity::Homozygous, 0.95)];
    let proband = Proband::new("leigh-case")
        .observe(DEVELOPMENTAL_DELAY)
        .observe(HYPOTONIA)
        .negate(ECTOPIA_LENTIS)
        .with_genotypes(aggregate(&calls, 0.8).unwrap());

    let results = engine().analyze(&proband).unwrap();
    assert_eq!(results.top(1)[0].disease_id, term(LEIGH));

    // no variants in SCN1A: genotype evidence stays neutral without the penalty
    let dravet = results.get(&term(DRAVET)).unwrap();
    assert!(dravet.component(LikelihoodRatioKind::Genotype).unwrap().is_neutral());
}

#[test]
fn test_penalty_for_missing_variants() {
    let calls = vec![variant(surf1(), 136_218_000, Zygosity::Homozygous, 0.95)];
    let proband = Proband::new("leigh-case")
        .observe(DEVELOPMENTAL_DELAY)
        .with_genotypes(aggregate(&calls, 0.8).unwrap());
    let config = ScoringConfig { penalize_missing_variants: true, ..Default::default() };

    let results = engine_with(toy_catalog(), BackgroundFrequencyModel::empty(0.1), config).analyze(&proband).unwrap();
    let dravet = results.get(&term(DRAVET)).unwrap().component(LikelihoodRatioKind::Genotype).unwrap();
    assert!((dravet.ratio() - 0.05).abs() < 1e-12);
}

#[test]
fn test_clinvar_pathogenic_allele_dominates() {
    let calls = vec![clinvar_variant(fbn1(), 48_700_000, Zygosity::Heterozygous, ClinVarSignificance::Pathogenic)];
    let proband = Proband::new("clinvar-case")
        .observe(ECTOPIA_LENTIS)
        .with_genotypes(aggregate(&calls, 0.8).unwrap());

    let results = engine().analyze(&proband).unwrap();
    let marfan = results.get(&term(MARFAN)).unwrap();
    let genotype = marfan.component(LikelihoodRatioKind::Genotype).unwrap();
    assert!((genotype.ratio() - 1000.0).abs() < 1e-6);
    assert!(matches!(
        genotype.detail,
        ComponentDetail::Genotype { match_type: GenotypeMatchType::OnePathogenicClinVarAlleleInAd, .. }
    ));
}

#[test]
fn test_background_table_feeds_engine() {
    let table = "symbol\tgeneID\tfreqsum-benign\tcount-benign\tfreqsum-path\tcount-path\n\
                 FBN1\t2200\t0.31\t200\t0.9\t40\n";
    let noisy = BackgroundFrequencyModel::from_reader(table.as_bytes(), 0.1).unwrap();
    let calls = vec![variant(fbn1(), 48_700_000, Zygosity::Heterozygous, 0.97)];
    let proband = marfan_proband().with_genotypes(aggregate(&calls, 0.8).unwrap());

    let quiet = engine().analyze(&proband).unwrap();
    let noisy = engine_with(toy_catalog(), noisy, ScoringConfig::default()).analyze(&proband).unwrap();

    let quiet_gt = quiet.get(&term(MARFAN)).unwrap().component(LikelihoodRatioKind::Genotype).unwrap().ratio();
    let noisy_gt = noisy.get(&term(MARFAN)).unwrap().component(LikelihoodRatioKind::Genotype).unwrap().ratio();
    // a gene that often carries pathogenic alleles in the population is weaker evidence
    assert!(noisy_gt < quiet_gt);
}

#[test]
fn test_fatal_inputs() {
    let bad = Proband::new("bad").observe(SCOLIOSIS).negate(SCOLIOSIS);
    assert!(matches!(engine().analyze(&bad), Err(LiricalError::InconsistentPhenotype(_))));

    let catalog = Arc::new(toy_catalog());
    let result = UniformPretestProbability::new(Vec::new());
    assert!(matches!(result, Err(LiricalError::EmptyPretest)));

    let empty = LiricalEngine::new(
        Arc::new(DiseaseCatalog::default()),
        Arc::new(toy_ontology()),
        Arc::new(BackgroundFrequencyModel::empty(0.1)),
        Arc::new(UniformPretestProbability::new(catalog.ids().cloned()).unwrap()),
        ScoringConfig::default(),
    );
    assert!(matches!(empty, Err(LiricalError::EmptyCatalog)));
}

#[test]
fn test_timeout_marks_ranking_incomplete() {
    init_tracing();
    let config = ScoringConfig { timeout_ms: Some(0), ..Default::default() };
    let results = engine_with(toy_catalog(), BackgroundFrequencyModel::empty(0.1), config)
        .analyze(&marfan_proband())
        .unwrap();
    assert!(!results.complete);
    assert!(results.warnings.iter().any(|w| w.contains("timed out")));
}

#[test]
fn test_proband_without_evidence_warns() {
    let results = engine().analyze(&Proband::new("empty")).unwrap();
    assert!(!results.warnings.is_empty());
    for r in &results.results {
        assert_eq!(r.posttest_probability, r.pretest_probability);
    }
}

#[test]
fn test_ranking_identical_across_worker_counts() {
    let proband = marfan_proband().negate(SEIZURE).with_age(Age::years(25.0));
    let run = |threads| {
        let config = ScoringConfig { worker_threads: threads, ..Default::default() };
        engine_with(toy_catalog(), BackgroundFrequencyModel::empty(0.1), config)
            .analyze(&proband)
            .unwrap()
            .results
    };
    let single = run(1);
    for threads in [2, 4, 8] {
        assert_eq!(run(threads), single);
    }
}

#[test]
fn test_results_serialize_to_json() {
    let results = engine().analyze(&marfan_proband()).unwrap();
    let json = serde_json::to_value(&results).unwrap();
    assert_eq!(json["results"][0]["disease_id"], MARFAN);
    assert_eq!(json["complete"], true);
}
