//! Analysis orchestrator.
//!
//! A run moves through Loaded → Scoring → Ranked → Reported (or Failed).
//! Diseases are scored independently on a rayon pool against shared read-only
//! inputs, then sorted by posttest probability with the disease id as tie-break,
//! so the ranking does not depend on worker scheduling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use lirical_common::entities::{Disease, DiseaseCatalog, TermId};
use lirical_common::error::{LiricalError, Result};
use lirical_common::evidence::{AnalysisMetadata, AnalysisResults, DiseaseResult, LikelihoodRatioComponent, LikelihoodRatioKind};
use lirical_common::ontology::PhenotypeOntology;
use lirical_common::proband::Proband;
use lirical_common::scoring_config::ScoringConfig;
use lirical_common::variant::GenotypeSummary;

use crate::background::BackgroundFrequencyModel;
use crate::genotype_lr::GenotypeLikelihoodRatio;
use crate::onset::{DiseaseOnsetLikelihoodRatio, DiseaseOnsetProbability, IntervalOnsetProbability};
use crate::phenotype_lr::PhenotypeLikelihoodRatio;
use crate::pretest::PretestProbabilityProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisState {
    Loaded,
    Scoring,
    Ranked,
    Reported,
    Failed,
}

/// Presentation collaborator receiving the final ranking.
pub trait AnalysisReporter {
    fn report(&self, results: &AnalysisResults) -> anyhow::Result<()>;
}

pub struct LiricalEngine {
    catalog: Arc<DiseaseCatalog>,
    pretest: Arc<dyn PretestProbabilityProvider>,
    phenotype: PhenotypeLikelihoodRatio,
    genotype: GenotypeLikelihoodRatio,
    onset: DiseaseOnsetLikelihoodRatio,
    config: ScoringConfig,
    pool: rayon::ThreadPool,
}

impl LiricalEngine {
    /// Fails fast on missing mandatory inputs.
    pub fn new(
        catalog: Arc<DiseaseCatalog>,
        ontology: Arc<dyn PhenotypeOntology>,
        background: Arc<BackgroundFrequencyModel>,
        pretest: Arc<dyn PretestProbabilityProvider>,
        config: ScoringConfig,
    ) -> Result<Self> {
        if catalog.is_empty() {
            return Err(LiricalError::EmptyCatalog);
        }
        if pretest.is_empty() {
            return Err(LiricalError::EmptyPretest);
        }
        config.validate()?;

        let threads = if config.worker_threads > 0 {
            config.worker_threads
        } else {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("lirical-worker-{i}"))
            .build()
            .map_err(|e| LiricalError::Config(format!("cannot build worker pool: {e}")))?;

        let phenotype = PhenotypeLikelihoodRatio::new(ontology, &catalog);
        let genotype = GenotypeLikelihoodRatio::new(background, config.clone())?;
        let onset = DiseaseOnsetLikelihoodRatio::new(Arc::new(IntervalOnsetProbability::new(&catalog, config.onset_strict)));

        info!(diseases = catalog.len(), pretest = pretest.len(), threads, "Engine loaded");
        Ok(Self { catalog, pretest, phenotype, genotype, onset, config, pool })
    }

    /// Replaces the interval-based onset model.
    pub fn with_onset_probability(mut self, probability: Arc<dyn DiseaseOnsetProbability>) -> Self {
        self.onset = DiseaseOnsetLikelihoodRatio::new(probability);
        self
    }

    pub fn catalog(&self) -> &DiseaseCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Scores and ranks every eligible disease for `proband`.
    pub fn analyze(&self, proband: &Proband) -> Result<AnalysisResults> {
        let started = Instant::now();
        debug!(state = ?AnalysisState::Loaded, sample = %proband.sample_id);
        proband.validate()?;

        let mut warnings = Vec::new();
        if proband.observed.is_empty() && !proband.has_genotype_evidence() {
            warn!(sample = %proband.sample_id, "No observed phenotypes and no genotype evidence");
            warnings.push("no observed phenotype terms and no genotype evidence".to_string());
        }

        let genotypes: HashMap<TermId, GenotypeSummary> = proband
            .genotypes
            .iter()
            .map(|g| (g.gene.id.clone(), g.clone()))
            .collect();
        let candidates = self.candidates(proband, &genotypes)?;
        let skipped = self.catalog.len() - candidates.len();

        debug!(state = ?AnalysisState::Scoring, candidates = candidates.len());
        let deadline = self.config.timeout_ms.map(|ms| started + Duration::from_millis(ms));
        let timed_out = AtomicBool::new(false);

        let scored: Vec<(DiseaseResult, Vec<String>)> = self.pool.install(|| {
            candidates
                .par_iter()
                .filter_map(|(disease, pretest)| {
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        timed_out.store(true, Ordering::Relaxed);
                        return None;
                    }
                    Some(self.score(disease, *pretest, proband, &genotypes))
                })
                .collect()
        });

        let mut results = Vec::with_capacity(scored.len());
        for (result, w) in scored {
            warnings.extend(w);
            results.push(result);
        }
        rank(&mut results);

        let complete = !timed_out.load(Ordering::Relaxed);
        if !complete {
            warn!(
                evaluated = results.len(),
                candidates = candidates.len(),
                "Analysis timed out; ranking is partial"
            );
            warnings.push(format!("timed out after evaluating {} of {} diseases", results.len(), candidates.len()));
        }

        let mut metadata = AnalysisMetadata::new(Some(proband.sample_id.clone()));
        metadata.diseases_evaluated = results.len();
        metadata.diseases_skipped = skipped;
        metadata.genes_with_variants = proband.genotypes.iter().filter(|g| g.has_variants()).count();
        metadata.elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            state = ?AnalysisState::Ranked,
            evaluated = metadata.diseases_evaluated,
            skipped,
            elapsed_ms = metadata.elapsed_ms,
            "Ranking complete"
        );
        Ok(AnalysisResults { results, complete, warnings, metadata })
    }

    /// Runs the analysis and hands the ranking to `reporter`.
    pub fn analyze_and_report(&self, proband: &Proband, reporter: &dyn AnalysisReporter) -> anyhow::Result<AnalysisState> {
        let results = match self.analyze(proband) {
            Ok(r) => r,
            Err(e) => {
                warn!(state = ?AnalysisState::Failed, "Analysis failed: {e}");
                return Err(e.into());
            }
        };
        reporter.report(&results)?;
        debug!(state = ?AnalysisState::Reported);
        Ok(AnalysisState::Reported)
    }

    /// Diseases with a pretest probability that survive the candidate filters.
    fn candidates<'a>(
        &'a self,
        proband: &Proband,
        genotypes: &HashMap<TermId, GenotypeSummary>,
    ) -> Result<Vec<(&'a Disease, f64)>> {
        let with_pretest: Vec<(&Disease, f64)> = self
            .catalog
            .iter()
            .filter_map(|d| match self.pretest.pretest_probability(&d.id) {
                Some(p) => Some((d, p)),
                None => {
                    debug!(disease = %d.id, "No pretest probability; excluded from ranking");
                    None
                }
            })
            .collect();
        if with_pretest.is_empty() {
            return Err(LiricalError::EmptyPretest);
        }

        if !proband.has_genotype_evidence() {
            return Ok(with_pretest);
        }
        Ok(with_pretest
            .into_iter()
            .filter(|(d, _)| {
                // Gene-less diseases have no deleterious variant either.
                if self.config.disregard_diseases_without_deleterious_variants {
                    return d
                        .genes
                        .iter()
                        .any(|g| genotypes.get(&g.id).is_some_and(GenotypeSummary::has_deleterious_variants));
                }
                !d.genes.is_empty() || self.config.use_global
            })
            .collect())
    }

    fn score(
        &self,
        disease: &Disease,
        pretest: f64,
        proband: &Proband,
        genotypes: &HashMap<TermId, GenotypeSummary>,
    ) -> (DiseaseResult, Vec<String>) {
        let mut warnings = Vec::new();
        let mut components = Vec::with_capacity(3);

        let phenotype = self
            .phenotype
            .ratio(disease, &proband.observed, &proband.negated)
            .unwrap_or_else(|e| fallback(disease, LikelihoodRatioKind::Phenotype, e, &mut warnings));
        components.push(phenotype);

        if proband.has_genotype_evidence() {
            if let Some(evaluation) = self.genotype.ratio(disease, genotypes) {
                warnings.extend(evaluation.warnings);
                components.push(evaluation.component);
            }
        }

        match self.onset.ratio(disease, proband.age.as_ref()) {
            Ok(Some(c)) => components.push(c),
            Ok(None) => {}
            Err(e) => components.push(fallback(disease, LikelihoodRatioKind::Onset, e, &mut warnings)),
        }

        (DiseaseResult::new(disease.id.clone(), disease.name.clone(), pretest, components), warnings)
    }
}

fn fallback(disease: &Disease, kind: LikelihoodRatioKind, err: LiricalError, warnings: &mut Vec<String>) -> LikelihoodRatioComponent {
    warn!(disease = %disease.id, ?kind, "Falling back to neutral likelihood ratio: {err}");
    warnings.push(format!("{} {kind:?}: {err}", disease.id));
    LikelihoodRatioComponent::neutral(kind, disease.id.clone(), format!("neutral after error: {err}"))
}

/// Posttest probability descending, then disease id ascending.
pub fn rank(results: &mut [DiseaseResult]) {
    results.sort_by(|a, b| {
        b.posttest_probability
            .total_cmp(&a.posttest_probability)
            .then_with(|| a.disease_id.cmp(&b.disease_id))
    });
}
