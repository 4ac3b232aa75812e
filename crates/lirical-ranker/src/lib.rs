//! lirical-ranker — Likelihood-ratio scoring and ranking of Mendelian diseases.

pub mod poisson;
pub mod background;
pub mod aggregator;
pub mod phenotype_lr;
pub mod genotype_lr;
pub mod onset;
pub mod pretest;
pub mod engine;

pub use aggregator::{aggregate, GenotypeAggregator, PathogenicityThreshold, VariantAdmissibility};
pub use background::{BackgroundFrequencyModel, BackgroundObservation, Bin, GeneBins};
pub use engine::{rank, AnalysisReporter, AnalysisState, LiricalEngine};
pub use genotype_lr::{GenotypeEvaluation, GenotypeLikelihoodRatio};
pub use onset::{DiseaseOnsetLikelihoodRatio, DiseaseOnsetProbability, IntervalOnsetProbability, UninformativeOnsetProbability};
pub use phenotype_lr::{InducedDiseaseGraph, PhenotypeLikelihoodRatio};
pub use poisson::PoissonDistribution;
pub use pretest::{ExplicitPretestProbability, PretestProbabilityProvider, UniformPretestProbability};
