//! LIRICAL — Likelihood-ratio interpretation of clinical abnormalities.
//! Entry point for the `lirical` binary.

mod bundle;
mod config;
mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lirical_common::entities::DiseaseCatalog;
use lirical_ranker::background::BackgroundFrequencyModel;
use lirical_ranker::engine::LiricalEngine;
use lirical_ranker::pretest::{ExplicitPretestProbability, PretestProbabilityProvider, UniformPretestProbability};

use bundle::AnalysisBundle;
use report::{Format, StdoutReporter};

fn load_background(path: Option<&Path>, default_lambda: f64) -> anyhow::Result<BackgroundFrequencyModel> {
    let Some(path) = path else {
        tracing::warn!("No background table configured; every gene uses the default λ {default_lambda}");
        return Ok(BackgroundFrequencyModel::empty(default_lambda));
    };
    let file = std::fs::File::open(path)
        .with_context(|| format!("cannot open background table {}", path.display()))?;
    Ok(BackgroundFrequencyModel::from_reader(file, default_lambda)?)
}

fn build_pretest(
    bundle: &AnalysisBundle,
    catalog: &DiseaseCatalog,
    config: &config::Config,
) -> anyhow::Result<Arc<dyn PretestProbabilityProvider>> {
    if let Some(priors) = &bundle.pretest {
        info!("Using {} explicit pretest probabilities", priors.len());
        return Ok(Arc::new(ExplicitPretestProbability::new(priors.clone())?));
    }
    let databases: Vec<&str> = config.pretest.databases.iter().map(String::as_str).collect();
    Ok(Arc::new(UniformPretestProbability::for_databases(catalog, &databases)?))
}

fn main() -> anyhow::Result<()> {
    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lirical=debug,info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("LIRICAL {}", env!("CARGO_PKG_VERSION"));

    let Some(bundle_path) = std::env::args().nth(1).map(PathBuf::from) else {
        anyhow::bail!("usage: lirical <analysis-bundle.json|yaml>");
    };

    // Load configuration
    let config = config::Config::load_or_default()?;

    let bundle = AnalysisBundle::load(&bundle_path)?;
    let catalog = Arc::new(bundle.catalog()?);
    let proband = bundle.proband(config.scoring.pathogenicity_threshold)?;

    let background_path = bundle
        .background
        .clone()
        .or_else(|| config.background.path.as_ref().map(PathBuf::from));
    let background = load_background(background_path.as_deref(), config.scoring.default_background_lambda)?;
    let pretest = build_pretest(&bundle, &catalog, &config)?;

    let engine = LiricalEngine::new(
        catalog,
        Arc::new(bundle.ontology()),
        Arc::new(background),
        pretest,
        config.scoring.clone(),
    )?;

    let reporter = StdoutReporter::new(Format::from_name(&config.output.format), config.output.top);
    engine.analyze_and_report(&proband, &reporter)?;
    Ok(())
}
