//! Analysis input bundle: the already-parsed catalog, ontology slice, proband and calls.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use lirical_common::entities::{Disease, DiseaseCatalog, TermId};
use lirical_common::ontology::{InMemoryOntology, PHENOTYPIC_ABNORMALITY};
use lirical_common::proband::Proband;
use lirical_common::temporal::Age;
use lirical_common::variant::VariantCall;
use lirical_ranker::aggregator::aggregate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OntologySlice {
    #[serde(default = "default_root")]
    pub root: String,
    /// `[child, parent]` pairs.
    pub edges: Vec<(String, String)>,
    /// `[alternate, primary]` pairs.
    #[serde(default)]
    pub alternate_ids: Vec<(String, String)>,
}

fn default_root() -> String { PHENOTYPIC_ABNORMALITY.to_string() }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisBundle {
    pub diseases: Vec<Disease>,
    pub ontology: OntologySlice,
    pub proband: Proband,
    /// ISO 8601 duration; overrides `proband.age`.
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub variants: Vec<VariantCall>,
    /// Background table; overrides the configured path.
    #[serde(default)]
    pub background: Option<PathBuf>,
    /// Explicit priors replacing the uniform pretest distribution.
    #[serde(default)]
    pub pretest: Option<HashMap<TermId, f64>>,
}

impl AnalysisBundle {
    /// Reads YAML for `.yaml`/`.yml` files, JSON otherwise.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read bundle {}", path.display()))?;
        let is_yaml = matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml"));
        let bundle: AnalysisBundle = if is_yaml {
            serde_yaml::from_str(&content).with_context(|| format!("invalid YAML bundle {}", path.display()))?
        } else {
            serde_json::from_str(&content).with_context(|| format!("invalid JSON bundle {}", path.display()))?
        };
        info!(
            diseases = bundle.diseases.len(),
            edges = bundle.ontology.edges.len(),
            variants = bundle.variants.len(),
            "Loaded analysis bundle"
        );
        Ok(bundle)
    }

    pub fn catalog(&self) -> anyhow::Result<DiseaseCatalog> {
        Ok(DiseaseCatalog::non_empty(self.diseases.iter().cloned())?)
    }

    pub fn ontology(&self) -> InMemoryOntology {
        let mut ontology = InMemoryOntology::from_edges(
            &self.ontology.root,
            self.ontology.edges.iter().map(|(c, p)| (c.as_str(), p.as_str())),
        );
        for (alternate, primary) in &self.ontology.alternate_ids {
            ontology.add_alternate_id(TermId::new(alternate.as_str()), TermId::new(primary.as_str()));
        }
        ontology
    }

    /// The proband with its age override applied and variant calls aggregated per gene.
    pub fn proband(&self, pathogenicity_threshold: f64) -> anyhow::Result<Proband> {
        let mut proband = self.proband.clone();
        if let Some(age) = &self.age {
            proband.age = Some(age.parse::<Age>()?);
        }
        if !self.variants.is_empty() {
            proband.genotypes = aggregate(&self.variants, pathogenicity_threshold)?;
        }
        Ok(proband)
    }
}
