/// Core entity types shared by the likelihood-ratio engine.
/// Diseases and catalogs are load-once, read-only values.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LiricalError, Result};
use crate::temporal::TemporalInterval;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// A CURIE-style identifier, e.g. `HP:0001250`, `OMIM:256000`, `NCBIGene:2200`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermId(String);

impl TermId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn of(prefix: &str, id: &str) -> Self {
        Self(format!("{prefix}:{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Database prefix, e.g. `OMIM` for `OMIM:256000`.
    pub fn prefix(&self) -> &str {
        self.0.split_once(':').map(|(p, _)| p).unwrap_or("")
    }

    /// Local part, e.g. `256000` for `OMIM:256000`.
    pub fn id(&self) -> &str {
        self.0.split_once(':').map(|(_, id)| id).unwrap_or(&self.0)
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TermId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TermId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeneIdentifier {
    /// e.g. NCBIGene:2200
    pub id: TermId,
    /// e.g. FBN1
    pub symbol: String,
}

impl GeneIdentifier {
    pub fn new(id: impl Into<TermId>, symbol: impl Into<String>) -> Self {
        Self { id: id.into(), symbol: symbol.into() }
    }
}

impl fmt::Display for GeneIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.id)
    }
}

// ---------------------------------------------------------------------------
// Disease
// ---------------------------------------------------------------------------

/// Smallest frequency a phenotype annotation may carry. Keeps per-term ratios positive.
pub const MIN_TERM_FREQUENCY: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhenotypeAnnotation {
    pub term: TermId,
    /// Fraction of patients with the disease showing the feature. `None` means unknown.
    #[serde(default)]
    pub frequency: Option<f64>,
}

impl PhenotypeAnnotation {
    pub fn new(term: impl Into<TermId>, frequency: Option<f64>) -> Self {
        Self { term: term.into(), frequency }
    }

    /// Frequency in the disease; unknown frequencies count as obligate (1.0).
    pub fn frequency(&self) -> f64 {
        self.frequency.unwrap_or(1.0).clamp(MIN_TERM_FREQUENCY, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeOfInheritance {
    AutosomalDominant,
    AutosomalRecessive,
    XLinkedDominant,
    XLinkedRecessive,
    Mitochondrial,
    Unknown,
}

impl ModeOfInheritance {
    /// Expected number of pathogenic alleles in an affected individual.
    pub fn expected_pathogenic_alleles(&self) -> f64 {
        match self {
            ModeOfInheritance::AutosomalRecessive | ModeOfInheritance::XLinkedRecessive => 2.0,
            _ => 1.0,
        }
    }

    pub fn is_recessive(&self) -> bool {
        matches!(self, ModeOfInheritance::AutosomalRecessive | ModeOfInheritance::XLinkedRecessive)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModeOfInheritance::AutosomalDominant => "autosomal dominant",
            ModeOfInheritance::AutosomalRecessive => "autosomal recessive",
            ModeOfInheritance::XLinkedDominant => "X-chromosomal dominant",
            ModeOfInheritance::XLinkedRecessive => "X-chromosomal recessive",
            ModeOfInheritance::Mitochondrial => "mitochondrial",
            ModeOfInheritance::Unknown => "not available",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disease {
    pub id: TermId,
    pub name: String,
    #[serde(default)]
    pub phenotypes: Vec<PhenotypeAnnotation>,
    /// Features explicitly excluded in the disease definition.
    #[serde(default)]
    pub excluded_phenotypes: Vec<TermId>,
    #[serde(default)]
    pub genes: Vec<GeneIdentifier>,
    #[serde(default)]
    pub modes_of_inheritance: Vec<ModeOfInheritance>,
    /// Onset age distribution; `None` when unknown.
    #[serde(default)]
    pub onset: Option<TemporalInterval>,
}

impl Disease {
    pub fn new(id: impl Into<TermId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            phenotypes: vec![],
            excluded_phenotypes: vec![],
            genes: vec![],
            modes_of_inheritance: vec![],
            onset: None,
        }
    }

    pub fn with_phenotype(mut self, term: &str, frequency: Option<f64>) -> Self {
        self.phenotypes.push(PhenotypeAnnotation::new(term, frequency));
        self
    }

    pub fn with_excluded(mut self, term: &str) -> Self {
        self.excluded_phenotypes.push(TermId::from(term));
        self
    }

    pub fn with_gene(mut self, gene: GeneIdentifier) -> Self {
        self.genes.push(gene);
        self
    }

    pub fn with_inheritance(mut self, mode: ModeOfInheritance) -> Self {
        self.modes_of_inheritance.push(mode);
        self
    }

    pub fn with_onset(mut self, onset: TemporalInterval) -> Self {
        self.onset = Some(onset);
        self
    }

    pub fn annotation(&self, term: &TermId) -> Option<&PhenotypeAnnotation> {
        self.phenotypes.iter().find(|a| &a.term == term)
    }

    pub fn is_directly_annotated_to(&self, term: &TermId) -> bool {
        self.annotation(term).is_some()
    }

    /// True when the disease carries no phenotype information at all.
    pub fn has_empty_profile(&self) -> bool {
        self.phenotypes.is_empty() && self.excluded_phenotypes.is_empty()
    }

    pub fn is_associated_with_gene(&self, gene_id: &TermId) -> bool {
        self.genes.iter().any(|g| &g.id == gene_id)
    }
}

// ---------------------------------------------------------------------------
// Disease catalog
// ---------------------------------------------------------------------------

/// Read-only collection of diseases with a gene → disease index.
#[derive(Debug, Clone, Default)]
pub struct DiseaseCatalog {
    diseases: BTreeMap<TermId, Disease>,
    gene_to_diseases: HashMap<TermId, Vec<TermId>>,
}

impl DiseaseCatalog {
    pub fn new(diseases: impl IntoIterator<Item = Disease>) -> Self {
        let mut catalog = Self::default();
        for disease in diseases {
            for gene in &disease.genes {
                catalog
                    .gene_to_diseases
                    .entry(gene.id.clone())
                    .or_default()
                    .push(disease.id.clone());
            }
            catalog.diseases.insert(disease.id.clone(), disease);
        }
        catalog
    }

    /// Like [`DiseaseCatalog::new`] but rejects an empty input.
    pub fn non_empty(diseases: impl IntoIterator<Item = Disease>) -> Result<Self> {
        let catalog = Self::new(diseases);
        if catalog.is_empty() {
            return Err(LiricalError::EmptyCatalog);
        }
        Ok(catalog)
    }

    pub fn get(&self, id: &TermId) -> Option<&Disease> {
        self.diseases.get(id)
    }

    /// Diseases in ascending identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Disease> {
        self.diseases.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &TermId> {
        self.diseases.keys()
    }

    pub fn len(&self) -> usize {
        self.diseases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diseases.is_empty()
    }

    pub fn diseases_for_gene(&self, gene_id: &TermId) -> &[TermId] {
        self.gene_to_diseases.get(gene_id).map(Vec::as_slice).unwrap_or(&[])
    }
}
