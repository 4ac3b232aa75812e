//! Population background model of per-gene variant burden.
//!
//! Each gene keeps two bins, benign and pathogenic, split at a pathogenicity of
//! 0.80. The summed frequency of the pathogenic bin is the background λ used by
//! the genotype likelihood ratio.

use std::collections::HashMap;
use std::io::Read;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use lirical_common::entities::{GeneIdentifier, TermId};
use lirical_common::error::{LiricalError, Result};

/// Variants at or above this pathogenicity land in the pathogenic bin.
pub const PATHOGENIC_BIN_THRESHOLD: f64 = 0.80;

/// Pseudo-count, as a percentage, every bin starts from.
const PSEUDO_PERCENTAGE: f64 = 100.0 * 1e-5;

// ── Bin ──────────────────────────────────────────────────────────────────────

/// Accumulates population frequencies given as percentages (0–100).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    sum_of_percentages: f64,
    count: u32,
}

impl Default for Bin {
    fn default() -> Self {
        Self::new()
    }
}

impl Bin {
    pub fn new() -> Self {
        Self { sum_of_percentages: PSEUDO_PERCENTAGE, count: 0 }
    }

    /// Bin restored from precomputed totals; `frequency` is a probability.
    pub fn from_totals(frequency: f64, count: u32) -> Self {
        Self { sum_of_percentages: frequency * 100.0, count }
    }

    pub fn add(&mut self, percentage: f64) {
        self.sum_of_percentages += percentage;
        self.count += 1;
    }

    /// Summed frequency as a probability.
    pub fn frequency(&self) -> f64 {
        self.sum_of_percentages / 100.0
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneBins {
    pub gene: GeneIdentifier,
    pub benign: Bin,
    pub pathogenic: Bin,
}

impl GeneBins {
    pub fn new(gene: GeneIdentifier) -> Self {
        Self { gene, benign: Bin::new(), pathogenic: Bin::new() }
    }

    pub fn add(&mut self, percentage: f64, pathogenicity: f64) {
        if pathogenicity >= PATHOGENIC_BIN_THRESHOLD {
            self.pathogenic.add(percentage);
        } else {
            self.benign.add(percentage);
        }
    }

    /// Expected number of pathogenic-bin alleles in a population individual.
    pub fn lambda(&self) -> f64 {
        self.pathogenic.frequency()
    }
}

// ── Model ────────────────────────────────────────────────────────────────────

/// Per-variant population observation used to build the model in memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundObservation {
    pub gene: GeneIdentifier,
    /// Allele frequency as a percentage.
    pub frequency_percent: f64,
    pub pathogenicity: f64,
}

/// Read-only after construction; shared across scoring workers.
#[derive(Debug, Clone)]
pub struct BackgroundFrequencyModel {
    genes: HashMap<TermId, GeneBins>,
    by_symbol: HashMap<String, TermId>,
    default_lambda: f64,
}

impl BackgroundFrequencyModel {
    pub fn empty(default_lambda: f64) -> Self {
        Self { genes: HashMap::new(), by_symbol: HashMap::new(), default_lambda }
    }

    pub fn from_observations(
        observations: impl IntoIterator<Item = BackgroundObservation>,
        default_lambda: f64,
    ) -> Result<Self> {
        let mut model = Self::empty(default_lambda);
        for obs in observations {
            if !(0.0..=1.0).contains(&obs.pathogenicity) {
                return Err(LiricalError::PathogenicityOutOfRange(obs.pathogenicity));
            }
            if !obs.frequency_percent.is_finite() || obs.frequency_percent < 0.0 {
                warn!(gene = %obs.gene, "Skipping background observation with frequency {}", obs.frequency_percent);
                continue;
            }
            model.entry(&obs.gene).add(obs.frequency_percent, obs.pathogenicity);
        }
        info!("Built background frequencies for {} genes", model.genes.len());
        Ok(model)
    }

    /// Reads the tab-separated table
    /// `symbol  geneID  freqsum-benign  count-benign  freqsum-path  count-path`.
    ///
    /// Rows without a gene id or with unparseable numbers are skipped.
    pub fn from_reader<R: Read>(reader: R, default_lambda: f64) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers()?;
        if headers.get(0) != Some("symbol") || headers.len() < 6 {
            return Err(LiricalError::BackgroundTable {
                line: 1,
                reason: format!("unexpected header: {}", headers.iter().collect::<Vec<_>>().join(" ")),
            });
        }

        let mut model = Self::empty(default_lambda);
        for (i, record) in rdr.records().enumerate() {
            let record = record?;
            let line = i + 2;
            if record.len() < 6 {
                warn!(line, "Malformed background line with {} instead of 6 fields", record.len());
                continue;
            }
            let gene_number = record[1].trim();
            if gene_number.is_empty() {
                continue;
            }
            let parsed = (
                record[2].trim().parse::<f64>(),
                record[3].trim().parse::<u32>(),
                record[4].trim().parse::<f64>(),
                record[5].trim().parse::<u32>(),
            );
            let (Ok(benign_freq), Ok(benign_count), Ok(path_freq), Ok(path_count)) = parsed else {
                warn!(line, "Skipping background line with non-numeric values");
                continue;
            };
            model.insert(GeneBins {
                gene: GeneIdentifier::new(TermId::of("NCBIGene", gene_number), record[0].trim()),
                benign: Bin::from_totals(benign_freq, benign_count),
                pathogenic: Bin::from_totals(path_freq, path_count),
            });
        }
        info!("Loaded background frequencies for {} genes", model.genes.len());
        Ok(model)
    }

    /// Adds or replaces a gene's bins.
    pub fn insert(&mut self, bins: GeneBins) {
        self.by_symbol.insert(bins.gene.symbol.clone(), bins.gene.id.clone());
        self.genes.insert(bins.gene.id.clone(), bins);
    }

    fn entry(&mut self, gene: &GeneIdentifier) -> &mut GeneBins {
        self.by_symbol.entry(gene.symbol.clone()).or_insert_with(|| gene.id.clone());
        self.genes.entry(gene.id.clone()).or_insert_with(|| GeneBins::new(gene.clone()))
    }

    /// Bins for a gene; `None` means no background evidence.
    pub fn frequency_bin(&self, gene_id: &TermId) -> Option<&GeneBins> {
        self.genes.get(gene_id)
    }

    pub fn frequency_bin_by_symbol(&self, symbol: &str) -> Option<&GeneBins> {
        self.by_symbol.get(symbol).and_then(|id| self.genes.get(id))
    }

    /// Background λ if the gene is known.
    pub fn frequency_for_gene(&self, gene_id: &TermId) -> Option<f64> {
        self.frequency_bin(gene_id).map(GeneBins::lambda)
    }

    /// Background λ, falling back to the default for unknown genes.
    pub fn expected_rate(&self, gene_id: &TermId) -> f64 {
        self.frequency_for_gene(gene_id).unwrap_or_else(|| {
            debug!(gene = %gene_id, "No background frequency; using default λ {}", self.default_lambda);
            self.default_lambda
        })
    }

    pub fn default_lambda(&self) -> f64 {
        self.default_lambda
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}
