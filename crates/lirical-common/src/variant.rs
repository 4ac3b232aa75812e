/// Annotated variant calls and the per-gene genotype summary they fold into.

use serde::{Deserialize, Serialize};

use crate::entities::GeneIdentifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zygosity {
    Heterozygous,
    Homozygous,
    Hemizygous,
    Unknown,
}

impl Zygosity {
    /// Number of alternate alleles carried by the proband.
    pub fn alt_allele_count(&self) -> u32 {
        match self {
            Zygosity::Homozygous => 2,
            Zygosity::Heterozygous | Zygosity::Hemizygous => 1,
            Zygosity::Unknown => 0,
        }
    }

    fn damage_rank(&self) -> u8 {
        match self {
            Zygosity::Homozygous => 3,
            Zygosity::Hemizygous => 2,
            Zygosity::Heterozygous => 1,
            Zygosity::Unknown => 0,
        }
    }

    /// The more damaging of two zygosities.
    pub fn most_damaging(self, other: Zygosity) -> Zygosity {
        if other.damage_rank() > self.damage_rank() { other } else { self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinVarSignificance {
    Pathogenic,
    PathogenicOrLikelyPathogenic,
    LikelyPathogenic,
    UncertainSignificance,
    LikelyBenign,
    BenignOrLikelyBenign,
    Benign,
    ConflictingInterpretations,
    NotProvided,
}

impl ClinVarSignificance {
    pub fn is_pathogenic_or_likely_pathogenic(&self) -> bool {
        matches!(
            self,
            ClinVarSignificance::Pathogenic
                | ClinVarSignificance::PathogenicOrLikelyPathogenic
                | ClinVarSignificance::LikelyPathogenic
        )
    }

    pub fn is_benign_or_likely_benign(&self) -> bool {
        matches!(
            self,
            ClinVarSignificance::Benign
                | ClinVarSignificance::BenignOrLikelyBenign
                | ClinVarSignificance::LikelyBenign
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptAnnotation {
    pub transcript_id: String,
    /// Sequence Ontology consequence, e.g. `missense_variant`.
    pub consequence: String,
    #[serde(default)]
    pub hgvs_c: Option<String>,
    #[serde(default)]
    pub hgvs_p: Option<String>,
}

/// A single variant call, already annotated upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantCall {
    pub chromosome: String,
    pub position: u64,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(rename = "alt")]
    pub alternate: String,
    pub zygosity: Zygosity,
    pub gene: GeneIdentifier,
    #[serde(default)]
    pub annotations: Vec<TranscriptAnnotation>,
    /// Predicted pathogenicity in [0, 1].
    pub pathogenicity: f64,
    /// Population allele frequency as a percentage (0–100).
    #[serde(default)]
    pub frequency_percent: Option<f64>,
    #[serde(default)]
    pub clinvar: Option<ClinVarSignificance>,
}

impl VariantCall {
    pub fn is_clinvar_pathogenic(&self) -> bool {
        self.clinvar.map(|c| c.is_pathogenic_or_likely_pathogenic()).unwrap_or(false)
    }

    pub fn is_clinvar_benign(&self) -> bool {
        self.clinvar.map(|c| c.is_benign_or_likely_benign()).unwrap_or(false)
    }

    /// Pathogenicity weighted by the number of alternate alleles.
    pub fn weighted_pathogenicity(&self) -> f64 {
        self.zygosity.alt_allele_count() as f64 * self.pathogenicity.clamp(0.0, 1.0)
    }

    pub fn label(&self) -> String {
        format!("{}:{}{}>{}", self.chromosome, self.position, self.reference, self.alternate)
    }
}

/// Per-gene burden summary for one proband.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenotypeSummary {
    pub gene: GeneIdentifier,
    /// All calls seen in the gene, qualifying or not.
    pub total_calls: u32,
    /// Calls passing the admissibility filter.
    pub variant_count: u32,
    /// Sum of allele-weighted pathogenicity over qualifying calls.
    pub pathogenicity_sum: f64,
    /// Alternate alleles contributed by qualifying calls.
    pub pathogenic_allele_count: u32,
    /// Alternate alleles of ClinVar pathogenic/likely pathogenic calls.
    pub pathogenic_clinvar_allele_count: u32,
    pub most_damaging: Zygosity,
}

impl GenotypeSummary {
    pub fn empty(gene: GeneIdentifier) -> Self {
        Self {
            gene,
            total_calls: 0,
            variant_count: 0,
            pathogenicity_sum: 0.0,
            pathogenic_allele_count: 0,
            pathogenic_clinvar_allele_count: 0,
            most_damaging: Zygosity::Unknown,
        }
    }

    pub fn has_variants(&self) -> bool {
        self.total_calls > 0
    }

    pub fn has_deleterious_variants(&self) -> bool {
        self.pathogenic_allele_count > 0 || self.pathogenic_clinvar_allele_count > 0
    }
}
