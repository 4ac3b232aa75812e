//! Folds a proband's variant calls into one [`GenotypeSummary`] per gene.

use std::collections::BTreeMap;

use tracing::debug;

use lirical_common::entities::{GeneIdentifier, TermId};
use lirical_common::error::{LiricalError, Result};
use lirical_common::variant::{GenotypeSummary, VariantCall, Zygosity};

/// Decides whether a call counts toward the pathogenic burden.
/// Supplied by the caller; the aggregator never re-scores variants.
pub trait VariantAdmissibility: Send + Sync {
    fn is_admissible(&self, call: &VariantCall) -> bool;
}

/// Admits calls at or above a pathogenicity cut-off that are not ClinVar benign.
#[derive(Debug, Clone, Copy)]
pub struct PathogenicityThreshold {
    pub threshold: f64,
}

impl PathogenicityThreshold {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl VariantAdmissibility for PathogenicityThreshold {
    fn is_admissible(&self, call: &VariantCall) -> bool {
        call.pathogenicity >= self.threshold && !call.is_clinvar_benign()
    }
}

#[derive(Debug, Clone)]
struct GeneAccumulator {
    gene: GeneIdentifier,
    total_calls: u32,
    variant_count: u32,
    contributions: Vec<f64>,
    pathogenic_allele_count: u32,
    pathogenic_clinvar_allele_count: u32,
    most_damaging: Zygosity,
}

impl GeneAccumulator {
    fn new(gene: GeneIdentifier) -> Self {
        Self {
            gene,
            total_calls: 0,
            variant_count: 0,
            contributions: vec![],
            pathogenic_allele_count: 0,
            pathogenic_clinvar_allele_count: 0,
            most_damaging: Zygosity::Unknown,
        }
    }

    fn absorb(&mut self, other: GeneAccumulator) {
        self.total_calls += other.total_calls;
        self.variant_count += other.variant_count;
        self.contributions.extend(other.contributions);
        self.pathogenic_allele_count += other.pathogenic_allele_count;
        self.pathogenic_clinvar_allele_count += other.pathogenic_clinvar_allele_count;
        self.most_damaging = self.most_damaging.most_damaging(other.most_damaging);
    }

    fn summarise(mut self) -> GenotypeSummary {
        // Summing in sorted order makes the total independent of insertion order.
        self.contributions.sort_by(f64::total_cmp);
        GenotypeSummary {
            gene: self.gene,
            total_calls: self.total_calls,
            variant_count: self.variant_count,
            pathogenicity_sum: self.contributions.iter().sum(),
            pathogenic_allele_count: self.pathogenic_allele_count,
            pathogenic_clinvar_allele_count: self.pathogenic_clinvar_allele_count,
            most_damaging: self.most_damaging,
        }
    }
}

pub struct GenotypeAggregator<A: VariantAdmissibility = PathogenicityThreshold> {
    admissibility: A,
    genes: BTreeMap<TermId, GeneAccumulator>,
}

impl<A: VariantAdmissibility> GenotypeAggregator<A> {
    pub fn new(admissibility: A) -> Self {
        Self { admissibility, genes: BTreeMap::new() }
    }

    pub fn add(&mut self, call: &VariantCall) -> Result<()> {
        if !(0.0..=1.0).contains(&call.pathogenicity) {
            return Err(LiricalError::PathogenicityOutOfRange(call.pathogenicity));
        }
        let acc = self
            .genes
            .entry(call.gene.id.clone())
            .or_insert_with(|| GeneAccumulator::new(call.gene.clone()));
        acc.total_calls += 1;

        let alleles = call.zygosity.alt_allele_count();
        if call.is_clinvar_pathogenic() {
            acc.pathogenic_clinvar_allele_count += alleles;
        }
        if self.admissibility.is_admissible(call) {
            acc.variant_count += 1;
            acc.pathogenic_allele_count += alleles;
            acc.contributions.push(call.weighted_pathogenicity());
            acc.most_damaging = acc.most_damaging.most_damaging(call.zygosity);
        } else {
            debug!(variant = %call.label(), gene = %call.gene.symbol, "Variant not admissible");
        }
        Ok(())
    }

    pub fn add_all<'a>(&mut self, calls: impl IntoIterator<Item = &'a VariantCall>) -> Result<()> {
        for call in calls {
            self.add(call)?;
        }
        Ok(())
    }

    /// Combines two partial aggregations of the same proband.
    pub fn merge(&mut self, other: GenotypeAggregator<A>) {
        for (id, acc) in other.genes {
            match self.genes.get_mut(&id) {
                Some(mine) => mine.absorb(acc),
                None => {
                    self.genes.insert(id, acc);
                }
            }
        }
    }

    pub fn gene_count(&self) -> usize {
        self.genes.len()
    }

    /// Summaries in ascending gene id order.
    pub fn finish(self) -> Vec<GenotypeSummary> {
        self.genes.into_values().map(GeneAccumulator::summarise).collect()
    }
}

/// Aggregates `calls` with the default pathogenicity cut-off admissibility.
pub fn aggregate(calls: &[VariantCall], pathogenicity_threshold: f64) -> Result<Vec<GenotypeSummary>> {
    let mut aggregator = GenotypeAggregator::new(PathogenicityThreshold::new(pathogenicity_threshold));
    aggregator.add_all(calls)?;
    Ok(aggregator.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lirical_common::variant::ClinVarSignificance;

    fn call(gene: &str, pos: u64, zygosity: Zygosity, pathogenicity: f64) -> VariantCall {
        VariantCall {
            chromosome: "1".into(),
            position: pos,
            reference: "A".into(),
            alternate: "G".into(),
            zygosity,
            gene: GeneIdentifier::new(format!("NCBIGene:{gene}"), format!("G{gene}")),
            annotations: vec![],
            pathogenicity,
            frequency_percent: Some(0.001),
            clinvar: None,
        }
    }

    #[test]
    fn test_sums_qualifying_calls_per_gene() {
        let calls = vec![
            call("1", 10, Zygosity::Heterozygous, 0.9),
            call("1", 20, Zygosity::Homozygous, 0.85),
            call("1", 30, Zygosity::Heterozygous, 0.2),
            call("2", 40, Zygosity::Heterozygous, 0.95),
        ];
        let summaries = aggregate(&calls, 0.8).unwrap();
        assert_eq!(summaries.len(), 2);
        let g1 = &summaries[0];
        assert_eq!(g1.total_calls, 3);
        assert_eq!(g1.variant_count, 2);
        assert_eq!(g1.pathogenic_allele_count, 3);
        assert!((g1.pathogenicity_sum - (0.9 + 1.7)).abs() < 1e-12);
        assert_eq!(g1.most_damaging, Zygosity::Homozygous);
    }

    #[test]
    fn test_clinvar_benign_never_qualifies() {
        let mut benign = call("1", 10, Zygosity::Heterozygous, 0.99);
        benign.clinvar = Some(ClinVarSignificance::Benign);
        let summaries = aggregate(&[benign], 0.8).unwrap();
        assert_eq!(summaries[0].variant_count, 0);
        assert!(summaries[0].has_variants());
        assert!(!summaries[0].has_deleterious_variants());
    }

    #[test]
    fn test_clinvar_pathogenic_alleles_counted_regardless_of_score() {
        let mut path = call("1", 10, Zygosity::Homozygous, 0.3);
        path.clinvar = Some(ClinVarSignificance::Pathogenic);
        let summaries = aggregate(&[path], 0.8).unwrap();
        assert_eq!(summaries[0].pathogenic_clinvar_allele_count, 2);
        assert_eq!(summaries[0].pathogenic_allele_count, 0);
    }

    #[test]
    fn test_out_of_range_score_rejected() {
        assert!(matches!(
            aggregate(&[call("1", 10, Zygosity::Heterozygous, 1.5)], 0.8),
            Err(LiricalError::PathogenicityOutOfRange(_))
        ));
    }

    #[test]
    fn test_merge_equals_single_pass() {
        let calls = vec![
            call("1", 10, Zygosity::Heterozygous, 0.91),
            call("1", 20, Zygosity::Heterozygous, 0.83),
            call("2", 30, Zygosity::Homozygous, 0.97),
        ];
        let single = aggregate(&calls, 0.8).unwrap();

        let mut left = GenotypeAggregator::new(PathogenicityThreshold::new(0.8));
        left.add_all(&calls[..1]).unwrap();
        let mut right = GenotypeAggregator::new(PathogenicityThreshold::new(0.8));
        right.add_all(&calls[1..]).unwrap();
        left.merge(right);
        assert_eq!(left.finish(), single);
    }
}
