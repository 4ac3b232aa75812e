//! Phenotype likelihood ratios.
//!
//! Each observed or negated query term is compared with a disease's annotations
//! through the ontology. The per-term ratio is the frequency of the matched
//! feature in the disease over its background frequency across all diseases.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use lirical_common::entities::{Disease, DiseaseCatalog, PhenotypeAnnotation, TermId};
use lirical_common::error::Result;
use lirical_common::evidence::{
    ComponentDetail, LikelihoodRatioComponent, LikelihoodRatioKind, PhenotypeMatchType, TermLikelihoodRatio,
};
use lirical_common::ontology::PhenotypeOntology;

/// Floor for background frequency lookups.
pub const DEFAULT_BACKGROUND_FREQUENCY: f64 = 1.0 / 10_000.0;
const EXCLUDED_IN_DISEASE_BUT_PRESENT_IN_QUERY: f64 = 1.0 / 1000.0;
const EXCLUDED_IN_DISEASE_AND_EXCLUDED_IN_QUERY: f64 = 1000.0;
const FALSE_NEGATIVE_OBSERVATION_PROBABILITY: f64 = 0.01;
const NO_COMMON_ORGAN_PROBABILITY: f64 = 0.01;

// ── Induced disease graph ────────────────────────────────────────────────────

struct AnnotationClosure<'a> {
    annotation: &'a PhenotypeAnnotation,
    term: TermId,
    /// Ancestors of the annotated term, itself included.
    ancestors: BTreeSet<TermId>,
}

/// A disease's annotations expanded through the ontology.
pub struct InducedDiseaseGraph<'a> {
    disease: &'a Disease,
    annotations: Vec<AnnotationClosure<'a>>,
    /// Ancestors of annotated terms with frequencies decayed ×10 per edge.
    ancestor_frequencies: HashMap<TermId, f64>,
    excluded: Vec<TermId>,
    /// Excluded terms and all of their ancestors.
    negative_graph: BTreeSet<TermId>,
}

impl<'a> InducedDiseaseGraph<'a> {
    pub fn new(disease: &'a Disease, ontology: &dyn PhenotypeOntology) -> Self {
        let root = ontology.root();
        let mut annotations = Vec::with_capacity(disease.phenotypes.len());
        let mut ancestor_frequencies: HashMap<TermId, f64> = HashMap::new();

        for annotation in &disease.phenotypes {
            let term = ontology.primary_term_id(&annotation.term);
            let f = annotation.frequency();

            let mut seen = HashSet::new();
            let mut queue = VecDeque::from([(term.clone(), 0i32)]);
            while let Some((t, distance)) = queue.pop_front() {
                for parent in ontology.parents(&t) {
                    if &parent == root || !seen.insert(parent.clone()) {
                        continue;
                    }
                    let adjusted = f / 10f64.powi(distance + 1);
                    ancestor_frequencies
                        .entry(parent.clone())
                        .and_modify(|v| *v = v.max(adjusted))
                        .or_insert(adjusted);
                    queue.push_back((parent, distance + 1));
                }
            }

            annotations.push(AnnotationClosure {
                annotation,
                ancestors: ontology.ancestors(&term, true),
                term,
            });
        }

        let excluded: Vec<TermId> = disease
            .excluded_phenotypes
            .iter()
            .map(|t| ontology.primary_term_id(t))
            .collect();
        let negative_graph = excluded
            .iter()
            .flat_map(|t| ontology.ancestors(t, true))
            .collect();

        Self { disease, annotations, ancestor_frequencies, excluded, negative_graph }
    }

    pub fn disease(&self) -> &Disease {
        self.disease
    }

    pub fn is_exact_excluded_match(&self, term: &TermId) -> bool {
        self.negative_graph.contains(term)
    }

    /// True when `term` is annotated directly or implied by a more specific annotation.
    pub fn is_annotated_to(&self, term: &TermId) -> bool {
        self.annotations.iter().any(|a| a.ancestors.contains(term))
    }

    /// Highest frequency among annotations implying `term`.
    pub fn propagated_frequency(&self, term: &TermId) -> f64 {
        self.annotations
            .iter()
            .filter(|a| a.ancestors.contains(term))
            .map(|a| a.annotation.frequency())
            .fold(0.0, f64::max)
    }

    /// Nearest ancestor-or-self of `term` in the induced graph, by breadth-first
    /// search upward. Falls back to the ontology root with frequency 1.0.
    pub fn closest_ancestor(&self, term: &TermId, ontology: &dyn PhenotypeOntology) -> (TermId, f64) {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([term.clone()]);
        while let Some(t) = queue.pop_front() {
            if let Some(f) = self.ancestor_frequencies.get(&t) {
                return (t, *f);
            }
            for parent in ontology.parents(&t) {
                if seen.insert(parent.clone()) {
                    queue.push_back(parent);
                }
            }
        }
        (ontology.root().clone(), 1.0)
    }
}

// ── Likelihood ratio ─────────────────────────────────────────────────────────

pub struct PhenotypeLikelihoodRatio {
    ontology: Arc<dyn PhenotypeOntology>,
    /// Unfloored background frequency per term.
    overall_frequency: HashMap<TermId, f64>,
}

impl PhenotypeLikelihoodRatio {
    pub fn new(ontology: Arc<dyn PhenotypeOntology>, catalog: &DiseaseCatalog) -> Self {
        let overall_frequency = background_term_frequencies(ontology.as_ref(), catalog);
        debug!("Computed background frequency for {} terms", overall_frequency.len());
        Self { ontology, overall_frequency }
    }

    pub fn ontology(&self) -> &dyn PhenotypeOntology {
        self.ontology.as_ref()
    }

    /// Background frequency of a term, floored at 1/10000.
    pub fn background_frequency(&self, term: &TermId) -> f64 {
        match self.overall_frequency.get(term) {
            Some(f) => f.max(DEFAULT_BACKGROUND_FREQUENCY),
            None => {
                trace!(term = %term, "No background frequency; using floor");
                DEFAULT_BACKGROUND_FREQUENCY
            }
        }
    }

    pub fn lr_for_observed_term(&self, query: &TermId, idg: &InducedDiseaseGraph<'_>) -> TermLikelihoodRatio {
        let ontology = self.ontology();
        let query = ontology.primary_term_id(query);
        let query_ancestors = ontology.ancestors(&query, true);

        if idg.excluded.iter().any(|e| query_ancestors.contains(e)) {
            return term_lr(&query, false, EXCLUDED_IN_DISEASE_BUT_PRESENT_IN_QUERY, PhenotypeMatchType::QueryTermPresentButExcludedInDisease, None);
        }

        if let Some(a) = idg.annotations.iter().find(|a| a.term == query) {
            let lr = a.annotation.frequency() / self.background_frequency(&query);
            return term_lr(&query, false, lr, PhenotypeMatchType::ExactMatch, Some(a.term.clone()));
        }

        // Query is an ancestor of one or more disease terms.
        let best_descendant = idg
            .annotations
            .iter()
            .filter(|a| a.ancestors.contains(&query))
            .fold(None::<(&TermId, f64)>, |best, a| {
                let f = a.annotation.frequency();
                match best {
                    Some((_, b)) if b >= f => best,
                    _ => Some((&a.term, f)),
                }
            });
        if let Some((matched, f)) = best_descendant {
            let lr = f / self.background_frequency(&query);
            return term_lr(&query, false, lr, PhenotypeMatchType::DiseaseTermSubclassOfQuery, Some(matched.clone()));
        }

        // Query is a descendant of one or more disease terms.
        let mut best_subclass: Option<(&TermId, f64)> = None;
        for a in idg.annotations.iter().filter(|a| query_ancestors.contains(&a.term)) {
            let f = self.proportion_in_children(&query, &a.term) * a.annotation.frequency();
            if f > best_subclass.map(|(_, b)| b).unwrap_or(0.0) {
                best_subclass = Some((&a.term, f));
            }
        }
        if let Some((matched, f)) = best_subclass {
            let lr = f.max(self.no_common_organ_probability(&query)) / self.background_frequency(&query);
            return term_lr(&query, false, lr, PhenotypeMatchType::QueryTermSubclassOfDiseaseTerm, Some(matched.clone()));
        }

        let (ancestor, f) = idg.closest_ancestor(&query, ontology);
        if &ancestor != ontology.root() {
            let lr = NO_COMMON_ORGAN_PROBABILITY.max(f / self.background_frequency(&ancestor));
            return term_lr(&query, false, lr, PhenotypeMatchType::NonRootCommonAncestor, Some(ancestor));
        }
        term_lr(&query, false, NO_COMMON_ORGAN_PROBABILITY, PhenotypeMatchType::NoMatchBelowRoot, None)
    }

    pub fn lr_for_excluded_term(&self, query: &TermId, idg: &InducedDiseaseGraph<'_>) -> TermLikelihoodRatio {
        let query = self.ontology().primary_term_id(query);
        if idg.is_exact_excluded_match(&query) {
            return term_lr(&query, true, EXCLUDED_IN_DISEASE_AND_EXCLUDED_IN_QUERY, PhenotypeMatchType::ExcludedQueryTermExcludedInDisease, None);
        }

        let background = self.background_frequency(&query);
        if background > 0.99 {
            warn!(term = %query, background, "Unusually high background frequency");
            return term_lr(&query, true, 1.0, PhenotypeMatchType::UnusualBackgroundFrequency, None);
        }

        if !idg.is_annotated_to(&query) {
            let lr = 1.0 / (1.0 - background);
            return term_lr(&query, true, lr, PhenotypeMatchType::ExcludedQueryTermNotPresentInDisease, None);
        }

        let frequency = idg.propagated_frequency(&query);
        let excluded_frequency = FALSE_NEGATIVE_OBSERVATION_PROBABILITY.max(1.0 - frequency);
        let lr = excluded_frequency / (1.0 - background);
        term_lr(&query, true, lr, PhenotypeMatchType::ExcludedQueryTermPresentInDisease, None)
    }

    /// Disease-level phenotype component: the product of all per-term ratios.
    pub fn ratio(&self, disease: &Disease, observed: &[TermId], negated: &[TermId]) -> Result<LikelihoodRatioComponent> {
        if disease.has_empty_profile() {
            return Ok(LikelihoodRatioComponent::neutral(
                LikelihoodRatioKind::Phenotype,
                disease.id.clone(),
                "disease has no phenotype annotations",
            )
            .with_detail(ComponentDetail::Phenotype {
                terms: observed
                    .iter()
                    .map(|q| term_lr(q, false, 1.0, PhenotypeMatchType::NoPhenotypeAnnotations, None))
                    .chain(negated.iter().map(|q| term_lr(q, true, 1.0, PhenotypeMatchType::NoPhenotypeAnnotations, None)))
                    .collect(),
            }));
        }
        if observed.is_empty() && negated.is_empty() {
            return Ok(LikelihoodRatioComponent::neutral(
                LikelihoodRatioKind::Phenotype,
                disease.id.clone(),
                "no phenotype terms in query",
            ));
        }

        let idg = InducedDiseaseGraph::new(disease, self.ontology());
        let terms: Vec<TermLikelihoodRatio> = observed
            .iter()
            .map(|q| self.lr_for_observed_term(q, &idg))
            .chain(negated.iter().map(|q| self.lr_for_excluded_term(q, &idg)))
            .collect();

        let ln_ratio: f64 = terms.iter().map(|t| t.ratio.ln()).sum();
        let explanation = terms
            .iter()
            .map(|t| format!("{}{}[{:?}]={:.3}", if t.negated { "-" } else { "" }, t.query, t.match_type, t.ratio))
            .collect::<Vec<_>>()
            .join("; ");

        LikelihoodRatioComponent::try_from_ln(
            LikelihoodRatioKind::Phenotype,
            disease.id.clone(),
            ln_ratio,
            explanation,
            ComponentDetail::Phenotype { terms },
        )
    }

    /// Share of a disease term's frequency attributable to the query: 1 for the
    /// term itself, 1/|children| for a direct child, 0 otherwise.
    fn proportion_in_children(&self, query: &TermId, disease_term: &TermId) -> f64 {
        if query.id() == disease_term.id() {
            return 1.0;
        }
        let children = self.ontology().children(disease_term);
        if children.iter().any(|c| c == query) {
            1.0 / children.len() as f64
        } else {
            0.0
        }
    }

    /// Heuristic false-positive probability scaled by how common the feature is.
    /// Ranges from 1:500 for rare features to 1:10 for common ones.
    fn no_common_organ_probability(&self, term: &TermId) -> f64 {
        const MIN_PROB: f64 = 0.002;
        const MAX_PROB: f64 = 0.10;
        const FACTOR: f64 = (MAX_PROB - MIN_PROB) / (MAX_PROB - NO_COMMON_ORGAN_PROBABILITY);

        let f = match self.overall_frequency.get(term) {
            Some(f) => *f,
            None if self.ontology().contains(term) => 0.0,
            None => NO_COMMON_ORGAN_PROBABILITY,
        };
        let penalty = MIN_PROB + (f - NO_COMMON_ORGAN_PROBABILITY) * FACTOR;
        penalty * f
    }
}

fn term_lr(query: &TermId, negated: bool, ratio: f64, match_type: PhenotypeMatchType, matched_term: Option<TermId>) -> TermLikelihoodRatio {
    TermLikelihoodRatio { query: query.clone(), negated, ratio, match_type, matched_term }
}

/// For every term, the sum over diseases of the highest frequency of any
/// annotation the term subsumes, divided by the number of diseases.
fn background_term_frequencies(ontology: &dyn PhenotypeOntology, catalog: &DiseaseCatalog) -> HashMap<TermId, f64> {
    let mut totals: HashMap<TermId, f64> = HashMap::new();
    for disease in catalog.iter() {
        let mut per_disease: HashMap<TermId, f64> = HashMap::new();
        for annotation in &disease.phenotypes {
            let f = annotation.frequency();
            let term = ontology.primary_term_id(&annotation.term);
            for ancestor in ontology.ancestors(&term, true) {
                per_disease
                    .entry(ancestor)
                    .and_modify(|v| *v = v.max(f))
                    .or_insert(f);
            }
        }
        for (term, f) in per_disease {
            *totals.entry(term).or_insert(0.0) += f;
        }
    }
    let n = catalog.len().max(1) as f64;
    totals.values_mut().for_each(|v| *v /= n);
    totals
}
