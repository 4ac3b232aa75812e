/// Read-only view of the phenotype ontology.
///
/// Graph construction and closure are the loader's job; the scoring code only
/// asks for parents, children and ancestor sets through [`PhenotypeOntology`].

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::entities::TermId;

/// Root of the phenotypic abnormality subontology.
pub const PHENOTYPIC_ABNORMALITY: &str = "HP:0000118";

pub trait PhenotypeOntology: Send + Sync {
    fn root(&self) -> &TermId;

    fn parents(&self, term: &TermId) -> Vec<TermId>;

    fn children(&self, term: &TermId) -> Vec<TermId>;

    fn contains(&self, term: &TermId) -> bool;

    /// All ancestors, optionally including `term` itself.
    fn ancestors(&self, term: &TermId, include_self: bool) -> BTreeSet<TermId> {
        let mut seen = BTreeSet::new();
        if include_self {
            seen.insert(term.clone());
        }
        let mut queue: VecDeque<TermId> = self.parents(term).into();
        while let Some(t) = queue.pop_front() {
            if seen.insert(t.clone()) {
                queue.extend(self.parents(&t));
            }
        }
        seen
    }

    /// True when `sub` is `sup` or one of its descendants.
    fn is_subclass(&self, sub: &TermId, sup: &TermId) -> bool {
        sub == sup || self.ancestors(sub, false).contains(sup)
    }

    /// Resolves obsolete or alternate ids; identity by default.
    fn primary_term_id(&self, term: &TermId) -> TermId {
        term.clone()
    }
}

/// Adjacency-list ontology built from `(child, parent)` edges.
#[derive(Debug, Clone)]
pub struct InMemoryOntology {
    root: TermId,
    parents: HashMap<TermId, Vec<TermId>>,
    children: HashMap<TermId, Vec<TermId>>,
    alternate_ids: HashMap<TermId, TermId>,
    terms: HashSet<TermId>,
}

impl InMemoryOntology {
    pub fn new(root: impl Into<TermId>) -> Self {
        let root = root.into();
        let mut terms = HashSet::new();
        terms.insert(root.clone());
        Self {
            root,
            parents: HashMap::new(),
            children: HashMap::new(),
            alternate_ids: HashMap::new(),
            terms,
        }
    }

    pub fn from_edges<'a>(root: &str, edges: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut ontology = Self::new(root);
        for (child, parent) in edges {
            ontology.add_edge(TermId::from(child), TermId::from(parent));
        }
        ontology
    }

    pub fn add_edge(&mut self, child: TermId, parent: TermId) {
        self.terms.insert(child.clone());
        self.terms.insert(parent.clone());
        let ps = self.parents.entry(child.clone()).or_default();
        if !ps.contains(&parent) {
            ps.push(parent.clone());
            self.children.entry(parent).or_default().push(child);
        }
    }

    pub fn add_alternate_id(&mut self, alternate: TermId, primary: TermId) {
        self.alternate_ids.insert(alternate, primary);
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl PhenotypeOntology for InMemoryOntology {
    fn root(&self) -> &TermId {
        &self.root
    }

    fn parents(&self, term: &TermId) -> Vec<TermId> {
        self.parents.get(term).cloned().unwrap_or_default()
    }

    fn children(&self, term: &TermId) -> Vec<TermId> {
        self.children.get(term).cloned().unwrap_or_default()
    }

    fn contains(&self, term: &TermId) -> bool {
        self.terms.contains(term)
    }

    fn primary_term_id(&self, term: &TermId) -> TermId {
        self.alternate_ids.get(term).cloned().unwrap_or_else(|| term.clone())
    }
}
