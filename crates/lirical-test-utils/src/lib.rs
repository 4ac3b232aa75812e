//! lirical-test-utils — Explicitly constructed fixtures for LIRICAL tests.
//!
//! Every fixture is built fresh by a function call and handed to the code under
//! test; nothing here is global, so tests can run in parallel.

use lirical_common::entities::{Disease, DiseaseCatalog, GeneIdentifier, ModeOfInheritance, TermId};
use lirical_common::ontology::{InMemoryOntology, PHENOTYPIC_ABNORMALITY};
use lirical_common::proband::Proband;
use lirical_common::temporal::TemporalInterval;
use lirical_common::variant::{ClinVarSignificance, VariantCall, Zygosity};

// ── Phenotype terms ──────────────────────────────────────────────────────────

pub const ALL: &str = "HP:0000001";
pub const PHENOTYPIC_ABNORMALITY_ROOT: &str = PHENOTYPIC_ABNORMALITY;

pub const NERVOUS_SYSTEM: &str = "HP:0000707";
pub const NERVOUS_PHYSIOLOGY: &str = "HP:0012638";
pub const SEIZURE: &str = "HP:0001250";
pub const FOCAL_SEIZURE: &str = "HP:0007359";
pub const TONIC_CLONIC_SEIZURE: &str = "HP:0002069";
pub const DEVELOPMENTAL_DELAY: &str = "HP:0001263";
pub const HYPOTONIA: &str = "HP:0001252";

pub const EYE: &str = "HP:0000478";
pub const VISUAL_IMPAIRMENT: &str = "HP:0000505";
pub const ECTOPIA_LENTIS: &str = "HP:0001083";

pub const CARDIOVASCULAR: &str = "HP:0001626";
pub const AORTIC_ROOT_ANEURYSM: &str = "HP:0002616";
pub const AORTIC_REGURGITATION: &str = "HP:0001659";

pub const SKELETAL: &str = "HP:0000924";
pub const ARACHNODACTYLY: &str = "HP:0001166";
pub const SCOLIOSIS: &str = "HP:0002650";

// ── Diseases and genes ───────────────────────────────────────────────────────

pub const MARFAN: &str = "OMIM:154700";
pub const LEIGH: &str = "OMIM:256000";
pub const DRAVET: &str = "OMIM:607208";
pub const ECTOPIA_LENTIS_FAMILIAL: &str = "OMIM:129600";
pub const UNANNOTATED: &str = "ORPHA:999999";

pub fn fbn1() -> GeneIdentifier {
    GeneIdentifier::new("NCBIGene:2200", "FBN1")
}

pub fn surf1() -> GeneIdentifier {
    GeneIdentifier::new("NCBIGene:6834", "SURF1")
}

pub fn scn1a() -> GeneIdentifier {
    GeneIdentifier::new("NCBIGene:6323", "SCN1A")
}

/// Small slice of the phenotype ontology rooted at `HP:0000118`.
pub fn toy_ontology() -> InMemoryOntology {
    InMemoryOntology::from_edges(
        PHENOTYPIC_ABNORMALITY,
        [
            (PHENOTYPIC_ABNORMALITY, ALL),
            (NERVOUS_SYSTEM, PHENOTYPIC_ABNORMALITY),
            (NERVOUS_PHYSIOLOGY, NERVOUS_SYSTEM),
            (SEIZURE, NERVOUS_PHYSIOLOGY),
            (FOCAL_SEIZURE, SEIZURE),
            (TONIC_CLONIC_SEIZURE, SEIZURE),
            (DEVELOPMENTAL_DELAY, NERVOUS_PHYSIOLOGY),
            (HYPOTONIA, NERVOUS_SYSTEM),
            (EYE, PHENOTYPIC_ABNORMALITY),
            (VISUAL_IMPAIRMENT, EYE),
            (ECTOPIA_LENTIS, EYE),
            (CARDIOVASCULAR, PHENOTYPIC_ABNORMALITY),
            (AORTIC_ROOT_ANEURYSM, CARDIOVASCULAR),
            (AORTIC_REGURGITATION, CARDIOVASCULAR),
            (SKELETAL, PHENOTYPIC_ABNORMALITY),
            (ARACHNODACTYLY, SKELETAL),
            (SCOLIOSIS, SKELETAL),
        ],
    )
}

pub fn marfan() -> Disease {
    Disease::new(MARFAN, "Marfan syndrome")
        .with_phenotype(ECTOPIA_LENTIS, Some(0.6))
        .with_phenotype(AORTIC_ROOT_ANEURYSM, None)
        .with_phenotype(ARACHNODACTYLY, Some(0.9))
        .with_phenotype(SCOLIOSIS, Some(0.6))
        .with_gene(fbn1())
        .with_inheritance(ModeOfInheritance::AutosomalDominant)
        .with_onset(TemporalInterval::years(1.0, 30.0))
}

pub fn leigh() -> Disease {
    Disease::new(LEIGH, "Leigh syndrome")
        .with_phenotype(DEVELOPMENTAL_DELAY, Some(0.9))
        .with_phenotype(HYPOTONIA, Some(0.8))
        .with_phenotype(SEIZURE, Some(0.5))
        .with_gene(surf1())
        .with_inheritance(ModeOfInheritance::AutosomalRecessive)
        .with_onset(TemporalInterval::years(0.0, 2.0))
}

pub fn dravet() -> Disease {
    Disease::new(DRAVET, "Dravet syndrome")
        .with_phenotype(FOCAL_SEIZURE, Some(0.9))
        .with_phenotype(TONIC_CLONIC_SEIZURE, Some(0.9))
        .with_phenotype(DEVELOPMENTAL_DELAY, Some(0.7))
        .with_gene(scn1a())
        .with_inheritance(ModeOfInheritance::AutosomalDominant)
        .with_onset(TemporalInterval::years(0.0, 1.0))
}

pub fn ectopia_lentis_familial() -> Disease {
    Disease::new(ECTOPIA_LENTIS_FAMILIAL, "Ectopia lentis, familial")
        .with_phenotype(ECTOPIA_LENTIS, None)
        .with_phenotype(VISUAL_IMPAIRMENT, Some(0.5))
        .with_excluded(AORTIC_ROOT_ANEURYSM)
        .with_gene(fbn1())
        .with_inheritance(ModeOfInheritance::AutosomalDominant)
}

pub fn unannotated() -> Disease {
    Disease::new(UNANNOTATED, "Disease without phenotype annotations")
}

/// Five diseases: Marfan, Leigh, Dravet, familial ectopia lentis and one with no annotations.
pub fn toy_catalog() -> DiseaseCatalog {
    DiseaseCatalog::new(vec![marfan(), leigh(), dravet(), ectopia_lentis_familial(), unannotated()])
}

// ── Probands and variants ────────────────────────────────────────────────────

/// A proband presenting with the classic Marfan triad.
pub fn marfan_proband() -> Proband {
    Proband::new("marfan-case")
        .observe(ECTOPIA_LENTIS)
        .observe(AORTIC_ROOT_ANEURYSM)
        .observe(ARACHNODACTYLY)
}

pub fn variant(gene: GeneIdentifier, position: u64, zygosity: Zygosity, pathogenicity: f64) -> VariantCall {
    VariantCall {
        chromosome: "1".to_string(),
        position,
        reference: "C".to_string(),
        alternate: "T".to_string(),
        zygosity,
        gene,
        annotations: vec![],
        pathogenicity,
        frequency_percent: Some(0.0001),
        clinvar: None,
    }
}

pub fn clinvar_variant(gene: GeneIdentifier, position: u64, zygosity: Zygosity, significance: ClinVarSignificance) -> VariantCall {
    VariantCall { clinvar: Some(significance), ..variant(gene, position, zygosity, 0.5) }
}

pub fn term(id: &str) -> TermId {
    TermId::from(id)
}
