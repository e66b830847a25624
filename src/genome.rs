//! Genes, genomic parts, and ordered gene sequences.
//!
//! The order of genes along a genome is the backbone of GOC scoring: it
//! defines what "adjacent" means. Genes are ordered by the rank of their
//! genomic part, then by their start coordinate within the part.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::goc::GocError;

/// Gene identifiers as stored in the annotation store.
pub type GeneId = String;

/// Species identifiers as stored in the annotation store.
pub type SpeciesId = String;

/// The integer type for intra-part start coordinates.
pub type Position = i64;

/// The text used for protein-coding genes in the annotation store.
pub const CDS_FEATURE: &str = "CDS";

/// The kind of annotated feature a gene is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FeatureKind {
    /// A protein-coding gene.
    Cds,
    /// Any other feature (tRNA, rRNA, pseudogene, ...), kept verbatim.
    Other(String),
}

impl FeatureKind {
    pub fn is_protein_coding(&self) -> bool {
        matches!(self, FeatureKind::Cds)
    }
}

impl From<String> for FeatureKind {
    fn from(value: String) -> Self {
        if value == CDS_FEATURE {
            FeatureKind::Cds
        } else {
            FeatureKind::Other(value)
        }
    }
}

impl From<FeatureKind> for String {
    fn from(value: FeatureKind) -> Self {
        match value {
            FeatureKind::Cds => CDS_FEATURE.to_string(),
            FeatureKind::Other(kind) => kind,
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKind::Cds => write!(f, "{}", CDS_FEATURE),
            FeatureKind::Other(kind) => write!(f, "{}", kind),
        }
    }
}

/// A contig or chromosome within one species' genome.
///
/// Parts are not orderable by name; `rank` totally orders the parts of a
/// genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomicPart {
    pub id: String,
    pub rank: Position,
}

/// An annotated gene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    pub id: GeneId,
    pub species: SpeciesId,
    pub feature: FeatureKind,
    pub part: String,
    pub start: Position,
}

/// Which genes of a species to include in an ordered sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneSelection {
    All,
    ProteinCoding,
}

impl GeneSelection {
    pub fn includes(&self, gene: &Gene) -> bool {
        match self {
            GeneSelection::All => true,
            GeneSelection::ProteinCoding => gene.feature.is_protein_coding(),
        }
    }
}

/// An ordered gene sequence with constant-time identifier lookup.
///
/// Backed by an [`IndexSet`], so that both "the gene at index `i`" and "the
/// index of gene `id`" are O(1).
#[derive(Debug, Clone, Default)]
pub struct GeneOrder {
    genes: IndexSet<GeneId>,
}

// IndexSet equality ignores order.
impl PartialEq for GeneOrder {
    fn eq(&self, other: &Self) -> bool {
        self.genes.iter().eq(other.genes.iter())
    }
}

impl GeneOrder {
    /// Build an ordered sequence from identifiers that are already in
    /// genome order.
    pub fn from_ids<I, S>(ids: I) -> Result<Self, GocError>
    where
        I: IntoIterator<Item = S>,
        S: Into<GeneId>,
    {
        let mut genes = IndexSet::new();
        for id in ids {
            let id = id.into();
            if genes.contains(&id) {
                return Err(GocError::DuplicateGene(id));
            }
            genes.insert(id);
        }
        Ok(Self { genes })
    }

    /// Order the selected genes of `species` by (part rank, start).
    ///
    /// Ties keep the input order.
    ///
    /// # Arguments
    ///  * `genes`: genes of any species; only those of `species` are used.
    ///  * `parts`: genomic parts keyed by identifier, giving each part's rank.
    ///  * `selection`: all genes, or protein-coding genes only.
    ///
    /// # Returns
    ///
    /// The ordered sequence, or [`GocError::UnknownPart`] if a selected gene
    /// sits on a part missing from `parts`.
    pub fn from_genes<'a, I>(
        genes: I,
        parts: &IndexMap<String, GenomicPart>,
        species: &str,
        selection: GeneSelection,
    ) -> Result<Self, GocError>
    where
        I: IntoIterator<Item = &'a Gene>,
    {
        let mut keyed = Vec::new();
        for gene in genes {
            if gene.species != species || !selection.includes(gene) {
                continue;
            }
            let part = parts
                .get(&gene.part)
                .ok_or_else(|| GocError::UnknownPart(gene.part.clone(), gene.id.clone()))?;
            keyed.push(((part.rank, gene.start), gene.id.as_str()));
        }
        keyed.sort_by_key(|(key, _)| *key);
        Self::from_ids(keyed.into_iter().map(|(_, id)| id))
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// The gene at `index`, if within bounds.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.genes.get_index(index).map(String::as_str)
    }

    /// The index of gene `id` in this order, if present.
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.genes.get_index_of(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.genes.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.genes.iter().map(String::as_str)
    }
}

/// An immutable snapshot of one species' ordered gene sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct Genome {
    pub species: SpeciesId,
    /// All genes, used to translate window centers into output positions.
    pub all: GeneOrder,
    /// Protein-coding genes only, used to define windows and adjacency.
    pub cds: GeneOrder,
}
