//! Reference gene → target ortholog lookup for one genome pair.

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::genome::{GeneId, GeneOrder};

/// One row of the ortholog relation: `source` (a reference gene) is
/// orthologous to `target` (a gene of another species).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrthologPair {
    pub source: GeneId,
    pub target: GeneId,
}

impl OrthologPair {
    pub fn new(source: impl Into<GeneId>, target: impl Into<GeneId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// The ortholog of each reference protein-coding gene in one target genome.
///
/// Genes without an ortholog are simply absent, and [`OrthologIndex::target_of`]
/// returns `None` for them.
#[derive(Debug, Clone, Default)]
pub struct OrthologIndex {
    map: IndexMap<GeneId, GeneId>,
    conflicts: usize,
}

impl OrthologIndex {
    /// Build the index from pairs already restricted to the target species.
    ///
    /// Pairs whose source is not in `reference` are ignored. If several
    /// pairs share a source, the first one in iteration order is kept and
    /// the rest are counted as conflicts.
    ///
    /// # Arguments
    ///  * `reference`: the reference species' protein-coding gene order.
    ///  * `pairs`: (reference gene, target gene) pairs, in table order.
    ///
    /// # Returns
    ///
    /// The index from reference genes to their single target ortholog.
    pub fn build<I>(reference: &GeneOrder, pairs: I) -> Self
    where
        I: IntoIterator<Item = OrthologPair>,
    {
        let mut index = Self::default();
        for pair in pairs {
            if !reference.contains(&pair.source) {
                continue;
            }
            match index.map.get(&pair.source) {
                Some(kept) if *kept != pair.target => {
                    debug!(
                        "gene {} has several orthologs, keeping {} over {}",
                        pair.source, kept, pair.target
                    );
                    index.conflicts += 1;
                }
                Some(_) => {}
                None => {
                    index.map.insert(pair.source, pair.target);
                }
            }
        }
        index
    }

    /// The ortholog of reference gene `source`, if any.
    pub fn target_of(&self, source: &str) -> Option<&str> {
        self.map.get(source).map(String::as_str)
    }

    /// The ortholog of every gene of `reference`, in reference order.
    pub fn targets<'a>(&'a self, reference: &'a GeneOrder) -> Vec<Option<&'a str>> {
        reference.iter().map(|gene| self.target_of(gene)).collect()
    }

    /// Number of reference genes with an ortholog.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of discarded pairs that named a different ortholog for an
    /// already indexed gene.
    pub fn conflicts(&self) -> usize {
        self.conflicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_restricts_to_reference() {
        let reference = GeneOrder::from_ids(["r1", "r2", "r3"]).unwrap();
        let pairs = vec![
            OrthologPair::new("r1", "t1"),
            OrthologPair::new("x9", "t9"),
            OrthologPair::new("r3", "t3"),
        ];
        let index = OrthologIndex::build(&reference, pairs);
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.targets(&reference),
            vec![Some("t1"), None, Some("t3")]
        );
        assert_eq!(index.target_of("x9"), None);
    }

    #[test]
    fn test_first_pair_wins() {
        let reference = GeneOrder::from_ids(["r1"]).unwrap();
        let pairs = vec![
            OrthologPair::new("r1", "t1"),
            OrthologPair::new("r1", "t1"),
            OrthologPair::new("r1", "t2"),
        ];
        let index = OrthologIndex::build(&reference, pairs);
        assert_eq!(index.target_of("r1"), Some("t1"));
        assert_eq!(index.conflicts(), 1);
    }

    #[test]
    fn test_empty() {
        let reference = GeneOrder::from_ids(["r1"]).unwrap();
        let index = OrthologIndex::build(&reference, Vec::new());
        assert!(index.is_empty());
        assert_eq!(index.targets(&reference), vec![None]);
    }
}
