//! Sliding-window synteny scoring.
//!
//! A window of `window_length(n)` consecutive reference protein-coding genes
//! slides across the reference genome one gene at a time. Within each window,
//! a gene is syntenic when the target-genome neighbour of its ortholog is the
//! ortholog of the next reference gene, in either orientation. The GOC score
//! of a window is the fraction of the window taking part in such runs; the
//! first gene of every run counts once more as the run's anchor.
//!
//! ```
//! use goc::prelude::*;
//!
//! let reference = GeneOrder::from_ids((1..=10).map(|i| format!("r{}", i))).unwrap();
//! let target = GeneOrder::from_ids((1..=10).map(|i| format!("t{}", i))).unwrap();
//! let pairs = (1..=10).map(|i| OrthologPair::new(format!("r{}", i), format!("t{}", i)));
//! let orthologs = OrthologIndex::build(&reference, pairs);
//!
//! let genome = Genome { species: "ref".into(), all: reference.clone(), cds: reference };
//! let records = scan(&genome, "tar", &target, &orthologs).unwrap();
//! assert_eq!(records.len(), 7);
//! assert!(records.iter().all(|r| r.score == 1.0));
//! ```

use serde::{Deserialize, Serialize};

use crate::genome::{GeneOrder, Genome, SpeciesId};
use crate::goc::GocError;
use crate::orthologs::OrthologIndex;

/// The float type for GOC scores.
pub type ScoreFloat = f64;

/// Window length, in genes, per [`WINDOW_UNIT`] reference protein-coding genes.
pub const WINDOW_PROPORTION: usize = 3;

/// Number of reference protein-coding genes per [`WINDOW_PROPORTION`] genes of
/// window length.
pub const WINDOW_UNIT: usize = 100;

/// One GOC value: the `score` of the window centered at `position`, an index
/// into the reference species' full ordered gene sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GocRecord {
    #[serde(rename = "sp1")]
    pub reference: SpeciesId,
    #[serde(rename = "sp2")]
    pub target: SpeciesId,
    #[serde(rename = "pos")]
    pub position: usize,
    pub score: ScoreFloat,
}

/// Window length for a reference with `n` protein-coding genes:
/// `ceil(n / 100) * 3`.
pub fn window_length(n: usize) -> usize {
    n.div_ceil(WINDOW_UNIT) * WINDOW_PROPORTION
}

/// Number of windows that fit in a reference with `n` protein-coding genes.
pub fn window_count(n: usize) -> usize {
    n.saturating_sub(window_length(n))
}

/// Count the syntenic genes of one window.
///
/// `window` holds the target ortholog of each reference gene of the window
/// (`None` when there is none); `target` is the target's ordered
/// protein-coding sequence. The last window gene is never tested since it has
/// no successor.
///
/// # Errors
/// Returns [`GocError::NotInOrder`] if an ortholog is not a protein-coding
/// gene of the target.
pub fn score_window(window: &[Option<&str>], target: &GeneOrder) -> Result<usize, GocError> {
    let mut syntenic = 0;
    let mut new_region = true;
    let last_target = target.len().saturating_sub(1);

    for (i, pair) in window.windows(2).enumerate() {
        let (current, next) = (pair[0], pair[1]);
        let Some(current) = current else {
            new_region = true;
            continue;
        };
        let index = target
            .position_of(current)
            .ok_or_else(|| GocError::NotInOrder(current.to_string(), "target CDS".to_string()))?;

        let forward = index != last_target && target.get(index + 1) == next;
        let colinear = if forward {
            true
        } else if i > 0 && index != 0 {
            target.get(index - 1) == next
        } else {
            // Neither orientation can be tested: the run is left as is.
            continue;
        };

        if colinear {
            syntenic += 1;
            if new_region {
                syntenic += 1;
                new_region = false;
            }
        } else {
            new_region = true;
        }
    }
    Ok(syntenic)
}

/// Compute the GOC profile of `reference` against one target genome.
///
/// Emits one record per window, in increasing position order. A reference
/// with too few protein-coding genes for a single window gives no records.
///
/// # Arguments
///  * `reference`: the reference genome snapshot.
///  * `target_species`: the target species identifier, copied into records.
///  * `target`: the target's ordered protein-coding gene sequence.
///  * `orthologs`: the reference → target ortholog index.
pub fn scan(
    reference: &Genome,
    target_species: &str,
    target: &GeneOrder,
    orthologs: &OrthologIndex,
) -> Result<Vec<GocRecord>, GocError> {
    let cds = &reference.cds;
    let n = cds.len();
    let length = window_length(n);
    if length >= n {
        return Ok(Vec::new());
    }

    let targets = orthologs.targets(cds);
    let center = length.div_ceil(2);

    let mut records = Vec::with_capacity(n - length);
    for (start, window) in targets.windows(length).take(n - length).enumerate() {
        let syntenic = score_window(window, target)?;
        let center_gene = cds
            .get(start + center)
            .ok_or_else(|| GocError::InternalError("window center out of bounds".to_string()))?;
        let position = reference.all.position_of(center_gene).ok_or_else(|| {
            GocError::NotInOrder(center_gene.to_string(), "reference genes".to_string())
        })?;
        records.push(GocRecord {
            reference: reference.species.clone(),
            target: target_species.to_string(),
            position,
            score: syntenic as ScoreFloat / length as ScoreFloat,
        });
    }
    Ok(records)
}
