//! Scoring every ordered species pair of an annotation store.
//!
//! [`compute_goc`] is the driver: it snapshots each species' gene orders,
//! builds ortholog indexes, runs the window scanner per pair, and hands each
//! pair's records to a [`GocSink`]. Failures are kept per pair in a
//! [`RunSummary`] rather than ending the run.

use indexmap::IndexMap;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::io;
use std::sync::Arc;
use thiserror::Error;

use crate::file::FileError;
use crate::genome::{Genome, SpeciesId};
use crate::orthologs::OrthologIndex;
use crate::sink::GocSink;
use crate::store::AnnotationStore;
use crate::synteny::{scan, GocRecord};

#[derive(Error, Debug)]
pub enum GocError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Table parsing error: {0}")]
    TableParsingError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IOError(#[from] io::Error),
    #[error("File reading error: {0}")]
    FileError(#[from] FileError),
    /// The annotation database path does not name a file.
    #[error("Database '{0}' does not exist")]
    NoDatabase(String),
    /// A gene identifier occurs twice in one ordered sequence.
    #[error("Gene '{0}' occurs more than once in a gene order")]
    DuplicateGene(String),
    /// A gene sits on a genomic part with no rank: (part, gene).
    #[error("Genomic part '{0}' of gene '{1}' does not exist")]
    UnknownPart(String, String),
    /// A gene expected in an ordered sequence is missing: (gene, which order).
    #[error("Gene '{0}' is missing from the {1} order")]
    NotInOrder(String, String),
    /// The gene orders of a species could not be read; shared by every pair
    /// involving that species.
    #[error("Species '{0}' could not be read: {1}")]
    InvalidSpecies(SpeciesId, Arc<GocError>),
    #[error("Thread pool error: {0}")]
    ThreadPoolError(#[from] rayon::ThreadPoolBuildError),
    #[error("Internal Error: {0}")]
    InternalError(String),
}

/// Settings for a GOC run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Number of worker threads scoring species pairs. `None` uses one per
    /// core (or `RAYON_NUM_THREADS`).
    pub threads: Option<usize>,
}

/// A species pair whose scoring failed.
#[derive(Debug)]
pub struct PairFailure {
    pub reference: SpeciesId,
    pub target: SpeciesId,
    pub error: GocError,
}

/// What a GOC run produced.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Species pairs whose batch reached the sink.
    pub pairs: usize,
    /// Records written across all pairs.
    pub records: usize,
    pub failures: Vec<PairFailure>,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, reference: &str, target: &str, error: GocError) {
        warn!("{} vs {}: GOC computation failed: {}", reference, target, error);
        self.failures.push(PairFailure {
            reference: reference.to_string(),
            target: target.to_string(),
            error,
        });
    }
}

type Snapshot = Result<Genome, Arc<GocError>>;

fn snapshot_of<'a>(name: &SpeciesId, snapshot: &'a Snapshot) -> Result<&'a Genome, GocError> {
    snapshot
        .as_ref()
        .map_err(|cause| GocError::InvalidSpecies(name.clone(), Arc::clone(cause)))
}

fn ortholog_index<S>(store: &S, reference: &Genome, target: &Genome) -> Result<OrthologIndex, GocError>
where
    S: AnnotationStore + ?Sized,
{
    let pairs = store.ortholog_pairs(&reference.species, &target.species)?;
    let index = OrthologIndex::build(&reference.cds, pairs);
    if index.conflicts() > 0 {
        warn!(
            "{} vs {}: {} ortholog pairs conflict with an earlier pair and were ignored",
            reference.species,
            target.species,
            index.conflicts()
        );
    }
    Ok(index)
}

/// Compute GOC profiles for every ordered pair of distinct species in
/// `store`, handing one batch per pair to `sink`.
///
/// Each species' gene orders are read once into an immutable [`Genome`]
/// snapshot. Targets of a reference species are scored in chunks of one
/// target per worker thread; each chunk's batches are written, in species
/// order, before the next chunk is scored. At most one chunk of batches is
/// held in memory.
///
/// # Arguments
///  * `store`: where species, gene orders and ortholog pairs are read from.
///  * `sink`: receives exactly one batch per successfully scored pair.
///  * `options`: run settings, such as the number of worker threads.
///
/// # Returns
///
/// A [`RunSummary`] counting written pairs and records. A pair fails, and is
/// listed in [`RunSummary::failures`], when either species' gene orders
/// cannot be read ([`GocError::InvalidSpecies`]) or its ortholog lookup or
/// scan fails; the other pairs are still scored. Only listing the species,
/// building the thread pool, or writing to the sink ends the run early with
/// an error, keeping batches already written.
pub fn compute_goc<S, K>(
    store: &S,
    sink: &mut K,
    options: &RunOptions,
) -> Result<RunSummary, GocError>
where
    S: AnnotationStore + ?Sized,
    K: GocSink + ?Sized,
{
    let species = store.species()?;
    let mut genomes: IndexMap<SpeciesId, Snapshot> = IndexMap::new();
    for name in &species {
        let snapshot = store.genome(name).map_err(Arc::new);
        match &snapshot {
            Ok(genome) => debug!(
                "{}: {} genes, {} protein-coding",
                name,
                genome.all.len(),
                genome.cds.len()
            ),
            Err(error) => warn!("{}: cannot read gene orders: {}", name, error),
        }
        genomes.insert(name.clone(), snapshot);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads.unwrap_or(0))
        .build()?;
    let chunk_size = pool.current_num_threads().max(1);

    let total = genomes.len() * genomes.len().saturating_sub(1);
    let mut done = 0;
    let mut summary = RunSummary::default();
    for (reference_name, reference) in &genomes {
        let targets: Vec<(&SpeciesId, &Snapshot)> = genomes
            .iter()
            .filter(|(name, _)| *name != reference_name)
            .collect();

        let reference = match reference {
            Ok(genome) => genome,
            Err(cause) => {
                for (target_name, _) in &targets {
                    done += 1;
                    info!("{}/{} GOC computation", done, total);
                    let error = GocError::InvalidSpecies(reference_name.clone(), Arc::clone(cause));
                    summary.fail(reference_name, target_name, error);
                }
                continue;
            }
        };

        for chunk in targets.chunks(chunk_size) {
            // The store is read sequentially; only scanning runs in parallel.
            let jobs: Vec<Result<(&Genome, OrthologIndex), GocError>> = chunk
                .iter()
                .map(|(target_name, target)| {
                    let target = snapshot_of(target_name, target)?;
                    Ok((target, ortholog_index(store, reference, target)?))
                })
                .collect();

            let results: Vec<Result<Vec<GocRecord>, GocError>> = pool.install(|| {
                jobs.into_par_iter()
                    .map(|job| {
                        let (target, index) = job?;
                        scan(reference, &target.species, &target.cds, &index)
                    })
                    .collect()
            });

            for ((target_name, _), result) in chunk.iter().zip(results) {
                done += 1;
                info!("{}/{} GOC computation", done, total);
                match result {
                    Ok(records) => {
                        sink.write_batch(reference_name, target_name, &records)?;
                        summary.pairs += 1;
                        summary.records += records.len();
                    }
                    Err(error) => summary.fail(reference_name, target_name, error),
                }
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::{FeatureKind, Gene, GenomicPart};
    use crate::numeric::assert_floats_eq;
    use crate::orthologs::OrthologPair;
    use crate::store::MemoryStore;
    use crate::synteny::{window_count, ScoreFloat};

    fn gene(id: String, species: &str, feature: FeatureKind, start: i64) -> Gene {
        Gene {
            id,
            species: species.to_string(),
            feature,
            part: format!("{}_chr", species),
            start,
        }
    }

    type Fixture = (Vec<Gene>, IndexMap<String, GenomicPart>, Vec<OrthologPair>);

    /// Species "a" and "b" with `n` protein-coding genes each, "b" in reverse
    /// order, plus species "c" with only two genes. Species "a" also carries
    /// one tRNA gene ahead of its third protein-coding gene.
    fn fixture(n: usize) -> Fixture {
        let mut genes = Vec::new();
        let mut orthologs = Vec::new();
        for i in 0..n {
            genes.push(gene(format!("a{}", i), "a", FeatureKind::Cds, 10 * i as i64));
            genes.push(gene(format!("b{}", i), "b", FeatureKind::Cds, -10 * i as i64));
            orthologs.push(OrthologPair::new(format!("a{}", i), format!("b{}", i)));
            orthologs.push(OrthologPair::new(format!("b{}", i), format!("a{}", i)));
        }
        genes.push(gene("trna".into(), "a", FeatureKind::Other("tRNA".into()), 15));
        genes.push(gene("c0".into(), "c", FeatureKind::Cds, 0));
        genes.push(gene("c1".into(), "c", FeatureKind::Cds, 1));
        let parts = ["a", "b", "c"]
            .iter()
            .map(|sp| {
                let id = format!("{}_chr", sp);
                (id.clone(), GenomicPart { id, rank: 0 })
            })
            .collect();
        (genes, parts, orthologs)
    }

    fn store(n: usize) -> MemoryStore {
        let (genes, parts, orthologs) = fixture(n);
        MemoryStore::new(genes, parts, orthologs).unwrap()
    }

    #[test]
    fn test_all_ordered_pairs() {
        let store = store(10);
        let mut records: Vec<GocRecord> = Vec::new();
        let summary = compute_goc(&store, &mut records, &RunOptions::default()).unwrap();

        assert!(summary.is_complete());
        assert_eq!(summary.pairs, 6);
        // a and b each give 7 windows against two targets, c gives none
        assert_eq!(summary.records, 4 * window_count(10));
        assert_eq!(records.len(), summary.records);

        let a_vs_b: Vec<&GocRecord> = records
            .iter()
            .filter(|r| r.reference == "a" && r.target == "b")
            .collect();
        let positions: Vec<usize> = a_vs_b.iter().map(|r| r.position).collect();
        // the tRNA at index 2 shifts every center from a2 on by one
        assert_eq!(positions, vec![3, 4, 5, 6, 7, 8, 9]);
        let scores: Vec<ScoreFloat> = a_vs_b.iter().map(|r| r.score).collect();
        assert_floats_eq(&scores, &[2.0 / 3.0; 7], 1e-12);

        // "c" has no orthologs of "a"
        assert!(records
            .iter()
            .filter(|r| r.reference == "a" && r.target == "c")
            .all(|r| r.score == 0.0));
    }

    #[test]
    fn test_pairs_written_in_order() {
        let store = store(10);
        let mut expected = Vec::new();
        for pair in [("a", "b"), ("a", "c"), ("b", "a"), ("b", "c")] {
            expected.extend(std::iter::repeat(pair).take(7));
        }
        // one, two and more workers than targets per reference
        for threads in 1..=3 {
            let mut records: Vec<GocRecord> = Vec::new();
            let options = RunOptions {
                threads: Some(threads),
            };
            let summary = compute_goc(&store, &mut records, &options).unwrap();
            assert_eq!(summary.pairs, 6);
            let pairs: Vec<(&str, &str)> = records
                .iter()
                .map(|r| (r.reference.as_str(), r.target.as_str()))
                .collect();
            assert_eq!(pairs, expected);
        }
    }

    #[test]
    fn test_unreadable_species_fails_only_its_pairs() {
        let (mut genes, parts, orthologs) = fixture(10);
        let mut stray = gene("c2".into(), "c", FeatureKind::Cds, 2);
        stray.part = "nowhere".to_string();
        genes.push(stray);
        let store = MemoryStore::new(genes, parts, orthologs).unwrap();

        let mut records: Vec<GocRecord> = Vec::new();
        let summary = compute_goc(&store, &mut records, &RunOptions::default()).unwrap();

        assert_eq!(summary.pairs, 2);
        assert_eq!(summary.records, 2 * window_count(10));
        assert_eq!(records.len(), 14);
        assert!(records
            .iter()
            .all(|r| (r.reference == "a" && r.target == "b") || (r.reference == "b" && r.target == "a")));

        let failed: Vec<(&str, &str)> = summary
            .failures
            .iter()
            .map(|f| (f.reference.as_str(), f.target.as_str()))
            .collect();
        assert_eq!(failed, vec![("a", "c"), ("b", "c"), ("c", "a"), ("c", "b")]);
        for failure in &summary.failures {
            match &failure.error {
                GocError::InvalidSpecies(species, cause) => {
                    assert_eq!(species, "c");
                    assert!(
                        matches!(cause.as_ref(), GocError::UnknownPart(part, gene) if part == "nowhere" && gene == "c2")
                    );
                }
                other => panic!("unexpected error: {}", other),
            }
        }
    }

    #[test]
    fn test_failed_pair_does_not_abort() {
        let (mut genes, parts, mut orthologs) = fixture(10);
        // an ortholog of a0 in "b" that is not one of its protein-coding genes
        genes.push(gene("b_rna".into(), "b", FeatureKind::Other("rRNA".into()), 5));
        orthologs.insert(0, OrthologPair::new("a0", "b_rna"));
        let store = MemoryStore::new(genes, parts, orthologs).unwrap();

        let mut records: Vec<GocRecord> = Vec::new();
        let summary = compute_goc(&store, &mut records, &RunOptions::default()).unwrap();
        assert_eq!(summary.failures.len(), 1);
        let failure = &summary.failures[0];
        assert_eq!((failure.reference.as_str(), failure.target.as_str()), ("a", "b"));
        assert!(matches!(&failure.error, GocError::NotInOrder(gene, _) if gene == "b_rna"));
        assert_eq!(summary.pairs, 5);
        assert_eq!(records.len(), 3 * window_count(10));
    }
}
