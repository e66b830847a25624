//! Pairwise Gene Order Conservation (GOC) profiles between genomes.
//!
//! For every ordered pair of species in an annotation store, a window of
//! reference protein-coding genes slides along the reference genome, and
//! each window is scored in [0, 1] by how much of it lies in runs of genes
//! whose orthologs are adjacent in the target genome (see [`synteny`]).
//!
//! Annotations are read through an [`AnnotationStore`], either the SQLite
//! annotation database ([`GocDatabase`]) or tab-separated tables
//! ([`MemoryStore`]), and records go to a [`GocSink`].
//!
//! ```no_run
//! use goc::prelude::*;
//!
//! let database = GocDatabase::open("annotations.db").expect("no database");
//! let mut sink = database.sink(SinkMode::Reset).expect("cannot create goc table");
//! let summary = compute_goc(&database.store(), &mut sink, &RunOptions::default())
//!                   .expect("GOC computation failed");
//!
//! for failure in &summary.failures {
//!     eprintln!("{} vs {}: {}", failure.reference, failure.target, failure.error);
//! }
//! ```
//!
//! This example can be run on the command line with:
//!
//! ```bash
//! cargo run --features cli -- compute annotations.db
//! ```

pub mod file;
pub mod genome;
pub mod goc;
#[cfg(test)]
mod numeric;
pub mod orthologs;
pub mod sink;
pub mod sqlite;
pub mod store;
pub mod synteny;

pub use goc::{compute_goc, GocError, PairFailure, RunOptions, RunSummary};
pub use sink::{GocSink, SinkMode, TsvSink};
pub use sqlite::GocDatabase;
pub use store::{AnnotationStore, MemoryStore};
pub use synteny::{scan, GocRecord};

pub mod prelude {
    pub use crate::genome::{Gene, GeneOrder, GeneSelection, Genome, GenomicPart};
    pub use crate::goc::{compute_goc, GocError, RunOptions, RunSummary};
    pub use crate::orthologs::{OrthologIndex, OrthologPair};
    pub use crate::sink::{GocSink, SinkMode, TsvSink};
    pub use crate::sqlite::GocDatabase;
    pub use crate::store::{AnnotationStore, MemoryStore};
    pub use crate::synteny::{scan, window_length, GocRecord};
}
