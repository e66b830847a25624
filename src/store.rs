//! Read access to gene annotations and ortholog relations.
//!
//! [`AnnotationStore`] is what GOC scoring needs from an annotation
//! database. [`MemoryStore`] keeps everything in memory and can be loaded
//! from tab-separated tables; the SQLite implementation lives in
//! [`crate::sqlite`].

use indexmap::{IndexMap, IndexSet};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;

use crate::file::InputFile;
use crate::genome::{
    FeatureKind, Gene, GeneOrder, GeneSelection, Genome, GenomicPart, Position, SpeciesId,
};
use crate::goc::GocError;
use crate::orthologs::OrthologPair;

/// Source of ordered gene sequences and ortholog pairs.
pub trait AnnotationStore {
    /// All species with at least one gene, in a stable order.
    fn species(&self) -> Result<Vec<SpeciesId>, GocError>;

    /// The selected genes of `species`, ordered by (part rank, start).
    fn gene_order(&self, species: &str, selection: GeneSelection) -> Result<GeneOrder, GocError>;

    /// Ortholog pairs from protein-coding genes of `reference` to genes of
    /// `target`, in the relation's own order.
    fn ortholog_pairs(&self, reference: &str, target: &str)
        -> Result<Vec<OrthologPair>, GocError>;

    /// Read the full and protein-coding gene orders of `species`.
    fn genome(&self, species: &str) -> Result<Genome, GocError> {
        Ok(Genome {
            species: species.to_string(),
            all: self.gene_order(species, GeneSelection::All)?,
            cds: self.gene_order(species, GeneSelection::ProteinCoding)?,
        })
    }
}

/// An in-memory annotation store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    genes: Vec<Gene>,
    by_id: IndexMap<String, usize>,
    parts: IndexMap<String, GenomicPart>,
    orthologs: Vec<OrthologPair>,
}

#[derive(Debug, Deserialize)]
struct GeneRow {
    pid: String,
    sp: String,
    feat: FeatureKind,
    gpart: String,
    loc_start: Position,
}

#[derive(Debug, Deserialize)]
struct PartRow {
    gpart: String,
    min: Position,
}

#[derive(Debug, Deserialize)]
struct OrthologRow {
    pid1: String,
    pid2: String,
}

/// Read a tab-delimited table, with or without a header line.
///
/// The header, when present, must start with `first_column`. Lines starting
/// with `#` are skipped.
fn read_table<T: DeserializeOwned>(filepath: &Path, first_column: &str) -> Result<Vec<T>, GocError> {
    let input_file = InputFile::new(filepath);
    let has_header = input_file.has_header(first_column)?;
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(has_header)
        .comment(Some(b'#'))
        .from_reader(input_file.reader()?);
    let rows = rdr.deserialize().collect::<Result<Vec<T>, csv::Error>>()?;
    Ok(rows)
}

impl MemoryStore {
    /// Create a store, checking that gene identifiers are unique.
    pub fn new(
        genes: Vec<Gene>,
        parts: IndexMap<String, GenomicPart>,
        orthologs: Vec<OrthologPair>,
    ) -> Result<Self, GocError> {
        let mut by_id = IndexMap::with_capacity(genes.len());
        for (i, gene) in genes.iter().enumerate() {
            if by_id.insert(gene.id.clone(), i).is_some() {
                return Err(GocError::DuplicateGene(gene.id.clone()));
            }
        }
        Ok(Self {
            genes,
            by_id,
            parts,
            orthologs,
        })
    }

    /// Load a store from three tab-separated tables (plain or gzip).
    ///
    /// Columns follow the annotation database schema:
    ///
    /// ```text
    /// genes:     pid  sp  feat  gpart  loc_start
    /// parts:     gpart  min
    /// orthologs: pid1  pid2
    /// ```
    ///
    /// Header lines are optional; when present, columns are matched by name.
    ///
    /// # Arguments
    ///  * `genes`: path to the gene table.
    ///  * `parts`: path to the genomic part table.
    ///  * `orthologs`: path to the ortholog pair table.
    ///
    /// # Returns
    ///
    /// The store, or an error if a table cannot be read or a gene identifier
    /// occurs twice.
    pub fn from_tsv<P, Q, R>(genes: P, parts: Q, orthologs: R) -> Result<Self, GocError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        R: AsRef<Path>,
    {
        let genes = read_table::<GeneRow>(genes.as_ref(), "pid")?
            .into_iter()
            .map(|row| Gene {
                id: row.pid,
                species: row.sp,
                feature: row.feat,
                part: row.gpart,
                start: row.loc_start,
            })
            .collect();
        let parts = read_table::<PartRow>(parts.as_ref(), "gpart")?
            .into_iter()
            .map(|row| {
                let part = GenomicPart {
                    id: row.gpart.clone(),
                    rank: row.min,
                };
                (row.gpart, part)
            })
            .collect();
        let orthologs = read_table::<OrthologRow>(orthologs.as_ref(), "pid1")?
            .into_iter()
            .map(|row| OrthologPair::new(row.pid1, row.pid2))
            .collect();
        Self::new(genes, parts, orthologs)
    }

    fn gene(&self, id: &str) -> Option<&Gene> {
        self.by_id.get(id).map(|&i| &self.genes[i])
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    pub fn parts(&self) -> &IndexMap<String, GenomicPart> {
        &self.parts
    }

    pub fn orthologs(&self) -> &[OrthologPair] {
        &self.orthologs
    }
}

impl AnnotationStore for MemoryStore {
    fn species(&self) -> Result<Vec<SpeciesId>, GocError> {
        let species: IndexSet<&String> = self.genes.iter().map(|gene| &gene.species).collect();
        Ok(species.into_iter().cloned().collect())
    }

    fn gene_order(&self, species: &str, selection: GeneSelection) -> Result<GeneOrder, GocError> {
        GeneOrder::from_genes(&self.genes, &self.parts, species, selection)
    }

    fn ortholog_pairs(
        &self,
        reference: &str,
        target: &str,
    ) -> Result<Vec<OrthologPair>, GocError> {
        let pairs = self
            .orthologs
            .iter()
            .filter(|pair| {
                let source = self.gene(&pair.source);
                let dest = self.gene(&pair.target);
                match (source, dest) {
                    (Some(source), Some(dest)) => {
                        source.species == reference
                            && source.feature.is_protein_coding()
                            && dest.species == target
                    }
                    _ => false,
                }
            })
            .cloned()
            .collect();
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_store() -> MemoryStore {
        MemoryStore::from_tsv(
            "tests/data/genes.tsv",
            "tests/data/parts.tsv",
            "tests/data/orthologs.tsv",
        )
        .unwrap()
    }

    #[test]
    fn test_tsv_read() {
        let store = read_store();
        assert_eq!(store.genes().len(), 17);
        assert_eq!(store.parts().len(), 3);
        assert_eq!(store.orthologs().len(), 13);
        assert_eq!(store.species().unwrap(), vec!["ecoli", "salmo"]);
    }

    #[test]
    fn test_gene_orders() {
        let store = read_store();
        let genome = store.genome("ecoli").unwrap();
        // chr2 has the lower rank and comes first
        assert_eq!(
            genome.cds.iter().collect::<Vec<_>>(),
            vec!["e5", "e6", "e7", "e1", "e2", "e3", "e4"]
        );
        assert_eq!(genome.all.len(), 9);
        assert_eq!(genome.all.position_of("e1"), Some(4));
    }

    #[test]
    fn test_ortholog_pairs_restricted() {
        let store = read_store();
        let pairs = store.ortholog_pairs("ecoli", "salmo").unwrap();
        // the tRNA pair and the reverse-direction pairs are excluded, the
        // conflicting e2 pair is kept in table order
        assert_eq!(pairs.len(), 6);
        assert_eq!(pairs[1], OrthologPair::new("e2", "s2"));
        assert_eq!(pairs[2], OrthologPair::new("e2", "s3"));
        assert!(pairs.iter().all(|p| p.source.starts_with('e')));
        assert_eq!(pairs[0], OrthologPair::new("e1", "s1"));
        assert!(store.ortholog_pairs("ecoli", "nobody").unwrap().is_empty());
    }

    #[test]
    fn test_headerless_gzip_table() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let genes = dir.path().join("genes.tsv.gz");
        let mut encoder = GzEncoder::new(
            std::fs::File::create(&genes).unwrap(),
            Compression::default(),
        );
        write!(encoder, "g1\tsp\tCDS\tc\t10\n# comment\ng2\tsp\ttRNA\tc\t5\n").unwrap();
        encoder.finish().unwrap();
        let parts = dir.path().join("parts.tsv");
        std::fs::write(&parts, "c\t0\n").unwrap();
        let orthologs = dir.path().join("orthologs.tsv");
        std::fs::write(&orthologs, "").unwrap();

        let store = MemoryStore::from_tsv(&genes, &parts, &orthologs).unwrap();
        let genome = store.genome("sp").unwrap();
        assert_eq!(genome.all.iter().collect::<Vec<_>>(), vec!["g2", "g1"]);
        assert_eq!(genome.cds.len(), 1);
        assert!(store.orthologs().is_empty());
    }

    #[test]
    fn test_duplicate_gene_rejected() {
        let gene = Gene {
            id: "g".to_string(),
            species: "sp".to_string(),
            feature: FeatureKind::Cds,
            part: "c".to_string(),
            start: 0,
        };
        let result = MemoryStore::new(vec![gene.clone(), gene], IndexMap::new(), Vec::new());
        assert!(matches!(result, Err(GocError::DuplicateGene(_))));
    }
}
