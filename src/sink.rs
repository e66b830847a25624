//! Destinations for GOC records.

use std::io::{self, Write};
use std::path::Path;

use crate::file::{OutputFile, OutputWriter};
use crate::goc::GocError;
use crate::synteny::GocRecord;

/// Column names of a GOC table.
pub const GOC_COLUMNS: [&str; 4] = ["sp1", "sp2", "pos", "score"];

/// How a sink treats a destination that already holds GOC records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkMode {
    /// Discard existing records before the first batch.
    #[default]
    Reset,
    /// Keep existing records and add new batches after them.
    Append,
}

/// Receives the GOC records of one species pair at a time.
pub trait GocSink {
    /// Store the records of the (`reference`, `target`) pair. Called exactly
    /// once per scored pair, even if `records` is empty.
    fn write_batch(
        &mut self,
        reference: &str,
        target: &str,
        records: &[GocRecord],
    ) -> Result<(), GocError>;
}

/// Collects records in memory.
impl GocSink for Vec<GocRecord> {
    fn write_batch(&mut self, _: &str, _: &str, records: &[GocRecord]) -> Result<(), GocError> {
        self.extend_from_slice(records);
        Ok(())
    }
}

/// Writes records as tab-separated rows.
pub struct TsvSink {
    writer: csv::Writer<OutputWriter>,
}

impl TsvSink {
    /// Open a GOC table for writing.
    ///
    /// # Arguments
    ///  * `filepath`: the output path, or standard out if `None`. A `.gz`
    ///    extension gzip-compresses the output.
    ///  * `mode`: whether an existing table is truncated or appended to. A
    ///    header line is written unless appending to a non-empty file.
    pub fn new(filepath: Option<&Path>, mode: SinkMode) -> Result<Self, GocError> {
        let header: Vec<String> = GOC_COLUMNS.iter().map(|c| c.to_string()).collect();
        let writer = match filepath {
            Some(path) => OutputFile::new(path, Some(header)).writer(mode == SinkMode::Append)?,
            None => {
                let mut stdout = OutputWriter::Stdout(io::stdout());
                if mode == SinkMode::Reset {
                    writeln!(stdout, "{}", header.join("\t"))?;
                }
                stdout
            }
        };
        let writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(writer);
        Ok(Self { writer })
    }

    /// Flush the remaining rows and close the table, completing the gzip
    /// stream of a `.gz` output.
    pub fn finish(self) -> Result<(), GocError> {
        let writer = self
            .writer
            .into_inner()
            .map_err(|e| io::Error::new(e.error().kind(), e.error().to_string()))?;
        writer.finish()?;
        Ok(())
    }
}

impl GocSink for TsvSink {
    fn write_batch(&mut self, _: &str, _: &str, records: &[GocRecord]) -> Result<(), GocError> {
        for record in records {
            self.writer.serialize(record)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::InputFile;
    use std::io::Read;
    use tempfile::tempdir;

    fn record(pos: usize, score: f64) -> GocRecord {
        GocRecord {
            reference: "a".to_string(),
            target: "b".to_string(),
            position: pos,
            score,
        }
    }

    fn read_rows(path: &Path) -> Vec<String> {
        let mut contents = String::new();
        InputFile::new(path)
            .reader()
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        contents.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_tsv_sink_reset_and_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("goc.tsv.gz");
        let mut sink = TsvSink::new(Some(&path), SinkMode::Reset).unwrap();
        sink.write_batch("a", "b", &[record(2, 0.5), record(3, 1.0)])
            .unwrap();
        sink.write_batch("a", "c", &[]).unwrap();
        sink.finish().unwrap();

        let mut sink = TsvSink::new(Some(&path), SinkMode::Append).unwrap();
        sink.write_batch("a", "b", &[record(4, 0.25)]).unwrap();
        sink.finish().unwrap();
        let rows = read_rows(&path);
        assert_eq!(rows[0], "sp1\tsp2\tpos\tscore");
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], "a\tb\t2\t0.5");
        assert_eq!(rows[3], "a\tb\t4\t0.25");

        let mut sink = TsvSink::new(Some(&path), SinkMode::Reset).unwrap();
        sink.write_batch("a", "b", &[record(9, 0.0)]).unwrap();
        sink.finish().unwrap();
        assert_eq!(read_rows(&path).len(), 2);
    }

    #[test]
    fn test_vec_sink() {
        let mut sink: Vec<GocRecord> = Vec::new();
        sink.write_batch("a", "b", &[record(1, 0.0)]).unwrap();
        sink.write_batch("a", "b", &[record(2, 1.0)]).unwrap();
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[1].position, 2);
    }
}
