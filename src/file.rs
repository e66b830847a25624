//! Plaintext and gzip-compressed table input and output.
//!
//! Annotation tables ([`InputFile`]) may arrive either uncompressed or
//! gzip-compressed; compression is detected from the magic bytes, not the
//! extension. GOC tables ([`OutputFile`]) are compressed when the path ends
//! in `.gz`.
//!
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    IOError(#[from] io::Error),
}

/// Check if a file is gzipped by looking for the magic numbers.
///
/// Files shorter than two bytes are never gzipped.
fn is_gzipped_file(file_path: &Path) -> io::Result<bool> {
    let mut file = File::open(file_path)?;
    let mut buffer = [0; 2];
    match file.read_exact(&mut buffer) {
        Ok(()) => Ok(buffer == [0x1f, 0x8b]),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// A tab-separated input table, possibly gzip-compressed.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub filepath: PathBuf,
}

impl InputFile {
    pub fn new<P: AsRef<Path>>(filepath: P) -> Self {
        Self {
            filepath: filepath.as_ref().to_path_buf(),
        }
    }

    /// Opens the file and returns a buffered reader, decompressing if needed.
    ///
    /// Multi-member gzip streams (e.g. produced by appending to a `.gz` GOC
    /// table) are read through to the end.
    pub fn reader(&self) -> Result<BufReader<Box<dyn Read>>, FileError> {
        let file = File::open(&self.filepath)?;
        let reader: Box<dyn Read> = if is_gzipped_file(&self.filepath)? {
            Box::new(MultiGzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok(BufReader::new(reader))
    }

    /// Checks whether the first line of the file starts with `expect`.
    pub fn has_header(&self, expect: &str) -> Result<bool, FileError> {
        let mut buf_reader = self.reader()?;
        let mut first_line = String::new();
        buf_reader.read_line(&mut first_line)?;
        Ok(first_line.starts_with(expect))
    }
}

/// A tab-separated output table, gzip-compressed if the path ends in `.gz`.
#[derive(Debug, Clone)]
pub struct OutputFile {
    pub filepath: PathBuf,
    /// Column names, written as the first line when the file is created.
    pub header: Option<Vec<String>>,
}

impl OutputFile {
    pub fn new<P: AsRef<Path>>(filepath: P, header: Option<Vec<String>>) -> Self {
        Self {
            filepath: filepath.as_ref().to_path_buf(),
            header,
        }
    }

    fn is_gzip(&self) -> bool {
        self.filepath
            .extension()
            .map_or(false, |ext| ext == "gz")
    }

    /// Opens the file for writing.
    ///
    /// # Arguments
    ///  * `append`: if set, rows are added after any existing content and
    ///    the header is only written if the file did not exist (or was
    ///    empty). Otherwise the file is truncated and the header written.
    ///
    /// # Returns
    ///
    /// A buffered [`OutputWriter`]. Call [`OutputWriter::finish`] once done
    /// so that a gzip stream gets its trailer and write errors surface.
    pub fn writer(&self, append: bool) -> Result<OutputWriter, FileError> {
        let pristine = !append
            || std::fs::metadata(&self.filepath).map_or(true, |meta| meta.len() == 0);
        let file = if append {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.filepath)?
        } else {
            File::create(&self.filepath)?
        };
        let mut writer = if self.is_gzip() {
            OutputWriter::Gzip(BufWriter::new(GzEncoder::new(file, Compression::default())))
        } else {
            OutputWriter::Plain(BufWriter::new(file))
        };
        if pristine {
            if let Some(columns) = &self.header {
                writeln!(writer, "{}", columns.join("\t"))?;
            }
        }
        Ok(writer)
    }
}

/// A destination for an output table.
pub enum OutputWriter {
    Plain(BufWriter<File>),
    Gzip(BufWriter<GzEncoder<File>>),
    Stdout(io::Stdout),
}

impl OutputWriter {
    /// Flush all buffered output and, for gzip, write the stream trailer.
    pub fn finish(self) -> io::Result<()> {
        match self {
            OutputWriter::Plain(mut writer) => writer.flush(),
            OutputWriter::Gzip(writer) => {
                let encoder = writer.into_inner().map_err(|e| e.into_error())?;
                encoder.finish()?;
                Ok(())
            }
            OutputWriter::Stdout(mut stdout) => stdout.flush(),
        }
    }
}

impl Write for OutputWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputWriter::Plain(writer) => writer.write(buf),
            OutputWriter::Gzip(writer) => writer.write(buf),
            OutputWriter::Stdout(stdout) => stdout.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputWriter::Plain(writer) => writer.flush(),
            OutputWriter::Gzip(writer) => writer.flush(),
            OutputWriter::Stdout(stdout) => stdout.flush(),
        }
    }
}
