//! SQLite-backed annotation store and GOC table.
//!
//! The annotation database holds the tables
//!
//! ```text
//! genes(pid TEXT, sp TEXT, feat TEXT, gpart TEXT, loc_start INTEGER)
//! genome_parts(gpart TEXT, min INTEGER)
//! orthos(pid1 TEXT, pid2 TEXT)
//! ```
//!
//! and receives GOC records in `goc(sp1 TEXT, sp2 TEXT, pos INTEGER, score REAL)`.
//!
//! A [`GocDatabase`] is the session: it owns the connection, and the
//! [`SqliteStore`] and [`SqliteSink`] views borrow it for the length of a run.

use rusqlite::Connection;
use std::path::Path;

use crate::genome::{GeneOrder, GeneSelection, Position, SpeciesId, CDS_FEATURE};
use crate::goc::GocError;
use crate::orthologs::OrthologPair;
use crate::sink::{GocSink, SinkMode};
use crate::store::AnnotationStore;
use crate::synteny::GocRecord;

/// An open annotation database.
#[derive(Debug)]
pub struct GocDatabase {
    connection: Connection,
}

impl GocDatabase {
    /// Opens the database in the given file, which must already exist.
    pub fn open<P: AsRef<Path>>(filename: P) -> Result<Self, GocError> {
        let filename = filename.as_ref();
        if !filename.is_file() {
            return Err(GocError::NoDatabase(filename.display().to_string()));
        }
        let connection = Connection::open(filename)?;
        Ok(Self { connection })
    }

    /// Wraps an existing connection.
    pub fn from_connection(connection: Connection) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Read access to the annotation tables.
    pub fn store(&self) -> SqliteStore<'_> {
        SqliteStore {
            connection: &self.connection,
        }
    }

    /// Write access to the `goc` table.
    pub fn sink(&self, mode: SinkMode) -> Result<SqliteSink<'_>, GocError> {
        SqliteSink::new(&self.connection, mode)
    }

    /// All records of the `goc` table, in insertion order.
    pub fn goc_records(&self) -> Result<Vec<GocRecord>, GocError> {
        let mut statement = self
            .connection
            .prepare("SELECT sp1, sp2, pos, score FROM goc ORDER BY rowid")?;
        let rows = statement.query_map((), |row| {
            let position: i64 = row.get(2)?;
            Ok(GocRecord {
                reference: row.get(0)?,
                target: row.get(1)?,
                position: position as usize,
                score: row.get(3)?,
            })
        })?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

/// Annotation queries against a [`GocDatabase`].
#[derive(Debug, Clone, Copy)]
pub struct SqliteStore<'a> {
    connection: &'a Connection,
}

impl<'a> AnnotationStore for SqliteStore<'a> {
    fn species(&self) -> Result<Vec<SpeciesId>, GocError> {
        let mut statement = self
            .connection
            .prepare("SELECT sp FROM genes GROUP BY sp ORDER BY MIN(rowid)")?;
        let species = statement
            .query_map((), |row| row.get(0))?
            .collect::<Result<Vec<SpeciesId>, _>>()?;
        Ok(species)
    }

    fn gene_order(&self, species: &str, selection: GeneSelection) -> Result<GeneOrder, GocError> {
        // Genes on unknown parts come back with a NULL rank and are rejected.
        let mut statement = self.connection.prepare(
            "SELECT g.pid, g.gpart, gp.min FROM genes g LEFT JOIN genome_parts gp ON g.gpart = gp.gpart
            WHERE g.sp = ?1 AND (?2 IS NULL OR g.feat = ?2)
            ORDER BY gp.min, g.loc_start, g.rowid ASC",
        )?;
        let feature = match selection {
            GeneSelection::All => None,
            GeneSelection::ProteinCoding => Some(CDS_FEATURE),
        };
        let mut ids = Vec::new();
        let mut rows = statement.query((species, feature))?;
        while let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            let rank: Option<Position> = row.get(2)?;
            if rank.is_none() {
                let part: String = row.get(1)?;
                return Err(GocError::UnknownPart(part, id));
            }
            ids.push(id);
        }
        GeneOrder::from_ids(ids)
    }

    fn ortholog_pairs(
        &self,
        reference: &str,
        target: &str,
    ) -> Result<Vec<OrthologPair>, GocError> {
        let mut statement = self.connection.prepare(
            "SELECT o.pid1, o.pid2
            FROM orthos o JOIN genes g1 ON o.pid1 = g1.pid JOIN genes g2 ON o.pid2 = g2.pid
            WHERE g1.sp = ?1 AND g1.feat = ?2 AND g2.sp = ?3
            ORDER BY o.rowid",
        )?;
        let pairs = statement
            .query_map((reference, CDS_FEATURE, target), |row| {
                Ok(OrthologPair {
                    source: row.get(0)?,
                    target: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pairs)
    }
}

/// Writes GOC batches into the `goc` table of a [`GocDatabase`].
#[derive(Debug)]
pub struct SqliteSink<'a> {
    connection: &'a Connection,
}

impl<'a> SqliteSink<'a> {
    /// Prepare the `goc` table: dropped and recreated with [`SinkMode::Reset`],
    /// created if missing with [`SinkMode::Append`].
    pub fn new(connection: &'a Connection, mode: SinkMode) -> Result<Self, GocError> {
        match mode {
            SinkMode::Reset => connection.execute_batch(
                "DROP TABLE IF EXISTS goc;
                CREATE TABLE goc(sp1 TEXT, sp2 TEXT, pos INTEGER, score REAL);",
            )?,
            SinkMode::Append => connection.execute_batch(
                "CREATE TABLE IF NOT EXISTS goc(sp1 TEXT, sp2 TEXT, pos INTEGER, score REAL);",
            )?,
        }
        Ok(Self { connection })
    }
}

impl<'a> GocSink for SqliteSink<'a> {
    /// Inserts the batch in a single transaction.
    fn write_batch(&mut self, _: &str, _: &str, records: &[GocRecord]) -> Result<(), GocError> {
        let transaction = self.connection.unchecked_transaction()?;
        {
            let mut insert = transaction
                .prepare_cached("INSERT INTO goc(sp1, sp2, pos, score) VALUES (?1, ?2, ?3, ?4)")?;
            for record in records {
                insert.execute((
                    &record.reference,
                    &record.target,
                    record.position as i64,
                    record.score,
                ))?;
            }
        }
        transaction.commit()?;
        Ok(())
    }
}
