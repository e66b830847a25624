use clap::{Parser, Subcommand};
use goc::prelude::*;
use log::{error, info};
use std::path::Path;

const INFO: &str = "\
goc: pairwise Gene Order Conservation between genomes
usage: goc [--help] <subcommand>

Subcommands:

  compute: score every species pair of a SQLite annotation database.
  tsv:     score every species pair of tab-separated annotation tables.

";

#[derive(Parser)]
#[clap(name = "goc")]
#[clap(about = INFO)]
struct Cli {
    /// Increase log verbosity (-d progress, -dd details); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute GOC for every ordered pair of species in a SQLite annotation database.
    ///
    /// The database must hold the `genes`, `genome_parts` and `orthos` tables.
    /// Results go to its `goc` table with columns:
    ///
    ///  - reference species
    ///  - target species
    ///  - position in the reference's full gene order (0-indexed)
    ///  - GOC score in [0, 1]
    ///
    /// Example:
    ///
    ///  $ goc -d compute annotations.db --threads 8
    Compute {
        /// path to the SQLite annotation database
        #[arg(required = true)]
        database: String,
        /// keep existing `goc` rows instead of recreating the table
        #[arg(long, default_value_t = false)]
        append: bool,
        /// number of worker threads (default: one per core)
        #[arg(long)]
        threads: Option<usize>,
    },
    /// Compute GOC from tab-separated annotation tables (plain or gzip).
    ///
    /// Tables follow the database columns: genes (pid, sp, feat, gpart,
    /// loc_start), parts (gpart, min) and orthologs (pid1, pid2).
    /// Output is a TSV with columns sp1, sp2, pos, score.
    ///
    /// Example:
    ///
    ///  $ goc tsv --genes genes.tsv.gz --parts parts.tsv --orthologs orthos.tsv.gz \
    ///      --output goc.tsv.gz
    Tsv {
        /// the gene table
        #[arg(long, required = true)]
        genes: String,
        /// the genomic part table
        #[arg(long, required = true)]
        parts: String,
        /// the ortholog table
        #[arg(long, required = true)]
        orthologs: String,
        /// the output file path (if not set, uses standard out)
        #[arg(long)]
        output: Option<String>,
        /// append to the output file instead of overwriting it
        #[arg(long, default_value_t = false)]
        append: bool,
        /// number of worker threads (default: one per core)
        #[arg(long)]
        threads: Option<usize>,
    },
}

fn init_logging(debug: u8) {
    let level = match debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn sink_mode(append: bool) -> SinkMode {
    if append {
        SinkMode::Append
    } else {
        SinkMode::Reset
    }
}

fn report(summary: &RunSummary) {
    info!(
        "{} species pairs scored, {} GOC records written",
        summary.pairs, summary.records
    );
    for failure in &summary.failures {
        error!(
            "{} vs {}: {}",
            failure.reference, failure.target, failure.error
        );
    }
}

fn compute_database(
    database: &str,
    append: bool,
    options: &RunOptions,
) -> Result<RunSummary, GocError> {
    let database = GocDatabase::open(database)?;
    let mut sink = database.sink(sink_mode(append))?;
    compute_goc(&database.store(), &mut sink, options)
}

fn compute_tsv(
    genes: &str,
    parts: &str,
    orthologs: &str,
    output: Option<&str>,
    append: bool,
    options: &RunOptions,
) -> Result<RunSummary, GocError> {
    let store = MemoryStore::from_tsv(genes, parts, orthologs)?;
    let mut sink = TsvSink::new(output.map(Path::new), sink_mode(append))?;
    let summary = compute_goc(&store, &mut sink, options)?;
    sink.finish()?;
    Ok(summary)
}

fn run() -> Result<RunSummary, GocError> {
    let cli = Cli::parse();
    init_logging(cli.debug);
    match &cli.command {
        Some(Commands::Compute {
            database,
            append,
            threads,
        }) => compute_database(database, *append, &RunOptions { threads: *threads }),
        Some(Commands::Tsv {
            genes,
            parts,
            orthologs,
            output,
            append,
            threads,
        }) => compute_tsv(
            genes,
            parts,
            orthologs,
            output.as_deref(),
            *append,
            &RunOptions { threads: *threads },
        ),
        None => {
            println!("{}\n", INFO);
            std::process::exit(1);
        }
    }
}

fn main() {
    match run() {
        Ok(summary) => {
            report(&summary);
            if !summary.is_complete() {
                std::process::exit(2);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
