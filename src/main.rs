//! SEAM: seed-extend-and-map read mapper.
//!
//! Usage: seam <COMMAND> [OPTIONS]

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use log::error;

use seam_mapper::commands::{IndexCommand, MemCommand};
use seam_mapper::error::Result;

#[derive(Parser)]
#[command(name = "seam")]
#[command(version)]
#[command(about = "SEAM: FM-index read mapper with calibrated mapping confidence", long_about = None)]
struct Cli {
    /// Number of threads to use (default: number of CPUs)
    #[arg(long, short = 't', global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index files for a FASTA reference
    Index {
        /// Reference FASTA file; artifacts are written next to it
        fasta: PathBuf,

        /// Seed of the stream replacing ambiguous bases
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },

    /// Map reads against a previously built index
    Mem {
        /// Index prefix (the FASTA path given to `index`)
        index: PathBuf,

        /// Reads file, one read per line
        reads: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Configure thread pool if --threads specified
    if let Some(n) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .expect("Failed to initialize thread pool");
    }

    let result = match cli.command {
        Commands::Index { fasta, seed } => run_index(fasta, seed),
        Commands::Mem { index, reads } => run_mem(index, reads),
    };

    if let Err(err) = result {
        error!("{err}");
        process::exit(1);
    }
}

fn run_index(fasta: PathBuf, seed: u64) -> Result<()> {
    IndexCommand::new().with_seed(seed).run(&fasta)
}

fn run_mem(index: PathBuf, reads: PathBuf) -> Result<()> {
    let stdout = std::io::stdout();
    let handle = stdout.lock();
    MemCommand::new().run(&index, &reads, handle)
}
