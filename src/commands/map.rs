//! The `mem` subcommand: stream reads against a loaded index.
//!
//! Reads are processed in fixed-size batches mapped in parallel; results
//! are written in input order, so the output is identical to a
//! single-threaded run. Per-read problems (ambiguous bases, out-of-range
//! length, nothing mapped) degrade to an `NA` line and the stream
//! continues.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::info;
use rayon::prelude::*;

use crate::error::{Result, SeamError};
use crate::genome::Genome;
use crate::index::Index;
use crate::mapper::{Alignment, Mapper, GAMMA, MAX_READ_LEN};
use crate::quality::quality;

/// Reads mapped per parallel batch.
const BATCH_SIZE: usize = 1024;

/// Outcome of one read, computed in the parallel stage. The tie-breaking
/// round robin depends on read order and stays in the sequential writer.
enum Outcome {
    Unmapped,
    Unique(Alignment, f64),
    Tied(Vec<Alignment>),
}

pub struct MemCommand {
    batch_size: usize,
    min_seed: usize,
}

impl MemCommand {
    pub fn new() -> Self {
        MemCommand {
            batch_size: BATCH_SIZE,
            min_seed: GAMMA,
        }
    }

    /// Minimum seed length override, used by tests on toy references.
    pub fn with_min_seed(mut self, min_seed: usize) -> Self {
        self.min_seed = min_seed;
        self
    }

    /// Map every read in `reads` against the index at `prefix`, writing
    /// one line per read to `out`.
    pub fn run<W: Write>(&self, prefix: &Path, reads: &Path, out: W) -> Result<()> {
        info!("loading index {}", prefix.display());
        let index = Index::load(prefix)?;

        // The artifacts hold only packed structures; the text itself is
        // re-derived from the reference with the recorded seed.
        let genome = Genome::from_fasta(prefix, index.chroms.seed)?;
        if genome.text.len() as u64 != index.txtlen() {
            return Err(SeamError::CorruptIndex(
                "reference no longer matches the index".into(),
            ));
        }
        info!("index ready ({} bp)", index.txtlen());

        let mapper = Mapper::with_gamma(&index, &genome.text, self.min_seed);
        let file = File::open(reads).map_err(|source| SeamError::Open {
            path: reads.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(file);
        let mut writer = ResultWriter::new(out);

        let mut mapped_count = 0usize;
        let mut batch: Vec<String> = Vec::with_capacity(self.batch_size);
        loop {
            batch.clear();
            fill_batch(&mut reader, &mut batch, self.batch_size)?;
            if batch.is_empty() {
                break;
            }
            let outcomes: Vec<Outcome> = batch
                .par_iter()
                .map(|read| process(&mapper, &index, &genome.text, read))
                .collect();
            for (read, outcome) in batch.iter().zip(outcomes) {
                emit(&mut writer, read, outcome, &genome, &mut mapped_count)?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

impl Default for MemCommand {
    fn default() -> Self {
        Self::new()
    }
}

fn fill_batch<R: BufRead>(reader: &mut R, batch: &mut Vec<String>, cap: usize) -> Result<()> {
    let mut line = String::new();
    while batch.len() < cap {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        batch.push(line.trim_end().to_string());
    }
    Ok(())
}

fn process(mapper: &Mapper, index: &Index, text: &[u8], read: &str) -> Outcome {
    let len = read.len();
    if len >= MAX_READ_LEN {
        return Outcome::Unmapped;
    }
    let mut alignments = mapper.map(read.as_bytes());
    match alignments.len() {
        0 => Outcome::Unmapped,
        1 => {
            // The posterior is only defined for reads inside the quality
            // model's length window; unique hits outside it degrade to NA.
            // Tied stacks carry their own probability at any length.
            let best = alignments.remove(0);
            match quality(index, text, &best, len) {
                Ok(prob) => Outcome::Unique(best, prob),
                Err(_) => Outcome::Unmapped,
            }
        }
        _ => Outcome::Tied(alignments),
    }
}

fn emit<W: Write>(
    writer: &mut ResultWriter<W>,
    read: &str,
    outcome: Outcome,
    genome: &Genome,
    mapped_count: &mut usize,
) -> Result<()> {
    match outcome {
        Outcome::Unmapped => writer.write_na(read),
        Outcome::Unique(aln, prob) => {
            *mapped_count += 1;
            writer.write_hit(read, genome, &aln, prob)
        }
        Outcome::Tied(alignments) => {
            // Round robin over tied positions, advancing once per mapped
            // read so repeated queries cycle through the candidates.
            let pick = alignments[*mapped_count % alignments.len()];
            *mapped_count += 1;
            let prob = 1.0 - 1.0 / alignments.len() as f64;
            writer.write_hit(read, genome, &pick, prob)
        }
    }
}

/// Buffered result writer: `<read>\t<chr>:<strand>:<pos>\t<prob>`.
struct ResultWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
}

impl<W: Write> ResultWriter<W> {
    fn new(out: W) -> Self {
        ResultWriter {
            writer: BufWriter::new(out),
            itoa_buf: itoa::Buffer::new(),
        }
    }

    fn write_na(&mut self, read: &str) -> Result<()> {
        self.writer.write_all(read.as_bytes())?;
        self.writer.write_all(b"\tNA\tNA\n")?;
        Ok(())
    }

    fn write_hit(&mut self, read: &str, genome: &Genome, aln: &Alignment, prob: f64) -> Result<()> {
        let loc = genome.chroms.resolve(aln.pos);
        self.writer.write_all(read.as_bytes())?;
        self.writer.write_all(b"\t")?;
        self.writer.write_all(loc.chrom.as_bytes())?;
        self.writer.write_all(b":")?;
        self.writer.write_all(&[loc.strand.symbol() as u8])?;
        self.writer.write_all(b":")?;
        self.writer
            .write_all(self.itoa_buf.format(loc.position).as_bytes())?;
        writeln!(self.writer, "\t{prob:.6}")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
