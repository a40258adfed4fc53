//! Reference genome normalization and the chromosome table.
//!
//! The indexed text is the concatenation of every chromosome, followed by
//! the reverse complement of that whole forward portion, terminated by the
//! sentinel. Reverse-strand hits thereby appear as plain forward matches in
//! the second half of the text.

use std::path::Path;

use log::debug;
use memchr::memchr_iter;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::alphabet::{complement, decode, SENTINEL};
use crate::error::{Result, SeamError};
use crate::store::{self, Header, Kind};

/// Strand of a resolved reference position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn symbol(self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

/// One chromosome of the forward reference.
#[derive(Debug, Clone)]
pub struct Chromosome {
    pub name: String,
    /// Offset of the chromosome's first base in the forward portion.
    pub start: u64,
}

/// Ordered chromosome list plus the normalization parameters needed to
/// re-derive the text deterministically.
#[derive(Debug, Clone)]
pub struct ChromTable {
    pub chroms: Vec<Chromosome>,
    /// Length of the forward portion (half of |T| - 1).
    pub forward_len: u64,
    /// Seed of the stream that replaced ambiguous bases.
    pub seed: u64,
}

/// A reference position resolved to genome coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefPosition<'a> {
    pub chrom: &'a str,
    pub strand: Strand,
    /// 1-based position within the chromosome.
    pub position: u64,
}

/// Normalized reference: the text queried by the index, and its table.
pub struct Genome {
    /// Uppercase ACGT bytes: forward + reverse complement + sentinel.
    pub text: Vec<u8>,
    pub chroms: ChromTable,
}

impl Genome {
    /// Read and normalize a FASTA file.
    pub fn from_fasta(path: &Path, seed: u64) -> Result<Genome> {
        let data = std::fs::read(path).map_err(|source| SeamError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        normalize(&data, seed)
    }
}

/// Normalize a FASTA byte image into the indexed text.
///
/// Header lines open a new chromosome named after the first word of the
/// header. Sequence bytes are uppercased; anything outside ACGT that is
/// not whitespace is replaced with a base drawn from a stream seeded with
/// `seed`, so two runs over the same input produce identical text.
pub fn normalize(data: &[u8], seed: u64) -> Result<Genome> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut text: Vec<u8> = Vec::with_capacity(data.len() * 2 + 1);
    let mut chroms: Vec<Chromosome> = Vec::new();
    let mut replaced: u64 = 0;

    let mut line_start = 0;
    for nl in memchr_iter(b'\n', data).chain(std::iter::once(data.len())) {
        if nl < line_start {
            continue;
        }
        let line = &data[line_start..nl];
        line_start = nl + 1;
        let line = match line.last() {
            Some(b'\r') => &line[..line.len() - 1],
            _ => line,
        };
        if line.is_empty() {
            continue;
        }
        if line[0] == b'>' {
            let name_end = line[1..]
                .iter()
                .position(|b| b.is_ascii_whitespace())
                .map(|p| p + 1)
                .unwrap_or(line.len());
            let name = String::from_utf8_lossy(&line[1..name_end]).into_owned();
            if name.is_empty() {
                return Err(SeamError::Fasta("empty sequence name".into()));
            }
            chroms.push(Chromosome { name, start: text.len() as u64 });
            continue;
        }
        if chroms.is_empty() {
            return Err(SeamError::Fasta("sequence data before first header".into()));
        }
        for &byte in line {
            let base = byte.to_ascii_uppercase();
            match base {
                b'A' | b'C' | b'G' | b'T' => text.push(base),
                _ if base.is_ascii_whitespace() => {}
                _ => {
                    text.push(decode(rng.gen_range(0..4u8)));
                    replaced += 1;
                }
            }
        }
    }

    if text.is_empty() {
        return Err(SeamError::Fasta("no sequence data".into()));
    }
    if replaced > 0 {
        debug!("replaced {replaced} ambiguous bases (seed {seed})");
    }

    let forward_len = text.len();
    for i in (0..forward_len).rev() {
        let base = text[i];
        text.push(complement(base));
    }
    text.push(SENTINEL);

    Ok(Genome {
        text,
        chroms: ChromTable {
            chroms,
            forward_len: forward_len as u64,
            seed,
        },
    })
}

impl ChromTable {
    /// Resolve a text position to chromosome coordinates. Positions in the
    /// second half of the text are reverse-strand hits and are mirrored
    /// back onto the forward reference.
    pub fn resolve(&self, pos: u64) -> RefPosition<'_> {
        let g = self.forward_len;
        debug_assert!(pos < 2 * g);
        let (fpos, strand) = if pos < g {
            (pos, Strand::Forward)
        } else {
            (2 * g - 1 - pos, Strand::Reverse)
        };
        let idx = self.chroms.partition_point(|c| c.start <= fpos) - 1;
        RefPosition {
            chrom: &self.chroms[idx].name,
            strand,
            position: fpos - self.chroms[idx].start + 1,
        }
    }

    /// Serialize the table to the `.chr` artifact.
    pub fn save(&self, prefix: &Path, txtlen: u64) -> Result<()> {
        let mut payload = Vec::new();
        for chrom in &self.chroms {
            store::push_u64(&mut payload, chrom.start);
            store::push_u64(&mut payload, chrom.name.len() as u64);
            payload.extend_from_slice(chrom.name.as_bytes());
        }
        let header = Header::new(Kind::Chr, txtlen, self.seed, self.chroms.len() as u64);
        store::write_artifact(prefix, header, &payload)
    }

    /// Load the table from the `.chr` artifact.
    pub fn load(prefix: &Path) -> Result<(ChromTable, u64)> {
        let (header, blob) = store::map_artifact(prefix, Kind::Chr)?;
        let bytes: &[u8] = &blob;
        let nchr = header.p1 as usize;
        let mut chroms = Vec::with_capacity(nchr);
        let mut offset = 0usize;
        for _ in 0..nchr {
            if offset + 16 > bytes.len() {
                return Err(SeamError::CorruptIndex("truncated chromosome table".into()));
            }
            let start = store::read_u64_at(bytes, offset);
            let name_len = store::read_u64_at(bytes, offset + 8) as usize;
            offset += 16;
            if offset + name_len > bytes.len() {
                return Err(SeamError::CorruptIndex("truncated chromosome name".into()));
            }
            let name = String::from_utf8_lossy(&bytes[offset..offset + name_len]).into_owned();
            offset += name_len;
            chroms.push(Chromosome { name, start });
        }
        if chroms.is_empty() {
            return Err(SeamError::CorruptIndex("empty chromosome table".into()));
        }
        let table = ChromTable {
            chroms,
            forward_len: (header.txtlen - 1) / 2,
            seed: header.p0,
        };
        Ok((table, header.txtlen))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_normalize_two_chromosomes() {
        let fasta = b">chr1 description\nACGt\nACGT\n>chr2\nTTTT\n";
        let genome = normalize(fasta, 0).unwrap();

        assert_eq!(genome.chroms.forward_len, 12);
        assert_eq!(genome.text.len(), 25);
        assert_eq!(&genome.text[..12], b"ACGTACGTTTTT");
        // Reverse complement of the whole forward portion.
        assert_eq!(&genome.text[12..24], b"AAAAACGTACGT");
        assert_eq!(genome.text[24], b'$');

        assert_eq!(genome.chroms.chroms[0].name, "chr1");
        assert_eq!(genome.chroms.chroms[0].start, 0);
        assert_eq!(genome.chroms.chroms[1].name, "chr2");
        assert_eq!(genome.chroms.chroms[1].start, 8);
    }

    #[test]
    fn test_ambiguous_bases_are_deterministic() {
        let fasta = b">c\nANNNNNNNNGT\n";
        let a = normalize(fasta, 7).unwrap();
        let b = normalize(fasta, 7).unwrap();
        let c = normalize(fasta, 8).unwrap();

        assert_eq!(a.text, b.text);
        assert!(a.text.iter().all(|&b| b"ACGT$".contains(&b)));
        // A different seed draws a different stream; with 8 random bases a
        // collision is all but impossible.
        assert_ne!(a.text, c.text);
    }

    #[test]
    fn test_rejects_headerless_sequence() {
        assert!(normalize(b"ACGT\n", 0).is_err());
        assert!(normalize(b"", 0).is_err());
    }

    #[test]
    fn test_resolve_both_strands() {
        let fasta = b">chr1\nACGTACGT\n>chr2\nGGGG\n";
        let genome = normalize(fasta, 0).unwrap();
        let table = &genome.chroms;

        let fwd = table.resolve(9);
        assert_eq!(fwd.chrom, "chr2");
        assert_eq!(fwd.strand, Strand::Forward);
        assert_eq!(fwd.position, 2);

        // Mirror of position 9 in the reverse-complement half.
        let rev = table.resolve(2 * 12 - 1 - 9);
        assert_eq!(rev.chrom, "chr2");
        assert_eq!(rev.strand, Strand::Reverse);
        assert_eq!(rev.position, 2);
    }

    #[test]
    fn test_chrom_table_roundtrip() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("ref.fa");
        let fasta = b">alpha\nACGTACGT\n>beta\nGGGG\n";
        let genome = normalize(fasta, 3).unwrap();
        let txtlen = genome.text.len() as u64;

        genome.chroms.save(&prefix, txtlen).unwrap();
        let (table, loaded_len) = ChromTable::load(&prefix).unwrap();

        assert_eq!(loaded_len, txtlen);
        assert_eq!(table.seed, 3);
        assert_eq!(table.forward_len, genome.chroms.forward_len);
        assert_eq!(table.chroms.len(), 2);
        assert_eq!(table.chroms[1].name, "beta");
        assert_eq!(table.chroms[1].start, 8);
    }
}
