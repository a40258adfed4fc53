//! MEM seeding and Hamming-scored candidate collection.
//!
//! A read is searched in both orientations. Each orientation is walked
//! right to left: the lookup table seeds a range from the last k bases,
//! rank queries extend it leftward until it empties, and the next seed
//! restarts strictly left of the failing base. Seeds at least Γ long are
//! materialized through the sampled suffix array and the candidate
//! windows scored by Hamming distance against the text.
//!
//! Hits from the reverse-complement orientation are mirrored into the
//! coordinates where the read itself aligns, so the same genomic locus
//! found through both orientations collapses into a single candidate.

use rustc_hash::FxHashSet;

use crate::alphabet::{encode_seq, revcomp};
use crate::index::Index;
use crate::lut::kmer_id;
use crate::occ::BwtRange;

/// Minimum seed length considered for alignment.
pub const GAMMA: usize = 17;

/// Reads must be longer than `GAMMA + 3` for the quality model; unique
/// hits on shorter reads have no posterior and are reported unmapped.
pub const MIN_READ_LEN: usize = GAMMA + 4;

/// Upper bound (exclusive) on supported read length.
pub const MAX_READ_LEN: usize = 250;

/// Cap on suffix-array positions materialized per seed.
const MAX_SEED_HITS: usize = 64;

/// A candidate alignment: where the read (as given) aligns in the text,
/// and how many bases disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alignment {
    pub pos: u64,
    pub score: u32,
}

/// One maximal exact stretch of an oriented read.
#[derive(Debug, Clone, Copy)]
struct Seed {
    range: BwtRange,
    /// Read offsets covered, `start..end`.
    start: usize,
    end: usize,
}

/// Read mapper borrowing the index and the normalized text.
pub struct Mapper<'a> {
    index: &'a Index,
    text: &'a [u8],
    gamma: usize,
}

impl<'a> Mapper<'a> {
    pub fn new(index: &'a Index, text: &'a [u8]) -> Mapper<'a> {
        Mapper::with_gamma(index, text, GAMMA)
    }

    /// Mapper with a custom minimum seed length (tests use small ones).
    pub fn with_gamma(index: &'a Index, text: &'a [u8], gamma: usize) -> Mapper<'a> {
        debug_assert_eq!(text.len() as u64, index.txtlen());
        Mapper { index, text, gamma }
    }

    /// Map one read and return the stack of best alignments, empty when
    /// the read contains a non-ACGT base or nothing seeds.
    pub fn map(&self, read: &[u8]) -> Vec<Alignment> {
        let len = read.len();
        let forward = read.to_ascii_uppercase();
        let Some(codes) = encode_seq(&forward) else {
            return Vec::new();
        };
        let reverse = revcomp(&forward);
        let rc_codes: Vec<u8> = codes.iter().rev().map(|&c| 3 - c).collect();

        let mut best: Vec<Alignment> = Vec::new();
        let mut best_score = u32::MAX;
        let mut seen: FxHashSet<u64> = FxHashSet::default();
        let mut positions = Vec::new();

        for (seq, codes, mirrored) in [(&forward, &codes, false), (&reverse, &rc_codes, true)] {
            for seed in self.collect_seeds(codes) {
                if seed.end - seed.start < self.gamma {
                    continue;
                }
                positions.clear();
                self.index
                    .locate_range(seed.range, MAX_SEED_HITS, &mut positions);
                for &hit in &positions {
                    let Some((pos, window)) = self.candidate(hit, seed.start, len, mirrored)
                    else {
                        continue;
                    };
                    if !seen.insert(pos) {
                        continue;
                    }
                    let window = window as usize;
                    let score = hamming(seq, &self.text[window..window + len]);
                    if score < best_score {
                        best_score = score;
                        best.clear();
                        best.push(Alignment { pos, score });
                    } else if score == best_score {
                        best.push(Alignment { pos, score });
                    }
                }
            }
        }
        best
    }

    /// Greedy MEM enumeration over one oriented, encoded read.
    fn collect_seeds(&self, codes: &[u8]) -> Vec<Seed> {
        let k = self.index.lut.k() as usize;
        let mut seeds = Vec::new();
        let mut end = codes.len();

        while end >= k {
            let range = self.index.lut.get(kmer_id(&codes[end - k..end]));
            if range.is_empty() {
                // The seeding k-mer itself is absent; slide one base left.
                end -= 1;
                continue;
            }
            let mut range = range;
            let mut start = end - k;
            while start > 0 {
                let next = self.index.occ.extend(codes[start - 1], range);
                if next.is_empty() {
                    break;
                }
                range = next;
                start -= 1;
            }
            seeds.push(Seed { range, start, end });
            if start == 0 {
                break;
            }
            // Restart strictly left of the base that broke the extension.
            end = start - 1;
        }
        seeds
    }

    /// Turn a suffix-array hit of a seed into (canonical read position,
    /// oriented window start), rejecting windows that leave the text or
    /// cross the sentinel. The canonical position is where the read as
    /// given aligns; for mirrored hits that is the reflection of the
    /// matched window into the other half of the text.
    fn candidate(
        &self,
        hit: u64,
        seed_start: usize,
        len: usize,
        mirrored: bool,
    ) -> Option<(u64, u64)> {
        let start = hit.checked_sub(seed_start as u64)?;
        let n = self.index.txtlen();
        if start + len as u64 > n - 1 {
            return None;
        }
        if mirrored {
            Some((n - 1 - start - len as u64, start))
        } else {
            Some((start, start))
        }
    }
}

#[inline]
fn hamming(a: &[u8], b: &[u8]) -> u32 {
    a.iter().zip(b).filter(|(x, y)| x != y).count() as u32
}
