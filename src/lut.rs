//! Precomputed backward-search ranges for all k-mers at a fixed depth.
//!
//! The table is indexed by the 2-bit packed k-mer id, with the base
//! consumed first by backward search (the rightmost one) in the highest
//! bits. Seeding a search therefore folds the last k read bases into an
//! id and starts from the stored range instead of k rank queries.

use std::path::Path;

use crate::error::{Result, SeamError};
use crate::occ::{BwtRange, Occ};
use crate::store::{self, Blob, Header, Kind};

/// Production k-mer depth. The builder is parameterized so tests can use
/// shallow tables; the depth in force is recorded in the artifact header.
pub const LUT_K: u32 = 12;

/// Canonical empty entry (bot > top).
const EMPTY: BwtRange = BwtRange { bot: 1, top: 0 };

pub struct Lut {
    txtlen: u64,
    k: u32,
    ranges: Blob,
}

impl Lut {
    /// Fill the table by depth-first backward search. Subtrees whose range
    /// empties are pruned; their leaves keep the pre-filled empty entry.
    pub fn build(occ: &Occ, k: u32) -> Lut {
        assert!(k >= 1 && k <= 16, "lut depth out of range");
        let entries = 1usize << (2 * k);
        let mut table = vec![0u8; entries * 16];
        for id in 0..entries {
            table[id * 16..id * 16 + 8].copy_from_slice(&EMPTY.bot.to_le_bytes());
        }
        fill(occ, &mut table, k, 0, occ.full_range(), 0);
        Lut {
            txtlen: occ.txtlen(),
            k,
            ranges: Blob::from_vec(table),
        }
    }

    /// Depth of the table.
    #[inline]
    pub fn k(&self) -> u32 {
        self.k
    }

    #[inline]
    pub fn txtlen(&self) -> u64 {
        self.txtlen
    }

    /// Range of the k-mer with the given packed id.
    #[inline]
    pub fn get(&self, id: u64) -> BwtRange {
        BwtRange {
            bot: self.ranges.word(id as usize * 2),
            top: self.ranges.word(id as usize * 2 + 1),
        }
    }

    pub fn save(&self, prefix: &Path) -> Result<()> {
        let header = Header::new(Kind::Lut, self.txtlen, self.k as u64, 0);
        store::write_artifact(prefix, header, &self.ranges)
    }

    pub fn load(prefix: &Path) -> Result<Lut> {
        let (header, ranges) = store::map_artifact(prefix, Kind::Lut)?;
        let k = header.p0 as u32;
        if k < 1 || k > 16 {
            return Err(SeamError::CorruptIndex("bad lut depth".into()));
        }
        let expected = (1usize << (2 * k)) * 16;
        if ranges.len() < expected {
            return Err(SeamError::CorruptIndex("truncated lut".into()));
        }
        Ok(Lut {
            txtlen: header.txtlen,
            k,
            ranges,
        })
    }
}

fn fill(occ: &Occ, table: &mut [u8], k: u32, depth: u32, range: BwtRange, id: u64) {
    if depth == k {
        let at = id as usize * 16;
        table[at..at + 8].copy_from_slice(&range.bot.to_le_bytes());
        table[at + 8..at + 16].copy_from_slice(&range.top.to_le_bytes());
        return;
    }
    for c in 0..4u8 {
        let next = occ.extend(c, range);
        if !next.is_empty() {
            fill(occ, table, k, depth + 1, next, (id << 2) | c as u64);
        }
    }
}

/// Fold `codes` (text order) into the packed id the table is indexed by.
/// Backward search consumes the rightmost base first, so that base lands
/// in the highest bits.
#[inline]
pub fn kmer_id(codes: &[u8]) -> u64 {
    codes.iter().rev().fold(0u64, |id, &c| (id << 2) | c as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::encode_seq;
    use crate::bwt::tests::naive_sa;
    use crate::bwt::Bwt;

    fn occ_for(text: &[u8]) -> Occ {
        Occ::build(&Bwt::build(text, &naive_sa(text)))
    }

    fn backward_search(occ: &Occ, codes: &[u8]) -> BwtRange {
        let mut range = occ.full_range();
        for &c in codes.iter().rev() {
            range = occ.extend(c, range);
            if range.is_empty() {
                break;
            }
        }
        range
    }

    #[test]
    fn test_lut_agrees_with_backward_search() {
        let text = b"ACGTACGGATTTACACAGTACCAGATCGAGAGATCTTCTAAGCT$";
        let occ = occ_for(text);
        let k = 3;
        let lut = Lut::build(&occ, k);

        // Exhaustive over all 64 3-mers.
        for id in 0..(1u64 << (2 * k)) {
            // Digits from the highest pair down give the consumption order
            // (rightmost base first); reverse for text order.
            let mut pattern: Vec<u8> = (0..k)
                .map(|d| ((id >> (2 * (k - 1 - d))) & 3) as u8)
                .collect();
            pattern.reverse();
            assert_eq!(kmer_id(&pattern), id);
            let expected = backward_search(&occ, &pattern);
            let got = lut.get(id);
            if expected.is_empty() {
                assert!(got.is_empty(), "id {id}");
            } else {
                assert_eq!(got, expected, "id {id}");
            }
        }
    }

    #[test]
    fn test_kmer_id_composition() {
        // Backward search consumes right-to-left; the first consumed base
        // lands in the highest bits.
        let codes = encode_seq(b"ACG").unwrap();
        // Consumption order G, C, A.
        assert_eq!(kmer_id(&codes), (2 << 4) | (1 << 2));
    }

    #[test]
    fn test_absent_kmer_is_empty() {
        // A text with no G at all.
        let text = b"ACATACATTACA$";
        let occ = occ_for(text);
        let lut = Lut::build(&occ, 2);
        let codes = encode_seq(b"GG").unwrap();
        assert!(lut.get(kmer_id(&codes)).is_empty());
    }
}
