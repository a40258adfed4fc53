//! Suffix array construction and the packed Burrows-Wheeler transform.

use std::path::Path;

use libdivsufsort_rs::divsufsort64;

use crate::alphabet::encode;
use crate::error::{Result, SeamError};
use crate::store::{self, Blob, Header, Kind};

/// Compute the suffix array of the normalized text.
///
/// The text ends with the sentinel, which sorts before every base in byte
/// order, so SA[0] always points at it.
pub fn suffix_array(text: &[u8]) -> Result<Vec<i64>> {
    // The binding wants an owned buffer reference.
    let owned = text.to_vec();
    divsufsort64(&owned).ok_or(SeamError::SuffixArray)
}

/// The Burrows-Wheeler transform, 2-bit packed.
///
/// The sentinel occupies exactly one transform slot, recorded as `zero`.
/// Its packed value is arbitrary and must never be decoded; rank queries
/// treat that slot as matching none of the four symbols.
pub struct Bwt {
    txtlen: u64,
    zero: u64,
    slots: Blob,
}

impl Bwt {
    /// Derive the transform from the text and its suffix array.
    pub fn build(text: &[u8], sa: &[i64]) -> Bwt {
        let n = text.len();
        debug_assert_eq!(n, sa.len());
        let mut slots = vec![0u8; n.div_ceil(4)];
        let mut zero = 0u64;
        for (row, &suffix) in sa.iter().enumerate() {
            let code = if suffix == 0 {
                zero = row as u64;
                0
            } else {
                let prev = text[(suffix - 1) as usize];
                // The text contains one sentinel and it sits at SA[0], so
                // every other preceding byte is a plain base.
                encode(prev).unwrap_or(0)
            };
            slots[row / 4] |= code << (2 * (row % 4));
        }
        Bwt {
            txtlen: n as u64,
            zero,
            slots: Blob::from_vec(slots),
        }
    }

    /// Length of the transform (equals |T|).
    #[inline]
    pub fn len(&self) -> u64 {
        self.txtlen
    }

    pub fn is_empty(&self) -> bool {
        self.txtlen == 0
    }

    /// Row holding the sentinel (the row whose suffix starts at text
    /// position 0).
    #[inline]
    pub fn zero(&self) -> u64 {
        self.zero
    }

    /// Symbol at a transform position, or `None` at the sentinel slot.
    #[inline]
    pub fn symbol(&self, pos: u64) -> Option<u8> {
        if pos == self.zero {
            None
        } else {
            Some(self.code_at(pos))
        }
    }

    /// Raw 2-bit slot value. Garbage at the sentinel slot; callers must
    /// exclude it.
    #[inline]
    pub fn code_at(&self, pos: u64) -> u8 {
        let byte = self.slots[(pos / 4) as usize];
        (byte >> (2 * (pos % 4))) & 3
    }

    pub fn save(&self, prefix: &Path) -> Result<()> {
        let header = Header::new(Kind::Bwt, self.txtlen, self.zero, self.slots.len() as u64);
        store::write_artifact(prefix, header, &self.slots)
    }

    pub fn load(prefix: &Path) -> Result<Bwt> {
        let (header, slots) = store::map_artifact(prefix, Kind::Bwt)?;
        let expected = (header.txtlen as usize).div_ceil(4);
        if header.p1 as usize != expected || slots.len() < expected {
            return Err(SeamError::CorruptIndex("bwt slot count mismatch".into()));
        }
        if header.p0 >= header.txtlen {
            return Err(SeamError::CorruptIndex("sentinel row out of range".into()));
        }
        Ok(Bwt {
            txtlen: header.txtlen,
            zero: header.p0,
            slots,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Reference suffix sort for small test texts.
    pub(crate) fn naive_sa(text: &[u8]) -> Vec<i64> {
        let mut rows: Vec<i64> = (0..text.len() as i64).collect();
        rows.sort_by_key(|&i| &text[i as usize..]);
        rows
    }

    #[test]
    fn test_suffix_array_matches_naive_sort() {
        let text = b"GATTACATGTAATC$";
        let sa = suffix_array(text).unwrap();
        assert_eq!(sa, naive_sa(text));
        assert_eq!(sa[0], (text.len() - 1) as i64);
    }

    #[test]
    fn test_bwt_last_column() {
        // banana-style check on a DNA text.
        let text = b"ACAACG$";
        let sa = naive_sa(text);
        let bwt = Bwt::build(text, &sa);

        assert_eq!(bwt.len(), 7);
        // Reconstruct the last column and compare against a direct rotation
        // sort.
        let mut expected: Vec<Option<u8>> = Vec::new();
        for &s in &sa {
            if s == 0 {
                expected.push(None);
            } else {
                expected.push(encode(text[(s - 1) as usize]));
            }
        }
        for (row, want) in expected.iter().enumerate() {
            assert_eq!(bwt.symbol(row as u64), *want);
        }
        assert_eq!(bwt.symbol(bwt.zero()), None);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("ref.fa");
        let text = b"ACGTACGTAACC$";
        let bwt = Bwt::build(text, &naive_sa(text));
        bwt.save(&prefix).unwrap();

        let loaded = Bwt::load(&prefix).unwrap();
        assert_eq!(loaded.len(), bwt.len());
        assert_eq!(loaded.zero(), bwt.zero());
        for i in 0..bwt.len() {
            assert_eq!(loaded.symbol(i), bwt.symbol(i));
        }
    }
}
