//! The assembled FM-index: transform, rank table, sampled suffix array,
//! k-mer table and chromosome table, plus the search primitives built on
//! top of them.

use std::path::Path;

use log::info;

use crate::bwt::{suffix_array, Bwt};
use crate::csa::{Csa, CSA_PERIOD};
use crate::error::{Result, SeamError};
use crate::genome::{ChromTable, Genome};
use crate::lut::{Lut, LUT_K};
use crate::occ::{BwtRange, Occ};

/// Build-time knobs. The defaults are the production constants; tests use
/// shallower tables.
#[derive(Debug, Clone, Copy)]
pub struct BuildParams {
    /// Depth of the k-mer lookup table.
    pub lut_k: u32,
    /// Sampling period of the compressed suffix array.
    pub csa_period: u64,
}

impl Default for BuildParams {
    fn default() -> Self {
        BuildParams {
            lut_k: LUT_K,
            csa_period: CSA_PERIOD,
        }
    }
}

/// Immutable queryable index over a normalized reference.
pub struct Index {
    pub chroms: ChromTable,
    pub bwt: Bwt,
    pub occ: Occ,
    pub csa: Csa,
    pub lut: Lut,
}

impl Index {
    /// Build every component from a normalized genome. The suffix array
    /// itself is only needed transiently.
    pub fn build(genome: &Genome, params: &BuildParams) -> Result<Index> {
        info!("building suffix array ({} bp)", genome.text.len());
        let sa = suffix_array(&genome.text)?;

        info!("deriving bwt");
        let bwt = Bwt::build(&genome.text, &sa);

        info!("building rank table");
        let occ = Occ::build(&bwt);

        info!("filling {}-mer lookup table", params.lut_k);
        let lut = Lut::build(&occ, params.lut_k);

        info!("sampling suffix array (period {})", params.csa_period);
        let csa = Csa::build(&sa, params.csa_period);

        Ok(Index {
            chroms: genome.chroms.clone(),
            bwt,
            occ,
            csa,
            lut,
        })
    }

    /// Write the five artifacts next to the reference path.
    pub fn save(&self, prefix: &Path) -> Result<()> {
        let txtlen = self.txtlen();
        self.csa.save(prefix)?;
        self.bwt.save(prefix)?;
        self.occ.save(prefix)?;
        self.lut.save(prefix)?;
        self.chroms.save(prefix, txtlen)?;
        Ok(())
    }

    /// Memory-map the five artifacts and cross-check their headers.
    pub fn load(prefix: &Path) -> Result<Index> {
        let (chroms, chr_len) = ChromTable::load(prefix)?;
        let bwt = Bwt::load(prefix)?;
        let occ = Occ::load(prefix)?;
        let csa = Csa::load(prefix)?;
        let lut = Lut::load(prefix)?;

        let txtlen = bwt.len();
        for (name, len) in [
            ("chr", chr_len),
            ("occ", occ.txtlen()),
            ("sa", csa.txtlen()),
            ("lut", lut.txtlen()),
        ] {
            if len != txtlen {
                return Err(SeamError::CorruptIndex(format!(
                    "{name} artifact refers to a different text ({len} != {txtlen})"
                )));
            }
        }
        Ok(Index {
            chroms,
            bwt,
            occ,
            csa,
            lut,
        })
    }

    #[inline]
    pub fn txtlen(&self) -> u64 {
        self.bwt.len()
    }

    /// LF mapping: the row whose suffix starts one text position earlier.
    /// Must not be called on the sentinel row.
    #[inline]
    pub fn lf(&self, row: u64) -> u64 {
        debug_assert_ne!(row, self.bwt.zero());
        let c = self.bwt.code_at(row);
        self.occ.c_array(c) + self.occ.rank(c, row as i64) - 1
    }

    /// Text position of a BWT row, recovered through the sampled suffix
    /// array. Each LF step moves one position left, so the walk is bounded
    /// by the sampling period.
    pub fn locate(&self, mut row: u64) -> u64 {
        let mut steps = 0u64;
        while !self.csa.is_sampled(row) {
            row = self.lf(row);
            steps += 1;
        }
        self.csa.quotient(row) * self.csa.period() + steps
    }

    /// Materialize at most `limit` text positions of a row interval.
    pub fn locate_range(&self, range: BwtRange, limit: usize, out: &mut Vec<u64>) {
        if range.is_empty() {
            return;
        }
        for row in range.bot..=range.top {
            if out.len() >= limit {
                break;
            }
            out.push(self.locate(row));
        }
    }

    /// Backward search of an encoded pattern; returns the row interval of
    /// exact occurrences, possibly empty.
    pub fn backward_search(&self, codes: &[u8]) -> BwtRange {
        let mut range = self.occ.full_range();
        for &c in codes.iter().rev() {
            range = self.occ.extend(c, range);
            if range.is_empty() {
                break;
            }
        }
        range
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::encode_seq;
    use crate::genome::normalize;

    fn small_params() -> BuildParams {
        BuildParams {
            lut_k: 4,
            csa_period: 4,
        }
    }

    fn sample_index() -> (Genome, Index) {
        let fasta = b">chr1\nACGTACGGATTTACACAGTACCAGATCGAGAGATCTTCTAAGCTTGCAGT\n";
        let genome = normalize(fasta, 0).unwrap();
        let index = Index::build(&genome, &small_params()).unwrap();
        (genome, index)
    }

    #[test]
    fn test_lf_identity() {
        let (genome, index) = sample_index();
        let sa = suffix_array(&genome.text).unwrap();
        let n = index.txtlen();

        for row in 0..n {
            if row == index.bwt.zero() {
                continue;
            }
            let mapped = index.lf(row);
            assert_eq!(
                sa[mapped as usize],
                sa[row as usize] - 1,
                "LF broken at row {row}"
            );
        }
    }

    #[test]
    fn test_locate_roundtrip() {
        let (genome, index) = sample_index();
        let sa = suffix_array(&genome.text).unwrap();

        for row in 0..index.txtlen() {
            assert_eq!(index.locate(row), sa[row as usize] as u64, "row {row}");
        }
    }

    #[test]
    fn test_backward_search_finds_all_occurrences() {
        let (genome, index) = sample_index();
        let pattern = b"ACA";
        let codes = encode_seq(pattern).unwrap();
        let range = index.backward_search(&codes);

        let mut expected: Vec<u64> = genome
            .text
            .windows(pattern.len())
            .enumerate()
            .filter(|(_, w)| w == pattern)
            .map(|(i, _)| i as u64)
            .collect();
        let mut got = Vec::new();
        index.locate_range(range, usize::MAX, &mut got);
        got.sort_unstable();
        expected.sort_unstable();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_backward_search_range_is_monotone() {
        let (_, index) = sample_index();
        let codes = encode_seq(b"ACGTACGGATTTAC").unwrap();

        let mut last = u64::MAX;
        for plen in 1..=codes.len() {
            let range = index.backward_search(&codes[codes.len() - plen..]);
            assert!(range.len() <= last);
            last = range.len();
        }
    }

    #[test]
    fn test_absent_pattern_is_empty() {
        let (genome, index) = sample_index();
        // A pattern longer than any repeat that does not occur: take a
        // window and corrupt it.
        let mut pattern = genome.text[3..23].to_vec();
        pattern[10] = match pattern[10] {
            b'A' => b'C',
            _ => b'A',
        };
        // The corrupted window may still occur elsewhere in theory; on
        // this fixed reference it does not.
        let codes = encode_seq(&pattern).unwrap();
        let range = index.backward_search(&codes);
        let occurs = genome
            .text
            .windows(pattern.len())
            .any(|w| w == pattern.as_slice());
        assert_eq!(!range.is_empty(), occurs);
    }
}
