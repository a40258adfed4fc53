//! False-discovery probability of a reported alignment.
//!
//! The estimator re-runs backward search from the alignment's reference
//! substring in both orientations, recording the range size after every
//! extension (the two "cascades"). The tail of the cascades carries the
//! signature of local duplication: a unique region collapses to size 1
//! quickly, a duplicated region plateaus at the duplicate count. A small
//! maximum-likelihood fit recovers the per-base divergence μ and the
//! duplicate count N₀, which feed the MEM-failure model; a Bayes factor
//! between the correct-mapping and seed-only error models then yields the
//! posterior probability that the reported location is wrong.

use statrs::function::gamma::ln_gamma;

use crate::alphabet::{encode, encode_comp};
use crate::error::{Result, SeamError};
use crate::index::Index;
use crate::mapper::{Alignment, GAMMA, MAX_READ_LEN, MIN_READ_LEN};
use crate::seedprob::{prob_type_i_mem_failure, prob_type_ii_mem_failure};

/// Divergence and duplicate count of the matched region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Divergence {
    pub mu: f64,
    pub n0: usize,
}

/// False-discovery probability of `aln` for a read of length `len`.
///
/// `text` is the normalized reference the index was built from. Fails
/// with `ReadLengthOutOfRange` unless `GAMMA + 3 < len < 250`.
pub fn quality(index: &Index, text: &[u8], aln: &Alignment, len: usize) -> Result<f64> {
    if len < MIN_READ_LEN || len >= MAX_READ_LEN {
        return Err(SeamError::ReadLengthOutOfRange(len));
    }
    let refseq = &text[aln.pos as usize..aln.pos as usize + len];

    let left = cascade(index, refseq, Orientation::Forward)?;
    let right = cascade(index, refseq, Orientation::RevComp)?;
    let est = estimate_divergence(&left, &right, len);

    Ok(posterior(aln.score, len, est))
}

enum Orientation {
    Forward,
    RevComp,
}

/// Range sizes of progressively longer backward searches over the
/// reference substring. Forward reads the substring right to left with
/// the plain encoding; the reverse-complement orientation reads it left
/// to right under the complement encoding, which is the same walk over
/// the other strand.
fn cascade(index: &Index, refseq: &[u8], orientation: Orientation) -> Result<Vec<u64>> {
    let len = refseq.len();
    let k = index.lut.k() as usize;
    let code = |pos: usize| -> Result<u8> {
        let byte = match orientation {
            Orientation::Forward => refseq[len - 1 - pos],
            Orientation::RevComp => refseq[pos],
        };
        let encoded = match orientation {
            Orientation::Forward => encode(byte),
            Orientation::RevComp => encode_comp(byte),
        };
        encoded.ok_or(SeamError::InvalidBase(byte as char))
    };

    let mut sizes = vec![0u64; len];
    let mut id = 0u64;
    for pos in 0..k {
        id = (id << 2) | code(pos)? as u64;
    }
    let mut range = index.lut.get(id);
    for pos in k..len {
        range = index.occ.extend(code(pos)?, range);
        sizes[pos] = range.len();
    }
    Ok(sizes)
}

/// Maximum-likelihood fit of (μ, N₀) from the two cascades. μ is scanned
/// over a fixed grid from the largest value down, stopping as soon as the
/// likelihood drops; N₀ is the closed-form optimum at each μ.
pub fn estimate_divergence(left: &[u64], right: &[u64], len: usize) -> Divergence {
    debug_assert!(len > GAMMA + 3);
    // The first GAMMA + 3 entries carry no signal; n is 1-based here.
    let n = GAMMA + 4;
    const MU_GRID: [f64; 3] = [0.06, 0.04, 0.02];

    let l1 = left[n - 1] as f64 - 1.0;
    let r1 = right[n - 1] as f64 - 1.0;
    let mut l2 = n as f64 * l1;
    let mut r2 = n as f64 * r1;
    for i in (n + 1)..=len {
        l2 += left[i - 1] as f64 - 1.0;
        r2 += right[i - 1] as f64 - 1.0;
    }

    let mut loglik = f64::NEG_INFINITY;
    let mut best = Divergence { mu: 0.0, n0: 0 };

    for mu in MU_GRID {
        let l3 = l2 / (1.0 - mu) - l1 / mu;
        let r3 = r2 / (1.0 - mu) - r1 / mu;
        let decay = 1.0 - (1.0 - mu).powi(n as i32);
        let scale = decay / (n as f64 * (1.0 - mu).powi(n as i32 - 1));

        let mut n0 = (l1 + r1 + scale * (l3 + r3)) / 2.0;
        if n0 < 1.0 {
            n0 = 1.0;
        }

        let candidate = 2.0 * ln_gamma(n0 + 1.0)
            + (l1 + r1) * mu.ln()
            + (l2 + r2) * (1.0 - mu).ln()
            + (2.0 * n0 - (l1 + l2)) * decay.ln()
            - ln_gamma(n0 - l1 + 1.0)
            - ln_gamma(n0 - r1 + 1.0);

        if candidate < loglik {
            break;
        }
        loglik = candidate;
        best = Divergence {
            mu,
            n0: n0.round() as usize,
        };
    }
    best
}

/// Posterior probability that the alignment is a false discovery, given
/// its mismatch count.
fn posterior(score: u32, len: usize, est: Divergence) -> f64 {
    let type_i = prob_type_i_mem_failure(len, est.mu, est.n0) / 5.0;
    let mut type_ii = prob_type_ii_mem_failure(len, est.mu, est.n0);
    if est.n0 == 1 && est.mu == 0.06 {
        type_ii /= 5.0;
    }

    let k = score as f64;
    let l = len as f64;
    let g = GAMMA as f64;

    // Likelihood of k mismatches under a correct mapping (sequencing
    // error only) against a spurious hit sharing nothing but the seed.
    let a = ln_gamma(l + 1.0) - ln_gamma(l - k + 1.0) - ln_gamma(k + 1.0)
        + k * 0.01f64.ln()
        + (l - k) * 0.99f64.ln();
    let b = ln_gamma(l - g + 1.0) - ln_gamma(l - g - k + 1.0) - ln_gamma(k + 1.0)
        + k * 0.75f64.ln()
        + (l - g - k) * 0.25f64.ln();

    let p_wrong = 1.0 / (1.0 + (a + (1.0 - type_i).ln() - b - type_i.ln()).exp());
    (p_wrong + type_ii).min(1.0)
}
