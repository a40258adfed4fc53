//! Analytic model of MEM seeding failure.
//!
//! The mapper can be led astray in two ways. A type I failure leaves the
//! true locus hidden behind a duplicate: a seed window survives on the
//! duplicate while read errors disrupt the corresponding window at the
//! origin. A type II failure produces no usable seed at all. Both are
//! modeled per read length, per-base divergence of the duplicated region
//! and local duplicate count, with the standard run-of-matches
//! approximation: a window of Γ consecutive positions all matching with
//! probability m survives with probability m^Γ, and a read of length l
//! offers l - Γ + 1 such windows.

use crate::mapper::GAMMA;

/// Per-base sequencing error rate assumed by the model.
pub const SEQ_ERROR_RATE: f64 = 0.01;

const PROB_FLOOR: f64 = 1e-12;

/// Probability that no window of Γ positions survives when each position
/// matches independently with probability `match_p`.
fn no_seed(len: usize, match_p: f64) -> f64 {
    let windows = (len - GAMMA + 1) as f64;
    (1.0 - match_p.powi(GAMMA as i32)).powf(windows)
}

/// Probability that seeding reports an off-target duplicate instead of
/// the true locus.
pub fn prob_type_i_mem_failure(len: usize, mu: f64, n0: usize) -> f64 {
    debug_assert!(len > GAMMA);
    if n0 <= 1 {
        return PROB_FLOOR;
    }
    let q = 1.0 - SEQ_ERROR_RATE;
    let dups = (n0 - 1) as i32;

    // The duplicate carries a seed window identical to the target with
    // probability (1-mu)^Γ; the target loses its own window to read
    // errors with probability 1 - q^Γ.
    let shared = (1.0 - mu).powi(GAMMA as i32);
    let lost = 1.0 - q.powi(GAMMA as i32);
    let masked = 1.0 - (1.0 - shared * lost).powi(dups);

    // Plus the case where the target never seeds but a duplicate does.
    let target_out = no_seed(len, q);
    let dup_in = 1.0 - no_seed(len, q * (1.0 - mu)).powi(dups);

    (masked + target_out * dup_in).clamp(PROB_FLOOR, 1.0 - PROB_FLOOR)
}

/// Probability that neither the true locus nor any duplicate yields a
/// seed of length Γ.
pub fn prob_type_ii_mem_failure(len: usize, mu: f64, n0: usize) -> f64 {
    debug_assert!(len > GAMMA);
    let q = 1.0 - SEQ_ERROR_RATE;
    let target_out = no_seed(len, q);
    let dup_out = no_seed(len, q * (1.0 - mu)).powi(n0.saturating_sub(1) as i32);
    (target_out * dup_out).clamp(PROB_FLOOR, 1.0 - PROB_FLOOR)
}
