//! Stateless audit of revealed spins.
//!
//! Nothing here touches a live [`crate::RouletteRng`]; a third party holding a
//! `SpinResult` can run these checks on its own. Every input is treated as
//! untrusted, and bad input gives `false` rather than an error.

use crate::{
    epoch::SpinResult,
    rng::{compute_outcome, WHEEL_SIZE},
    seed::commit,
};

/// Recompute the outcome for the revealed inputs and compare with `claimed`.
pub fn verify(server_seed: &str, client_seed: &str, nonce: u64, claimed: u8) -> bool {
    if u32::from(claimed) >= WHEEL_SIZE {
        return false;
    }
    matches!(compute_outcome(server_seed, client_seed, nonce), Ok(n) if n == claimed)
}

/// Does the revealed seed hash to the commitment published before the spin?
pub fn verify_commitment(server_seed: &str, server_seed_hash: &str) -> bool {
    commit(server_seed).matches(server_seed_hash)
}

pub fn verify_spin(result: &SpinResult) -> bool {
    verify_commitment(&result.server_seed, result.server_seed_hash.as_str())
        && verify(&result.server_seed, &result.client_seed, result.nonce, result.winning_number)
}
