//! Outcome calculation shared by spinning and auditing.
//!
//! ```text
//! message = client_seed ":" nonce
//! block_0 = HMAC-SHA256(key = server_seed, message)
//! block_r = HMAC-SHA256(key = server_seed, message ":" r)    r = 0, 1, .. 15
//! ```
//!
//! Each 32-byte block is read as eight big-endian `u32` chunks. The first chunk
//! `<= REJECTION_LIMIT` wins and the outcome is `chunk % 37`. Extension blocks
//! are only computed when every chunk of the blocks before them was rejected.
//! `server_seed` is the revealed seed string as UTF-8 bytes.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{RngError, RngResult};

pub type HmacSha256 = Hmac<Sha256>;

/// Number of pockets on a single-zero wheel.
pub const WHEEL_SIZE: u32 = 37;
/// Largest `u32` that completes a full group of 37 values.
pub const REJECTION_LIMIT: u32 = ((1u64 << 32) / WHEEL_SIZE as u64 * WHEEL_SIZE as u64 - 1) as u32;
/// Extension rounds allowed after the base block.
pub const MAX_EXTENSION_ROUNDS: u32 = 16;

const CHUNKS_PER_BLOCK: usize = 32 / 4;

pub fn hmac_bytes(key: &[u8], message: &[u8]) -> RngResult<[u8; 32]> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| RngError::Hash(e.to_string()))?;
    mac.update(message);
    let res = mac.finalize().into_bytes();
    let mut out = [0u8; 32];
    out.copy_from_slice(&res);
    Ok(out)
}

/// First chunk of `block` inside the rejection limit, reduced to a pocket.
fn first_unbiased(block: &[u8; 32]) -> Option<u8> {
    block
        .chunks_exact(4)
        .take(CHUNKS_PER_BLOCK)
        .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
        .find(|v| *v <= REJECTION_LIMIT)
        .map(|v| (v % WHEEL_SIZE) as u8)
}

/// Scan blocks from `next_block` until one holds an accepted chunk.
///
/// `next_block(None)` yields the base block, `next_block(Some(r))` the
/// extension block for round `r`.
fn sample_blocks<F>(mut next_block: F) -> RngResult<u8>
where
    F: FnMut(Option<u32>) -> RngResult<[u8; 32]>,
{
    if let Some(n) = first_unbiased(&next_block(None)?) {
        return Ok(n);
    }
    for round in 0..MAX_EXTENSION_ROUNDS {
        if let Some(n) = first_unbiased(&next_block(Some(round))?) {
            return Ok(n);
        }
    }
    Err(RngError::EntropyExhaustion { rounds: MAX_EXTENSION_ROUNDS + 1 })
}

/// Winning pocket in `0..=36` for the given inputs. Pure and deterministic.
pub fn compute_outcome(server_seed: &str, client_seed: &str, nonce: u64) -> RngResult<u8> {
    let key = server_seed.as_bytes();
    let message = format!("{}:{}", client_seed, nonce);
    sample_blocks(|round| match round {
        None => hmac_bytes(key, message.as_bytes()),
        Some(r) => hmac_bytes(key, format!("{}:{}", message, r).as_bytes()),
    })
}
