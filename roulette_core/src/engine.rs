use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::{
    config::RngConfig,
    epoch::{Rotation, Rotator, SpinResult},
    error::RngResult,
    seed::{EntropySource, OsEntropy, SeedCommitment},
    verify,
};

/// Commitment and nonce of the live epoch, read under a single lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochSnapshot {
    pub server_seed_hash: SeedCommitment,
    pub nonce: u64,
}

/// Provably fair roulette RNG.
///
/// Construct one per game host and share it by reference; every method takes
/// `&self`. Spins, rotations and resets are serialized on an internal mutex,
/// so concurrent callers never see the same epoch or a half-rotated one.
pub struct RouletteRng<E: EntropySource = OsEntropy> {
    inner: Mutex<Rotator<E>>,
}

impl RouletteRng<OsEntropy> {
    pub fn new() -> RngResult<Self> {
        Self::with_config(RngConfig::default(), OsEntropy)
    }
}

impl<E: EntropySource> RouletteRng<E> {
    pub fn with_config(config: RngConfig, entropy: E) -> RngResult<Self> {
        Ok(Self {
            inner: Mutex::new(Rotator::new(config, entropy)?),
        })
    }

    // Rotator mutations swap in fully built state, so a poisoned guard still
    // holds a consistent epoch.
    fn lock(&self) -> MutexGuard<'_, Rotator<E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hash of the seed that the next spin will use.
    pub fn commitment_hash(&self) -> SeedCommitment {
        self.lock().current_commitment().clone()
    }

    pub fn nonce(&self) -> u64 {
        self.lock().nonce()
    }

    pub fn snapshot(&self) -> EpochSnapshot {
        let guard = self.lock();
        EpochSnapshot {
            server_seed_hash: guard.current_commitment().clone(),
            nonce: guard.nonce(),
        }
    }

    pub fn client_seed(&self) -> String {
        self.lock().client_seed().to_string()
    }

    pub fn spin(&self, client_seed: Option<&str>) -> RngResult<SpinResult> {
        self.lock().spin_and_rotate(client_seed)
    }

    pub fn rotate(&self) -> RngResult<Rotation> {
        self.lock().rotate()
    }

    pub fn reset(&self) -> RngResult<()> {
        self.lock().reset()
    }

    /// Same as [`verify::verify`]; needs no live state.
    pub fn verify(server_seed: &str, client_seed: &str, nonce: u64, claimed: u8) -> bool {
        verify::verify(server_seed, client_seed, nonce, claimed)
    }
}
