//! Seed epochs and the rotation discipline around them.
//!
//! An epoch moves through two states and never back:
//!
//! ```text
//! Committed (seed secret, hash published) --reveal--> Revealed (seed public)
//! ```
//!
//! [`CommittedEpoch::reveal`] consumes the committed epoch, so a seed that has
//! been disclosed can never again feed [`compute_outcome`]. The [`Rotator`]
//! always holds exactly one committed epoch and swaps in its successor in the
//! same step that reveals the old one.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::{
    config::{ClientSeedPolicy, RngConfig},
    error::{RngError, RngResult},
    rng::compute_outcome,
    seed::{commit, generate_client_seed, EntropySource, SecretSeed, SeedCommitment},
};

/// Live epoch: the seed is still secret.
#[derive(Debug)]
pub struct CommittedEpoch {
    seed: SecretSeed,
    commitment: SeedCommitment,
    nonce: u64,
}

impl CommittedEpoch {
    pub fn generate<E: EntropySource + ?Sized>(entropy: &E) -> RngResult<Self> {
        Ok(Self::from_seed(SecretSeed::generate(entropy)?))
    }

    /// The commitment is always derived here, never supplied.
    pub fn from_seed(seed: SecretSeed) -> Self {
        let commitment = seed.commitment();
        Self {
            seed,
            commitment,
            nonce: 0,
        }
    }

    pub fn commitment(&self) -> &SeedCommitment {
        &self.commitment
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    fn check_commitment(&self) -> RngResult<()> {
        if self.seed.commitment() != self.commitment {
            error!(commitment = %self.commitment, "live seed does not match its commitment");
            return Err(RngError::CommitmentMismatch);
        }
        Ok(())
    }

    fn outcome(&self, client_seed: &str) -> RngResult<u8> {
        compute_outcome(&self.seed.to_hex(), client_seed, self.nonce)
    }

    pub fn reveal(self) -> RevealedEpoch {
        RevealedEpoch {
            server_seed: self.seed.to_hex(),
            server_seed_hash: self.commitment,
            nonce: self.nonce,
        }
    }
}

/// A retired epoch whose seed is now public.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedEpoch {
    pub server_seed: String,
    pub server_seed_hash: SeedCommitment,
    pub nonce: u64,
}

impl RevealedEpoch {
    pub fn is_consistent(&self) -> bool {
        commit(&self.server_seed) == self.server_seed_hash
    }
}

/// Everything needed to audit one spin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinResult {
    pub winning_number: u8,
    pub server_seed: String,
    pub server_seed_hash: SeedCommitment,
    pub client_seed: String,
    pub nonce: u64,
}

/// Outcome of retiring an epoch without spinning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rotation {
    pub old_seed: String,
    pub old_hash: SeedCommitment,
    pub new_hash: SeedCommitment,
}

/// Owner of the live epoch and stored client seed.
///
/// Every mutation builds the replacement state first and swaps it in only
/// once nothing else can fail, so an error leaves the previous epoch live and
/// unrevealed.
pub struct Rotator<E> {
    entropy: E,
    config: RngConfig,
    live: CommittedEpoch,
    client_seed: String,
}

impl<E: EntropySource> Rotator<E> {
    pub fn new(config: RngConfig, entropy: E) -> RngResult<Self> {
        let live = CommittedEpoch::generate(&entropy)?;
        let client_seed = generate_client_seed(&entropy)?;
        debug!(commitment = %live.commitment(), "initial epoch committed");
        Ok(Self {
            entropy,
            config,
            live,
            client_seed,
        })
    }

    pub fn current_commitment(&self) -> &SeedCommitment {
        self.live.commitment()
    }

    pub fn nonce(&self) -> u64 {
        self.live.nonce()
    }

    pub fn client_seed(&self) -> &str {
        &self.client_seed
    }

    fn resolve_client_seed(&self, supplied: Option<&str>) -> RngResult<String> {
        match supplied {
            None => Ok(self.client_seed.clone()),
            Some(seed) if self.config.accepts_client_seed(seed) => Ok(seed.to_string()),
            Some(seed) => {
                warn!(
                    len = seed.len(),
                    policy = ?self.config.client_seed_policy,
                    "rejected client seed"
                );
                match self.config.client_seed_policy {
                    ClientSeedPolicy::KeepPrevious => Ok(self.client_seed.clone()),
                    ClientSeedPolicy::Regenerate => generate_client_seed(&self.entropy),
                }
            }
        }
    }

    /// Compute the outcome on the live epoch, then reveal it and commit a new one.
    pub fn spin_and_rotate(&mut self, client_seed: Option<&str>) -> RngResult<SpinResult> {
        self.live.check_commitment()?;
        let client_seed = self.resolve_client_seed(client_seed)?;
        let winning_number = self.live.outcome(&client_seed)?;
        let next = CommittedEpoch::generate(&self.entropy)?;

        let revealed = std::mem::replace(&mut self.live, next).reveal();
        self.client_seed = client_seed.clone();
        debug!(
            retired = %revealed.server_seed_hash,
            committed = %self.live.commitment(),
            "epoch rotated after spin"
        );

        Ok(SpinResult {
            winning_number,
            server_seed: revealed.server_seed,
            server_seed_hash: revealed.server_seed_hash,
            client_seed,
            nonce: revealed.nonce,
        })
    }

    /// Retire the live epoch unused and commit a new one.
    pub fn rotate(&mut self) -> RngResult<Rotation> {
        let next = CommittedEpoch::generate(&self.entropy)?;
        let revealed = std::mem::replace(&mut self.live, next).reveal();
        debug!(retired = %revealed.server_seed_hash, committed = %self.live.commitment(), "epoch rotated");
        Ok(Rotation {
            old_seed: revealed.server_seed,
            old_hash: revealed.server_seed_hash,
            new_hash: self.live.commitment().clone(),
        })
    }

    /// Drop the live epoch and the stored client seed, as at construction.
    /// The discarded seed is not revealed.
    pub fn reset(&mut self) -> RngResult<()> {
        let live = CommittedEpoch::generate(&self.entropy)?;
        let client_seed = generate_client_seed(&self.entropy)?;
        self.live = live;
        self.client_seed = client_seed;
        debug!(commitment = %self.live.commitment(), "epoch reset");
        Ok(())
    }
}
