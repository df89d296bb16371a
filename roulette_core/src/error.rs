//! Errors raised by the seed lifecycle and outcome calculation.
//!
//! Every variant here is fatal to spinning: none of them describe bad caller
//! input. Malformed audit input makes `verify` return `false`, and a rejected
//! client seed falls back according to [`crate::ClientSeedPolicy`].

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RngError {
    /// The OS entropy source refused to produce bytes.
    #[error("entropy source unavailable: {0}")]
    Entropy(String),
    /// HMAC or digest construction failed.
    #[error("hash computation failed: {0}")]
    Hash(String),
    /// Every base and extension round was rejected by the uniformity limit.
    #[error("entropy exhausted after {rounds} HMAC rounds without an unbiased value")]
    EntropyExhaustion { rounds: u32 },
    /// The live seed no longer hashes to its published commitment.
    #[error("stored commitment does not match the live server seed")]
    CommitmentMismatch,
}

impl RngError {
    /// Whether the service must stop serving spins after this error.
    pub fn is_fatal(&self) -> bool {
        match self {
            RngError::Entropy(_)
            | RngError::Hash(_)
            | RngError::EntropyExhaustion { .. }
            | RngError::CommitmentMismatch => true,
        }
    }
}

pub type RngResult<T> = Result<T, RngError>;
