use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{RngError, RngResult};

/// Length in bytes of a server secret seed.
pub const SECRET_SEED_LEN: usize = 32;
/// Length in bytes of an auto-generated client seed.
pub const CLIENT_SEED_LEN: usize = 16;

/// Source of cryptographically secure bytes.
///
/// Production code uses [`OsEntropy`]; tests plug in sources that fail on
/// demand. Implementations must never fall back to a statistical generator.
pub trait EntropySource: Send + Sync {
    fn fill(&self, dest: &mut [u8]) -> RngResult<()>;
}

impl<T: EntropySource + ?Sized> EntropySource for Box<T> {
    fn fill(&self, dest: &mut [u8]) -> RngResult<()> {
        (**self).fill(dest)
    }
}

/// Operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&self, dest: &mut [u8]) -> RngResult<()> {
        let mut rng = OsRng;
        rng.try_fill_bytes(dest)
            .map_err(|e| RngError::Entropy(e.to_string()))
    }
}

pub fn generate_secret_bytes<E: EntropySource + ?Sized>(entropy: &E, n: usize) -> RngResult<Vec<u8>> {
    let mut out = vec![0u8; n];
    entropy.fill(&mut out)?;
    Ok(out)
}

/// Random client seed: `CLIENT_SEED_LEN` bytes, hex encoded.
pub fn generate_client_seed<E: EntropySource + ?Sized>(entropy: &E) -> RngResult<String> {
    Ok(hex::encode(generate_secret_bytes(entropy, CLIENT_SEED_LEN)?))
}

/// SHA-256 of `input`, lowercase hex.
pub fn derive_hash_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

/// Commitment for a revealed server seed. The revealed hex text is what
/// gets hashed, so anyone holding a `SpinResult` can recompute it.
pub fn commit(revealed_seed: &str) -> SeedCommitment {
    SeedCommitment(derive_hash_hex(revealed_seed.as_bytes()))
}

/// A server secret seed. Never printed, never serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretSeed([u8; SECRET_SEED_LEN]);

impl SecretSeed {
    pub fn generate<E: EntropySource + ?Sized>(entropy: &E) -> RngResult<Self> {
        let mut bytes = [0u8; SECRET_SEED_LEN];
        entropy.fill(&mut bytes)?;
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; SECRET_SEED_LEN]) -> Self {
        Self(bytes)
    }

    /// The revealed form: lowercase hex of the raw bytes. Also the HMAC key.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn commitment(&self) -> SeedCommitment {
        commit(&self.to_hex())
    }
}

impl fmt::Debug for SecretSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretSeed(<redacted>)")
    }
}

/// Hex SHA-256 commitment to a server seed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeedCommitment(String);

impl SeedCommitment {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive match against an externally supplied hex digest.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl fmt::Display for SeedCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SeedCommitment> for String {
    fn from(c: SeedCommitment) -> Self {
        c.0
    }
}
