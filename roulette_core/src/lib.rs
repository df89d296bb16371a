pub mod config;
pub mod engine;
pub mod epoch;
pub mod error;
pub mod rng;
pub mod seed;
pub mod verify;
pub mod wheel;

pub use crate::config::{ClientSeedPolicy, RngConfig};
pub use crate::engine::{EpochSnapshot, RouletteRng};
pub use crate::epoch::{CommittedEpoch, RevealedEpoch, Rotation, Rotator, SpinResult};
pub use crate::error::{RngError, RngResult};
pub use crate::rng::{compute_outcome, REJECTION_LIMIT, WHEEL_SIZE};
pub use crate::seed::{commit, derive_hash_hex, EntropySource, OsEntropy, SecretSeed, SeedCommitment};
pub use crate::verify::{verify, verify_commitment, verify_spin};
pub use crate::wheel::{color_of, Color};
