use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SpinRequest {
    #[serde(default)]
    pub client_seed: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SpinResponse {
    pub winning_number: u8,
    pub color: String,
    pub server_seed: String,
    pub server_seed_hash: String,
    pub client_seed: String,
    pub nonce: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CommitmentResponse {
    pub server_seed_hash: String,
    pub nonce: u64,
}

/// Audit request. `nonce` and `winning_number` are kept as raw JSON so that
/// a malformed claim is answered with `valid: false` instead of a rejected
/// request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VerifyRequest {
    pub server_seed: String,
    pub client_seed: String,
    #[serde(default)]
    pub nonce: Value,
    #[serde(default)]
    pub winning_number: Value,
    #[serde(default)]
    pub server_seed_hash: Option<String>,
}

impl VerifyRequest {
    /// Nonce as a `u64`, if it is a non-negative JSON integer in range.
    pub fn nonce(&self) -> Option<u64> {
        self.nonce.as_u64()
    }

    /// Claimed pocket as a `u8`, if it is a non-negative JSON integer in range.
    pub fn claimed(&self) -> Option<u8> {
        self.winning_number.as_u64().and_then(|n| u8::try_from(n).ok())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitment_valid: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RotationResponse {
    pub old_seed: String,
    pub old_hash: String,
    pub new_hash: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("spins unavailable: {0}")]
    Unavailable(String),
}
