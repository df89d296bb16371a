use serde::{Deserialize, Serialize};

/// What to do with a client seed that fails validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientSeedPolicy {
    /// Keep using the stored client seed.
    #[default]
    KeepPrevious,
    /// Replace the stored client seed with a freshly generated one.
    Regenerate,
}

impl std::str::FromStr for ClientSeedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" | "keep_previous" => Ok(ClientSeedPolicy::KeepPrevious),
            "regenerate" => Ok(ClientSeedPolicy::Regenerate),
            other => Err(format!("unknown client seed policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RngConfig {
    pub client_seed_policy: ClientSeedPolicy,
    /// Upper bound on a supplied client seed, in bytes.
    pub max_client_seed_len: usize,
}

impl Default for RngConfig {
    fn default() -> Self {
        Self {
            client_seed_policy: ClientSeedPolicy::KeepPrevious,
            max_client_seed_len: 256,
        }
    }
}

impl RngConfig {
    /// Whether a caller supplied client seed may be used as is.
    pub fn accepts_client_seed(&self, seed: &str) -> bool {
        !seed.trim().is_empty() && seed.len() <= self.max_client_seed_len
    }
}
