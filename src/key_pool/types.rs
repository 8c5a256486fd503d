//! Public contract types for the key pool.

use serde::{Deserialize, Serialize};

/// Per-group API key balancing policy.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancePolicy {
    RoundRobin,
    Random,
    LeastUsed,
}

impl BalancePolicy {
    /// Parses a free-form config string, falling back to `round_robin` on
    /// anything unrecognized rather than rejecting the group config.
    #[must_use]
    pub fn parse_or_default(raw: &str) -> Self {
        match raw {
            "random" => Self::Random,
            "least_used" => Self::LeastUsed,
            _ => Self::RoundRobin,
        }
    }
}

/// Proxy-key-level policy for choosing among candidate groups.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBalancePolicy {
    Failover,
    RoundRobin,
    Weighted,
    Random,
}

impl GroupBalancePolicy {
    #[must_use]
    pub fn parse_or_default(raw: &str) -> Self {
        match raw {
            "round_robin" => Self::RoundRobin,
            "weighted" => Self::Weighted,
            "random" => Self::Random,
            _ => Self::Failover,
        }
    }
}
