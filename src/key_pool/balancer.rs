//! Pure selection functions for both key-level and group-level balancing.
//!
//! Kept free of persistence and locking concerns so the policies themselves
//! are trivial to unit test.

use super::types::{BalancePolicy, GroupBalancePolicy};
use rand::Rng;
use std::collections::HashMap;

/// One candidate key within a group, as seen by the balancer.
#[derive(Clone, Debug)]
pub struct KeyCandidate {
    pub raw_key: String,
    pub hash: String,
    pub usage_count: i64,
}

/// Picks the next key from `available` (already filtered by `IsAvailable`)
/// under `policy`. `cursor` is the group's round-robin position, advanced
/// in place.
#[must_use]
pub fn pick_key<'a>(
    policy: BalancePolicy,
    available: &'a [KeyCandidate],
    cursor: &mut usize,
) -> Option<&'a KeyCandidate> {
    if available.is_empty() {
        return None;
    }
    match policy {
        BalancePolicy::RoundRobin => {
            let idx = *cursor % available.len();
            *cursor = cursor.wrapping_add(1);
            available.get(idx)
        }
        BalancePolicy::Random => {
            let idx = rand::thread_rng().gen_range(0..available.len());
            available.get(idx)
        }
        BalancePolicy::LeastUsed => available
            .iter()
            .enumerate()
            .min_by_key(|(idx, c)| (c.usage_count, *idx))
            .map(|(_, c)| c),
    }
}

/// One candidate group within a proxy key's allowed set.
#[derive(Clone, Debug)]
pub struct GroupCandidate {
    pub id: String,
    pub priority: i32,
}

/// Picks a group under a proxy key's `group_balance_policy`.
///
/// `round_robin` advances `cursor` in place; `weighted` consults
/// `group_weights` (missing entries default to weight 1; all-zero weights
/// fall back to failover).
#[must_use]
pub fn pick_group<'a>(
    policy: GroupBalancePolicy,
    candidates: &'a [GroupCandidate],
    group_weights: &HashMap<String, f64>,
    cursor: &mut usize,
) -> Option<&'a GroupCandidate> {
    if candidates.is_empty() {
        return None;
    }
    if candidates.len() == 1 {
        return candidates.first();
    }

    match policy {
        GroupBalancePolicy::Failover => failover(candidates),
        GroupBalancePolicy::RoundRobin => {
            let idx = *cursor % candidates.len();
            *cursor = cursor.wrapping_add(1);
            candidates.get(idx)
        }
        GroupBalancePolicy::Random => {
            let idx = rand::thread_rng().gen_range(0..candidates.len());
            candidates.get(idx)
        }
        GroupBalancePolicy::Weighted => {
            let weights: Vec<f64> = candidates
                .iter()
                .map(|c| group_weights.get(&c.id).copied().unwrap_or(1.0).max(0.0))
                .collect();
            let total: f64 = weights.iter().sum();
            if total <= 0.0 {
                return failover(candidates);
            }
            let mut pick = rand::thread_rng().gen_range(0.0..total);
            for (candidate, weight) in candidates.iter().zip(weights.iter()) {
                if pick < *weight {
                    return Some(candidate);
                }
                pick -= weight;
            }
            candidates.last()
        }
    }
}

fn failover(candidates: &[GroupCandidate]) -> Option<&GroupCandidate> {
    candidates.iter().max_by_key(|c| c.priority)
}
