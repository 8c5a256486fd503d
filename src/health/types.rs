//! Health-check result/type vocabulary.

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CheckType {
    Provider,
    Key,
    Model,
}

impl CheckType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Provider => "provider",
            Self::Key => "key",
            Self::Model => "model",
        }
    }
}

/// One probe outcome, ready to persist as `HealthCheckResult`.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub check_type: CheckType,
    pub api_key_hash: Option<String>,
    pub model: Option<String>,
    pub success: bool,
    pub status_code: Option<i32>,
    pub error_message: Option<String>,
    pub response_time_ms: i32,
}

/// Maps a status code to a fixed human-readable explanation.
#[must_use]
pub fn error_message_for(status: u16) -> String {
    match status {
        401 => "invalid key".to_string(),
        403 => "forbidden".to_string(),
        404 => "endpoint missing".to_string(),
        429 => "rate-limited".to_string(),
        500..=599 => "server error".to_string(),
        other => format!("unexpected status {other}"),
    }
}

/// Per-group tier summary used by `analyze_consistency`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TierHealth {
    pub provider_ok: bool,
    pub keys_ok: bool,
    pub models_ok: bool,
}

/// Flags the common "`/models` works but chat doesn't" inconsistency.
#[must_use]
pub fn analyze_consistency(tiers: TierHealth) -> Option<&'static str> {
    if tiers.provider_ok && tiers.keys_ok && !tiers.models_ok {
        Some("/models is functional but the chat/generate endpoint is not")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_table_covers_the_common_statuses() {
        assert_eq!(error_message_for(401), "invalid key");
        assert_eq!(error_message_for(404), "endpoint missing");
        assert_eq!(error_message_for(429), "rate-limited");
        assert_eq!(error_message_for(503), "server error");
        assert_eq!(error_message_for(418), "unexpected status 418");
    }

    #[test]
    fn flags_models_ok_but_chat_broken() {
        let tiers = TierHealth { provider_ok: true, keys_ok: true, models_ok: false };
        assert!(analyze_consistency(tiers).is_some());
    }

    #[test]
    fn fully_healthy_tiers_have_no_inconsistency() {
        let tiers = TierHealth { provider_ok: true, keys_ok: true, models_ok: true };
        assert!(analyze_consistency(tiers).is_none());
    }

    #[test]
    fn provider_down_is_not_reported_as_a_models_inconsistency() {
        let tiers = TierHealth { provider_ok: false, keys_ok: false, models_ok: false };
        assert!(analyze_consistency(tiers).is_none());
    }
}
