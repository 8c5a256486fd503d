//! Shared adapter types: the normalized request/response shapes and the
//! fixed status-code classification table.

use crate::error::Dialect;
use bytes::Bytes;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::time::Duration;

/// Timeouts applied separately to connect and to the response body.
#[derive(Copy, Clone, Debug)]
pub struct AdapterTimeouts {
    pub connect: Duration,
    pub response: Duration,
}

impl AdapterTimeouts {
    #[must_use]
    pub const fn unary() -> Self {
        Self {
            connect: Duration::from_secs(30),
            response: Duration::from_secs(180),
        }
    }

    #[must_use]
    pub const fn streaming() -> Self {
        Self {
            connect: Duration::from_secs(30),
            response: Duration::from_secs(300),
        }
    }
}

/// Lazy byte stream from an upstream streaming response.
pub type UpstreamByteStream = BoxStream<'static, reqwest::Result<Bytes>>;

/// Outcome of `Send`. `stream` is populated only for a streaming call that
/// reached upstream successfully.
pub struct ProviderResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub stream: Option<UpstreamByteStream>,
}

impl ProviderResponse {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// `Classify`'s verdict: whether to retry the same key, switch to the next
/// key in the group, and the message to record.
#[derive(Clone, Debug)]
pub struct Classification {
    pub should_retry: bool,
    pub should_try_next_key: bool,
    pub message: String,
}

/// The fixed status-code mapping shared by all three dialects.
#[must_use]
pub fn classify_status(status: u16, body: &str) -> Classification {
    let snippet = || body.chars().take(300).collect::<String>();
    match status {
        200..=299 => Classification {
            should_retry: false,
            should_try_next_key: false,
            message: String::new(),
        },
        401 | 403 => Classification {
            should_retry: false,
            should_try_next_key: true,
            message: format!("upstream rejected credentials ({status}): {}", snippet()),
        },
        429 => Classification {
            should_retry: true,
            should_try_next_key: true,
            message: format!("upstream rate limited ({status}): {}", snippet()),
        },
        500 | 502 | 503 | 504 => Classification {
            should_retry: true,
            should_try_next_key: false,
            message: format!("upstream transient error ({status}): {}", snippet()),
        },
        408 => Classification {
            should_retry: true,
            should_try_next_key: false,
            message: format!("upstream timeout ({status}): {}", snippet()),
        },
        400 | 404 | 422 => Classification {
            should_retry: false,
            should_try_next_key: false,
            message: format!("upstream permanent error ({status}): {}", snippet()),
        },
        other => Classification {
            should_retry: false,
            should_try_next_key: false,
            message: format!("unexpected upstream status ({other}): {}", snippet()),
        },
    }
}

/// This dialect's SSE terminal marker, sent after the single synthesized
/// `data:` event for a `fake_streaming` group.
#[must_use]
pub const fn terminal_sse_marker(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::OpenAi | Dialect::Gemini => "data: [DONE]\n\n",
        Dialect::Anthropic => "event: message_stop\ndata: {}\n\n",
    }
}

/// `fake_streaming`: wraps a completed unary response body as the single SSE
/// event a streaming client expects, followed by the dialect's terminal
/// marker. The upstream call itself stays unary; only the client-facing
/// shape is synthesized.
#[must_use]
pub fn synthesize_streaming_body(body: &[u8], dialect: Dialect) -> UpstreamByteStream {
    let text = String::from_utf8_lossy(body);
    let event = format!("data: {text}\n\n");
    let marker = terminal_sse_marker(dialect);
    let chunk = Bytes::from([event, marker.to_string()].concat());
    stream::once(async move { Ok(chunk) }).boxed()
}

/// Whitelisted parameter-override keys; anything else in
/// `GroupConfig.parameter_overrides` is ignored.
pub const OVERRIDE_WHITELIST: &[&str] = &[
    "temperature",
    "max_tokens",
    "top_p",
    "presence_penalty",
    "frequency_penalty",
];

/// Applies whitelisted scalar overrides onto a dialect-native JSON request
/// body. Model-name substitution is dialect-specific (JSON field for
/// OpenAI/Anthropic, URL path segment for Gemini) and handled by the caller.
pub fn apply_overrides(body: &mut Value, overrides: &Value) {
    if let (Value::Object(target), Value::Object(source)) = (&mut *body, overrides) {
        for key in OVERRIDE_WHITELIST {
            if let Some(value) = source.get(*key) {
                target.insert((*key).to_string(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_statuses_never_retry_or_switch_keys() {
        let verdict = classify_status(200, "");
        assert!(!verdict.should_retry);
        assert!(!verdict.should_try_next_key);
    }

    #[test]
    fn auth_failures_switch_keys_without_retrying_the_same_one() {
        let verdict = classify_status(401, "unauthorized");
        assert!(!verdict.should_retry);
        assert!(verdict.should_try_next_key);
    }

    #[test]
    fn rate_limit_retries_and_switches_keys() {
        let verdict = classify_status(429, "slow down");
        assert!(verdict.should_retry);
        assert!(verdict.should_try_next_key);
    }

    #[test]
    fn server_errors_retry_on_the_same_key() {
        let verdict = classify_status(503, "unavailable");
        assert!(verdict.should_retry);
        assert!(!verdict.should_try_next_key);
    }

    #[test]
    fn permanent_client_errors_neither_retry_nor_switch() {
        let verdict = classify_status(400, "bad request");
        assert!(!verdict.should_retry);
        assert!(!verdict.should_try_next_key);
    }

    #[test]
    fn classification_table_covers_every_distinct_status() {
        let cases: &[(u16, bool, bool)] = &[
            (200, false, false),
            (400, false, false),
            (401, false, true),
            (403, false, true),
            (404, false, false),
            (408, true, false),
            (422, false, false),
            (429, true, true),
            (500, true, false),
            (502, true, false),
            (503, true, false),
            (504, true, false),
        ];
        for &(status, should_retry, should_try_next_key) in cases {
            let verdict = classify_status(status, "body");
            assert_eq!(verdict.should_retry, should_retry, "status {status} retry");
            assert_eq!(verdict.should_try_next_key, should_try_next_key, "status {status} next key");
        }
    }

    #[test]
    fn overrides_only_apply_whitelisted_keys() {
        let mut body = json!({"messages": []});
        let overrides = json!({"temperature": 0.2, "top_p": 0.9, "stream": true, "model": "evil"});
        apply_overrides(&mut body, &overrides);
        assert_eq!(body["temperature"], json!(0.2));
        assert_eq!(body["top_p"], json!(0.9));
        assert!(body.get("stream").is_none());
        assert!(body.get("model").is_none());
    }
}
