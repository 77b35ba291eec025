//! Structured logging setup and secret redaction.
//!
//! Logs go to stderr through `tracing-subscriber` so stdout stays reserved
//! for the per-item run log (`ok <key>` / `fail <key>`) and summaries.
//! `RUST_LOG` controls the filter (default `info`).
//!
//! Anything that may carry credentials (request headers, issue-tracker
//! parameters) goes through [`log_details`], which masks secret-looking keys
//! before the event is emitted.

use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

const REDACTED: &str = "[REDACTED]";

const SECRET_FIELDS: &[&str] = &[
    "authorization",
    "authorization_header",
    "x-api-key",
    "apikey",
    "api_key",
    "token",
    "access_token",
    "refresh_token",
    "secret",
    "password",
    "cookie",
    "set-cookie",
    "x-auth-token",
    "bearer_token",
];

/// Install the global subscriber. Safe to call more than once.
pub fn init_subscriber(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.with_ansi(atty::is(atty::Stream::Stderr)).try_init()
    };
    // A subscriber is already installed (tests, embedding binaries).
    let _ = result;
}

/// Fresh trace identifier for one command invocation.
pub fn new_trace_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn is_secret_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    SECRET_FIELDS.contains(&lower.as_str())
        || ["token", "secret", "password", "key", "auth"]
            .iter()
            .any(|needle| lower.contains(needle))
}

/// Replace the values of secret-looking keys with `"[REDACTED]"`, recursively.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, val) in map {
                if is_secret_key(key) {
                    out.insert(key.clone(), Value::String(REDACTED.to_string()));
                } else {
                    out.insert(key.clone(), redact(val));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

/// Emit a debug event with redacted details.
pub fn log_details(event: &str, details: &Value) {
    tracing::debug!(event = event, details = %redact(details), "details");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_known_and_pattern_keys() {
        let input = json!({
            "Authorization": "Bearer abc",
            "githubToken": "ghp_123",
            "url": "https://api.github.com/repos/x/y/issues",
            "nested": [{ "client_secret": "s", "page": 2 }]
        });
        let out = redact(&input);
        assert_eq!(out["Authorization"], json!("[REDACTED]"));
        assert_eq!(out["githubToken"], json!("[REDACTED]"));
        assert_eq!(out["url"], input["url"]);
        assert_eq!(out["nested"][0]["client_secret"], json!("[REDACTED]"));
        assert_eq!(out["nested"][0]["page"], json!(2));
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(redact(&json!("token")), json!("token"));
        assert_eq!(redact(&json!(3)), json!(3));
        assert_eq!(redact(&Value::Null), Value::Null);
    }

    #[test]
    fn trace_ids_are_unique() {
        assert_ne!(new_trace_id(), new_trace_id());
    }
}
