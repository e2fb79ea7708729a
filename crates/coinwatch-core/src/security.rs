//! Log sanitization and structured audit logging.
//!
//! Everything that reaches a log line passes through [`sanitize_input`]:
//! carriage returns, newlines, tabs and angle brackets are stripped, the
//! result is trimmed and capped at [`MAX_LOG_MESSAGE_LEN`] characters.
//! Structured context is sanitized recursively, so a hostile coin id inside
//! a context object cannot forge a second log line either.

use serde::Serialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const MAX_LOG_MESSAGE_LEN: usize = 1_000;

/// Severity of an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Sanitized entry as it was emitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

pub fn sanitize_input(input: &str) -> String {
    let stripped: String = input
        .chars()
        .filter(|ch| !matches!(ch, '\r' | '\n' | '\t' | '<' | '>'))
        .collect();
    stripped.trim().chars().take(MAX_LOG_MESSAGE_LEN).collect()
}

fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(text) => Value::String(sanitize_input(&text)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (sanitize_input(&key), sanitize_value(value)))
                .collect(),
        ),
        other => other,
    }
}

/// Emit a sanitized audit event through `tracing` and return what was logged.
pub fn secure_log(level: LogLevel, message: &str, data: Option<Value>) -> LogEntry {
    let entry = LogEntry {
        timestamp: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
        level,
        message: sanitize_input(message),
        data: data.map(sanitize_value),
    };

    let context = entry
        .data
        .as_ref()
        .map(Value::to_string)
        .unwrap_or_default();
    match level {
        LogLevel::Info => {
            tracing::info!(target: "coinwatch::audit", context = %context, "{}", entry.message)
        }
        LogLevel::Warn => {
            tracing::warn!(target: "coinwatch::audit", context = %context, "{}", entry.message)
        }
        LogLevel::Error => {
            tracing::error!(target: "coinwatch::audit", context = %context, "{}", entry.message)
        }
    }

    entry
}
