//! Message normalizer — converts provider-specific payloads into a
//! `CanonicalMessage`.
//!
//! Providers disagree on field names (`sender.name` vs `senderName` vs
//! `from`), so every field is coalesced across the shapes seen in the wild.
//! The synthetic `temp_<timestamp>` id assigned when a provider supplies no
//! external id is NOT stable across calls and must never be used as an
//! idempotency key.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::error::ValidationError;
use crate::pipeline::types::{CanonicalMessage, SourcePlatform};

/// Substituted when the provider had no subject line.
pub const DEFAULT_SUBJECT: &str = "No Subject";

/// Normalize a raw provider payload into a `CanonicalMessage`.
///
/// Fails with `ValidationError` when no non-empty content can be coalesced —
/// an empty message cannot be analyzed.
pub fn normalize(
    raw: &Value,
    platform: SourcePlatform,
    user_id: &str,
) -> Result<CanonicalMessage, ValidationError> {
    let content = match coalesce_str(raw, &["content", "body", "text"]) {
        None => return Err(ValidationError::MissingField { field: "content" }),
        Some(c) if c.trim().is_empty() => return Err(ValidationError::EmptyContent),
        Some(c) => c.trim().to_string(),
    };

    let sender_email = coalesce_sender_email(raw).unwrap_or_default();
    let sender_name = coalesce_sender_name(raw)
        .or_else(|| {
            if sender_email.is_empty() {
                None
            } else {
                Some(sender_email.clone())
            }
        })
        .unwrap_or_else(|| "Unknown sender".to_string());

    let subject = coalesce_str(raw, &["subject"])
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| DEFAULT_SUBJECT.to_string());

    let timestamp = coalesce_timestamp(raw).unwrap_or_else(Utc::now);

    let external_id = coalesce_str(raw, &["externalId", "external_id", "messageId", "message_id", "id"])
        .filter(|s| !s.trim().is_empty());

    let id = match &external_id {
        Some(ext) => ext.clone(),
        None => {
            let synthetic = format!("temp_{}", Utc::now().timestamp_millis());
            debug!(id = %synthetic, platform = %platform, "No external id, assigned synthetic id");
            synthetic
        }
    };

    Ok(CanonicalMessage {
        id,
        external_id,
        user_id: user_id.to_string(),
        source_platform: platform,
        sender_name,
        sender_email: sender_email.to_lowercase(),
        subject,
        content,
        timestamp,
    })
}

// ── Field coalescing ────────────────────────────────────────────────

/// First non-null string value among the named top-level keys.
fn coalesce_str(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| raw.get(k).and_then(Value::as_str))
        .map(String::from)
}

/// Sender display name: nested `sender.name`, then flat variants.
fn coalesce_sender_name(raw: &Value) -> Option<String> {
    raw.get("sender")
        .and_then(|s| s.get("name"))
        .and_then(Value::as_str)
        .map(String::from)
        .or_else(|| coalesce_str(raw, &["senderName", "sender_name", "from"]))
        .filter(|s| !s.trim().is_empty())
}

/// Sender address: nested `sender.email`, then flat variants.
fn coalesce_sender_email(raw: &Value) -> Option<String> {
    raw.get("sender")
        .and_then(|s| s.get("email"))
        .and_then(Value::as_str)
        .map(String::from)
        .or_else(|| coalesce_str(raw, &["senderEmail", "sender_email", "email", "fromAddress"]))
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().to_string())
}

/// Sent-at timestamp from any of the known field names, RFC 3339.
fn coalesce_timestamp(raw: &Value) -> Option<DateTime<Utc>> {
    coalesce_str(raw, &["timestamp", "receivedAt", "received_at", "date"])
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
