//! Shared types for the message analysis pipeline.
//!
//! Field names in the serialized forms are the stable wire contract — any
//! HTTP or event-bus boundary wrapping this core preserves them as-is.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

// ── Source platform ─────────────────────────────────────────────────

/// Which provider a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourcePlatform {
    Email,
    Slack,
    Teams,
    Discord,
}

impl SourcePlatform {
    /// Short label for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Slack => "slack",
            Self::Teams => "teams",
            Self::Discord => "discord",
        }
    }
}

impl fmt::Display for SourcePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourcePlatform {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "slack" => Ok(Self::Slack),
            "teams" => Ok(Self::Teams),
            "discord" => Ok(Self::Discord),
            other => Err(ValidationError::UnknownPlatform {
                value: other.to_string(),
            }),
        }
    }
}

// ── Canonical message ───────────────────────────────────────────────

/// Platform-agnostic normalized representation of an inbound message.
///
/// Immutable once constructed — every pipeline sub-step reads it, none
/// mutate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalMessage {
    /// Unique within the user's message space. Synthetic (`temp_<ts>`) when
    /// the provider supplied no id.
    pub id: String,
    /// Provider-native identifier, when present. The only value allowed to
    /// serve as an idempotency key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Owning user.
    pub user_id: String,
    /// Provider the message came from.
    pub source_platform: SourcePlatform,
    /// Human-readable sender name.
    pub sender_name: String,
    /// Sender address. Empty for platforms without addressable identity.
    pub sender_email: String,
    /// Subject line, `"No Subject"` when the provider had none.
    pub subject: String,
    /// Plain-text body. Never empty.
    pub content: String,
    /// When the message was sent ("now" when the provider omitted it).
    pub timestamp: DateTime<Utc>,
}

// ── Analysis result ─────────────────────────────────────────────────

/// Sentiment label for a message.
///
/// `Urgent` is reserved for imperative/deadline language — it is not the
/// same thing as negative tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    Urgent,
}

/// Output of the sentiment/topic classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub sentiment: Sentiment,
    /// Deduplicated, deterministically ordered topic labels. Empty is valid.
    pub topics: Vec<String>,
}

impl Classification {
    /// Degraded fallback when the classifier is unavailable.
    pub fn neutral() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            topics: Vec::new(),
        }
    }
}

/// Priority verdict for a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityVerdict {
    /// 0–100.
    pub score: u8,
    /// Short justification referencing the dominant contributing factor.
    pub reason: String,
    pub is_urgent: bool,
    pub is_vip: bool,
}

/// What kind of work an action item asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    Approval,
    Review,
    Decision,
    Meeting,
    Response,
}

/// Priority of a single action item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// Lifecycle status of an action item.
///
/// Downstream workflow may mutate status; analysis content is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    InProgress,
    Completed,
}

/// A discrete actionable task extracted from a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    /// Stable id so downstream workflow can address the item once persisted.
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: ActionCategory,
    pub priority: ActionPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub status: ActionStatus,
}

impl ActionItem {
    /// Create a pending action item.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        category: ActionCategory,
        priority: ActionPriority,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            category,
            priority,
            due_date: None,
            status: ActionStatus::Pending,
        }
    }

    /// Builder: set due date.
    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }
}

/// The pipeline's output — one per message id, replaceable but idempotent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Human-readable synopsis, bounded length.
    pub summary: String,
    pub priority: PriorityVerdict,
    pub sentiment: Sentiment,
    pub topics: Vec<String>,
    /// Extraction order, not significance order.
    pub action_items: Vec<ActionItem>,
    pub analyzed_at: DateTime<Utc>,
    /// True when a non-critical sub-step failed and heuristic fallbacks were
    /// substituted. Retriable by re-submitting after the upstream recovers.
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_message() -> CanonicalMessage {
        CanonicalMessage {
            id: "m-1".into(),
            external_id: Some("ext-1".into()),
            user_id: "user-1".into(),
            source_platform: SourcePlatform::Email,
            sender_name: "Alice".into(),
            sender_email: "alice@example.com".into(),
            subject: "Hello".into(),
            content: "Hi there".into(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn platform_parse_roundtrip() {
        for p in [
            SourcePlatform::Email,
            SourcePlatform::Slack,
            SourcePlatform::Teams,
            SourcePlatform::Discord,
        ] {
            let parsed: SourcePlatform = p.as_str().parse().unwrap();
            assert_eq!(parsed, p);
        }
    }

    #[test]
    fn platform_parse_unknown_fails() {
        let err = "carrier-pigeon".parse::<SourcePlatform>().unwrap_err();
        assert!(matches!(err, ValidationError::UnknownPlatform { .. }));
    }

    #[test]
    fn platform_serde_lowercase() {
        let json = serde_json::to_string(&SourcePlatform::Slack).unwrap();
        assert_eq!(json, "\"slack\"");
    }

    #[test]
    fn canonical_message_camel_case_wire_names() {
        let msg = make_message();
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["externalId"], "ext-1");
        assert_eq!(json["userId"], "user-1");
        assert_eq!(json["sourcePlatform"], "email");
        assert_eq!(json["senderEmail"], "alice@example.com");
    }

    #[test]
    fn action_item_defaults_to_pending() {
        let item = ActionItem::new(
            "Approve budget",
            "Q3 budget needs sign-off",
            ActionCategory::Approval,
            ActionPriority::High,
        );
        assert_eq!(item.status, ActionStatus::Pending);
        assert!(item.due_date.is_none());
    }

    #[test]
    fn action_item_wire_names() {
        let due = Utc::now();
        let item = ActionItem::new("T", "D", ActionCategory::Review, ActionPriority::Low)
            .with_due_date(due);
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("dueDate").is_some());
        assert_eq!(json["status"], "pending");
        assert_eq!(json["category"], "review");
    }

    #[test]
    fn action_item_omits_absent_due_date() {
        let item = ActionItem::new("T", "D", ActionCategory::Review, ActionPriority::Low);
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("dueDate").is_none());
    }

    #[test]
    fn action_status_serde_snake_case() {
        let json = serde_json::to_string(&ActionStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn analysis_result_serde_roundtrip_is_stable() {
        let result = AnalysisResult {
            summary: "Alice: Hello".into(),
            priority: PriorityVerdict {
                score: 72,
                reason: "urgency keywords".into(),
                is_urgent: false,
                is_vip: true,
            },
            sentiment: Sentiment::Urgent,
            topics: vec!["board".into(), "finance".into()],
            action_items: vec![ActionItem::new(
                "Approve",
                "Needs sign-off",
                ActionCategory::Approval,
                ActionPriority::Critical,
            )],
            analyzed_at: Utc::now(),
            degraded: false,
            degraded_reason: None,
        };

        let first = serde_json::to_string(&result).unwrap();
        let parsed: AnalysisResult = serde_json::from_str(&first).unwrap();
        let second = serde_json::to_string(&parsed).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn analysis_result_wire_names() {
        let result = AnalysisResult {
            summary: "s".into(),
            priority: PriorityVerdict {
                score: 90,
                reason: "r".into(),
                is_urgent: true,
                is_vip: false,
            },
            sentiment: Sentiment::Neutral,
            topics: vec![],
            action_items: vec![],
            analyzed_at: Utc::now(),
            degraded: true,
            degraded_reason: Some("classifier timed out".into()),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["priority"]["isUrgent"], true);
        assert_eq!(json["priority"]["isVip"], false);
        assert_eq!(json["priority"]["score"], 90);
        assert!(json.get("actionItems").is_some());
        assert_eq!(json["degradedReason"], "classifier timed out");
    }
}
