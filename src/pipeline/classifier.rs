//! Sentiment and topic classification.
//!
//! The `Classifier` trait is the seam for model-backed implementations; the
//! shipped `LexicalClassifier` is heuristic and never calls out. The
//! orchestrator treats any implementation as an unreliable upstream —
//! failures and timeouts fall back to a neutral classification.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::error::AnalysisError;
use crate::pipeline::types::{CanonicalMessage, Classification, Sentiment};

/// Sentiment/topic classification over a normalized message.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, message: &CanonicalMessage)
    -> Result<Classification, AnalysisError>;
}

// ── Lexicons ────────────────────────────────────────────────────────

static POSITIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(thanks|thank you|great|excellent|congrats|congratulations|appreciate|excited|well done|fantastic|love|happy|pleased)\b",
    )
    .unwrap()
});

static NEGATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(problem|issue|concern|concerned|unfortunately|disappointed|complaint|delay|delayed|failed|failure|blocker|blocked|wrong|unacceptable|frustrated)\b",
    )
    .unwrap()
});

/// Imperative/deadline language that makes a message `urgent` regardless of
/// tone.
static IMPERATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(urgent|urgently|asap|immediately|right away|deadline|overdue|time[- ]sensitive)\b|\b(need|must|due)\b.{0,40}\b(by|before)\b",
    )
    .unwrap()
});

/// Topic label → trigger keywords.
const TOPIC_RULES: &[(&str, &[&str])] = &[
    ("board", &["board", "governance", "director"]),
    (
        "finance",
        &["budget", "invoice", "revenue", "forecast", "expense", "payment"],
    ),
    (
        "fundraising",
        &["investor", "funding", "fundraise", "term sheet", "round"],
    ),
    (
        "meeting",
        &["meeting", "calendar", "schedule", "call", "sync"],
    ),
    ("legal", &["contract", "agreement", "legal", "nda", "compliance"]),
    (
        "hiring",
        &["hiring", "hire", "candidate", "interview", "recruiting", "offer letter"],
    ),
    (
        "product",
        &["product", "launch", "feature", "roadmap", "release"],
    ),
    (
        "sales",
        &["deal", "proposal", "pipeline", "customer", "client", "renewal"],
    ),
];

/// Heuristic lexical classifier — the default implementation.
pub struct LexicalClassifier;

#[async_trait]
impl Classifier for LexicalClassifier {
    async fn classify(
        &self,
        message: &CanonicalMessage,
    ) -> Result<Classification, AnalysisError> {
        let text = format!("{}\n{}", message.subject, message.content);
        Ok(Classification {
            sentiment: detect_sentiment(&text),
            topics: detect_topics(&text),
        })
    }
}

/// Sentiment from lexical signal.
///
/// Imperative/deadline language wins over tone — a politely worded message
/// with a hard deadline is `urgent`, not `positive`.
fn detect_sentiment(text: &str) -> Sentiment {
    if IMPERATIVE_RE.is_match(text) {
        return Sentiment::Urgent;
    }

    let positive = POSITIVE_RE.find_iter(text).count();
    let negative = NEGATIVE_RE.find_iter(text).count();
    if positive > negative {
        Sentiment::Positive
    } else if negative > positive {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// Deduplicated topic labels in deterministic (sorted) order.
fn detect_topics(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut topics = BTreeSet::new();
    for (topic, keywords) in TOPIC_RULES {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            topics.insert((*topic).to_string());
        }
    }
    topics.into_iter().collect()
}
