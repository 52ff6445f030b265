//! Priority scorer — 0–100 urgency/importance from sender weight, content
//! signals, and recency.
//!
//! `score` is a pure function: no I/O, no clock reads, no side effects. The
//! caller resolves the VIP status and supplies the reference time, which
//! keeps the function independently testable and the registry an explicit
//! dependency rather than an ambient one.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::config::ScoringConfig;
use crate::contacts::VipStatus;
use crate::pipeline::types::{CanonicalMessage, PriorityVerdict};

/// Explicit urgency keywords, matched on word boundaries.
static URGENCY_KEYWORDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(urgent|urgently|asap|critical|immediately|emergency|board|investor|time[- ]sensitive|eod)\b",
    )
    .unwrap()
});

/// Deadline language: "by Friday", "due tomorrow", "before EOD", "deadline".
static DEADLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(deadline|overdue)\b|\b(by|before|due)\s+(monday|tuesday|wednesday|thursday|friday|saturday|sunday|tomorrow|today|tonight|noon|eod|end of (day|week|month)|next week|\d{1,2}[:/]\d{1,2}|\d{4}-\d{2}-\d{2}|(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2})",
    )
    .unwrap()
});

/// Compute the priority verdict for a message.
///
/// Deterministic in its inputs. `now` is the reference time for recency;
/// pass `Utc::now()` in production and a fixed instant in tests.
pub fn score(
    message: &CanonicalMessage,
    vip: VipStatus,
    now: DateTime<Utc>,
    cfg: &ScoringConfig,
) -> PriorityVerdict {
    let text = scored_text(message);

    let vip_points = f64::from(vip.level) * cfg.vip_level_weight;
    let keyword_points = (distinct_keyword_hits(&text) as f64 * cfg.urgency_keyword_weight)
        .min(cfg.urgency_keyword_cap);
    let deadline_hit = DEADLINE_RE.is_match(&text);
    let deadline_points = if deadline_hit { cfg.deadline_weight } else { 0.0 };
    let exclamation_points =
        (exclamation_count(&text) as f64 * cfg.exclamation_weight).min(cfg.exclamation_cap);
    let recency_points = recency_points(message.timestamp, now, cfg);
    let fresh = now.signed_duration_since(message.timestamp).num_seconds().max(0) as f64
        <= cfg.recency_window.as_secs_f64();

    let total = vip_points + keyword_points + deadline_points + exclamation_points + recency_points;
    let clamped = total.clamp(0.0, 100.0);

    let urgency_points = keyword_points + deadline_points + exclamation_points;
    let reason = build_reason(
        vip,
        vip_points,
        urgency_points,
        deadline_hit,
        keyword_points > 0.0,
        exclamation_points > 0.0,
        fresh,
    );

    PriorityVerdict {
        score: clamped.round() as u8,
        reason,
        is_urgent: clamped >= cfg.urgent_threshold,
        is_vip: vip.is_vip,
    }
}

// ── Signal helpers ──────────────────────────────────────────────────

/// Subject + content, the haystack every content signal runs over.
fn scored_text(message: &CanonicalMessage) -> String {
    format!("{}\n{}", message.subject, message.content)
}

/// Number of distinct urgency keywords present (repeats count once).
fn distinct_keyword_hits(text: &str) -> usize {
    URGENCY_KEYWORDS_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect::<HashSet<_>>()
        .len()
}

fn exclamation_count(text: &str) -> usize {
    text.chars().filter(|c| *c == '!').count()
}

/// Full weight within the recency window, exponential decay beyond it.
fn recency_points(sent: DateTime<Utc>, now: DateTime<Utc>, cfg: &ScoringConfig) -> f64 {
    let age = now.signed_duration_since(sent).num_seconds().max(0) as f64;
    let window = cfg.recency_window.as_secs_f64();
    if age <= window {
        return cfg.recency_weight;
    }
    let half_life = cfg.recency_half_life.as_secs_f64().max(1.0);
    let excess = age - window;
    cfg.recency_weight * 0.5_f64.powf(excess / half_life)
}

/// Short justification naming the dominant factor.
///
/// When the VIP and urgency contributions are equal, VIP status takes
/// precedence in the ordering.
#[allow(clippy::too_many_arguments)]
fn build_reason(
    vip: VipStatus,
    vip_points: f64,
    urgency_points: f64,
    deadline_hit: bool,
    keyword_hit: bool,
    exclamation_hit: bool,
    recent: bool,
) -> String {
    let vip_part = vip.is_vip.then(|| format!("VIP sender (level {})", vip.level));
    let urgency_part = if deadline_hit {
        Some("deadline language".to_string())
    } else if keyword_hit {
        Some("urgency keywords".to_string())
    } else if exclamation_hit {
        Some("emphatic tone".to_string())
    } else {
        None
    };

    let mut parts: Vec<String> = Vec::new();
    match (vip_part, urgency_part) {
        (Some(v), Some(u)) => {
            if vip_points >= urgency_points {
                parts.push(v);
                parts.push(u);
            } else {
                parts.push(u);
                parts.push(v);
            }
        }
        (Some(v), None) => parts.push(v),
        (None, Some(u)) => parts.push(u),
        (None, None) => {}
    }

    if parts.is_empty() {
        return if recent {
            "recent message, no strong signals".to_string()
        } else {
            "no strong signals".to_string()
        };
    }
    parts.join(" + ")
}
