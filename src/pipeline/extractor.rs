//! Action item extraction.
//!
//! Scans a message sentence by sentence for actionable language, infers the
//! category from the triggering phrase, and parses explicit or relative due
//! dates against the message timestamp. Unparsable date hints leave the due
//! date absent rather than guessing.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use regex::Regex;

use crate::error::AnalysisError;
use crate::pipeline::types::{ActionCategory, ActionItem, ActionPriority, CanonicalMessage};

/// Maximum title length in characters.
const TITLE_MAX_CHARS: usize = 80;

/// Due dates resolve to end of business on the target day.
const BUSINESS_EOD_HOUR: u32 = 17;

/// Action extraction over a normalized message.
#[async_trait]
pub trait ActionExtractor: Send + Sync {
    async fn extract(&self, message: &CanonicalMessage)
    -> Result<Vec<ActionItem>, AnalysisError>;
}

// ── Trigger patterns ────────────────────────────────────────────────

static APPROVAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(approv(?:e|al)|sign[- ]?off|authoriz(?:e|ation)|green[- ]?light)\b")
        .unwrap()
});

static DECISION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(decide|decision|should we|which option|choose between|go\/no[- ]go)\b")
        .unwrap()
});

static MEETING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(meet(?:ing)?|schedule a call|set up (?:a )?(?:call|time)|calendar|sync up)\b")
        .unwrap()
});

static RESPONSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(let me know|please (?:reply|respond|confirm)|get back to (?:me|us)|rsvp|your thoughts)\b")
        .unwrap()
});

static REVIEW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(review|take a look|look over|feedback on|proofread|double[- ]check)\b")
        .unwrap()
});

/// Generic ask with no category-specific trigger — defaults to review.
static GENERIC_ASK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(please|can you|could you|would you|action required|need you to)\b")
        .unwrap()
});

static CRITICAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(urgent|urgently|asap|immediately|emergency|critical)\b").unwrap()
});

static LOW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(no rush|when you (?:get|have) a chance|whenever|no hurry|low priority)\b")
        .unwrap()
});

/// Due-date hint: "by Friday", "before 2026-03-01", "due Mar 3", "deadline is EOD".
static DUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:by|before|due(?:\s+on)?|deadline(?:\s+is)?)\s+(tomorrow|today|tonight|eod|end of day|end of week|next week|monday|tuesday|wednesday|thursday|friday|saturday|sunday|\d{4}-\d{2}-\d{2}|(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2})\b",
    )
    .unwrap()
});

/// Heuristic pattern-based extractor — the default implementation.
pub struct PatternExtractor;

#[async_trait]
impl ActionExtractor for PatternExtractor {
    async fn extract(
        &self,
        message: &CanonicalMessage,
    ) -> Result<Vec<ActionItem>, AnalysisError> {
        let mut items = Vec::new();
        for sentence in sentences(&message.content) {
            let Some(category) = detect_category(sentence) else {
                continue;
            };

            let due = parse_due_date(sentence, message.timestamp);
            let priority = detect_priority(sentence, due.is_some());

            let mut item = ActionItem::new(
                truncate_chars(sentence, TITLE_MAX_CHARS),
                sentence.to_string(),
                category,
                priority,
            );
            if let Some(due) = due {
                item = item.with_due_date(due);
            }
            items.push(item);
        }
        Ok(items)
    }
}

// ── Sentence scanning ───────────────────────────────────────────────

fn sentences(content: &str) -> impl Iterator<Item = &str> {
    content
        .split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Category from the triggering language; `None` when the sentence asks for
/// nothing.
fn detect_category(sentence: &str) -> Option<ActionCategory> {
    if APPROVAL_RE.is_match(sentence) {
        Some(ActionCategory::Approval)
    } else if DECISION_RE.is_match(sentence) {
        Some(ActionCategory::Decision)
    } else if MEETING_RE.is_match(sentence) {
        Some(ActionCategory::Meeting)
    } else if RESPONSE_RE.is_match(sentence) {
        Some(ActionCategory::Response)
    } else if REVIEW_RE.is_match(sentence) {
        Some(ActionCategory::Review)
    } else if GENERIC_ASK_RE.is_match(sentence) {
        // Ambiguous ask — default to review
        Some(ActionCategory::Review)
    } else {
        None
    }
}

fn detect_priority(sentence: &str, has_due_date: bool) -> ActionPriority {
    if CRITICAL_RE.is_match(sentence) {
        ActionPriority::Critical
    } else if LOW_RE.is_match(sentence) {
        ActionPriority::Low
    } else if has_due_date || sentence.contains('!') {
        ActionPriority::High
    } else {
        ActionPriority::Medium
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

// ── Due-date parsing ────────────────────────────────────────────────

/// Parse a due-date expression relative to the message timestamp.
///
/// Returns `None` when no hint is present or the hint cannot be resolved.
pub fn parse_due_date(text: &str, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let captures = DUE_RE.captures(text)?;
    let target = captures.get(1)?.as_str().to_lowercase();
    resolve_target(&target, reference).map(at_end_of_business)
}

fn resolve_target(target: &str, reference: DateTime<Utc>) -> Option<NaiveDate> {
    let today = reference.date_naive();

    match target {
        "today" | "tonight" | "eod" | "end of day" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "next week" => return Some(today + Duration::days(7)),
        "end of week" => {
            // Friday of the current week, or next Friday when already past.
            let ahead = (4 - i64::from(today.weekday().num_days_from_monday())).rem_euclid(7);
            return Some(today + Duration::days(ahead));
        }
        _ => {}
    }

    if let Some(weekday_index) = weekday_index(target) {
        let ahead =
            (weekday_index - i64::from(today.weekday().num_days_from_monday())).rem_euclid(7);
        return Some(today + Duration::days(ahead));
    }

    if let Ok(date) = NaiveDate::parse_from_str(target, "%Y-%m-%d") {
        return Some(date);
    }

    parse_month_day(target, today)
}

fn weekday_index(name: &str) -> Option<i64> {
    match name {
        "monday" => Some(0),
        "tuesday" => Some(1),
        "wednesday" => Some(2),
        "thursday" => Some(3),
        "friday" => Some(4),
        "saturday" => Some(5),
        "sunday" => Some(6),
        _ => None,
    }
}

/// "mar 3", "march 3", "mar. 3" — year inferred from the reference date,
/// rolling into next year when the day has already passed.
fn parse_month_day(target: &str, today: NaiveDate) -> Option<NaiveDate> {
    let mut parts = target.split_whitespace();
    let month_part = parts.next()?;
    let day: u32 = parts.next()?.parse().ok()?;

    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let month = MONTHS
        .iter()
        .position(|m| month_part.starts_with(m))
        .map(|i| i as u32 + 1)?;

    let candidate = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if candidate < today {
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)
    } else {
        Some(candidate)
    }
}

fn at_end_of_business(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(BUSINESS_EOD_HOUR, 0, 0)
        .expect("valid fixed time")
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::SourcePlatform;
    use chrono::{TimeZone, Timelike, Weekday};

    fn make_message(content: &str) -> CanonicalMessage {
        CanonicalMessage {
            id: "m-1".into(),
            external_id: None,
            user_id: "u1".into(),
            source_platform: SourcePlatform::Email,
            sender_name: "Sender".into(),
            sender_email: "s@x.com".into(),
            subject: "No Subject".into(),
            content: content.into(),
            // Monday 2026-03-02, 09:00 UTC
            timestamp: Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
        }
    }

    async fn extract(content: &str) -> Vec<ActionItem> {
        PatternExtractor
            .extract(&make_message(content))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn approval_request_extracted() {
        let items = extract("URGENT: need board approval by Friday").await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].category, ActionCategory::Approval);
        assert_eq!(items[0].priority, ActionPriority::Critical);
        assert!(items[0].due_date.is_some());
    }

    #[tokio::test]
    async fn no_actionable_language_yields_zero_items() {
        let items = extract("The weather in Lisbon was lovely last week.").await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn categories_inferred_from_triggers() {
        let cases = [
            ("Please sign off on the Q3 budget", ActionCategory::Approval),
            ("Should we go with vendor A or B", ActionCategory::Decision),
            ("Can we schedule a call for next week", ActionCategory::Meeting),
            ("Let me know if Thursday works", ActionCategory::Response),
            ("Take a look at the draft deck", ActionCategory::Review),
        ];
        for (content, expected) in cases {
            let items = extract(content).await;
            assert_eq!(items.len(), 1, "no item for {content:?}");
            assert_eq!(items[0].category, expected, "wrong category for {content:?}");
        }
    }

    #[tokio::test]
    async fn ambiguous_ask_defaults_to_review() {
        let items = extract("Could you handle the vendor paperwork").await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].category, ActionCategory::Review);
    }

    #[tokio::test]
    async fn one_item_per_actionable_sentence_in_order() {
        let items =
            extract("Please review the contract. Also, let me know about dinner. Thanks!").await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].category, ActionCategory::Review);
        assert_eq!(items[1].category, ActionCategory::Response);
    }

    #[tokio::test]
    async fn items_start_pending() {
        let items = extract("Please review the numbers").await;
        assert_eq!(
            items[0].status,
            crate::pipeline::types::ActionStatus::Pending
        );
    }

    #[tokio::test]
    async fn long_sentence_title_truncated() {
        let long = format!("Please review {}", "the very long document ".repeat(10));
        let items = extract(&long).await;
        assert!(items[0].title.chars().count() <= TITLE_MAX_CHARS);
        assert!(items[0].description.len() > items[0].title.len());
    }

    #[tokio::test]
    async fn no_rush_is_low_priority() {
        let items = extract("Review the notes whenever, no rush").await;
        assert_eq!(items[0].priority, ActionPriority::Low);
    }

    #[tokio::test]
    async fn due_date_raises_priority() {
        let items = extract("Please review the contract by Friday").await;
        assert_eq!(items[0].priority, ActionPriority::High);
    }

    // ── Due-date parsing ────────────────────────────────────────────

    fn reference() -> DateTime<Utc> {
        // Monday 2026-03-02
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    #[test]
    fn parses_by_weekday() {
        let due = parse_due_date("need this by Friday", reference()).unwrap();
        assert_eq!(due.date_naive(), NaiveDate::from_ymd_opt(2026, 3, 6).unwrap());
        assert_eq!(due.date_naive().weekday(), Weekday::Fri);
    }

    #[test]
    fn same_weekday_resolves_to_today() {
        let due = parse_due_date("due Monday", reference()).unwrap();
        assert_eq!(due.date_naive(), reference().date_naive());
    }

    #[test]
    fn parses_by_tomorrow() {
        let due = parse_due_date("send it before tomorrow", reference()).unwrap();
        assert_eq!(due.date_naive(), NaiveDate::from_ymd_opt(2026, 3, 3).unwrap());
    }

    #[test]
    fn parses_eod() {
        let due = parse_due_date("deadline is EOD", reference()).unwrap();
        assert_eq!(due.date_naive(), reference().date_naive());
    }

    #[test]
    fn parses_end_of_week() {
        let due = parse_due_date("wrap this up by end of week", reference()).unwrap();
        assert_eq!(due.date_naive().weekday(), Weekday::Fri);
    }

    #[test]
    fn parses_iso_date() {
        let due = parse_due_date("submit by 2026-04-01", reference()).unwrap();
        assert_eq!(due.date_naive(), NaiveDate::from_ymd_opt(2026, 4, 1).unwrap());
    }

    #[test]
    fn parses_month_day() {
        let due = parse_due_date("due Mar 15", reference()).unwrap();
        assert_eq!(due.date_naive(), NaiveDate::from_ymd_opt(2026, 3, 15).unwrap());
    }

    #[test]
    fn month_day_in_past_rolls_to_next_year() {
        let due = parse_due_date("due Jan 5", reference()).unwrap();
        assert_eq!(due.date_naive(), NaiveDate::from_ymd_opt(2027, 1, 5).unwrap());
    }

    #[test]
    fn no_hint_yields_none() {
        assert!(parse_due_date("please review the attached", reference()).is_none());
    }

    #[test]
    fn unparsable_hint_yields_none() {
        // "by the time the stars align" — a hint we refuse to guess at
        assert!(parse_due_date("by the time the stars align", reference()).is_none());
    }

    #[test]
    fn due_date_is_end_of_business() {
        let due = parse_due_date("by Friday", reference()).unwrap();
        assert_eq!(due.time().hour(), BUSINESS_EOD_HOUR);
    }
}
