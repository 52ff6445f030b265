//! Configuration types.
//!
//! Every scoring weight and timeout lives here as a named, tunable value —
//! the sampled weighting scheme is not final, so nothing is hard-coded at
//! the call sites.

use std::time::Duration;

use crate::error::ConfigError;

/// Weights and bounds for the priority scorer.
///
/// The final score is the clamped sum of the VIP, urgency, deadline,
/// exclamation, and recency contributions. Defaults put the VIP
/// contribution at roughly 40% of the scale.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Points per VIP priority level (levels run 0–10).
    pub vip_level_weight: f64,
    /// Points per distinct urgency keyword found in subject or content.
    pub urgency_keyword_weight: f64,
    /// Cap on total urgency-keyword points.
    pub urgency_keyword_cap: f64,
    /// Points for deadline language ("by Friday", "due tomorrow", ...).
    pub deadline_weight: f64,
    /// Points per exclamation mark.
    pub exclamation_weight: f64,
    /// Cap on total exclamation points.
    pub exclamation_cap: f64,
    /// Points for a message younger than `recency_window`.
    pub recency_weight: f64,
    /// Age below which a message earns the full recency contribution.
    pub recency_window: Duration,
    /// Half-life of the recency contribution beyond the window.
    pub recency_half_life: Duration,
    /// Score at or above which a message is flagged urgent.
    pub urgent_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            vip_level_weight: 4.0,       // level 10 → 40 points
            urgency_keyword_weight: 12.0,
            urgency_keyword_cap: 36.0,
            deadline_weight: 15.0,
            exclamation_weight: 3.0,
            exclamation_cap: 9.0,
            recency_weight: 10.0,
            recency_window: Duration::from_secs(48 * 3600),
            recency_half_life: Duration::from_secs(72 * 3600),
            urgent_threshold: 80.0,
        }
    }
}

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Scoring weights.
    pub scoring: ScoringConfig,
    /// Timeout for the sentiment/topic classifier sub-step.
    pub classifier_timeout: Duration,
    /// Timeout for the action extractor sub-step.
    pub extractor_timeout: Duration,
    /// Maximum summary length in characters.
    pub summary_max_chars: usize,
    /// How long a losing claimant waits for the winner's result.
    pub claim_wait: Duration,
    /// Poll interval while waiting on a concurrent claim.
    pub claim_poll_interval: Duration,
    /// Claims older than this are considered abandoned and taken over.
    pub stale_claim_after: Duration,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            classifier_timeout: Duration::from_secs(10),
            extractor_timeout: Duration::from_secs(10),
            summary_max_chars: 240,
            claim_wait: Duration::from_secs(15),
            claim_poll_interval: Duration::from_millis(100),
            stale_claim_after: Duration::from_secs(120),
        }
    }
}

impl AnalyzerConfig {
    /// Defaults with deployment knobs overridable from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        if let Ok(raw) = std::env::var("INBOX_PULSE_URGENT_THRESHOLD") {
            cfg.scoring.urgent_threshold = parse_f64("INBOX_PULSE_URGENT_THRESHOLD", &raw)?;
        }
        if let Ok(raw) = std::env::var("INBOX_PULSE_CLASSIFIER_TIMEOUT_SECS") {
            cfg.classifier_timeout =
                Duration::from_secs(parse_u64("INBOX_PULSE_CLASSIFIER_TIMEOUT_SECS", &raw)?);
        }
        if let Ok(raw) = std::env::var("INBOX_PULSE_EXTRACTOR_TIMEOUT_SECS") {
            cfg.extractor_timeout =
                Duration::from_secs(parse_u64("INBOX_PULSE_EXTRACTOR_TIMEOUT_SECS", &raw)?);
        }
        if let Ok(raw) = std::env::var("INBOX_PULSE_SUMMARY_MAX_CHARS") {
            cfg.summary_max_chars =
                parse_u64("INBOX_PULSE_SUMMARY_MAX_CHARS", &raw)? as usize;
        }
        Ok(cfg)
    }
}

fn parse_f64(key: &str, raw: &str) -> Result<f64, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("expected a number, got '{raw}'"),
    })
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("expected an integer, got '{raw}'"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_vip_contribution_is_forty_percent() {
        let cfg = ScoringConfig::default();
        assert!((cfg.vip_level_weight * 10.0 - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn default_threshold_is_eighty() {
        let cfg = ScoringConfig::default();
        assert!((cfg.urgent_threshold - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_helpers_accept_valid_values() {
        assert!((parse_f64("K", "82.5").unwrap() - 82.5).abs() < f64::EPSILON);
        assert_eq!(parse_u64("K", "30").unwrap(), 30);
    }

    #[test]
    fn parse_helpers_reject_garbage_with_the_key_named() {
        let err = parse_u64("INBOX_PULSE_SUMMARY_MAX_CHARS", "soon").unwrap_err();
        match err {
            ConfigError::InvalidValue { key, .. } => {
                assert_eq!(key, "INBOX_PULSE_SUMMARY_MAX_CHARS");
            }
        }
    }
}
