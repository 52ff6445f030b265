//! Analysis orchestrator — composes scoring, classification, and action
//! extraction into one atomic "analyze message" operation.
//!
//! **Core invariant: callers always receive a complete `AnalysisResult`
//! (possibly degraded) or a typed validation/persistence failure — never a
//! raw upstream error and never a half-written analysis.**
//!
//! Flow per message: claim the analysis slot (store-level compare-and-set)
//! → run scorer/classifier/extractor concurrently → merge → persist →
//! publish `message_processed`. A message that already has a persisted
//! analysis replays it without recomputing.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::AnalyzerConfig;
use crate::contacts::{ContactRegistry, VipStatus};
use crate::error::{AnalysisError, Error, StoreError};
use crate::events::{AnalysisEvent, EventBus};
use crate::pipeline::classifier::Classifier;
use crate::pipeline::extractor::ActionExtractor;
use crate::pipeline::normalizer::{DEFAULT_SUBJECT, normalize};
use crate::pipeline::scorer;
use crate::pipeline::types::{
    AnalysisResult, CanonicalMessage, Classification, SourcePlatform,
};
use crate::store::{ClaimOutcome, Store};

/// Analysis orchestrator.
pub struct Analyzer {
    store: Arc<dyn Store>,
    registry: Arc<ContactRegistry>,
    classifier: Arc<dyn Classifier>,
    extractor: Arc<dyn ActionExtractor>,
    events: Arc<EventBus>,
    config: AnalyzerConfig,
}

impl Analyzer {
    /// Create a new analyzer.
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<ContactRegistry>,
        classifier: Arc<dyn Classifier>,
        extractor: Arc<dyn ActionExtractor>,
        events: Arc<EventBus>,
        config: AnalyzerConfig,
    ) -> Self {
        Self {
            store,
            registry,
            classifier,
            extractor,
            events,
            config,
        }
    }

    /// Normalize a raw provider payload and analyze it.
    ///
    /// `message_id` overrides the normalizer-assigned id when the caller
    /// already tracks the message under an identifier of its own.
    pub async fn submit_for_analysis(
        &self,
        user_id: &str,
        message_id: Option<String>,
        raw: &Value,
        platform: SourcePlatform,
    ) -> Result<AnalysisResult, Error> {
        let mut message = normalize(raw, platform, user_id)?;
        if let Some(id) = message_id {
            message.id = id;
        }
        self.analyze(&message).await
    }

    /// Analyze one canonical message.
    ///
    /// Idempotent: a message with a persisted, non-empty analysis returns
    /// the stored result without re-invoking any sub-step.
    pub async fn analyze(&self, message: &CanonicalMessage) -> Result<AnalysisResult, Error> {
        // Fast path — duplicate webhook deliveries and repeated API calls
        // collapse here.
        if let Some(existing) = self.store.load_analysis(&message.id).await?
            && !existing.summary.is_empty()
        {
            debug!(message_id = %message.id, "Returning persisted analysis (idempotent replay)");
            return Ok(existing);
        }

        match self.claim(message).await? {
            ClaimResolution::Acquired => {}
            // Lost race resolved as a successful idempotent replay.
            ClaimResolution::Replayed(result) => return Ok(result),
        }

        // Claim held from here on: every failure path must release it so no
        // partial state is left behind.
        let result = match self.run_pipeline(message).await {
            Ok(result) => result,
            Err(e) => {
                let _ = self.store.release_claim(&message.id).await;
                return Err(e);
            }
        };

        if let Err(e) = self
            .store
            .save_analysis(&message.id, &result, &message.user_id)
            .await
        {
            let _ = self.store.release_claim(&message.id).await;
            return Err(e.into());
        }

        info!(
            message_id = %message.id,
            user_id = %message.user_id,
            score = result.priority.score,
            is_vip = result.priority.is_vip,
            is_urgent = result.priority.is_urgent,
            action_items = result.action_items.len(),
            degraded = result.degraded,
            "Analysis complete"
        );

        // Fire-and-forget: a dead event bus never invalidates the stored
        // analysis.
        self.events.publish(AnalysisEvent::MessageProcessed {
            message_id: message.id.clone(),
            user_id: message.user_id.clone(),
            summary: result.summary.clone(),
            priority_score: result.priority.score,
            is_vip: result.priority.is_vip,
            action_items_count: result.action_items.len(),
        });

        Ok(result)
    }

    // ── Claim handling ──────────────────────────────────────────────

    /// Acquire the analysis slot, or resolve to the concurrent winner's
    /// result.
    async fn claim(&self, message: &CanonicalMessage) -> Result<ClaimResolution, Error> {
        let mut takeover_attempted = false;
        loop {
            match self
                .store
                .claim_analysis(&message.id, &message.user_id)
                .await?
            {
                ClaimOutcome::Claimed => return Ok(ClaimResolution::Acquired),
                ClaimOutcome::Completed(result) => {
                    debug!(message_id = %message.id, "Concurrent analysis already completed");
                    return Ok(ClaimResolution::Replayed(result));
                }
                ClaimOutcome::InProgress { claimed_at } => {
                    let age = Utc::now()
                        .signed_duration_since(claimed_at)
                        .to_std()
                        .unwrap_or_default();
                    if age > self.config.stale_claim_after && !takeover_attempted {
                        warn!(
                            message_id = %message.id,
                            age_secs = age.as_secs(),
                            "Stale claim from an abandoned invocation, taking over"
                        );
                        self.store.release_claim(&message.id).await?;
                        takeover_attempted = true;
                        continue;
                    }

                    return match self.await_winner(&message.id).await? {
                        Some(result) => Ok(ClaimResolution::Replayed(result)),
                        None => Err(StoreError::Conflict {
                            message_id: message.id.clone(),
                        }
                        .into()),
                    };
                }
            }
        }
    }

    /// Poll for a concurrent winner's persisted result, bounded by
    /// `claim_wait`.
    async fn await_winner(&self, message_id: &str) -> Result<Option<AnalysisResult>, Error> {
        let deadline = tokio::time::Instant::now() + self.config.claim_wait;
        while tokio::time::Instant::now() < deadline {
            tokio::time::sleep(self.config.claim_poll_interval).await;
            if let Some(result) = self.store.load_analysis(message_id).await? {
                debug!(message_id, "Concurrent analysis finished, replaying its result");
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    // ── Pipeline ────────────────────────────────────────────────────

    /// Run the sub-steps and merge their outputs.
    ///
    /// Scorer, classifier, and extractor share no mutable state — the
    /// classifier and extractor run concurrently under bounded timeouts
    /// while the (synchronous, pure) scorer runs alongside.
    async fn run_pipeline(&self, message: &CanonicalMessage) -> Result<AnalysisResult, Error> {
        let now = Utc::now();

        let vip = if message.sender_email.is_empty() {
            VipStatus::default()
        } else {
            self.registry
                .priority_for(&message.user_id, &message.sender_email)
                .await?
        };

        let classify_fut = timeout(
            self.config.classifier_timeout,
            self.classifier.classify(message),
        );
        let extract_fut = timeout(
            self.config.extractor_timeout,
            self.extractor.extract(message),
        );
        let (classify_res, extract_res) = tokio::join!(classify_fut, extract_fut);

        let priority = scorer::score(message, vip, now, &self.config.scoring);

        let mut degraded_reasons: Vec<String> = Vec::new();

        let classification = match classify_res {
            Ok(Ok(classification)) => classification,
            Ok(Err(e)) => {
                warn!(message_id = %message.id, error = %e, "Classifier failed, using neutral fallback");
                degraded_reasons.push(format!("classifier: {e}"));
                Classification::neutral()
            }
            Err(_) => {
                let e = AnalysisError::Timeout {
                    step: "classifier",
                    timeout: self.config.classifier_timeout,
                };
                warn!(message_id = %message.id, error = %e, "Using neutral fallback");
                degraded_reasons.push(e.to_string());
                Classification::neutral()
            }
        };

        let action_items = match extract_res {
            Ok(Ok(items)) => items,
            Ok(Err(e)) => {
                warn!(message_id = %message.id, error = %e, "Extractor failed, returning no action items");
                degraded_reasons.push(format!("extractor: {e}"));
                Vec::new()
            }
            Err(_) => {
                let e = AnalysisError::Timeout {
                    step: "extractor",
                    timeout: self.config.extractor_timeout,
                };
                warn!(message_id = %message.id, error = %e, "Returning no action items");
                degraded_reasons.push(e.to_string());
                Vec::new()
            }
        };

        let degraded = !degraded_reasons.is_empty();
        Ok(AnalysisResult {
            summary: self.build_summary(message),
            priority,
            sentiment: classification.sentiment,
            topics: classification.topics,
            action_items,
            analyzed_at: now,
            degraded,
            degraded_reason: degraded.then(|| degraded_reasons.join("; ")),
        })
    }

    /// Bounded human-readable synopsis: sender plus subject, falling back
    /// to the first content line for subjectless platforms.
    fn build_summary(&self, message: &CanonicalMessage) -> String {
        let gist = if message.subject != DEFAULT_SUBJECT {
            message.subject.as_str()
        } else {
            message.content.lines().next().unwrap_or_default()
        };
        let summary = format!("{}: {}", message.sender_name, gist);
        if summary.chars().count() <= self.config.summary_max_chars {
            summary
        } else {
            summary
                .chars()
                .take(self.config.summary_max_chars)
                .collect()
        }
    }
}

/// How a claim attempt resolved.
enum ClaimResolution {
    /// This invocation owns the slot and must complete or release it.
    Acquired,
    /// A concurrent invocation produced the result; replay it.
    Replayed(AnalysisResult),
}
