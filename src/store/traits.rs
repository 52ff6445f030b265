//! `Store` trait — single async interface for all persistence.
//!
//! The analysis core treats the store as an opaque collaborator behind this
//! narrow interface; transaction internals belong to the backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::contacts::VipContact;
use crate::error::StoreError;
use crate::pipeline::types::AnalysisResult;

/// Outcome of an analysis claim attempt.
///
/// The claim is the compare-and-set that serializes persistence per message
/// id: exactly one concurrent caller gets `Claimed`, everyone else observes
/// the winner's progress.
#[derive(Debug, Clone)]
pub enum ClaimOutcome {
    /// This caller owns the analysis; it must complete or release the claim.
    Claimed,
    /// Another caller holds the claim and has not finished.
    InProgress { claimed_at: DateTime<Utc> },
    /// A completed analysis already exists.
    Completed(AnalysisResult),
}

/// Backend-agnostic persistence trait covering contacts and analyses.
#[async_trait]
pub trait Store: Send + Sync {
    // ── Contacts ────────────────────────────────────────────────────

    /// Insert or replace a contact keyed by `(user_id, email)`.
    async fn upsert_contact(&self, contact: &VipContact) -> Result<(), StoreError>;

    /// Get a contact by its natural key. Email must already be lowercase.
    async fn get_contact(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<Option<VipContact>, StoreError>;

    /// List a user's contacts, highest priority first.
    async fn list_contacts(&self, user_id: &str) -> Result<Vec<VipContact>, StoreError>;

    /// Delete a contact. Returns whether a row existed.
    async fn remove_contact(&self, user_id: &str, email: &str) -> Result<bool, StoreError>;

    // ── Analyses ────────────────────────────────────────────────────

    /// Atomically claim the analysis slot for a message id.
    ///
    /// Backed by the primary-key constraint on `message_id` — the
    /// orchestration layer never has to coordinate on its own.
    async fn claim_analysis(
        &self,
        message_id: &str,
        user_id: &str,
    ) -> Result<ClaimOutcome, StoreError>;

    /// Release an unfinished claim (failure or takeover path). Completed
    /// analyses are never released.
    async fn release_claim(&self, message_id: &str) -> Result<(), StoreError>;

    /// Insert or replace the analysis for a message id.
    async fn save_analysis(
        &self,
        message_id: &str,
        result: &AnalysisResult,
        user_id: &str,
    ) -> Result<(), StoreError>;

    /// Load a completed analysis. In-progress claims are invisible here.
    async fn load_analysis(
        &self,
        message_id: &str,
    ) -> Result<Option<AnalysisResult>, StoreError>;
}
