//! Contact priority registry — VIP lookups for the scoring path, upserts
//! for onboarding and ad hoc additions.
//!
//! The registry is a shared read dependency of the analysis pipeline. It is
//! consulted, never mutated, while scoring; writes come only from the
//! registry's own upsert/remove surface.

use std::sync::Arc;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use tracing::{debug, info};

use crate::contacts::model::{RelationshipType, VipContact, VipStatus};
use crate::error::{Error, StoreError, ValidationError};
use crate::store::Store;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Registry of VIP contacts backed by the shared store.
pub struct ContactRegistry {
    store: Arc<dyn Store>,
}

impl ContactRegistry {
    /// Create a registry over the given store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Look up the VIP status for a sender.
    ///
    /// Case-insensitive exact match on email; no fuzzy or domain matching.
    /// Returns `is_vip = false, level = 0` when there is no match (including
    /// the empty-email case for platforms without addressable identity).
    pub async fn priority_for(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<VipStatus, StoreError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Ok(VipStatus::default());
        }

        let status = match self.store.get_contact(user_id, &email).await? {
            Some(contact) => VipStatus::vip(contact.priority_level),
            None => VipStatus::default(),
        };
        debug!(
            user_id,
            email = %email,
            is_vip = status.is_vip,
            level = status.level,
            "VIP lookup"
        );
        Ok(status)
    }

    /// Insert or update a contact, keyed by `(user_id, email)`.
    ///
    /// Idempotent under repeated identical input. The priority level is
    /// recomputed from `relationship_type` here — any level the caller may
    /// have supplied is ignored.
    pub async fn upsert(
        &self,
        user_id: &str,
        email: &str,
        name: &str,
        relationship_type: RelationshipType,
    ) -> Result<VipContact, Error> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ValidationError::MissingField { field: "email" }.into());
        }
        if !EMAIL_RE.is_match(email) {
            return Err(ValidationError::InvalidEmail {
                email: email.to_string(),
            }
            .into());
        }

        let mut contact = VipContact::new(user_id, email, name, relationship_type);

        // Re-adding an existing contact updates it in place, keeping the
        // original creation time.
        if let Some(existing) = self.store.get_contact(user_id, &contact.email).await? {
            contact.created_at = existing.created_at;
        }
        contact.updated_at = Utc::now();

        self.store.upsert_contact(&contact).await?;
        info!(
            user_id,
            email = %contact.email,
            relationship = %contact.relationship_type,
            level = contact.priority_level,
            "Contact upserted"
        );
        Ok(contact)
    }

    /// List all contacts for a user.
    pub async fn list(&self, user_id: &str) -> Result<Vec<VipContact>, StoreError> {
        self.store.list_contacts(user_id).await
    }

    /// Remove a contact. Returns whether a row was deleted.
    pub async fn remove(&self, user_id: &str, email: &str) -> Result<bool, StoreError> {
        let removed = self
            .store
            .remove_contact(user_id, &email.trim().to_lowercase())
            .await?;
        if removed {
            info!(user_id, email = %email, "Contact removed");
        }
        Ok(removed)
    }
}
