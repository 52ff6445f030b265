//! libSQL backend — async `Store` implementation over a local file or
//! in-memory database.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::contacts::model::{RelationshipType, VipContact};
use crate::error::StoreError;
use crate::pipeline::types::AnalysisResult;
use crate::store::traits::{ClaimOutcome, Store};

/// libSQL database backend.
///
/// Holds a single connection reused for all operations —
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and initialize the schema.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Open(format!("Failed to create database directory: {e}")))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to open libSQL database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to create in-memory database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        self.conn()
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS contacts (
                    user_id TEXT NOT NULL,
                    email TEXT NOT NULL,
                    name TEXT NOT NULL,
                    relationship_type TEXT NOT NULL,
                    priority_level INTEGER NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (user_id, email)
                );
                CREATE INDEX IF NOT EXISTS idx_contacts_user ON contacts(user_id);

                CREATE TABLE IF NOT EXISTS analyses (
                    message_id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    status TEXT NOT NULL DEFAULT 'analyzing',
                    result TEXT,
                    claimed_at TEXT NOT NULL,
                    completed_at TEXT
                );
                CREATE INDEX IF NOT EXISTS idx_analyses_user ON analyses(user_id);
                CREATE INDEX IF NOT EXISTS idx_analyses_status ON analyses(status);",
            )
            .await
            .map_err(|e| StoreError::Query(format!("init_schema: {e}")))?;

        debug!("Schema initialized");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| DateTime::<Utc>::MIN_UTC)
}

fn row_to_contact(row: &libsql::Row) -> Result<VipContact, StoreError> {
    let relationship_str: String = row
        .get(3)
        .map_err(|e| StoreError::Query(format!("contact row: {e}")))?;
    let relationship_type: RelationshipType = relationship_str
        .parse()
        .map_err(StoreError::Serialization)?;
    let level: i64 = row
        .get(4)
        .map_err(|e| StoreError::Query(format!("contact row: {e}")))?;
    let created_str: String = row
        .get(5)
        .map_err(|e| StoreError::Query(format!("contact row: {e}")))?;
    let updated_str: String = row
        .get(6)
        .map_err(|e| StoreError::Query(format!("contact row: {e}")))?;

    Ok(VipContact {
        user_id: row
            .get(0)
            .map_err(|e| StoreError::Query(format!("contact row: {e}")))?,
        email: row
            .get(1)
            .map_err(|e| StoreError::Query(format!("contact row: {e}")))?,
        name: row
            .get(2)
            .map_err(|e| StoreError::Query(format!("contact row: {e}")))?,
        relationship_type,
        priority_level: level.clamp(0, 10) as u8,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

fn result_from_json(raw: &str) -> Result<AnalysisResult, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Serialization(format!("analysis result: {e}")))
}

const CONTACT_COLUMNS: &str =
    "user_id, email, name, relationship_type, priority_level, created_at, updated_at";

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Store for LibSqlBackend {
    async fn upsert_contact(&self, contact: &VipContact) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "INSERT INTO contacts (user_id, email, name, relationship_type, priority_level, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(user_id, email) DO UPDATE SET
                    name = excluded.name,
                    relationship_type = excluded.relationship_type,
                    priority_level = excluded.priority_level,
                    updated_at = excluded.updated_at",
                params![
                    contact.user_id.as_str(),
                    contact.email.as_str(),
                    contact.name.as_str(),
                    contact.relationship_type.as_str(),
                    i64::from(contact.priority_level),
                    contact.created_at.to_rfc3339(),
                    contact.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("upsert_contact: {e}")))?;
        Ok(())
    }

    async fn get_contact(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<Option<VipContact>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE user_id = ?1 AND email = ?2"),
                params![user_id, email],
            )
            .await
            .map_err(|e| StoreError::Query(format!("get_contact: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("get_contact: {e}")))?
        {
            Some(row) => Ok(Some(row_to_contact(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_contacts(&self, user_id: &str) -> Result<Vec<VipContact>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {CONTACT_COLUMNS} FROM contacts WHERE user_id = ?1
                     ORDER BY priority_level DESC, email ASC"
                ),
                params![user_id],
            )
            .await
            .map_err(|e| StoreError::Query(format!("list_contacts: {e}")))?;

        let mut contacts = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("list_contacts: {e}")))?
        {
            contacts.push(row_to_contact(&row)?);
        }
        Ok(contacts)
    }

    async fn remove_contact(&self, user_id: &str, email: &str) -> Result<bool, StoreError> {
        let affected = self
            .conn()
            .execute(
                "DELETE FROM contacts WHERE user_id = ?1 AND email = ?2",
                params![user_id, email],
            )
            .await
            .map_err(|e| StoreError::Query(format!("remove_contact: {e}")))?;
        Ok(affected > 0)
    }

    async fn claim_analysis(
        &self,
        message_id: &str,
        user_id: &str,
    ) -> Result<ClaimOutcome, StoreError> {
        // The primary key on message_id is the compare-and-set: exactly one
        // concurrent insert wins.
        let affected = self
            .conn()
            .execute(
                "INSERT INTO analyses (message_id, user_id, status, claimed_at)
                 VALUES (?1, ?2, 'analyzing', ?3)
                 ON CONFLICT(message_id) DO NOTHING",
                params![message_id, user_id, Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("claim_analysis: {e}")))?;

        if affected > 0 {
            debug!(message_id, "Analysis slot claimed");
            return Ok(ClaimOutcome::Claimed);
        }

        // Lost the race — report the winner's progress.
        let mut rows = self
            .conn()
            .query(
                "SELECT status, result, claimed_at FROM analyses WHERE message_id = ?1",
                params![message_id],
            )
            .await
            .map_err(|e| StoreError::Query(format!("claim_analysis: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("claim_analysis: {e}")))?
        {
            Some(row) => {
                let status: String = row
                    .get(0)
                    .map_err(|e| StoreError::Query(format!("claim_analysis: {e}")))?;
                if status == "analyzed" {
                    let raw: String = row
                        .get(1)
                        .map_err(|e| StoreError::Query(format!("claim_analysis: {e}")))?;
                    return Ok(ClaimOutcome::Completed(result_from_json(&raw)?));
                }
                let claimed_str: String = row
                    .get(2)
                    .map_err(|e| StoreError::Query(format!("claim_analysis: {e}")))?;
                Ok(ClaimOutcome::InProgress {
                    claimed_at: parse_datetime(&claimed_str),
                })
            }
            // Row vanished between insert and select (winner failed and
            // released) — treat as in-progress; the caller retries.
            None => Ok(ClaimOutcome::InProgress {
                claimed_at: Utc::now(),
            }),
        }
    }

    async fn release_claim(&self, message_id: &str) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "DELETE FROM analyses WHERE message_id = ?1 AND status = 'analyzing'",
                params![message_id],
            )
            .await
            .map_err(|e| StoreError::Query(format!("release_claim: {e}")))?;
        debug!(message_id, "Claim released");
        Ok(())
    }

    async fn save_analysis(
        &self,
        message_id: &str,
        result: &AnalysisResult,
        user_id: &str,
    ) -> Result<(), StoreError> {
        let raw = serde_json::to_string(result)
            .map_err(|e| StoreError::Serialization(format!("analysis result: {e}")))?;
        let now = Utc::now().to_rfc3339();

        self.conn()
            .execute(
                "INSERT INTO analyses (message_id, user_id, status, result, claimed_at, completed_at)
                 VALUES (?1, ?2, 'analyzed', ?3, ?4, ?4)
                 ON CONFLICT(message_id) DO UPDATE SET
                    user_id = excluded.user_id,
                    status = 'analyzed',
                    result = excluded.result,
                    completed_at = excluded.completed_at",
                params![message_id, user_id, raw, now],
            )
            .await
            .map_err(|e| StoreError::Query(format!("save_analysis: {e}")))?;

        debug!(message_id, user_id, "Analysis saved");
        Ok(())
    }

    async fn load_analysis(
        &self,
        message_id: &str,
    ) -> Result<Option<AnalysisResult>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT result FROM analyses WHERE message_id = ?1 AND status = 'analyzed'",
                params![message_id],
            )
            .await
            .map_err(|e| StoreError::Query(format!("load_analysis: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("load_analysis: {e}")))?
        {
            Some(row) => {
                let raw: String = row
                    .get(0)
                    .map_err(|e| StoreError::Query(format!("load_analysis: {e}")))?;
                Ok(Some(result_from_json(&raw)?))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{PriorityVerdict, Sentiment};

    fn make_result(summary: &str) -> AnalysisResult {
        AnalysisResult {
            summary: summary.into(),
            priority: PriorityVerdict {
                score: 55,
                reason: "urgency keywords".into(),
                is_urgent: false,
                is_vip: false,
            },
            sentiment: Sentiment::Neutral,
            topics: vec![],
            action_items: vec![],
            analyzed_at: Utc::now(),
            degraded: false,
            degraded_reason: None,
        }
    }

    #[tokio::test]
    async fn open_on_disk_creates_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("pulse.db");
        let store = LibSqlBackend::new_local(&path).await.unwrap();
        drop(store);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn schema_init_is_idempotent() {
        let store = LibSqlBackend::new_memory().await.unwrap();
        store.init_schema().await.unwrap();
    }

    #[tokio::test]
    async fn contact_roundtrip() {
        let store = LibSqlBackend::new_memory().await.unwrap();
        let contact = VipContact::new("u1", "cfo@acme.com", "Pat", RelationshipType::BoardMember);
        store.upsert_contact(&contact).await.unwrap();

        let loaded = store.get_contact("u1", "cfo@acme.com").await.unwrap().unwrap();
        assert_eq!(loaded.email, "cfo@acme.com");
        assert_eq!(loaded.relationship_type, RelationshipType::BoardMember);
        assert_eq!(loaded.priority_level, 10);
    }

    #[tokio::test]
    async fn contact_upsert_replaces_on_conflict() {
        let store = LibSqlBackend::new_memory().await.unwrap();
        store
            .upsert_contact(&VipContact::new("u1", "a@b.co", "Ann", RelationshipType::Client))
            .await
            .unwrap();
        store
            .upsert_contact(&VipContact::new("u1", "a@b.co", "Ann", RelationshipType::Investor))
            .await
            .unwrap();

        let contacts = store.list_contacts("u1").await.unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].priority_level, 9);
    }

    #[tokio::test]
    async fn list_contacts_highest_priority_first() {
        let store = LibSqlBackend::new_memory().await.unwrap();
        store
            .upsert_contact(&VipContact::new("u1", "p@x.co", "P", RelationshipType::Partner))
            .await
            .unwrap();
        store
            .upsert_contact(&VipContact::new("u1", "b@x.co", "B", RelationshipType::BoardMember))
            .await
            .unwrap();

        let contacts = store.list_contacts("u1").await.unwrap();
        assert_eq!(contacts[0].email, "b@x.co");
        assert_eq!(contacts[1].email, "p@x.co");
    }

    #[tokio::test]
    async fn claim_then_save_then_load() {
        let store = LibSqlBackend::new_memory().await.unwrap();

        let outcome = store.claim_analysis("m1", "u1").await.unwrap();
        assert!(matches!(outcome, ClaimOutcome::Claimed));

        // Invisible until completed
        assert!(store.load_analysis("m1").await.unwrap().is_none());

        let result = make_result("summary one");
        store.save_analysis("m1", &result, "u1").await.unwrap();

        let loaded = store.load_analysis("m1").await.unwrap().unwrap();
        assert_eq!(loaded.summary, "summary one");
        assert_eq!(loaded, result);
    }

    #[tokio::test]
    async fn second_claim_sees_in_progress() {
        let store = LibSqlBackend::new_memory().await.unwrap();
        assert!(matches!(
            store.claim_analysis("m1", "u1").await.unwrap(),
            ClaimOutcome::Claimed
        ));
        assert!(matches!(
            store.claim_analysis("m1", "u1").await.unwrap(),
            ClaimOutcome::InProgress { .. }
        ));
    }

    #[tokio::test]
    async fn claim_after_completion_returns_result() {
        let store = LibSqlBackend::new_memory().await.unwrap();
        store.claim_analysis("m1", "u1").await.unwrap();
        store.save_analysis("m1", &make_result("done"), "u1").await.unwrap();

        match store.claim_analysis("m1", "u1").await.unwrap() {
            ClaimOutcome::Completed(result) => assert_eq!(result.summary, "done"),
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn release_claim_allows_reclaim() {
        let store = LibSqlBackend::new_memory().await.unwrap();
        store.claim_analysis("m1", "u1").await.unwrap();
        store.release_claim("m1").await.unwrap();

        assert!(matches!(
            store.claim_analysis("m1", "u1").await.unwrap(),
            ClaimOutcome::Claimed
        ));
    }

    #[tokio::test]
    async fn release_never_deletes_completed_analysis() {
        let store = LibSqlBackend::new_memory().await.unwrap();
        store.claim_analysis("m1", "u1").await.unwrap();
        store.save_analysis("m1", &make_result("kept"), "u1").await.unwrap();

        store.release_claim("m1").await.unwrap();
        assert!(store.load_analysis("m1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn save_analysis_is_insert_or_replace() {
        let store = LibSqlBackend::new_memory().await.unwrap();
        // No prior claim — direct save works too
        store.save_analysis("m1", &make_result("first"), "u1").await.unwrap();
        store.save_analysis("m1", &make_result("second"), "u1").await.unwrap();

        let loaded = store.load_analysis("m1").await.unwrap().unwrap();
        assert_eq!(loaded.summary, "second");
    }

    #[tokio::test]
    async fn load_missing_analysis_is_none() {
        let store = LibSqlBackend::new_memory().await.unwrap();
        assert!(store.load_analysis("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stored_result_replays_byte_identical() {
        let store = LibSqlBackend::new_memory().await.unwrap();
        let result = make_result("stable");
        store.save_analysis("m1", &result, "u1").await.unwrap();

        let first = serde_json::to_string(&store.load_analysis("m1").await.unwrap().unwrap()).unwrap();
        let second = serde_json::to_string(&store.load_analysis("m1").await.unwrap().unwrap()).unwrap();
        assert_eq!(first, second);
    }
}
