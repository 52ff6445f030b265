//! VIP contact data model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Relationship between the user and a contact.
///
/// Ordered by descending seniority — the derived priority level never
/// increases as you move down the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipType {
    BoardMember,
    Investor,
    Executive,
    Vip,
    Client,
    Partner,
    Other,
}

impl RelationshipType {
    /// Priority level (1–10) derived from the relationship.
    ///
    /// This mapping is the single source of truth — client-supplied levels
    /// are ignored everywhere.
    pub fn priority_level(&self) -> u8 {
        match self {
            Self::BoardMember => 10,
            Self::Investor => 9,
            Self::Executive => 8,
            Self::Vip => 8,
            Self::Client => 7,
            Self::Partner => 6,
            Self::Other => 5,
        }
    }

    /// Stable string form, matching the serialized representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BoardMember => "board-member",
            Self::Investor => "investor",
            Self::Executive => "executive",
            Self::Vip => "vip",
            Self::Client => "client",
            Self::Partner => "partner",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "board-member" => Ok(Self::BoardMember),
            "investor" => Ok(Self::Investor),
            "executive" => Ok(Self::Executive),
            "vip" => Ok(Self::Vip),
            "client" => Ok(Self::Client),
            "partner" => Ok(Self::Partner),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown relationship type: '{other}'")),
        }
    }
}

/// A registry entry keyed by `(user_id, email)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VipContact {
    pub user_id: String,
    /// Stored lowercase — lookups are case-insensitive, exact match only.
    pub email: String,
    pub name: String,
    pub relationship_type: RelationshipType,
    /// Always derived from `relationship_type`, never set independently.
    pub priority_level: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VipContact {
    /// Create a contact with the level derived from the relationship.
    pub fn new(
        user_id: impl Into<String>,
        email: impl Into<String>,
        name: impl Into<String>,
        relationship_type: RelationshipType,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            email: email.into().to_lowercase(),
            name: name.into(),
            relationship_type,
            priority_level: relationship_type.priority_level(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result of a registry lookup, fed to the priority scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VipStatus {
    pub is_vip: bool,
    /// 0 when not a VIP, otherwise the contact's 1–10 level.
    pub level: u8,
}

impl VipStatus {
    /// Status for a registered contact.
    pub fn vip(level: u8) -> Self {
        Self {
            is_vip: true,
            level,
        }
    }
}
