//! The four edge kinds: ABOUT, EXTRACTED_FROM, MENTIONS, INVALIDATES.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a [`crate::model::Memory`] is about: another entity, or the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AboutTarget {
    Entity { entity_id: String },
    User,
}

/// Memory → Entity|User. Many-to-many.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AboutEdge {
    pub id: String,
    pub memory_id: String,
    pub target: AboutTarget,
    pub created_at: DateTime<Utc>,
}

/// Memory → Note. Exactly one per memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedFromEdge {
    pub id: String,
    pub memory_id: String,
    pub note_id: String,
    pub created_at: DateTime<Utc>,
}

/// Note → Entity. Deduplicated by (note, entity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionsEdge {
    pub id: String,
    pub note_id: String,
    pub entity_id: String,
    pub created_at: DateTime<Utc>,
}

/// Memory → Memory, carrying the reason the source supersedes the
/// target. Creating this edge also sets the target's `invalid_at` to
/// the source's effective time (§3 derived invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidatesEdge {
    pub id: String,
    pub source_memory_id: String,
    pub target_memory_id: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn about_target_serializes_with_a_tag() {
        let to_user = AboutTarget::User;
        let json = serde_json::to_string(&to_user).unwrap();
        assert!(json.contains("\"kind\":\"user\""));

        let to_entity = AboutTarget::Entity { entity_id: "e1".to_string() };
        let json = serde_json::to_string(&to_entity).unwrap();
        assert!(json.contains("\"entity_id\":\"e1\""));
    }
}
