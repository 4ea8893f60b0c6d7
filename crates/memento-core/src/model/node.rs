//! The four node kinds: User, Entity, Memory, Note.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::USER_ID;

/// Closed classification set for [`Entity`] nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum EntityType {
    Person,
    Organization,
    Project,
    Technology,
    Location,
    Event,
    Concept,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Person => "Person",
            EntityType::Organization => "Organization",
            EntityType::Project => "Project",
            EntityType::Technology => "Technology",
            EntityType::Location => "Location",
            EntityType::Event => "Event",
            EntityType::Concept => "Concept",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The singleton node representing the human who owns the graph.
///
/// Exactly one per graph instance, identified by the fixed literal
/// [`USER_ID`]. Created lazily on first consolidation if absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Always [`USER_ID`].
    pub id: String,
    pub display_name: String,
    pub description: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Construct a fresh User node with a default display name.
    pub fn new(display_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: USER_ID.to_string(),
            display_name: display_name.into(),
            description: None,
            embedding: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The entity type of the User node is always Person, and it is
    /// never well-known when observed externally (§3 invariant).
    pub fn entity_type(&self) -> EntityType {
        EntityType::Person
    }

    pub fn is_well_known(&self) -> bool {
        false
    }
}

/// A named, typed entity in the knowledge graph (person, org, project, …).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    /// Globally unique.
    pub name: String,
    pub entity_type: EntityType,
    pub description: Option<String>,
    /// Embedding of `"{name}: {description}"`, set once a description exists.
    pub embedding: Option<Vec<f32>>,
    /// Immutable after first write.
    pub is_well_known: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        entity_type: EntityType,
        is_well_known: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entity_type,
            description: None,
            embedding: None,
            is_well_known,
            created_at: now,
            updated_at: now,
        }
    }

    /// The text embedded for semantic search: `"Name: Description"`,
    /// falling back to just the name when there is no description yet.
    pub fn embedding_text(&self) -> String {
        match &self.description {
            Some(desc) if !desc.is_empty() => format!("{}: {}", self.name, desc),
            _ => self.name.clone(),
        }
    }
}

/// A single atomic fact extracted from a note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
    /// When the fact became true in the world, if known.
    pub valid_at: Option<DateTime<Utc>>,
    /// When the fact was superseded. Once set, never unset.
    pub invalid_at: Option<DateTime<Utc>>,
}

impl Memory {
    pub fn new(id: impl Into<String>, content: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            embedding: None,
            created_at: now,
            valid_at: None,
            invalid_at: None,
        }
    }

    /// A memory is valid as long as it has not been superseded (§3
    /// invariant 4 — the renderer and every search honor this).
    pub fn is_valid(&self) -> bool {
        self.invalid_at.is_none()
    }

    /// Whitespace-collapsed content, as rendered by TRACE/the formatter.
    pub fn normalized_content(&self) -> String {
        self.content.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// The raw user submission a set of memories was extracted from.
/// Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Note {
    pub fn new(id: impl Into<String>, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_is_always_person_and_never_well_known() {
        let user = User::new("Aziham", Utc::now());
        assert_eq!(user.id, USER_ID);
        assert_eq!(user.entity_type(), EntityType::Person);
        assert!(!user.is_well_known());
    }

    #[test]
    fn entity_embedding_text_falls_back_to_name() {
        let now = Utc::now();
        let mut e = Entity::new("e1", "Rust", EntityType::Technology, true, now);
        assert_eq!(e.embedding_text(), "Rust");
        e.description = Some("A systems programming language".to_string());
        assert_eq!(e.embedding_text(), "Rust: A systems programming language");
    }

    #[test]
    fn memory_validity_and_normalization() {
        let now = Utc::now();
        let mut m = Memory::new("m1", "User   likes\n\tTypeScript", now);
        assert!(m.is_valid());
        assert_eq!(m.normalized_content(), "User likes TypeScript");
        m.invalid_at = Some(now);
        assert!(!m.is_valid());
    }
}
