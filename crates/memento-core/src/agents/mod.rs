//! The five consolidation agents (design §4.5): data bundles over the
//! generic runner in `crate::agent`. Each submodule owns one agent's
//! input/output types, schema, formatter, and parser; nothing here is
//! a class hierarchy — `entity_extract::agent()` and friends just
//! build an `Agent<I, O>` value.
//!
//! LLM output is decoded into the tagged sum types the design calls
//! for (`EntityAction`, `MemoryAction`) rather than re-validated
//! dynamic objects — a malformed variant is an `agent-schema` failure
//! at decode time, not a runtime check scattered through the pipeline.

pub mod entity_extract;
pub mod entity_resolver;
pub mod hyde;
pub mod memory_extract;
pub mod memory_resolver;

use serde::{Deserialize, Serialize};

use crate::model::EntityType;

/// One entity-resolver decision: create a new entity, or match an
/// existing one and optionally refresh its description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "UPPERCASE")]
pub enum EntityAction {
    Create,
    Match {
        #[serde(rename = "matchedId")]
        matched_id: String,
        #[serde(rename = "updateDescription")]
        update_description: bool,
    },
}

/// One memory-resolver decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "UPPERCASE")]
pub enum MemoryAction {
    Add,
    Skip,
    Invalidate { targets: Vec<InvalidateTarget> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidateTarget {
    pub existing_memory_id: String,
    pub reason: String,
}

/// A single entity as extracted, before resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub name: String,
    pub entity_type: EntityType,
    pub description: String,
    pub is_well_known: bool,
}

/// Case-insensitive name comparison, the only "silent repair" the
/// design permits for resolver alignment checks.
pub(crate) fn names_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
