//! Data model: the four node kinds and four edge kinds that make up
//! the knowledge graph (see design §3).

mod edge;
mod ids;
mod node;

pub use edge::{AboutEdge, AboutTarget, ExtractedFromEdge, InvalidatesEdge, MentionsEdge};
pub use ids::{new_id, USER_ID};
pub use node::{Entity, EntityType, Memory, Note, User};
