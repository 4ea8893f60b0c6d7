//! The abstract graph store the engine depends on. See [`store::GraphStore`].

mod store;

pub use store::{
    AboutCreate, AboutCreateTarget, AboutRef, CommitResult, EntityCreate, EntityDetails, EntityHit,
    EntityUpdate, GraphStore, GraphWriteBatch, InvalidatesCreate, InvalidationNode, MemoryCreate,
    MemoryHit, NodeLabel, SearchOptions, UserUpsert,
};
