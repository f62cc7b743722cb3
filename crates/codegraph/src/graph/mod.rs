//! Core graph types and operations.
//!
//! This module defines the fundamental building blocks:
//! - [`Entity`]: Declared C++ entities with content-addressed ids
//! - [`Edge`]: Typed, directed relationships between entities
//! - [`CodeGraph`]: The in-memory store with forward and reverse indices

mod key;
mod merge;
mod name;
mod signature;
mod store;
mod types;
pub mod algorithms;

pub use key::{KeyKind, StructuralKey, ENTITY_NAMESPACE};
pub use merge::{Contention, MergeOutcome, RejectedEdge};
pub use name::{QualifiedName, DISPLAY_SEPARATOR, KEY_SEPARATOR};
pub use signature::{indirection_target, is_well_formed_type, normalize_type, RefQualifier, Signature};
pub use store::{CodeGraph, PutEdge, PutEntity, StoreLimits, EXTERNAL_ROOT};
pub use types::{
    Access, Direction, Edge, EdgeId, EdgeKind, EdgeMetadata, Entity, EntityId, EntityKind,
    SourceLocation,
};
