//! # codegraph
//!
//! An in-memory graph of C++ entities and their relationships.
//!
//! ## Core Principles
//!
//! - **Stable identities**: entity ids are derived from structural keys, so the
//!   same source always produces the same ids
//! - **Explicit invariants**: the store itself rejects second containment
//!   parents and inheritance cycles
//! - **Zero Magic**: parsing and resolution live in front-end crates; the
//!   store only keeps what it is given
//!
//! ## Architecture
//!
//! ```text
//! Front ends (codegraph-cpp)
//!     ↓
//! SharedGraph (lock-guarded batch merge)
//!     ↓
//! Query Builder (fluent interface)
//!     ↓
//! Core Graph (entities, edges, algorithms)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use codegraph::{CodeGraph, EdgeKind, EdgeMetadata, Entity, EntityKind, QualifiedName};
//!
//! let mut graph = CodeGraph::new();
//! let ns = graph
//!     .put_entity(Entity::new(EntityKind::Namespace, QualifiedName::parse("shapes")))?
//!     .id();
//! let global = graph.global_namespace();
//! graph.put_edge(global, ns, EdgeKind::Contains, EdgeMetadata::None)?;
//! assert_eq!(graph.parent_of(ns), Some(global));
//! # Ok::<(), codegraph::GraphError>(())
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod graph;
pub mod query;
pub mod shared;

// Re-export main types
pub use error::{GraphError, Result};
pub use graph::{
    indirection_target, is_well_formed_type, normalize_type, Access, CodeGraph, Direction, Edge,
    EdgeId, EdgeKind, EdgeMetadata, Entity, EntityId, EntityKind, KeyKind, MergeOutcome, PutEdge,
    PutEntity, QualifiedName, RefQualifier, Signature, SourceLocation, StoreLimits, StructuralKey,
    EXTERNAL_ROOT,
};
pub use query::EntityQuery;
pub use shared::SharedGraph;
