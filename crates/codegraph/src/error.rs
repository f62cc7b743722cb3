//! Error types for codegraph operations.
//!
//! All fallible store operations return [`Result<T>`] with context-rich error messages.

use crate::graph::{EdgeKind, EntityId};
use thiserror::Error;

/// Result type alias for codegraph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Comprehensive error type for all graph store operations.
///
/// Most variants describe a rejected mutation that callers are expected to
/// record and move past. [`GraphError::is_fatal`] marks the ones that must
/// abort the current build.
#[derive(Error, Debug)]
pub enum GraphError {
    /// Entity not found in the graph
    #[error("Entity not found: {entity_id}")]
    EntityNotFound {
        /// ID of the missing entity
        entity_id: EntityId,
    },

    /// Edge not found in the graph
    #[error("Edge not found: {edge_id}")]
    EdgeNotFound {
        /// ID of the missing edge
        edge_id: u64,
    },

    /// A `contains` edge would give an entity a second parent
    #[error("Entity {child} is already contained by {existing_parent}, cannot attach to {new_parent}")]
    ContainmentConflict {
        /// Entity that already has a parent
        child: EntityId,
        /// Its current parent
        existing_parent: EntityId,
        /// The rejected parent
        new_parent: EntityId,
    },

    /// An `inherits` edge would close a cycle
    #[error("Inheritance cycle: {derived} -> {base} would revisit {derived}")]
    InheritanceCycle {
        /// Derived end of the rejected edge
        derived: EntityId,
        /// Base end of the rejected edge
        base: EntityId,
    },

    /// Two distinct structural keys hashed to the same id
    #[error("Identity space exhausted: '{existing}' and '{incoming}' share id {entity_id}")]
    IdentityCollision {
        /// Colliding id
        entity_id: EntityId,
        /// Key already owning the id
        existing: String,
        /// Key that tried to claim it
        incoming: String,
    },

    /// Store capacity limit reached
    #[error("Store capacity exceeded: {what} limit of {limit} reached")]
    CapacityExceeded {
        /// "entities" or "edges"
        what: &'static str,
        /// Configured limit
        limit: usize,
    },

    /// The shared store's lock was poisoned by a panicking writer
    #[error("Shared graph lock poisoned")]
    LockPoisoned,

    /// Invalid operation (e.g., edge of the wrong kind on a root)
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// Description of what went wrong
        message: String,
    },
}

impl GraphError {
    /// Create an invalid-operation error from a message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Whether this error aborts a build instead of being recorded as a soft failure.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GraphError::IdentityCollision { .. }
                | GraphError::CapacityExceeded { .. }
                | GraphError::LockPoisoned
        )
    }

    /// Edge kind a rejected-edge error refers to, if any.
    pub fn edge_kind(&self) -> Option<EdgeKind> {
        match self {
            GraphError::ContainmentConflict { .. } => Some(EdgeKind::Contains),
            GraphError::InheritanceCycle { .. } => Some(EdgeKind::Inherits),
            _ => None,
        }
    }
}
