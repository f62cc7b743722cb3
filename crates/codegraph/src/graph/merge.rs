//! Merging a partial graph into another.

use super::store::{CodeGraph, PutEntity};
use super::types::{EdgeKind, EntityId};
use crate::error::Result;
use log::{debug, warn};
use serde::Serialize;
use std::collections::HashMap;

/// An entity whose key was already taken by an incompatible entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contention {
    /// Entity owning the unsuffixed key
    pub original: EntityId,
    /// Suffixed sibling that received the incoming entity
    pub renamed: EntityId,
    /// Display name of the sibling
    pub name: String,
}

/// An edge of the partial graph the target store refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedEdge {
    /// Source in the target graph
    pub source: EntityId,
    /// Target in the target graph
    pub target: EntityId,
    /// Edge kind
    pub kind: EdgeKind,
    /// Why it was refused
    pub reason: String,
}

/// What happened while merging one partial graph.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeOutcome {
    /// Entities that were new to the target
    pub entities_created: usize,
    /// Entities that merged into an existing record
    pub entities_merged: usize,
    /// Edges that were new to the target
    pub edges_inserted: usize,
    /// Edges the target already had
    pub edges_existing: usize,
    /// Incompatible same-key entities kept under suffixed names
    pub contentions: Vec<Contention>,
    /// Soft-rejected edges (second parent, inheritance cycle)
    pub rejected_edges: Vec<RejectedEdge>,
}

impl CodeGraph {
    /// Merge every entity and edge of `partial` into this graph.
    ///
    /// Entities merge by structural key exactly as [`CodeGraph::put_entity`]
    /// does; edges are re-targeted through the resulting id mapping. Merging
    /// the same partial twice changes nothing the second time.
    ///
    /// # Errors
    ///
    /// Fatal store errors (capacity, identity exhaustion) abort the merge and
    /// may leave it half applied; use [`crate::SharedGraph::merge_batch`] for an
    /// all-or-nothing merge. Soft edge rejections are collected in the outcome.
    pub fn merge(&mut self, partial: &CodeGraph) -> Result<MergeOutcome> {
        let mut outcome = MergeOutcome::default();
        let mut id_map: HashMap<EntityId, EntityId> = HashMap::new();
        id_map.insert(partial.global_namespace(), self.global_namespace());
        id_map.insert(partial.external_root(), self.external_root());

        for entity in partial.entities() {
            if partial.is_root(entity.id) {
                continue;
            }
            match self.put_entity(entity.clone())? {
                PutEntity::Created(id) => {
                    outcome.entities_created += 1;
                    id_map.insert(entity.id, id);
                }
                PutEntity::Merged(id) => {
                    outcome.entities_merged += 1;
                    id_map.insert(entity.id, id);
                }
                PutEntity::Contended { id, original } => {
                    warn!(
                        "Store contention while merging {}: kept as sibling",
                        entity.qualified_name
                    );
                    outcome.contentions.push(Contention {
                        original,
                        renamed: id,
                        name: self.entity(id)?.qualified_name.to_string(),
                    });
                    id_map.insert(entity.id, id);
                }
            }
        }

        for edge in partial.edges() {
            let (Some(&source), Some(&target)) = (id_map.get(&edge.source), id_map.get(&edge.target))
            else {
                continue;
            };
            match self.put_edge(source, target, edge.kind, edge.metadata.clone()) {
                Ok(put) if put.is_inserted() => outcome.edges_inserted += 1,
                Ok(_) => outcome.edges_existing += 1,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!("Rejected {} edge during merge: {err}", edge.kind);
                    outcome.rejected_edges.push(RejectedEdge {
                        source,
                        target,
                        kind: edge.kind,
                        reason: err.to_string(),
                    });
                }
            }
        }

        debug!(
            "Merged partial graph: {} entities created, {} merged, {} edges inserted",
            outcome.entities_created, outcome.entities_merged, outcome.edges_inserted
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeMetadata, Entity, EntityKind, QualifiedName, SourceLocation};

    fn partial(file: &str) -> CodeGraph {
        let mut graph = CodeGraph::new();
        let ns = graph
            .put_entity(
                Entity::new(EntityKind::Namespace, QualifiedName::parse("shapes"))
                    .with_declaration(SourceLocation::new(file, 1, 1)),
            )
            .unwrap()
            .id();
        let shape = graph
            .put_entity(
                Entity::new(EntityKind::Class, QualifiedName::parse("shapes::Shape"))
                    .with_declaration(SourceLocation::new(file, 2, 1)),
            )
            .unwrap()
            .id();
        let global = graph.global_namespace();
        graph.put_edge(global, ns, EdgeKind::Contains, EdgeMetadata::None).unwrap();
        graph.put_edge(ns, shape, EdgeKind::Contains, EdgeMetadata::None).unwrap();
        graph
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut target = CodeGraph::new();
        let first = target.merge(&partial("a.hpp")).unwrap();
        assert_eq!(first.entities_created, 2);
        assert_eq!(first.edges_inserted, 2);

        let entities = target.entity_count();
        let edges = target.edge_count();
        let second = target.merge(&partial("a.hpp")).unwrap();
        assert_eq!(second.entities_created, 0);
        assert_eq!(second.edges_existing, 2);
        assert_eq!(target.entity_count(), entities);
        assert_eq!(target.edge_count(), edges);
    }

    #[test]
    fn test_merge_unions_declarations() {
        let mut target = CodeGraph::new();
        target.merge(&partial("a.hpp")).unwrap();
        target.merge(&partial("b.hpp")).unwrap();
        let shape = &target.find_by_name("shapes::Shape")[0];
        assert_eq!(shape.declarations.len(), 2);
    }
}
