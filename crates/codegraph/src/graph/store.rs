//! Main CodeGraph interface for graph operations.

use super::key::StructuralKey;
use super::name::QualifiedName;
use super::types::{Direction, Edge, EdgeId, EdgeKind, EdgeMetadata, Entity, EntityId, EntityKind, SourceLocation};
use crate::error::{GraphError, Result};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Name of the implicit root under which external placeholders live.
pub const EXTERNAL_ROOT: &str = "<external>";

/// Capacity limits. Exceeding one is a fatal error for the current build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreLimits {
    /// Maximum number of entities, implicit roots included
    pub max_entities: usize,
    /// Maximum number of edges
    pub max_edges: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_entities: usize::MAX,
            max_edges: usize::MAX,
        }
    }
}

/// Outcome of [`CodeGraph::put_entity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutEntity {
    /// A new entity was allocated
    Created(EntityId),
    /// The declaration merged into an existing entity
    Merged(EntityId),
    /// The key was taken by an incompatible entity; the declaration lives on
    /// under a `#N`-suffixed sibling name
    Contended {
        /// The sibling that received the declaration
        id: EntityId,
        /// The entity that owns the unsuffixed key
        original: EntityId,
    },
}

impl PutEntity {
    /// Id the declaration ended up in.
    pub fn id(&self) -> EntityId {
        match self {
            PutEntity::Created(id) | PutEntity::Merged(id) => *id,
            PutEntity::Contended { id, .. } => *id,
        }
    }
}

/// Outcome of [`CodeGraph::put_edge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutEdge {
    /// New edge
    Inserted(EdgeId),
    /// An identical edge already existed
    Existing(EdgeId),
}

impl PutEdge {
    /// Id of the (new or existing) edge.
    pub fn id(&self) -> EdgeId {
        match self {
            PutEdge::Inserted(id) | PutEdge::Existing(id) => *id,
        }
    }

    /// Whether the edge was new.
    pub fn is_inserted(&self) -> bool {
        matches!(self, PutEdge::Inserted(_))
    }
}

type EdgeKey = (EntityId, EntityId, EdgeKind, EdgeMetadata);

/// The code graph store.
///
/// Entities live in an arena in creation order and are addressed by their
/// content-addressed [`EntityId`]. Edges are kept in first-seen order with
/// forward and reverse adjacency keyed by `(entity, edge kind)`.
///
/// Two implicit roots always exist: the global namespace and the external root
/// that holds placeholders for names that never resolved.
#[derive(Debug, Clone)]
pub struct CodeGraph {
    entities: Vec<Entity>,
    index: HashMap<EntityId, usize>,
    keys: HashMap<StructuralKey, EntityId>,
    names: HashMap<QualifiedName, Vec<EntityId>>,
    edges: Vec<Edge>,
    edge_keys: HashMap<EdgeKey, EdgeId>,
    // Adjacency indexes for O(1) neighbor lookups
    adjacency_out: HashMap<(EntityId, EdgeKind), Vec<EdgeId>>,
    adjacency_in: HashMap<(EntityId, EdgeKind), Vec<EdgeId>>,
    parents: HashMap<EntityId, EntityId>,
    limits: StoreLimits,
    global: EntityId,
    external: EntityId,
}

impl Default for CodeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGraph {
    /// Create an empty graph with no capacity limits.
    pub fn new() -> Self {
        Self::with_limits(StoreLimits::default())
    }

    /// Create an empty graph with the given capacity limits.
    pub fn with_limits(limits: StoreLimits) -> Self {
        let global = Entity::new(EntityKind::Namespace, QualifiedName::root());
        let external = Entity::new(EntityKind::External, QualifiedName::new([EXTERNAL_ROOT]));
        let mut graph = Self {
            entities: Vec::new(),
            index: HashMap::new(),
            keys: HashMap::new(),
            names: HashMap::new(),
            edges: Vec::new(),
            edge_keys: HashMap::new(),
            adjacency_out: HashMap::new(),
            adjacency_in: HashMap::new(),
            parents: HashMap::new(),
            limits,
            global: global.id,
            external: external.id,
        };
        graph.push_entity(global.key(), global);
        graph.push_entity(external.key(), external);
        graph
    }

    /// Id of the implicit global namespace.
    pub fn global_namespace(&self) -> EntityId {
        self.global
    }

    /// Id of the implicit external root.
    pub fn external_root(&self) -> EntityId {
        self.external
    }

    /// Whether `id` is one of the two implicit roots.
    pub fn is_root(&self, id: EntityId) -> bool {
        id == self.global || id == self.external
    }

    /// Configured capacity limits.
    pub fn limits(&self) -> StoreLimits {
        self.limits
    }

    /// Insert an entity, or merge it into the existing entity with the same key.
    ///
    /// A same-key entity whose signature is incompatible (conflicting return
    /// types) is kept as a sibling named `name#N`; the first compatible
    /// sibling receives later declarations, so re-ingestion stays idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CapacityExceeded`] or [`GraphError::IdentityCollision`];
    /// both are fatal.
    pub fn put_entity(&mut self, mut entity: Entity) -> Result<PutEntity> {
        let key = entity.key();
        entity.id = key.entity_id();

        if let Some(&existing) = self.keys.get(&key) {
            if self.is_compatible(existing, &entity) {
                self.absorb(existing, &entity)?;
                debug!("Merged declaration into {existing} ({key})");
                return Ok(PutEntity::Merged(existing));
            }
            return self.put_contended(existing, entity);
        }

        let id = self.insert_new(key, entity)?;
        Ok(PutEntity::Created(id))
    }

    /// Get an entity by id.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EntityNotFound`] if the entity doesn't exist.
    pub fn entity(&self, id: EntityId) -> Result<&Entity> {
        self.index
            .get(&id)
            .map(|&i| &self.entities[i])
            .ok_or(GraphError::EntityNotFound { entity_id: id })
    }

    fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity> {
        match self.index.get(&id) {
            Some(&i) => Ok(&mut self.entities[i]),
            None => Err(GraphError::EntityNotFound { entity_id: id }),
        }
    }

    /// Whether an entity exists.
    pub fn contains_entity(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    /// Id of the entity with exactly this structural key.
    pub fn lookup(&self, key: &StructuralKey) -> Option<EntityId> {
        self.keys.get(key).copied()
    }

    /// All entities with the given qualified name (any kind, every overload).
    pub fn entities_named(&self, name: &QualifiedName) -> Vec<&Entity> {
        self.names
            .get(name)
            .map(|ids| ids.iter().filter_map(|id| self.entity(*id).ok()).collect())
            .unwrap_or_default()
    }

    /// All entities whose qualified name displays as `display` (e.g. `shapes::Shape::area`).
    pub fn find_by_name(&self, display: &str) -> Vec<&Entity> {
        self.entities_named(&QualifiedName::parse(display))
    }

    /// Record another declaration site. Returns whether it was new.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EntityNotFound`] if the entity doesn't exist.
    pub fn add_declaration(&mut self, id: EntityId, location: SourceLocation) -> Result<bool> {
        Ok(self.entity_mut(id)?.add_declaration(location))
    }

    /// Set the abstractness flag.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EntityNotFound`] if the entity doesn't exist.
    pub fn mark_abstract(&mut self, id: EntityId, is_abstract: bool) -> Result<()> {
        let entity = self.entity_mut(id)?;
        if entity.is_abstract != is_abstract {
            trace!("Entity {} abstract={is_abstract}", entity.qualified_name);
        }
        entity.is_abstract = is_abstract;
        Ok(())
    }

    /// Add an edge.
    ///
    /// Idempotent on `(source, target, kind, metadata)`.
    ///
    /// # Errors
    ///
    /// - [`GraphError::EntityNotFound`] if either endpoint doesn't exist
    /// - [`GraphError::ContainmentConflict`] for a second `contains` parent
    /// - [`GraphError::InheritanceCycle`] if an `inherits` edge would close a cycle
    /// - [`GraphError::InvalidOperation`] for containing a root or a containment loop
    /// - [`GraphError::CapacityExceeded`] when the edge limit is reached
    pub fn put_edge(
        &mut self,
        source: EntityId,
        target: EntityId,
        kind: EdgeKind,
        metadata: EdgeMetadata,
    ) -> Result<PutEdge> {
        self.entity(source)?;
        self.entity(target)?;

        let edge_key = (source, target, kind, metadata);
        if let Some(&id) = self.edge_keys.get(&edge_key) {
            trace!("Edge {source} -{kind}-> {target} already present as {id}");
            return Ok(PutEdge::Existing(id));
        }

        match kind {
            EdgeKind::Contains => self.check_containment(source, target)?,
            EdgeKind::Inherits => {
                if self.would_create_cycle(source, target) {
                    return Err(GraphError::InheritanceCycle {
                        derived: source,
                        base: target,
                    });
                }
            }
            _ => {}
        }

        if self.edges.len() >= self.limits.max_edges {
            return Err(GraphError::CapacityExceeded {
                what: "edges",
                limit: self.limits.max_edges,
            });
        }

        let id = self.edges.len() as EdgeId;
        debug!("Adding edge: id={id}, source={source}, target={target}, kind={kind}");

        self.adjacency_out.entry((source, kind)).or_default().push(id);
        self.adjacency_in.entry((target, kind)).or_default().push(id);
        if kind == EdgeKind::Contains {
            self.parents.insert(target, source);
        }

        let metadata = edge_key.3.clone();
        self.edge_keys.insert(edge_key, id);
        self.edges.push(Edge {
            id,
            source,
            target,
            kind,
            metadata,
        });

        Ok(PutEdge::Inserted(id))
    }

    /// Get an edge by id.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EdgeNotFound`] if the edge doesn't exist.
    pub fn edge(&self, id: EdgeId) -> Result<&Edge> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.edges.get(i))
            .ok_or(GraphError::EdgeNotFound { edge_id: id })
    }

    /// Outgoing edges of `id`, optionally of one kind, in first-seen order.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EntityNotFound`] if the entity doesn't exist.
    pub fn edges_from(&self, id: EntityId, kind: Option<EdgeKind>) -> Result<Vec<&Edge>> {
        self.entity(id)?;
        Ok(self.collect_edges(&self.adjacency_out, id, kind))
    }

    /// Incoming edges of `id`.
    ///
    /// For [`EdgeKind::Overrides`] this is the transitive closure: every method
    /// that overrides `id` directly or through an intermediate overrider. All
    /// other kinds return direct edges only.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EntityNotFound`] if the entity doesn't exist.
    pub fn edges_to(&self, id: EntityId, kind: Option<EdgeKind>) -> Result<Vec<&Edge>> {
        self.entity(id)?;
        if kind == Some(EdgeKind::Overrides) {
            return Ok(super::algorithms::override_closure(self, id));
        }
        Ok(self.collect_edges(&self.adjacency_in, id, kind))
    }

    /// Direct incoming edges of `id`, with no transitive expansion.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EntityNotFound`] if the entity doesn't exist.
    pub fn incoming(&self, id: EntityId, kind: Option<EdgeKind>) -> Result<Vec<&Edge>> {
        self.entity(id)?;
        Ok(self.collect_edges(&self.adjacency_in, id, kind))
    }

    /// Neighbor entities over edges of `kind` (or all kinds) in the given direction.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EntityNotFound`] if the entity doesn't exist.
    pub fn neighbors(
        &self,
        id: EntityId,
        kind: Option<EdgeKind>,
        direction: Direction,
    ) -> Result<Vec<EntityId>> {
        self.entity(id)?;
        let mut seen = HashSet::new();
        let mut neighbors = Vec::new();

        if matches!(direction, Direction::Outgoing | Direction::Both) {
            for edge in self.collect_edges(&self.adjacency_out, id, kind) {
                if seen.insert(edge.target) {
                    neighbors.push(edge.target);
                }
            }
        }
        if matches!(direction, Direction::Incoming | Direction::Both) {
            for edge in self.collect_edges(&self.adjacency_in, id, kind) {
                if seen.insert(edge.source) {
                    neighbors.push(edge.source);
                }
            }
        }

        Ok(neighbors)
    }

    /// The `contains` parent of an entity (`None` for the roots).
    pub fn parent_of(&self, id: EntityId) -> Option<EntityId> {
        self.parents.get(&id).copied()
    }

    /// Direct members, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EntityNotFound`] if the entity doesn't exist.
    pub fn children_of(&self, id: EntityId) -> Result<Vec<EntityId>> {
        Ok(self
            .edges_from(id, Some(EdgeKind::Contains))?
            .into_iter()
            .map(|e| e.target)
            .collect())
    }

    /// Placeholder for a name that never resolved, contained by the external root.
    ///
    /// Placeholders are keyed by name, so every unresolved use of the same
    /// spelling shares one placeholder.
    ///
    /// # Errors
    ///
    /// Fails only on capacity or identity exhaustion.
    pub fn external_placeholder(&mut self, display: &str) -> Result<EntityId> {
        let mut segments = vec![EXTERNAL_ROOT.to_string()];
        segments.extend(QualifiedName::parse(display).segments().iter().cloned());
        let entity = Entity::new(EntityKind::External, QualifiedName::new(segments));
        let id = self.put_entity(entity)?.id();
        self.put_edge(self.external, id, EdgeKind::Contains, EdgeMetadata::None)?;
        Ok(id)
    }

    /// All entities in creation order (implicit roots first).
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// All edges in first-seen order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    /// Get the total number of entities in the graph.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Get the total number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Create a new query over this graph's entities.
    pub fn query(&self) -> crate::query::EntityQuery<'_> {
        crate::query::EntityQuery::new(self)
    }

    // ===== Algorithm Methods =====

    /// Transitive bases of a class, nearest first.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EntityNotFound`] if the entity doesn't exist.
    pub fn ancestors(&self, class: EntityId) -> Result<Vec<EntityId>> {
        super::algorithms::bfs(self, class, EdgeKind::Inherits, Direction::Outgoing, None)
    }

    /// Transitive derived classes, nearest first.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EntityNotFound`] if the entity doesn't exist.
    pub fn descendants(&self, class: EntityId) -> Result<Vec<EntityId>> {
        super::algorithms::bfs(self, class, EdgeKind::Inherits, Direction::Incoming, None)
    }

    /// Whether `derived` reaches `base` through `inherits` edges.
    pub fn is_derived_from(&self, derived: EntityId, base: EntityId) -> bool {
        derived != base && super::algorithms::reaches(self, derived, base, EdgeKind::Inherits)
    }

    /// Whether adding `derived -inherits-> base` would close a cycle.
    pub fn would_create_cycle(&self, derived: EntityId, base: EntityId) -> bool {
        derived == base || super::algorithms::reaches(self, base, derived, EdgeKind::Inherits)
    }

    /// Strongly connected components of the `inherits` relation with more than
    /// one member (Tarjan). Always empty for graphs built through [`Self::put_edge`].
    pub fn inheritance_cycles(&self) -> Vec<Vec<EntityId>> {
        super::algorithms::strongly_connected_components(self, EdgeKind::Inherits)
    }

    /// The method at the top of `method`'s override chain (itself if it overrides nothing).
    pub fn override_root(&self, method: EntityId) -> EntityId {
        super::algorithms::override_root(self, method)
    }

    // Private helper methods

    fn collect_edges(
        &self,
        adjacency: &HashMap<(EntityId, EdgeKind), Vec<EdgeId>>,
        id: EntityId,
        kind: Option<EdgeKind>,
    ) -> Vec<&Edge> {
        let kinds: &[EdgeKind] = match &kind {
            Some(kind) => std::slice::from_ref(kind),
            None => &EdgeKind::ALL,
        };
        let mut ids: Vec<EdgeId> = kinds
            .iter()
            .filter_map(|k| adjacency.get(&(id, *k)))
            .flatten()
            .copied()
            .collect();
        if kind.is_none() {
            ids.sort_unstable();
        }
        ids.into_iter()
            .filter_map(|edge_id| self.edges.get(edge_id as usize))
            .collect()
    }

    fn check_containment(&self, parent: EntityId, child: EntityId) -> Result<()> {
        if self.is_root(child) {
            return Err(GraphError::invalid("Cannot contain an implicit root"));
        }
        if let Some(&existing_parent) = self.parents.get(&child) {
            if existing_parent != parent {
                return Err(GraphError::ContainmentConflict {
                    child,
                    existing_parent,
                    new_parent: parent,
                });
            }
        }
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == child {
                return Err(GraphError::invalid(format!(
                    "Containment loop: {child} already encloses {parent}"
                )));
            }
            cursor = self.parents.get(&current).copied();
        }
        Ok(())
    }

    fn is_compatible(&self, existing: EntityId, incoming: &Entity) -> bool {
        match (self.entity(existing), &incoming.signature) {
            (Ok(current), Some(theirs)) => current
                .signature
                .as_ref()
                .map_or(true, |mine| mine.compatible_with(theirs)),
            _ => true,
        }
    }

    fn absorb(&mut self, existing: EntityId, incoming: &Entity) -> Result<()> {
        self.entity_mut(existing)?.absorb(incoming);
        Ok(())
    }

    fn put_contended(&mut self, original: EntityId, entity: Entity) -> Result<PutEntity> {
        let base = entity.qualified_name.clone();
        let mut suffix = 2usize;
        loop {
            let mut candidate = entity.clone();
            candidate.rename(base.with_name(format!("{}#{suffix}", base.name())));
            let key = candidate.key();
            match self.keys.get(&key).copied() {
                Some(sibling) if self.is_compatible(sibling, &candidate) => {
                    self.absorb(sibling, &candidate)?;
                    debug!("Merged contended declaration into sibling {key}");
                    return Ok(PutEntity::Contended {
                        id: sibling,
                        original,
                    });
                }
                Some(_) => suffix += 1,
                None => {
                    debug!("Key contention on {base}: keeping newcomer as {key}");
                    let id = self.insert_new(key, candidate)?;
                    return Ok(PutEntity::Contended { id, original });
                }
            }
        }
    }

    fn insert_new(&mut self, key: StructuralKey, entity: Entity) -> Result<EntityId> {
        if self.entities.len() >= self.limits.max_entities {
            return Err(GraphError::CapacityExceeded {
                what: "entities",
                limit: self.limits.max_entities,
            });
        }
        let id = entity.id;
        if let Some(existing) = self.index.get(&id).map(|&i| &self.entities[i]) {
            return Err(GraphError::IdentityCollision {
                entity_id: id,
                existing: existing.key().to_string(),
                incoming: key.to_string(),
            });
        }
        debug!(
            "Adding entity: id={id}, kind={}, name={}",
            entity.kind, entity.qualified_name
        );
        self.push_entity(key, entity);
        Ok(id)
    }

    fn push_entity(&mut self, key: StructuralKey, entity: Entity) {
        let id = entity.id;
        self.index.insert(id, self.entities.len());
        self.keys.insert(key, id);
        self.names
            .entry(entity.qualified_name.clone())
            .or_default()
            .push(id);
        self.entities.push(entity);
    }
}
