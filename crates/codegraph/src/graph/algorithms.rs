//! Graph traversal and analysis algorithms.
//!
//! Provides kind-filtered BFS, reachability, cycle detection (Tarjan's SCC),
//! and override-chain queries used for inheritance analysis.

use crate::error::Result;
use crate::graph::{CodeGraph, Direction, Edge, EdgeKind, EntityId};
use std::collections::{HashMap, HashSet, VecDeque};

/// Breadth-First Search over edges of one kind.
///
/// # Parameters
/// - `graph`: The graph to traverse
/// - `start`: Starting entity
/// - `kind`: Edge kind to follow
/// - `direction`: Follow outgoing or incoming edges
/// - `max_depth`: Optional maximum depth (None for unlimited)
///
/// # Returns
/// Reachable entities in BFS order (excluding the start entity)
pub fn bfs(
    graph: &CodeGraph,
    start: EntityId,
    kind: EdgeKind,
    direction: Direction,
    max_depth: Option<usize>,
) -> Result<Vec<EntityId>> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    let mut result = Vec::new();

    visited.insert(start);
    queue.push_back((start, 0));

    while let Some((current, depth)) = queue.pop_front() {
        if let Some(max) = max_depth {
            if depth >= max {
                continue;
            }
        }

        for neighbor in graph.neighbors(current, Some(kind), direction)? {
            if visited.insert(neighbor) {
                result.push(neighbor);
                queue.push_back((neighbor, depth + 1));
            }
        }
    }

    Ok(result)
}

/// Whether `to` is reachable from `from` over outgoing edges of `kind`.
pub fn reaches(graph: &CodeGraph, from: EntityId, to: EntityId, kind: EdgeKind) -> bool {
    let mut visited = HashSet::new();
    let mut stack = vec![from];
    while let Some(current) = stack.pop() {
        if current == to {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Ok(edges) = graph.edges_from(current, Some(kind)) {
            stack.extend(edges.into_iter().map(|e| e.target));
        }
    }
    false
}

/// Find strongly connected components of the `kind` relation using Tarjan's algorithm.
///
/// Only components with more than one entity are returned (actual cycles).
pub fn strongly_connected_components(graph: &CodeGraph, kind: EdgeKind) -> Vec<Vec<EntityId>> {
    let mut state = Tarjan {
        graph,
        kind,
        index: 0,
        indices: HashMap::new(),
        lowlinks: HashMap::new(),
        stack: Vec::new(),
        on_stack: HashSet::new(),
        sccs: Vec::new(),
    };

    // Process all entities to handle disconnected components
    for entity in graph.entities() {
        if !state.indices.contains_key(&entity.id) {
            state.strongconnect(entity.id);
        }
    }

    state.sccs.into_iter().filter(|scc| scc.len() > 1).collect()
}

struct Tarjan<'a> {
    graph: &'a CodeGraph,
    kind: EdgeKind,
    index: usize,
    indices: HashMap<EntityId, usize>,
    lowlinks: HashMap<EntityId, usize>,
    stack: Vec<EntityId>,
    on_stack: HashSet<EntityId>,
    sccs: Vec<Vec<EntityId>>,
}

impl Tarjan<'_> {
    fn strongconnect(&mut self, v: EntityId) {
        self.indices.insert(v, self.index);
        self.lowlinks.insert(v, self.index);
        self.index += 1;
        self.stack.push(v);
        self.on_stack.insert(v);

        let successors: Vec<EntityId> = self
            .graph
            .edges_from(v, Some(self.kind))
            .map(|edges| edges.into_iter().map(|e| e.target).collect())
            .unwrap_or_default();

        for w in successors {
            if !self.indices.contains_key(&w) {
                self.strongconnect(w);
                let low = self.lowlinks[&v].min(self.lowlinks[&w]);
                self.lowlinks.insert(v, low);
            } else if self.on_stack.contains(&w) {
                let low = self.lowlinks[&v].min(self.indices[&w]);
                self.lowlinks.insert(v, low);
            }
        }

        // v is the root of a component: pop it off the stack
        if self.lowlinks[&v] == self.indices[&v] {
            let mut scc = Vec::new();
            while let Some(w) = self.stack.pop() {
                self.on_stack.remove(&w);
                scc.push(w);
                if w == v {
                    break;
                }
            }
            self.sccs.push(scc);
        }
    }
}

/// Every `overrides` edge pointing at `method`, directly or through intermediate overriders.
///
/// Edges are returned in BFS order from `method`.
pub fn override_closure(graph: &CodeGraph, method: EntityId) -> Vec<&Edge> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    let mut result = Vec::new();

    visited.insert(method);
    queue.push_back(method);

    while let Some(current) = queue.pop_front() {
        let Ok(incoming) = graph.incoming(current, Some(EdgeKind::Overrides)) else {
            continue;
        };
        for edge in incoming {
            result.push(edge);
            if visited.insert(edge.source) {
                queue.push_back(edge.source);
            }
        }
    }

    result
}

/// Follow outgoing `overrides` edges to the method that starts the chain.
pub fn override_root(graph: &CodeGraph, method: EntityId) -> EntityId {
    let mut visited = HashSet::new();
    let mut current = method;
    while visited.insert(current) {
        match graph
            .edges_from(current, Some(EdgeKind::Overrides))
            .ok()
            .and_then(|edges| edges.first().map(|e| e.target))
        {
            Some(next) => current = next,
            None => break,
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeMetadata, Entity, EntityKind, QualifiedName};

    fn add(graph: &mut CodeGraph, kind: EntityKind, name: &str) -> EntityId {
        graph
            .put_entity(Entity::new(kind, QualifiedName::parse(name)))
            .unwrap()
            .id()
    }

    #[test]
    fn test_bfs_inheritance_chain() {
        let mut graph = CodeGraph::new();
        let a = add(&mut graph, EntityKind::Class, "A");
        let b = add(&mut graph, EntityKind::Class, "B");
        let c = add(&mut graph, EntityKind::Class, "C");
        graph.put_edge(a, b, EdgeKind::Inherits, EdgeMetadata::None).unwrap();
        graph.put_edge(b, c, EdgeKind::Inherits, EdgeMetadata::None).unwrap();

        let depth_one = bfs(&graph, a, EdgeKind::Inherits, Direction::Outgoing, Some(1)).unwrap();
        assert_eq!(depth_one, vec![b]);
        assert_eq!(graph.ancestors(a).unwrap(), vec![b, c]);
        assert_eq!(graph.descendants(c).unwrap(), vec![b, a]);
        assert!(graph.is_derived_from(a, c));
        assert!(!graph.is_derived_from(c, a));
    }

    #[test]
    fn test_override_closure_spans_levels() {
        let mut graph = CodeGraph::new();
        let base = add(&mut graph, EntityKind::Method, "Base::f");
        let mid = add(&mut graph, EntityKind::Method, "Mid::f");
        let leaf = add(&mut graph, EntityKind::Method, "Leaf::f");
        graph.put_edge(mid, base, EdgeKind::Overrides, EdgeMetadata::None).unwrap();
        graph.put_edge(leaf, mid, EdgeKind::Overrides, EdgeMetadata::None).unwrap();

        let sources: Vec<_> = override_closure(&graph, base)
            .into_iter()
            .map(|e| e.source)
            .collect();
        assert_eq!(sources, vec![mid, leaf]);
        assert_eq!(override_root(&graph, leaf), base);
        assert_eq!(override_root(&graph, base), base);
    }

    #[test]
    fn test_scc_finds_reference_cycle() {
        let mut graph = CodeGraph::new();
        let f = add(&mut graph, EntityKind::Function, "f");
        let g = add(&mut graph, EntityKind::Function, "g");
        graph.put_edge(f, g, EdgeKind::References, EdgeMetadata::None).unwrap();
        graph.put_edge(g, f, EdgeKind::References, EdgeMetadata::None).unwrap();

        let sccs = strongly_connected_components(&graph, EdgeKind::References);
        assert_eq!(sccs.len(), 1);
        assert_eq!(sccs[0].len(), 2);
    }
}
