//! Fluent entity queries.
//!
//! Provides a fluent interface for filtering the entities of a [`CodeGraph`].

use crate::graph::{CodeGraph, Entity, EntityId, EntityKind, QualifiedName};

/// A filter predicate that can be applied to entities.
type FilterFn<'a> = Box<dyn Fn(&Entity) -> bool + 'a>;

/// Fluent query builder over a graph's entities.
///
/// Results are returned in entity creation order.
///
/// # Examples
///
/// ```
/// use codegraph::{CodeGraph, EntityKind};
///
/// let graph = CodeGraph::new();
/// let abstract_classes = graph
///     .query()
///     .kind(EntityKind::Class)
///     .abstract_only()
///     .execute();
/// assert!(abstract_classes.is_empty());
/// ```
pub struct EntityQuery<'a> {
    graph: &'a CodeGraph,
    filters: Vec<FilterFn<'a>>,
    limit_value: Option<usize>,
    include_roots: bool,
}

impl<'a> EntityQuery<'a> {
    /// Create a new query for the given graph.
    pub fn new(graph: &'a CodeGraph) -> Self {
        Self {
            graph,
            filters: Vec::new(),
            limit_value: None,
            include_roots: false,
        }
    }

    /// Filter entities by kind.
    pub fn kind(mut self, kind: EntityKind) -> Self {
        self.filters.push(Box::new(move |e| e.kind == kind));
        self
    }

    /// Filter entities whose kind is any of `kinds`.
    pub fn kinds(mut self, kinds: &[EntityKind]) -> Self {
        let kinds = kinds.to_vec();
        self.filters.push(Box::new(move |e| kinds.contains(&e.kind)));
        self
    }

    /// Filter entities by simple name containing a substring (case-insensitive).
    pub fn name_contains(mut self, substring: &str) -> Self {
        let substring = substring.to_lowercase();
        self.filters
            .push(Box::new(move |e| e.name().to_lowercase().contains(&substring)));
        self
    }

    /// Filter entities by simple name with an anchored pattern.
    ///
    /// Supports `^` (start) and `$` (end); anything else is a substring match.
    pub fn name_matches(mut self, pattern: &str) -> Self {
        let pattern = pattern.to_string();
        self.filters
            .push(Box::new(move |e| anchored_match(&pattern, e.name())));
        self
    }

    /// Filter entities declared inside `scope` (at any depth).
    pub fn in_scope(mut self, scope: &str) -> Self {
        let scope = QualifiedName::parse(scope);
        self.filters.push(Box::new(move |e| {
            e.qualified_name.len() > scope.len() && e.qualified_name.starts_with(&scope)
        }));
        self
    }

    /// Filter entities with at least one declaration in `file`.
    pub fn in_file(mut self, file: &str) -> Self {
        let file = file.to_string();
        self.filters.push(Box::new(move |e| {
            e.declarations
                .iter()
                .any(|loc| loc.file.to_string_lossy() == file.as_str())
        }));
        self
    }

    /// Only abstract classes.
    pub fn abstract_only(mut self) -> Self {
        self.filters.push(Box::new(|e| e.is_abstract));
        self
    }

    /// Filter entities using a custom predicate function.
    pub fn custom<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Entity) -> bool + 'a,
    {
        self.filters.push(Box::new(predicate));
        self
    }

    /// Also consider the implicit global and external roots.
    pub fn include_roots(mut self) -> Self {
        self.include_roots = true;
        self
    }

    /// Limit the number of results returned.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit_value = Some(n);
        self
    }

    /// Execute the query and return matching entity ids.
    pub fn execute(&self) -> Vec<EntityId> {
        self.matching()
            .take(self.limit_value.unwrap_or(usize::MAX))
            .map(|e| e.id)
            .collect()
    }

    /// Count matching entities without allocating a result vector.
    pub fn count(&self) -> usize {
        self.matching().count()
    }

    /// Check if any entity matches (short-circuits on first match).
    pub fn exists(&self) -> bool {
        self.matching().next().is_some()
    }

    fn matching(&self) -> impl Iterator<Item = &'a Entity> + '_ {
        let graph = self.graph;
        graph
            .entities()
            .filter(move |e| self.include_roots || !graph.is_root(e.id))
            .filter(move |e| self.filters.iter().all(|filter| filter(e)))
    }
}

fn anchored_match(pattern: &str, text: &str) -> bool {
    let starts_with = pattern.starts_with('^');
    let ends_with = pattern.ends_with('$');
    let pattern = pattern.trim_start_matches('^').trim_end_matches('$');

    match (starts_with, ends_with) {
        (true, true) => text == pattern,
        (true, false) => text.starts_with(pattern),
        (false, true) => text.ends_with(pattern),
        (false, false) => text.contains(pattern),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SourceLocation;

    fn sample() -> CodeGraph {
        let mut graph = CodeGraph::new();
        for (kind, name, file) in [
            (EntityKind::Namespace, "shapes", "classes.hpp"),
            (EntityKind::Class, "shapes::Shape", "classes.hpp"),
            (EntityKind::Class, "shapes::Circle", "classes.hpp"),
            (EntityKind::Function, "main", "sample.cpp"),
        ] {
            graph
                .put_entity(
                    Entity::new(kind, QualifiedName::parse(name))
                        .with_declaration(SourceLocation::new(file, 1, 1)),
                )
                .unwrap();
        }
        graph
    }

    #[test]
    fn test_kind_and_scope() {
        let graph = sample();
        assert_eq!(graph.query().kind(EntityKind::Class).count(), 2);
        assert_eq!(graph.query().in_scope("shapes").count(), 2);
        assert_eq!(graph.query().in_file("sample.cpp").count(), 1);
    }

    #[test]
    fn test_kinds_matches_any() {
        let graph = sample();
        let found = graph
            .query()
            .kinds(&[EntityKind::Namespace, EntityKind::Function])
            .execute();
        assert_eq!(found.len(), 2);
        assert_eq!(graph.query().kinds(&[]).count(), 0);
    }

    #[test]
    fn test_name_filters() {
        let graph = sample();
        assert_eq!(graph.query().name_contains("CIRC").count(), 1);
        assert_eq!(graph.query().name_matches("^Sh").count(), 1);
        assert_eq!(graph.query().name_matches("e$").count(), 2);
    }

    #[test]
    fn test_roots_excluded_by_default() {
        let graph = sample();
        assert_eq!(graph.query().count(), 4);
        assert_eq!(graph.query().include_roots().count(), 6);
        assert_eq!(graph.query().limit(1).execute().len(), 1);
    }
}
