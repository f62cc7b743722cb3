//! Store-level tests over a hand-built shapes hierarchy.
//!
//! Covers:
//! - override reachability across several levels
//! - containment forest shape
//! - merge of partial graphs and declaration union
//! - serde output of entities and edges
//! - type helpers and root names reachable from the crate root

use codegraph::{
    indirection_target, is_well_formed_type, normalize_type, Access, CodeGraph, Direction,
    EdgeKind, EdgeMetadata, Entity, EntityId, EntityKind, QualifiedName, Signature,
    SourceLocation, EXTERNAL_ROOT,
};

struct Shapes {
    graph: CodeGraph,
    shape: EntityId,
    circle: EntityId,
    rectangle: EntityId,
    shape_area: EntityId,
    circle_area: EntityId,
    rectangle_area: EntityId,
}

fn put(graph: &mut CodeGraph, entity: Entity, parent: EntityId) -> EntityId {
    let id = graph.put_entity(entity).unwrap().id();
    graph
        .put_edge(parent, id, EdgeKind::Contains, EdgeMetadata::None)
        .unwrap();
    id
}

fn area(class: &str, pure: bool) -> Entity {
    let mut sig = Signature::new(Vec::<String>::new())
        .with_return_type("double")
        .const_fn();
    sig = if pure { sig.pure() } else { sig.override_fn() };
    Entity::new(
        EntityKind::Method,
        QualifiedName::parse(&format!("shapes::{class}::area")),
    )
    .with_signature(sig)
    .with_access(Access::Public)
}

fn build() -> Shapes {
    let mut graph = CodeGraph::new();
    let global = graph.global_namespace();
    let ns = put(
        &mut graph,
        Entity::new(EntityKind::Namespace, QualifiedName::parse("shapes")),
        global,
    );
    let shape = put(
        &mut graph,
        Entity::new(EntityKind::Class, QualifiedName::parse("shapes::Shape")),
        ns,
    );
    let circle = put(
        &mut graph,
        Entity::new(EntityKind::Class, QualifiedName::parse("shapes::Circle")),
        ns,
    );
    let rectangle = put(
        &mut graph,
        Entity::new(EntityKind::Class, QualifiedName::parse("shapes::Rectangle")),
        ns,
    );
    let shape_area = put(&mut graph, area("Shape", true), shape);
    let circle_area = put(&mut graph, area("Circle", false), circle);
    let rectangle_area = put(&mut graph, area("Rectangle", false), rectangle);

    for derived in [circle, rectangle] {
        graph
            .put_edge(
                derived,
                shape,
                EdgeKind::Inherits,
                EdgeMetadata::Inheritance {
                    access: Access::Public,
                    is_virtual: false,
                    order: 0,
                },
            )
            .unwrap();
    }
    graph
        .put_edge(circle_area, shape_area, EdgeKind::Overrides, EdgeMetadata::None)
        .unwrap();
    graph
        .put_edge(rectangle_area, shape_area, EdgeKind::Overrides, EdgeMetadata::None)
        .unwrap();

    Shapes {
        graph,
        shape,
        circle,
        rectangle,
        shape_area,
        circle_area,
        rectangle_area,
    }
}

#[test]
fn test_override_reachability() {
    let s = build();
    let mut sources: Vec<EntityId> = s
        .graph
        .edges_to(s.shape_area, Some(EdgeKind::Overrides))
        .unwrap()
        .into_iter()
        .map(|e| e.source)
        .collect();
    sources.sort();
    let mut expected = vec![s.circle_area, s.rectangle_area];
    expected.sort();
    assert_eq!(sources, expected);
}

#[test]
fn test_override_reachability_through_intermediate() {
    let mut s = build();
    let ns = s.graph.parent_of(s.circle).unwrap();
    let unit = put(
        &mut s.graph,
        Entity::new(EntityKind::Class, QualifiedName::parse("shapes::UnitCircle")),
        ns,
    );
    let unit_area = put(&mut s.graph, area("UnitCircle", false), unit);
    s.graph
        .put_edge(unit, s.circle, EdgeKind::Inherits, EdgeMetadata::None)
        .unwrap();
    s.graph
        .put_edge(unit_area, s.circle_area, EdgeKind::Overrides, EdgeMetadata::None)
        .unwrap();

    let sources: Vec<EntityId> = s
        .graph
        .edges_to(s.shape_area, Some(EdgeKind::Overrides))
        .unwrap()
        .into_iter()
        .map(|e| e.source)
        .collect();
    assert_eq!(sources.len(), 3);
    assert!(sources.contains(&unit_area));
    assert_eq!(s.graph.override_root(unit_area), s.shape_area);

    let direct = s
        .graph
        .incoming(s.shape_area, Some(EdgeKind::Overrides))
        .unwrap();
    assert_eq!(direct.len(), 2);
}

#[test]
fn test_containment_forest() {
    let s = build();
    let global = s.graph.global_namespace();
    for entity in s.graph.entities() {
        if s.graph.is_root(entity.id) {
            assert_eq!(s.graph.parent_of(entity.id), None);
        } else {
            assert!(s.graph.parent_of(entity.id).is_some(), "{}", entity.qualified_name);
        }
    }
    let ns = s.graph.children_of(global).unwrap();
    assert_eq!(ns.len(), 1);
    assert_eq!(s.graph.children_of(ns[0]).unwrap(), vec![s.shape, s.circle, s.rectangle]);
}

#[test]
fn test_inheritance_neighbors_and_cycles() {
    let s = build();
    let derived = s
        .graph
        .neighbors(s.shape, Some(EdgeKind::Inherits), Direction::Incoming)
        .unwrap();
    assert_eq!(derived, vec![s.circle, s.rectangle]);
    assert!(s.graph.is_derived_from(s.rectangle, s.shape));
    assert!(s.graph.would_create_cycle(s.shape, s.circle));
    assert!(s.graph.inheritance_cycles().is_empty());
}

#[test]
fn test_merging_same_partial_is_idempotent() {
    let s = build();
    let mut target = CodeGraph::new();
    target.merge(&s.graph).unwrap();
    let (entities, edges) = (target.entity_count(), target.edge_count());
    let outcome = target.merge(&s.graph).unwrap();

    assert_eq!(outcome.entities_created, 0);
    assert_eq!(outcome.edges_inserted, 0);
    assert_eq!(target.entity_count(), entities);
    assert_eq!(target.edge_count(), edges);
    assert_eq!(entities, s.graph.entity_count());
    assert!(target.entity(s.circle_area).is_ok());
}

#[test]
fn test_declaration_and_definition_merge() {
    let mut s = build();
    let definition = area("Circle", false)
        .with_declaration(SourceLocation::new("sample.cpp", 40, 1));
    let outcome = s.graph.put_entity(definition).unwrap();
    assert_eq!(outcome.id(), s.circle_area);
    let record = s.graph.entity(s.circle_area).unwrap();
    assert_eq!(record.declarations.len(), 1);
    assert!(record.signature.as_ref().unwrap().is_override);
}

#[test]
fn test_edges_serialize() {
    let s = build();
    let edges = s.graph.edges_from(s.circle, Some(EdgeKind::Inherits)).unwrap();
    let json = serde_json::to_value(edges[0]).unwrap();
    assert_eq!(json["kind"], "inherits");
    assert_eq!(json["metadata"]["type"], "inheritance");
    assert_eq!(json["metadata"]["access"], "public");

    let entity = serde_json::to_value(s.graph.entity(s.rectangle).unwrap()).unwrap();
    assert_eq!(entity["kind"], "class");
    assert_eq!(entity["qualified_name"], serde_json::json!(["shapes", "Rectangle"]));
}

#[test]
fn test_type_helpers_and_external_root_exported() {
    assert_eq!(normalize_type("const Point &"), "const Point&");
    assert!(is_well_formed_type("std::vector<int>"));
    assert!(!is_well_formed_type("vector<int"));
    assert_eq!(indirection_target("const Shape *"), Some("Shape".to_string()));

    let mut graph = CodeGraph::new();
    let placeholder = graph.external_placeholder("boost::noncopyable").unwrap();
    let name = &graph.entity(placeholder).unwrap().qualified_name;
    assert_eq!(name.segments()[0], EXTERNAL_ROOT);
    assert_eq!(graph.parent_of(placeholder), Some(graph.external_root()));
}
