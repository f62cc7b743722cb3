//! Relationship rules: what edge a declaration or use implies.
//!
//! These functions only read the store (or build an entity to put). The
//! ingestion driver commits the edges and classifies store rejections.

use crate::scope::resolve_in;
use codegraph::graph::algorithms::reaches;
use codegraph::{
    indirection_target, normalize_type, Access, CodeGraph, EdgeKind, EdgeMetadata, Entity,
    EntityId, EntityKind, GraphError, QualifiedName, Signature, SourceLocation,
};
use codegraph_parser_api::BaseSpecifier;
use log::trace;

/// Metadata of the `inherits` edge for one base specifier.
///
/// `default_access` is the class-key default: private for `class`, public
/// for `struct`.
pub fn inheritance_metadata(base: &BaseSpecifier, order: usize, default_access: Access) -> EdgeMetadata {
    EdgeMetadata::Inheritance {
        access: base.access.unwrap_or(default_access),
        is_virtual: base.is_virtual,
        order,
    }
}

/// Find the method `method` overrides.
///
/// Walks the owning class's bases breadth-first, nearest first; the first
/// base member that is virtual (declared so, or itself an overrider) and
/// matches by name, parameters, qualifiers and return type wins.
pub fn find_override_target(graph: &CodeGraph, method: EntityId) -> Option<EntityId> {
    let entity = graph.entity(method).ok()?;
    let signature = entity.signature.as_ref()?;
    if signature.is_static {
        return None;
    }
    let class = graph.parent_of(method)?;
    let class_entity = graph.entity(class).ok()?;
    if !class_entity.kind.is_record() || entity.name() == class_entity.name() {
        return None;
    }

    for base in graph.ancestors(class).ok()? {
        for member in graph.children_of(base).unwrap_or_default() {
            let Ok(candidate) = graph.entity(member) else {
                continue;
            };
            if candidate.kind != EntityKind::Method || !names_match(entity.name(), candidate.name()) {
                continue;
            }
            let Some(base_sig) = candidate.signature.as_ref() else {
                continue;
            };
            if !is_virtual(graph, member, base_sig) {
                continue;
            }
            if signature.same_parameters(base_sig)
                && signature.qualifiers_match(base_sig)
                && returns_compatible(graph, (class, signature), (base, base_sig))
            {
                trace!("{} overrides {}", entity.qualified_name, candidate.qualified_name);
                return Some(member);
            }
        }
    }
    None
}

/// Destructors override destructors whatever the class names are.
fn names_match(derived: &str, base: &str) -> bool {
    derived == base || (derived.starts_with('~') && base.starts_with('~'))
}

fn is_virtual(graph: &CodeGraph, method: EntityId, signature: &Signature) -> bool {
    signature.is_virtual
        || signature.is_override
        || graph
            .edges_from(method, Some(EdgeKind::Overrides))
            .is_ok_and(|edges| !edges.is_empty())
}

/// Equal return types, or covariant: pointer/reference to a class derived
/// from the class the base returns a pointer/reference to.
fn returns_compatible(
    graph: &CodeGraph,
    (derived_class, derived): (EntityId, &Signature),
    (base_class, base): (EntityId, &Signature),
) -> bool {
    let (Some(mine), Some(theirs)) = (derived.return_type.as_deref(), base.return_type.as_deref())
    else {
        return true;
    };
    if mine == theirs {
        return true;
    }
    let (Some(my_target), Some(their_target)) = (indirection_target(mine), indirection_target(theirs))
    else {
        return false;
    };
    if mine.ends_with('*') != theirs.ends_with('*') {
        return false;
    }
    let my_class = resolve_in(graph, derived_class, &my_target).entity();
    let their_class = resolve_in(graph, base_class, &their_target).entity();
    match (my_class, their_class) {
        (Some(a), Some(b)) => a == b || graph.is_derived_from(a, b),
        _ => false,
    }
}

/// Display name of an instantiation site: `Template<args>` with normalized args.
pub fn site_name(template: &str, args: &[String]) -> String {
    let args: Vec<String> = args.iter().map(|a| normalize_type(a)).collect();
    format!("{template}<{}>", args.join(","))
}

/// The scope a use inside `user` belongs to: `user` itself when it opens a
/// scope (namespace, record, function), otherwise its containing entity.
///
/// # Errors
///
/// [`GraphError::EntityNotFound`] if `user` doesn't exist.
pub fn lexical_scope(graph: &CodeGraph, user: EntityId) -> Result<EntityId, GraphError> {
    let kind = graph.entity(user)?.kind;
    if kind == EntityKind::Namespace || kind.is_record() || kind.is_callable() {
        return Ok(user);
    }
    Ok(graph.parent_of(user).unwrap_or(user))
}

/// Instantiation site entity for a use of `template_name<args>` inside
/// `scope`, plus the metadata of its `instantiates` edge.
///
/// Every use of the same `Template<args>` in one scope names the same site.
///
/// # Errors
///
/// [`GraphError::EntityNotFound`] if `scope` doesn't exist.
pub fn instantiation_site(
    graph: &CodeGraph,
    scope: EntityId,
    template_name: &str,
    args: &[String],
    location: SourceLocation,
) -> Result<(Entity, EdgeMetadata), GraphError> {
    let scope: QualifiedName = graph.entity(scope)?.qualified_name.clone();
    let site = Entity::new(
        EntityKind::TemplateInstantiationSite,
        scope.child(site_name(template_name, args)),
    )
    .with_declaration(location);
    let metadata = EdgeMetadata::Instantiation {
        arguments: args.iter().map(|a| normalize_type(a)).collect(),
    };
    Ok((site, metadata))
}

/// Methods named `name` anywhere in the graph, in creation order.
pub fn methods_named(graph: &CodeGraph, name: &str) -> Vec<EntityId> {
    graph
        .query()
        .kind(EntityKind::Method)
        .name_matches(&format!("^{name}$"))
        .execute()
}

/// The single target a member call can bind to: the only candidate, or the
/// root of the one override family every candidate belongs to.
pub fn member_call_target(graph: &CodeGraph, candidates: &[EntityId]) -> Option<EntityId> {
    let (first, rest) = candidates.split_first()?;
    if rest.is_empty() {
        return Some(*first);
    }
    let root = graph.override_root(*first);
    rest.iter()
        .all(|c| graph.override_root(*c) == root)
        .then_some(root)
}

/// Whether a class has a pure virtual method whose final overrider along its
/// inheritance chain is still pure.
pub fn is_abstract(graph: &CodeGraph, class: EntityId) -> bool {
    if !graph.entity(class).is_ok_and(|e| e.kind.is_record()) {
        return false;
    }
    let mut chain = vec![class];
    chain.extend(graph.ancestors(class).unwrap_or_default());

    let methods: Vec<(EntityId, &Entity)> = chain
        .iter()
        .flat_map(move |owner| {
            graph
                .children_of(*owner)
                .unwrap_or_default()
                .into_iter()
                .filter_map(move |id| graph.entity(id).ok())
                .filter(|m| m.kind == EntityKind::Method)
                .map(move |m| (*owner, m))
        })
        .collect();

    methods.iter().any(|(owner, pure)| {
        is_pure(pure)
            && !methods.iter().any(|(other_owner, other)| {
                other.id != pure.id
                    && !is_pure(other)
                    && (*other_owner == class || graph.is_derived_from(*other_owner, *owner))
                    && reaches(graph, other.id, pure.id, EdgeKind::Overrides)
            })
    })
}

fn is_pure(method: &Entity) -> bool {
    method.signature.as_ref().is_some_and(|s| s.is_pure)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Shapes {
        graph: CodeGraph,
        shape: EntityId,
        circle: EntityId,
        area: EntityId,
        circle_area: EntityId,
    }

    fn put(graph: &mut CodeGraph, parent: EntityId, entity: Entity) -> EntityId {
        let id = graph.put_entity(entity).unwrap().id();
        graph
            .put_edge(parent, id, EdgeKind::Contains, EdgeMetadata::None)
            .unwrap();
        id
    }

    fn method(name: &str, sig: Signature) -> Entity {
        Entity::new(EntityKind::Method, QualifiedName::parse(name)).with_signature(sig)
    }

    fn shapes() -> Shapes {
        let mut graph = CodeGraph::new();
        let global = graph.global_namespace();
        let shape = put(&mut graph, global, Entity::new(EntityKind::Class, QualifiedName::parse("Shape")));
        let area = put(
            &mut graph,
            shape,
            method("Shape::area", Signature::new(Vec::<String>::new()).with_return_type("double").const_fn().pure()),
        );
        let circle = put(&mut graph, global, Entity::new(EntityKind::Class, QualifiedName::parse("Circle")));
        graph
            .put_edge(circle, shape, EdgeKind::Inherits, EdgeMetadata::None)
            .unwrap();
        let circle_area = put(
            &mut graph,
            circle,
            method("Circle::area", Signature::new(Vec::<String>::new()).with_return_type("double").const_fn()),
        );
        Shapes {
            graph,
            shape,
            circle,
            area,
            circle_area,
        }
    }

    #[test]
    fn test_inheritance_metadata_defaults() {
        let base = BaseSpecifier::new("Shape");
        assert_eq!(
            inheritance_metadata(&base, 0, Access::Private),
            EdgeMetadata::Inheritance {
                access: Access::Private,
                is_virtual: false,
                order: 0
            }
        );
        let base = BaseSpecifier::new("Shape").with_access(Access::Public).virtual_base();
        assert_eq!(
            inheritance_metadata(&base, 2, Access::Private),
            EdgeMetadata::Inheritance {
                access: Access::Public,
                is_virtual: true,
                order: 2
            }
        );
    }

    #[test]
    fn test_override_target_found() {
        let s = shapes();
        assert_eq!(find_override_target(&s.graph, s.circle_area), Some(s.area));
        assert_eq!(find_override_target(&s.graph, s.area), None);
    }

    #[test]
    fn test_override_requires_matching_qualifiers() {
        let mut s = shapes();
        let non_const = put(
            &mut s.graph,
            s.circle,
            method("Circle::area", Signature::new(Vec::<String>::new()).with_return_type("double")),
        );
        assert_eq!(find_override_target(&s.graph, non_const), None);
    }

    #[test]
    fn test_covariant_return() {
        let mut g = CodeGraph::new();
        let global = g.global_namespace();
        let base = put(&mut g, global, Entity::new(EntityKind::Class, QualifiedName::parse("Base")));
        let clone = put(
            &mut g,
            base,
            method("Base::clone", Signature::new(Vec::<String>::new()).with_return_type("Base*").virtual_fn()),
        );
        let derived = put(&mut g, global, Entity::new(EntityKind::Class, QualifiedName::parse("Derived")));
        g.put_edge(derived, base, EdgeKind::Inherits, EdgeMetadata::None).unwrap();
        let derived_clone = put(
            &mut g,
            derived,
            method("Derived::clone", Signature::new(Vec::<String>::new()).with_return_type("Derived*")),
        );
        assert_eq!(find_override_target(&g, derived_clone), Some(clone));

        let wrong = put(
            &mut g,
            derived,
            method("Derived::clone", Signature::new(["int"]).with_return_type("Derived&")),
        );
        assert_eq!(find_override_target(&g, wrong), None);
    }

    #[test]
    fn test_destructors_match() {
        let mut s = shapes();
        let dtor = put(
            &mut s.graph,
            s.shape,
            method("Shape::~Shape", Signature::new(Vec::<String>::new()).virtual_fn()),
        );
        let circle_dtor = put(
            &mut s.graph,
            s.circle,
            method("Circle::~Circle", Signature::new(Vec::<String>::new())),
        );
        assert_eq!(find_override_target(&s.graph, circle_dtor), Some(dtor));
    }

    #[test]
    fn test_abstractness() {
        let mut s = shapes();
        assert!(is_abstract(&s.graph, s.shape));
        // Without the override edge Circle still inherits a pure method.
        assert!(is_abstract(&s.graph, s.circle));
        s.graph
            .put_edge(s.circle_area, s.area, EdgeKind::Overrides, EdgeMetadata::None)
            .unwrap();
        assert!(!is_abstract(&s.graph, s.circle));
        assert!(is_abstract(&s.graph, s.shape));
    }

    #[test]
    fn test_member_call_target() {
        let mut s = shapes();
        s.graph
            .put_edge(s.circle_area, s.area, EdgeKind::Overrides, EdgeMetadata::None)
            .unwrap();
        let candidates = methods_named(&s.graph, "area");
        assert_eq!(candidates, vec![s.area, s.circle_area]);
        assert_eq!(member_call_target(&s.graph, &candidates), Some(s.area));
        assert_eq!(member_call_target(&s.graph, &[s.circle_area]), Some(s.circle_area));
        assert_eq!(member_call_target(&s.graph, &[]), None);
    }

    #[test]
    fn test_site_name_normalizes_args() {
        assert_eq!(site_name("Container", &["int".into()]), "Container<int>");
        assert_eq!(
            site_name("Map", &["std::string".into(), "const Point &".into()]),
            "Map<std::string,const Point&>"
        );
    }

    #[test]
    fn test_lexical_scope_of_members() {
        let mut s = shapes();
        let radius = put(
            &mut s.graph,
            s.circle,
            Entity::new(EntityKind::Field, QualifiedName::parse("Circle::radius")),
        );
        assert_eq!(lexical_scope(&s.graph, radius).unwrap(), s.circle);
        assert_eq!(lexical_scope(&s.graph, s.circle_area).unwrap(), s.circle_area);
        assert_eq!(lexical_scope(&s.graph, s.shape).unwrap(), s.shape);
    }

    #[test]
    fn test_sites_keyed_on_scope_and_arguments() {
        let s = shapes();
        let at = SourceLocation::new("shapes.hpp", 3, 1);
        let (int_site, metadata) =
            instantiation_site(&s.graph, s.circle, "Box", &["int".into()], at.clone()).unwrap();
        let (again, _) = instantiation_site(&s.graph, s.circle, "Box", &["int".into()], at.clone()).unwrap();
        let (string_site, _) =
            instantiation_site(&s.graph, s.circle, "Box", &["std::string".into()], at).unwrap();

        assert_eq!(int_site.qualified_name.to_string(), "Circle::Box<int>");
        assert_eq!(int_site.id, again.id);
        assert_ne!(int_site.id, string_site.id);
        assert_eq!(
            metadata,
            EdgeMetadata::Instantiation {
                arguments: vec!["int".to_string()]
            }
        );
    }
}
