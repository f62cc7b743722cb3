//! Entity interning: turning a declaration into a stable, deduplicated entity.
//!
//! The store derives every id from the structural key, so interning is a
//! conversion (declaration → [`Entity`]) followed by [`CodeGraph::put_entity`].
//! This module owns the conversion and the validation that sends malformed
//! declarations to the `unknown` kind.

use crate::report::{BuildIssue, GraphBuildReport};
use codegraph::{
    is_well_formed_type, normalize_type, CodeGraph, Entity, EntityId, EntityKind, GraphError,
    PutEntity, QualifiedName, RefQualifier, Signature,
};
use codegraph_parser_api::{DeclKind, Declaration, SignatureTokens};
use log::{debug, warn};

/// A declaration converted to an entity, ready for the store.
#[derive(Debug, Clone)]
pub struct Prepared {
    /// The entity to put
    pub entity: Entity,
    /// Why the declaration was demoted to `unknown`, if it was
    pub malformed: Option<String>,
}

/// Entity kind for a declaration.
///
/// `member` says whether the declaration's owner is a class, which turns a
/// `Function` into a `Method` (out-of-line member definitions arrive as
/// functions with a qualifier).
pub fn entity_kind(decl: &Declaration, member: bool) -> Option<EntityKind> {
    let kind = match decl.kind {
        DeclKind::Namespace => EntityKind::Namespace,
        DeclKind::Class | DeclKind::Struct if decl.is_template() => EntityKind::Template,
        DeclKind::Class => EntityKind::Class,
        DeclKind::Struct => EntityKind::Struct,
        DeclKind::Enum => EntityKind::Enum,
        DeclKind::EnumClass => EntityKind::EnumClass,
        DeclKind::Enumerator => EntityKind::Enumerator,
        DeclKind::Method => EntityKind::Method,
        DeclKind::Function if member => EntityKind::Method,
        DeclKind::Function => EntityKind::Function,
        DeclKind::Field => EntityKind::Field,
        // `int Widget::count = 0;` defines a static data member
        DeclKind::Variable if member => EntityKind::Field,
        DeclKind::Variable => EntityKind::Variable,
        DeclKind::Unknown => EntityKind::Unknown,
        DeclKind::UsingDirective | DeclKind::UsingDeclaration => return None,
    };
    Some(kind)
}

/// Convert a declaration into the entity it denotes, named `name`.
///
/// Returns `None` for declarations that never become entities (`using`).
pub fn prepare(decl: &Declaration, name: QualifiedName, member: bool) -> Option<Prepared> {
    let kind = entity_kind(decl, member)?;

    if let Some(reason) = validate(decl, kind) {
        let raw = decl
            .raw_text
            .clone()
            .or_else(|| decl.signature.as_ref().map(|s| s.raw.clone()))
            .filter(|raw| !raw.is_empty())
            .unwrap_or_else(|| decl.name.clone());
        let entity = Entity::new(EntityKind::Unknown, name)
            .with_raw_text(raw)
            .with_declaration(decl.location.clone());
        return Some(Prepared {
            entity,
            malformed: Some(reason),
        });
    }

    let mut entity = Entity::new(kind, name).with_declaration(decl.location.clone());
    if kind.is_callable() {
        let tokens = decl.signature.clone().unwrap_or_default();
        entity = entity.with_signature(signature_from_tokens(&tokens));
    }
    if let Some(access) = decl.access {
        entity = entity.with_access(access);
    }
    if decl.is_template() {
        entity = entity.with_template_params(decl.template_params.clone());
    }
    if let Some(doc) = &decl.doc_comment {
        entity = entity.with_doc_comment(doc.clone());
    }

    Some(Prepared {
        entity,
        malformed: None,
    })
}

/// Put a prepared entity into the store, recording merges and contention.
///
/// # Errors
///
/// Only fatal store errors (capacity, identity exhaustion) are returned.
pub fn intern(
    graph: &mut CodeGraph,
    prepared: Prepared,
    report: &mut GraphBuildReport,
) -> Result<EntityId, GraphError> {
    let Prepared { entity, malformed } = prepared;
    let location = entity.declarations.first().cloned();
    let name = entity.qualified_name.to_string();

    let id = match graph.put_entity(entity)? {
        PutEntity::Created(id) => id,
        PutEntity::Merged(id) => {
            report.merges += 1;
            id
        }
        PutEntity::Contended { id, .. } => {
            let renamed = graph.entity(id)?.qualified_name.to_string();
            warn!("Store contention on {name}: kept as {renamed}");
            report.push(BuildIssue::StoreContention {
                name: name.clone(),
                renamed,
            });
            id
        }
    };

    // a contended declaration may also be malformed
    if let (Some(reason), Some(location)) = (malformed, location) {
        warn!("Malformed declaration {name} at {location}: {reason}");
        report.push(BuildIssue::MalformedDeclaration {
            name,
            location,
            reason,
        });
    }
    Ok(id)
}

/// Normalize front-end signature tokens.
pub fn signature_from_tokens(tokens: &SignatureTokens) -> Signature {
    let mut parameters: Vec<&str> = tokens.parameters.iter().map(String::as_str).collect();
    let variadic = parameters.last() == Some(&"...");
    if variadic {
        parameters.pop();
    }
    // `f(void)` declares no parameters.
    if parameters.len() == 1 && normalize_type(parameters[0]) == "void" {
        parameters.clear();
    }

    let mut signature = Signature::new(parameters);
    if let Some(ret) = &tokens.return_type {
        signature = signature.with_return_type(ret);
    }
    if variadic {
        signature = signature.variadic();
    }
    for qualifier in &tokens.qualifiers {
        signature = match qualifier.as_str() {
            "const" => signature.const_fn(),
            "volatile" => {
                signature.is_volatile = true;
                signature
            }
            "&" => signature.with_ref_qualifier(RefQualifier::LValue),
            "&&" => signature.with_ref_qualifier(RefQualifier::RValue),
            "virtual" => signature.virtual_fn(),
            "override" => signature.override_fn(),
            "final" => signature.final_fn(),
            "pure" => signature.pure(),
            "static" => signature.static_fn(),
            other => {
                debug!("Ignoring unknown qualifier '{other}'");
                signature
            }
        };
    }
    signature
}

/// Whether a simple name is something C++ could have declared.
///
/// Accepts identifiers, destructor names (`~Shape`), operator names and
/// explicit specializations (`Box<int>`).
pub fn is_valid_name(name: &str) -> bool {
    if name.starts_with("operator") {
        return name.len() > "operator".len();
    }
    let name = match name.find('<') {
        Some(open) if name.ends_with('>') && is_well_formed_type(name) => &name[..open],
        _ => name,
    };
    let ident = name.strip_prefix('~').unwrap_or(name);
    let mut chars = ident.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}

fn validate(decl: &Declaration, kind: EntityKind) -> Option<String> {
    if kind == EntityKind::Unknown {
        return Some("front end could not decode the declaration".to_string());
    }
    if !is_valid_name(&decl.name) {
        return Some(format!("illegal identifier '{}'", decl.name));
    }
    if let Some(tokens) = &decl.signature {
        if let Some(bad) = tokens
            .parameters
            .iter()
            .find(|p| p.as_str() != "..." && !is_well_formed_type(p))
        {
            return Some(format!("malformed parameter type '{bad}'"));
        }
        if let Some(ret) = tokens.return_type.as_deref() {
            if !is_well_formed_type(ret) {
                return Some(format!("malformed return type '{ret}'"));
            }
        }
    } else if kind.is_callable() && decl.raw_text.is_some() {
        return Some("callable without a parameter list".to_string());
    }
    if let Some(ty) = decl.type_text.as_deref() {
        if !is_well_formed_type(ty) {
            return Some(format!("malformed type '{ty}'"));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph::SourceLocation;

    fn at(line: u32) -> SourceLocation {
        SourceLocation::new("classes.hpp", line, 5)
    }

    fn area_decl(line: u32, extra: &[&str]) -> Declaration {
        let mut tokens = SignatureTokens::new(Vec::<String>::new())
            .returns("double")
            .qualified("const");
        for q in extra {
            tokens = tokens.qualified(*q);
        }
        Declaration::new(DeclKind::Method, "area", at(line)).with_signature(tokens)
    }

    #[test]
    fn test_kinds() {
        let class = Declaration::new(DeclKind::Class, "Container", at(1));
        assert_eq!(entity_kind(&class, false), Some(EntityKind::Class));
        let template = class.clone().with_template_params(["T"]);
        assert_eq!(entity_kind(&template, false), Some(EntityKind::Template));

        let out_of_line = Declaration::new(DeclKind::Function, "area", at(3));
        assert_eq!(entity_kind(&out_of_line, true), Some(EntityKind::Method));
        assert_eq!(entity_kind(&out_of_line, false), Some(EntityKind::Function));

        // function templates keep their callable kind
        let generic = Declaration::new(DeclKind::Function, "max", at(5)).with_template_params(["T"]);
        assert_eq!(entity_kind(&generic, false), Some(EntityKind::Function));
        let generic_method = Declaration::new(DeclKind::Method, "get", at(6)).with_template_params(["U"]);
        assert_eq!(entity_kind(&generic_method, true), Some(EntityKind::Method));

        let using = Declaration::new(DeclKind::UsingDirective, "std", at(4));
        assert_eq!(entity_kind(&using, false), None);
    }

    #[test]
    fn test_signature_from_tokens() {
        let tokens = SignatureTokens::new(["const Point &", "..."])
            .returns("double")
            .qualified("virtual")
            .qualified("const")
            .qualified("&&")
            .qualified("pure");
        let sig = signature_from_tokens(&tokens);
        assert_eq!(sig.parameters, vec!["const Point&"]);
        assert!(sig.is_variadic);
        assert!(sig.is_virtual && sig.is_pure && sig.is_const);
        assert_eq!(sig.ref_qualifier, Some(RefQualifier::RValue));
        assert_eq!(sig.identity(), "(const Point&,...)const&&");

        let void = signature_from_tokens(&SignatureTokens::new(["void"]));
        assert!(void.parameters.is_empty());
    }

    #[test]
    fn test_pure_declaration_and_definition_merge() {
        let mut graph = CodeGraph::new();
        let mut report = GraphBuildReport::default();
        let name = QualifiedName::parse("shapes::Shape::area");

        let decl = prepare(&area_decl(20, &["virtual", "pure"]), name.clone(), true).unwrap();
        let def = prepare(&area_decl(40, &[]).definition(), name, true).unwrap();
        let first = intern(&mut graph, decl, &mut report).unwrap();
        let second = intern(&mut graph, def, &mut report).unwrap();

        assert_eq!(first, second);
        assert_eq!(report.merges, 1);
        let entity = graph.entity(first).unwrap();
        assert_eq!(entity.declarations.len(), 2);
        assert!(entity.signature.as_ref().unwrap().is_pure);
    }

    #[test]
    fn test_malformed_becomes_unknown() {
        let mut graph = CodeGraph::new();
        let mut report = GraphBuildReport::default();
        let decl = Declaration::new(DeclKind::Function, "f", at(9))
            .with_signature(SignatureTokens::new(["vector<int"]).with_raw("void f(vector<int x)"));

        let prepared = prepare(&decl, QualifiedName::parse("ns::f"), false).unwrap();
        assert!(prepared.malformed.is_some());
        let id = intern(&mut graph, prepared, &mut report).unwrap();

        let entity = graph.entity(id).unwrap();
        assert_eq!(entity.kind, EntityKind::Unknown);
        assert_eq!(entity.raw_text.as_deref(), Some("void f(vector<int x)"));
        assert_eq!(report.count("malformed-declaration"), 1);
    }

    #[test]
    fn test_illegal_names() {
        assert!(is_valid_name("area"));
        assert!(is_valid_name("~Shape"));
        assert!(is_valid_name("operator=="));
        assert!(is_valid_name("_impl2"));
        assert!(is_valid_name("Box<int>"));
        assert!(!is_valid_name("Box<int"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("2d"));
        assert!(!is_valid_name("a b"));
        assert!(!is_valid_name("operator"));
    }

    #[test]
    fn test_contention_is_reported() {
        let mut graph = CodeGraph::new();
        let mut report = GraphBuildReport::default();
        let name = QualifiedName::parse("ns::f");
        let int_f = Declaration::new(DeclKind::Function, "f", at(1))
            .with_signature(SignatureTokens::new(["int"]).returns("int"));
        let double_f = Declaration::new(DeclKind::Function, "f", at(2))
            .with_signature(SignatureTokens::new(["int"]).returns("double"));

        let a = intern(&mut graph, prepare(&int_f, name.clone(), false).unwrap(), &mut report).unwrap();
        let b = intern(&mut graph, prepare(&double_f, name, false).unwrap(), &mut report).unwrap();

        assert_ne!(a, b);
        assert_eq!(graph.entity(b).unwrap().qualified_name.to_string(), "ns::f#2");
        assert_eq!(report.count("store-contention"), 1);
    }

    #[test]
    fn test_malformed_contention_reports_both() {
        let mut graph = CodeGraph::new();
        let mut report = GraphBuildReport::default();
        let name = QualifiedName::parse("ns::f");
        let int_f = Declaration::new(DeclKind::Function, "f", at(1))
            .with_signature(SignatureTokens::new(["int"]).returns("int"));
        intern(&mut graph, prepare(&int_f, name.clone(), false).unwrap(), &mut report).unwrap();

        // an entity the store rejects under its own name and that also failed validation
        let entity = Entity::new(EntityKind::Function, name)
            .with_signature(Signature::new(["int"]).with_return_type("double"))
            .with_declaration(at(2));
        let prepared = Prepared {
            entity,
            malformed: Some("malformed return type".to_string()),
        };
        let id = intern(&mut graph, prepared, &mut report).unwrap();

        assert_eq!(graph.entity(id).unwrap().qualified_name.to_string(), "ns::f#2");
        assert_eq!(report.count("store-contention"), 1);
        assert_eq!(report.count("malformed-declaration"), 1);
    }
}
