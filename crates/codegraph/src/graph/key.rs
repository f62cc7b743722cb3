//! Structural keys and the content-addressed ids derived from them.

use super::name::{QualifiedName, KEY_SEPARATOR};
use super::types::{Entity, EntityId, EntityKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Namespace UUID for entity ids (v5 over canonical key bytes).
pub const ENTITY_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6b, 0x1f, 0x3c, 0x52, 0x0e, 0x9a, 0x4d, 0x27, 0x8f, 0x41, 0x2c, 0x7d, 0x95, 0x60, 0xa3, 0xe8,
]);

/// Kind component of a structural key.
///
/// Coarser than [`EntityKind`]: `class` and `struct` share [`KeyKind::Record`],
/// so `struct X;` followed by `class X { ... };` is one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyKind {
    /// Namespace
    Namespace,
    /// Class or struct
    Record,
    /// Unscoped enum
    Enum,
    /// Scoped enum
    EnumClass,
    /// Enumerator
    Enumerator,
    /// Free function
    Function,
    /// Member function
    Method,
    /// Data member
    Field,
    /// Template
    Template,
    /// Instantiation site
    InstantiationSite,
    /// Variable
    Variable,
    /// Malformed declaration
    Unknown,
    /// Placeholder
    External,
}

impl KeyKind {
    fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Namespace => "namespace",
            KeyKind::Record => "record",
            KeyKind::Enum => "enum",
            KeyKind::EnumClass => "enum-class",
            KeyKind::Enumerator => "enumerator",
            KeyKind::Function => "function",
            KeyKind::Method => "method",
            KeyKind::Field => "field",
            KeyKind::Template => "template",
            KeyKind::InstantiationSite => "instantiation-site",
            KeyKind::Variable => "variable",
            KeyKind::Unknown => "unknown",
            KeyKind::External => "external",
        }
    }
}

impl From<EntityKind> for KeyKind {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Namespace => KeyKind::Namespace,
            EntityKind::Class | EntityKind::Struct => KeyKind::Record,
            EntityKind::Enum => KeyKind::Enum,
            EntityKind::EnumClass => KeyKind::EnumClass,
            EntityKind::Enumerator => KeyKind::Enumerator,
            EntityKind::Function => KeyKind::Function,
            EntityKind::Method => KeyKind::Method,
            EntityKind::Field => KeyKind::Field,
            EntityKind::Template => KeyKind::Template,
            EntityKind::TemplateInstantiationSite => KeyKind::InstantiationSite,
            EntityKind::Variable => KeyKind::Variable,
            EntityKind::Unknown => KeyKind::Unknown,
            EntityKind::External => KeyKind::External,
        }
    }
}

/// What makes two declarations the same entity: qualified name, key kind and,
/// for callables, the signature identity (raw text for `unknown` entities).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StructuralKey {
    /// Fully qualified name
    pub name: QualifiedName,
    /// Coarse kind
    pub kind: KeyKind,
    /// Signature identity or raw text
    pub identity: Option<String>,
}

impl StructuralKey {
    /// Build a key.
    pub fn new(name: QualifiedName, kind: KeyKind, identity: Option<String>) -> Self {
        Self {
            name,
            kind,
            identity,
        }
    }

    /// Key of an existing entity record.
    pub fn of(entity: &Entity) -> Self {
        let identity = match entity.kind {
            EntityKind::Unknown => entity.raw_text.clone(),
            _ => entity.signature.as_ref().map(|s| s.identity()),
        };
        Self::new(entity.qualified_name.clone(), entity.kind.into(), identity)
    }

    /// Canonical byte form: kind, name key and identity joined by the key separator.
    pub fn canonical(&self) -> String {
        let mut out = String::from(self.kind.as_str());
        out.push(KEY_SEPARATOR);
        out.push_str(&self.name.to_key());
        if let Some(identity) = &self.identity {
            out.push(KEY_SEPARATOR);
            out.push_str(identity);
        }
        out
    }

    /// Content-addressed id for this key.
    pub fn entity_id(&self) -> EntityId {
        EntityId::from_uuid(Uuid::new_v5(&ENTITY_NAMESPACE, self.canonical().as_bytes()))
    }
}

impl fmt::Display for StructuralKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.as_str(), self.name)?;
        if let Some(identity) = &self.identity {
            write!(f, "{identity}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_and_struct_share_key() {
        let name = QualifiedName::parse("geo::Point");
        let class = StructuralKey::new(name.clone(), EntityKind::Class.into(), None);
        let strukt = StructuralKey::new(name, EntityKind::Struct.into(), None);
        assert_eq!(class, strukt);
        assert_eq!(class.entity_id(), strukt.entity_id());
    }

    #[test]
    fn test_template_and_site_differ() {
        let name = QualifiedName::parse("myproject::Container");
        let template = StructuralKey::new(name.clone(), EntityKind::Template.into(), None);
        let site = StructuralKey::new(
            name,
            EntityKind::TemplateInstantiationSite.into(),
            None,
        );
        assert_ne!(template.entity_id(), site.entity_id());
    }

    #[test]
    fn test_identity_separates_overloads() {
        let name = QualifiedName::parse("f");
        let a = StructuralKey::new(name.clone(), KeyKind::Function, Some("(int)".into()));
        let b = StructuralKey::new(name, KeyKind::Function, Some("(double)".into()));
        assert_ne!(a.entity_id(), b.entity_id());
    }

    #[test]
    fn test_display() {
        let key = StructuralKey::new(
            QualifiedName::parse("shapes::Shape::area"),
            KeyKind::Method,
            Some("()const".into()),
        );
        assert_eq!(key.to_string(), "method shapes::Shape::area()const");
    }
}
