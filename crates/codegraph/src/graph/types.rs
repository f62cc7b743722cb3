//! Core graph types: entity and edge records, IDs, and enums.

use super::name::QualifiedName;
use super::signature::Signature;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Stable, content-addressed identifier of an entity.
///
/// Derived from the entity's structural key (see [`super::StructuralKey`]), so
/// ingesting the same source twice yields the same ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Wrap a raw UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Unique identifier for an edge (monotonic counter, first-seen order).
pub type EdgeId = u64;

/// Kind of a declared entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    /// `namespace N { }` (and the implicit global namespace)
    Namespace,
    /// `class C`
    Class,
    /// `struct S`
    Struct,
    /// Unscoped `enum E`
    Enum,
    /// Scoped `enum class E`
    EnumClass,
    /// Member of an enum
    Enumerator,
    /// Free function
    Function,
    /// Member function
    Method,
    /// Data member
    Field,
    /// Class template; function templates keep their function or method kind
    Template,
    /// Synthesized entity for a use of a template with arguments
    TemplateInstantiationSite,
    /// Namespace-scope or local variable
    Variable,
    /// Declaration that could not be understood; raw text retained
    Unknown,
    /// Placeholder for a name that never resolved
    External,
}

impl EntityKind {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Namespace => "namespace",
            EntityKind::Class => "class",
            EntityKind::Struct => "struct",
            EntityKind::Enum => "enum",
            EntityKind::EnumClass => "enum-class",
            EntityKind::Enumerator => "enumerator",
            EntityKind::Function => "function",
            EntityKind::Method => "method",
            EntityKind::Field => "field",
            EntityKind::Template => "template",
            EntityKind::TemplateInstantiationSite => "template-instantiation-site",
            EntityKind::Variable => "variable",
            EntityKind::Unknown => "unknown",
            EntityKind::External => "external",
        }
    }

    /// Class, struct, or (class) template: things that can have bases and be abstract.
    pub fn is_record(&self) -> bool {
        matches!(
            self,
            EntityKind::Class | EntityKind::Struct | EntityKind::Template
        )
    }

    /// Functions and methods.
    pub fn is_callable(&self) -> bool {
        matches!(self, EntityKind::Function | EntityKind::Method)
    }

    /// Either flavour of enum.
    pub fn is_enum(&self) -> bool {
        matches!(self, EntityKind::Enum | EntityKind::EnumClass)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of relationship between entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    /// Enclosing entity contains a direct member
    Contains,
    /// Derived class inherits from a base
    Inherits,
    /// Method overrides a virtual method of a base
    Overrides,
    /// Instantiation site instantiates a template
    Instantiates,
    /// Entity uses another entity (call, type use, name use)
    References,
}

impl EdgeKind {
    /// All kinds, in declaration order.
    pub const ALL: [EdgeKind; 5] = [
        EdgeKind::Contains,
        EdgeKind::Inherits,
        EdgeKind::Overrides,
        EdgeKind::Instantiates,
        EdgeKind::References,
    ];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Contains => "contains",
            EdgeKind::Inherits => "inherits",
            EdgeKind::Overrides => "overrides",
            EdgeKind::Instantiates => "instantiates",
            EdgeKind::References => "references",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction for neighbor queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Follow outgoing edges (from this entity)
    Outgoing,
    /// Follow incoming edges (to this entity)
    Incoming,
    /// Follow edges in both directions
    Both,
}

/// C++ member access. Recorded only; never affects resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    /// `public`
    Public,
    /// `protected`
    Protected,
    /// `private`
    Private,
}

impl Access {
    /// Parse an access keyword.
    pub fn parse(keyword: &str) -> Option<Self> {
        match keyword.trim() {
            "public" => Some(Access::Public),
            "protected" => Some(Access::Protected),
            "private" => Some(Access::Private),
            _ => None,
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Access::Public => "public",
            Access::Protected => "protected",
            Access::Private => "private",
        };
        f.write_str(s)
    }
}

/// Where a declaration was written. Bookkeeping only, never part of identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Source file
    pub file: PathBuf,
    /// 1-based line
    pub line: u32,
    /// 1-based column
    pub column: u32,
}

impl SourceLocation {
    /// Create a location.
    pub fn new(file: impl Into<PathBuf>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// Kind-specific edge payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EdgeMetadata {
    /// No payload (contains, overrides, references)
    #[default]
    None,
    /// Base specifier details
    Inheritance {
        /// Access of the base (`public Shape`)
        access: Access,
        /// `virtual` base
        is_virtual: bool,
        /// Position in the base-specifier list
        order: usize,
    },
    /// Template arguments of an instantiation, as written (normalized)
    Instantiation {
        /// Opaque argument strings
        arguments: Vec<String>,
    },
}

/// An entity in the code graph.
///
/// Entities are value records: the store assigns nothing after insertion except
/// merged declarations and the abstractness flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Content-addressed identifier
    pub id: EntityId,
    /// What was declared
    pub kind: EntityKind,
    /// Fully qualified name
    pub qualified_name: QualifiedName,
    /// Callable signature (functions, methods, function templates)
    pub signature: Option<Signature>,
    /// Every place this entity was declared, first-seen order, no duplicates
    pub declarations: Vec<SourceLocation>,
    /// Class with an unoverridden pure virtual method
    pub is_abstract: bool,
    /// Member access, when declared inside a class
    pub access: Option<Access>,
    /// Template parameter names (templates only)
    pub template_params: Vec<String>,
    /// Original text of an `unknown` declaration
    pub raw_text: Option<String>,
    /// Documentation comment supplied by the front end
    pub doc_comment: Option<String>,
}

impl Entity {
    /// Create an entity; its id is derived from kind and name.
    pub fn new(kind: EntityKind, qualified_name: QualifiedName) -> Self {
        let mut entity = Self {
            id: EntityId(Uuid::nil()),
            kind,
            qualified_name,
            signature: None,
            declarations: Vec::new(),
            is_abstract: false,
            access: None,
            template_params: Vec::new(),
            raw_text: None,
            doc_comment: None,
        };
        entity.refresh_id();
        entity
    }

    /// Attach a signature (changes the id).
    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self.refresh_id();
        self
    }

    /// Attach raw text (changes the id of `unknown` entities).
    pub fn with_raw_text(mut self, raw: impl Into<String>) -> Self {
        self.raw_text = Some(raw.into());
        self.refresh_id();
        self
    }

    /// Record a declaration site.
    pub fn with_declaration(mut self, location: SourceLocation) -> Self {
        self.add_declaration(location);
        self
    }

    /// Set member access.
    pub fn with_access(mut self, access: Access) -> Self {
        self.access = Some(access);
        self
    }

    /// Set template parameter names.
    pub fn with_template_params(mut self, params: Vec<String>) -> Self {
        self.template_params = params;
        self
    }

    /// Set the documentation comment.
    pub fn with_doc_comment(mut self, doc: impl Into<String>) -> Self {
        self.doc_comment = Some(doc.into());
        self
    }

    /// Simple name.
    pub fn name(&self) -> &str {
        self.qualified_name.name()
    }

    /// Append a declaration site unless already recorded. Returns whether it was new.
    pub fn add_declaration(&mut self, location: SourceLocation) -> bool {
        if self.declarations.contains(&location) {
            return false;
        }
        self.declarations.push(location);
        true
    }

    /// Structural key of this entity.
    pub fn key(&self) -> super::StructuralKey {
        super::StructuralKey::of(self)
    }

    /// Rename (used for contention suffixes); recomputes the id.
    pub(crate) fn rename(&mut self, qualified_name: QualifiedName) {
        self.qualified_name = qualified_name;
        self.refresh_id();
    }

    /// Fold a repeated declaration of the same entity into this record.
    pub(crate) fn absorb(&mut self, other: &Entity) {
        for location in &other.declarations {
            self.add_declaration(location.clone());
        }
        if let (Some(mine), Some(theirs)) = (self.signature.as_mut(), other.signature.as_ref()) {
            mine.absorb(theirs);
        }
        if self.access.is_none() {
            self.access = other.access;
        }
        if self.template_params.is_empty() {
            self.template_params = other.template_params.clone();
        }
        if self.doc_comment.is_none() {
            self.doc_comment = other.doc_comment.clone();
        }
        self.is_abstract |= other.is_abstract;
    }

    fn refresh_id(&mut self) {
        self.id = self.key().entity_id();
    }
}

/// A directed, typed edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Monotonic id, first-seen order
    pub id: EdgeId,
    /// Source entity
    pub source: EntityId,
    /// Target entity
    pub target: EntityId,
    /// Relationship kind
    pub kind: EdgeKind,
    /// Kind-specific payload
    pub metadata: EdgeMetadata,
}
