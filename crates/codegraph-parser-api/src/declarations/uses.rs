use codegraph::{Access, SourceLocation};
use serde::{Deserialize, Serialize};

/// One entry of a base-specifier list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseSpecifier {
    /// Base name as written, possibly qualified or with template arguments
    pub name: String,

    /// Explicit access (`None` means the class-key default)
    pub access: Option<Access>,

    /// `virtual` base
    pub is_virtual: bool,
}

impl BaseSpecifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            access: None,
            is_virtual: false,
        }
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = Some(access);
        self
    }

    pub fn virtual_base(mut self) -> Self {
        self.is_virtual = true;
        self
    }
}

/// How a name was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UseKind {
    /// `f(...)` or `ns::f(...)`
    Call,
    /// `obj.f(...)` / `ptr->f(...)`; `name` is the member name only
    MemberCall,
    /// Type position (declarations, `new T`, casts)
    Type,
    /// Any other identifier in an expression
    Value,
}

/// A name used inside a body, initializer or declared type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameUse {
    /// Name as written, without template arguments (`Container`, `shapes::Circle`)
    pub name: String,

    /// Use kind
    pub kind: UseKind,

    /// Template arguments when the use was `name<args>`
    pub template_args: Vec<String>,

    /// Where the use appears
    pub location: SourceLocation,
}

impl NameUse {
    pub fn new(name: impl Into<String>, kind: UseKind, location: SourceLocation) -> Self {
        Self {
            name: name.into(),
            kind,
            template_args: Vec::new(),
            location,
        }
    }

    pub fn with_template_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.template_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// `Container<int>`-style use.
    pub fn is_template_use(&self) -> bool {
        !self.template_args.is_empty()
    }
}
