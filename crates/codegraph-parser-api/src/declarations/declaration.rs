use super::signature::SignatureTokens;
use super::uses::{BaseSpecifier, NameUse};
use codegraph::{Access, SourceLocation};
use serde::{Deserialize, Serialize};

/// What a declaration declares, as seen by the front end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeclKind {
    /// `namespace N { ... }`
    Namespace,
    /// `class C ...` (a class template when `template_params` is non-empty)
    Class,
    /// `struct S ...`
    Struct,
    /// Unscoped `enum E`
    Enum,
    /// `enum class E` / `enum struct E`
    EnumClass,
    /// Member of an enum body
    Enumerator,
    /// Free function, or an out-of-line member definition (see `qualifier`)
    Function,
    /// Member function declared or defined inside a class body
    Method,
    /// Data member
    Field,
    /// Namespace-scope or local variable
    Variable,
    /// `using namespace N;` (`name` holds `N`)
    UsingDirective,
    /// `using N::name;` (`name` holds `N::name`)
    UsingDeclaration,
    /// Something the front end recognized as a declaration but could not decode
    Unknown,
}

impl DeclKind {
    /// Kinds that open a scope for their children.
    pub fn opens_scope(&self) -> bool {
        matches!(
            self,
            DeclKind::Namespace
                | DeclKind::Class
                | DeclKind::Struct
                | DeclKind::Enum
                | DeclKind::EnumClass
                | DeclKind::Function
                | DeclKind::Method
        )
    }

    /// `using` directives and declarations.
    pub fn is_using(&self) -> bool {
        matches!(self, DeclKind::UsingDirective | DeclKind::UsingDeclaration)
    }
}

/// One declaration in the stream handed to the engine.
///
/// The front end reports what was written; the engine decides identity,
/// scope and relationships.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    /// What was declared
    pub kind: DeclKind,

    /// Simple name as written (`area`, `~Shape`, `Red`)
    pub name: String,

    /// Explicit qualifier of an out-of-line definition (`["Circle"]` for
    /// `double Circle::area() const`)
    pub qualifier: Vec<String>,

    /// Enclosing scopes as the front end saw them (informational)
    pub scope_path: Vec<String>,

    /// Callable signature tokens
    pub signature: Option<SignatureTokens>,

    /// Base specifiers, in order
    pub bases: Vec<BaseSpecifier>,

    /// Template parameter names
    pub template_params: Vec<String>,

    /// Member access, when declared in a class body
    pub access: Option<Access>,

    /// Where the declaration starts
    pub location: SourceLocation,

    /// Documentation comment
    pub doc_comment: Option<String>,

    /// Declared type of a field or variable
    pub type_text: Option<String>,

    /// Names used in the body or initializer
    pub uses: Vec<NameUse>,

    /// Nested declarations (members, enumerators, namespace contents)
    pub children: Vec<Declaration>,

    /// Has a body (or is a class/enum definition rather than a forward declaration)
    pub is_definition: bool,

    /// Original source text, kept for declarations the engine may not understand
    pub raw_text: Option<String>,
}

impl Declaration {
    /// Create a declaration with nothing but a kind, a name and a location.
    pub fn new(kind: DeclKind, name: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind,
            name: name.into(),
            qualifier: Vec::new(),
            scope_path: Vec::new(),
            signature: None,
            bases: Vec::new(),
            template_params: Vec::new(),
            access: None,
            location,
            doc_comment: None,
            type_text: None,
            uses: Vec::new(),
            children: Vec::new(),
            is_definition: false,
            raw_text: None,
        }
    }

    pub fn with_qualifier<I, S>(mut self, qualifier: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.qualifier = qualifier.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_signature(mut self, signature: SignatureTokens) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn with_base(mut self, base: BaseSpecifier) -> Self {
        self.bases.push(base);
        self
    }

    pub fn with_template_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.template_params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = Some(access);
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc_comment = Some(doc.into());
        self
    }

    pub fn with_type(mut self, type_text: impl Into<String>) -> Self {
        self.type_text = Some(type_text.into());
        self
    }

    pub fn with_use(mut self, name_use: NameUse) -> Self {
        self.uses.push(name_use);
        self
    }

    pub fn with_child(mut self, child: Declaration) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Declaration>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_raw_text(mut self, raw: impl Into<String>) -> Self {
        self.raw_text = Some(raw.into());
        self
    }

    pub fn definition(mut self) -> Self {
        self.is_definition = true;
        self
    }

    /// Is this a template (class or function)?
    pub fn is_template(&self) -> bool {
        !self.template_params.is_empty()
    }

    /// Number of declarations in this subtree, including itself.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Declaration::subtree_len).sum::<usize>()
    }
}
