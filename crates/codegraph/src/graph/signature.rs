//! Callable signatures and type-text normalization.

use serde::{Deserialize, Serialize};

/// Reference qualifier on a member function (`&` or `&&`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefQualifier {
    /// `void f() &`
    LValue,
    /// `void f() &&`
    RValue,
}

/// Signature of a function or method.
///
/// Only the parameter list and the cv/ref qualifiers take part in identity
/// (see [`Signature::identity`]). The remaining flags describe the declaration
/// and are unioned when repeated declarations merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    /// Normalized parameter types, in order
    pub parameters: Vec<String>,
    /// Normalized return type (`None` for constructors/destructors or when unknown)
    pub return_type: Option<String>,
    /// Trailing `const`
    pub is_const: bool,
    /// Trailing `volatile`
    pub is_volatile: bool,
    /// Trailing `&`/`&&`
    pub ref_qualifier: Option<RefQualifier>,
    /// C-style `...` parameter
    pub is_variadic: bool,
    /// Declared `virtual`
    pub is_virtual: bool,
    /// Declared `override`
    pub is_override: bool,
    /// Declared `final`
    pub is_final: bool,
    /// Declared `= 0`
    pub is_pure: bool,
    /// Declared `static`
    pub is_static: bool,
}

impl Signature {
    /// Create a signature from parameter types (normalized on the way in).
    pub fn new<I, S>(parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            parameters: parameters
                .into_iter()
                .map(|p| normalize_type(p.as_ref()))
                .collect(),
            ..Default::default()
        }
    }

    /// Set the return type (normalized).
    pub fn with_return_type(mut self, ret: impl AsRef<str>) -> Self {
        self.return_type = Some(normalize_type(ret.as_ref()));
        self
    }

    /// Mark `const`.
    pub fn const_fn(mut self) -> Self {
        self.is_const = true;
        self
    }

    /// Mark `virtual`.
    pub fn virtual_fn(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    /// Mark `override`.
    pub fn override_fn(mut self) -> Self {
        self.is_override = true;
        self
    }

    /// Mark `final`.
    pub fn final_fn(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Mark pure virtual (`= 0`); implies `virtual`.
    pub fn pure(mut self) -> Self {
        self.is_pure = true;
        self.is_virtual = true;
        self
    }

    /// Mark `static`.
    pub fn static_fn(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Mark C-style variadic.
    pub fn variadic(mut self) -> Self {
        self.is_variadic = true;
        self
    }

    /// Set the `&`/`&&` qualifier.
    pub fn with_ref_qualifier(mut self, qualifier: RefQualifier) -> Self {
        self.ref_qualifier = Some(qualifier);
        self
    }

    /// Identity string: parameter list plus cv/ref qualifiers, e.g. `(int,double)const`.
    pub fn identity(&self) -> String {
        let mut id = String::from("(");
        id.push_str(&self.parameters.join(","));
        if self.is_variadic {
            if !self.parameters.is_empty() {
                id.push(',');
            }
            id.push_str("...");
        }
        id.push(')');
        if self.is_const {
            id.push_str("const");
        }
        if self.is_volatile {
            id.push_str(" volatile");
        }
        match self.ref_qualifier {
            Some(RefQualifier::LValue) => id.push('&'),
            Some(RefQualifier::RValue) => id.push_str("&&"),
            None => {}
        }
        id
    }

    /// Same parameter list (including variadic-ness).
    pub fn same_parameters(&self, other: &Signature) -> bool {
        self.parameters == other.parameters && self.is_variadic == other.is_variadic
    }

    /// Same const/volatile/ref qualifiers.
    pub fn qualifiers_match(&self, other: &Signature) -> bool {
        self.is_const == other.is_const
            && self.is_volatile == other.is_volatile
            && self.ref_qualifier == other.ref_qualifier
    }

    /// Whether two declarations of the same identity can be the same entity.
    ///
    /// Return types must agree when both are known. An out-of-line definition
    /// may spell the return type qualified (`Circle::Kind` vs `Kind`), so equal
    /// innermost names are accepted.
    pub fn compatible_with(&self, other: &Signature) -> bool {
        match (&self.return_type, &other.return_type) {
            (Some(a), Some(b)) => a == b || innermost_name(a) == innermost_name(b),
            _ => true,
        }
    }

    /// Fold a repeated declaration's descriptive flags into this one.
    pub fn absorb(&mut self, other: &Signature) {
        if self.return_type.is_none() {
            self.return_type = other.return_type.clone();
        }
        self.is_virtual |= other.is_virtual;
        self.is_override |= other.is_override;
        self.is_final |= other.is_final;
        self.is_pure |= other.is_pure;
        self.is_static |= other.is_static;
    }
}

/// Canonical spelling of a type: whitespace collapsed, and only kept between
/// two word characters (`const std::string &` → `const std::string&`,
/// `vector< int >` → `vector<int>`).
pub fn normalize_type(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for ch in raw.chars() {
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            if is_word_char(ch) && out.chars().last().is_some_and(is_word_char) {
                out.push(' ');
            }
            pending_space = false;
        }
        out.push(ch);
    }
    out
}

/// For a pointer or reference type, the pointed-to type without cv qualifiers.
///
/// `const Shape*` → `Shape`, `Circle&` → `Circle`, `int` → `None`.
pub fn indirection_target(ty: &str) -> Option<String> {
    let ty = normalize_type(ty);
    let unqualified = ty.trim_end_matches(" const");
    let core = unqualified.trim_end_matches(&['*', '&'][..]);
    if core.len() == unqualified.len() {
        return None;
    }
    let core = core
        .trim_start_matches("const ")
        .trim_start_matches("volatile ")
        .trim();
    if core.is_empty() {
        None
    } else {
        Some(core.to_string())
    }
}

/// Whether a type spelling is structurally well formed: non-empty with balanced
/// angle brackets, parentheses and square brackets.
pub fn is_well_formed_type(ty: &str) -> bool {
    let ty = ty.trim();
    if ty.is_empty() {
        return false;
    }
    let mut stack = Vec::new();
    for ch in ty.chars() {
        match ch {
            '<' | '(' | '[' => stack.push(ch),
            '>' => {
                if stack.pop() != Some('<') {
                    return false;
                }
            }
            ')' => {
                if stack.pop() != Some('(') {
                    return false;
                }
            }
            ']' => {
                if stack.pop() != Some('[') {
                    return false;
                }
            }
            ';' | '{' | '}' => return false,
            _ => {}
        }
    }
    stack.is_empty()
}

fn innermost_name(ty: &str) -> &str {
    ty.rsplit("::").next().unwrap_or(ty)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_type() {
        assert_eq!(normalize_type("const std::string &"), "const std::string&");
        assert_eq!(normalize_type("std::vector< int >"), "std::vector<int>");
        assert_eq!(normalize_type("unsigned   long"), "unsigned long");
        assert_eq!(normalize_type("  T * "), "T*");
    }

    #[test]
    fn test_identity_ignores_virtual_flags() {
        let decl = Signature::new(Vec::<String>::new())
            .with_return_type("double")
            .const_fn()
            .pure();
        let def = Signature::new(Vec::<String>::new())
            .with_return_type("double")
            .const_fn();
        assert_eq!(decl.identity(), "()const");
        assert_eq!(decl.identity(), def.identity());
    }

    #[test]
    fn test_identity_includes_parameters() {
        let sig = Signature::new(["Point", "double"]).variadic();
        assert_eq!(sig.identity(), "(Point,double,...)");
    }

    #[test]
    fn test_compatible_with_qualified_return() {
        let a = Signature::new(["int"]).with_return_type("Circle::Kind");
        let b = Signature::new(["int"]).with_return_type("Kind");
        let c = Signature::new(["int"]).with_return_type("double");
        assert!(a.compatible_with(&b));
        assert!(!b.compatible_with(&c));
    }

    #[test]
    fn test_indirection_target() {
        assert_eq!(indirection_target("const Shape *"), Some("Shape".to_string()));
        assert_eq!(indirection_target("Circle&"), Some("Circle".to_string()));
        assert_eq!(indirection_target("int"), None);
    }

    #[test]
    fn test_well_formed_type() {
        assert!(is_well_formed_type("std::map<int, std::vector<T>>"));
        assert!(!is_well_formed_type("std::vector<int"));
        assert!(!is_well_formed_type("   "));
        assert!(!is_well_formed_type("int)"));
    }
}
