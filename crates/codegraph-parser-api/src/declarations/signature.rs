use serde::{Deserialize, Serialize};

/// Signature of a callable as written, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatureTokens {
    /// Parameter types in order (names dropped). A trailing `...` marks a
    /// C-style variadic.
    pub parameters: Vec<String>,

    /// Return type (absent for constructors and destructors)
    pub return_type: Option<String>,

    /// Specifiers and qualifiers: `virtual`, `static`, `const`, `volatile`,
    /// `&`, `&&`, `override`, `final`, `pure` (for `= 0`)
    pub qualifiers: Vec<String>,

    /// The declarator text the tokens were taken from
    pub raw: String,
}

impl SignatureTokens {
    pub fn new<I, S>(parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parameters: parameters.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn returns(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    pub fn qualified(mut self, qualifier: impl Into<String>) -> Self {
        let qualifier = qualifier.into();
        if !self.has(&qualifier) {
            self.qualifiers.push(qualifier);
        }
        self
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = raw.into();
        self
    }

    /// Whether `qualifier` was present.
    pub fn has(&self, qualifier: &str) -> bool {
        self.qualifiers.iter().any(|q| q == qualifier)
    }
}
