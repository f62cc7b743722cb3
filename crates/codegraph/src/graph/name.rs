//! Qualified names: ordered scope segments plus a simple name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator used in canonical keys. Never appears in a C++ identifier or type.
pub const KEY_SEPARATOR: char = '\u{1f}';

/// Separator used for display and for [`QualifiedName::parse`].
pub const DISPLAY_SEPARATOR: &str = "::";

/// A fully qualified name, outermost segment first.
///
/// The empty name denotes the global namespace. Segments may themselves
/// contain `::` (e.g. the instantiation site `Container<std::string>`), which is
/// why the canonical key form joins on [`KEY_SEPARATOR`] instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualifiedName {
    segments: Vec<String>,
}

impl QualifiedName {
    /// The global namespace.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build from segments, outermost first.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a `::`-separated display name.
    ///
    /// Separators nested inside `<...>` or `(...)` belong to the segment, so
    /// `ns::Box<std::string>` parses as `["ns", "Box<std::string>"]`. A leading
    /// `::` is ignored.
    pub fn parse(display: &str) -> Self {
        let display = display.trim();
        let display = display.strip_prefix(DISPLAY_SEPARATOR).unwrap_or(display);
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut depth = 0usize;
        let mut chars = display.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '<' | '(' => depth += 1,
                '>' | ')' => depth = depth.saturating_sub(1),
                ':' if depth == 0 && chars.peek() == Some(&':') => {
                    chars.next();
                    segments.push(std::mem::take(&mut current));
                    continue;
                }
                _ => {}
            }
            current.push(ch);
        }
        if !current.is_empty() || !segments.is_empty() {
            segments.push(current);
        }

        Self { segments }
    }

    /// Rebuild a name from its canonical key form.
    pub fn from_key(key: &str) -> Self {
        if key.is_empty() {
            return Self::root();
        }
        Self::new(key.split(KEY_SEPARATOR))
    }

    /// Canonical, unambiguous form used inside structural keys.
    pub fn to_key(&self) -> String {
        let mut key = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                key.push(KEY_SEPARATOR);
            }
            key.push_str(segment);
        }
        key
    }

    /// Name of a direct member of this scope.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        Self { segments }
    }

    /// Enclosing scope, or `None` for the global namespace.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Same scope, different simple name.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        match self.parent() {
            Some(parent) => parent.child(name),
            None => Self::new([name.into()]),
        }
    }

    /// Simple (innermost) name; empty for the global namespace.
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// All segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Scope segments without the simple name.
    pub fn scope(&self) -> &[String] {
        match self.segments.split_last() {
            Some((_, scope)) => scope,
            None => &[],
        }
    }

    /// Whether this is the global namespace.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether there are no segments (global namespace).
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether `prefix` is an enclosing scope of (or equal to) this name.
    pub fn starts_with(&self, prefix: &QualifiedName) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(DISPLAY_SEPARATOR)?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl From<&str> for QualifiedName {
    fn from(display: &str) -> Self {
        Self::parse(display)
    }
}
