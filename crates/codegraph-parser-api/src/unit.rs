use crate::declarations::Declaration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything a front end extracted from one source file
///
/// This is the bridge between a language-specific AST and the engine that
/// builds the graph: top-level declarations in source order, each carrying
/// its nested members.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationUnit {
    /// Source file path
    pub path: PathBuf,

    /// Top-level declarations, in source order
    pub declarations: Vec<Declaration>,

    /// Number of syntax error nodes the front end recovered from
    pub syntax_errors: usize,
}

impl TranslationUnit {
    /// Create a new empty unit
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Add a top-level declaration
    pub fn add(&mut self, declaration: Declaration) {
        self.declarations.push(declaration);
    }

    /// Builder form of [`Self::add`]
    pub fn with(mut self, declaration: Declaration) -> Self {
        self.add(declaration);
        self
    }

    /// Total number of declarations, nested ones included
    pub fn declaration_count(&self) -> usize {
        self.declarations.iter().map(Declaration::subtree_len).sum()
    }

    /// Pre-order walk over every declaration
    pub fn walk(&self) -> impl Iterator<Item = &Declaration> {
        let mut stack: Vec<&Declaration> = self.declarations.iter().rev().collect();
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children.iter().rev());
            Some(next)
        })
    }

    /// Whether the file parsed cleanly
    pub fn is_clean(&self) -> bool {
        self.syntax_errors == 0
    }
}
