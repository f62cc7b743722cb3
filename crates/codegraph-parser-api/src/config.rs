use serde::{Deserialize, Serialize};

/// Configuration for front-end behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Maximum file size to parse (in bytes)
    /// Files larger than this are rejected with `FileTooLarge`
    pub max_file_size: usize,

    /// Attach documentation comments to declarations
    pub include_docs: bool,

    /// Collect name uses inside bodies and declared types (references, calls,
    /// template uses)
    pub extract_references: bool,

    /// Emit whatever declarations could be recovered from a file with syntax
    /// errors instead of failing the file
    pub tolerate_syntax_errors: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024, // 10 MB
            include_docs: true,
            extract_references: true,
            tolerate_syntax_errors: true,
        }
    }
}

impl ParserConfig {
    /// Declarations only: no docs, no body references
    pub fn fast() -> Self {
        Self {
            include_docs: false,
            extract_references: false,
            ..Default::default()
        }
    }

    /// Everything the front end can extract
    pub fn comprehensive() -> Self {
        Self {
            include_docs: true,
            extract_references: true,
            tolerate_syntax_errors: true,
            ..Default::default()
        }
    }

    /// Reject files with syntax errors
    pub fn strict(mut self) -> Self {
        self.tolerate_syntax_errors = false;
        self
    }

    /// Set maximum file size
    pub fn with_max_file_size(mut self, size: usize) -> Self {
        self.max_file_size = size;
        self
    }

    /// Toggle documentation comments
    pub fn with_docs(mut self, include: bool) -> Self {
        self.include_docs = include;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let fast = ParserConfig::fast();
        assert!(!fast.include_docs);
        assert!(!fast.extract_references);
        assert!(ParserConfig::comprehensive().extract_references);
        assert!(!ParserConfig::default().strict().tolerate_syntax_errors);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ParserConfig = serde_json::from_str(r#"{"include_docs": false}"#).unwrap();
        assert!(!config.include_docs);
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
    }
}
