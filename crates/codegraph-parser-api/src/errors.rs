use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during parsing
#[derive(Error, Debug)]
pub enum ParserError {
    /// Failed to read file
    #[error("IO error reading {0}: {1}")]
    IoError(PathBuf, #[source] std::io::Error),

    /// Syntax error in source code
    #[error("Syntax error in {0}:{1}:{2}: {3}")]
    SyntaxError(PathBuf, usize, usize, String),

    /// File too large
    #[error("File {0} exceeds maximum size ({1} bytes)")]
    FileTooLarge(PathBuf, usize),

    /// Generic parsing error
    #[error("Parse error in {0}: {1}")]
    ParseError(PathBuf, String),
}

/// Result type for parser operations
pub type ParserResult<T> = Result<T, ParserError>;

impl ParserError {
    /// File the error refers to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            ParserError::IoError(path, _)
            | ParserError::SyntaxError(path, ..)
            | ParserError::FileTooLarge(path, _)
            | ParserError::ParseError(path, _) => path,
        }
    }

    /// Whether the file could be retried with a more lenient configuration
    /// (syntax errors are tolerated when `tolerate_syntax_errors` is set).
    pub fn is_syntax(&self) -> bool {
        matches!(self, ParserError::SyntaxError(..))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_path_and_message() {
        let err = ParserError::SyntaxError(PathBuf::from("shapes.hpp"), 12, 4, "expected ';'".into());
        assert_eq!(err.path(), std::path::Path::new("shapes.hpp"));
        assert!(err.is_syntax());
        assert_eq!(err.to_string(), "Syntax error in shapes.hpp:12:4: expected ';'");
    }
}
