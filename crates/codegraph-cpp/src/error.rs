use codegraph::GraphError;
use codegraph_parser_api::ParserError;
use thiserror::Error;

/// Result type alias for graph building
pub type Result<T> = std::result::Result<T, BuildError>;

/// Fatal errors that abort a build.
///
/// Everything recoverable (unresolved names, malformed declarations, key
/// contention) is collected as a [`crate::BuildIssue`] instead.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Store failure: capacity, identity exhaustion or a poisoned lock
    #[error("Graph store failure: {0}")]
    Graph(#[from] GraphError),

    /// Front-end failure while reading or parsing a file
    #[error("Parse failure: {0}")]
    Parser(#[from] ParserError),

    /// Worker pool could not be created
    #[error("Failed to create thread pool: {0}")]
    ThreadPool(String),

    /// Invalid build configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_wraps_graph_and_parser_errors() {
        let err: BuildError = GraphError::LockPoisoned.into();
        assert!(matches!(err, BuildError::Graph(GraphError::LockPoisoned)));

        let err: BuildError =
            ParserError::ParseError(PathBuf::from("a.cpp"), "bad".to_string()).into();
        assert!(err.to_string().contains("a.cpp"));
    }
}
