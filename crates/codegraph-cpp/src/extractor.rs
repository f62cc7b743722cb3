//! Turns C++ source into a translation unit

use codegraph_parser_api::{ParserConfig, ParserError, TranslationUnit};
use log::warn;
use std::path::Path;
use tree_sitter::{Node, Parser};

use crate::visitor::CppVisitor;

/// Parse `source` and collect its declarations.
///
/// Syntax errors are counted on the unit; with a strict configuration the
/// first one fails the file instead.
pub fn extract(
    source: &str,
    file_path: &Path,
    config: &ParserConfig,
) -> Result<TranslationUnit, ParserError> {
    let mut parser = Parser::new();
    let language = tree_sitter_cpp::language();
    parser
        .set_language(&language)
        .map_err(|e| ParserError::ParseError(file_path.to_path_buf(), e.to_string()))?;

    let tree = parser.parse(source, None).ok_or_else(|| {
        ParserError::ParseError(file_path.to_path_buf(), "Failed to parse".to_string())
    })?;

    let root_node = tree.root_node();

    let mut syntax_errors = 0;
    let mut first_error = None;
    if root_node.has_error() {
        count_errors(root_node, &mut syntax_errors, &mut first_error);
        let (line, column) = first_error.unwrap_or((0, 0));
        if !config.tolerate_syntax_errors {
            return Err(ParserError::SyntaxError(
                file_path.to_path_buf(),
                line,
                column,
                "Syntax error".to_string(),
            ));
        }
        warn!(
            "{} syntax errors in {} (first at {}:{}), keeping recovered declarations",
            syntax_errors,
            file_path.display(),
            line,
            column
        );
    }

    let mut visitor = CppVisitor::new(source.as_bytes(), file_path)
        .with_docs(config.include_docs)
        .with_uses(config.extract_references);
    visitor.visit_node(root_node);

    let mut unit = TranslationUnit::new(file_path);
    for declaration in visitor.declarations {
        unit.add(declaration);
    }
    unit.syntax_errors = syntax_errors;
    Ok(unit)
}

fn count_errors(node: Node, count: &mut usize, first: &mut Option<(usize, usize)>) {
    if node.is_error() || node.is_missing() {
        *count += 1;
        if first.is_none() {
            let pos = node.start_position();
            *first = Some((pos.row + 1, pos.column + 1));
        }
        if node.is_missing() {
            return;
        }
    }
    if !node.has_error() && !node.is_error() {
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        count_errors(child, count, first);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_parser_api::DeclKind;

    #[test]
    fn test_extract_simple_class() {
        let source = r#"
class HelloWorld {
public:
    void greet() {
        // Hello
    }
};
"#;
        let config = ParserConfig::default();
        let unit = extract(source, Path::new("HelloWorld.cpp"), &config).unwrap();

        assert_eq!(unit.declarations.len(), 1);
        assert_eq!(unit.declarations[0].name, "HelloWorld");
        assert_eq!(unit.declarations[0].children[0].kind, DeclKind::Method);
        assert!(unit.is_clean());
    }

    #[test]
    fn test_extract_namespace() {
        let source = r#"
namespace myns {
    class MyClass {};
}
"#;
        let unit = extract(source, Path::new("test.cpp"), &ParserConfig::default()).unwrap();

        assert_eq!(unit.declaration_count(), 2);
        assert_eq!(unit.declarations[0].children[0].name, "MyClass");
    }

    #[test]
    fn test_extract_locations_use_path() {
        let source = "\n\nvoid myFunction(int x, double y) {\n    return;\n}\n";
        let unit = extract(source, Path::new("src/test.cpp"), &ParserConfig::default()).unwrap();

        let location = &unit.declarations[0].location;
        assert_eq!(location.line, 3);
        assert_eq!(location.file, Path::new("src/test.cpp"));
    }

    #[test]
    fn test_extract_includes_are_not_declarations() {
        let source = r#"
#include <iostream>
#include "myheader.h"

int main() { return 0; }
"#;
        let unit = extract(source, Path::new("test.cpp"), &ParserConfig::default()).unwrap();
        assert_eq!(unit.declarations.len(), 1);
        assert_eq!(unit.declarations[0].name, "main");
    }

    #[test]
    fn test_extract_tolerates_syntax_errors() {
        let source = "class Good {};\nclass Broken { int x\n";
        let unit = extract(source, Path::new("broken.cpp"), &ParserConfig::default()).unwrap();

        assert!(unit.syntax_errors > 0);
        assert!(!unit.is_clean());
        assert!(unit.declarations.iter().any(|d| d.name == "Good"));
    }

    #[test]
    fn test_extract_strict_rejects_syntax_errors() {
        let source = "class Broken { int x\n";
        let config = ParserConfig::default().strict();
        let err = extract(source, Path::new("broken.cpp"), &config).unwrap_err();
        assert!(err.is_syntax());
    }

    #[test]
    fn test_extract_fast_config_skips_uses() {
        let source = "/// helper\nvoid f() { g(); }";
        let unit = extract(source, Path::new("test.cpp"), &ParserConfig::fast()).unwrap();
        assert!(unit.declarations[0].uses.is_empty());
        assert!(unit.declarations[0].doc_comment.is_none());
    }
}
