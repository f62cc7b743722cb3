//! Implementation of the CodeParser trait for C++

use codegraph::CodeGraph;
use codegraph_parser_api::{CodeParser, ParserConfig, ParserError, TranslationUnit};
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::config::BuildConfig;
use crate::driver::IngestionDriver;
use crate::error::Result;
use crate::extractor;
use crate::parallel::ingest_parallel;
use crate::report::GraphBuildReport;

/// C++ front end implementing the CodeParser trait
///
/// Parsing produces a [`TranslationUnit`]; [`CppParser::build_graph`] and
/// [`CppParser::build_graph_from_files`] also run the units through the
/// ingestion driver.
pub struct CppParser {
    config: ParserConfig,
}

impl CppParser {
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
        }
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse every C++ file under `dir` and build a graph from them.
    pub fn build_graph(&self, dir: &Path, build: &BuildConfig) -> Result<(CodeGraph, GraphBuildReport)> {
        let paths = self.discover_files(dir)?;
        self.build_graph_from_files(&paths, build)
    }

    /// Parse `paths` and build a graph from them.
    ///
    /// Files that fail to parse are logged and skipped. Ingestion runs on a
    /// worker pool when [`BuildConfig::parallel_workers`] is set.
    pub fn build_graph_from_files(
        &self,
        paths: &[PathBuf],
        build: &BuildConfig,
    ) -> Result<(CodeGraph, GraphBuildReport)> {
        let project = self.parse_files(paths);
        for (path, error) in &project.failed_files {
            warn!("Skipping {}: {}", path.display(), error);
        }
        info!(
            "Parsed {} of {} files ({:.0}%)",
            project.units.len(),
            project.total_files(),
            project.success_rate() * 100.0
        );

        if build.parallel_workers.is_some() {
            return ingest_parallel(&project.units, build);
        }
        let mut driver = IngestionDriver::new(build.clone());
        let report = driver.ingest_all(&project.units)?;
        Ok((driver.into_graph(), report))
    }
}

impl Default for CppParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeParser for CppParser {
    fn language(&self) -> &str {
        "cpp"
    }

    fn file_extensions(&self) -> &[&str] {
        &[".cpp", ".cc", ".cxx", ".hpp", ".hh", ".hxx", ".h"]
    }

    fn parse_source(&self, source: &str, file_path: &Path) -> std::result::Result<TranslationUnit, ParserError> {
        extractor::extract(source, file_path, &self.config)
    }

    fn config(&self) -> &ParserConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language() {
        let parser = CppParser::new();
        assert_eq!(parser.language(), "cpp");
    }

    #[test]
    fn test_file_extensions() {
        let parser = CppParser::new();
        let exts = parser.file_extensions();
        assert!(exts.contains(&".cpp"));
        assert!(exts.contains(&".hpp"));
        assert!(exts.contains(&".h"));
    }

    #[test]
    fn test_can_parse() {
        let parser = CppParser::new();
        assert!(parser.can_parse(Path::new("shapes.hpp")));
        assert!(parser.can_parse(Path::new("main.cc")));
        assert!(!parser.can_parse(Path::new("main.rs")));
    }

    #[test]
    fn test_parse_source_uses_config() {
        let parser = CppParser::with_config(ParserConfig::default().strict());
        assert!(!parser.config().tolerate_syntax_errors);
        assert!(parser.parse_source("class A {", Path::new("a.cpp")).is_err());
    }

    #[test]
    fn test_build_graph_from_missing_file() {
        let parser = CppParser::new();
        let (graph, report) = parser
            .build_graph_from_files(&[PathBuf::from("does/not/exist.cpp")], &BuildConfig::default())
            .unwrap();
        assert!(report.files.is_empty());
        assert_eq!(graph.entity_count(), CodeGraph::new().entity_count());
    }
}
