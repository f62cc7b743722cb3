use crate::{config::ParserConfig, errors::ParserError, unit::TranslationUnit};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Aggregate result of parsing several files
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedProject {
    /// Units of every file that parsed
    pub units: Vec<TranslationUnit>,

    /// Files that failed to parse (path, error message)
    pub failed_files: Vec<(PathBuf, String)>,
}

impl ParsedProject {
    /// Total number of files processed (success + failure)
    pub fn total_files(&self) -> usize {
        self.units.len() + self.failed_files.len()
    }

    /// Success rate (0.0 to 1.0)
    pub fn success_rate(&self) -> f64 {
        if self.total_files() == 0 {
            0.0
        } else {
            self.units.len() as f64 / self.total_files() as f64
        }
    }
}

/// Core trait that all front ends implement
///
/// A front end turns source text into a [`TranslationUnit`]: a declaration
/// stream the engine consumes. It never touches the graph itself.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to support parallel ingestion.
pub trait CodeParser: Send + Sync {
    /// Returns the language identifier (lowercase, e.g., "cpp")
    fn language(&self) -> &str;

    /// Returns supported file extensions (e.g., [".cpp", ".hpp"])
    fn file_extensions(&self) -> &[&str];

    /// Parse source code into a declaration stream
    ///
    /// # Arguments
    /// * `source` - Source code string
    /// * `file_path` - Logical path for this source (used in source locations)
    ///
    /// # Errors
    /// Returns `ParserError` if the grammar cannot be loaded, or on syntax
    /// errors when the configuration does not tolerate them
    fn parse_source(&self, source: &str, file_path: &Path) -> Result<TranslationUnit, ParserError>;

    /// Read and parse a single file
    ///
    /// # Errors
    /// Returns `ParserError` if:
    /// - File cannot be read
    /// - File exceeds `max_file_size`
    /// - `parse_source` fails
    fn parse_file(&self, path: &Path) -> Result<TranslationUnit, ParserError> {
        let metadata =
            std::fs::metadata(path).map_err(|e| ParserError::IoError(path.to_path_buf(), e))?;
        let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if size > self.config().max_file_size {
            return Err(ParserError::FileTooLarge(path.to_path_buf(), size));
        }

        let source = std::fs::read_to_string(path)
            .map_err(|e| ParserError::IoError(path.to_path_buf(), e))?;
        self.parse_source(&source, path)
    }

    /// Parse multiple files
    ///
    /// Failures are collected per file; one bad file never stops the rest.
    fn parse_files(&self, paths: &[PathBuf]) -> ParsedProject {
        let mut project = ParsedProject::default();
        for path in paths {
            match self.parse_file(path) {
                Ok(unit) => project.units.push(unit),
                Err(e) => project.failed_files.push((path.clone(), e.to_string())),
            }
        }
        project
    }

    /// Parse a directory recursively
    ///
    /// # Errors
    /// Returns `ParserError::IoError` if the directory cannot be walked
    fn parse_directory(&self, dir: &Path) -> Result<ParsedProject, ParserError> {
        let paths = self.discover_files(dir)?;
        Ok(self.parse_files(&paths))
    }

    /// Discover parseable files in a directory
    ///
    /// Default implementation walks the directory and filters by extension.
    /// Results are sorted so ingestion order is deterministic.
    fn discover_files(&self, dir: &Path) -> Result<Vec<PathBuf>, ParserError> {
        use std::fs;

        fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), ParserError> {
            if !dir.is_dir() {
                return Ok(());
            }

            for entry in
                fs::read_dir(dir).map_err(|e| ParserError::IoError(dir.to_path_buf(), e))?
            {
                let entry = entry.map_err(|e| ParserError::IoError(dir.to_path_buf(), e))?;
                let path = entry.path();
                if path.is_dir() {
                    walk_dir(&path, files)?;
                } else {
                    files.push(path);
                }
            }

            Ok(())
        }

        let mut files = Vec::new();
        walk_dir(dir, &mut files)?;
        files.retain(|path| self.can_parse(path));
        files.sort();
        Ok(files)
    }

    /// Check if this parser can handle the given file
    ///
    /// Default implementation checks file extension.
    fn can_parse(&self, path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext_str = format!(".{}", ext.to_string_lossy());
            self.file_extensions().contains(&ext_str.as_str())
        } else {
            false
        }
    }

    /// Get parser configuration
    fn config(&self) -> &ParserConfig;
}
