//! C++ graph builder for CodeGraph
//!
//! This crate turns C++ declarations into a [`codegraph::CodeGraph`]: it
//! interns every declaration as a stable entity, resolves names through the
//! C++ scope rules, and derives containment, inheritance, override,
//! instantiation and reference edges. A tree-sitter front end
//! ([`CppParser`]) produces the declaration stream from source files.
//!
//! # Example
//!
//! ```rust
//! use codegraph::EdgeKind;
//! use codegraph_cpp::{BuildConfig, CppParser, IngestionDriver};
//! use codegraph_parser_api::CodeParser;
//! use std::path::Path;
//!
//! let parser = CppParser::new();
//! let source = r#"
//!     struct Shape { virtual double area() const = 0; };
//!     struct Square : Shape { double area() const override { return 1.0; } };
//! "#;
//! let unit = parser.parse_source(source, Path::new("shapes.hpp")).unwrap();
//!
//! let mut driver = IngestionDriver::new(BuildConfig::default());
//! let report = driver.ingest(&unit).unwrap();
//! assert!(report.is_clean());
//!
//! let graph = driver.graph();
//! let base = graph.find_by_name("Shape::area")[0].id;
//! let overriders = graph.edges_to(base, Some(EdgeKind::Overrides)).unwrap();
//! assert_eq!(overriders.len(), 1);
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod interner;
pub mod parallel;
pub mod relations;
pub mod report;
pub mod scope;

mod extractor;
mod parser_impl;
mod visitor;

pub use config::BuildConfig;
pub use driver::IngestionDriver;
pub use error::{BuildError, Result};
pub use parallel::ingest_parallel;
pub use parser_impl::CppParser;
pub use report::{BuildIssue, GraphBuildReport};
pub use scope::{Frame, Resolution, ScopeResolver, Want};
