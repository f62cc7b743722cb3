//! CodeGraph Parser API
//!
//! The contract between C++ front ends and the graph-building engine.
//!
//! A front end reads source and reports what was declared; the engine turns
//! that report into graph entities and relationships. This crate defines:
//!
//! - **CodeParser trait**: The interface every front end implements
//! - **Declarations**: Kind, name, qualifier, signature tokens, bases, template
//!   parameters and body name uses of each declaration, nested by scope
//! - **TranslationUnit**: One file's declaration stream
//! - **Configuration**: Customizable front-end behavior
//! - **Error handling**: Comprehensive error types
//!
//! # Example
//!
//! ```rust
//! use codegraph::SourceLocation;
//! use codegraph_parser_api::{
//!     BaseSpecifier, DeclKind, Declaration, SignatureTokens, TranslationUnit,
//! };
//!
//! let at = |line| SourceLocation::new("shapes.hpp", line, 1);
//! let unit = TranslationUnit::new("shapes.hpp").with(
//!     Declaration::new(DeclKind::Namespace, "shapes", at(1)).with_child(
//!         Declaration::new(DeclKind::Class, "Circle", at(3))
//!             .with_base(BaseSpecifier::new("Shape"))
//!             .with_child(
//!                 Declaration::new(DeclKind::Method, "area", at(5)).with_signature(
//!                     SignatureTokens::new(Vec::<String>::new())
//!                         .returns("double")
//!                         .qualified("const")
//!                         .qualified("override"),
//!                 ),
//!             )
//!             .definition(),
//!     ),
//! );
//! assert_eq!(unit.declaration_count(), 3);
//! ```

pub mod config;
pub mod declarations;
pub mod errors;
pub mod traits;
pub mod unit;

// Re-export commonly used types
pub use config::ParserConfig;
pub use declarations::{BaseSpecifier, DeclKind, Declaration, NameUse, SignatureTokens, UseKind};
pub use errors::{ParserError, ParserResult};
pub use traits::{CodeParser, ParsedProject};
pub use unit::TranslationUnit;
