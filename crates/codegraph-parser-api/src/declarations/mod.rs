//! Declaration stream types produced by front ends

mod declaration;
mod signature;
mod uses;

pub use declaration::{DeclKind, Declaration};
pub use signature::SignatureTokens;
pub use uses::{BaseSpecifier, NameUse, UseKind};
