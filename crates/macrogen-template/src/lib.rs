//! Macrogen Template
//!
//! Read-only template sources and the syntax scanner used by every other
//! crate in the workspace.
//!
//! # Core Concepts
//!
//! - [`TemplateSource`]: immutable macro-script text owned by the catalog
//! - [`BlockId`]: stable catalog identifier of a block
//! - [`ContentHash`]: 32-byte Blake3 hash used to key derived schemas
//! - [`scan`]: tree-sitter JavaScript parse with exact byte ranges
//!
//! # Example
//!
//! ```rust,ignore
//! use macrogen_template::{scan, TemplateSource};
//!
//! let source = TemplateSource::new("truss_2d", r#"parameter_float("L", "Span", 10.0);"#);
//! let tree = scan(source.text())?;
//! for call in tree.call_sites() {
//!     println!("{} at {:?}", call.callee, call.range);
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod hash;
mod source;
pub mod syntax;

pub use hash::{ContentHash, HashError};
pub use source::{BlockId, TemplateSource};
pub use syntax::{scan, Argument, CallSite, Literal, ScanError, SyntaxTree};
