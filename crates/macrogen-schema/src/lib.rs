//! Macrogen Schema
//!
//! Static discovery of the tunable parameters of a macro-script template.
//!
//! # Core Concepts
//!
//! - [`extract`]: template text → [`BlockSchema`], in source order
//! - [`ParameterDescriptor`]: one parameter with kind, constraints and the
//!   exact byte range of its default literal
//! - [`ArrayGroup`]: a dynamic array whose member count is driven by an
//!   integer parameter
//! - [`Predicate`]: dependency expressions, compiled on demand
//! - [`SchemaCache`]: moka-backed memoization keyed by content hash
//!
//! # Example
//!
//! ```rust,ignore
//! use macrogen_schema::{extract, ParamValue};
//! use macrogen_template::TemplateSource;
//!
//! let source = TemplateSource::new("beam", r#"parameter_float("L", "Span", 10.0, 1.0, 50.0, "m");"#);
//! let schema = extract(&source)?;
//! let span = schema.get("L").unwrap();
//! assert!(span.validate(&ParamValue::Float(15.5)).is_ok());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod cache;
mod declaration;
mod descriptor;
mod error;
mod extract;
pub mod predicate;
mod value;

pub use cache::SchemaCache;
pub use declaration::{DeclarationKind, Slot};
pub use descriptor::{
    ArrayGroup, BlockSchema, Constraints, DefaultLiteral, LiteralStyle, ParameterDescriptor,
};
pub use error::ExtractError;
pub use extract::extract;
pub use predicate::{Predicate, PredicateError};
pub use value::{format_decimal, ParamKind, ParamValue, ValidationError};
