//! Macrogen Catalog
//!
//! The read-only block catalog and the candidate matcher.
//!
//! # Core Concepts
//!
//! - [`BlockCandidate`]: one catalog entry
//! - [`Requirements`]: partially specified, normalized user requirements
//! - [`filter`]: exact case-insensitive matching in catalog order
//! - [`Catalog::load_dir`]: loader for the `2D/2D_DB.json` + `3D/3D_DB.json` layout

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod candidate;
mod catalog;
mod error;
mod matcher;
mod requirements;

pub use candidate::BlockCandidate;
pub use catalog::{parse_database, Catalog, DIMENSIONS};
pub use error::CatalogError;
pub use matcher::{filter, materials, matches, structure_types};
pub use requirements::{RequirementField, Requirements};
