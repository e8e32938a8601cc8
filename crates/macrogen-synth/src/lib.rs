//! Macrogen Synth
//!
//! Byte-exact rewriting of template literals.
//!
//! # Core Concepts
//!
//! - [`EditOperation`]: replacement of one byte range, tagged with its origin
//! - [`apply_edits`]: conflict-checked splice in descending offset order
//! - [`render`]: value → literal text in the style of the replaced default
//! - [`ExpansionPolicy`]: dynamic array member-count reconciliation
//!   ([`TruncateSuperset`], [`DuplicateBlock`])
//! - [`Synthesizer`]: values → [`SynthesizedScript`]
//!
//! # Example
//!
//! ```rust,ignore
//! use indexmap::IndexMap;
//! use macrogen_schema::{extract, ParamValue};
//! use macrogen_synth::synthesize;
//!
//! let schema = extract(&source)?;
//! let values = IndexMap::from([("L".to_string(), ParamValue::Float(15.5))]);
//! let script = synthesize(&source, &schema, &values, "session-1")?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod edit;
mod error;
mod policy;
mod render;
mod synthesize;

pub use edit::{apply_edits, check_conflicts, EditOperation, EditOrigin};
pub use error::SynthError;
pub use policy::{
    policy_by_name, policy_with_limit, DuplicateBlock, ExpansionPolicy, ReconcileContext,
    TruncateSuperset, DEFAULT_MAX_MEMBERS,
};
pub use render::{quote_string, render, requote};
pub use synthesize::{synthesize, SynthesizedScript, Synthesizer};
