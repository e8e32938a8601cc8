//! Macrogen Core
//!
//! Conversation engine: requirements → candidate selection → parameter
//! collection → script synthesis.
//!
//! # Core Concepts
//!
//! - [`PhaseMachine`]: drives one [`Session`] through the phases
//! - [`SessionRegistry`]: session id → session, created lazily
//! - [`LanguageCapability`]: pluggable intent extraction, with the local
//!   [`KeywordCapability`] as fallback
//! - [`ScriptWriter`]: atomic output of generated scripts
//! - [`EngineConfig`]: TOML configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use macrogen_core::{EngineConfig, PhaseMachine, SessionId, SessionRegistry};
//!
//! let machine = PhaseMachine::with_keywords(catalog, EngineConfig::default())?;
//! let registry = SessionRegistry::new(Arc::new(machine));
//! let reply = registry.handle(&SessionId::from("web-1"), "2D steel truss").await?;
//! println!("{reply}");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod capability;
mod config;
mod error;
mod machine;
mod registry;
mod reply;
mod session;
mod types;
mod writer;

pub use capability::{
    KeywordCapability, LanguageCapability, ParameterIntent, SelectionIntent, TurnContext,
};
pub use config::EngineConfig;
pub use error::{CapabilityError, EngineError, ErrorContext, WriteError};
pub use machine::PhaseMachine;
pub use registry::SessionRegistry;
pub use reply::{ParameterPrompt, Reply, ReplyEvent};
pub use session::Session;
pub use types::{ControlWord, Phase, SessionId, Speaker, Turn};
pub use writer::ScriptWriter;
