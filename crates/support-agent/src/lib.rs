//! Order-support chat agent
//!
//! Wires the deterministic [`disclosure`] policy into a usable chat surface:
//! - [`config`]: TOML + environment configuration, including the order record
//! - [`agent`]: the conversation loop, optionally phrased by a hosted model
//! - [`backend`]: the hosted `generateContent` client
//! - [`resilience`]: timeout and guard rails that fall back to templated replies
//! - [`transcript`]: JSON persistence so a chat can be resumed

pub mod agent;
pub mod backend;
pub mod config;
pub mod prompts;
pub mod resilience;
pub mod transcript;

pub use agent::{build_session, AgentReply, SupportAgent};
pub use backend::{BackendError, GeminiBackend, GenerationBackend, GenerationRequest};
pub use config::{AgentConfig, BackendConfig};
pub use resilience::{DegradationLevel, DegradedReply};
