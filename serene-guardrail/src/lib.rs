//! Crisis-keyword safety gate for the Serene support assistant.
//!
//! Messages are scanned for a versioned list of crisis phrases before any
//! retrieval happens. On a match, the caller replies with the fixed set of
//! emergency resources instead of a model response.

mod config;
mod error;
mod gate;

pub use config::{
    DEFAULT_EMERGENCY_KEYWORDS, DEFAULT_EMERGENCY_RESOURCES, KEYWORD_LIST_VERSION, SafetyConfig,
};
pub use error::{GuardrailError, Result};
pub use gate::{SafetyGate, SafetyVerdict};
