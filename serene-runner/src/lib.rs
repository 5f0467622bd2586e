//! Turn orchestration for Serene.
//!
//! A turn is answered in a fixed order: the safety gate runs first and can
//! end the turn with crisis resources; otherwise the retriever builds context
//! and a [`CompletionService`] writes the reply.

mod completion;
mod runner;

pub use completion::{CompletionError, CompletionRequest, CompletionService, DEFAULT_SYSTEM_PROMPT};
pub use runner::{APOLOGY_REPLY, EMPTY_MESSAGE_PROMPT, TurnReply, TurnRunner};
