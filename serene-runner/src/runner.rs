//! One conversational turn: safety gate, then retrieval, then completion.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serene_guardrail::{SafetyGate, SafetyVerdict};
use serene_rag::Retriever;
use tracing::{error, info, warn};

use crate::completion::{CompletionRequest, CompletionService, DEFAULT_SYSTEM_PROMPT};

/// Reply sent when the completion service fails.
pub const APOLOGY_REPLY: &str =
    "I'm having trouble processing your message right now. Please try again in a moment.";

/// Reply sent for an empty or whitespace-only message.
pub const EMPTY_MESSAGE_PROMPT: &str = "Please type something so I can help you.";

const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

/// The outcome of [`TurnRunner::respond`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnReply {
    /// The message was blank.
    NeedsInput { message: String },
    /// The safety gate matched; retrieval and completion were skipped.
    Emergency {
        message: String,
        resources: BTreeMap<String, String>,
        matched: Vec<String>,
    },
    /// The model answered with the retrieved context.
    Grounded { reply: String, context: String },
    /// The model failed; the user gets the fixed apology.
    Degraded { message: String, context: String },
}

impl TurnReply {
    /// The text shown to the user.
    pub fn text(&self) -> &str {
        match self {
            Self::NeedsInput { message }
            | Self::Emergency { message, .. }
            | Self::Degraded { message, .. } => message,
            Self::Grounded { reply, .. } => reply,
        }
    }

    pub fn is_emergency(&self) -> bool {
        matches!(self, Self::Emergency { .. })
    }
}

/// Runs single turns against a shared gate, retriever, and completion service.
///
/// # Example
///
/// ```rust,ignore
/// let runner = TurnRunner::new(gate, retriever, Arc::new(my_model));
/// let reply = runner.respond("I can't sleep").await;
/// println!("{}", reply.text());
/// ```
pub struct TurnRunner {
    gate: Arc<SafetyGate>,
    retriever: Retriever,
    completion: Arc<dyn CompletionService>,
    system_prompt: String,
    completion_timeout: Duration,
}

impl TurnRunner {
    pub fn new(
        gate: Arc<SafetyGate>,
        retriever: Retriever,
        completion: Arc<dyn CompletionService>,
    ) -> Self {
        Self {
            gate,
            retriever,
            completion,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            completion_timeout: DEFAULT_COMPLETION_TIMEOUT,
        }
    }

    /// Replace the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Time budget for one completion call.
    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = timeout;
        self
    }

    /// Answer one message. Never fails: every error path has a fixed reply.
    pub async fn respond(&self, message: &str) -> TurnReply {
        if message.trim().is_empty() {
            return TurnReply::NeedsInput { message: EMPTY_MESSAGE_PROMPT.to_string() };
        }

        if let SafetyVerdict::Emergency { matched, keyword_list_version } = self.gate.assess(message)
        {
            warn!(
                matched = ?matched,
                keyword_list_version = %keyword_list_version,
                "emergency turn; skipping retrieval and completion"
            );
            return TurnReply::Emergency {
                message: self.gate.emergency_message(),
                resources: self.gate.emergency_payload().clone(),
                matched,
            };
        }

        let context = self.retriever.context_for(message).await;
        let request = CompletionRequest {
            system_prompt: self.system_prompt.clone(),
            context: context.clone(),
            message: message.to_string(),
        };

        match tokio::time::timeout(self.completion_timeout, self.completion.complete(request)).await
        {
            Ok(Ok(reply)) if !reply.trim().is_empty() => {
                info!(context_chars = context.chars().count(), "turn answered");
                TurnReply::Grounded { reply: reply.trim().to_string(), context }
            }
            Ok(Ok(_)) => {
                error!("completion service returned an empty reply");
                TurnReply::Degraded { message: APOLOGY_REPLY.to_string(), context }
            }
            Ok(Err(e)) => {
                error!(error = %e, "completion failed");
                TurnReply::Degraded { message: APOLOGY_REPLY.to_string(), context }
            }
            Err(_) => {
                error!(timeout = ?self.completion_timeout, "completion timed out");
                TurnReply::Degraded { message: APOLOGY_REPLY.to_string(), context }
            }
        }
    }
}
