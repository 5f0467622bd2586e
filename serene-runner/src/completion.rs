//! The seam to the language model that writes grounded replies.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default system prompt for the support assistant.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a compassionate mental health support chatbot. Your role is to:

1. Provide empathetic and supportive responses to users experiencing mental health challenges
2. Offer evidence-based therapeutic techniques and coping strategies
3. Encourage healthy habits and positive thinking patterns
4. Recognize when professional help is needed and provide appropriate resources
5. Never give medical advice or diagnose conditions
6. Always prioritize user safety and well-being

Key guidelines:
- Be warm, understanding, and non-judgmental
- Use therapeutic techniques like CBT, mindfulness, and breathing exercises
- Encourage self-care and healthy lifestyle choices
- Provide practical, actionable advice
- Know when to refer to mental health professionals
- Maintain appropriate boundaries while being supportive

Remember: You are a support tool, not a replacement for professional mental health care.";

/// Everything the language model sees for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Instructions for the model's role and boundaries.
    pub system_prompt: String,
    /// Grounding context from the retriever, or the fallback string.
    pub context: String,
    /// The user's message, unchanged.
    pub message: String,
}

impl CompletionRequest {
    /// The user turn as sent to a chat model: context, then the message.
    pub fn user_content(&self) -> String {
        format!("Context: {}\n\nUser message: {}", self.context, self.message)
    }
}

/// Why a completion produced no usable reply.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The service could not be reached or rejected the request.
    #[error("completion service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with no text.
    #[error("completion service returned an empty reply")]
    Empty,
}

/// An opaque text-completion service.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Produce the reply text for one turn.
    ///
    /// The runner bounds this call with its own timeout, so implementations
    /// need not enforce one.
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}
