use thiserror::Error;

/// Errors raised while building a [`SafetyGate`](crate::SafetyGate).
///
/// Classification itself never fails.
#[derive(Debug, Error)]
pub enum GuardrailError {
    #[error("Safety configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, GuardrailError>;
