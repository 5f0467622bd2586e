//! Safety configuration: the versioned keyword list and crisis resources.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GuardrailError, Result};

/// Version tag of [`DEFAULT_EMERGENCY_KEYWORDS`]. Bump when the list changes.
pub const KEYWORD_LIST_VERSION: &str = "2024.1";

/// Phrases that mark a message as a possible crisis.
pub const DEFAULT_EMERGENCY_KEYWORDS: [&str; 9] = [
    "suicide",
    "kill myself",
    "end my life",
    "want to die",
    "self-harm",
    "hurt myself",
    "no reason to live",
    "everyone would be better off",
    "can't take it anymore",
];

/// Crisis resources offered on every emergency reply, name to contact.
pub const DEFAULT_EMERGENCY_RESOURCES: [(&str, &str); 4] = [
    ("National Suicide Prevention Lifeline", "1-800-273-8255"),
    ("Crisis Text Line", "Text HOME to 741741"),
    ("Emergency Services", "911"),
    ("Mental Health America", "1-800-969-6642"),
];

/// Keyword list and resource table for the [`SafetyGate`](crate::SafetyGate).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SafetyConfig {
    /// Version tag recorded alongside every emergency verdict.
    pub keyword_list_version: String,
    /// Case-insensitive substrings that trigger the emergency path.
    pub emergency_keywords: Vec<String>,
    /// Resource name to contact detail.
    pub emergency_resources: BTreeMap<String, String>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            keyword_list_version: KEYWORD_LIST_VERSION.to_string(),
            emergency_keywords: DEFAULT_EMERGENCY_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            emergency_resources: DEFAULT_EMERGENCY_RESOURCES
                .iter()
                .map(|(name, contact)| (name.to_string(), contact.to_string()))
                .collect(),
        }
    }
}

impl SafetyConfig {
    /// Reject configurations that would silently disable the gate.
    pub fn validate(&self) -> Result<()> {
        if self.emergency_keywords.is_empty() {
            return Err(GuardrailError::Config("emergency_keywords must not be empty".into()));
        }
        if let Some(pos) = self.emergency_keywords.iter().position(|k| k.trim().is_empty()) {
            return Err(GuardrailError::Config(format!("emergency keyword #{pos} is blank")));
        }
        if self.emergency_resources.is_empty() {
            return Err(GuardrailError::Config("emergency_resources must not be empty".into()));
        }
        if self.keyword_list_version.trim().is_empty() {
            return Err(GuardrailError::Config("keyword_list_version must not be empty".into()));
        }
        Ok(())
    }
}
