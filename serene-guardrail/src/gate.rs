//! Keyword safety gate.
//!
//! The gate runs before retrieval on every turn. A match short-circuits the
//! turn with the crisis-resource reply. Matching is a flat, case-insensitive
//! substring scan; false positives are accepted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SafetyConfig;
use crate::error::Result;

/// Outcome of [`SafetyGate::assess`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum SafetyVerdict {
    /// No keyword matched.
    Clear,
    /// At least one keyword matched.
    Emergency {
        /// Matched keywords, in keyword-list order.
        matched: Vec<String>,
        /// Version of the keyword list that produced the match.
        keyword_list_version: String,
    },
}

impl SafetyVerdict {
    /// Returns `true` for [`SafetyVerdict::Emergency`].
    pub fn is_emergency(&self) -> bool {
        matches!(self, Self::Emergency { .. })
    }
}

/// Classifies messages against the configured crisis keywords.
///
/// # Example
///
/// ```rust,ignore
/// use serene_guardrail::{SafetyConfig, SafetyGate};
///
/// let gate = SafetyGate::new(SafetyConfig::default())?;
/// assert!(gate.is_emergency("I want to kill myself"));
/// ```
#[derive(Debug, Clone)]
pub struct SafetyGate {
    config: SafetyConfig,
    keywords: Vec<String>,
}

impl SafetyGate {
    /// Build a gate from a validated configuration.
    pub fn new(config: SafetyConfig) -> Result<Self> {
        config.validate()?;
        let keywords = config.emergency_keywords.iter().map(|k| normalize(k)).collect();
        Ok(Self { config, keywords })
    }

    /// The active configuration.
    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    /// Version tag of the active keyword list.
    pub fn keyword_list_version(&self) -> &str {
        &self.config.keyword_list_version
    }

    /// Whether `message` contains any emergency keyword.
    pub fn is_emergency(&self, message: &str) -> bool {
        let message = normalize(message);
        self.keywords.iter().any(|k| message.contains(k.as_str()))
    }

    /// Classify `message`, reporting every matched keyword.
    pub fn assess(&self, message: &str) -> SafetyVerdict {
        let normalized = normalize(message);
        let matched: Vec<String> = self
            .keywords
            .iter()
            .zip(&self.config.emergency_keywords)
            .filter(|(k, _)| normalized.contains(k.as_str()))
            .map(|(_, original)| original.clone())
            .collect();

        if matched.is_empty() {
            return SafetyVerdict::Clear;
        }

        debug!(
            matched = ?matched,
            keyword_list_version = %self.config.keyword_list_version,
            "emergency keywords detected"
        );
        SafetyVerdict::Emergency {
            matched,
            keyword_list_version: self.config.keyword_list_version.clone(),
        }
    }

    /// The crisis resources, name to contact.
    pub fn emergency_payload(&self) -> &BTreeMap<String, String> {
        &self.config.emergency_resources
    }

    /// Plain-text reply sent instead of a model response on an emergency.
    pub fn emergency_message(&self) -> String {
        let resources: Vec<String> = self
            .config
            .emergency_resources
            .iter()
            .map(|(name, contact)| format!("{name}: {contact}"))
            .collect();

        format!(
            "I'm concerned about what you're sharing. Your safety is important.\n\n\
             Please consider reaching out to one of these resources immediately:\n\n\
             {}\n\n\
             You don't have to go through this alone. Professional help is available and can make a real difference.\n\n\
             Would you like to talk about what's going on, or would you prefer to connect with one of these resources right now?",
            resources.join("\n")
        )
    }
}

/// Lower-case and fold typographic apostrophes to `'`.
fn normalize(text: &str) -> String {
    text.to_lowercase().replace(['\u{2019}', '\u{2018}', '\u{02BC}'], "'")
}
