//! Layered settings: defaults, then an optional YAML file, then environment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serene_guardrail::SafetyConfig;
use serene_rag::RagConfig;
use serene_rag::embedding::DEFAULT_HASHING_DIMENSIONS;
use serene_telemetry::TelemetryConfig;

/// File picked up from the working directory when `--config` is not given.
pub const DEFAULT_SETTINGS_FILE: &str = "serene.yaml";
/// Default location of the SQLite index.
pub const DEFAULT_STORE_PATH: &str = "./serene_db/index.sqlite";
/// Overrides [`StoreSettings::path`].
pub const STORE_PATH_ENV: &str = "SERENE_STORE_PATH";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { backend: StoreBackend::default(), path: PathBuf::from(DEFAULT_STORE_PATH) }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    #[default]
    Hashing,
    OpenAI,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingBackend,
    pub dimensions: usize,
    /// Model name for API-backed providers.
    pub model: Option<String>,
    /// API root for OpenAI-compatible servers.
    pub base_url: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::default(),
            dimensions: DEFAULT_HASHING_DIMENSIONS,
            model: None,
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub rag: RagConfig,
    pub safety: SafetyConfig,
    pub store: StoreSettings,
    pub embedding: EmbeddingSettings,
    pub telemetry: TelemetryConfig,
}

impl Settings {
    /// Resolve settings for a process.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_SETTINGS_FILE`]
    /// is read if present. Environment overrides apply last, then everything
    /// is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_SETTINGS_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_SETTINGS_FILE))?
            }
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
        Self::from_yaml(&contents).with_context(|| format!("invalid settings in '{}'", path.display()))
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Apply `SERENE_STORE_PATH`, `SERENE_LOG`, and `SERENE_LOG_FORMAT`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(path) = var(STORE_PATH_ENV).filter(|p| !p.trim().is_empty()) {
            self.store.path = PathBuf::from(path);
        }
        if let Some(filter) = var(serene_telemetry::LOG_ENV).filter(|f| !f.trim().is_empty()) {
            self.telemetry.filter = filter;
        }
        if let Some(format) = var(serene_telemetry::LOG_FORMAT_ENV) {
            self.telemetry.format = format.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.rag.validate()?;
        self.safety.validate()?;
        if self.embedding.dimensions == 0 {
            bail!("embedding.dimensions must be greater than zero");
        }
        if self.store.backend == StoreBackend::Sqlite && self.store.path.as_os_str().is_empty() {
            bail!("store.path must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serene_telemetry::LogFormat;

    #[test]
    fn empty_yaml_is_all_defaults() {
        let settings = Settings::from_yaml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.store.path, PathBuf::from(DEFAULT_STORE_PATH));
        settings.validate().unwrap();
    }

    #[test]
    fn sections_override_individually() {
        let yaml = r#"
rag:
  chunk_size: 500
  chunk_overlap: 50
  context_header: null
safety:
  emergency_keywords: ["overdose"]
store:
  path: /var/lib/serene/kb.sqlite
embedding:
  dimensions: 256
"#;
        let settings = Settings::from_yaml(yaml).unwrap();
        assert_eq!(settings.rag.chunk_size, 500);
        assert_eq!(settings.rag.retrieval_k_context, 3);
        assert_eq!(settings.rag.context_header, None);
        assert_eq!(settings.safety.emergency_keywords, vec!["overdose"]);
        assert_eq!(settings.safety.emergency_resources.len(), 4);
        assert_eq!(settings.store.path, PathBuf::from("/var/lib/serene/kb.sqlite"));
        assert_eq!(settings.embedding.dimensions, 256);
        settings.validate().unwrap();
    }

    #[test]
    fn env_overrides_win() {
        let mut settings = Settings::default();
        settings
            .apply_env(|key| match key {
                STORE_PATH_ENV => Some("/tmp/other.sqlite".into()),
                "SERENE_LOG" => Some("debug".into()),
                "SERENE_LOG_FORMAT" => Some("json".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(settings.store.path, PathBuf::from("/tmp/other.sqlite"));
        assert_eq!(settings.telemetry.filter, "debug");
        assert_eq!(settings.telemetry.format, LogFormat::Json);
    }

    #[test]
    fn bad_log_format_is_rejected() {
        let mut settings = Settings::default();
        assert!(settings.apply_env(|k| (k == "SERENE_LOG_FORMAT").then(|| "xml".into())).is_err());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let settings = Settings::from_yaml("rag:\n  chunk_overlap: 1000\n").unwrap();
        assert!(settings.validate().is_err());
        let settings = Settings::from_yaml("safety:\n  emergency_keywords: []\n").unwrap();
        assert!(settings.validate().is_err());
        let settings = Settings::from_yaml("embedding:\n  dimensions: 0\n").unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&temp.path().join("missing.yaml"))).is_err());
    }

    #[test]
    fn reads_file_from_disk() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("serene.yaml");
        std::fs::write(&path, "store:\n  backend: memory\n").unwrap();
        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.store.backend, StoreBackend::Memory);
    }
}
