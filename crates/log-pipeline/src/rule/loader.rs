//! Rule file loader -- reads and validates the rule document once at startup.
//!
//! The format follows the file extension: `.yml`/`.yaml` is YAML, anything
//! else is JSON. Any read, parse or validation failure is fatal; the
//! monitor never starts with a partial rule set.

use std::path::Path;

use crate::error::LogPipelineError;

use super::types::{RuleConfig, RuleSet};

/// Largest rule file accepted
const MAX_RULE_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB

/// Rule set shipped with the crate
const BUILTIN_RULES: &str = include_str!("../../../../rules/sco_rules.json");

/// Source name used in errors for the built-in document
const BUILTIN_SOURCE: &str = "<builtin>";

/// Rule document format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFormat {
    /// JSON document
    Json,
    /// YAML document
    Yaml,
}

impl RuleFormat {
    /// Picks the format from a file extension.
    pub fn from_path(path: &Path) -> Self {
        let is_yaml = path
            .extension()
            .is_some_and(|ext| ext == "yml" || ext == "yaml");
        if is_yaml { Self::Yaml } else { Self::Json }
    }
}

/// Rule file loader
pub struct RuleLoader;

impl RuleLoader {
    /// Loads the rule document at `path`.
    ///
    /// # Errors
    /// - the file is missing, unreadable or larger than 10MB
    /// - the document does not parse
    /// - a definition fails validation
    pub async fn load_file(path: impl AsRef<Path>) -> Result<RuleSet, LogPipelineError> {
        let path = path.as_ref();
        let source = path.display().to_string();

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| LogPipelineError::RuleLoad {
                path: source.clone(),
                reason: format!("failed to read file metadata: {e}"),
            })?;

        if metadata.len() > MAX_RULE_FILE_SIZE {
            return Err(LogPipelineError::RuleLoad {
                path: source,
                reason: format!(
                    "file too large: {} bytes (max: {MAX_RULE_FILE_SIZE})",
                    metadata.len()
                ),
            });
        }

        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| LogPipelineError::RuleLoad {
                    path: source.clone(),
                    reason: format!("failed to read file: {e}"),
                })?;

        let rules = Self::parse(&content, RuleFormat::from_path(path), &source)?;

        tracing::info!(
            path = %source,
            definitions = rules.len(),
            "loaded rule definitions"
        );

        Ok(rules)
    }

    /// Loads `path` when given, the built-in rules otherwise.
    pub async fn load_or_builtin(path: Option<&Path>) -> Result<RuleSet, LogPipelineError> {
        match path {
            Some(path) => Self::load_file(path).await,
            None => {
                let rules = Self::builtin()?;
                tracing::info!(definitions = rules.len(), "using built-in rule definitions");
                Ok(rules)
            }
        }
    }

    /// The rule set embedded in the binary.
    pub fn builtin() -> Result<RuleSet, LogPipelineError> {
        Self::parse(BUILTIN_RULES, RuleFormat::Json, BUILTIN_SOURCE)
    }

    /// Parses and validates a rule document.
    pub fn parse(
        content: &str,
        format: RuleFormat,
        source: &str,
    ) -> Result<RuleSet, LogPipelineError> {
        let config: RuleConfig = match format {
            RuleFormat::Json => {
                serde_json::from_str(content).map_err(|e| LogPipelineError::RuleLoad {
                    path: source.to_owned(),
                    reason: format!("JSON parse error: {e}"),
                })?
            }
            RuleFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| LogPipelineError::RuleLoad {
                    path: source.to_owned(),
                    reason: format!("YAML parse error: {e}"),
                })?
            }
        };

        config.compile()
    }
}
