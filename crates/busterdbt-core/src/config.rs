//! Configuration schema (busterdbt.toml)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use crate::issue::{Issue, IssueCode, Severity};

/// Severity threshold overrides for specific issue codes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeverityThreshold {
    /// Map of issue code to severity override
    #[serde(default)]
    pub overrides: HashMap<String, Severity>,
}

impl SeverityThreshold {
    /// Get severity for an issue code, or default
    pub fn get_severity(&self, code: IssueCode, default: Severity) -> Severity {
        self.overrides
            .get(code.as_str())
            .copied()
            .unwrap_or(default)
    }

    /// Set severity override for a code
    pub fn set_override(&mut self, code: IssueCode, severity: Severity) {
        self.overrides.insert(code.as_str().to_string(), severity);
    }

    /// Rewrite an issue's severity according to the overrides
    pub fn apply(&self, mut issue: Issue) -> Issue {
        issue.severity = self.get_severity(issue.code, issue.severity);
        issue
    }
}

/// Allowlist rules for specific models or patterns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllowlistRules {
    /// Skip these models entirely (glob patterns)
    #[serde(default)]
    pub skip_models: Vec<String>,
}

impl AllowlistRules {
    /// Check if a model matches any pattern in the list
    fn matches_pattern(model: &str, patterns: &[String]) -> bool {
        patterns.iter().any(|pattern| {
            if pattern.contains('*') {
                glob_match(pattern, model)
            } else {
                pattern == model
            }
        })
    }

    /// Check if a model should be skipped
    pub fn is_model_skipped(&self, model: &str) -> bool {
        Self::matches_pattern(model, &self.skip_models)
    }
}

fn default_entity_prefixes() -> Vec<String> {
    ["dim_", "fact_", "stg_", "staging_", "fct_"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

fn default_fallback_primary_key() -> String {
    "id".to_string()
}

fn default_true() -> bool {
    true
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Warehouse naming prefixes tried when mapping an entity to a model
    #[serde(default = "default_entity_prefixes")]
    pub entity_prefixes: Vec<String>,

    /// Key used when no primary key can be resolved for a target model
    #[serde(default = "default_fallback_primary_key")]
    pub fallback_primary_key: String,

    /// Whether semantic dimensions produce canned filters
    #[serde(default = "default_true")]
    pub generate_filters: bool,

    /// Severity thresholds
    #[serde(default)]
    pub severity: SeverityThreshold,

    /// Allowlist rules
    #[serde(default)]
    pub allowlist: AllowlistRules,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            entity_prefixes: default_entity_prefixes(),
            fallback_primary_key: default_fallback_primary_key(),
            generate_filters: true,
            severity: SeverityThreshold::default(),
            allowlist: AllowlistRules::default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }
}

/// Simple glob matching (supports a single `*` wildcard)
fn glob_match(pattern: &str, text: &str) -> bool {
    if pattern == "*" || pattern == "**" {
        return true;
    }

    if let Some(star_pos) = pattern.find('*') {
        let prefix = &pattern[..star_pos];
        let suffix = &pattern[star_pos + 1..];

        text.len() >= prefix.len() + suffix.len()
            && text.starts_with(prefix)
            && text.ends_with(suffix)
    } else {
        pattern == text
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.fallback_primary_key, "id");
        assert!(config.entity_prefixes.contains(&"dim_".to_string()));
        assert!(config.generate_filters);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            fallback_primary_key = "pk"

            [allowlist]
            skip_models = ["tmp_*"]
            "#,
        )
        .unwrap();

        assert_eq!(config.fallback_primary_key, "pk");
        assert_eq!(config.entity_prefixes.len(), 5);
        assert!(config.allowlist.is_model_skipped("tmp_orders"));
        assert!(!config.allowlist.is_model_skipped("orders"));
    }

    #[test]
    fn severity_override() {
        let mut threshold = SeverityThreshold::default();
        threshold.set_override(IssueCode::MissingBaseModel, Severity::Error);

        let issue = threshold.apply(Issue::warning(IssueCode::MissingBaseModel, "missing"));
        assert_eq!(issue.severity, Severity::Error);

        let untouched = threshold.apply(Issue::warning(IssueCode::EntityUnresolved, "x"));
        assert_eq!(untouched.severity, Severity::Warn);
    }

    #[test]
    fn config_file_roundtrip() {
        let mut config = Config::default();
        config.fallback_primary_key = "pk".to_string();
        config.severity.set_override(IssueCode::EntityUnresolved, Severity::Error);
        config.allowlist.skip_models.push("tmp_*".to_string());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("busterdbt.toml");
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(config, loaded);

        let missing = Config::from_file(&dir.path().join("absent.toml"));
        assert!(matches!(missing, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn glob_matching() {
        assert!(glob_match("*", "anything"));
        assert!(glob_match("stg_*", "stg_users"));
        assert!(glob_match("*_tmp", "orders_tmp"));
        assert!(!glob_match("stg_*", "fct_users"));
        assert!(!glob_match("ab*ba", "aba"));
    }
}
