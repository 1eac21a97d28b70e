//! Persisted user settings and runtime tunables.

use crate::error::ConfigError;
use crate::language::{AUTO, LanguagePair};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub mod defaults {
    pub const REQUEST_TIMEOUT_MS: u64 = 10_000;
    pub const INTER_UNIT_DELAY_MS: u64 = 10;
    pub const FRAME_ACK_TIMEOUT_MS: u64 = 3_000;
    pub const READINESS_PROBE_INTERVAL_MS: u64 = 500;
    pub const READINESS_BUDGET_MS: u64 = 10_000;
    pub const READINESS_PROBE_TIMEOUT_MS: u64 = 2_000;
    pub const AVAILABILITY_TIMEOUT_MS: u64 = 2_000;
    pub const SELECTION_PROBE_TIMEOUT_MS: u64 = 500;
    pub const DOWNLOAD_SUCCESS_DELAY_MS: u64 = 500;
}

/// Settings owned by the host shell: `{sourceLanguage, targetLanguage, addLangAttributes}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub source_language: String,
    pub target_language: String,
    pub add_lang_attributes: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_language: AUTO.to_string(),
            target_language: "en".to_string(),
            add_lang_attributes: true,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&read(path.as_ref())?)
    }

    pub fn pair(&self) -> LanguagePair {
        LanguagePair::new(&self.source_language, &self.target_language)
    }
}

/// How an iframe translates its own selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionDelegation {
    /// Selected text goes to the parent as one `TEXT_TRANSLATION_REQUEST`.
    #[default]
    PerUnit,
    /// Selected text goes up as `FRAME_SELECTION_CONTENT`; the parent replies
    /// with `FRAME_TRANSLATED_CONTENT`.
    WholeSelection,
}

/// Timing and behavior knobs. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    pub request_timeout_ms: u64,
    pub inter_unit_delay_ms: u64,
    pub frame_ack_timeout_ms: u64,
    pub readiness_probe_interval_ms: u64,
    pub readiness_budget_ms: u64,
    pub readiness_probe_timeout_ms: u64,
    pub availability_timeout_ms: u64,
    pub selection_probe_timeout_ms: u64,
    pub download_success_delay_ms: u64,
    /// Probe the parent with a test request before delegated page translation.
    pub probe_parent_readiness: bool,
    pub selection_delegation: SelectionDelegation,
    /// Log implausible backend output. Never changes results.
    pub flag_suspicious_translations: bool,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: defaults::REQUEST_TIMEOUT_MS,
            inter_unit_delay_ms: defaults::INTER_UNIT_DELAY_MS,
            frame_ack_timeout_ms: defaults::FRAME_ACK_TIMEOUT_MS,
            readiness_probe_interval_ms: defaults::READINESS_PROBE_INTERVAL_MS,
            readiness_budget_ms: defaults::READINESS_BUDGET_MS,
            readiness_probe_timeout_ms: defaults::READINESS_PROBE_TIMEOUT_MS,
            availability_timeout_ms: defaults::AVAILABILITY_TIMEOUT_MS,
            selection_probe_timeout_ms: defaults::SELECTION_PROBE_TIMEOUT_MS,
            download_success_delay_ms: defaults::DOWNLOAD_SUCCESS_DELAY_MS,
            probe_parent_readiness: true,
            selection_delegation: SelectionDelegation::PerUnit,
            flag_suspicious_translations: false,
        }
    }
}

impl TranslatorConfig {
    const ENV_OVERRIDES: [&'static str; 3] = [
        "PAGE_TRANSLATOR_REQUEST_TIMEOUT_MS",
        "PAGE_TRANSLATOR_INTER_UNIT_DELAY_MS",
        "PAGE_TRANSLATOR_FRAME_ACK_TIMEOUT_MS",
    ];

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&read(path.as_ref())?)
    }

    /// Apply `PAGE_TRANSLATOR_*_MS` environment overrides.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        for key in Self::ENV_OVERRIDES {
            let Some(value) = lookup(key) else {
                continue;
            };
            let ms: u64 = value.trim().parse().map_err(|_| ConfigError::Env {
                key: key.to_string(),
                value: value.clone(),
            })?;
            match key {
                "PAGE_TRANSLATOR_REQUEST_TIMEOUT_MS" => self.request_timeout_ms = ms,
                "PAGE_TRANSLATOR_INTER_UNIT_DELAY_MS" => self.inter_unit_delay_ms = ms,
                _ => self.frame_ack_timeout_ms = ms,
            }
        }
        Ok(self)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn inter_unit_delay(&self) -> Duration {
        Duration::from_millis(self.inter_unit_delay_ms)
    }

    pub fn frame_ack_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_ack_timeout_ms)
    }

    pub fn readiness_probe_interval(&self) -> Duration {
        Duration::from_millis(self.readiness_probe_interval_ms)
    }

    pub fn readiness_budget(&self) -> Duration {
        Duration::from_millis(self.readiness_budget_ms)
    }

    pub fn readiness_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_probe_timeout_ms)
    }

    pub fn availability_timeout(&self) -> Duration {
        Duration::from_millis(self.availability_timeout_ms)
    }

    pub fn selection_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.selection_probe_timeout_ms)
    }

    pub fn download_success_delay(&self) -> Duration {
        Duration::from_millis(self.download_success_delay_ms)
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.source_language, "auto");
        assert_eq!(settings.target_language, "en");
        assert!(settings.add_lang_attributes);
    }

    #[test]
    fn test_settings_partial_json() {
        let settings = Settings::from_json(r#"{"targetLanguage":"fr"}"#).unwrap();
        assert_eq!(settings.pair(), LanguagePair::new("auto", "fr"));
        assert!(settings.add_lang_attributes);
    }

    #[test]
    fn test_settings_round_trip_keys() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert!(json.get("addLangAttributes").is_some());
        assert!(json.get("sourceLanguage").is_some());
    }

    #[test]
    fn test_config_defaults() {
        let config = TranslatorConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.inter_unit_delay(), Duration::from_millis(10));
        assert_eq!(config.frame_ack_timeout(), Duration::from_secs(3));
        assert!(!config.flag_suspicious_translations);
        assert_eq!(config.selection_delegation, SelectionDelegation::PerUnit);
    }

    #[test]
    fn test_config_json() {
        let config = TranslatorConfig::from_json(
            r#"{"inter_unit_delay_ms": 0, "selection_delegation": "whole_selection"}"#,
        )
        .unwrap();
        assert_eq!(config.inter_unit_delay_ms, 0);
        assert_eq!(config.selection_delegation, SelectionDelegation::WholeSelection);
        assert_eq!(config.request_timeout_ms, 10_000);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [("PAGE_TRANSLATOR_REQUEST_TIMEOUT_MS", "2500")].into();
        let config = TranslatorConfig::default()
            .with_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.request_timeout_ms, 2500);

        let bad: HashMap<&str, &str> = [("PAGE_TRANSLATOR_FRAME_ACK_TIMEOUT_MS", "soon")].into();
        let err = TranslatorConfig::default()
            .with_overrides(|k| bad.get(k).map(|v| v.to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Settings::load("/nonexistent/settings.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
