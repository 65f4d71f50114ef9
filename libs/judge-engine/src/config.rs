// Language configuration management for the sandboxes
use anyhow::{bail, Context, Result};
use judge_common::types::Language;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub name: String,
    pub version: String,
    pub image: String,
    pub memory_limit_mb: u64,
    pub cpu_limit: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct LanguagesJson {
    languages: Vec<LanguageConfig>,
}

/// Language configuration manager
#[derive(Debug, Clone)]
pub struct LanguageConfigManager {
    configs: HashMap<Language, LanguageConfig>,
}

impl LanguageConfigManager {
    /// Load language configurations from languages.json
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Language config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path).context("Failed to read languages.json")?;

        let languages_json: LanguagesJson =
            serde_json::from_str(&content).context("Failed to parse languages.json")?;

        let mut configs = HashMap::new();
        for lang in languages_json.languages {
            let language = Language::from_str(&lang.name)
                .with_context(|| format!("Unknown language '{}' in languages.json", lang.name))?;
            configs.insert(language, lang);
        }

        if configs.is_empty() {
            bail!("No languages configured in {}", config_path.display());
        }

        Ok(Self { configs })
    }

    /// Load with default path (config/languages.json)
    pub fn load_default() -> Result<Self> {
        Self::load(Path::new("config/languages.json"))
    }

    /// Load from `config_path`, falling back to built-in defaults when the
    /// file is missing or unreadable
    pub fn load_or_builtin(config_path: &Path) -> Self {
        match Self::load(config_path) {
            Ok(manager) => manager,
            Err(e) => {
                warn!(error = %e, "Using built-in language configuration");
                Self::builtin()
            }
        }
    }

    /// Defaults for every supported language
    pub fn builtin() -> Self {
        let entry = |language: Language, version: &str, image: &str, memory_limit_mb: u64| {
            (
                language,
                LanguageConfig {
                    name: language.to_string(),
                    version: version.to_string(),
                    image: image.to_string(),
                    memory_limit_mb,
                    cpu_limit: 0.5,
                },
            )
        };

        Self {
            configs: HashMap::from([
                entry(Language::JavaScript, "20", "node:20-alpine", 256),
                entry(Language::Python, "3.12", "python:3.12-alpine", 256),
                entry(Language::Java, "21", "eclipse-temurin:21-jdk", 512),
                entry(Language::Go, "1.22", "golang:1.22-alpine", 512),
            ]),
        }
    }

    /// Get configuration for a specific language
    pub fn get_config(&self, language: &Language) -> Result<&LanguageConfig> {
        self.configs
            .get(language)
            .ok_or_else(|| anyhow::anyhow!("No configuration found for language: {}", language))
    }

    /// Get Docker image for a language
    pub fn get_image(&self, language: &Language) -> Result<String> {
        Ok(self.get_config(language)?.image.clone())
    }

    /// Get memory limit for a language
    pub fn get_memory_limit_mb(&self, language: &Language) -> Result<u64> {
        Ok(self.get_config(language)?.memory_limit_mb)
    }

    /// Get CPU limit for a language
    pub fn get_cpu_limit(&self, language: &Language) -> Result<f32> {
        Ok(self.get_config(language)?.cpu_limit)
    }

    /// List all configured languages
    pub fn list_languages(&self) -> Vec<String> {
        let mut names: Vec<String> = self.configs.keys().map(|l| l.to_string()).collect();
        names.sort();
        names
    }
}
