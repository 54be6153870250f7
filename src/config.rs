//! Configuration management for the CoreNLP tokenizer using the prefer crate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::annotators::AnnotatorSet;

/// Default Java heap size for the engine.
pub const DEFAULT_MEMORY: &str = "2g";

/// Default pipeline properties bundled with the Chinese models jar.
pub const DEFAULT_PROPERTIES: &str = "StanfordCoreNLP-chinese.properties";

/// Default time allowed for the engine to load its models and print the first prompt.
pub const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 60;

/// Config file basename discovered by prefer (`corenlp-zh.toml`, `corenlp-zh.yaml`, ...).
const CONFIG_NAME: &str = "corenlp-zh";

/// Tokenizer and engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// Java classpath containing the CoreNLP jars (e.g. `~/corenlp/*`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classpath: Option<String>,
    /// Java heap size passed as `-mx<memory>`.
    #[serde(default = "default_memory")]
    pub memory: String,
    /// Requested annotators on top of tokenization.
    #[serde(default, skip_serializing_if = "AnnotatorSet::is_empty")]
    pub annotators: AnnotatorSet,
    /// Java executable name or path.
    #[serde(default = "default_java")]
    pub java: String,
    /// Pipeline properties resource.
    #[serde(default = "default_properties")]
    pub properties: String,
    /// Shell used to launch the engine.
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Spawn the engine directly instead of through the shell.
    /// Engine stderr is then logged instead of captured with responses.
    #[serde(default)]
    pub direct_spawn: bool,
    /// Seconds to wait for the first prompt.
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_secs: u64,
    /// Seconds to wait for each response (unset = wait indefinitely).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    /// Lemma dictionary asset (JSON).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dictionary: Option<PathBuf>,
    /// File this config was loaded from, if any.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

fn default_memory() -> String {
    DEFAULT_MEMORY.to_string()
}

fn default_java() -> String {
    "java".to_string()
}

fn default_properties() -> String {
    DEFAULT_PROPERTIES.to_string()
}

fn default_shell() -> String {
    "/bin/bash".to_string()
}

fn default_startup_timeout() -> u64 {
    DEFAULT_STARTUP_TIMEOUT_SECS
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            classpath: None,
            memory: default_memory(),
            annotators: AnnotatorSet::default(),
            java: default_java(),
            properties: default_properties(),
            shell: default_shell(),
            direct_spawn: false,
            startup_timeout_secs: default_startup_timeout(),
            request_timeout_secs: None,
            dictionary: None,
            source_path: None,
        }
    }
}

impl TokenizerConfig {
    /// Defaults with environment overrides applied.
    pub fn default_with_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Discover a config file via prefer, falling back to defaults.
    pub async fn load() -> Self {
        // Use prefer for file discovery, then parse with serde
        match prefer::load(CONFIG_NAME).await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Ignoring config file: {}", e);
                            Self::default_with_env()
                        }
                    }
                } else {
                    Self::default_with_env()
                }
            }
            Err(_) => {
                // No config file found, use defaults with env overrides
                Self::default_with_env()
            }
        }
    }

    /// Load from an explicit path. The format follows the file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config.with_env_overrides())
    }

    fn parse(contents: &str, ext: &str) -> Result<Self, String> {
        match ext {
            "toml" => toml::from_str(contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e)),
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// `CORENLP_*` variables win over the file. The generic `CLASSPATH` is
    /// only used when no classpath is configured at all.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|s| !s.is_empty());

        if let Some(classpath) = var("CORENLP_CLASSPATH") {
            tracing::debug!("Using CORENLP_CLASSPATH from environment: {}", classpath);
            self.classpath = Some(classpath);
        } else if self.classpath.is_none() {
            self.classpath = var("CLASSPATH");
        }

        if let Some(memory) = var("CORENLP_MEMORY") {
            self.memory = memory;
        }
        if let Some(java) = var("CORENLP_JAVA") {
            self.java = java;
        }
        if let Some(dictionary) = var("CORENLP_ZH_DICT") {
            self.dictionary = Some(PathBuf::from(dictionary));
        }
        if let Some(raw) = var("CORENLP_REQUEST_TIMEOUT") {
            match raw.parse::<u64>() {
                Ok(secs) => self.request_timeout_secs = Some(secs),
                Err(_) => tracing::warn!("Ignoring invalid CORENLP_REQUEST_TIMEOUT: {}", raw),
            }
        }

        self
    }

    /// Classpath with a leading `~` expanded.
    pub fn resolved_classpath(&self) -> Option<String> {
        self.classpath
            .as_deref()
            .map(|cp| shellexpand::tilde(cp).into_owned())
    }

    /// Dictionary path with a leading `~` expanded.
    pub fn resolved_dictionary(&self) -> Option<PathBuf> {
        self.dictionary
            .as_ref()
            .map(|p| PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).as_ref()))
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotators::Annotator;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = TokenizerConfig::default();
        assert_eq!(config.memory, "2g");
        assert_eq!(config.shell, "/bin/bash");
        assert_eq!(config.startup_timeout(), Duration::from_secs(60));
        assert!(config.request_timeout().is_none());
        assert!(config.annotators.is_empty());
    }

    #[test]
    fn test_parse_formats() {
        let toml = r#"
            classpath = "/opt/corenlp/*"
            annotators = ["ner"]
            request_timeout_secs = 30
        "#;
        let config = TokenizerConfig::parse(toml, "toml").unwrap();
        assert_eq!(config.classpath.as_deref(), Some("/opt/corenlp/*"));
        assert!(config.annotators.contains(Annotator::Ner));
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.memory, "2g");

        let yaml = "memory: 4g\ndirect_spawn: true\n";
        let config = TokenizerConfig::parse(yaml, "yml").unwrap();
        assert_eq!(config.memory, "4g");
        assert!(config.direct_spawn);

        let json = r#"{"annotators": ["pos", "lemma"]}"#;
        let config = TokenizerConfig::parse(json, "json").unwrap();
        assert!(config.annotators.contains(Annotator::Lemma));

        assert!(TokenizerConfig::parse(r#"{"annotators": ["parse"]}"#, "json").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let config = TokenizerConfig {
            classpath: Some("/from/file/*".to_string()),
            ..Default::default()
        };

        // CLASSPATH never replaces a configured classpath
        let same = config
            .clone()
            .with_overrides_from(env(&[("CLASSPATH", "/generic/*")]));
        assert_eq!(same.classpath.as_deref(), Some("/from/file/*"));

        let overridden = config.with_overrides_from(env(&[
            ("CORENLP_CLASSPATH", "/from/env/*"),
            ("CORENLP_MEMORY", "8g"),
            ("CORENLP_REQUEST_TIMEOUT", "15"),
        ]));
        assert_eq!(overridden.classpath.as_deref(), Some("/from/env/*"));
        assert_eq!(overridden.memory, "8g");
        assert_eq!(overridden.request_timeout_secs, Some(15));
    }

    #[test]
    fn test_env_fallbacks() {
        let config = TokenizerConfig::default().with_overrides_from(env(&[
            ("CLASSPATH", "/generic/*"),
            ("CORENLP_REQUEST_TIMEOUT", "soon"),
            ("CORENLP_MEMORY", ""),
        ]));
        assert_eq!(config.classpath.as_deref(), Some("/generic/*"));
        assert!(config.request_timeout_secs.is_none());
        assert_eq!(config.memory, "2g");
    }

    #[tokio::test]
    async fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corenlp-zh.toml");
        std::fs::write(&path, "memory = \"3g\"\nstartup_timeout_secs = 5\n").unwrap();

        let config = TokenizerConfig::load_from_path(&path).await.unwrap();
        assert_eq!(config.memory, "3g");
        assert_eq!(config.startup_timeout_secs, 5);
        assert_eq!(config.source_path.as_deref(), Some(path.as_path()));

        let missing = dir.path().join("missing.toml");
        assert!(TokenizerConfig::load_from_path(&missing).await.is_err());
    }
}
