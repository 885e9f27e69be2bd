//! Server configuration

use crate::cli::Cli;
use sentiscope_classifiers::InferenceConfig;
use sentiscope_core::{LanguageTable, ModelSource, SupportedLanguage};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Fallback language code
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Languages whose models are loaded at startup
    #[serde(default)]
    pub preload: Vec<String>,

    /// Inference settings applied to every model
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Supported languages and their models
    #[serde(default = "default_languages")]
    pub languages: Vec<SupportedLanguage>,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            Self::from_yaml(&content)?
        } else {
            tracing::info!("No config file at {}, using built-in defaults", config_path);
            Self::default()
        };

        config.apply_overrides(cli);
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply CLI overrides
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(listen) = &cli.listen {
            self.listen = listen.clone();
        }

        if let Some(port) = cli.port {
            self.port = port;
        }

        if let Some(default_language) = &cli.default_language {
            self.default_language = default_language.clone();
        }

        if !cli.preload.is_empty() {
            self.preload = cli.preload.clone();
        }

        if let Some(device) = &cli.device {
            self.inference.device = device.clone();
        }
    }

    /// Validate the configured languages into the immutable lookup table
    pub fn language_table(&self) -> sentiscope_core::Result<LanguageTable> {
        LanguageTable::new(self.languages.iter().cloned(), &self.default_language)
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.listen, self.port).parse()?)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            default_language: default_language(),
            preload: Vec::new(),
            inference: InferenceConfig::default(),
            languages: default_languages(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_language() -> String {
    "en".to_string()
}

fn default_languages() -> Vec<SupportedLanguage> {
    vec![
        SupportedLanguage::new("de", "German", ModelSource::local("models/german")),
        SupportedLanguage::new("en", "English", ModelSource::local("models/english")),
        SupportedLanguage::new("es", "Spanish", ModelSource::local("models/spanish")),
    ]
}
