//! Supported languages and the model each one is served by

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Where a language's model weights and tokenizer live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelSource {
    /// Model directory on the local filesystem
    Local { path: PathBuf },

    /// Repository on the Hugging Face Hub
    HuggingFace {
        repo: String,
        #[serde(default = "default_revision")]
        revision: String,
    },
}

fn default_revision() -> String {
    "main".to_string()
}

impl ModelSource {
    /// Local model directory
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local { path: path.into() }
    }

    /// Hugging Face Hub repository at its `main` revision
    pub fn hugging_face(repo: impl Into<String>) -> Self {
        Self::HuggingFace {
            repo: repo.into(),
            revision: default_revision(),
        }
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { path } => write!(f, "{}", path.display()),
            Self::HuggingFace { repo, revision } => write!(f, "hf://{}@{}", repo, revision),
        }
    }
}

/// A language the service can classify, with its display name and model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedLanguage {
    /// Short language code, e.g. `en`
    pub code: String,

    /// Human-readable name shown in the UI
    pub name: String,

    /// Model used for this language
    pub model: ModelSource,
}

impl SupportedLanguage {
    pub fn new(code: impl Into<String>, name: impl Into<String>, model: ModelSource) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            model,
        }
    }
}

/// The fixed set of supported languages plus the fallback code.
///
/// Built once at startup and never mutated. Lookups normalize the requested
/// code (trim + lower-case) and fall back to the default language for codes
/// outside the set.
#[derive(Debug, Clone)]
pub struct LanguageTable {
    languages: BTreeMap<String, SupportedLanguage>,
    default_code: String,
}

impl LanguageTable {
    /// Build and validate a language table
    pub fn new(
        languages: impl IntoIterator<Item = SupportedLanguage>,
        default_code: &str,
    ) -> Result<Self> {
        let mut table = BTreeMap::new();

        for mut language in languages {
            let code = normalize_code(&language.code);
            if code.is_empty() {
                return Err(Error::config(format!(
                    "Language '{}' has an empty code",
                    language.name
                )));
            }
            language.code = code.clone();
            if table.insert(code.clone(), language).is_some() {
                return Err(Error::config(format!("Duplicate language code '{}'", code)));
            }
        }

        if table.is_empty() {
            return Err(Error::config("At least one language must be configured"));
        }

        let default_code = normalize_code(default_code);
        if !table.contains_key(&default_code) {
            return Err(Error::config(format!(
                "Default language '{}' is not among the supported languages [{}]",
                default_code,
                table.keys().cloned().collect::<Vec<_>>().join(", ")
            )));
        }

        Ok(Self {
            languages: table,
            default_code,
        })
    }

    /// Resolve a requested code to a supported language.
    ///
    /// Empty and unknown codes resolve to the default language.
    pub fn resolve(&self, code: &str) -> &SupportedLanguage {
        let code = normalize_code(code);
        if code.is_empty() {
            return self.default_language();
        }

        match self.languages.get(&code) {
            Some(language) => language,
            None => {
                tracing::debug!(
                    "Unsupported language '{}', using default '{}'",
                    code,
                    self.default_code
                );
                self.default_language()
            }
        }
    }

    /// Like [`resolve`](Self::resolve), treating an absent code as the default
    pub fn resolve_opt(&self, code: Option<&str>) -> &SupportedLanguage {
        match code {
            Some(code) => self.resolve(code),
            None => self.default_language(),
        }
    }

    /// Exact lookup of an already-normalized code
    pub fn get(&self, code: &str) -> Option<&SupportedLanguage> {
        self.languages.get(code)
    }

    /// Whether the (normalized) code is supported
    pub fn contains(&self, code: &str) -> bool {
        self.languages.contains_key(&normalize_code(code))
    }

    pub fn default_language(&self) -> &SupportedLanguage {
        // Checked in `new`
        &self.languages[&self.default_code]
    }

    pub fn default_code(&self) -> &str {
        &self.default_code
    }

    /// Languages ordered by code
    pub fn iter(&self) -> impl Iterator<Item = &SupportedLanguage> {
        self.languages.values()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

/// Trim and lower-case a language code
pub fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}
