//! Extension point for constructing per-language classifiers.

use crate::classifier::TextClassifier;
use sentiscope_core::{Result, SupportedLanguage};

/// Builds the classifier that serves one language.
///
/// The model cache calls this at most once per language at a time, and again
/// only if a previous attempt failed. Implementations may be slow (reading
/// weights, downloading from the hub); they must not cache results
/// themselves.
#[async_trait::async_trait]
pub trait ClassifierLoader: Send + Sync {
    /// Construct a fresh classifier for `language`.
    async fn load(&self, language: &SupportedLanguage) -> Result<Box<dyn TextClassifier>>;
}
