//! Sentiscope Classifiers
//!
//! Per-language sentiment classification:
//! - [`TextClassifier`]: the narrow capability every model exposes
//! - [`LanguageModelCache`]: lazily builds and memoizes one classifier per language
//! - [`normalize_label`]: maps raw model labels onto positive / neutral / negative
//! - [`SentimentService`]: validation, routing and response assembly
//!
//! Real models are built by [`CandleModelLoader`]; tests substitute their own
//! [`ClassifierLoader`].

pub mod cache;
pub mod classifier;
pub mod label;
pub mod loader_plugin;
pub mod model_config;
pub mod model_loader;
pub mod service;

pub use cache::{ClassifierHandle, LanguageModelCache};
pub use classifier::{RawPrediction, TextClassifier};
pub use label::{normalize_label, SentimentLabel, SentimentScores};
pub use loader_plugin::ClassifierLoader;
pub use model_config::InferenceConfig;
pub use model_loader::{CandleModelLoader, CandleSequenceClassifier};
pub use service::{ClassificationResult, SentimentService, EMPTY_TEXT};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cache::{ClassifierHandle, LanguageModelCache};
    pub use crate::classifier::{RawPrediction, TextClassifier};
    pub use crate::label::{SentimentLabel, SentimentScores};
    pub use crate::loader_plugin::ClassifierLoader;
    pub use crate::service::{ClassificationResult, SentimentService};
}
