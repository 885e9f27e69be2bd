//! Sentiment classification over the per-language model cache

use crate::cache::LanguageModelCache;
use crate::classifier::RawPrediction;
use crate::label::{normalize_label, SentimentLabel, SentimentScores};
use sentiscope_core::{Error, LanguageTable, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Message of the validation error for blank input
pub const EMPTY_TEXT: &str = "Empty text";

/// Outcome of classifying one piece of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Supported language code the request resolved to
    pub lang: String,

    /// Normalized sentiment
    pub label: SentimentLabel,

    /// Confidence at `label`, zero for the other classes
    pub scores: SentimentScores,

    /// Classifier output before normalization
    pub raw: RawPrediction,
}

/// Validates requests, routes them to the right language's classifier and
/// maps the raw output onto the three-class schema.
#[derive(Debug, Clone)]
pub struct SentimentService {
    cache: Arc<LanguageModelCache>,
}

impl SentimentService {
    pub fn new(cache: Arc<LanguageModelCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<LanguageModelCache> {
        &self.cache
    }

    pub fn languages(&self) -> &Arc<LanguageTable> {
        self.cache.languages()
    }

    /// Classify `text` with the model for `lang`.
    ///
    /// An absent, empty or unsupported `lang` uses the default language.
    /// Blank text is rejected with [`Error::InvalidInput`] before any model is
    /// loaded.
    pub async fn classify(&self, text: &str, lang: Option<&str>) -> Result<ClassificationResult> {
        let language = self.languages().resolve_opt(lang);

        let text = text.trim();
        if text.is_empty() {
            return Err(Error::invalid_input(EMPTY_TEXT));
        }

        let start = Instant::now();
        let handle = self.cache.get_classifier(&language.code).await?;
        let raw = handle.classify(text).await?;

        let label = normalize_label(raw.label.as_deref());
        let score = raw.score_or_zero();
        let scores = SentimentScores::concentrated(label, score);

        let elapsed = start.elapsed();
        metrics::histogram!(
            "sentiscope_classification_latency_us",
            "language" => language.code.clone()
        )
        .record(elapsed.as_micros() as f64);
        tracing::debug!(
            language = %language.code,
            label = %label,
            score,
            latency_us = elapsed.as_micros() as u64,
            "Classified text"
        );

        Ok(ClassificationResult {
            lang: language.code.clone(),
            label,
            scores,
            raw,
        })
    }
}
