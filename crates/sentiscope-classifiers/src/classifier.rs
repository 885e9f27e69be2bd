//! Classifier trait and raw prediction type

use async_trait::async_trait;
use sentiscope_core::Result;
use serde::{Deserialize, Serialize};

/// A loaded text classifier for one language.
///
/// Implementations own their model and tokenizer. The only capability exposed
/// is turning a piece of text into a single top prediction.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    /// Classify the given text
    async fn classify(&self, text: &str) -> Result<RawPrediction>;

    /// Get the classifier name
    fn name(&self) -> &str;
}

/// Unprocessed output of a classifier: its top label and confidence.
///
/// Both fields are optional because model label vocabularies and output
/// shapes vary; consumers default a missing label to neutral and a missing
/// score to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPrediction {
    /// Label in the model's own vocabulary, e.g. `LABEL_0`
    #[serde(default)]
    pub label: Option<String>,

    /// Confidence of the label (0.0-1.0)
    #[serde(default)]
    pub score: Option<f64>,
}

impl RawPrediction {
    /// Create a prediction with both label and score present
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: Some(label.into()),
            score: Some(score),
        }
    }

    /// Confidence score, `0.0` when the classifier did not report one
    pub fn score_or_zero(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }
}
