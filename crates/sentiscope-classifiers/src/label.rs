//! Three-class sentiment schema and raw label normalization

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical sentiment class returned by the service
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 3] = [Self::Positive, Self::Neutral, Self::Negative];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "neutral" => Ok(Self::Neutral),
            "negative" => Ok(Self::Negative),
            other => Err(format!("Unknown sentiment label: {}", other)),
        }
    }
}

/// Map a raw model label onto the three-class schema.
///
/// The models emit `LABEL_0` / `LABEL_1` / `LABEL_2` for positive / neutral /
/// negative. Matching is by substring on the trimmed, lower-cased label, in
/// that order. Anything else, including a missing label, is neutral.
pub fn normalize_label(raw: Option<&str>) -> SentimentLabel {
    let label = raw.unwrap_or_default().trim().to_lowercase();

    if label.contains("label_0") {
        SentimentLabel::Positive
    } else if label.contains("label_1") {
        SentimentLabel::Neutral
    } else if label.contains("label_2") {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

/// Score per sentiment class
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

impl SentimentScores {
    /// All mass on `label`, zero elsewhere
    pub fn concentrated(label: SentimentLabel, score: f64) -> Self {
        let mut scores = Self::default();
        *scores.get_mut(label) = score;
        scores
    }

    pub fn get(&self, label: SentimentLabel) -> f64 {
        match label {
            SentimentLabel::Positive => self.positive,
            SentimentLabel::Neutral => self.neutral,
            SentimentLabel::Negative => self.negative,
        }
    }

    fn get_mut(&mut self, label: SentimentLabel) -> &mut f64 {
        match label {
            SentimentLabel::Positive => &mut self.positive,
            SentimentLabel::Neutral => &mut self.neutral,
            SentimentLabel::Negative => &mut self.negative,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SentimentLabel, f64)> + '_ {
        SentimentLabel::ALL.into_iter().map(|label| (label, self.get(label)))
    }

    pub fn total(&self) -> f64 {
        self.positive + self.neutral + self.negative
    }
}
