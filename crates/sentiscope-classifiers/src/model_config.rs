//! Inference settings and the subset of a model's `config.json` we read

use sentiscope_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Upper bound on the output classes a classification head may declare
pub const MAX_LABELS: usize = 1024;

/// Inference configuration shared by every language's model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Device to run on (cpu, cuda, metal/mps)
    #[serde(default = "default_device")]
    pub device: String,

    /// Maximum sequence length
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_max_length() -> usize {
    512
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            max_length: default_max_length(),
        }
    }
}

/// Fields of a Hugging Face `config.json` needed to pick an architecture and
/// name the output labels. The architecture-specific config is parsed
/// separately from the same file.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelHeader {
    pub model_type: String,

    #[serde(default)]
    pub id2label: Option<HashMap<String, String>>,

    #[serde(default)]
    pub num_labels: Option<usize>,
}

impl ModelHeader {
    /// Output label vocabulary ordered by class index.
    ///
    /// Indices missing from `id2label` are named `LABEL_<i>`. A vocabulary
    /// larger than [`MAX_LABELS`] is a classifier error.
    pub fn labels(&self) -> Result<Vec<String>> {
        let mut by_index: HashMap<usize, String> = HashMap::new();
        if let Some(id2label) = &self.id2label {
            for (idx, label) in id2label {
                if let Ok(idx) = idx.trim().parse::<usize>() {
                    by_index.insert(idx, label.clone());
                }
            }
        }

        let from_id2label = match by_index.keys().max() {
            Some(max) => max.checked_add(1).ok_or_else(|| too_many_labels(*max))?,
            None => 0,
        };
        let count = self.num_labels.unwrap_or(0).max(from_id2label);
        if count > MAX_LABELS {
            return Err(too_many_labels(count));
        }

        Ok((0..count)
            .map(|idx| {
                by_index
                    .remove(&idx)
                    .unwrap_or_else(|| format!("LABEL_{}", idx))
            })
            .collect())
    }
}

fn too_many_labels(count: usize) -> Error {
    Error::classifier(format!(
        "Model config declares {} labels (at most {} supported)",
        count, MAX_LABELS
    ))
}
