//! Candle-backed sequence classifiers built from Hugging Face model directories
//!
//! A model directory holds `config.json`, `tokenizer.json` (or `vocab.txt`)
//! and `model.safetensors`. The `model_type` in `config.json` picks the
//! architecture; `id2label` names the outputs.

use crate::classifier::{RawPrediction, TextClassifier};
use crate::loader_plugin::ClassifierLoader;
use crate::model_config::{InferenceConfig, ModelHeader};
use async_trait::async_trait;
use candle_core::{DType, Device, IndexOp, Tensor, D};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::xlm_roberta::{
    Config as XlmRobertaConfig, XLMRobertaForSequenceClassification,
};
use hf_hub::{api::sync::Api, Repo, RepoType};
use sentiscope_core::{Error, ModelSource, Result, SupportedLanguage};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokenizers::{Tokenizer, TruncationParams};

/// Files fetched from the hub for every model
const HUB_FILES: [&str; 3] = ["config.json", "tokenizer.json", "model.safetensors"];

/// Loads one [`CandleSequenceClassifier`] per language from its model source
#[derive(Debug, Clone, Default)]
pub struct CandleModelLoader {
    inference: InferenceConfig,
}

impl CandleModelLoader {
    pub fn new(inference: InferenceConfig) -> Self {
        Self { inference }
    }

    pub fn inference(&self) -> &InferenceConfig {
        &self.inference
    }
}

#[async_trait]
impl ClassifierLoader for CandleModelLoader {
    async fn load(&self, language: &SupportedLanguage) -> Result<Box<dyn TextClassifier>> {
        let language = language.clone();
        let inference = self.inference.clone();

        // Weight mapping and hub downloads block
        let classifier =
            run_blocking("Model loading", move || load_sequence_classifier(&language, &inference))
                .await?;

        Ok(Box::new(classifier))
    }
}

/// Build the classifier for `language` synchronously
pub fn load_sequence_classifier(
    language: &SupportedLanguage,
    inference: &InferenceConfig,
) -> Result<CandleSequenceClassifier> {
    tracing::info!(
        "Loading model for '{}' ({}) from {}",
        language.code,
        language.name,
        language.model
    );

    let model_dir = resolve_model_dir(&language.model)?;
    let header: ModelHeader = parse_json_config(&model_dir.join("config.json"))?;
    let architecture = Architecture::from_model_type(&header.model_type)?;

    let mut labels = header.labels()?;
    if labels.is_empty() {
        // Hugging Face default for configs without num_labels/id2label
        labels = vec!["LABEL_0".to_string(), "LABEL_1".to_string()];
    }

    let mut tokenizer = load_tokenizer(&model_dir)?;
    configure_truncation(&mut tokenizer, inference.max_length)?;
    let device = get_device(&inference.device)?;
    let vb = load_var_builder(&model_dir, &device)?;

    let model = match architecture {
        Architecture::Bert => {
            let config: BertConfig = parse_json_config(&model_dir.join("config.json"))?;
            load_bert_sequence_model(&vb, &config, labels.len())?
        }
        Architecture::XlmRoberta => {
            let config: XlmRobertaConfig = parse_json_config(&model_dir.join("config.json"))?;
            load_xlm_roberta_sequence_model(&vb, &config, labels.len())?
        }
    };

    tracing::info!(
        "Loaded {} classifier for '{}' with labels {:?}",
        architecture.as_str(),
        language.code,
        labels
    );

    Ok(CandleSequenceClassifier {
        name: format!("{}:{}", language.code, language.model),
        runner: Arc::new(SequenceRunner {
            tokenizer,
            model,
            device,
            labels,
        }),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Architecture {
    Bert,
    XlmRoberta,
}

impl Architecture {
    fn from_model_type(model_type: &str) -> Result<Self> {
        match model_type.to_lowercase().replace('_', "-").as_str() {
            "bert" => Ok(Self::Bert),
            "xlm-roberta" => Ok(Self::XlmRoberta),
            other => Err(Error::classifier(format!(
                "Unsupported model_type '{}' (supported: bert, xlm-roberta)",
                other
            ))),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Bert => "BERT",
            Self::XlmRoberta => "XLM-RoBERTa",
        }
    }
}

fn resolve_model_dir(source: &ModelSource) -> Result<PathBuf> {
    match source {
        ModelSource::Local { path } => {
            if !path.is_dir() {
                return Err(Error::classifier(format!(
                    "Model path does not exist: {}",
                    path.display()
                )));
            }
            Ok(path.clone())
        }
        ModelSource::HuggingFace { repo, revision } => download_from_huggingface(repo, revision),
    }
}

fn download_from_huggingface(repo: &str, revision: &str) -> Result<PathBuf> {
    tracing::info!("Downloading model from HuggingFace: {} @ {}", repo, revision);

    let api = Api::new().map_err(|e| {
        Error::classifier(format!("Failed to initialize HuggingFace API: {}", e))
    })?;
    let repo_obj = api.repo(Repo::with_revision(
        repo.to_string(),
        RepoType::Model,
        revision.to_string(),
    ));

    let mut snapshot_dir = None;
    for file in HUB_FILES {
        tracing::debug!("Fetching {} from {}", file, repo);
        let path = repo_obj
            .get(file)
            .map_err(|e| Error::classifier(format!("Failed to download {}: {}", file, e)))?;
        if snapshot_dir.is_none() {
            snapshot_dir = path.parent().map(Path::to_path_buf);
        }
    }

    snapshot_dir.ok_or_else(|| Error::classifier("Invalid hub cache path"))
}

fn get_device(device: &str) -> Result<Device> {
    match device.to_lowercase().as_str() {
        "cuda" | "cuda:0" => Device::new_cuda(0)
            .map_err(|e| Error::classifier(format!("Failed to initialize CUDA: {}", e))),
        "mps" | "metal" => Device::new_metal(0)
            .map_err(|e| Error::classifier(format!("Failed to initialize Metal: {}", e))),
        "cpu" => Ok(Device::Cpu),
        other => Err(Error::config(format!("Unknown inference device '{}'", other))),
    }
}

fn parse_json_config<T: DeserializeOwned>(config_path: &Path) -> Result<T> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        Error::classifier(format!(
            "Failed to read config {}: {}",
            config_path.display(),
            e
        ))
    })?;

    serde_json::from_str(&config_str).map_err(|e| {
        Error::classifier(format!(
            "Failed to parse config {}: {}",
            config_path.display(),
            e
        ))
    })
}

fn load_tokenizer(model_dir: &Path) -> Result<Tokenizer> {
    let tokenizer_json_path = model_dir.join("tokenizer.json");
    if tokenizer_json_path.exists() {
        tracing::debug!("Loading tokenizer from tokenizer.json");
        return Tokenizer::from_file(&tokenizer_json_path)
            .map_err(|e| Error::classifier(format!("Failed to load tokenizer.json: {}", e)));
    }

    let vocab_path = model_dir.join("vocab.txt");
    if vocab_path.exists() {
        tracing::debug!("Building tokenizer from vocab.txt");

        use tokenizers::models::wordpiece::WordPiece;
        use tokenizers::normalizers::BertNormalizer;
        use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
        use tokenizers::processors::bert::BertProcessing;

        let wordpiece = WordPiece::from_file(vocab_path.to_string_lossy().as_ref())
            .unk_token("[UNK]".to_string())
            .build()
            .map_err(|e| Error::classifier(format!("Failed to build WordPiece model: {}", e)))?;

        let mut tokenizer = Tokenizer::new(wordpiece);
        tokenizer.with_normalizer(Some(BertNormalizer::default()));
        tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));
        tokenizer.with_post_processor(Some(BertProcessing::new(
            ("[SEP]".to_string(), 102),
            ("[CLS]".to_string(), 101),
        )));

        return Ok(tokenizer);
    }

    Err(Error::classifier(format!(
        "No tokenizer found in {} (tried tokenizer.json, vocab.txt)",
        model_dir.display()
    )))
}

/// Cap inputs at `max_length` tokens, counting the special tokens the
/// post-processor adds so `[CLS]`/`[SEP]` survive truncation
fn configure_truncation(tokenizer: &mut Tokenizer, max_length: usize) -> Result<()> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| Error::classifier(format!("Invalid max_length {}: {}", max_length, e)))?;
    Ok(())
}

fn load_var_builder(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let weights_path = model_dir.join("model.safetensors");
    if !weights_path.exists() {
        return Err(Error::classifier(format!(
            "model.safetensors not found in {}",
            model_dir.display()
        )));
    }

    // SAFETY: the weights file is treated as immutable while mapped
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)
            .map_err(|e| Error::classifier(format!("Failed to load weights: {}", e)))?
    };

    Ok(vb)
}

fn load_bert_sequence_model(
    vb: &VarBuilder,
    config: &BertConfig,
    num_labels: usize,
) -> Result<SequenceModel> {
    let mut errors = Vec::new();

    for prefix in ["bert", ""] {
        let vb_prefix = if prefix.is_empty() {
            vb.clone()
        } else {
            vb.pp(prefix)
        };

        match BertModel::load(vb_prefix.clone(), config) {
            Ok(backbone) => {
                // Fine-tuned checkpoints ship the pooler; plain CLS otherwise
                let pooler = candle_nn::linear(
                    config.hidden_size,
                    config.hidden_size,
                    vb_prefix.pp("pooler").pp("dense"),
                )
                .ok();
                let head = candle_nn::linear(config.hidden_size, num_labels, vb.pp("classifier"))
                    .map_err(|e| {
                        Error::classifier(format!(
                            "Failed to load classification head ({} labels): {}",
                            num_labels, e
                        ))
                    })?;

                tracing::debug!(
                    "Loaded BERT backbone from '{}' (pooler: {})",
                    if prefix.is_empty() { "<root>" } else { prefix },
                    pooler.is_some()
                );
                return Ok(SequenceModel::Bert {
                    backbone,
                    pooler,
                    head,
                });
            }
            Err(e) => errors.push(format!(
                "{}: {}",
                if prefix.is_empty() { "<root>" } else { prefix },
                e
            )),
        }
    }

    Err(Error::classifier(format!(
        "Failed to load BERT backbone with tried prefixes [{}]",
        errors.join(" | ")
    )))
}

fn load_xlm_roberta_sequence_model(
    vb: &VarBuilder,
    config: &XlmRobertaConfig,
    num_labels: usize,
) -> Result<SequenceModel> {
    let mut errors = Vec::new();

    for prefix in ["", "model"] {
        let vb_prefix = if prefix.is_empty() {
            vb.clone()
        } else {
            vb.pp(prefix)
        };

        match XLMRobertaForSequenceClassification::new(num_labels, config, vb_prefix) {
            Ok(model) => {
                tracing::debug!(
                    "Loaded XLM-RoBERTa model from '{}'",
                    if prefix.is_empty() { "<root>" } else { prefix }
                );
                return Ok(SequenceModel::XlmRoberta(model));
            }
            Err(e) => errors.push(format!(
                "{}: {}",
                if prefix.is_empty() { "<root>" } else { prefix },
                e
            )),
        }
    }

    Err(Error::classifier(format!(
        "Failed to load XLM-RoBERTa sequence model with tried prefixes [{}]",
        errors.join(" | ")
    )))
}

enum SequenceModel {
    Bert {
        backbone: BertModel,
        pooler: Option<Linear>,
        head: Linear,
    },
    XlmRoberta(XLMRobertaForSequenceClassification),
}

impl SequenceModel {
    fn logits(
        &self,
        input_ids: &Tensor,
        attention_mask: &Tensor,
        token_type_ids: &Tensor,
    ) -> candle_core::Result<Tensor> {
        match self {
            Self::Bert {
                backbone,
                pooler,
                head,
            } => {
                // Single unpadded sequence, so no mask is needed
                let hidden_states = backbone.forward(input_ids, token_type_ids, None)?;
                let cls = hidden_states.i((.., 0))?;
                let pooled = match pooler {
                    Some(pooler) => pooler.forward(&cls)?.tanh()?,
                    None => cls,
                };
                head.forward(&pooled)
            }
            Self::XlmRoberta(model) => model.forward(input_ids, attention_mask, token_type_ids),
        }
    }
}

/// A sentiment model and its tokenizer for a single language
pub struct CandleSequenceClassifier {
    name: String,
    runner: Arc<SequenceRunner>,
}

impl CandleSequenceClassifier {
    /// Output label vocabulary, ordered by class index
    pub fn labels(&self) -> &[String] {
        &self.runner.labels
    }
}

struct SequenceRunner {
    tokenizer: Tokenizer,
    model: SequenceModel,
    device: Device,
    labels: Vec<String>,
}

impl SequenceRunner {
    fn predict(&self, text: &str) -> Result<RawPrediction> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| Error::classifier(format!("Tokenization failed: {}", e)))?;

        let input_ids = self.row_tensor(encoding.get_ids(), "input ids")?;
        let attention_mask = self.row_tensor(encoding.get_attention_mask(), "attention mask")?;
        let token_type_ids = self.row_tensor(encoding.get_type_ids(), "token type ids")?;

        let logits = self
            .model
            .logits(&input_ids, &attention_mask, &token_type_ids)
            .map_err(|e| Error::classifier(format!("Model forward pass failed: {}", e)))?;

        let probs: Vec<f32> = candle_nn::ops::softmax(&logits, D::Minus1)
            .and_then(|probs| probs.squeeze(0))
            .and_then(|probs| probs.to_vec1::<f32>())
            .map_err(|e| Error::classifier(format!("Softmax failed: {}", e)))?;

        Ok(top_prediction(&self.labels, &probs))
    }

    fn row_tensor(&self, values: &[u32], what: &str) -> Result<Tensor> {
        Tensor::new(values, &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| Error::classifier(format!("Failed to create {} tensor: {}", what, e)))
    }
}

#[async_trait]
impl TextClassifier for CandleSequenceClassifier {
    async fn classify(&self, text: &str) -> Result<RawPrediction> {
        let runner = Arc::clone(&self.runner);
        let text = text.to_string();

        // The forward pass is CPU/GPU bound
        run_blocking("Inference", move || runner.predict(&text)).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Run `f` on the blocking thread pool, keeping async workers free
async fn run_blocking<T, F>(task: &str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::internal(format!("{} task failed: {}", task, e)))?
}

/// Arg-max over class probabilities
fn top_prediction(labels: &[String], probs: &[f32]) -> RawPrediction {
    let best = probs
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    match best {
        Some((idx, prob)) => RawPrediction {
            label: Some(
                labels
                    .get(idx)
                    .cloned()
                    .unwrap_or_else(|| format!("LABEL_{}", idx)),
            ),
            score: Some(f64::from(*prob)),
        },
        None => RawPrediction::default(),
    }
}
