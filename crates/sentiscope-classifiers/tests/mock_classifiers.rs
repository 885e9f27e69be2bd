//! Mock classifiers for testing
//!
//! Configurable implementations of the classifier and loader traits used to
//! exercise the cache and service without model weights.

use async_trait::async_trait;
use sentiscope_classifiers::{
    ClassifierLoader, LanguageModelCache, RawPrediction, SentimentLabel, SentimentService,
    TextClassifier,
};
use sentiscope_core::{Error, LanguageTable, ModelSource, Result, SupportedLanguage};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A keyword-driven mock classifier
pub struct MockClassifier {
    name: String,
    score: Option<f64>,
    call_count: AtomicU32,
}

impl MockClassifier {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            score: Some(0.9),
            call_count: AtomicU32::new(0),
        }
    }

    /// Set the score this classifier will report (`None` omits it)
    pub fn with_score(mut self, score: Option<f64>) -> Self {
        self.score = score;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TextClassifier for MockClassifier {
    async fn classify(&self, text: &str) -> Result<RawPrediction> {
        self.call_count.fetch_add(1, Ordering::Relaxed);

        let text = text.to_lowercase();
        let label = if text.contains("love") || text.contains("liebe") {
            "LABEL_0"
        } else if text.contains("hate") || text.contains("odio") {
            "LABEL_2"
        } else {
            "LABEL_1"
        };

        Ok(RawPrediction {
            label: Some(label.to_string()),
            score: self.score,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A classifier whose inference always fails
pub struct FailingClassifier;

#[async_trait]
impl TextClassifier for FailingClassifier {
    async fn classify(&self, _text: &str) -> Result<RawPrediction> {
        Err(Error::classifier("forward pass failed"))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Loader producing [`MockClassifier`]s, optionally slow, optionally failing
/// for one language
#[derive(Default)]
pub struct MockLoader {
    loads: AtomicU32,
    latency: Option<Duration>,
    broken_language: Option<String>,
    failing_inference: bool,
    score: Option<Option<f64>>,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn broken_for(mut self, code: &str) -> Self {
        self.broken_language = Some(code.to_string());
        self
    }

    pub fn with_failing_inference(mut self) -> Self {
        self.failing_inference = true;
        self
    }

    pub fn with_score(mut self, score: Option<f64>) -> Self {
        self.score = Some(score);
        self
    }

    pub fn loads(&self) -> u32 {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClassifierLoader for MockLoader {
    async fn load(&self, language: &SupportedLanguage) -> Result<Box<dyn TextClassifier>> {
        self.loads.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.broken_language.as_deref() == Some(language.code.as_str()) {
            return Err(Error::classifier(format!(
                "Model path does not exist: {}",
                language.model
            )));
        }

        if self.failing_inference {
            return Ok(Box::new(FailingClassifier));
        }

        let mut classifier = MockClassifier::new(&format!("mock-{}", language.code));
        if let Some(score) = self.score {
            classifier = classifier.with_score(score);
        }
        Ok(Box::new(classifier))
    }
}

fn languages() -> Arc<LanguageTable> {
    Arc::new(
        LanguageTable::new(
            [
                SupportedLanguage::new("de", "German", ModelSource::local("models/german")),
                SupportedLanguage::new("en", "English", ModelSource::local("models/english")),
                SupportedLanguage::new("es", "Spanish", ModelSource::local("models/spanish")),
            ],
            "en",
        )
        .unwrap(),
    )
}

fn service_with(loader: Arc<MockLoader>) -> SentimentService {
    SentimentService::new(Arc::new(LanguageModelCache::new(languages(), loader)))
}

#[tokio::test]
async fn test_mock_classifier_counts_calls() {
    let classifier = MockClassifier::new("mock");
    assert_eq!(classifier.call_count(), 0);

    let raw = classifier.classify("I love this").await.unwrap();
    assert_eq!(raw.label.as_deref(), Some("LABEL_0"));
    assert_eq!(classifier.call_count(), 1);
}

#[tokio::test]
async fn test_round_trip_single_nonzero_score() {
    let service = service_with(Arc::new(MockLoader::new()));

    let cases = [
        ("I love this", "en", SentimentLabel::Positive),
        ("Ich liebe es", "de", SentimentLabel::Positive),
        ("Lo odio", "es", SentimentLabel::Negative),
        ("I hate Mondays", "fr", SentimentLabel::Negative),
        ("The bus is at noon", "en", SentimentLabel::Neutral),
    ];

    for (text, lang, expected) in cases {
        let result = service.classify(text, Some(lang)).await.unwrap();
        assert_eq!(result.label, expected, "text: {}", text);

        let nonzero: Vec<_> = result.scores.iter().filter(|(_, s)| *s != 0.0).collect();
        assert_eq!(nonzero.len(), 1, "text: {}", text);
        assert_eq!(nonzero[0].0, result.label);
        assert_eq!(result.scores.total(), 0.9);
    }
}

#[tokio::test]
async fn test_missing_score_becomes_zero() {
    let service = service_with(Arc::new(MockLoader::new().with_score(None)));

    let result = service.classify("I love this", Some("en")).await.unwrap();
    assert_eq!(result.label, SentimentLabel::Positive);
    assert_eq!(result.scores.total(), 0.0);
    assert!(result.raw.score.is_none());
}

#[tokio::test]
async fn test_broken_language_fails_without_affecting_others() {
    let loader = Arc::new(MockLoader::new().broken_for("de"));
    let service = service_with(loader.clone());

    let err = service.classify("Gut", Some("de")).await.unwrap_err();
    assert!(matches!(err, Error::Classifier(_)));
    assert!(err.to_string().contains("models/german"));

    assert_eq!(service.classify("Good", Some("en")).await.unwrap().lang, "en");

    // Still retried on the next request
    assert!(service.classify("Gut", Some("de")).await.is_err());
    assert_eq!(loader.loads(), 3);
    assert_eq!(service.cache().loaded_languages(), vec!["en"]);
}

#[tokio::test]
async fn test_inference_failure_propagates_and_keeps_handle() {
    let loader = Arc::new(MockLoader::new().with_failing_inference());
    let service = service_with(loader.clone());

    let err = service.classify("anything", Some("es")).await.unwrap_err();
    assert!(err.to_string().contains("forward pass failed"));
    assert!(service.cache().is_loaded("es"));

    assert!(service.classify("anything", Some("es")).await.is_err());
    assert_eq!(loader.loads(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_load() {
    let loader = Arc::new(MockLoader::new().with_latency(Duration::from_millis(100)));
    let service = Arc::new(service_with(loader.clone()));

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .classify(&format!("request {}", i), Some("de"))
                    .await
            })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        assert_eq!(result.unwrap().unwrap().lang, "de");
    }
    assert_eq!(loader.loads(), 1);
}
