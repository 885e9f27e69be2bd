//! Lazily populated, per-language classifier cache
//!
//! One slot exists per supported language, created together with the cache.
//! A slot is filled the first time its language is requested and then lives
//! as long as the cache. Unsupported codes resolve to the default language.

use crate::classifier::{RawPrediction, TextClassifier};
use crate::loader_plugin::ClassifierLoader;
use sentiscope_core::{LanguageTable, Result, SupportedLanguage};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;

/// Shared handle to the classifier serving one language.
///
/// Cloning is cheap; clones refer to the same underlying model instance.
#[derive(Clone)]
pub struct ClassifierHandle {
    language: Arc<str>,
    classifier: Arc<dyn TextClassifier>,
}

impl ClassifierHandle {
    fn new(language: &str, classifier: Arc<dyn TextClassifier>) -> Self {
        Self {
            language: Arc::from(language),
            classifier,
        }
    }

    /// Code of the language this handle serves
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Name reported by the underlying classifier
    pub fn name(&self) -> &str {
        self.classifier.name()
    }

    pub async fn classify(&self, text: &str) -> Result<RawPrediction> {
        self.classifier.classify(text).await
    }

    /// Whether both handles point at the same model instance
    pub fn same_instance(&self, other: &ClassifierHandle) -> bool {
        Arc::ptr_eq(&self.classifier, &other.classifier)
    }
}

impl fmt::Debug for ClassifierHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierHandle")
            .field("language", &self.language)
            .field("classifier", &self.classifier.name())
            .finish()
    }
}

/// Per-language classifier cache.
///
/// Construction of a language's classifier is serialized: concurrent first
/// requests for the same language share a single load. A failed load leaves
/// the slot empty so the next request tries again.
pub struct LanguageModelCache {
    languages: Arc<LanguageTable>,
    loader: Arc<dyn ClassifierLoader>,
    slots: HashMap<String, OnceCell<ClassifierHandle>>,
}

impl LanguageModelCache {
    /// Create an empty cache with one slot per supported language
    pub fn new(languages: Arc<LanguageTable>, loader: Arc<dyn ClassifierLoader>) -> Self {
        let slots = languages
            .codes()
            .map(|code| (code.to_string(), OnceCell::new()))
            .collect();

        Self {
            languages,
            loader,
            slots,
        }
    }

    pub fn languages(&self) -> &Arc<LanguageTable> {
        &self.languages
    }

    /// The supported language a requested code resolves to
    pub fn resolve(&self, code: &str) -> &SupportedLanguage {
        self.languages.resolve(code)
    }

    /// Get the classifier for a language, loading it on first use
    pub async fn get_classifier(&self, code: &str) -> Result<ClassifierHandle> {
        let language = self.languages.resolve(code);
        let slot = self.slot(&language.code);

        if let Some(handle) = slot.get() {
            return Ok(handle.clone());
        }

        let handle = slot
            .get_or_try_init(|| self.load(language))
            .await?;

        Ok(handle.clone())
    }

    /// Eagerly load the given languages
    pub async fn preload<S: AsRef<str>>(&self, codes: &[S]) -> Result<()> {
        for code in codes {
            self.get_classifier(code.as_ref()).await?;
        }
        Ok(())
    }

    /// Whether the language a code resolves to has a loaded classifier
    pub fn is_loaded(&self, code: &str) -> bool {
        let language = self.languages.resolve(code);
        self.slot(&language.code).initialized()
    }

    /// Codes of languages with a loaded classifier, ordered by code
    pub fn loaded_languages(&self) -> Vec<String> {
        self.languages
            .codes()
            .filter(|code| self.slot(code).initialized())
            .map(str::to_string)
            .collect()
    }

    /// Maximum number of cached classifiers
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, code: &str) -> &OnceCell<ClassifierHandle> {
        // Slots mirror the language table, and `code` comes from it
        &self.slots[code]
    }

    async fn load(&self, language: &SupportedLanguage) -> Result<ClassifierHandle> {
        let start = Instant::now();
        tracing::info!("Loading classifier for language '{}'", language.code);

        match self.loader.load(language).await {
            Ok(classifier) => {
                let classifier: Arc<dyn TextClassifier> = Arc::from(classifier);
                metrics::counter!(
                    "sentiscope_model_loads_total",
                    "language" => language.code.clone(),
                    "outcome" => "success"
                )
                .increment(1);
                tracing::info!(
                    "Classifier '{}' ready for '{}' in {:?}",
                    classifier.name(),
                    language.code,
                    start.elapsed()
                );
                Ok(ClassifierHandle::new(&language.code, classifier))
            }
            Err(e) => {
                metrics::counter!(
                    "sentiscope_model_loads_total",
                    "language" => language.code.clone(),
                    "outcome" => "failure"
                )
                .increment(1);
                tracing::warn!("Failed to load classifier for '{}': {}", language.code, e);
                Err(e)
            }
        }
    }
}

impl fmt::Debug for LanguageModelCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageModelCache")
            .field("languages", &self.languages.codes().collect::<Vec<_>>())
            .field("loaded", &self.loaded_languages())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sentiscope_core::{Error, ModelSource};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct EchoClassifier {
        name: String,
    }

    #[async_trait]
    impl TextClassifier for EchoClassifier {
        async fn classify(&self, _text: &str) -> Result<RawPrediction> {
            Ok(RawPrediction::new("LABEL_0", 1.0))
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    /// Counts loads per language; fails the first `failures` attempts
    #[derive(Default)]
    struct CountingLoader {
        loads: AtomicUsize,
        failures: AtomicUsize,
        per_language: std::sync::Mutex<Vec<String>>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl ClassifierLoader for CountingLoader {
        async fn load(&self, language: &SupportedLanguage) -> Result<Box<dyn TextClassifier>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.per_language.lock().unwrap().push(language.code.clone());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(Error::classifier("model.safetensors not found"));
            }

            Ok(Box::new(EchoClassifier {
                name: format!("echo-{}", language.code),
            }))
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

    fn cache_with(loader: Arc<CountingLoader>) -> LanguageModelCache {
        LanguageModelCache::new(languages(), loader)
    }

    #[tokio::test]
    async fn test_repeated_calls_return_same_instance() {
        let loader = Arc::new(CountingLoader::default());
        let cache = cache_with(loader.clone());

        for code in ["de", "en", "es"] {
            let first = cache.get_classifier(code).await.unwrap();
            let second = cache.get_classifier(code).await.unwrap();
            assert!(first.same_instance(&second));
            assert_eq!(first.language(), code);
        }

        assert_eq!(loader.loads.load(Ordering::SeqCst), 3);
        assert_eq!(cache.capacity(), 3);
    }

    #[tokio::test]
    async fn test_languages_get_distinct_instances() {
        let cache = cache_with(Arc::new(CountingLoader::default()));

        let de = cache.get_classifier("de").await.unwrap();
        let en = cache.get_classifier("en").await.unwrap();
        let de_again = cache.get_classifier("de").await.unwrap();

        assert!(!de.same_instance(&en));
        assert!(de.same_instance(&de_again));
        assert_eq!(de.name(), "echo-de");
    }

    #[tokio::test]
    async fn test_unknown_codes_resolve_to_default() {
        let loader = Arc::new(CountingLoader::default());
        let cache = cache_with(loader.clone());

        let en = cache.get_classifier("en").await.unwrap();
        for garbage in ["fr", "", "  ", "xx-YY", "ENGLISH"] {
            let handle = cache.get_classifier(garbage).await.unwrap();
            assert!(handle.same_instance(&en));
            assert_eq!(handle.language(), "en");
        }

        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.resolve("fr").code, cache.resolve(&cache.resolve("fr").code).code);
    }

    #[tokio::test]
    async fn test_codes_are_normalized_before_lookup() {
        let cache = cache_with(Arc::new(CountingLoader::default()));

        let es = cache.get_classifier("es").await.unwrap();
        let shouted = cache.get_classifier("  ES ").await.unwrap();
        assert!(es.same_instance(&shouted));
    }

    #[tokio::test]
    async fn test_failed_load_is_not_memoized() {
        let loader = Arc::new(CountingLoader {
            failures: AtomicUsize::new(1),
            ..Default::default()
        });
        let cache = cache_with(loader.clone());

        let err = cache.get_classifier("de").await.unwrap_err();
        assert!(err.to_string().contains("model.safetensors not found"));
        assert!(!cache.is_loaded("de"));

        let handle = cache.get_classifier("de").await.unwrap();
        assert_eq!(handle.language(), "de");
        assert!(cache.is_loaded("de"));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_loads_once() {
        let loader = Arc::new(CountingLoader {
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        let cache = Arc::new(cache_with(loader.clone()));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get_classifier("es").await })
            })
            .collect();

        let handles: Vec<ClassifierHandle> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert!(handles.iter().all(|h| h.same_instance(&handles[0])));
    }

    #[tokio::test]
    async fn test_preload_and_loaded_languages() {
        let loader = Arc::new(CountingLoader::default());
        let cache = cache_with(loader.clone());
        assert!(cache.loaded_languages().is_empty());

        cache.preload(&["es", "de"]).await.unwrap();
        assert_eq!(cache.loaded_languages(), vec!["de", "es"]);
        assert!(!cache.is_loaded("en"));
        assert_eq!(*loader.per_language.lock().unwrap(), vec!["es", "de"]);
    }
}
