use crate::config::ServerConfig;
use crate::server::PageRenderer;
use metrics_exporter_prometheus::PrometheusHandle;
use sentiscope_classifiers::{CandleModelLoader, LanguageModelCache, SentimentService};
use std::sync::Arc;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: SentimentService,
    pub pages: Arc<PageRenderer>,
    /// Absent when no recorder is installed (tests)
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        service: SentimentService,
        metrics_handle: Option<PrometheusHandle>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            service,
            pages: Arc::new(PageRenderer::new()?),
            metrics_handle,
        })
    }

    /// Build the state for real models: validate the language table, wire the
    /// Candle loader into a fresh cache and preload the configured languages
    pub async fn from_config(
        config: &ServerConfig,
        metrics_handle: Option<PrometheusHandle>,
    ) -> anyhow::Result<Self> {
        let languages = Arc::new(config.language_table()?);
        info!(
            "Supported languages: {} (default: {})",
            languages.codes().collect::<Vec<_>>().join(", "),
            languages.default_code()
        );

        let loader = Arc::new(CandleModelLoader::new(config.inference.clone()));
        let cache = Arc::new(LanguageModelCache::new(languages, loader));

        if !config.preload.is_empty() {
            info!("Preloading models: {:?}", config.preload);
            cache.preload(&config.preload).await?;
        }

        Self::new(SentimentService::new(cache), metrics_handle)
    }
}
