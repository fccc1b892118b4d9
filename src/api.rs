use serde::Serialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::{MediaDescriptor, ResolvedVideo};
use crate::pipeline::ExtractionPipeline;
use crate::providers::{Provider, ProviderRegistry, MAX_SEARCH_RESULTS};

// Listagem devolvida por `providers`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderListing {
    pub providers: Vec<String>,
    pub default: String,
}

/// Superfície de requisições: escolhe o provider pelo id e delega para
/// a busca do site ou para o pipeline.
pub struct StreamService {
    registry: ProviderRegistry,
    pipeline: ExtractionPipeline,
}

impl StreamService {
    pub fn new(registry: ProviderRegistry, pipeline: ExtractionPipeline) -> Self {
        Self { registry, pipeline }
    }

    pub fn list_providers(&self) -> ProviderListing {
        ProviderListing {
            providers: self.registry.ids(),
            default: self.registry.default_id().to_string(),
        }
    }

    fn provider(&self, provider_id: Option<&str>) -> Result<Arc<dyn Provider>, ApiError> {
        let id = provider_id.unwrap_or_else(|| self.registry.default_id());
        Ok(self.registry.get(id)?)
    }

    // Busca sem cache: resultados de busca mudam com frequência
    pub async fn search_media(
        &self,
        query: &str,
        provider_id: Option<&str>,
    ) -> Result<Vec<MediaDescriptor>, ApiError> {
        let provider = self.provider(provider_id)?;
        let id = provider.id();
        let query = query.to_string();

        let mut results = tokio::task::spawn_blocking(move || provider.search(&query))
            .await
            .map_err(|err| ApiError::Search {
                provider: id.to_string(),
                message: err.to_string(),
            })?;
        results.truncate(MAX_SEARCH_RESULTS);
        log::info!("{}: {} resultados", id, results.len());
        Ok(results)
    }

    pub async fn get_videos(
        &self,
        media_url: &str,
        provider_id: Option<&str>,
    ) -> Result<Vec<ResolvedVideo>, ApiError> {
        let provider = self.provider(provider_id)?;
        Ok(self.pipeline.resolve(provider, media_url).await?)
    }

    pub fn clear_cache(&self) {
        self.pipeline.cache().clear();
    }

    /// Remove as entradas expiradas do cache e devolve quantas saíram.
    pub fn sweep_cache(&self) -> usize {
        self.pipeline.cache().sweep_expired()
    }
}
