//! Da URL de uma mídia aos vídeos resolvidos.
//!
//! Para cada subpágina o provider coleta candidatos brutos; eles são
//! normalizados, deduplicados na ordem de chegada e resolvidos com
//! concorrência limitada. O resultado fica no cache por (provider, url).

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::ResultCache;
use crate::error::PipelineError;
use crate::models::ResolvedVideo;
use crate::normalizer::{CanonicalCandidate, LinkNormalizer};
use crate::providers::Provider;
use crate::resolver::VideoResolver;

pub const DEFAULT_CONCURRENCY: usize = 4;

pub struct ExtractionPipeline {
    cache: Arc<ResultCache>,
    resolver: Arc<dyn VideoResolver>,
    normalizer: LinkNormalizer,
    concurrency: usize,
}

impl ExtractionPipeline {
    pub fn new(
        cache: Arc<ResultCache>,
        resolver: Arc<dyn VideoResolver>,
        normalizer: LinkNormalizer,
    ) -> Self {
        Self {
            cache,
            resolver,
            normalizer,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Vídeos de uma mídia, do cache quando possível. Falhas de um candidato
    /// só o removem do resultado; um resultado vazio também é guardado.
    pub async fn resolve(
        &self,
        provider: Arc<dyn Provider>,
        media_url: &str,
    ) -> Result<Vec<ResolvedVideo>, PipelineError> {
        let provider_id = provider.id();
        if let Some(cached) = self.cache.get(provider_id, media_url) {
            log::info!("Cache: {} vídeos para {}", cached.len(), media_url);
            return Ok(cached);
        }

        // A raspagem bloqueia na sessão do navegador
        let normalizer = self.normalizer.clone();
        let url = media_url.to_string();
        let candidates = tokio::task::spawn_blocking(move || {
            collect_candidates(provider.as_ref(), &normalizer, &url)
        })
        .await
        .map_err(|err| PipelineError::Harvest {
            url: media_url.to_string(),
            message: err.to_string(),
        })?;

        log::info!("{} candidatos para {}", candidates.len(), media_url);

        let resolver = &self.resolver;
        let videos: Vec<ResolvedVideo> = stream::iter(candidates)
            .map(|candidate| async move {
                match resolver.resolve_one(candidate.as_str()).await {
                    Ok(info) => Some(ResolvedVideo::from_info(info, candidate.into_string())),
                    Err(err) => {
                        log::warn!("Falha ao resolver {}: {}", candidate, err);
                        None
                    }
                }
            })
            .buffered(self.concurrency)
            .filter_map(|video| async move { video })
            .collect()
            .await;

        self.cache.set(provider_id, media_url, videos.clone());
        Ok(videos)
    }
}

/// Candidatos canônicos de todas as subpáginas, sem repetição, na ordem
/// em que apareceram. Bloqueia: chame fora do runtime async.
pub fn collect_candidates(
    provider: &dyn Provider,
    normalizer: &LinkNormalizer,
    media_url: &str,
) -> Vec<CanonicalCandidate> {
    let sub_pages = provider.discover_sub_pages(media_url);
    log::debug!("{} subpáginas em {}", sub_pages.len(), media_url);

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for page in &sub_pages {
        for raw in provider.harvest_candidates(page) {
            match normalizer.normalize(&raw) {
                Some(candidate) if seen.insert(candidate.clone()) => candidates.push(candidate),
                Some(_) => {}
                None => log::trace!("Descartado: {}", raw),
            }
        }
    }
    candidates
}
