//! Providers: um por site, cada um com as convenções de DOM daquele site.

pub mod dom;
mod flemmix;
mod frame_fetch;
mod french_stream;
mod harvest;
mod papadustream;

use std::sync::{Arc, MutexGuard};
use std::time::Duration;
use url::Url;

use crate::browser::{lock_session, BrowserSession, SharedSession};
use crate::config::{AppConfig, ResolverHosts};
use crate::error::ConfigError;
use crate::models::MediaDescriptor;
use crate::normalizer::CandidateScanner;
use crate::utils::absolutize;

pub use flemmix::FlemmixProvider;
pub use frame_fetch::{cookie_header, FrameFetcher};
pub use french_stream::FrenchStreamProvider;
pub use harvest::{ClickTarget, HarvestPlan};
pub use papadustream::PapaduStreamProvider;

pub const MAX_SEARCH_RESULTS: usize = 50;

/// Interface comum dos sites. Nenhuma operação falha: seletores ausentes,
/// cards quebrados e navegações perdidas viram resultados menores.
pub trait Provider: Send + Sync {
    /// Identidade estável, usada também na chave do cache.
    fn id(&self) -> &'static str;

    /// Busca no site, no máximo `MAX_SEARCH_RESULTS` resultados, na ordem do site.
    fn search(&self, query: &str) -> Vec<MediaDescriptor>;

    /// Páginas (episódios, temporadas) que podem ter players. Sem estrutura
    /// detectada, devolve só a própria URL.
    fn discover_sub_pages(&self, media_url: &str) -> Vec<String>;

    /// Candidatos brutos da página, em ordem de descoberta e sem repetição.
    fn harvest_candidates(&self, page_url: &str) -> Vec<String>;
}

/// Esperas usadas na raspagem. `Waits::none()` serve para sessões em memória.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waits {
    pub element: Duration,
    pub long: Duration,
    pub short: Duration,
    pub settle: Duration,
    pub click_settle: Duration,
    pub frame_settle: Duration,
}

impl Default for Waits {
    fn default() -> Self {
        Self {
            element: Duration::from_secs(5),
            long: Duration::from_secs(8),
            short: Duration::from_secs(3),
            settle: Duration::from_millis(500),
            click_settle: Duration::from_millis(300),
            frame_settle: Duration::from_millis(200),
        }
    }
}

impl Waits {
    pub fn none() -> Self {
        Self {
            element: Duration::ZERO,
            long: Duration::ZERO,
            short: Duration::ZERO,
            settle: Duration::ZERO,
            click_settle: Duration::ZERO,
            frame_settle: Duration::ZERO,
        }
    }
}

/// O que todo provider carrega: a sessão injetada, a URL base do site e o
/// scanner de candidatos do resolver.
pub struct SiteContext {
    session: SharedSession,
    base: Url,
    scanner: CandidateScanner,
    waits: Waits,
}

impl SiteContext {
    pub fn new(session: SharedSession, base_url: &str, hosts: &ResolverHosts) -> Result<Self, ConfigError> {
        Ok(Self {
            session,
            base: Url::parse(base_url)?,
            scanner: CandidateScanner::new(hosts)?,
            waits: Waits::default(),
        })
    }

    pub fn with_waits(mut self, waits: Waits) -> Self {
        self.waits = waits;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn scanner(&self) -> &CandidateScanner {
        &self.scanner
    }

    pub fn waits(&self) -> &Waits {
        &self.waits
    }

    pub fn lock(&self) -> MutexGuard<'_, dyn BrowserSession + 'static> {
        lock_session(&self.session)
    }

    pub fn absolutize(&self, href: &str) -> Option<String> {
        absolutize(&self.base, href)
    }

    /// URL de busca a partir de um template com `{q}`.
    pub fn search_url(&self, template: &str, query: &str) -> Option<String> {
        let path = template.replace("{q}", &urlencoding::encode(query));
        self.absolutize(&path)
    }
}

pub const PROVIDER_IDS: [&str; 3] = [
    FrenchStreamProvider::ID,
    PapaduStreamProvider::ID,
    FlemmixProvider::ID,
];

pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
    default_id: String,
}

impl ProviderRegistry {
    pub fn new(default_id: impl Into<String>) -> Self {
        Self {
            providers: Vec::new(),
            default_id: default_id.into(),
        }
    }

    /// Os três sites conhecidos, todos sobre a mesma sessão.
    pub fn with_default_sites(session: SharedSession, config: &AppConfig) -> Result<Self, ConfigError> {
        let mut registry = Self::new(config.default_provider.clone());
        registry.register(Arc::new(FrenchStreamProvider::new(SiteContext::new(
            session.clone(),
            &config.french_stream_url,
            &config.hosts,
        )?)));
        registry.register(Arc::new(PapaduStreamProvider::new(SiteContext::new(
            session.clone(),
            &config.papadustream_url,
            &config.hosts,
        )?)));
        registry.register(Arc::new(FlemmixProvider::new(SiteContext::new(
            session,
            &config.flemmix_url,
            &config.hosts,
        )?)));
        Ok(registry)
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.retain(|p| p.id() != provider.id());
        self.providers.push(provider);
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn Provider>, ConfigError> {
        self.providers
            .iter()
            .find(|p| p.id() == id)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownProvider {
                id: id.to_string(),
                available: self.ids(),
            })
    }

    pub fn ids(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.id().to_string()).collect()
    }

    pub fn default_id(&self) -> &str {
        &self.default_id
    }
}
