//! Cache dos vídeos resolvidos por página.
//!
//! Guarda apenas o resultado da resolução de links de uma página, nunca
//! resultados de busca. A chave é o par (provider, url): dois providers
//! raspando a mesma URL não colidem.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::models::ResolvedVideo;

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Fonte de tempo do cache. Os testes usam um relógio manual.
pub type Clock = Arc<dyn Fn() -> Instant + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub provider: String,
    pub url: String,
}

impl CacheKey {
    pub fn new(provider: &str, url: &str) -> Self {
        Self {
            provider: provider.to_string(),
            url: url.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<ResolvedVideo>,
    stored_at: Instant,
}

pub struct ResultCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
    clock: Clock,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(Instant::now))
    }

    pub fn with_clock(ttl: Duration, clock: Clock) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Devolve o valor guardado, ou `None` se nunca existiu ou expirou.
    /// Uma entrada expirada é removida nesta mesma leitura.
    pub fn get(&self, provider: &str, url: &str) -> Option<Vec<ResolvedVideo>> {
        let key = CacheKey::new(provider, url);
        let now = (self.clock)();
        let mut entries = self.lock();

        let expired = match entries.get(&key) {
            None => return None,
            Some(entry) => self.is_expired(entry, now),
        };
        if expired {
            entries.remove(&key);
            log::debug!("Cache expirado para {}:{}", provider, url);
            return None;
        }
        entries.get(&key).map(|entry| entry.value.clone())
    }

    pub fn set(&self, provider: &str, url: &str, value: Vec<ResolvedVideo>) {
        let entry = CacheEntry {
            value,
            stored_at: (self.clock)(),
        };
        self.lock().insert(CacheKey::new(provider, url), entry);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Remove todas as entradas com idade >= ttl e devolve quantas saíram.
    pub fn sweep_expired(&self) -> usize {
        let now = (self.clock)();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry, now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) >= self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        // O mapa continua consistente mesmo se outra thread entrou em pânico.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
