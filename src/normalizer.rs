//! Normalização de links do resolver.
//!
//! Os sites espelham o mesmo host do resolver em vários domínios e caminhos;
//! o que identifica um vídeo é o código do arquivo, não a URL inteira. Todo
//! candidato é reduzido a `https://<host primário>/embed-<code>.html`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;

use crate::config::ResolverHosts;
use crate::error::ConfigError;

static EMBED_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)/embed-([a-z0-9]+)").expect("embed pattern"));
static FILE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)file_code=([a-z0-9]+)").expect("file_code pattern"));
static PATH_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(?:v/)?([a-zA-Z0-9]{8,})").expect("path code pattern"));
static SOURCES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)sources?\s*:\s*\[(?P<block>[^\]]+)\]").expect("sources pattern")
});
static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)https?://[^\s"'<>]+"#).expect("url pattern"));

/// Identificador canônico de um embed do resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalCandidate(String);

impl CanonicalCandidate {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct LinkNormalizer {
    marker: String,
    primary_host: String,
}

impl LinkNormalizer {
    pub fn new(hosts: &ResolverHosts) -> Self {
        Self {
            marker: hosts.marker.to_lowercase(),
            primary_host: hosts.primary_host.clone(),
        }
    }

    /// Reduz um candidato bruto à forma canônica, ou `None` se o link não
    /// pertence ao resolver. A primeira regra que casar vence.
    pub fn normalize(&self, raw: &str) -> Option<CanonicalCandidate> {
        let cleaned = clean(raw);
        if cleaned.is_empty() || !cleaned.to_lowercase().contains(&self.marker) {
            return None;
        }

        if cleaned.contains("/embed-") {
            if let Some(caps) = EMBED_CODE_RE.captures(cleaned) {
                return Some(self.canonical(&caps[1]));
            }
            let without_query = cleaned.split('?').next().unwrap_or(cleaned);
            return Some(CanonicalCandidate(without_query.to_string()));
        }

        if let Some(caps) = FILE_CODE_RE.captures(cleaned) {
            return Some(self.canonical(&caps[1]));
        }

        // Procura o código só no caminho quando dá para parsear a URL,
        // senão o próprio nome do host poderia passar por código.
        let path = url::Url::parse(cleaned)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| cleaned.to_string());
        if let Some(caps) = PATH_CODE_RE.captures(&path) {
            return Some(self.canonical(&caps[1]));
        }

        Some(CanonicalCandidate(cleaned.to_string()))
    }

    fn canonical(&self, code: &str) -> CanonicalCandidate {
        CanonicalCandidate(format!("https://{}/embed-{}.html", self.primary_host, code))
    }
}

/// Varredura do HTML bruto em busca de candidatos: bloco `sources: [...]`,
/// URLs de embed soltas e um token `file_code=`. Nenhuma ocorrência é só
/// um conjunto vazio.
#[derive(Debug, Clone)]
pub struct CandidateScanner {
    marker: String,
    mirrors: Vec<String>,
    embed_re: Regex,
}

impl CandidateScanner {
    pub fn new(hosts: &ResolverHosts) -> Result<Self, ConfigError> {
        let embed_re = Regex::new(&format!(
            r#"(?i)https?://(?:www\.)?{}\.[a-z]+/embed-[^"'\s<>]+"#,
            regex::escape(&hosts.marker)
        ))?;
        Ok(Self {
            marker: hosts.marker.to_lowercase(),
            mirrors: hosts.mirrors.clone(),
            embed_re,
        })
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn is_relevant(&self, link: &str) -> bool {
        link.to_lowercase().contains(&self.marker)
    }

    pub fn scan(&self, html: &str) -> Vec<String> {
        let mut links = CandidateSet::default();
        if html.is_empty() {
            return links.into_vec();
        }

        if let Some(caps) = SOURCES_RE.captures(html) {
            for found in URL_RE.find_iter(&caps["block"]) {
                if self.is_relevant(found.as_str()) {
                    links.insert(clean(found.as_str()));
                }
            }
        }

        for found in self.embed_re.find_iter(html) {
            links.insert(clean(found.as_str()));
        }

        if let Some(caps) = FILE_CODE_RE.captures(html) {
            let code = &caps[1];
            for mirror in &self.mirrors {
                links.insert(format!("https://{}/embed-{}.html", mirror, code));
            }
        }

        links.into_vec()
    }
}

/// Conjunto de candidatos que preserva a ordem de chegada.
#[derive(Debug, Default, Clone)]
pub struct CandidateSet {
    seen: HashSet<String>,
    items: Vec<String>,
}

impl CandidateSet {
    pub fn insert(&mut self, link: impl Into<String>) -> bool {
        let link = link.into();
        if link.is_empty() || self.seen.contains(&link) {
            return false;
        }
        self.seen.insert(link.clone());
        self.items.push(link);
        true
    }

    pub fn extend<I, S>(&mut self, links: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for link in links {
            self.insert(link);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.items
    }
}

fn clean(raw: &str) -> &str {
    raw.trim().trim_matches(|c| c == '\'' || c == '"').trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_strips_quotes_and_spaces() {
        assert_eq!(clean("  'https://uqload.cx/x' "), "https://uqload.cx/x");
        assert_eq!(clean("\"abc\""), "abc");
    }

    #[test]
    fn candidate_set_keeps_first_seen_order() {
        let mut set = CandidateSet::default();
        set.extend(["b", "a", "b", "", "c"]);
        assert_eq!(set.len(), 3);
        assert_eq!(set.into_vec(), vec!["b", "a", "c"]);
    }
}
