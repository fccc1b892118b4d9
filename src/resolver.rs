//! Resolução de um embed canônico em metadados do vídeo.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, REFERER};
use reqwest::{Client, Response};
use scraper::{Html, Selector};
use std::time::Duration;

use crate::error::ResolutionError;
use crate::models::VideoInfo;

/// Uma página de embed tem poucas dezenas de KB; acima disso não é uma.
pub const MAX_EMBED_BYTES: usize = 2 * 1024 * 1024;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";

static SOURCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)sources\s*:\s*\[\s*["']([^"']+)["']"#).expect("sources pattern")
});
static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)duration\s*:\s*["']?(\d+)"#).expect("duration pattern"));
static POSTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)poster\s*:\s*["']([^"']+)["']"#).expect("poster pattern"));
static RESOLUTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{3,4}x\d{3,4})\b").expect("resolution pattern"));
static TITLE_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*[-|]\s*uqload.*$").expect("title suffix pattern"));

/// Colaborador que transforma um candidato canônico em metadados.
#[async_trait]
pub trait VideoResolver: Send + Sync {
    async fn resolve_one(&self, canonical_url: &str) -> Result<VideoInfo, ResolutionError>;
}

/// Resolver HTTP para embeds do Uqload.
pub struct UqloadResolver {
    client: Client,
}

impl UqloadResolver {
    pub fn new() -> Result<Self, ResolutionError> {
        Self::with_timeout(Duration::from_secs(20))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, ResolutionError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    // O tamanho é só informativo: qualquer falha aqui vira `None`
    async fn content_length(&self, direct_url: &str, referer: &str) -> Option<u64> {
        let response = self
            .client
            .head(direct_url)
            .header(REFERER, referer)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        response
            .headers()
            .get(CONTENT_LENGTH)?
            .to_str()
            .ok()?
            .parse()
            .ok()
    }
}

#[async_trait]
impl VideoResolver for UqloadResolver {
    async fn resolve_one(&self, canonical_url: &str) -> Result<VideoInfo, ResolutionError> {
        let response = self
            .client
            .get(canonical_url)
            .header(REFERER, canonical_url)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolutionError::Status {
                url: canonical_url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = read_embed_page(response, canonical_url).await?;
        let mut info = parse_embed_page(&html)
            .ok_or_else(|| ResolutionError::NoSource(canonical_url.to_string()))?;

        if let Some(direct_url) = info.direct_url.as_deref() {
            info.size_bytes = self.content_length(direct_url, canonical_url).await;
        }
        log::debug!("Resolvido {} -> {:?}", canonical_url, info.direct_url);
        Ok(info)
    }
}

// Só lê corpos HTML, e no máximo `MAX_EMBED_BYTES`: um link direto para o
// vídeo também passa pela normalização e não deve ser baixado inteiro.
async fn read_embed_page(mut response: Response, url: &str) -> Result<String, ResolutionError> {
    let not_embed = |detail: String| ResolutionError::NotEmbedPage {
        url: url.to_string(),
        detail,
    };

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.contains("html") {
        return Err(not_embed(format!("content-type {:?}", content_type)));
    }
    if let Some(length) = response.content_length() {
        if length > MAX_EMBED_BYTES as u64 {
            return Err(not_embed(format!("{} bytes", length)));
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > MAX_EMBED_BYTES {
            return Err(not_embed(format!("mais de {} bytes", MAX_EMBED_BYTES)));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Extrai os metadados do HTML de um embed. Sem a URL direta do player
/// não há vídeo, e o resultado é `None`.
pub fn parse_embed_page(html: &str) -> Option<VideoInfo> {
    let direct_url = SOURCE_RE.captures(html)?[1].trim().to_string();
    if direct_url.is_empty() {
        return None;
    }

    let title = page_title(html)
        .map(|t| TITLE_SUFFIX_RE.replace(&t, "").trim().to_string())
        .filter(|t| !t.is_empty());

    Some(VideoInfo {
        title,
        duration_seconds: DURATION_RE
            .captures(html)
            .and_then(|caps| caps[1].parse().ok()),
        image_url: POSTER_RE.captures(html).map(|caps| caps[1].to_string()),
        resolution: RESOLUTION_RE.captures(html).map(|caps| caps[1].to_string()),
        size_bytes: None,
        media_type: media_type(&direct_url),
        direct_url: Some(direct_url),
    })
}

fn page_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let og = Selector::parse("meta[property='og:title']").ok()?;
    if let Some(content) = document
        .select(&og)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(str::trim)
        .filter(|c| !c.is_empty())
    {
        return Some(content.to_string());
    }

    let title = Selector::parse("title").ok()?;
    document
        .select(&title)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

fn media_type(direct_url: &str) -> Option<String> {
    let path = direct_url.split(['?', '#']).next().unwrap_or(direct_url);
    let extension = path.rsplit('.').next()?.to_lowercase();
    match extension.as_str() {
        "mp4" => Some("video/mp4".to_string()),
        "m3u8" => Some("application/x-mpegURL".to_string()),
        "webm" => Some("video/webm".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMBED_PAGE: &str = r#"<html><head>
        <title>Futurama S01E01 - Uqload</title>
        </head><body><script>
        var player = new Clappr.Player({
            sources: ["https://m180.uqload.cx/3rfkv2/v.mp4?token=abc"],
            poster: "https://m180.uqload.cx/i/01/poster.jpg",
            duration: "1320",
        });
        </script><p>1280x720</p></body></html>"#;

    #[test]
    fn embed_page_yields_metadata() {
        let info = parse_embed_page(EMBED_PAGE).unwrap();
        assert_eq!(info.title.as_deref(), Some("Futurama S01E01"));
        assert_eq!(info.duration_seconds, Some(1320));
        assert_eq!(info.resolution.as_deref(), Some("1280x720"));
        assert_eq!(info.media_type.as_deref(), Some("video/mp4"));
        assert_eq!(info.image_url.as_deref(), Some("https://m180.uqload.cx/i/01/poster.jpg"));
        assert_eq!(
            info.direct_url.as_deref(),
            Some("https://m180.uqload.cx/3rfkv2/v.mp4?token=abc")
        );
    }

    #[test]
    fn og_title_wins_over_title_tag() {
        let html = r#"<meta property="og:title" content="Le Film | uqload.cx"><title>x</title>
            <script>sources: ['https://cdn.test/a.m3u8']</script>"#;
        let info = parse_embed_page(html).unwrap();
        assert_eq!(info.title.as_deref(), Some("Le Film"));
        assert_eq!(info.media_type.as_deref(), Some("application/x-mpegURL"));
        assert_eq!(info.duration_seconds, None);
    }

    #[test]
    fn page_without_sources_is_not_a_video() {
        assert!(parse_embed_page("<title>File was deleted</title>").is_none());
    }
}
