use serde::{Deserialize, Serialize};

// Resultado de busca. `url` pode faltar quando o card não tinha link,
// mas o título sozinho ainda é um resultado válido.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    pub title: String,
    pub url: Option<String>,
    pub image_url: Option<String>,
}

impl MediaDescriptor {
    pub fn new(title: impl Into<String>, url: Option<String>, image_url: Option<String>) -> Self {
        Self {
            title: title.into(),
            url,
            image_url,
        }
    }
}

/// Metadados devolvidos pelo resolver para um único embed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub title: Option<String>,
    pub duration_seconds: Option<u64>,
    pub image_url: Option<String>,
    pub resolution: Option<String>,
    pub size_bytes: Option<u64>,
    pub media_type: Option<String>,
    pub direct_url: Option<String>,
}

// Vídeo resolvido. `canonical_url` sempre vem preenchido, mesmo que o
// resolver não tenha devolvido mais nada.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedVideo {
    pub title: Option<String>,
    pub duration_seconds: Option<u64>,
    pub image_url: Option<String>,
    pub resolution: Option<String>,
    pub size_bytes: Option<u64>,
    pub media_type: Option<String>,
    pub direct_url: Option<String>,
    pub canonical_url: String,
}

impl ResolvedVideo {
    pub fn from_info(info: VideoInfo, canonical_url: impl Into<String>) -> Self {
        Self {
            title: info.title,
            duration_seconds: info.duration_seconds,
            image_url: info.image_url,
            resolution: info.resolution,
            size_bytes: info.size_bytes,
            media_type: info.media_type,
            direct_url: info.direct_url,
            canonical_url: canonical_url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_info_keeps_canonical_url() {
        let video = ResolvedVideo::from_info(VideoInfo::default(), "https://uqload.cx/embed-abc.html");
        assert_eq!(video.canonical_url, "https://uqload.cx/embed-abc.html");
        assert!(video.direct_url.is_none());

        let json = serde_json::to_value(&video).unwrap();
        assert_eq!(json["canonical_url"], "https://uqload.cx/embed-abc.html");
        assert!(json["title"].is_null());
    }
}
