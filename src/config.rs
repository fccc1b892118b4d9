use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Hosts do resolver. Os espelhos ficam em dados, não em código:
/// um novo domínio é só mais uma entrada em `mirrors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverHosts {
    /// Substring que identifica um link do resolver (comparação sem caixa).
    pub marker: String,
    /// Host usado para montar a forma canônica `https://<host>/embed-<code>.html`.
    pub primary_host: String,
    /// Espelhos para os quais um `file_code` solto vira candidato.
    pub mirrors: Vec<String>,
}

impl Default for ResolverHosts {
    fn default() -> Self {
        Self {
            marker: "uqload".to_string(),
            primary_host: "uqload.cx".to_string(),
            mirrors: vec!["uqload.cx".to_string(), "uqload.net".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub default_provider: String,
    pub cache_ttl_secs: u64,
    pub resolver_concurrency: usize,
    pub headless: bool,
    pub browser_timeout_secs: u64,
    pub hosts: ResolverHosts,
    pub flemmix_url: String,
    pub papadustream_url: String,
    pub french_stream_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_provider: "french-stream".to_string(),
            cache_ttl_secs: 3600,
            resolver_concurrency: 4,
            headless: true,
            browser_timeout_secs: 20,
            hosts: ResolverHosts::default(),
            flemmix_url: "https://flemmix.wiki".to_string(),
            papadustream_url: "https://papadustream.credit".to_string(),
            french_stream_url: "https://www.french-streaming.tv".to_string(),
        }
    }
}

impl AppConfig {
    // Carrega a configuração do arquivo, ou usa os padrões se não existir
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(serde_json::from_str(&contents)?)
    }

    // Salva a configuração no arquivo
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn browser_timeout(&self) -> Duration {
        Duration::from_secs(self.browser_timeout_secs)
    }
}

// Obtém o caminho para o arquivo de configuração
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let mut path = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    path.push("stream-scout");
    path.push("config.json");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = std::env::temp_dir().join(format!("stream-scout-cfg-{}", std::process::id()));
        let path = dir.join("config.json");
        fs::create_dir_all(&dir).unwrap();
        fs::write(&path, r#"{ "cache_ttl_secs": 60, "hosts": { "primary_host": "uqload.net" } }"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.hosts.primary_host, "uqload.net");
        assert_eq!(config.hosts.marker, "uqload");
        assert_eq!(config.default_provider, "french-stream");

        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_is_default() {
        let path = PathBuf::from("/nonexistent/stream-scout/config.json");
        assert_eq!(AppConfig::load_from(&path).unwrap(), AppConfig::default());
    }
}
