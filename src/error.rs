use thiserror::Error;

/// Falhas do driver do navegador. Quase sempre recuperadas localmente
/// pelo provider (próxima estratégia, próximo frame, próxima página).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("falha ao iniciar o navegador: {0}")]
    Launch(String),
    #[error("falha ao navegar para {url}: {message}")]
    Navigation { url: String, message: String },
    #[error("falha ao executar script: {0}")]
    Script(String),
    #[error("frame inacessível: {0}")]
    Frame(String),
}

/// O resolver não conseguiu transformar um candidato canônico em metadados.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("erro HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("resposta HTTP {status} para {url}")]
    Status { url: String, status: u16 },
    #[error("nenhuma fonte de vídeo encontrada em {0}")]
    NoSource(String),
    /// A resposta não é uma página de embed (tipo errado ou grande demais).
    #[error("{url} não é uma página de embed: {detail}")]
    NotEmbedPage { url: String, detail: String },
}

/// Erros de configuração, incluindo o provider desconhecido na borda da requisição.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("provider inválido: {id}. Providers disponíveis: {}", available.join(", "))]
    UnknownProvider { id: String, available: Vec<String> },
    #[error("erro de I/O na configuração: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuração inválida: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("padrão de host inválido: {0}")]
    Pattern(#[from] regex::Error),
    #[error("URL base inválida: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("diretório de configuração não encontrado")]
    NoConfigDir,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A tarefa de coleta morreu antes de terminar; nada foi gravado no cache.
    #[error("falha na coleta de {url}: {message}")]
    Harvest { url: String, message: String },
}

/// Erros da superfície de requisições (`api`).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("a busca em {provider} falhou: {message}")]
    Search { provider: String, message: String },
}
