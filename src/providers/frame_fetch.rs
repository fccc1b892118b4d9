use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, COOKIE, REFERER, USER_AGENT};
use std::time::Duration;

use crate::browser::{BrowserCookie, BrowserSession};

const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";

/// Baixa o HTML de um iframe por HTTP, fora do navegador, reaproveitando os
/// cookies e o user agent da sessão. Cobre iframes de outra origem, cujo
/// documento o navegador não deixa ler.
pub struct FrameFetcher {
    client: OnceCell<Client>,
    user_agent: OnceCell<String>,
    timeout: Duration,
}

impl FrameFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: OnceCell::new(),
            user_agent: OnceCell::new(),
            timeout,
        }
    }

    pub fn fetch(&self, session: &mut dyn BrowserSession, url: &str, referer: &str) -> Option<String> {
        let host = url::Url::parse(url).ok()?.host_str()?.to_string();
        let user_agent = self.user_agent(session);
        let cookies = session.cookies().unwrap_or_else(|err| {
            log::debug!("Sem cookies da sessão: {}", err);
            Vec::new()
        });

        // O cliente bloqueante é criado no primeiro uso, já fora do runtime async.
        let client = match self
            .client
            .get_or_try_init(|| Client::builder().timeout(self.timeout).build())
        {
            Ok(client) => client,
            Err(err) => {
                log::warn!("Falha ao criar o cliente HTTP: {}", err);
                return None;
            }
        };

        let mut request = client
            .get(url)
            .header(USER_AGENT, user_agent)
            .header(REFERER, referer)
            .header(ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header(ACCEPT_LANGUAGE, "fr-FR,fr;q=0.9,en-US;q=0.8,en;q=0.7");
        if let Some(cookie) = cookie_header(&cookies, &host) {
            request = request.header(COOKIE, cookie);
        }

        let response = match request.send() {
            Ok(response) => response,
            Err(err) => {
                log::debug!("Falha ao baixar o iframe {}: {}", url, err);
                return None;
            }
        };

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("html"));
        if !response.status().is_success() || !is_html {
            log::debug!("Iframe {} ignorado: HTTP {}", url, response.status());
            return None;
        }
        response.text().ok()
    }

    fn user_agent(&self, session: &mut dyn BrowserSession) -> String {
        self.user_agent
            .get_or_init(|| {
                session
                    .user_agent()
                    .unwrap_or_else(|_| FALLBACK_USER_AGENT.to_string())
            })
            .clone()
    }
}

/// Cabeçalho `Cookie` com os cookies da sessão que valem para `host`.
pub fn cookie_header(cookies: &[BrowserCookie], host: &str) -> Option<String> {
    let pairs: Vec<String> = cookies
        .iter()
        .filter(|cookie| !cookie.name.is_empty())
        .filter(|cookie| {
            let domain = cookie.domain.trim_start_matches('.');
            domain.is_empty() || domain.contains(host) || host.contains(domain)
        })
        .map(|cookie| format!("{}={}", cookie.name, cookie.value))
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}
