//! Sessão do navegador compartilhada pelos providers.
//!
//! A navegação é um efeito global (página atual, frame atual), então a
//! sessão é um recurso exclusivo: cada operação de provider segura o lock
//! do começo ao fim.

use headless_chrome::{Browser, LaunchOptions, Tab};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::error::SessionError;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Cópia de um elemento da página (o `outerHTML`), consultada com seletores CSS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSnapshot {
    html: String,
}

impl ElementSnapshot {
    pub fn new(outer_html: impl Into<String>) -> Self {
        Self {
            html: outer_html.into(),
        }
    }

    pub fn outer_html(&self) -> &str {
        &self.html
    }

    /// Atributo do próprio elemento, se presente e não vazio.
    pub fn attr(&self, name: &str) -> Option<String> {
        self.with_root(|root| {
            root.value()
                .attr(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
    }

    /// Texto visível do elemento com os espaços colapsados.
    pub fn text(&self) -> String {
        self.with_root(|root| Some(collapse_whitespace(root.text())))
            .unwrap_or_default()
    }

    /// Primeiro descendente que casa com o seletor.
    pub fn find(&self, selector: &str) -> Option<ElementSnapshot> {
        let selector = parse_selector(selector)?;
        self.with_root(|root| {
            root.select(&selector)
                .next()
                .map(|el| ElementSnapshot::new(el.html()))
        })
    }

    pub fn has(&self, selector: &str) -> bool {
        self.find(selector).is_some()
    }

    fn with_root<T>(&self, f: impl FnOnce(ElementRef<'_>) -> Option<T>) -> Option<T> {
        let fragment = Html::parse_fragment(&self.html);
        let root = fragment
            .root_element()
            .children()
            .filter_map(ElementRef::wrap)
            .next()?;
        f(root)
    }
}

pub(crate) fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            log::trace!("Seletor inválido {:?}: {:?}", selector, err);
            None
        }
    }
}

fn collapse_whitespace<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
}

/// Operações que os providers precisam do navegador.
pub trait BrowserSession: Send {
    fn navigate(&mut self, url: &str) -> Result<(), SessionError>;

    /// Espera até `timeout` por pelo menos um elemento. Timeout é lista vazia.
    fn find_all(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Vec<ElementSnapshot>, SessionError>;

    /// Rola até cada elemento e clica nele. Com `text`, só os que contêm o texto.
    fn click_all(&mut self, selector: &str, text: Option<&str>) -> Result<usize, SessionError>;

    /// HTML do documento atual (o frame, se houver um ativo).
    fn page_source(&mut self) -> Result<String, SessionError>;

    fn enter_frame(&mut self, selector: &str, index: usize) -> Result<(), SessionError>;

    fn leave_frame(&mut self) -> Result<(), SessionError>;

    fn user_agent(&mut self) -> Result<String, SessionError>;

    fn cookies(&mut self) -> Result<Vec<BrowserCookie>, SessionError>;

    /// Pausa para a página assentar depois de navegar ou clicar.
    fn settle(&mut self, delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

pub type SharedSession = Arc<Mutex<dyn BrowserSession>>;

pub fn shared<S: BrowserSession + 'static>(session: S) -> SharedSession {
    Arc::new(Mutex::new(session))
}

pub fn lock_session(session: &SharedSession) -> MutexGuard<'_, dyn BrowserSession + 'static> {
    // A próxima navegação restabelece o estado da sessão.
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Escopo dentro de um iframe. Ao sair do escopo a sessão sempre volta ao
/// documento principal, em qualquer caminho de saída.
pub struct FrameScope<'a> {
    session: &'a mut dyn BrowserSession,
}

impl<'a> FrameScope<'a> {
    pub fn enter(
        session: &'a mut dyn BrowserSession,
        selector: &str,
        index: usize,
    ) -> Result<Self, SessionError> {
        match session.enter_frame(selector, index) {
            Ok(()) => Ok(Self { session }),
            Err(err) => {
                if let Err(leave_err) = session.leave_frame() {
                    log::debug!("Falha ao voltar ao documento principal: {}", leave_err);
                }
                Err(err)
            }
        }
    }
}

impl<'a> Deref for FrameScope<'a> {
    type Target = dyn BrowserSession + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.session
    }
}

impl<'a> DerefMut for FrameScope<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.session
    }
}

impl Drop for FrameScope<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.session.leave_frame() {
            log::debug!("Falha ao voltar ao documento principal: {}", err);
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    pub timeout: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            timeout: Duration::from_secs(20),
        }
    }
}

struct FrameTarget {
    selector: String,
    index: usize,
}

/// Sessão real sobre o Chrome headless. Consultas e cliques rodam como
/// scripts na página, o que também dá acesso ao documento de iframes
/// da mesma origem.
pub struct ChromeSession {
    _browser: Browser,
    tab: Arc<Tab>,
    frame: Option<FrameTarget>,
}

impl ChromeSession {
    pub fn launch(options: &BrowserOptions) -> Result<Self, SessionError> {
        let launch = LaunchOptions::default_builder()
            .headless(options.headless)
            .sandbox(false)
            .idle_browser_timeout(Duration::from_secs(3600))
            .build()
            .map_err(|err| SessionError::Launch(err.to_string()))?;

        let browser = Browser::new(launch).map_err(|err| SessionError::Launch(err.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|err| SessionError::Launch(err.to_string()))?;
        tab.set_default_timeout(options.timeout);

        log::info!("Navegador iniciado (headless: {})", options.headless);
        Ok(Self {
            _browser: browser,
            tab,
            frame: None,
        })
    }

    fn document_expr(&self) -> String {
        match &self.frame {
            None => "document".to_string(),
            Some(target) => format!(
                "((document.querySelectorAll({})[{}] || {{}}).contentDocument || null)",
                js_string(&target.selector),
                target.index
            ),
        }
    }

    fn evaluate(&self, script: &str) -> Result<Value, SessionError> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|err| SessionError::Script(err.to_string()))?;
        Ok(result.value.unwrap_or(Value::Null))
    }

    fn query_once(&self, selector: &str) -> Result<Vec<ElementSnapshot>, SessionError> {
        let script = format!(
            "(() => {{ try {{ const doc = {doc}; if (!doc) return '[]'; \
             return JSON.stringify(Array.from(doc.querySelectorAll({sel})).map(e => e.outerHTML)); \
             }} catch (e) {{ return '[]'; }} }})()",
            doc = self.document_expr(),
            sel = js_string(selector)
        );
        let raw = match self.evaluate(&script)? {
            Value::String(raw) => raw,
            _ => return Ok(Vec::new()),
        };
        let items: Vec<String> =
            serde_json::from_str(&raw).map_err(|err| SessionError::Script(err.to_string()))?;
        Ok(items.into_iter().map(ElementSnapshot::new).collect())
    }
}

impl BrowserSession for ChromeSession {
    fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.frame = None;
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map(|_| ())
            .map_err(|err| SessionError::Navigation {
                url: url.to_string(),
                message: err.to_string(),
            })
    }

    fn find_all(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Vec<ElementSnapshot>, SessionError> {
        let deadline = Instant::now() + timeout;
        loop {
            let found = self.query_once(selector)?;
            if !found.is_empty() || Instant::now() >= deadline {
                return Ok(found);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    fn click_all(&mut self, selector: &str, text: Option<&str>) -> Result<usize, SessionError> {
        let needle = text.map(js_string).unwrap_or_else(|| "null".to_string());
        let script = format!(
            "(() => {{ const doc = {doc}; if (!doc) return 0; const needle = {needle}; let n = 0; \
             doc.querySelectorAll({sel}).forEach(el => {{ \
               if (needle && !(el.textContent || '').includes(needle)) return; \
               try {{ el.scrollIntoView({{block: 'center'}}); el.click(); n++; }} catch (e) {{}} \
             }}); return n; }})()",
            doc = self.document_expr(),
            sel = js_string(selector),
        );
        Ok(self.evaluate(&script)?.as_f64().unwrap_or(0.0) as usize)
    }

    fn page_source(&mut self) -> Result<String, SessionError> {
        let script = format!(
            "(() => {{ const doc = {}; return doc && doc.documentElement ? doc.documentElement.outerHTML : ''; }})()",
            self.document_expr()
        );
        match self.evaluate(&script)? {
            Value::String(html) => Ok(html),
            _ => Ok(String::new()),
        }
    }

    fn enter_frame(&mut self, selector: &str, index: usize) -> Result<(), SessionError> {
        let script = format!(
            "(() => {{ const f = document.querySelectorAll({sel})[{index}]; if (!f) return 'missing'; \
             try {{ f.removeAttribute('sandbox'); }} catch (e) {{}} \
             try {{ return f.contentDocument ? 'ok' : 'blocked'; }} catch (e) {{ return 'blocked'; }} }})()",
            sel = js_string(selector),
        );
        match self.evaluate(&script)? {
            Value::String(state) if state == "ok" => {
                self.frame = Some(FrameTarget {
                    selector: selector.to_string(),
                    index,
                });
                Ok(())
            }
            other => Err(SessionError::Frame(format!("{selector}[{index}]: {other}"))),
        }
    }

    fn leave_frame(&mut self) -> Result<(), SessionError> {
        self.frame = None;
        Ok(())
    }

    fn user_agent(&mut self) -> Result<String, SessionError> {
        match self.evaluate("navigator.userAgent")? {
            Value::String(ua) if !ua.is_empty() => Ok(ua),
            _ => Err(SessionError::Script("navigator.userAgent vazio".to_string())),
        }
    }

    fn cookies(&mut self) -> Result<Vec<BrowserCookie>, SessionError> {
        let cookies = self
            .tab
            .get_cookies()
            .map_err(|err| SessionError::Script(err.to_string()))?;
        Ok(cookies
            .into_iter()
            .map(|c| BrowserCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
            })
            .collect())
    }
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reads_own_attributes_and_descendants() {
        let tile = ElementSnapshot::new(
            r#"<div class="movie-item" data-title="x"><h2><a href="/m/1">  The
                Matrix </a></h2><img data-src="/p.jpg"></div>"#,
        );
        assert_eq!(tile.attr("data-title").as_deref(), Some("x"));
        assert_eq!(tile.attr("missing"), None);

        let title = tile.find("h2 a").unwrap();
        assert_eq!(title.text(), "The Matrix");
        assert_eq!(title.attr("href").as_deref(), Some("/m/1"));
        assert!(tile.has("img"));
        assert!(!tile.has("video"));
        assert!(tile.find("[[bad").is_none());
    }

    /// Sessão que só anota as chamadas recebidas.
    struct Journal(Arc<Mutex<Vec<String>>>);

    impl Journal {
        fn note(&self, entry: String) {
            self.0.lock().unwrap().push(entry);
        }
    }

    impl BrowserSession for Journal {
        fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
            self.note(format!("navigate {url}"));
            Ok(())
        }

        fn find_all(&mut self, _selector: &str, _timeout: Duration) -> Result<Vec<ElementSnapshot>, SessionError> {
            Ok(Vec::new())
        }

        fn click_all(&mut self, _selector: &str, _text: Option<&str>) -> Result<usize, SessionError> {
            Ok(0)
        }

        fn page_source(&mut self) -> Result<String, SessionError> {
            Ok(String::new())
        }

        fn enter_frame(&mut self, selector: &str, index: usize) -> Result<(), SessionError> {
            self.note(format!("enter {selector}[{index}]"));
            Err(SessionError::Frame("cross-origin".to_string()))
        }

        fn leave_frame(&mut self) -> Result<(), SessionError> {
            self.note("leave".to_string());
            Ok(())
        }

        fn user_agent(&mut self) -> Result<String, SessionError> {
            Ok("journal".to_string())
        }

        fn cookies(&mut self) -> Result<Vec<BrowserCookie>, SessionError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn locked_shared_session_drives_frames_and_survives_poison() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let session = shared(Journal(log.clone()));

        {
            let mut guard = lock_session(&session);
            guard.navigate("https://site.test/a").unwrap();
            assert!(FrameScope::enter(&mut *guard, "iframe", 0).is_err());
        }

        let poisoner = session.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poisoned while holding the session");
        })
        .join();
        assert!(session.is_poisoned());

        lock_session(&session).navigate("https://site.test/b").unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "navigate https://site.test/a",
                "enter iframe[0]",
                "leave",
                "navigate https://site.test/b"
            ]
        );
    }

    #[test]
    fn js_string_escapes_quotes() {
        assert_eq!(js_string(r#"a[href*='x"y']"#), r#""a[href*='x\"y']""#);
    }
}
