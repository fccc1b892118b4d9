#![allow(dead_code)]

use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stream_scout::browser::{BrowserCookie, BrowserSession, ElementSnapshot};
use stream_scout::error::SessionError;

/// What a test can still observe after the session moved into a `SharedSession`.
#[derive(Clone, Default)]
pub struct Recorder {
    pub visits: Arc<Mutex<Vec<String>>>,
    pub clicks: Arc<AtomicUsize>,
    pub frames_left: Arc<AtomicUsize>,
    pub in_frame: Arc<AtomicBool>,
}

impl Recorder {
    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }

    pub fn clicks(&self) -> usize {
        self.clicks.load(Ordering::SeqCst)
    }

    pub fn frames_left(&self) -> usize {
        self.frames_left.load(Ordering::SeqCst)
    }

    pub fn in_frame(&self) -> bool {
        self.in_frame.load(Ordering::SeqCst)
    }
}

/// In-memory browser over scripted pages. Unknown URLs fail to navigate,
/// iframes are only enterable when a document was registered for their `src`.
#[derive(Default)]
pub struct FakeSession {
    pages: HashMap<String, String>,
    after_click: HashMap<String, String>,
    frames: HashMap<String, String>,
    current: Option<String>,
    html: String,
    frame: Option<String>,
    recorder: Recorder,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Page content once something on `url` was clicked.
    pub fn after_click(mut self, url: &str, html: &str) -> Self {
        self.after_click.insert(url.to_string(), html.to_string());
        self
    }

    pub fn frame(mut self, src: &str, html: &str) -> Self {
        self.frames.insert(src.to_string(), html.to_string());
        self
    }

    pub fn recorder(&self) -> Recorder {
        self.recorder.clone()
    }

    fn document(&self) -> &str {
        match &self.frame {
            Some(src) => self.frames.get(src).map(String::as_str).unwrap_or(""),
            None => &self.html,
        }
    }

    fn select(&self, selector: &str) -> Result<Vec<String>, SessionError> {
        let parsed = Selector::parse(selector)
            .map_err(|err| SessionError::Script(format!("{selector}: {err:?}")))?;
        let document = Html::parse_document(self.document());
        Ok(document.select(&parsed).map(|el| el.html()).collect())
    }
}

impl BrowserSession for FakeSession {
    fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.recorder.visits.lock().unwrap().push(url.to_string());
        self.frame = None;
        self.recorder.in_frame.store(false, Ordering::SeqCst);
        match self.pages.get(url) {
            Some(html) => {
                self.html = html.clone();
                self.current = Some(url.to_string());
                Ok(())
            }
            None => Err(SessionError::Navigation {
                url: url.to_string(),
                message: "404".to_string(),
            }),
        }
    }

    fn find_all(&mut self, selector: &str, _timeout: Duration) -> Result<Vec<ElementSnapshot>, SessionError> {
        Ok(self.select(selector)?.into_iter().map(ElementSnapshot::new).collect())
    }

    fn click_all(&mut self, selector: &str, text: Option<&str>) -> Result<usize, SessionError> {
        let clicked = self
            .select(selector)?
            .into_iter()
            .filter(|html| {
                text.is_none_or(|needle| ElementSnapshot::new(html.as_str()).text().contains(needle))
            })
            .count();
        self.recorder.clicks.fetch_add(clicked, Ordering::SeqCst);

        if clicked > 0 {
            if let Some(revealed) = self.current.as_ref().and_then(|url| self.after_click.get(url)) {
                self.html = revealed.clone();
            }
        }
        Ok(clicked)
    }

    fn page_source(&mut self) -> Result<String, SessionError> {
        Ok(self.document().to_string())
    }

    fn enter_frame(&mut self, selector: &str, index: usize) -> Result<(), SessionError> {
        let src = self
            .select(selector)?
            .get(index)
            .and_then(|html| ElementSnapshot::new(html.as_str()).attr("src"))
            .ok_or_else(|| SessionError::Frame(format!("{selector}[{index}]")))?;
        if !self.frames.contains_key(&src) {
            return Err(SessionError::Frame(format!("{src}: blocked")));
        }
        self.frame = Some(src);
        self.recorder.in_frame.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn leave_frame(&mut self) -> Result<(), SessionError> {
        self.frame = None;
        self.recorder.in_frame.store(false, Ordering::SeqCst);
        self.recorder.frames_left.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn user_agent(&mut self) -> Result<String, SessionError> {
        Ok("fake-agent/1.0".to_string())
    }

    fn cookies(&mut self) -> Result<Vec<BrowserCookie>, SessionError> {
        Ok(Vec::new())
    }

    fn settle(&mut self, _delay: Duration) {}
}
