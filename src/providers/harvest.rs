use crate::browser::{BrowserSession, FrameScope};
use crate::normalizer::{CandidateScanner, CandidateSet};
use crate::providers::dom::find_all_or_empty;
use crate::providers::frame_fetch::FrameFetcher;
use crate::providers::SiteContext;

/// Afordância de "play" que faz o player preguiçoso aparecer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickTarget {
    pub selector: String,
    pub text: Option<String>,
}

impl ClickTarget {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text: None,
        }
    }

    pub fn containing(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text: Some(text.into()),
        }
    }
}

/// O que cada site faz de diferente numa página de episódio.
#[derive(Debug, Clone, Default)]
pub struct HarvestPlan {
    pub play_targets: Vec<ClickTarget>,
    /// Pares (seletor, atributo) cujo valor já é um link do resolver.
    pub attr_sources: Vec<(String, String)>,
}

/// Coleta de candidatos numa página: cliques de play, atributos do site,
/// `src` dos iframes do resolver, documento de cada iframe, busca HTTP do
/// iframe (quando há `fetcher`) e o HTML da página inteira.
pub(crate) fn harvest_page(
    ctx: &SiteContext,
    page_url: &str,
    plan: &HarvestPlan,
    fetcher: Option<&FrameFetcher>,
) -> Vec<String> {
    let waits = *ctx.waits();
    let scanner = ctx.scanner();
    let mut session = ctx.lock();
    let mut links = CandidateSet::default();

    if let Err(err) = session.navigate(page_url) {
        log::warn!("Página ignorada: {}", err);
        return links.into_vec();
    }
    session.settle(waits.settle);

    for target in &plan.play_targets {
        if find_all_or_empty(&mut *session, &target.selector, waits.short).is_empty() {
            continue;
        }
        match session.click_all(&target.selector, target.text.as_deref()) {
            Ok(0) => {}
            Ok(clicked) => {
                log::debug!("{} cliques em {:?}", clicked, target.selector);
                session.settle(waits.click_settle);
            }
            Err(err) => log::debug!("Clique em {:?} falhou: {}", target.selector, err),
        }
    }

    for (selector, attr) in &plan.attr_sources {
        for element in find_all_or_empty(&mut *session, selector, waits.short) {
            if let Some(value) = element.attr(attr) {
                if scanner.is_relevant(&value) {
                    links.insert(value);
                }
            }
        }
    }

    let iframe_selector = format!("iframe[src*='{}']", scanner.marker());
    let iframes = find_all_or_empty(&mut *session, &iframe_selector, waits.long);
    for (index, iframe) in iframes.iter().enumerate() {
        let src = iframe
            .attr("src")
            .filter(|src| scanner.is_relevant(src))
            .map(|src| ctx.absolutize(&src).unwrap_or(src));
        if let Some(src) = &src {
            links.insert(src.clone());
        }

        links.extend(scan_frame(&mut *session, scanner, &iframe_selector, index, waits.frame_settle));

        if let (Some(fetcher), Some(src)) = (fetcher, &src) {
            if let Some(html) = fetcher.fetch(&mut *session, src, page_url) {
                links.extend(scanner.scan(&html));
            }
        }
    }

    match session.page_source() {
        Ok(html) => links.extend(scanner.scan(&html)),
        Err(err) => log::debug!("Sem código-fonte de {}: {}", page_url, err),
    }

    log::debug!("{} candidatos em {}", links.len(), page_url);
    links.into_vec()
}

fn scan_frame(
    session: &mut dyn BrowserSession,
    scanner: &CandidateScanner,
    selector: &str,
    index: usize,
    settle: std::time::Duration,
) -> Vec<String> {
    let mut frame = match FrameScope::enter(session, selector, index) {
        Ok(frame) => frame,
        Err(err) => {
            log::debug!("Iframe {} inacessível: {}", index, err);
            return Vec::new();
        }
    };
    frame.settle(settle);
    match frame.page_source() {
        Ok(html) => scanner.scan(&html),
        Err(err) => {
            log::debug!("Falha ao ler o iframe {}: {}", index, err);
            Vec::new()
        }
    }
}
