//! Cadeias de fallback sobre seletores.
//!
//! Cada consulta tenta uma lista ordenada de estratégias e fica com a
//! primeira que encontrar algo. Uma estratégia que falha é só pulada.

use std::time::Duration;

use crate::browser::{BrowserSession, ElementSnapshot};
use crate::providers::SiteContext;

/// Seletor de contêiner, opcionalmente exigindo descendentes.
#[derive(Debug, Clone, Copy)]
pub struct Strategy {
    pub selector: &'static str,
    pub requires: &'static [&'static str],
}

impl Strategy {
    pub const fn css(selector: &'static str) -> Self {
        Self {
            selector,
            requires: &[],
        }
    }

    pub const fn requiring(self, requires: &'static [&'static str]) -> Self {
        Self {
            selector: self.selector,
            requires,
        }
    }

    fn accepts(&self, element: &ElementSnapshot) -> bool {
        self.requires.iter().all(|sel| element.has(sel))
    }
}

pub fn find_all_or_empty(
    session: &mut dyn BrowserSession,
    selector: &str,
    timeout: Duration,
) -> Vec<ElementSnapshot> {
    match session.find_all(selector, timeout) {
        Ok(found) => found,
        Err(err) => {
            log::debug!("Consulta {:?} falhou: {}", selector, err);
            Vec::new()
        }
    }
}

/// Primeira estratégia com pelo menos um elemento aceito.
pub fn first_matching(
    session: &mut dyn BrowserSession,
    strategies: &[Strategy],
    timeout: Duration,
) -> Vec<ElementSnapshot> {
    for strategy in strategies {
        let found: Vec<_> = find_all_or_empty(session, strategy.selector, timeout)
            .into_iter()
            .filter(|el| strategy.accepts(el))
            .collect();
        if !found.is_empty() {
            log::debug!("{} elementos com {:?}", found.len(), strategy.selector);
            return found;
        }
        log::trace!("Nada com {:?}, tentando a próxima estratégia", strategy.selector);
    }
    Vec::new()
}

/// Título do card: texto do primeiro elemento que tiver texto, senão o
/// atributo `title` dele.
pub fn first_text(tile: &ElementSnapshot, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|sel| {
        let el = tile.find(sel)?;
        let text = el.text();
        if !text.is_empty() {
            return Some(text);
        }
        el.attr("title")
    })
}

pub fn first_attr(element: &ElementSnapshot, attrs: &[&str]) -> Option<String> {
    attrs.iter().find_map(|name| element.attr(name))
}

/// Primeiro `href` utilizável, já absoluto.
pub fn first_href(tile: &ElementSnapshot, selectors: &[&str], ctx: &SiteContext) -> Option<String> {
    selectors.iter().find_map(|sel| {
        let href = tile.find(sel)?.attr("href")?;
        ctx.absolutize(&href)
    })
}

pub fn first_image(tile: &ElementSnapshot, attrs: &[&str], ctx: &SiteContext) -> Option<String> {
    let img = tile.find("img")?;
    let src = first_attr(&img, attrs)?;
    ctx.absolutize(&src).or(Some(src))
}

/// Links das âncoras encontradas pela primeira estratégia que render algum.
pub fn first_links(
    session: &mut dyn BrowserSession,
    selectors: &[&str],
    timeout: Duration,
    ctx: &SiteContext,
) -> Vec<String> {
    for selector in selectors {
        let mut links = crate::normalizer::CandidateSet::default();
        for anchor in find_all_or_empty(session, selector, timeout) {
            if let Some(url) = anchor.attr("href").and_then(|href| ctx.absolutize(&href)) {
                links.insert(url);
            }
        }
        if !links.is_empty() {
            return links.into_vec();
        }
    }
    Vec::new()
}
