use crate::browser::ElementSnapshot;
use crate::models::MediaDescriptor;
use crate::providers::dom::{self, find_all_or_empty};
use crate::providers::harvest::{harvest_page, ClickTarget, HarvestPlan};
use crate::providers::{Provider, SiteContext, MAX_SEARCH_RESULTS};

const SEARCH_TEMPLATE: &str = "/search/{q}";
const SERIES_SELECTOR: &str = "div[class*='short serie']";
const FILMS_SELECTOR: &str = "div[class*='short-in nl']";
const TITLE_SELECTORS: [&str; 2] = ["div[class*='short-title']", "a[title]"];
const LINK_SELECTORS: [&str; 2] = ["a[class*='short-poster']", "a[href]"];
const IMAGE_ATTRS: [&str; 2] = ["src", "data-src"];

/// French-Stream: cards de séries e de filmes na mesma página de busca, e
/// os links do resolver ficam em atributos `data-*` dos botões de player.
pub struct FrenchStreamProvider {
    ctx: SiteContext,
    plan: HarvestPlan,
}

impl FrenchStreamProvider {
    pub const ID: &'static str = "french-stream";

    pub fn new(ctx: SiteContext) -> Self {
        let marker = ctx.scanner().marker().to_string();
        let plan = HarvestPlan {
            play_targets: vec![ClickTarget::css(format!(
                "a[data-href*='{}'][id*='singh1']",
                marker
            ))],
            attr_sources: vec![
                (format!("a[data-href*='{}']", marker), "data-href".to_string()),
                (
                    format!("div[data-url-default*='{}']", marker),
                    "data-url-default".to_string(),
                ),
            ],
        };
        Self { ctx, plan }
    }

    fn media_from_tile(&self, tile: &ElementSnapshot) -> Option<MediaDescriptor> {
        let title = dom::first_text(tile, &TITLE_SELECTORS)?;
        Some(MediaDescriptor::new(
            title,
            dom::first_href(tile, &LINK_SELECTORS, &self.ctx),
            dom::first_image(tile, &IMAGE_ATTRS, &self.ctx),
        ))
    }
}

impl Provider for FrenchStreamProvider {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn search(&self, query: &str) -> Vec<MediaDescriptor> {
        let Some(search_url) = self.ctx.search_url(SEARCH_TEMPLATE, query) else {
            return Vec::new();
        };
        let waits = *self.ctx.waits();
        let mut session = self.ctx.lock();
        if let Err(err) = session.navigate(&search_url) {
            log::warn!("French-Stream: {}", err);
            return Vec::new();
        }

        // Séries primeiro, depois filmes
        let mut tiles = find_all_or_empty(&mut *session, SERIES_SELECTOR, waits.element);
        tiles.extend(find_all_or_empty(&mut *session, FILMS_SELECTOR, waits.short));

        tiles
            .iter()
            .filter_map(|tile| self.media_from_tile(tile))
            .take(MAX_SEARCH_RESULTS)
            .collect()
    }

    fn discover_sub_pages(&self, media_url: &str) -> Vec<String> {
        // Cada página de filme ou série já traz todos os players
        vec![media_url.to_string()]
    }

    fn harvest_candidates(&self, page_url: &str) -> Vec<String> {
        harvest_page(&self.ctx, page_url, &self.plan, None)
    }
}
