use crate::browser::ElementSnapshot;
use crate::models::MediaDescriptor;
use crate::providers::dom::{self, Strategy};
use crate::providers::harvest::{harvest_page, ClickTarget, HarvestPlan};
use crate::providers::{Provider, SiteContext, MAX_SEARCH_RESULTS};

// Padrões de URL de busca, testados em ordem
const SEARCH_TEMPLATES: [&str; 3] = ["/search/{q}", "/recherche/{q}", "/?s={q}"];

const TILE_STRATEGIES: [Strategy; 4] = [
    Strategy::css("div[class*='movie-item'], div[class*='serie-item']"),
    Strategy::css("div[class*='result-item']"),
    Strategy::css("div[class*='item']").requiring(&["a", "img"]),
    Strategy::css("article[class*='post'], article[class*='item']"),
];

const TITLE_SELECTORS: [&str; 5] = [
    "h2 a",
    "h3 a",
    "div[class*='title'] a",
    "a[class*='title']",
    "a[title]",
];

const LINK_SELECTORS: [&str; 2] = ["a[href*='/']:not([href*='javascript'])", "a[href]"];

const IMAGE_ATTRS: [&str; 3] = ["data-src", "src", "data-lazy-src"];

const EPISODE_SELECTORS: [&str; 4] = [
    "div[class*='episode'] a",
    "a[class*='episode']",
    "div[class*='saison'] a, div[class*='season'] a",
    "a[href*='episode'], a[href*='ep-']",
];

/// Flemmix (antigo Wiflix).
pub struct FlemmixProvider {
    ctx: SiteContext,
    plan: HarvestPlan,
}

impl FlemmixProvider {
    pub const ID: &'static str = "flemmix";

    pub fn new(ctx: SiteContext) -> Self {
        let marker = ctx.scanner().marker().to_string();
        let plan = HarvestPlan {
            play_targets: vec![
                ClickTarget::css("button[class*='play']"),
                ClickTarget::containing("button", "Lecture"),
                ClickTarget::css("a[class*='play-button']"),
                ClickTarget::css(format!("div[onclick*='{}']", marker)),
            ],
            attr_sources: Vec::new(),
        };
        Self { ctx, plan }
    }

    fn media_from_tile(&self, tile: &ElementSnapshot) -> Option<MediaDescriptor> {
        // Sem título o card é descartado; sem link ou imagem ele ainda vale
        let title = dom::first_text(tile, &TITLE_SELECTORS)?;
        let url = dom::first_href(tile, &LINK_SELECTORS, &self.ctx);
        let image_url = dom::first_image(tile, &IMAGE_ATTRS, &self.ctx);
        Some(MediaDescriptor::new(title, url, image_url))
    }
}

impl Provider for FlemmixProvider {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn search(&self, query: &str) -> Vec<MediaDescriptor> {
        let waits = *self.ctx.waits();
        let mut session = self.ctx.lock();

        for template in SEARCH_TEMPLATES {
            let Some(search_url) = self.ctx.search_url(template, query) else {
                continue;
            };
            if let Err(err) = session.navigate(&search_url) {
                log::warn!("Erro na URL de busca {}: {}", search_url, err);
                continue;
            }
            session.settle(waits.settle);

            let tiles = dom::first_matching(&mut *session, &TILE_STRATEGIES, waits.element);
            let medias: Vec<MediaDescriptor> = tiles
                .iter()
                .filter_map(|tile| self.media_from_tile(tile))
                .take(MAX_SEARCH_RESULTS)
                .collect();

            if !medias.is_empty() {
                log::info!("Flemmix: {} resultados em {}", medias.len(), search_url);
                return medias;
            }
            log::debug!("Flemmix: nada em {}", search_url);
        }

        Vec::new()
    }

    fn discover_sub_pages(&self, media_url: &str) -> Vec<String> {
        let waits = *self.ctx.waits();
        let mut session = self.ctx.lock();

        if let Err(err) = session.navigate(media_url) {
            log::warn!("Flemmix: {}", err);
            return vec![media_url.to_string()];
        }
        session.settle(waits.settle);

        let episodes = dom::first_links(&mut *session, &EPISODE_SELECTORS, waits.element, &self.ctx);
        if episodes.is_empty() {
            // Sem episódios, a própria página é tratada como um vídeo
            return vec![media_url.to_string()];
        }
        episodes
    }

    fn harvest_candidates(&self, page_url: &str) -> Vec<String> {
        harvest_page(&self.ctx, page_url, &self.plan, None)
    }
}
