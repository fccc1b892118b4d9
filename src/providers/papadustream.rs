use std::time::Duration;

use crate::browser::{BrowserSession, ElementSnapshot};
use crate::models::MediaDescriptor;
use crate::providers::dom::{self, find_all_or_empty};
use crate::providers::frame_fetch::FrameFetcher;
use crate::providers::harvest::{harvest_page, ClickTarget, HarvestPlan};
use crate::providers::{Provider, SiteContext, MAX_SEARCH_RESULTS};

const SEARCH_TEMPLATE: &str = "/f/l.title={q}/p.cat=11/sort=editdate/order=desc/";
const TILE_SELECTOR: &str = "div[class*='short_in']";
const TITLE_SELECTORS: [&str; 1] = ["div[class*='short_title'] a"];
const TILE_TITLE_ATTRS: [&str; 3] = ["data-title", "title", "aria-label"];
const DETAIL_SELECTORS: [&str; 2] = ["div[class*='short_title'] a", "a[class*='short_img']"];
const IMAGE_ATTRS: [&str; 2] = ["data-src", "src"];
const SEASON_SELECTOR: &str = "div[class*='seasontab'] a[href*='-saison.html']";
const EPISODE_SELECTORS: [&str; 1] = ["div[class*='saisontab'] a[href*='-episode.html']"];

struct SeriesEntry {
    title: String,
    detail_url: Option<String>,
    image_url: Option<String>,
}

/// PapaduStream: a busca devolve séries, cada uma desdobrada em temporadas;
/// as subpáginas de uma temporada são os episódios.
pub struct PapaduStreamProvider {
    ctx: SiteContext,
    plan: HarvestPlan,
    fetcher: FrameFetcher,
}

impl PapaduStreamProvider {
    pub const ID: &'static str = "papadustream";

    pub fn new(ctx: SiteContext) -> Self {
        let marker = ctx.scanner().marker().to_string();
        let plan = HarvestPlan {
            play_targets: vec![ClickTarget::css(format!(
                "div[class*='lien'][onclick*='{}_']",
                marker
            ))],
            attr_sources: Vec::new(),
        };
        Self {
            ctx,
            plan,
            fetcher: FrameFetcher::new(Duration::from_secs(10)),
        }
    }

    fn series_entries(&self, session: &mut dyn BrowserSession) -> Vec<SeriesEntry> {
        find_all_or_empty(session, TILE_SELECTOR, self.ctx.waits().long)
            .iter()
            .filter_map(|tile| self.series_from_tile(tile))
            .collect()
    }

    fn series_from_tile(&self, tile: &ElementSnapshot) -> Option<SeriesEntry> {
        let title = tile
            .find(TITLE_SELECTORS[0])
            .map(|el| el.text())
            .filter(|t| !t.is_empty())
            .or_else(|| dom::first_attr(tile, &TILE_TITLE_ATTRS))?;

        Some(SeriesEntry {
            title,
            detail_url: dom::first_href(tile, &DETAIL_SELECTORS, &self.ctx),
            image_url: dom::first_image(tile, &IMAGE_ATTRS, &self.ctx),
        })
    }

    fn season_medias(&self, session: &mut dyn BrowserSession, series: SeriesEntry) -> Vec<MediaDescriptor> {
        let Some(detail_url) = series.detail_url else {
            // Card sem link: só o título, ainda é um resultado
            return vec![MediaDescriptor::new(series.title, None, series.image_url)];
        };
        let seasonless = |url: String| {
            vec![MediaDescriptor::new(
                series.title.clone(),
                Some(url),
                series.image_url.clone(),
            )]
        };

        if let Err(err) = session.navigate(&detail_url) {
            log::warn!("PapaduStream: {}", err);
            return seasonless(detail_url);
        }
        session.settle(self.ctx.waits().frame_settle);

        let anchors = find_all_or_empty(session, SEASON_SELECTOR, self.ctx.waits().long);
        if anchors.is_empty() {
            return seasonless(detail_url);
        }

        anchors
            .iter()
            .filter_map(|anchor| {
                let season_url = anchor.attr("href").and_then(|href| self.ctx.absolutize(&href))?;
                let label = Some(anchor.text())
                    .filter(|t| !t.is_empty())
                    .or_else(|| anchor.attr("title"))
                    .unwrap_or_default();
                let title = format!("{} {}", series.title, label).trim().to_string();
                let image_url = dom::first_image(anchor, &IMAGE_ATTRS, &self.ctx)
                    .or_else(|| series.image_url.clone());
                Some(MediaDescriptor::new(title, Some(season_url), image_url))
            })
            .collect()
    }
}

impl Provider for PapaduStreamProvider {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn search(&self, query: &str) -> Vec<MediaDescriptor> {
        let Some(search_url) = self.ctx.search_url(SEARCH_TEMPLATE, query) else {
            return Vec::new();
        };
        let mut session = self.ctx.lock();
        if let Err(err) = session.navigate(&search_url) {
            log::warn!("PapaduStream: {}", err);
            return Vec::new();
        }

        // Os cards são copiados antes de sair da página de busca
        let series = self.series_entries(&mut *session);
        log::debug!("PapaduStream: {} séries em {}", series.len(), search_url);

        let mut medias = Vec::new();
        for entry in series {
            medias.extend(self.season_medias(&mut *session, entry));
            if medias.len() >= MAX_SEARCH_RESULTS {
                break;
            }
        }
        medias.truncate(MAX_SEARCH_RESULTS);
        medias
    }

    fn discover_sub_pages(&self, media_url: &str) -> Vec<String> {
        let mut session = self.ctx.lock();
        if let Err(err) = session.navigate(media_url) {
            log::warn!("PapaduStream: {}", err);
            return vec![media_url.to_string()];
        }

        let episodes = dom::first_links(&mut *session, &EPISODE_SELECTORS, self.ctx.waits().long, &self.ctx);
        if episodes.is_empty() {
            return vec![media_url.to_string()];
        }
        episodes
    }

    fn harvest_candidates(&self, page_url: &str) -> Vec<String> {
        harvest_page(&self.ctx, page_url, &self.plan, Some(&self.fetcher))
    }
}
