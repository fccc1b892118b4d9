use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser, Subcommand};
use std::sync::Arc;

use stream_scout::api::StreamService;
use stream_scout::browser::{BrowserOptions, ChromeSession, shared};
use stream_scout::cache::ResultCache;
use stream_scout::config::{AppConfig, config_path};
use stream_scout::error::ConfigError;
use stream_scout::logging;
use stream_scout::models::{MediaDescriptor, ResolvedVideo};
use stream_scout::normalizer::LinkNormalizer;
use stream_scout::pipeline::ExtractionPipeline;
use stream_scout::providers::{PROVIDER_IDS, ProviderRegistry};
use stream_scout::resolver::UqloadResolver;
use stream_scout::utils::{format_duration, format_size};

mod ui;

#[derive(Parser)]
#[command(name = "stream-scout", version, about = "Search streaming sites and extract video links")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Cache TTL in seconds
    #[arg(long, global = true)]
    ttl: Option<u64>,

    /// Maximum number of links resolved at the same time
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Show the browser window
    #[arg(long, global = true)]
    no_headless: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List available providers
    Providers,

    /// Search for media on a provider
    Search {
        query: String,

        /// Provider id (defaults to the configured one)
        #[arg(short, long)]
        provider: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Extract the videos of a media page
    Resolve {
        url: String,

        /// Provider id (defaults to the configured one)
        #[arg(short, long)]
        provider: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = AppConfig::load().context("Failed to load configuration")?;
    if let Some(ttl) = cli.ttl {
        config.cache_ttl_secs = ttl;
    }
    if let Some(concurrency) = cli.concurrency {
        config.resolver_concurrency = concurrency;
    }
    if cli.no_headless {
        config.headless = false;
    }

    match cli.command {
        Some(Commands::Providers) => {
            println!("Providers: {}", PROVIDER_IDS.join(", "));
            println!("Default: {}", config.default_provider);
        }
        Some(Commands::Config { save }) => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if save {
                let path = config.save()?;
                println!("Saved to {}", path.display());
            } else {
                println!("Config file: {}", config_path()?.display());
            }
        }
        Some(Commands::Search { query, provider, json }) => {
            check_provider(provider.as_deref())?;
            let service = build_service(&config).await?;

            let progress = ui::spinner(&format!("Searching for: {}", query));
            let results = service.search_media(&query, provider.as_deref()).await;
            progress.finish_and_clear();
            let results = results?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                println!("No results for: {}", query);
            } else {
                print_medias(&results);
            }
        }
        Some(Commands::Resolve { url, provider, json }) => {
            check_provider(provider.as_deref())?;
            let service = build_service(&config).await?;

            let progress = ui::spinner(&format!("Extracting videos from {}", url));
            let videos = service.get_videos(&url, provider.as_deref()).await;
            progress.finish_and_clear();
            let videos = videos?;

            if json {
                println!("{}", serde_json::to_string_pretty(&videos)?);
            } else {
                print_videos(&videos);
            }
        }
        None => {
            let service = build_service(&config).await?;
            interactive(&service).await?;
        }
    }

    Ok(())
}

// Reject a bad provider id before paying for a browser launch
fn check_provider(provider: Option<&str>) -> Result<(), ConfigError> {
    match provider {
        Some(id) if !PROVIDER_IDS.contains(&id) => Err(ConfigError::UnknownProvider {
            id: id.to_string(),
            available: PROVIDER_IDS.iter().map(|id| id.to_string()).collect(),
        }),
        _ => Ok(()),
    }
}

async fn build_service(config: &AppConfig) -> Result<StreamService> {
    let options = BrowserOptions {
        headless: config.headless,
        timeout: config.browser_timeout(),
    };
    let session = tokio::task::spawn_blocking(move || ChromeSession::launch(&options))
        .await
        .context("Browser launch task failed")??;

    let registry = ProviderRegistry::with_default_sites(shared(session), config)?;
    let resolver = Arc::new(UqloadResolver::new()?);
    let cache = Arc::new(ResultCache::new(config.cache_ttl()));
    let pipeline = ExtractionPipeline::new(cache, resolver, LinkNormalizer::new(&config.hosts))
        .with_concurrency(config.resolver_concurrency);

    Ok(StreamService::new(registry, pipeline))
}

async fn interactive(service: &StreamService) -> Result<()> {
    let listing = service.list_providers();
    let provider_index = select_from_list_with_default(&listing.providers, &listing.default)?;
    let provider = listing.providers[provider_index].clone();

    loop {
        let query = ui::prompt_input("Search")?;
        if query.is_empty() {
            break;
        }

        let progress = ui::spinner(&format!("Searching for: {}", query));
        let results = service.search_media(&query, Some(&provider)).await;
        progress.finish_and_clear();
        let results = results?;

        if results.is_empty() {
            println!("No results for: {}", query);
        } else {
            let titles: Vec<String> = results.iter().map(|media| media.title.clone()).collect();
            let selected = &results[ui::select_from_list(&titles, "Select media:")?];

            match &selected.url {
                None => println!("No page link for: {}", selected.title),
                Some(url) => {
                    let progress = ui::spinner(&format!("Extracting videos from {}", url));
                    let videos = service.get_videos(url, Some(&provider)).await;
                    progress.finish_and_clear();
                    print_videos(&videos?);
                }
            }
        }

        if !ui::confirm("Search again?", true)? {
            break;
        }
    }

    let swept = service.sweep_cache();
    log::debug!("{} expired cache entries removed", swept);
    Ok(())
}

fn select_from_list_with_default(providers: &[String], default: &str) -> Result<usize> {
    if providers.is_empty() {
        return Err(anyhow!("No providers registered"));
    }
    // Put the default first so Enter picks it
    let mut ordered: Vec<String> = providers.to_vec();
    if let Some(pos) = ordered.iter().position(|id| id == default) {
        let id = ordered.remove(pos);
        ordered.insert(0, id);
    }
    let picked = ui::select_from_list(&ordered, "Select provider:")?;
    Ok(providers
        .iter()
        .position(|id| id == &ordered[picked])
        .unwrap_or(0))
}

fn print_medias(medias: &[MediaDescriptor]) {
    for (i, media) in medias.iter().enumerate() {
        println!("{:>2}. {}", i + 1, media.title);
        if let Some(url) = &media.url {
            println!("    {}", url);
        }
    }
}

fn print_videos(videos: &[ResolvedVideo]) {
    if videos.is_empty() {
        println!("No videos found");
        return;
    }

    for (i, video) in videos.iter().enumerate() {
        println!("{:>2}. {}", i + 1, video.title.as_deref().unwrap_or("(untitled)"));
        println!("    Embed: {}", video.canonical_url);
        if let Some(direct) = &video.direct_url {
            println!("    Direct: {}", direct);
        }

        let mut details = Vec::new();
        if let Some(seconds) = video.duration_seconds {
            details.push(format_duration(seconds));
        }
        if let Some(resolution) = &video.resolution {
            details.push(resolution.clone());
        }
        if let Some(bytes) = video.size_bytes {
            details.push(format_size(bytes));
        }
        if let Some(media_type) = &video.media_type {
            details.push(media_type.clone());
        }
        if !details.is_empty() {
            println!("    {}", details.join(" | "));
        }
    }
}
