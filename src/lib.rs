//! rt_catalog - Resolve RT channels and documentary series into playable streams
//!
//! This library scrapes loosely structured RT pages: it recovers the series
//! catalog, the episodes of a series with their inferred seasons, and the
//! HLS manifest behind a player page. A [`Navigator`] ties the extractors
//! into the list → episodes → play flow of a media center add-on.

mod catalog_extractor;
mod config;
mod episode_extractor;
mod host;
mod navigator;
mod page_fetcher;
mod stream_extractor;
mod urls;

// Re-export error types
pub use config::ConfigError;
pub use navigator::ActionError;
pub use page_fetcher::FetchError;

// Re-export the pipeline
pub use catalog_extractor::{CatalogExtractor, SeriesEntry};
pub use config::{Channel, DEFAULT_USER_AGENT, SiteConfig, default_config_path};
pub use episode_extractor::{
    EpisodeEntry, EpisodeExtractor, SeasonGroup, assign_seasons, discover_seasons,
    group_by_season, parse_episode_number,
};
pub use host::{DirectoryItem, Host, ItemInfo, JsonLinesHost, PlayableItem, Resolution};
pub use navigator::{Action, Navigator, Variant};
pub use page_fetcher::{HttpFetcher, PageSource, SourcePage};
pub use stream_extractor::{StreamExtractor, StreamResult};
pub use urls::absolutize;

use log::warn;
use thiserror::Error;

/// Top-level error type for rt_catalog operations
#[derive(Debug, Error)]
pub enum RtCatalogError {
    /// Error loading or applying the configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error setting up the HTTP client
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
}

/// Handles one host request over HTTP
///
/// Parses `query`, performs the action with a blocking [`HttpFetcher`] and
/// reports the outcome to `host`. Fetch and extraction failures never end up
/// here; they surface as empty listings or failed resolutions. A request
/// lacking a required parameter is logged and produces no output at all.
///
/// # Arguments
///
/// * `config` - Site settings for the extractors and the HTTP client
/// * `variant` - Which add-on flavour answers the default listing
/// * `base_url` - Plugin URL that callback targets are built from
/// * `query` - The host's URL-encoded query string, with or without `?`
/// * `host` - Receiver for listings and resolutions
///
/// # Errors
///
/// Returns an error if a pattern built from `config` does not compile or the
/// HTTP client cannot be set up.
///
/// # Examples
///
/// ```no_run
/// use rt_catalog::{handle_request, JsonLinesHost, SiteConfig, Variant};
///
/// let config = SiteConfig::default();
/// let mut host = JsonLinesHost::new(std::io::stdout());
/// handle_request(
///     &config,
///     Variant::Live,
///     "plugin://plugin.video.nextgenrt/",
///     "?action=play&url=https://www.rt.com/on-air/",
///     &mut host,
/// )
/// .unwrap();
/// ```
pub fn handle_request<H: Host>(
    config: &SiteConfig,
    variant: Variant,
    base_url: &str,
    query: &str,
    host: &mut H,
) -> Result<(), RtCatalogError> {
    let action = match Action::from_query(query) {
        Ok(action) => action,
        Err(e) => {
            warn!("Ignoring request: {}", e);
            return Ok(());
        }
    };
    let fetcher = HttpFetcher::new(&config.user_agent)?;
    let navigator = Navigator::new(config, &fetcher, base_url, variant)?;

    navigator.handle(&action, host);
    Ok(())
}
