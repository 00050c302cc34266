//! Stream resolution
//!
//! RT pages embed their players in several different ways: raw JavaScript
//! object literals, HTML5 `<source>` tags and third-party iframes. Resolution
//! runs an ordered cascade of cheap matchers over the page text and keeps the
//! first hit. Only the iframe step touches the network again, and only once.

use crate::config::SiteConfig;
use crate::page_fetcher::{FetchError, PageSource, SourcePage};
use crate::urls::{host_of, resolve_embed};
use log::{error, info, warn};
use regex::Regex;
use std::sync::LazyLock;

/// File extension marking an HLS manifest
pub const HLS_EXTENSION: &str = ".m3u8";

static BARE_M3U8: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(https?://[^"\s]+\.m3u8[^"\s]*)"#).unwrap());
static FILE_ASSIGNMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"file:\s*['"]([^'"]+)['"]"#).unwrap());
static URL_ASSIGNMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"url:\s*["']([^"']+\.m3u8[^"']*)["']"#).unwrap());
static SOURCE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<source[^>]+src=["']([^"']+)["']"#).unwrap());
static IFRAME_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<iframe[^>]+src=["']([^"']+)["']"#).unwrap());
static STREAMS_HLS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)streams_hls.+?url:\s*["']([^"']+)["']"#).unwrap());
static RUMBLE_EMBED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"rumble\.com/embed/([^/?"\s]+)"#).unwrap());

/// A pure matcher over page text
type Matcher = fn(&str) -> Option<String>;

/// Matchers tried in order before falling back to the iframe step
const DIRECT_MATCHERS: &[(&str, Matcher)] = &[
    ("m3u8 url", find_bare_m3u8),
    ("file pattern", find_file_assignment),
    ("url pattern", find_url_assignment),
    ("source tag", find_source_tag),
];

/// A resolved, playable stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamResult {
    /// Location of the media manifest
    pub manifest_url: String,
    /// Whether the manifest is HLS and should go through the adaptive engine
    pub is_adaptive: bool,
}

impl StreamResult {
    pub fn new(manifest_url: impl Into<String>) -> Self {
        let manifest_url = manifest_url.into();
        let is_adaptive = manifest_url.contains(HLS_EXTENSION);
        Self {
            manifest_url,
            is_adaptive,
        }
    }
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text).map(|caps| caps[1].to_string())
}

/// Any absolute URL pointing at an `.m3u8` manifest
pub fn find_bare_m3u8(html: &str) -> Option<String> {
    first_capture(&BARE_M3U8, html)
}

/// A `file: "<value>"` player option
pub fn find_file_assignment(html: &str) -> Option<String> {
    first_capture(&FILE_ASSIGNMENT, html)
}

/// A `url: "<value>"` player option whose value is an `.m3u8` manifest
pub fn find_url_assignment(html: &str) -> Option<String> {
    first_capture(&URL_ASSIGNMENT, html)
}

/// An HTML5 `<source src="<value>">` tag
pub fn find_source_tag(html: &str) -> Option<String> {
    first_capture(&SOURCE_TAG, html)
}

/// The `url` inside the `streams_hls` block of the documentary player config
pub fn find_streams_hls(html: &str) -> Option<String> {
    first_capture(&STREAMS_HLS, html)
}

/// The `src` of the first iframe on the page
pub fn find_iframe_src(html: &str) -> Option<String> {
    first_capture(&IFRAME_TAG, html)
}

/// Resolves pages to playable streams
pub struct StreamExtractor<'a, S>
where
    S: PageSource,
{
    config: &'a SiteConfig,
    source: &'a S,
}

impl<'a, S> StreamExtractor<'a, S>
where
    S: PageSource,
{
    pub fn new(config: &'a SiteConfig, source: &'a S) -> Self {
        Self { config, source }
    }

    /// Fetches `page_url` and resolves the stream it embeds
    ///
    /// # Arguments
    ///
    /// * `page_url` - Absolute URL of a player or live page
    ///
    /// # Returns
    ///
    /// `Ok(None)` if no matcher produced a URL. Only the initial fetch can
    /// fail; an unreachable iframe counts as not found.
    pub fn resolve_stream(&self, page_url: &str) -> Result<Option<StreamResult>, FetchError> {
        info!("Fetching page: {}", page_url);
        let page = self.source.fetch(page_url)?;

        let result = self.extract(&page);
        if result.is_none() {
            error!("No stream URL found in page {}", page_url);
        }

        Ok(result)
    }

    /// Runs the cascade over an already fetched page
    pub fn extract(&self, page: &SourcePage) -> Option<StreamResult> {
        let host = host_of(&page.url).unwrap_or_default();

        if self.config.is_documentary_live_host(&host) {
            let url = find_streams_hls(&page.html)?;
            info!("Found stream URL (documentary pattern): {}", url);
            return Some(StreamResult::new(url));
        }

        for (name, matcher) in DIRECT_MATCHERS {
            if let Some(url) = matcher(&page.html) {
                info!("Found stream URL ({}): {}", name, url);
                return Some(StreamResult::new(url));
            }
        }

        if let Some(id) = first_capture(&RUMBLE_EMBED, &page.html) {
            info!("Found Rumble embed with id {}", id);
        }

        self.follow_iframe(page).map(StreamResult::new)
    }

    /// Follows the first iframe one level deep and looks for a bare manifest URL
    fn follow_iframe(&self, page: &SourcePage) -> Option<String> {
        let src = find_iframe_src(&page.html)?;
        let Some(iframe_url) = resolve_embed(&page.url, &src) else {
            warn!("Ignoring iframe with unusable src: {}", src);
            return None;
        };

        if iframe_url
            .host_str()
            .is_some_and(|host| self.config.is_blocked_embed_host(host))
        {
            warn!("Found {} iframe but cannot extract stream directly", iframe_url);
            return None;
        }

        info!("Found iframe, fetching: {}", iframe_url);
        let iframe = match self.source.fetch(iframe_url.as_str()) {
            Ok(iframe) => iframe,
            Err(e) => {
                warn!("Error fetching iframe: {}", e);
                return None;
            }
        };

        let url = find_bare_m3u8(&iframe.html)?;
        info!("Found m3u8 in iframe: {}", url);
        Some(url)
    }
}
