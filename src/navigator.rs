//! Catalog navigation
//!
//! Every host invocation carries an action and its parameters in a query
//! string. The navigator runs exactly one action per call, fetching at most
//! the one page it needs (plus one iframe for playback), and reports the
//! outcome to the [`Host`]. Nothing is kept between calls.

use crate::catalog_extractor::CatalogExtractor;
use crate::config::{ConfigError, SiteConfig};
use crate::episode_extractor::{EpisodeEntry, EpisodeExtractor, group_by_season};
use crate::host::{DirectoryItem, Host, ItemInfo, PlayableItem, Resolution};
use crate::page_fetcher::PageSource;
use crate::stream_extractor::StreamExtractor;
use crate::urls::plugin_url;
use log::{error, info, warn};
use std::collections::HashMap;
use thiserror::Error;

/// Errors in the host's request parameters
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    /// A parameter the action needs is absent
    #[error("Action '{action}' requires the '{parameter}' parameter")]
    MissingParameter {
        action: &'static str,
        parameter: &'static str,
    },
}

/// Which add-on flavour is being served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Documentary series: the default listing is the series catalog
    Series,
    /// News channels: the default listing is the fixed channel table
    Live,
}

/// A single host request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Default listing for the variant
    List,
    /// Resolve and play the stream embedded in a page
    Play { url: String },
    /// List the episodes (or season folders) of a series
    Episodes { url: String },
    /// List the episodes of one inferred season
    SeasonEpisodes { url: String, season: u32 },
}

impl Action {
    /// Parses the host's URL-encoded query string
    ///
    /// A leading `?` is ignored and the first value of a repeated key wins.
    /// Missing or unknown actions fall back to [`Action::List`]. A missing,
    /// non-numeric or zero season means season 1.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::MissingParameter`] when `play`, `episodes` or
    /// `season_episodes` arrive without a non-empty `url`.
    pub fn from_query(query: &str) -> Result<Self, ActionError> {
        let mut params: HashMap<String, String> = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            params
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }

        let required = |action: &'static str, parameter: &'static str| {
            params
                .get(parameter)
                .filter(|value| !value.is_empty())
                .cloned()
                .ok_or(ActionError::MissingParameter { action, parameter })
        };

        match params.get("action").map(String::as_str) {
            Some("play") => Ok(Self::Play {
                url: required("play", "url")?,
            }),
            Some("episodes") => Ok(Self::Episodes {
                url: required("episodes", "url")?,
            }),
            Some("season_episodes") => {
                let url = required("season_episodes", "url")?;
                let season = match params.get("season").map(String::as_str) {
                    None | Some("") => 1,
                    Some(raw) => raw
                        .parse::<u32>()
                        .ok()
                        .filter(|&season| season > 0)
                        .unwrap_or_else(|| {
                            warn!("Invalid season '{}', using season 1", raw);
                            1
                        }),
                };
                Ok(Self::SeasonEpisodes { url, season })
            }
            _ => Ok(Self::List),
        }
    }
}

/// Drives the extractors for host requests
pub struct Navigator<'a, S>
where
    S: PageSource,
{
    config: &'a SiteConfig,
    source: &'a S,
    base_url: String,
    variant: Variant,
    catalog: CatalogExtractor<'a>,
    episodes: EpisodeExtractor<'a>,
    streams: StreamExtractor<'a, S>,
}

impl<'a, S> Navigator<'a, S>
where
    S: PageSource,
{
    /// Creates a navigator answering with callback URLs under `base_url`
    ///
    /// # Arguments
    ///
    /// * `config` - Site settings shared by all extractors
    /// * `source` - Where pages are fetched from
    /// * `base_url` - Plugin URL prefixed to every callback target
    /// * `variant` - Which add-on flavour answers the default listing
    ///
    /// # Returns
    ///
    /// A Result containing the Navigator or a ConfigError if an extraction
    /// pattern built from `config` does not compile
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let fetcher = HttpFetcher::new(&config.user_agent)?;
    /// let navigator = Navigator::new(&config, &fetcher, "plugin://plugin.video.nextgenrt/", Variant::Live)?;
    /// navigator.handle(&Action::List, &mut host);
    /// ```
    pub fn new(
        config: &'a SiteConfig,
        source: &'a S,
        base_url: impl Into<String>,
        variant: Variant,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            config,
            source,
            base_url: base_url.into(),
            variant,
            catalog: CatalogExtractor::new(config)?,
            episodes: EpisodeExtractor::new(config)?,
            streams: StreamExtractor::new(config, source),
        })
    }

    /// Runs one action against the host
    ///
    /// Listings always end their directory, playback always reports a
    /// resolution. Fetch failures are logged, never returned.
    ///
    /// # Arguments
    ///
    /// * `action` - The parsed request
    /// * `host` - Receiver for the resulting items or resolution
    pub fn handle<H: Host>(&self, action: &Action, host: &mut H) {
        info!("Handling {:?}", action);

        match action {
            Action::List => match self.variant {
                Variant::Series => self.list_series(host),
                Variant::Live => self.list_channels(host),
            },
            Action::Play { url } => self.play(url, host),
            Action::Episodes { url } => self.list_episodes(url, host),
            Action::SeasonEpisodes { url, season } => {
                self.list_season_episodes(url, *season, host)
            }
        }
    }

    fn target(&self, params: &[(&str, &str)]) -> String {
        plugin_url(&self.base_url, params)
    }

    fn list_channels<H: Host>(&self, host: &mut H) {
        for channel in &self.config.channels {
            let label = format!("RT News - {}", channel.name);
            let info = ItemInfo {
                title: label.clone(),
                genre: Some("News".to_string()),
                ..ItemInfo::default()
            };
            let target = self.target(&[("action", "play"), ("url", channel.url.as_str())]);
            host.add_directory_item(DirectoryItem::playable(label, target, info));
        }

        host.end_of_directory();
    }

    fn list_series<H: Host>(&self, host: &mut H) {
        info!("Fetching series list from {}", self.config.serials_url);

        let page = match self.source.fetch(&self.config.serials_url) {
            Ok(page) => page,
            Err(e) => {
                error!("Error listing series: {}", e);
                host.end_of_directory();
                return;
            }
        };

        let series = self.catalog.extract_catalog(&page.html);
        if series.is_empty() {
            warn!("No series found");
        }

        for entry in series {
            let target = self.target(&[("action", "episodes"), ("url", entry.url.as_str())]);
            host.add_directory_item(DirectoryItem::folder(entry.title, target));
        }

        host.end_of_directory();
    }

    /// Fetches a series page and extracts its episodes; `None` if the fetch failed
    fn fetch_episodes(&self, series_url: &str) -> Option<Vec<EpisodeEntry>> {
        info!("Fetching episodes from {}", series_url);

        match self.source.fetch(series_url) {
            Ok(page) => Some(self.episodes.extract_episodes(&page.html)),
            Err(e) => {
                error!("Error listing episodes: {}", e);
                None
            }
        }
    }

    fn list_episodes<H: Host>(&self, series_url: &str, host: &mut H) {
        let episodes = self.fetch_episodes(series_url).unwrap_or_default();
        if episodes.is_empty() {
            warn!("No episodes found for series {}", series_url);
            host.end_of_directory();
            return;
        }

        let groups = group_by_season(&episodes);
        if groups.len() > 1 {
            for group in groups {
                let label = format!(
                    "Season {} ({} episodes)",
                    group.season,
                    group.episodes.len()
                );
                let season = group.season.to_string();
                let target = self.target(&[
                    ("action", "season_episodes"),
                    ("url", series_url),
                    ("season", season.as_str()),
                ]);
                host.add_directory_item(DirectoryItem::folder(label, target));
            }
        } else {
            for episode in &episodes {
                self.add_episode(episode, host);
            }
        }

        host.end_of_directory();
    }

    fn list_season_episodes<H: Host>(&self, series_url: &str, season: u32, host: &mut H) {
        let episodes: Vec<EpisodeEntry> = self
            .fetch_episodes(series_url)
            .unwrap_or_default()
            .into_iter()
            .filter(|episode| episode.season == season)
            .collect();

        if episodes.is_empty() {
            warn!("No episodes found for season {}", season);
        }

        for episode in &episodes {
            self.add_episode(episode, host);
        }

        host.end_of_directory();
    }

    fn add_episode<H: Host>(&self, episode: &EpisodeEntry, host: &mut H) {
        let info = ItemInfo {
            title: episode.title.clone(),
            genre: Some("Documentary".to_string()),
            season: episode.episode_number.map(|_| episode.season),
            episode: episode.episode_number,
        };
        let target = self.target(&[("action", "play"), ("url", episode.url.as_str())]);
        host.add_directory_item(DirectoryItem::playable(episode.label(), target, info));
    }

    fn play<H: Host>(&self, page_url: &str, host: &mut H) {
        info!("Playing from: {}", page_url);

        let stream = match self.streams.resolve_stream(page_url) {
            Ok(stream) => stream,
            Err(e) => {
                error!("Error getting stream URL: {}", e);
                None
            }
        };

        let Some(stream) = stream else {
            error!("Failed to resolve stream URL");
            host.set_resolved(Resolution::Failed);
            return;
        };

        info!("Resolved to stream: {}", stream.manifest_url);
        let item = if stream.is_adaptive {
            info!("Setting up HLS stream with inputstream.adaptive");
            PlayableItem::adaptive_hls(stream.manifest_url)
        } else {
            PlayableItem::new(stream.manifest_url)
        };

        host.set_resolved(Resolution::Resolved(item));
    }
}
