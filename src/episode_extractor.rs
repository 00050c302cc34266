//! Episode extraction and season inference
//!
//! Series pages only hint at seasons through loose "<n> Season" headings; no
//! episode link carries its own season. Episodes are therefore harvested in
//! document order and split into contiguous blocks, one per discovered
//! season, newest season first. This is only as reliable as the page layout.

use crate::config::{ConfigError, SiteConfig};
use crate::urls::absolutize;
use log::{debug, info};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::LazyLock;

static SEASON_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s+Season").unwrap());
static EPISODE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Episode\s+(\d+)").unwrap());

/// A single episode link of a series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeEntry {
    /// Trimmed link text
    pub title: String,
    /// Absolute episode page URL
    pub url: String,
    /// Number parsed from an "Episode <n>" token in the title
    pub episode_number: Option<u32>,
    /// Inferred season, 1 unless the page mentions seasons
    pub season: u32,
}

impl EpisodeEntry {
    /// Display label, `S<season>E<episode> - <title>` when the number is known
    pub fn label(&self) -> String {
        match self.episode_number {
            Some(number) => format!("S{}E{} - {}", self.season, number, self.title),
            None => self.title.clone(),
        }
    }
}

/// Episodes sharing a season, derived for display only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonGroup {
    pub season: u32,
    pub episodes: Vec<EpisodeEntry>,
}

/// Extracts episodes from series pages
pub struct EpisodeExtractor<'a> {
    config: &'a SiteConfig,
    link_pattern: Regex,
}

impl<'a> EpisodeExtractor<'a> {
    /// Compiles the episode link pattern for the configured path marker
    pub fn new(config: &'a SiteConfig) -> Result<Self, ConfigError> {
        let marker = regex::escape(&config.episode_marker);
        // link text, optionally closing list item, then the next episode href
        let link_pattern = Regex::new(&format!(
            r#"(?is)>([^<]*?)</a>\s*(?:</li>)?.*?href=["']([^"']*/{marker}/[^"']*)"#
        ))?;

        Ok(Self {
            config,
            link_pattern,
        })
    }

    /// Extracts all episodes of a series page with their inferred seasons
    ///
    /// Never fails; a page without episode links yields an empty list.
    ///
    /// # Arguments
    ///
    /// * `html` - Text of a series page
    ///
    /// # Returns
    ///
    /// Episodes in page order, each carrying its inferred season
    pub fn extract_episodes(&self, html: &str) -> Vec<EpisodeEntry> {
        let seasons = discover_seasons(html);
        info!("Detected seasons: {:?}", seasons);

        let mut episodes = self.harvest(html);
        assign_seasons(&mut episodes, &seasons);

        let found: BTreeSet<u32> = episodes.iter().map(|e| e.season).collect();
        info!(
            "Extracted {} episodes with seasons {:?}",
            episodes.len(),
            found
        );

        episodes
    }

    /// Collects unique episode links in document order, all in season 1
    fn harvest(&self, html: &str) -> Vec<EpisodeEntry> {
        let mut seen = HashSet::new();
        let mut episodes = Vec::new();

        for caps in self.link_pattern.captures_iter(html) {
            let (Some(title), Some(href)) = (caps.get(1), caps.get(2)) else {
                continue;
            };

            let title = title.as_str().trim();
            if title.is_empty() {
                continue;
            }

            let url = absolutize(&self.config.origin, href.as_str());
            if !seen.insert(url.clone()) {
                continue;
            }

            debug!("Found episode: {} -> {}", title, url);
            episodes.push(EpisodeEntry {
                title: title.to_string(),
                url,
                episode_number: parse_episode_number(title),
                season: 1,
            });
        }

        episodes
    }
}

/// Distinct positive season numbers mentioned on the page, highest first
pub fn discover_seasons(html: &str) -> Vec<u32> {
    let seasons: BTreeSet<u32> = SEASON_MARKER
        .captures_iter(html)
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .filter(|&season| season > 0)
        .collect();

    seasons.into_iter().rev().collect()
}

/// Number from an "Episode <n>" token, if present and positive
pub fn parse_episode_number(title: &str) -> Option<u32> {
    EPISODE_NUMBER
        .captures(title)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .filter(|&number| number > 0)
}

/// Assigns seasons by position
///
/// `seasons` must be sorted descending. With several seasons the list is cut
/// into blocks of `len / seasons.len()` episodes, the first block getting the
/// highest season. Leftover episodes, or all of them when the block size is
/// zero, go to the lowest season. The block size counts the episodes as
/// passed in, i.e. after duplicate links were dropped.
pub fn assign_seasons(episodes: &mut [EpisodeEntry], seasons: &[u32]) {
    match seasons {
        [] => episodes.iter_mut().for_each(|e| e.season = 1),
        [only] => episodes.iter_mut().for_each(|e| e.season = *only),
        _ => {
            let block = episodes.len() / seasons.len();
            let last = seasons.len() - 1;
            info!(
                "Dividing {} episodes into {} seasons (~{} per season)",
                episodes.len(),
                seasons.len(),
                block
            );

            for (index, episode) in episodes.iter_mut().enumerate() {
                let slot = index.checked_div(block).map_or(last, |slot| slot.min(last));
                episode.season = seasons[slot];
            }
        }
    }
}

/// Groups episodes by season, highest season first, page order within a season
pub fn group_by_season(episodes: &[EpisodeEntry]) -> Vec<SeasonGroup> {
    let mut by_season: BTreeMap<u32, Vec<EpisodeEntry>> = BTreeMap::new();
    for episode in episodes {
        by_season
            .entry(episode.season)
            .or_default()
            .push(episode.clone());
    }

    by_season
        .into_iter()
        .rev()
        .map(|(season, episodes)| SeasonGroup { season, episodes })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(title: &str, href: &str) -> String {
        format!(
            "<li class=\"episodes__item\"><span class=\"episodes__title\">{title}</a></li>\n\
             <div class=\"episodes__play\" href=\"{href}\"></div>\n"
        )
    }

    fn page(headings: &[&str], cards: &[(&str, &str)]) -> String {
        let mut html = String::from("<html><body><h1 class=\"serial\">Frontline</h1>\n");
        for heading in headings {
            html.push_str(&format!("<h2 class=\"season\">{heading}</h2>\n"));
        }
        for (title, href) in cards {
            html.push_str(&card(title, href));
        }
        html.push_str("</body></html>");
        html
    }

    fn extract(html: &str) -> Vec<EpisodeEntry> {
        let config = SiteConfig::default();
        EpisodeExtractor::new(&config).unwrap().extract_episodes(html)
    }

    fn seasons_of(episodes: &[EpisodeEntry]) -> Vec<u32> {
        episodes.iter().map(|e| e.season).collect()
    }

    #[test]
    fn test_harvests_titles_urls_and_numbers() {
        let html = page(
            &[],
            &[
                ("Episode 1 Arrival", "/episodes/101-arrival"),
                ("episode 12: The End", "https://en.rtdoc.tv/episodes/112-end"),
                ("Behind the scenes", "/episodes/150-bts"),
            ],
        );

        let episodes = extract(&html);
        assert_eq!(
            episodes,
            vec![
                EpisodeEntry {
                    title: "Episode 1 Arrival".to_string(),
                    url: "https://en.rtdoc.tv/episodes/101-arrival".to_string(),
                    episode_number: Some(1),
                    season: 1,
                },
                EpisodeEntry {
                    title: "episode 12: The End".to_string(),
                    url: "https://en.rtdoc.tv/episodes/112-end".to_string(),
                    episode_number: Some(12),
                    season: 1,
                },
                EpisodeEntry {
                    title: "Behind the scenes".to_string(),
                    url: "https://en.rtdoc.tv/episodes/150-bts".to_string(),
                    episode_number: None,
                    season: 1,
                },
            ]
        );
    }

    #[test]
    fn test_duplicate_links_are_dropped() {
        let html = page(
            &[],
            &[
                ("Episode 1 Arrival", "/episodes/101-arrival"),
                ("Episode 1 (again)", "/episodes/101-arrival"),
                ("Episode 2 Departure", "/episodes/102-departure"),
            ],
        );

        let episodes = extract(&html);
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].title, "Episode 1 Arrival");
        assert_eq!(episodes[1].episode_number, Some(2));
    }

    #[test]
    fn test_empty_titles_are_skipped() {
        let html = "<span class=\"t\">   </a><div href=\"/episodes/5-x\"></div>";
        assert!(extract(html).is_empty());
    }

    #[test]
    fn test_two_seasons_split_with_remainder_to_last() {
        let cards = [
            ("Episode 1 New", "/episodes/201"),
            ("Episode 2 New", "/episodes/202"),
            ("Episode 1 Old", "/episodes/101"),
            ("Episode 2 Old", "/episodes/102"),
            ("Episode 3 Old", "/episodes/103"),
        ];
        let html = page(&["2 Season", "1 Season"], &cards);

        assert_eq!(seasons_of(&extract(&html)), vec![2, 2, 1, 1, 1]);
    }

    #[test]
    fn test_split_counts_episodes_after_dedup() {
        let html = page(
            &["2 Season", "1 Season"],
            &[
                ("Episode 1", "/episodes/1"),
                ("Episode 1 (repeat)", "/episodes/1"),
                ("Episode 2", "/episodes/2"),
                ("Episode 3", "/episodes/3"),
            ],
        );

        assert_eq!(seasons_of(&extract(&html)), vec![2, 1, 1]);
    }

    #[test]
    fn test_three_seasons_block_split() {
        let cards: Vec<(String, String)> = (1..=7)
            .map(|i| (format!("Episode {i}"), format!("/episodes/{i}")))
            .collect();
        let cards: Vec<(&str, &str)> = cards
            .iter()
            .map(|(t, h)| (t.as_str(), h.as_str()))
            .collect();
        // markers appear in arbitrary order and repeat
        let html = page(&["1 Season", "3 season", "2 Season", "3 Season"], &cards);

        assert_eq!(seasons_of(&extract(&html)), vec![3, 3, 2, 2, 1, 1, 1]);
    }

    #[test]
    fn test_fewer_episodes_than_seasons_go_to_last_season() {
        let html = page(
            &["3 Season", "2 Season", "1 Season"],
            &[("Episode 1", "/episodes/1"), ("Episode 2", "/episodes/2")],
        );

        assert_eq!(seasons_of(&extract(&html)), vec![1, 1]);
    }

    #[test]
    fn test_single_marker_applies_to_all() {
        let html = page(
            &["4 Season"],
            &[("Episode 1", "/episodes/1"), ("Episode 2", "/episodes/2")],
        );

        assert_eq!(seasons_of(&extract(&html)), vec![4, 4]);
    }

    #[test]
    fn test_no_markers_means_season_one() {
        let cards: Vec<(String, String)> = (1..=9)
            .map(|i| (format!("Part {i}"), format!("/episodes/{i}")))
            .collect();
        let cards: Vec<(&str, &str)> = cards
            .iter()
            .map(|(t, h)| (t.as_str(), h.as_str()))
            .collect();

        let episodes = extract(&page(&[], &cards));
        assert_eq!(episodes.len(), 9);
        assert!(episodes.iter().all(|e| e.season == 1));
    }

    #[test]
    fn test_discover_seasons() {
        assert_eq!(discover_seasons("2 Season ... 1 Season ... 2  season"), vec![2, 1]);
        assert_eq!(discover_seasons("0 Season"), Vec::<u32>::new());
        assert!(discover_seasons("Season 2").is_empty());
    }

    #[test]
    fn test_assign_seasons_directly() {
        let mut episodes: Vec<EpisodeEntry> = (0..4)
            .map(|i| EpisodeEntry {
                title: format!("t{i}"),
                url: format!("u{i}"),
                episode_number: None,
                season: 9,
            })
            .collect();

        assign_seasons(&mut episodes, &[2, 1]);
        assert_eq!(seasons_of(&episodes), vec![2, 2, 1, 1]);

        assign_seasons(&mut episodes, &[]);
        assert_eq!(seasons_of(&episodes), vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_group_by_season_descending() {
        let html = page(
            &["2 Season", "1 Season"],
            &[
                ("Episode 1 New", "/episodes/201"),
                ("Episode 1 Old", "/episodes/101"),
                ("Episode 2 Old", "/episodes/102"),
            ],
        );

        let groups = group_by_season(&extract(&html));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].season, 2);
        assert_eq!(groups[0].episodes.len(), 1);
        assert_eq!(groups[1].season, 1);
        assert_eq!(
            groups[1].episodes.iter().map(|e| e.title.as_str()).collect::<Vec<_>>(),
            vec!["Episode 1 Old", "Episode 2 Old"]
        );
    }

    #[test]
    fn test_label() {
        let mut episode = EpisodeEntry {
            title: "Episode 3 The Wall".to_string(),
            url: "https://en.rtdoc.tv/episodes/3".to_string(),
            episode_number: Some(3),
            season: 2,
        };
        assert_eq!(episode.label(), "S2E3 - Episode 3 The Wall");

        episode.episode_number = None;
        assert_eq!(episode.label(), "Episode 3 The Wall");
    }
}
