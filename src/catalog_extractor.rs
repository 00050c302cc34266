//! Series catalog extraction
//!
//! The serials directory is hand-built markup, so no single anchor pattern
//! finds every series. Several tolerant patterns run over the same text and
//! their union is filtered: navigation chrome is dropped by a stoplist and a
//! minimum title length, duplicates by their absolute URL.

use crate::config::{ConfigError, SiteConfig};
use crate::urls::absolutize;
use log::{debug, info};
use regex::Regex;
use std::collections::HashSet;

/// A series found in the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesEntry {
    /// Trimmed link text
    pub title: String,
    /// Absolute series page URL
    pub url: String,
}

/// A raw pattern hit, before filtering
struct Candidate<'h> {
    position: usize,
    pattern: usize,
    url: &'h str,
    title: &'h str,
}

/// Extracts the series catalog from the serials directory page
pub struct CatalogExtractor<'a> {
    config: &'a SiteConfig,
    patterns: Vec<Regex>,
}

impl<'a> CatalogExtractor<'a> {
    /// Compiles the anchor patterns for the configured origin
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] if a pattern built from the
    /// configuration does not compile.
    pub fn new(config: &'a SiteConfig) -> Result<Self, ConfigError> {
        let origin = regex::escape(&config.origin);
        let marker = regex::escape(&config.series_marker);

        let patterns = vec![
            // <a href="https://origin/serials/...">Title</a>
            Regex::new(&format!(
                r#"(?i)<a\s+href="({origin}/{marker}/[^"]+)"\s*>([^<]+)</a>"#
            ))?,
            // any href mentioning the marker, attributes in any order, may be path-only
            Regex::new(&format!(
                r#"(?i)href=["']([^"']*{marker}[^"']+)["'][^>]*>([^<]+)<"#
            ))?,
            // bare absolute URL followed by the anchor text
            Regex::new(&format!(
                r#"(?i)({origin}/{marker}/[^\s"'<>]+)[^>]*>([^<]+)</a>"#
            ))?,
        ];

        Ok(Self { config, patterns })
    }

    /// Extracts all series from the directory page
    ///
    /// Never fails; unrecognized markup yields an empty catalog. Entries are
    /// returned in document order.
    pub fn extract_catalog(&self, html: &str) -> Vec<SeriesEntry> {
        let mut candidates = Vec::new();

        for (index, pattern) in self.patterns.iter().enumerate() {
            let before = candidates.len();
            for caps in pattern.captures_iter(html) {
                let (Some(url), Some(title)) = (caps.get(1), caps.get(2)) else {
                    continue;
                };
                candidates.push(Candidate {
                    position: url.start(),
                    pattern: index,
                    url: url.as_str(),
                    title: title.as_str(),
                });
            }
            info!(
                "Catalog pattern {} found {} matches",
                index + 1,
                candidates.len() - before
            );
        }

        candidates.sort_by_key(|c| (c.position, c.pattern));

        let mut seen = HashSet::new();
        let mut series = Vec::new();

        for candidate in candidates {
            let title = candidate.title.trim();
            if !self.is_series_title(title) {
                continue;
            }

            let url = absolutize(&self.config.origin, candidate.url);
            if !seen.insert(url.clone()) {
                continue;
            }

            debug!("Found series: {} -> {}", title, url);
            series.push(SeriesEntry {
                title: title.to_string(),
                url,
            });
        }

        info!("Unique series: {}", series.len());
        series
    }

    /// Rejects short labels and site navigation
    fn is_series_title(&self, title: &str) -> bool {
        if title.chars().count() <= self.config.min_title_len {
            return false;
        }

        let lowered = title.to_lowercase();
        !self.config.title_stoplist.contains(&lowered)
    }
}
