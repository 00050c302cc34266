//! Site configuration
//!
//! Everything the extraction pipeline needs to know about the RT sites lives
//! in [`SiteConfig`]: the origin used to complete relative links, the hosts
//! that need special treatment and the fixed live channel table. The
//! defaults mirror the live sites; a `config.toml` in the platform config
//! directory may override individual fields.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Desktop browser identity sent with every request. Some RT pages answer
/// unknown clients with 403.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Errors that can occur while loading or validating the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to determine the platform config directory
    #[error("Failed to determine config directory location")]
    ConfigDirectoryNotFound,

    /// Failed to read the config file
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the config file
    #[error("Failed to parse config file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// The configured origin is not an absolute http(s) URL
    #[error("Invalid site origin '{origin}': {reason}")]
    InvalidOrigin { origin: String, reason: String },

    /// A pattern built from the configuration failed to compile
    #[error("Invalid extraction pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// A live channel offered by the channel listing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Channel {
    /// Page hosting the channel's player
    pub url: String,
    /// Short channel name, shown as "RT News - <name>"
    pub name: String,
}

impl Channel {
    fn new(url: &str, name: &str) -> Self {
        Self {
            url: url.to_string(),
            name: name.to_string(),
        }
    }
}

/// Immutable configuration shared by every component
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// User agent header sent with every request
    pub user_agent: String,
    /// Origin used to complete relative series and episode links
    pub origin: String,
    /// Directory page listing all series
    pub serials_url: String,
    /// Path segment identifying series links
    pub series_marker: String,
    /// Path segment identifying episode links
    pub episode_marker: String,
    /// Hosts whose player config only exposes the `streams_hls` block
    pub documentary_live_hosts: Vec<String>,
    /// Embed hosts whose iframes are never followed
    pub blocked_embed_hosts: Vec<String>,
    /// Lowercased navigation labels that are never series titles
    pub title_stoplist: Vec<String>,
    /// Titles must be longer than this many characters
    pub min_title_len: usize,
    /// Live channels, in display order
    pub channels: Vec<Channel>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            origin: "https://en.rtdoc.tv".to_string(),
            serials_url: "https://en.rtdoc.tv/serials".to_string(),
            series_marker: "serials".to_string(),
            episode_marker: "episodes".to_string(),
            documentary_live_hosts: vec!["rtd.rt.com".to_string()],
            blocked_embed_hosts: vec!["rumble.com".to_string()],
            title_stoplist: ["films", "tv series", "on air", "live", "collections", "profile"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_title_len: 3,
            channels: vec![
                Channel::new("https://www.rt.com/on-air/", "Global"),
                Channel::new("https://www.rt.com/on-air/rt-america-air", "US"),
                Channel::new("https://rtd.rt.com/on-air/", "Documentaries"),
                Channel::new("https://actualidad.rt.com/en_vivo2", "ESP"),
                Channel::new("https://arabic.rt.com/live/", "ARAB"),
            ],
        }
    }
}

impl SiteConfig {
    /// Loads the configuration
    ///
    /// An explicit path must exist. Without one, `config.toml` in the
    /// platform config directory is used if present, otherwise the defaults.
    ///
    /// # Arguments
    ///
    /// * `explicit` - Config file given on the command line, if any
    ///
    /// # Returns
    ///
    /// The validated configuration, or a ConfigError if the file cannot be
    /// read or parsed or the origin is unusable
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let config = SiteConfig::load(None)?;
    /// println!("Catalog lives at {}", config.serials_url);
    /// ```
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = default_config_path()?;
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML config file; omitted fields keep their defaults
    ///
    /// # Arguments
    ///
    /// * `path` - Location of the TOML file
    ///
    /// # Returns
    ///
    /// The validated configuration or a ConfigError
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Checks that the origin is an absolute http(s) URL without a trailing slash
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidOrigin {
            origin: self.origin.clone(),
            reason: reason.to_string(),
        };

        let parsed = url::Url::parse(&self.origin).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if parsed.host_str().is_none() {
            return Err(invalid("missing host"));
        }
        if self.origin.ends_with('/') {
            return Err(invalid("must not end with '/'"));
        }

        Ok(())
    }

    /// Whether the page at this host only carries the `streams_hls` player block
    pub fn is_documentary_live_host(&self, host: &str) -> bool {
        host_matches(&self.documentary_live_hosts, host)
    }

    /// Whether iframes pointing at this host must not be followed
    pub fn is_blocked_embed_host(&self, host: &str) -> bool {
        host_matches(&self.blocked_embed_hosts, host)
    }
}

/// Exact match or subdomain match, case-insensitive
fn host_matches(hosts: &[String], host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    hosts.iter().any(|candidate| {
        let candidate = candidate.to_ascii_lowercase();
        host == candidate || host.ends_with(&format!(".{candidate}"))
    })
}

/// Location of the optional config file
///
/// - Linux: ~/.config/rtcatalog/config.toml
/// - macOS: ~/Library/Application Support/de.westhoffswelt.rtcatalog/config.toml
/// - Windows: %APPDATA%\westhoffswelt\rtcatalog\config\config.toml
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let proj_dirs = directories::ProjectDirs::from("de", "westhoffswelt", "rtcatalog")
        .ok_or(ConfigError::ConfigDirectoryNotFound)?;

    Ok(proj_dirs.config_dir().join("config.toml"))
}
