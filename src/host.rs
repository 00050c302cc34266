//! Host collaborator interface
//!
//! The navigator never renders anything itself. It describes directory
//! entries and playback resolutions to a [`Host`], which is whatever media
//! center or process embeds this crate.

use log::error;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::io::Write;

/// Property selecting the adaptive stream engine
pub const PROP_INPUTSTREAM: &str = "inputstream";
/// Property naming the manifest type for the adaptive engine
pub const PROP_MANIFEST_TYPE: &str = "inputstream.adaptive.manifest_type";
/// Identifier of the adaptive stream engine
pub const ADAPTIVE_ENGINE: &str = "inputstream.adaptive";

/// Descriptive metadata attached to a listing entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemInfo {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryItem {
    /// Text shown to the user
    pub label: String,
    /// Plugin URL invoked when the entry is selected
    pub target: String,
    /// Whether selecting the entry opens another listing
    pub is_folder: bool,
    /// Whether selecting the entry starts playback
    pub is_playable: bool,
    pub info: ItemInfo,
}

impl DirectoryItem {
    /// A navigable entry leading to another listing
    pub fn folder(label: impl Into<String>, target: String) -> Self {
        let label = label.into();
        Self {
            info: ItemInfo {
                title: label.clone(),
                ..ItemInfo::default()
            },
            label,
            target,
            is_folder: true,
            is_playable: false,
        }
    }

    /// A playable leaf entry
    pub fn playable(label: impl Into<String>, target: String, info: ItemInfo) -> Self {
        Self {
            label: label.into(),
            target,
            is_folder: false,
            is_playable: true,
            info,
        }
    }
}

/// A resolved item handed to the host player
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayableItem {
    /// Manifest URL to play
    pub path: String,
    /// Stream engine hints
    pub properties: BTreeMap<String, String>,
    /// Whether the host may probe the URL for its content type
    pub content_lookup: bool,
}

impl PlayableItem {
    /// A plain item without engine hints
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            properties: BTreeMap::new(),
            content_lookup: true,
        }
    }

    /// An HLS item routed through the adaptive engine with content probing off
    pub fn adaptive_hls(path: impl Into<String>) -> Self {
        let mut item = Self::new(path);
        item.properties
            .insert(PROP_INPUTSTREAM.to_string(), ADAPTIVE_ENGINE.to_string());
        item.properties
            .insert(PROP_MANIFEST_TYPE.to_string(), "hls".to_string());
        item.content_lookup = false;
        item
    }
}

/// Outcome of a playback request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(PlayableItem),
    Failed,
}

/// The embedding media center
pub trait Host {
    /// Appends an entry to the current listing
    fn add_directory_item(&mut self, item: DirectoryItem);

    /// Signals that the current listing is complete
    fn end_of_directory(&mut self);

    /// Answers a playback request
    fn set_resolved(&mut self, resolution: Resolution);
}

/// Host writing one JSON object per call to a writer
///
/// Used by the binary so any host process can drive the navigator over
/// stdin/stdout.
pub struct JsonLinesHost<W>
where
    W: Write,
{
    writer: W,
}

impl<W> JsonLinesHost<W>
where
    W: Write,
{
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the host and returns the writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, message: serde_json::Value) {
        if let Err(e) = writeln!(self.writer, "{}", message).and_then(|_| self.writer.flush()) {
            error!("Failed to write host message: {}", e);
        }
    }
}

impl<W> Host for JsonLinesHost<W>
where
    W: Write,
{
    fn add_directory_item(&mut self, item: DirectoryItem) {
        self.emit(json!({ "type": "item", "item": item }));
    }

    fn end_of_directory(&mut self) {
        self.emit(json!({ "type": "end_of_directory" }));
    }

    fn set_resolved(&mut self, resolution: Resolution) {
        let message = match resolution {
            Resolution::Resolved(item) => {
                json!({ "type": "resolved", "succeeded": true, "item": item })
            }
            Resolution::Failed => json!({ "type": "resolved", "succeeded": false }),
        };
        self.emit(message);
    }
}
