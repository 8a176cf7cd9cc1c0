//! Core types for pipeline graphs
//!
//! These types define the structure of a pipeline: nodes placed from the
//! block catalog, the connections between their ports, and the per-node
//! configuration and run state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for a connection
pub type ConnectionId = String;

/// Position of a node on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Run state of a node
///
/// Only the execution engine moves a node out of `Idle`. A node that is
/// still `Idle` after a run did not execute because every upstream
/// producer failed or was itself skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    Idle,
    Running,
    Done,
    Error,
}

/// Kind of a media reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

impl MediaKind {
    /// Guess the kind from a file URL's extension
    pub fn from_extension(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();
        if [".mp4", ".webm", ".mov"].iter().any(|ext| lower.contains(ext)) {
            Self::Video
        } else {
            Self::Image
        }
    }

    /// Guess the kind of an exported URL
    ///
    /// Export targets are usually generated files, so any URL mentioning
    /// `video` is treated as one.
    pub fn for_export(url: &str) -> Self {
        if url.contains(".mp4") || url.contains("video") {
            Self::Video
        } else {
            Self::Image
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

/// A reference to an image or video
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    /// URL or path of the media (None once an ephemeral URL was stripped)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub kind: MediaKind,
    /// Original file name shown in the editor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Small inline preview (data URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl MediaRef {
    pub fn new(url: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            url: Some(url.into()),
            kind,
            display_name: None,
            thumbnail: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    /// Whether nothing worth keeping is left in this reference
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.display_name.is_none() && self.thumbnail.is_none()
    }
}

/// The value of one configuration field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Free text (single or multi line)
    Text(String),
    /// One option out of an enumerated list (including model choices)
    Choice(String),
    /// An attached image or video
    Media(MediaRef),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn choice(value: impl Into<String>) -> Self {
        Self::Choice(value.into())
    }

    /// The primary string value of this field, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) | Self::Choice(v) => Some(v.as_str()),
            Self::Media(media) => media.url.as_deref(),
        }
    }
}

/// Configuration of a node: field key to value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeConfig {
    fields: BTreeMap<String, FieldValue>,
}

impl NodeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: FieldValue) {
        self.fields.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.remove(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Keep only the fields for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &mut FieldValue) -> bool) {
        self.fields.retain(|key, value| keep(key, value));
    }

    /// Flatten into the string map handed to dispatchers
    ///
    /// Media fields expand into `key` (url), `key_type`, `key_name` and
    /// `key_thumb`, each only when present.
    pub fn resolve(&self) -> BTreeMap<String, String> {
        let mut resolved = BTreeMap::new();
        for (key, value) in &self.fields {
            match value {
                FieldValue::Text(v) | FieldValue::Choice(v) => {
                    resolved.insert(key.clone(), v.clone());
                }
                FieldValue::Media(media) => {
                    if let Some(url) = &media.url {
                        resolved.insert(key.clone(), url.clone());
                    }
                    resolved.insert(format!("{}_type", key), media.kind.as_str().to_string());
                    if let Some(name) = &media.display_name {
                        resolved.insert(format!("{}_name", key), name.clone());
                    }
                    if let Some(thumb) = &media.thumbnail {
                        resolved.insert(format!("{}_thumb", key), thumb.clone());
                    }
                }
            }
        }
        resolved
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for NodeConfig {
    fn from_iter<T: IntoIterator<Item = (K, FieldValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// A placed block instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    /// Block catalog identity (immutable after creation)
    pub block_id: String,
    pub position: Position,
    #[serde(default)]
    pub config: NodeConfig,
    #[serde(default)]
    pub status: NodeStatus,
    /// Preview of the media produced by the last successful run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<MediaRef>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, block_id: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            block_id: block_id.into(),
            position,
            config: NodeConfig::new(),
            status: NodeStatus::Idle,
            output: None,
        }
    }
}

/// One end of a connection: a node and one of its port names
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRef {
    pub node_id: NodeId,
    pub port: String,
}

impl PortRef {
    pub fn new(node_id: impl Into<NodeId>, port: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            port: port.into(),
        }
    }
}

/// A directed wire from an output port to an input port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    /// Output port of the producing node
    pub source: PortRef,
    /// Input port of the consuming node
    pub target: PortRef,
}

impl Connection {
    /// Whether this connection touches the given node at either end
    pub fn touches(&self, node_id: &str) -> bool {
        self.source.node_id == node_id || self.target.node_id == node_id
    }
}
