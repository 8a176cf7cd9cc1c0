//! Output and input bundles
//!
//! An `OutputBundle` is what one node produced: a `type` discriminant plus
//! string values under semantic keys (`script`, `video_url`, ...). An
//! `InputBundle` is what a node receives: the whole output bundle of each
//! successful upstream producer, keyed by the producer's output port name.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::types::{MediaKind, MediaRef};

/// Keys probed, in order, when looking for upstream text
pub const TEXT_KEYS: [&str; 5] = ["script", "hooks", "caption", "text", "variations"];

/// Discriminant of an output bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Text,
    Image,
    Video,
    Download,
    Error,
}

/// Values produced by one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputBundle {
    #[serde(rename = "type")]
    pub kind: OutputKind,
    #[serde(flatten)]
    pub values: BTreeMap<String, String>,
}

impl OutputBundle {
    pub fn new(kind: OutputKind) -> Self {
        Self {
            kind,
            values: BTreeMap::new(),
        }
    }

    /// Text bundle with a single value
    pub fn text(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(OutputKind::Text).with(key, value)
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self::new(OutputKind::Image).with("image_url", url)
    }

    pub fn video(url: impl Into<String>) -> Self {
        Self::new(OutputKind::Video).with("video_url", url)
    }

    /// The result entry recorded for a failed node
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(OutputKind::Error).with("error", message)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Like `get`, but treats an empty value as absent
    fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn is_error(&self) -> bool {
        self.kind == OutputKind::Error
    }

    /// Error message of a failure entry
    pub fn error_message(&self) -> Option<&str> {
        if self.is_error() {
            self.get("error")
        } else {
            None
        }
    }

    /// The media preview a successful node shows
    ///
    /// Only a `video` bundle with `video_url`, an `image` bundle with
    /// `image_url` or a `download` bundle has one.
    pub fn preview(&self) -> Option<MediaRef> {
        match self.kind {
            OutputKind::Video => self
                .non_empty("video_url")
                .map(|url| MediaRef::new(url, MediaKind::Video)),
            OutputKind::Image => self
                .non_empty("image_url")
                .map(|url| MediaRef::new(url, MediaKind::Image)),
            OutputKind::Download => self.media_url().map(|(url, kind)| MediaRef::new(url, kind)),
            OutputKind::Text | OutputKind::Error => None,
        }
    }

    /// This bundle's media URL, video first
    pub fn media_url(&self) -> Option<(&str, MediaKind)> {
        self.non_empty("video_url")
            .map(|u| (u, MediaKind::Video))
            .or_else(|| self.non_empty("image_url").map(|u| (u, MediaKind::Image)))
    }

    /// This bundle's primary text, by key priority
    pub fn primary_text(&self) -> Option<&str> {
        TEXT_KEYS.iter().find_map(|key| self.non_empty(key))
    }
}

/// Upstream outputs handed to a node, keyed by source output port name
///
/// Insertion order is kept. Inserting under an existing key replaces the
/// bundle but keeps the key's original position, so with fan-in through
/// same-named ports the later connection wins.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InputBundle {
    entries: Vec<(String, OutputBundle)>,
}

impl InputBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, port: impl Into<String>, bundle: OutputBundle) {
        let port = port.into();
        match self.entries.iter_mut().find(|(k, _)| *k == port) {
            Some(entry) => entry.1 = bundle,
            None => self.entries.push((port, bundle)),
        }
    }

    pub fn get(&self, port: &str) -> Option<&OutputBundle> {
        self.entries.iter().find(|(k, _)| k == port).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OutputBundle)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First media URL across entries; within an entry video beats image
    pub fn first_media_url(&self) -> Option<(&str, MediaKind)> {
        self.entries.iter().find_map(|(_, b)| b.media_url())
    }

    /// First text across entries by key priority within each entry
    pub fn first_text(&self) -> Option<&str> {
        self.entries.iter().find_map(|(_, b)| b.primary_text())
    }
}

impl Serialize for InputBundle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (port, bundle) in &self.entries {
            map.serialize_entry(port, bundle)?;
        }
        map.end()
    }
}

impl FromIterator<(String, OutputBundle)> for InputBundle {
    fn from_iter<T: IntoIterator<Item = (String, OutputBundle)>>(iter: T) -> Self {
        let mut bundle = Self::new();
        for (port, output) in iter {
            bundle.insert(port, output);
        }
        bundle
    }
}
