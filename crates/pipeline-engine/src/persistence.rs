//! Pipeline persistence
//!
//! Saved pipelines are snapshots: the graph minus run state and minus
//! ephemeral media payloads, plus creation and update timestamps. Storage
//! sits behind the `PersistenceAdapter` trait so sessions never touch a
//! concrete backend.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::graph::Pipeline;
use crate::types::{Connection, FieldValue, Node};

/// Inline `data:` payloads longer than this are not persisted
pub const INLINE_DATA_LIMIT: usize = 5000;

/// A saved pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSnapshot {
    pub name: String,
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PipelineSnapshot {
    /// Snapshot a pipeline as of now, stripping ephemeral data
    pub fn capture(pipeline: &Pipeline) -> Self {
        let now = Utc::now();
        Self {
            name: pipeline.name.clone(),
            nodes: strip_ephemeral(&pipeline.nodes),
            connections: pipeline.connections.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn into_pipeline(self) -> Pipeline {
        Pipeline {
            name: self.name,
            nodes: self.nodes,
            connections: self.connections,
        }
    }

    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            name: self.name.clone(),
            node_count: self.nodes.len(),
            connection_count: self.connections.len(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Listing entry for a saved pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub name: String,
    pub node_count: usize,
    pub connection_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn is_ephemeral(value: &str) -> bool {
    value.starts_with("blob:")
}

fn is_oversized_inline(value: &str) -> bool {
    value.starts_with("data:") && value.len() > INLINE_DATA_LIMIT
}

/// Copy nodes without anything that must not be persisted
///
/// Drops `blob:` URLs, inline `data:` payloads over the size limit (small
/// thumbnails are kept whatever their size), run status and previews. A
/// media field left with no data at all is removed.
pub fn strip_ephemeral(nodes: &[Node]) -> Vec<Node> {
    nodes
        .iter()
        .map(|node| {
            let mut node = node.clone();
            node.status = Default::default();
            node.output = None;
            node.config.retain(|_, value| match value {
                FieldValue::Text(v) | FieldValue::Choice(v) => {
                    !(is_ephemeral(v) || is_oversized_inline(v))
                }
                FieldValue::Media(media) => {
                    if media
                        .url
                        .as_deref()
                        .is_some_and(|u| is_ephemeral(u) || is_oversized_inline(u))
                    {
                        media.url = None;
                    }
                    if media.thumbnail.as_deref().is_some_and(is_ephemeral) {
                        media.thumbnail = None;
                    }
                    !media.is_empty()
                }
            });
            node
        })
        .collect()
}

/// Storage backend for saved pipelines
pub trait PersistenceAdapter: Send + Sync {
    /// Load a saved pipeline by name
    fn load(&self, name: &str) -> Result<PipelineSnapshot>;

    /// Save a pipeline under its name
    ///
    /// Overwrites an existing save of the same name but keeps its
    /// creation time.
    fn save(&self, pipeline: &Pipeline) -> Result<PipelineSnapshot>;

    /// Summaries of every saved pipeline
    fn list(&self) -> Result<Vec<PipelineSummary>>;

    /// Remove a saved pipeline; returns whether it existed
    fn delete(&self, name: &str) -> Result<bool>;

    /// Remember the pipeline currently being edited
    fn save_active(&self, pipeline: &Pipeline) -> Result<()>;

    /// The pipeline that was being edited last, if any
    fn load_active(&self) -> Result<Option<Pipeline>>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Volatile store, mostly for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Saved pipelines in first-save order
    saved: RwLock<Vec<PipelineSnapshot>>,
    active: Mutex<Option<Pipeline>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceAdapter for MemoryStore {
    fn load(&self, name: &str) -> Result<PipelineSnapshot> {
        self.saved
            .read()
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| PipelineError::PipelineNotFound(name.to_string()))
    }

    fn save(&self, pipeline: &Pipeline) -> Result<PipelineSnapshot> {
        let mut snapshot = PipelineSnapshot::capture(pipeline);
        let mut saved = self.saved.write();
        match saved.iter_mut().find(|s| s.name == snapshot.name) {
            Some(existing) => {
                snapshot.created_at = existing.created_at;
                *existing = snapshot.clone();
            }
            None => saved.push(snapshot.clone()),
        }
        Ok(snapshot)
    }

    fn list(&self) -> Result<Vec<PipelineSummary>> {
        Ok(self.saved.read().iter().map(PipelineSnapshot::summary).collect())
    }

    fn delete(&self, name: &str) -> Result<bool> {
        let mut saved = self.saved.write();
        let before = saved.len();
        saved.retain(|s| s.name != name);
        Ok(saved.len() != before)
    }

    fn save_active(&self, pipeline: &Pipeline) -> Result<()> {
        let mut active = pipeline.clone();
        active.nodes = strip_ephemeral(&pipeline.nodes);
        *self.active.lock() = Some(active);
        Ok(())
    }

    fn load_active(&self) -> Result<Option<Pipeline>> {
        Ok(self.active.lock().clone())
    }
}

// ---------------------------------------------------------------------------
// File store
// ---------------------------------------------------------------------------

const ACTIVE_FILE: &str = "active.json";
const PIPELINES_DIR: &str = "pipelines";

/// One JSON file per saved pipeline under `<root>/pipelines/`, plus
/// `<root>/active.json` for the pipeline being edited
///
/// # Example
///
/// ```ignore
/// use pipeline_engine::{FileStore, PersistenceAdapter};
///
/// let store = FileStore::new(dirs::data_dir().unwrap().join("ad-pipelines"));
/// store.save(&pipeline)?;
/// for summary in store.list()? {
///     println!("{} ({} nodes)", summary.name, summary.node_count);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at the given directory
    ///
    /// The directory will be created if it doesn't exist when saving.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn pipelines_dir(&self) -> PathBuf {
        self.root.join(PIPELINES_DIR)
    }

    fn file_for(&self, name: &str) -> PathBuf {
        self.pipelines_dir()
            .join(format!("{}.json", encode_file_stem(name)))
    }

    fn read_snapshot(path: &Path) -> Result<PipelineSnapshot> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(value)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl PersistenceAdapter for FileStore {
    fn load(&self, name: &str) -> Result<PipelineSnapshot> {
        let path = self.file_for(name);
        if !path.exists() {
            return Err(PipelineError::PipelineNotFound(name.to_string()));
        }
        Self::read_snapshot(&path)
    }

    fn save(&self, pipeline: &Pipeline) -> Result<PipelineSnapshot> {
        let path = self.file_for(&pipeline.name);
        let mut snapshot = PipelineSnapshot::capture(pipeline);
        if path.exists() {
            match Self::read_snapshot(&path) {
                Ok(existing) => snapshot.created_at = existing.created_at,
                Err(e) => log::warn!("Overwriting unreadable save {:?}: {}", path, e),
            }
        }
        Self::write_json(&path, &snapshot)?;
        log::info!("Saved pipeline '{}' to {:?}", snapshot.name, path);
        Ok(snapshot)
    }

    fn list(&self) -> Result<Vec<PipelineSummary>> {
        let dir = self.pipelines_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let file_path = entry?.path();
            if file_path.extension().map_or(false, |e| e == "json") {
                match Self::read_snapshot(&file_path) {
                    Ok(snapshot) => summaries.push(snapshot.summary()),
                    Err(e) => log::warn!("Failed to parse pipeline from {:?}: {}", file_path, e),
                }
            }
        }
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        Ok(summaries)
    }

    fn delete(&self, name: &str) -> Result<bool> {
        let path = self.file_for(name);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)?;
        log::info!("Deleted pipeline '{}' from {:?}", name, path);
        Ok(true)
    }

    fn save_active(&self, pipeline: &Pipeline) -> Result<()> {
        let mut active = pipeline.clone();
        active.nodes = strip_ephemeral(&pipeline.nodes);
        Self::write_json(&self.root.join(ACTIVE_FILE), &active)
    }

    fn load_active(&self) -> Result<Option<Pipeline>> {
        let path = self.root.join(ACTIVE_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        match serde_json::from_str(&content) {
            Ok(pipeline) => Ok(Some(pipeline)),
            Err(e) => {
                log::warn!("Ignoring unreadable active pipeline {:?}: {}", path, e);
                Ok(None)
            }
        }
    }
}

/// File-system safe, collision-free stem for a pipeline name
///
/// ASCII letters, digits and `-` pass through; every other byte becomes
/// `_` followed by two hex digits.
fn encode_file_stem(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("_{:02x}", byte));
        }
    }
    stem
}
