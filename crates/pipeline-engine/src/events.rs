//! Event types for streaming run progress
//!
//! Events are sent from the engine to the visual layer (or any consumer)
//! to report node status changes and the download side channel.

use serde::{Deserialize, Serialize};

use crate::bundle::OutputBundle;
use crate::types::{MediaKind, NodeId};

/// Trait for sending pipeline events
///
/// This abstracts over the transport mechanism (channel, websocket, log)
/// so the engine can be used in different contexts.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be delivered (e.g., channel closed)
    fn send(&self, event: PipelineEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone, thiserror::Error)]
#[error("Event error: {message}")]
pub struct EventError {
    pub message: String,
}

/// Events emitted during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PipelineEvent {
    /// A run started
    #[serde(rename_all = "camelCase")]
    RunStarted { run_id: String, pipeline: String },

    /// A node was marked running and dispatched
    #[serde(rename_all = "camelCase")]
    NodeStarted { run_id: String, node_id: NodeId },

    /// A node finished successfully
    #[serde(rename_all = "camelCase")]
    NodeCompleted {
        run_id: String,
        node_id: NodeId,
        output: OutputBundle,
    },

    /// A node failed
    #[serde(rename_all = "camelCase")]
    NodeFailed {
        run_id: String,
        node_id: NodeId,
        error: String,
    },

    /// A node was not executed because no upstream producer succeeded
    #[serde(rename_all = "camelCase")]
    NodeSkipped { run_id: String, node_id: NodeId },

    /// An export node asks the host to save a file
    #[serde(rename_all = "camelCase")]
    DownloadRequested {
        run_id: String,
        node_id: NodeId,
        url: String,
        kind: MediaKind,
    },

    /// Every node has settled
    #[serde(rename_all = "camelCase")]
    RunCompleted {
        run_id: String,
        succeeded: usize,
        failed: usize,
        skipped: usize,
    },
}

/// A no-op event sink that discards all events
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: PipelineEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: parking_lot::Mutex<Vec<PipelineEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().clone()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: PipelineEvent) -> Result<(), EventError> {
        self.events.lock().push(event);
        Ok(())
    }
}

/// Event sink that logs every event through the `log` facade
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn send(&self, event: PipelineEvent) -> Result<(), EventError> {
        match &event {
            PipelineEvent::NodeFailed { node_id, error, .. } => {
                log::warn!("Node '{}' failed: {}", node_id, error)
            }
            PipelineEvent::DownloadRequested { node_id, url, .. } => {
                log::info!("Node '{}' ready to download: {}", node_id, url)
            }
            other => log::debug!("{:?}", other),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_sink_collects() {
        let sink = VecEventSink::new();
        sink.send(PipelineEvent::NodeSkipped {
            run_id: "r1".to_string(),
            node_id: "n1".to_string(),
        })
        .unwrap();
        assert_eq!(sink.events().len(), 1);
        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_event_serialization() {
        let event = PipelineEvent::DownloadRequested {
            run_id: "r1".to_string(),
            node_id: "export".to_string(),
            url: "/out/final.mp4".to_string(),
            kind: MediaKind::Video,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "downloadRequested");
        assert_eq!(json["nodeId"], "export");
        assert_eq!(json["kind"], "video");
    }
}
