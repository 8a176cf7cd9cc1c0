//! Error types for the pipeline engine
//!
//! Operation failures (a block that could not produce output) are never
//! errors at this level: they travel as failure envelopes and end up on the
//! failing node. `PipelineError` is reserved for conditions the caller has
//! to deal with: malformed graphs, persistence and transport problems.

use thiserror::Error;

use crate::types::NodeId;

/// Result type alias using PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur in the pipeline engine
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A node references a block that is not in the catalog
    #[error("Unknown block '{block_id}' on node '{node_id}'")]
    UnknownBlock { node_id: NodeId, block_id: String },

    /// A connection references a node that does not exist
    #[error("Connection '{connection_id}' references unknown node '{node_id}'")]
    DanglingConnection {
        connection_id: String,
        node_id: NodeId,
    },

    /// The pipeline contains a dependency cycle
    #[error("Cycle detected between nodes: {}", .0.join(", "))]
    CycleDetected(Vec<NodeId>),

    /// Any other structural problem reported by validation
    #[error("Invalid pipeline: {0}")]
    Validation(String),

    /// A run was requested while another run of the same session is in flight
    #[error("A run is already in progress")]
    RunInProgress,

    /// Graph edit rejected
    #[error(transparent)]
    Edit(#[from] crate::graph::GraphEditError),

    /// Saved pipeline not found
    #[error("Pipeline not found: {0}")]
    PipelineNotFound(String),

    /// Dispatch transport failed (remote dispatcher)
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Create a dispatch error with a message
    pub fn dispatch(msg: impl Into<String>) -> Self {
        Self::Dispatch(msg.into())
    }

    /// Whether this error indicates a malformed graph (a programmer error)
    pub fn is_malformed_graph(&self) -> bool {
        matches!(
            self,
            Self::UnknownBlock { .. }
                | Self::DanglingConnection { .. }
                | Self::CycleDetected(_)
                | Self::Validation(_)
        )
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        Self::Dispatch(err.to_string())
    }
}
