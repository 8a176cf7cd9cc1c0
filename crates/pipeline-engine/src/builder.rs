//! Fluent builder for pipelines
//!
//! Builds pipelines with caller-chosen node ids, for tests, fixtures and
//! programmatic graph construction. No catalog checks happen here; run
//! `validate_pipeline` on the result when the input is untrusted.

use crate::graph::Pipeline;
use crate::types::{Connection, FieldValue, MediaRef, Node, PortRef, Position};

/// Fluent builder for constructing pipelines
///
/// # Example
///
/// ```ignore
/// let pipeline = PipelineBuilder::new("Serum launch")
///     .add_node("writer", "script_writer", (0.0, 0.0))
///     .with_field("product_name", FieldValue::text("Glow Serum"))
///     .add_node("video", "video_generator", (400.0, 0.0))
///     .connect("writer", "prompt", "video", "prompt")
///     .build();
/// ```
pub struct PipelineBuilder {
    name: String,
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    connection_counter: usize,
}

impl PipelineBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            connections: Vec::new(),
            connection_counter: 0,
        }
    }

    /// Add a node to the pipeline
    pub fn add_node(
        mut self,
        id: impl Into<String>,
        block_id: impl Into<String>,
        position: impl Into<Position>,
    ) -> Self {
        self.nodes.push(Node::new(id, block_id, position.into()));
        self
    }

    /// Set a field on the most recently added node
    ///
    /// Must be called after `add_node`.
    pub fn with_field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        if let Some(node) = self.nodes.last_mut() {
            node.config.set(key, value);
        }
        self
    }

    /// Attach media to the most recently added node
    pub fn with_media(self, key: impl Into<String>, media: MediaRef) -> Self {
        self.with_field(key, FieldValue::Media(media))
    }

    /// Connect an output port to an input port (auto-generates the id)
    pub fn connect(
        mut self,
        source: impl Into<String>,
        source_port: impl Into<String>,
        target: impl Into<String>,
        target_port: impl Into<String>,
    ) -> Self {
        self.connection_counter += 1;
        self.connections.push(Connection {
            id: format!("conn-{}", self.connection_counter),
            source: PortRef::new(source, source_port),
            target: PortRef::new(target, target_port),
        });
        self
    }

    /// Build the pipeline without validation
    pub fn build(self) -> Pipeline {
        Pipeline {
            name: self.name,
            nodes: self.nodes,
            connections: self.connections,
        }
    }
}
