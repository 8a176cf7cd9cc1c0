//! Pipeline Engine - dependency-ordered execution of ad-production pipelines
//!
//! Users place blocks from a fixed catalog (scrapers, LLM writers, image
//! and video generators, export actions), wire block outputs to downstream
//! inputs and run the graph. This crate provides:
//!
//! - The block catalog and the pipeline graph model
//! - Port geometry for drawing wires
//! - A topological pre-pass plus worklist scheduler that dispatches every
//!   ready node exactly once, threading outputs along the wires
//! - The dispatcher contract, a handler registry and an HTTP dispatcher
//! - Snapshot persistence behind an injected adapter
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pipeline_engine::{BlockCatalog, ExecutionEngine, HandlerRegistry, PipelineBuilder};
//!
//! let engine = ExecutionEngine::new(Arc::new(BlockCatalog::builtin()), Arc::new(handlers));
//! let mut pipeline = PipelineBuilder::new("launch")
//!     .add_node("writer", "script_writer", (0.0, 0.0))
//!     .build();
//! let report = engine.run(&mut pipeline).await?;
//! ```

pub mod builder;
pub mod bundle;
pub mod catalog;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod events;
pub mod graph;
pub mod persistence;
pub mod ports;
pub mod registry;
pub mod remote;
pub mod session;
pub mod types;
pub mod validation;

// Re-export key types
pub use builder::PipelineBuilder;
pub use bundle::{InputBundle, OutputBundle, OutputKind};
pub use catalog::{
    models_for, BlockCatalog, BlockCategory, BlockDefinition, FieldDefinition, FieldKind,
    ModelOption, ModelScope, PortDefinition, PortDirection, DOWNLOAD_EXPORT,
};
pub use dispatch::{DispatchEnvelope, DispatchRequest, Dispatcher};
pub use engine::{EngineConfig, ExecutionEngine, RunReport};
pub use error::{PipelineError, Result};
pub use events::{
    EventError, EventSink, LogEventSink, NullEventSink, PipelineEvent, VecEventSink,
};
pub use graph::{GraphEditError, Pipeline};
pub use persistence::{
    FileStore, MemoryStore, PersistenceAdapter, PipelineSnapshot, PipelineSummary,
};
pub use registry::{BlockHandler, HandlerRegistry};
pub use remote::RemoteDispatcher;
pub use session::PipelineSession;
pub use types::{
    Connection, FieldValue, MediaKind, MediaRef, Node, NodeConfig, NodeId, NodeStatus, PortRef,
    Position,
};
pub use validation::{validate_pipeline, ValidationError};
