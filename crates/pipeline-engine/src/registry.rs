//! Block handler registry
//!
//! Maps block ids to per-block handlers and implements `Dispatcher` on top
//! of them, so the engine never needs a central match over block ids.
//!
//! # Usage
//!
//! ```ignore
//! use pipeline_engine::{HandlerRegistry, OutputBundle};
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register_sync("media_upload", |request| {
//!     Ok(OutputBundle::text("message", "uploaded").into())
//! });
//! registry.merge(external_handlers);
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::dispatch::{DispatchEnvelope, DispatchRequest, Dispatcher};
use crate::error::Result;

/// Executes exactly one block type
#[async_trait]
pub trait BlockHandler: Send + Sync {
    async fn handle(&self, request: DispatchRequest) -> Result<DispatchEnvelope>;
}

type BoxedCallback = Box<
    dyn Fn(DispatchRequest) -> Pin<Box<dyn Future<Output = Result<DispatchEnvelope>> + Send>>
        + Send
        + Sync,
>;

/// Async closure wrapped as a handler
pub struct CallbackHandler {
    callback: BoxedCallback,
}

#[async_trait]
impl BlockHandler for CallbackHandler {
    async fn handle(&self, request: DispatchRequest) -> Result<DispatchEnvelope> {
        (self.callback)(request).await
    }
}

/// Synchronous closure wrapped as a handler
pub struct SyncCallbackHandler {
    callback: Box<dyn Fn(&DispatchRequest) -> Result<DispatchEnvelope> + Send + Sync>,
}

impl SyncCallbackHandler {
    pub fn new(
        callback: impl Fn(&DispatchRequest) -> Result<DispatchEnvelope> + Send + Sync + 'static,
    ) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

#[async_trait]
impl BlockHandler for SyncCallbackHandler {
    async fn handle(&self, request: DispatchRequest) -> Result<DispatchEnvelope> {
        (self.callback)(&request)
    }
}

/// Registry of block handlers, built once before runs
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn BlockHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one for the block
    pub fn register(&mut self, block_id: impl Into<String>, handler: Arc<dyn BlockHandler>) {
        self.handlers.insert(block_id.into(), handler);
    }

    /// Register an async closure as the handler for a block
    pub fn register_callback<F, Fut>(&mut self, block_id: impl Into<String>, callback: F)
    where
        F: Fn(DispatchRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<DispatchEnvelope>> + Send + 'static,
    {
        let handler = CallbackHandler {
            callback: Box::new(move |request| Box::pin(callback(request))),
        };
        self.register(block_id, Arc::new(handler));
    }

    /// Register a synchronous closure as the handler for a block
    pub fn register_sync(
        &mut self,
        block_id: impl Into<String>,
        callback: impl Fn(&DispatchRequest) -> Result<DispatchEnvelope> + Send + Sync + 'static,
    ) {
        self.register(block_id, Arc::new(SyncCallbackHandler::new(callback)));
    }

    pub fn get(&self, block_id: &str) -> Option<Arc<dyn BlockHandler>> {
        self.handlers.get(block_id).cloned()
    }

    pub fn has_handler(&self, block_id: &str) -> bool {
        self.handlers.contains_key(block_id)
    }

    /// Registered block ids, sorted
    pub fn block_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Merge another registry into this one
    ///
    /// Handlers from `other` override handlers in `self` for the same block.
    pub fn merge(&mut self, other: HandlerRegistry) {
        self.handlers.extend(other.handlers);
    }
}

#[async_trait]
impl Dispatcher for HandlerRegistry {
    async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchEnvelope> {
        match self.get(&request.block_id) {
            Some(handler) => handler.handle(request).await,
            None => {
                log::warn!(
                    "No handler registered for block '{}' (node '{}')",
                    request.block_id,
                    request.node_id
                );
                Ok(DispatchEnvelope::failure(format!(
                    "No handler registered for block '{}'",
                    request.block_id
                )))
            }
        }
    }
}
