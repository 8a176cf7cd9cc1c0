//! Editing session
//!
//! A `PipelineSession` owns the pipeline being edited together with the
//! engine that runs it and the store that saves it. It can be shared
//! between tasks: edits and runs are serialized, and a second run while
//! one is in flight is refused with `PipelineError::RunInProgress`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::catalog::BlockCatalog;
use crate::engine::{ExecutionEngine, RunReport};
use crate::error::{PipelineError, Result};
use crate::graph::{GraphEditError, Pipeline};
use crate::persistence::{PersistenceAdapter, PipelineSnapshot};

/// Default name of a fresh pipeline
pub const DEFAULT_PIPELINE_NAME: &str = "My Pipeline";

pub struct PipelineSession {
    engine: Arc<ExecutionEngine>,
    store: Arc<dyn PersistenceAdapter>,
    pipeline: Mutex<Pipeline>,
    last_report: Mutex<Option<RunReport>>,
    running: AtomicBool,
}

/// Clears the running flag when a run ends, including by panic
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PipelineSession {
    /// Start with an empty pipeline
    pub fn new(engine: Arc<ExecutionEngine>, store: Arc<dyn PersistenceAdapter>) -> Self {
        Self::with_pipeline(engine, store, Pipeline::new(DEFAULT_PIPELINE_NAME))
    }

    pub fn with_pipeline(
        engine: Arc<ExecutionEngine>,
        store: Arc<dyn PersistenceAdapter>,
        pipeline: Pipeline,
    ) -> Self {
        Self {
            engine,
            store,
            pipeline: Mutex::new(pipeline),
            last_report: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }

    /// Start from the last active pipeline, or an empty one
    pub fn restore(
        engine: Arc<ExecutionEngine>,
        store: Arc<dyn PersistenceAdapter>,
    ) -> Result<Self> {
        let pipeline = store
            .load_active()?
            .unwrap_or_else(|| Pipeline::new(DEFAULT_PIPELINE_NAME));
        Ok(Self::with_pipeline(engine, store, pipeline))
    }

    pub fn catalog(&self) -> &BlockCatalog {
        self.engine.catalog()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Copy of the current pipeline, including run state
    pub async fn pipeline(&self) -> Pipeline {
        self.pipeline.lock().await.clone()
    }

    pub async fn last_report(&self) -> Option<RunReport> {
        self.last_report.lock().await.clone()
    }

    /// Apply an edit to the pipeline
    ///
    /// Refused while a run is in progress. On success the pipeline is
    /// remembered as the active one.
    pub async fn edit<R>(
        &self,
        edit: impl FnOnce(&mut Pipeline, &BlockCatalog) -> std::result::Result<R, GraphEditError>,
    ) -> Result<R> {
        if self.is_running() {
            return Err(PipelineError::RunInProgress);
        }
        let mut pipeline = self
            .pipeline
            .try_lock()
            .map_err(|_| PipelineError::RunInProgress)?;
        let result = edit(&mut pipeline, self.engine.catalog())?;
        if let Err(e) = self.store.save_active(&pipeline) {
            log::warn!("Auto-save of active pipeline skipped: {}", e);
        }
        Ok(result)
    }

    /// Replace the current pipeline with a saved one
    pub async fn open(&self, name: &str) -> Result<()> {
        let snapshot = self.store.load(name)?;
        self.replace(snapshot.into_pipeline()).await
    }

    /// Start over with an empty pipeline
    pub async fn new_pipeline(&self, name: impl Into<String>) -> Result<()> {
        self.replace(Pipeline::new(name)).await
    }

    async fn replace(&self, pipeline: Pipeline) -> Result<()> {
        if self.is_running() {
            return Err(PipelineError::RunInProgress);
        }
        let mut current = self
            .pipeline
            .try_lock()
            .map_err(|_| PipelineError::RunInProgress)?;
        *current = pipeline;
        *self.last_report.lock().await = None;
        if let Err(e) = self.store.save_active(&current) {
            log::warn!("Auto-save of active pipeline skipped: {}", e);
        }
        Ok(())
    }

    /// Save the current pipeline under its name
    pub async fn save(&self) -> Result<PipelineSnapshot> {
        let pipeline = self.pipeline.lock().await;
        self.store.save(&pipeline)
    }

    /// Run the current pipeline
    pub async fn run(&self) -> Result<RunReport> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PipelineError::RunInProgress);
        }
        let _guard = RunGuard(&self.running);

        let mut pipeline = self.pipeline.lock().await;
        let report = self.engine.run(&mut pipeline).await?;
        *self.last_report.lock().await = Some(report.clone());
        Ok(report)
    }
}
