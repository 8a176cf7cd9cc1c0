//! Command implementations
//!
//! `Runner` wires a file store, the block catalog and a dispatcher
//! together. Printing is left to `main`.

use std::path::Path;
use std::sync::Arc;

use pipeline_blocks::register_media_handlers;
use pipeline_engine::{
    validate_pipeline, BlockCatalog, Dispatcher, ExecutionEngine, FileStore, HandlerRegistry,
    LogEventSink, PersistenceAdapter, Pipeline, PipelineError, PipelineSession, PipelineSummary,
    RemoteDispatcher, RunReport, ValidationError,
};

use crate::config::{ConfigError, RunnerConfig};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Outcome of validating a saved pipeline
pub struct ValidationOutcome {
    pub pipeline: Pipeline,
    pub errors: Vec<ValidationError>,
    pub estimated_cost: f64,
}

/// Outcome of running a saved pipeline
pub struct RunOutcome {
    /// Pipeline with the statuses of this run
    pub pipeline: Pipeline,
    pub report: RunReport,
}

pub struct Runner {
    catalog: Arc<BlockCatalog>,
    store: Arc<FileStore>,
    config: RunnerConfig,
}

impl Runner {
    pub fn new(data_dir: &Path, config: RunnerConfig) -> Self {
        let store = Arc::new(FileStore::new(config.store_dir_or(data_dir)));
        Self {
            catalog: Arc::new(BlockCatalog::builtin()),
            store,
            config,
        }
    }

    pub fn catalog(&self) -> &BlockCatalog {
        &self.catalog
    }

    pub fn list(&self) -> Result<Vec<PipelineSummary>, CliError> {
        Ok(self.store.list()?)
    }

    pub fn delete(&self, name: &str) -> Result<bool, CliError> {
        Ok(self.store.delete(name)?)
    }

    pub fn validate(&self, name: &str) -> Result<ValidationOutcome, CliError> {
        let pipeline = self.store.load(name)?.into_pipeline();
        let errors = validate_pipeline(&pipeline, &self.catalog);
        let estimated_cost = pipeline.estimated_cost(&self.catalog);
        Ok(ValidationOutcome {
            pipeline,
            errors,
            estimated_cost,
        })
    }

    /// Load a saved pipeline and run it once
    pub async fn run(&self, name: &str) -> Result<RunOutcome, CliError> {
        let pipeline = self.store.load(name)?.into_pipeline();
        let engine = ExecutionEngine::new(self.catalog.clone(), self.dispatcher()?)
            .with_config(self.config.engine_config())
            .with_event_sink(Arc::new(LogEventSink));

        let session =
            PipelineSession::with_pipeline(Arc::new(engine), self.store.clone(), pipeline);
        let report = session.run().await?;
        Ok(RunOutcome {
            pipeline: session.pipeline().await,
            report,
        })
    }

    /// Remote dispatch when an endpoint is configured, local handlers otherwise
    fn dispatcher(&self) -> Result<Arc<dyn Dispatcher>, CliError> {
        match &self.config.dispatch_url {
            Some(url) => {
                log::info!("Dispatching blocks to {}", url);
                let remote = RemoteDispatcher::new(url.as_str(), self.config.request_timeout())?;
                Ok(Arc::new(remote))
            }
            None => {
                log::info!("No dispatch URL configured, running local blocks only");
                let mut registry = HandlerRegistry::new();
                register_media_handlers(&mut registry);
                Ok(Arc::new(registry))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_engine::{
        FieldValue, MediaKind, MediaRef, NodeStatus, OutputKind, PipelineBuilder,
    };
    use tempfile::TempDir;

    fn saved(dir: &TempDir, pipeline: &Pipeline) -> Runner {
        let runner = Runner::new(dir.path(), RunnerConfig::default());
        runner.store.save(pipeline).unwrap();
        runner
    }

    #[tokio::test]
    async fn test_run_upload_to_export_locally() {
        let dir = TempDir::new().unwrap();
        let pipeline = PipelineBuilder::new("Export")
            .add_node("upload", "media_upload", (0.0, 0.0))
            .with_media("input_image", MediaRef::new("/uploads/demo.mp4", MediaKind::Video))
            .add_node("export", "download_export", (400.0, 0.0))
            .with_field("format", FieldValue::choice("MP4 (H.264)"))
            .connect("upload", "media", "export", "video_in")
            .build();
        let runner = saved(&dir, &pipeline);

        let outcome = runner.run("Export").await.unwrap();
        assert!(outcome.report.is_success());
        let export = outcome.report.result("export").unwrap();
        assert_eq!(export.kind, OutputKind::Download);
        assert!(outcome
            .pipeline
            .nodes
            .iter()
            .all(|n| n.status == NodeStatus::Done));
    }

    #[tokio::test]
    async fn test_run_without_handler_fails_node_only() {
        let dir = TempDir::new().unwrap();
        let pipeline = PipelineBuilder::new("Writer")
            .add_node("script", "script_writer", (0.0, 0.0))
            .build();
        let runner = saved(&dir, &pipeline);

        let outcome = runner.run("Writer").await.unwrap();
        assert_eq!(outcome.report.failed(), 1);
        assert_eq!(
            outcome.report.result("script").unwrap().error_message(),
            Some("No handler registered for block 'script_writer'")
        );
    }

    #[tokio::test]
    async fn test_validate_and_delete() {
        let dir = TempDir::new().unwrap();
        let pipeline = PipelineBuilder::new("Broken")
            .add_node("a", "script_writer", (0.0, 0.0))
            .add_node("b", "teleporter", (400.0, 0.0))
            .build();
        let runner = saved(&dir, &pipeline);

        let outcome = runner.validate("Broken").unwrap();
        assert_eq!(outcome.errors.len(), 1);
        assert!((outcome.estimated_cost - 0.005).abs() < 1e-9);
        assert!(matches!(
            runner.run("Broken").await,
            Err(CliError::Pipeline(PipelineError::UnknownBlock { .. }))
        ));

        assert_eq!(runner.list().unwrap().len(), 1);
        assert!(runner.delete("Broken").unwrap());
        assert!(!runner.delete("Broken").unwrap());
        assert!(matches!(
            runner.validate("Broken"),
            Err(CliError::Pipeline(PipelineError::PipelineNotFound(_)))
        ));
    }
}
