//! Handler setup for host applications.
//!
//! Hosts call [`register_builtin_handlers`] at startup to fill a
//! `HandlerRegistry` with the blocks this crate runs locally. Blocks that
//! need a provider (video, image, composition) are left to another
//! registry or a remote dispatcher merged in by the host.

use std::sync::Arc;

use pipeline_engine::HandlerRegistry;

use crate::generator::TextGenerator;
use crate::media::MediaUploadHandler;
use crate::research::RESEARCH_BLOCKS;
use crate::text::TextBlockHandler;
use crate::writing::WRITING_BLOCKS;

/// Register the media upload handler
///
/// Needs no generator, so hosts without a language model can still run
/// upload-only pipelines locally.
pub fn register_media_handlers(registry: &mut HandlerRegistry) {
    registry.register(MediaUploadHandler::BLOCK_ID, Arc::new(MediaUploadHandler::new()));
}

/// Register every local handler, text blocks backed by `generator`
///
/// # Example
///
/// ```ignore
/// let mut registry = pipeline_engine::HandlerRegistry::new();
/// pipeline_blocks::register_builtin_handlers(&mut registry, Arc::new(my_llm_client));
/// registry.merge(provider_handlers);
/// ```
pub fn register_builtin_handlers(
    registry: &mut HandlerRegistry,
    generator: Arc<dyn TextGenerator>,
) {
    register_media_handlers(registry);
    for block in RESEARCH_BLOCKS.into_iter().chain(WRITING_BLOCKS) {
        let handler = TextBlockHandler::new(block, generator.clone());
        registry.register(handler.block_id(), Arc::new(handler));
    }
    log::debug!("Registered {} local block handlers", registry.block_ids().len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::testing::FakeGenerator;
    use pipeline_engine::{
        BlockCatalog, DispatchEnvelope, DispatchRequest, Dispatcher, ExecutionEngine,
        NodeStatus, OutputBundle, PipelineBuilder,
    };

    #[test]
    fn test_registers_local_blocks() {
        let mut registry = HandlerRegistry::new();
        register_builtin_handlers(&mut registry, FakeGenerator::replying("ok"));

        assert_eq!(registry.block_ids().len(), 11);
        let catalog = BlockCatalog::builtin();
        for block_id in registry.block_ids() {
            assert!(catalog.contains(block_id), "{} is not in the catalog", block_id);
        }
        assert!(!registry.has_handler("video_generator"));
    }

    #[tokio::test]
    async fn test_registry_dispatches_text_block() {
        let mut registry = HandlerRegistry::new();
        register_builtin_handlers(&mut registry, FakeGenerator::replying("Glow up in 7 days"));

        let envelope = registry
            .dispatch(DispatchRequest::new("caption_writer"))
            .await
            .unwrap();
        assert_eq!(
            envelope,
            DispatchEnvelope::Success(OutputBundle::text("caption", "Glow up in 7 days"))
        );
    }

    #[tokio::test]
    async fn test_chain_runs_through_engine() {
        let generator = FakeGenerator::replying("HOOK: Glow up");
        let mut registry = HandlerRegistry::new();
        register_builtin_handlers(&mut registry, generator.clone());
        let engine = ExecutionEngine::new(Arc::new(BlockCatalog::builtin()), Arc::new(registry));

        let mut pipeline = PipelineBuilder::new("launch")
            .add_node("script", "script_writer", (0.0, 0.0))
            .add_node("caption", "caption_writer", (400.0, 0.0))
            .connect("script", "script", "caption", "script_in")
            .build();
        let report = engine.run(&mut pipeline).await.unwrap();

        assert!(report.is_success());
        assert_eq!(report.completion_order, vec!["script", "caption"]);
        assert!(pipeline.nodes.iter().all(|n| n.status == NodeStatus::Done));
        // The caption prompt was built from the script
        assert_eq!(
            generator.last_call().user,
            "Write a caption based on: HOOK: Glow up"
        );
    }
}
