//! End-to-end runs through the public API: editing, running and saving
//! pipelines the way a host application does.

use std::sync::Arc;

use parking_lot::Mutex;
use pipeline_engine::{
    BlockCatalog, DispatchEnvelope, DispatchRequest, ExecutionEngine, FieldValue, FileStore,
    HandlerRegistry, MediaKind, MediaRef, NodeStatus, OutputBundle, OutputKind,
    PersistenceAdapter, Pipeline, PipelineBuilder, PipelineEvent, PortRef, Position,
    VecEventSink,
};
use tempfile::TempDir;

/// Registry whose handlers record every request they see
struct Recording {
    registry: HandlerRegistry,
    requests: Arc<Mutex<Vec<DispatchRequest>>>,
}

impl Recording {
    fn new() -> Self {
        Self {
            registry: HandlerRegistry::new(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn respond(mut self, block_id: &str, envelope: DispatchEnvelope) -> Self {
        let requests = self.requests.clone();
        self.registry.register_sync(block_id, move |request| {
            requests.lock().push(request.clone());
            Ok(envelope.clone())
        });
        self
    }

    fn engine(&self) -> ExecutionEngine {
        ExecutionEngine::new(Arc::new(BlockCatalog::builtin()), Arc::new(self.registry.clone()))
    }

    fn dispatched(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.block_id.clone()).collect()
    }

    fn request_for(&self, block_id: &str) -> DispatchRequest {
        self.requests
            .lock()
            .iter()
            .find(|r| r.block_id == block_id)
            .cloned()
            .expect("block was not dispatched")
    }
}

#[tokio::test]
async fn single_script_writer_runs_once() {
    let recording = Recording::new().respond(
        "script_writer",
        OutputBundle::text("script", "HOOK: Glow up").into(),
    );
    let mut pipeline = PipelineBuilder::new("single")
        .add_node("writer", "script_writer", (0.0, 0.0))
        .build();

    let report = recording.engine().run(&mut pipeline).await.unwrap();

    assert_eq!(recording.dispatched(), vec!["script_writer"]);
    assert!(recording.request_for("script_writer").inputs.is_empty());
    assert_eq!(pipeline.nodes[0].status, NodeStatus::Done);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.result("writer").unwrap().get("script"), Some("HOOK: Glow up"));
}

#[tokio::test]
async fn upload_without_file_still_feeds_video_generator() {
    let recording = Recording::new()
        .respond(
            "media_upload",
            OutputBundle::text("message", "Media uploaded successfully.").into(),
        )
        .respond(
            "video_generator",
            DispatchEnvelope::failure(
                "No input image. Upload an image or connect a generator block.",
            ),
        );
    let mut pipeline = PipelineBuilder::new("video")
        .add_node("upload", "media_upload", (0.0, 0.0))
        .add_node("video", "video_generator", (400.0, 0.0))
        .with_field("prompt", FieldValue::text("test"))
        .connect("upload", "media", "video", "first_frame")
        .build();

    let report = recording.engine().run(&mut pipeline).await.unwrap();

    assert_eq!(recording.dispatched(), vec!["media_upload", "video_generator"]);
    let request = recording.request_for("video_generator");
    assert_eq!(request.config.get("prompt").map(String::as_str), Some("test"));
    let upstream = request.inputs.get("media").expect("upload output missing");
    assert!(upstream.media_url().is_none());
    assert!(request.inputs.first_media_url().is_none());

    assert_eq!(pipeline.find_node("video").unwrap().status, NodeStatus::Error);
    assert_eq!(report.completion_order, vec!["upload", "video"]);
}

#[tokio::test]
async fn failed_hook_generator_leaves_caption_idle() {
    let recording = Recording::new()
        .respond("hook_generator", DispatchEnvelope::failure("OPENROUTER_API_KEY not set"))
        .respond("caption_writer", OutputBundle::text("caption", "unused").into());
    let events = Arc::new(VecEventSink::new());
    let engine = recording.engine().with_event_sink(events.clone());
    let mut pipeline = PipelineBuilder::new("hooks")
        .add_node("hooks", "hook_generator", (0.0, 0.0))
        .add_node("caption", "caption_writer", (400.0, 0.0))
        .connect("hooks", "hooks", "caption", "script_in")
        .build();

    let report = engine.run(&mut pipeline).await.unwrap();

    let hooks = pipeline.find_node("hooks").unwrap();
    assert_eq!(hooks.status, NodeStatus::Error);
    assert_eq!(pipeline.find_node("caption").unwrap().status, NodeStatus::Idle);
    assert_eq!(report.results.len(), 1);
    let entry = report.result("hooks").unwrap();
    assert_eq!(entry.kind, OutputKind::Error);
    assert_eq!(entry.error_message(), Some("OPENROUTER_API_KEY not set"));
    assert_eq!(report.skipped, vec!["caption"]);
    assert_eq!(recording.dispatched(), vec!["hook_generator"]);

    assert!(events.events().iter().any(|e| matches!(
        e,
        PipelineEvent::NodeSkipped { node_id, .. } if node_id == "caption"
    )));
}

#[tokio::test]
async fn independent_roots_both_run() {
    let recording = Recording::new()
        .respond("shop_scraper", OutputBundle::text("products", "1. Serum").into())
        .respond("sound_tracker", OutputBundle::text("sounds", "1. Espresso").into());
    let mut pipeline = PipelineBuilder::new("roots")
        .add_node("a", "shop_scraper", (0.0, 0.0))
        .add_node("b", "sound_tracker", (0.0, 300.0))
        .build();

    let report = recording.engine().run(&mut pipeline).await.unwrap();

    let mut dispatched = recording.dispatched();
    dispatched.sort();
    assert_eq!(dispatched, vec!["shop_scraper", "sound_tracker"]);
    assert!(pipeline.nodes.iter().all(|n| n.status == NodeStatus::Done));
    assert_eq!(report.results.len(), 2);
}

#[test]
fn deleting_a_node_removes_its_wires() {
    let catalog = BlockCatalog::builtin();
    let mut pipeline = Pipeline::new("fan-out");
    let a = pipeline
        .add_node(&catalog, "script_writer", Position::new(0.0, 0.0))
        .unwrap();
    let b = pipeline
        .add_node(&catalog, "caption_writer", Position::new(400.0, 0.0))
        .unwrap();
    let c = pipeline
        .add_node(&catalog, "ab_splitter", Position::new(400.0, 300.0))
        .unwrap();
    pipeline
        .add_connection(&catalog, PortRef::new(&a, "script"), PortRef::new(&b, "script_in"))
        .unwrap();
    pipeline
        .add_connection(&catalog, PortRef::new(&a, "script"), PortRef::new(&c, "script_in"))
        .unwrap();

    pipeline.delete_node(&a).unwrap();

    assert!(pipeline.connections.is_empty());
    assert_eq!(pipeline.incoming(&b).count(), 0);
    assert_eq!(pipeline.incoming(&c).count(), 0);
    assert_eq!(pipeline.roots().len(), 2);
}

#[test]
fn saved_pipeline_drops_large_inline_payloads() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path());

    let payload = format!("data:image/png;base64,{}", "A".repeat(6000));
    let thumbnail = "data:image/png;base64,iVBORw0KGgo=";
    let pipeline = PipelineBuilder::new("Serum launch")
        .add_node("upload", "media_upload", (12.5, 40.0))
        .with_media(
            "input_image",
            MediaRef::new(payload, MediaKind::Image)
                .with_display_name("serum.png")
                .with_thumbnail(thumbnail),
        )
        .add_node("video", "video_generator", (420.0, 40.0))
        .with_field("prompt", FieldValue::text("Slow pan over the bottle"))
        .connect("upload", "media", "video", "first_frame")
        .build();

    store.save(&pipeline).unwrap();
    let loaded = store.load("Serum launch").unwrap().into_pipeline();

    assert_eq!(loaded.connections, pipeline.connections);
    for (before, after) in pipeline.nodes.iter().zip(&loaded.nodes) {
        assert_eq!(before.id, after.id);
        assert_eq!(before.position, after.position);
    }
    let Some(FieldValue::Media(media)) = loaded.nodes[0].config.get("input_image") else {
        panic!("media field should survive with its thumbnail");
    };
    assert!(media.url.is_none());
    assert_eq!(media.thumbnail.as_deref(), Some(thumbnail));
    assert_eq!(media.display_name.as_deref(), Some("serum.png"));
    assert_eq!(
        loaded.nodes[1].config.get("prompt"),
        Some(&FieldValue::text("Slow pan over the bottle"))
    );
}

#[tokio::test]
async fn export_after_generator_requests_download() {
    let recording = Recording::new().respond(
        "video_generator",
        OutputBundle::video("/pipeline-output/ad.mp4").into(),
    );
    let events = Arc::new(VecEventSink::new());
    let engine = recording.engine().with_event_sink(events.clone());
    let mut pipeline = PipelineBuilder::new("export")
        .add_node("video", "video_generator", (0.0, 0.0))
        .with_field("prompt", FieldValue::text("Serum on a marble counter"))
        .add_node("export", "download_export", (400.0, 0.0))
        .connect("video", "video", "export", "video_in")
        .build();

    let report = engine.run(&mut pipeline).await.unwrap();

    assert!(report.is_success());
    assert_eq!(recording.dispatched(), vec!["video_generator"]);
    let export = report.result("export").unwrap();
    assert_eq!(export.kind, OutputKind::Download);
    assert!(events.events().iter().any(|e| matches!(
        e,
        PipelineEvent::DownloadRequested { url, kind: MediaKind::Video, .. }
            if url == "/pipeline-output/ad.mp4"
    )));
}
