//! Media Upload
//!
//! Publishes the user's uploaded file to downstream blocks. Runs locally,
//! no provider involved.

use async_trait::async_trait;
use pipeline_engine::{
    BlockHandler, DispatchEnvelope, DispatchRequest, MediaKind, OutputBundle, Result,
};

/// Media Upload handler
///
/// # Config
/// - `input_image` - URL of the uploaded file
/// - `input_image_type` - kind recorded at upload time
///
/// # Outputs
/// - `video_url` (type `video`) for videos, `image_url` (type `image`)
///   otherwise
/// - a `message` text bundle when nothing usable is attached
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaUploadHandler;

impl MediaUploadHandler {
    pub const BLOCK_ID: &'static str = "media_upload";
    /// Config key of the uploaded file
    pub const FIELD_MEDIA: &'static str = "input_image";
    /// Text published when no file is attached
    pub const NOTHING_ATTACHED: &'static str =
        "Media uploaded successfully. Connect to downstream blocks.";

    pub fn new() -> Self {
        Self
    }

    /// Build the output for a request
    pub fn output(request: &DispatchRequest) -> OutputBundle {
        // blob: URLs only live in the browser session that created them
        let url = request
            .config_value(Self::FIELD_MEDIA)
            .filter(|url| !url.starts_with("blob:"));

        let Some(url) = url else {
            return OutputBundle::text("message", Self::NOTHING_ATTACHED);
        };

        let recorded = format!("{}_type", Self::FIELD_MEDIA);
        let kind = match MediaKind::from_extension(url) {
            MediaKind::Video => MediaKind::Video,
            MediaKind::Image if request.config_value(&recorded) == Some("video") => {
                MediaKind::Video
            }
            MediaKind::Image => MediaKind::Image,
        };

        match kind {
            MediaKind::Video => OutputBundle::video(url),
            MediaKind::Image => OutputBundle::image(url),
        }
    }
}

#[async_trait]
impl BlockHandler for MediaUploadHandler {
    async fn handle(&self, request: DispatchRequest) -> Result<DispatchEnvelope> {
        let output = Self::output(&request);
        log::debug!(
            "Media upload node '{}' published {:?}",
            request.node_id,
            output.kind
        );
        Ok(DispatchEnvelope::Success(output))
    }
}
