//! Block catalog
//!
//! Static registry of every block type the editor offers: identity,
//! category, declared ports and configurable fields. Nothing here changes
//! at runtime; the graph model validates connections against it and the
//! engine looks up block identities in it before a run.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Block identity handled by the engine itself rather than a dispatcher
pub const DOWNLOAD_EXPORT: &str = "download_export";

/// Category of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockCategory {
    /// Scrapers and research blocks
    DataCollection,
    /// LLM-backed writing blocks
    Writing,
    /// Image and video generation
    Generation,
    /// Post-processing and export
    Action,
}

impl BlockCategory {
    pub const ALL: [BlockCategory; 4] = [
        BlockCategory::DataCollection,
        BlockCategory::Writing,
        BlockCategory::Generation,
        BlockCategory::Action,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::DataCollection => "Data Collection",
            Self::Writing => "Logic & Writing",
            Self::Generation => "Generation",
            Self::Action => "Actions",
        }
    }
}

/// Provider category a model-choice field is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelScope {
    Video,
    Llm,
    Scraper,
}

/// Kind of a configuration field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Single-line text
    Text,
    /// Multi-line text
    LongText,
    /// One of an enumerated option list
    Choice { options: Vec<String> },
    /// Uploaded image or video
    Media,
    /// A model picked from the catalog of the given provider scope
    Model { scope: ModelScope },
}

/// A configurable field on a block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub key: String,
    pub label: String,
    pub kind: FieldKind,
}

impl FieldDefinition {
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind,
        }
    }

    /// The options a user can pick from, for choice and model fields
    pub fn options(&self) -> Vec<String> {
        match &self.kind {
            FieldKind::Choice { options } => options.clone(),
            FieldKind::Model { scope } => models_for(*scope)
                .iter()
                .map(|m| m.id.to_string())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// A named attachment point on a block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDefinition {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl PortDefinition {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            color: None,
        }
    }

    pub fn colored(id: impl Into<String>, label: impl Into<String>, color: &str) -> Self {
        Self {
            color: Some(color.to_string()),
            ..Self::new(id, label)
        }
    }
}

/// Direction of a port relative to its node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    Input,
    Output,
}

/// Complete definition of a block type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDefinition {
    /// Unique type identifier (e.g., "script_writer")
    pub id: String,
    pub label: String,
    pub category: BlockCategory,
    pub description: String,
    /// Advisory cost per run, as displayed (e.g., "~$0.05-0.50", "Free")
    pub cost: String,
    pub powered_by: String,
    pub inputs: Vec<PortDefinition>,
    pub outputs: Vec<PortDefinition>,
    pub fields: Vec<FieldDefinition>,
}

impl BlockDefinition {
    /// Ports on the given side, in declaration order
    pub fn ports(&self, direction: PortDirection) -> &[PortDefinition] {
        match direction {
            PortDirection::Input => &self.inputs,
            PortDirection::Output => &self.outputs,
        }
    }

    /// Position of a port in its list
    pub fn port_index(&self, port: &str, direction: PortDirection) -> Option<usize> {
        self.ports(direction).iter().position(|p| p.id == port)
    }

    pub fn has_port(&self, port: &str, direction: PortDirection) -> bool {
        self.port_index(port, direction).is_some()
    }

    pub fn field(&self, key: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Lower bound of the advisory cost in dollars
    ///
    /// "Free" counts as zero, a range counts as its lower end and anything
    /// unparsable counts as zero.
    pub fn estimated_cost(&self) -> f64 {
        let cleaned = self.cost.replace("~$", "").replace("Free", "0");
        let lower = cleaned.split('-').next().unwrap_or("");
        let numeric: String = lower
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        numeric.parse().unwrap_or(0.0)
    }

    /// Check that port ids are unique on each side
    pub fn validate(&self) -> Result<(), CatalogError> {
        for direction in [PortDirection::Input, PortDirection::Output] {
            let mut seen = HashSet::new();
            for port in self.ports(direction) {
                if !seen.insert(port.id.as_str()) {
                    return Err(CatalogError::DuplicatePort {
                        block_id: self.id.clone(),
                        port: port.id.clone(),
                        direction,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Errors raised while building a catalog
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("Block '{block_id}' declares {direction:?} port '{port}' more than once")]
    DuplicatePort {
        block_id: String,
        port: String,
        direction: PortDirection,
    },
    #[error("Block '{0}' is already registered")]
    DuplicateBlock(String),
}

/// An entry in one of the model pickers
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelOption {
    pub id: &'static str,
    pub name: &'static str,
    pub provider: &'static str,
    pub cost: &'static str,
    /// Star rating from 1 to 5, unset for scraper providers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
}

impl ModelOption {
    const fn new(
        id: &'static str,
        name: &'static str,
        provider: &'static str,
        cost: &'static str,
    ) -> Self {
        Self {
            id,
            name,
            provider,
            cost,
            quality: None,
        }
    }

    const fn rated(self, quality: u8) -> Self {
        Self {
            quality: Some(quality),
            ..self
        }
    }

    /// Rating rendered as stars, empty when unrated
    pub fn stars(&self) -> String {
        "*".repeat(self.quality.unwrap_or(0) as usize)
    }
}

pub const VIDEO_MODELS: &[ModelOption] = &[
    ModelOption::new("wan-2.1-i2v", "Wan 2.1", "Replicate", "~$0.05").rated(3),
    ModelOption::new("kling-v1.6-standard", "Kling V1.6", "Replicate", "~$0.10").rated(4),
    ModelOption::new("kling-v2-master", "Kling V2 Master", "Replicate", "~$0.30").rated(5),
    ModelOption::new("luma-ray2-flash", "Luma Ray2 Flash", "Replicate", "~$0.10").rated(4),
    ModelOption::new("minimax-video-01", "Minimax/Hailuo", "Replicate", "~$0.15").rated(4),
    ModelOption::new("google-veo-2", "Google Veo 2", "Replicate", "~$0.50").rated(5),
];

pub const LLM_MODELS: &[ModelOption] = &[
    ModelOption::new("gpt-4o-mini", "GPT-4o Mini", "OpenRouter", "$0.00015/1k").rated(4),
    ModelOption::new("gpt-4o", "GPT-4o", "OpenRouter", "$0.0025/1k").rated(5),
    ModelOption::new("claude-3.5-haiku", "Claude 3.5 Haiku", "OpenRouter", "$0.0008/1k").rated(4),
    ModelOption::new("llama-3.1-70b", "Llama 3.1 70B", "OpenRouter", "$0.0004/1k").rated(3),
    ModelOption::new("gemini-2.0-flash", "Gemini 2.0 Flash", "OpenRouter", "$0.0001/1k").rated(4),
    ModelOption::new("deepseek-chat-v3", "DeepSeek V3", "OpenRouter", "$0.00014/1k").rated(4),
];

pub const SCRAPER_PROVIDERS: &[ModelOption] = &[
    ModelOption::new("scrape-creators", "Scrape Creators", "Scrape Creators", "100 free credits"),
    ModelOption::new("rapidapi-tiktok", "RapidAPI TikTok", "RapidAPI", "50 req/mo free"),
    ModelOption::new("apify-tiktok", "Apify", "Apify", "Free trial"),
];

/// Model options for a provider scope
pub fn models_for(scope: ModelScope) -> &'static [ModelOption] {
    match scope {
        ModelScope::Video => VIDEO_MODELS,
        ModelScope::Llm => LLM_MODELS,
        ModelScope::Scraper => SCRAPER_PROVIDERS,
    }
}

/// Registry of block definitions
///
/// Keeps definition order for palette listings and an index for lookup.
#[derive(Debug, Clone, Default)]
pub struct BlockCatalog {
    blocks: Vec<BlockDefinition>,
    index: HashMap<String, usize>,
}

impl BlockCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog of blocks shipped with the editor
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for block in builtin_blocks() {
            // Built-in definitions are fixed data covered by tests.
            if let Err(e) = catalog.register(block) {
                log::error!("Invalid built-in block definition: {}", e);
            }
        }
        catalog
    }

    /// Add a block definition
    pub fn register(&mut self, block: BlockDefinition) -> Result<(), CatalogError> {
        block.validate()?;
        if self.index.contains_key(&block.id) {
            return Err(CatalogError::DuplicateBlock(block.id));
        }
        self.index.insert(block.id.clone(), self.blocks.len());
        self.blocks.push(block);
        Ok(())
    }

    pub fn get(&self, block_id: &str) -> Option<&BlockDefinition> {
        self.index.get(block_id).map(|&i| &self.blocks[i])
    }

    pub fn contains(&self, block_id: &str) -> bool {
        self.index.contains_key(block_id)
    }

    /// All definitions in registration order
    pub fn blocks(&self) -> &[BlockDefinition] {
        &self.blocks
    }

    /// Definitions of one category, in registration order
    pub fn by_category(&self, category: BlockCategory) -> Vec<&BlockDefinition> {
        self.blocks
            .iter()
            .filter(|b| b.category == category)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Built-in definitions
// ---------------------------------------------------------------------------

const BLUE: &str = "#60a5fa";
const GREEN: &str = "#4ade80";
const YELLOW: &str = "#facc15";
const PURPLE: &str = "#c084fc";

fn choice(key: &str, label: &str, options: &[&str]) -> FieldDefinition {
    FieldDefinition::new(
        key,
        label,
        FieldKind::Choice {
            options: options.iter().map(|o| o.to_string()).collect(),
        },
    )
}

fn text(key: &str, label: &str) -> FieldDefinition {
    FieldDefinition::new(key, label, FieldKind::Text)
}

fn long_text(key: &str, label: &str) -> FieldDefinition {
    FieldDefinition::new(key, label, FieldKind::LongText)
}

fn media(key: &str, label: &str) -> FieldDefinition {
    FieldDefinition::new(key, label, FieldKind::Media)
}

fn model(key: &str, label: &str, scope: ModelScope) -> FieldDefinition {
    FieldDefinition::new(key, label, FieldKind::Model { scope })
}

#[allow(clippy::too_many_arguments)]
fn block(
    id: &str,
    label: &str,
    category: BlockCategory,
    description: &str,
    cost: &str,
    powered_by: &str,
    inputs: Vec<PortDefinition>,
    outputs: Vec<PortDefinition>,
    fields: Vec<FieldDefinition>,
) -> BlockDefinition {
    BlockDefinition {
        id: id.to_string(),
        label: label.to_string(),
        category,
        description: description.to_string(),
        cost: cost.to_string(),
        powered_by: powered_by.to_string(),
        inputs,
        outputs,
        fields,
    }
}

#[rustfmt::skip]
fn builtin_blocks() -> Vec<BlockDefinition> {
    use BlockCategory::*;
    use PortDefinition as P;

    vec![
        // Data collection
        block(
            "shop_scraper", "Shop Scraper", DataCollection,
            "Find trending TikTok Shop products", "~$0.01", "TikTok Shop API",
            vec![],
            vec![
                P::colored("products", "Products", BLUE),
                P::colored("top_product", "Top Product", BLUE),
            ],
            vec![
                model("scraper_provider", "Scraper Provider", ModelScope::Scraper),
                text("keyword", "Search Keyword"),
                choice("category", "Category", &[
                    "All", "Beauty", "Fashion", "Home", "Electronics", "Food", "Fitness",
                ]),
                choice("count", "Results", &["3", "5", "10", "20"]),
            ],
        ),
        block(
            "competitor_spy", "Competitor Spy", DataCollection,
            "Track competitor videos & performance", "~$0.01", "TikTok Scraper API",
            vec![],
            vec![P::colored("videos", "Videos", BLUE), P::colored("top_video", "Top Video", BLUE)],
            vec![
                model("scraper_provider", "Scraper Provider", ModelScope::Scraper),
                text("username", "TikTok Username"),
                choice("min_views", "Min Views", &["10K", "50K", "100K", "500K", "1M"]),
            ],
        ),
        block(
            "asset_extractor", "Asset Extractor", DataCollection,
            "Extract frames & transcript from video", "~$0.01", "FFmpeg + Whisper",
            vec![P::colored("video_url", "Video URL", BLUE)],
            vec![
                P::colored("first_frame", "First Frame", GREEN),
                P::colored("transcript", "Transcript", YELLOW),
                P::colored("all_frames", "All Frames", GREEN),
            ],
            vec![
                text("video_url", "Video URL"),
                choice("extract", "Extract", &[
                    "Best Frame + Transcript", "All Frames", "Audio Only", "Everything",
                ]),
            ],
        ),
        block(
            "hashtag_analyzer", "Hashtag Analyzer", DataCollection,
            "Find top posts for hashtags", "~$0.01", "TikTok Scraper API",
            vec![],
            vec![P::colored("hashtag_data", "Hashtag Data", BLUE)],
            vec![
                model("scraper_provider", "Scraper Provider", ModelScope::Scraper),
                text("hashtag", "Hashtag"),
                choice("count", "Top Posts", &["5", "10", "20"]),
            ],
        ),
        block(
            "sound_tracker", "Sound Tracker", DataCollection,
            "Find trending sounds", "~$0.01", "TikTok Scraper API",
            vec![],
            vec![P::colored("sounds", "Sounds", BLUE)],
            vec![
                model("scraper_provider", "Scraper Provider", ModelScope::Scraper),
                text("niche", "Niche"),
            ],
        ),
        // Writing
        block(
            "hook_generator", "Hook Generator", Writing,
            "Reverse-engineer viral hooks", "~$0.005", "OpenRouter LLM",
            vec![P::colored("context", "Product Info", YELLOW)],
            vec![P::colored("hooks", "Hooks", YELLOW)],
            vec![
                model("llm_model", "AI Model", ModelScope::Llm),
                choice("style", "Hook Style", &[
                    "Aggressive", "Curiosity", "Shock", "FOMO", "Question", "Story",
                ]),
                choice("count", "# of Hooks", &["3", "5", "10"]),
                long_text("context", "Product / Context"),
            ],
        ),
        block(
            "persona_filter", "Persona Filter", Writing,
            "Rewrite in specific creator tone", "~$0.005", "OpenRouter LLM",
            vec![P::colored("text_in", "Text Input", YELLOW)],
            vec![P::colored("text_out", "Rewritten", YELLOW)],
            vec![
                model("llm_model", "AI Model", ModelScope::Llm),
                choice("persona", "Persona", &[
                    "Aggressive Gym Bro", "Calm Yoga Mom", "Tech Nerd",
                    "Beauty Guru", "Finance Bro", "Gen-Z Creator",
                ]),
            ],
        ),
        block(
            "script_writer", "Script Writer", Writing,
            "Full ad script from product info", "~$0.005", "OpenRouter LLM",
            vec![P::colored("product_data", "Product Data", YELLOW)],
            vec![
                P::colored("script", "Script", YELLOW),
                P::colored("prompt", "Video Prompt", PURPLE),
            ],
            vec![
                model("llm_model", "AI Model", ModelScope::Llm),
                text("product_name", "Product Name"),
                text("price", "Price"),
                long_text("selling_points", "Key Selling Points"),
                choice("script_style", "Style", &[
                    "Direct Sale", "Storytelling", "Problem-Solution", "Before/After",
                ]),
            ],
        ),
        block(
            "caption_writer", "Caption Writer", Writing,
            "Generate captions + hashtags", "~$0.003", "OpenRouter LLM",
            vec![P::colored("script_in", "Script", YELLOW)],
            vec![P::colored("caption", "Caption", YELLOW)],
            vec![
                model("llm_model", "AI Model", ModelScope::Llm),
                choice("tone", "Tone", &["Casual", "Urgent", "Funny", "Professional", "Clickbait"]),
                choice("include_hashtags", "Hashtags", &["5", "10", "15", "None"]),
            ],
        ),
        block(
            "ab_splitter", "A/B Splitter", Writing,
            "Generate script variations", "~$0.01", "OpenRouter LLM",
            vec![P::colored("script_in", "Script", YELLOW)],
            vec![
                P::colored("variation_a", "Variation A", YELLOW),
                P::colored("variation_b", "Variation B", YELLOW),
            ],
            vec![
                model("llm_model", "AI Model", ModelScope::Llm),
                choice("variations", "# Variations", &["2", "3", "5"]),
                choice("vary_what", "Vary", &["Hook Only", "Full Script", "Tone/Style", "CTA"]),
            ],
        ),
        // Generation
        block(
            "media_upload", "Media Upload", Generation,
            "Upload your own images or videos", "Free", "Local",
            vec![],
            vec![P::colored("media", "Media File", GREEN)],
            vec![media("input_image", "Upload File")],
        ),
        block(
            "video_generator", "Video Generator", Generation,
            "Generate full video with AI", "~$0.05-0.50", "Replicate",
            vec![
                P::colored("first_frame", "First Frame", GREEN),
                P::colored("ref_image", "Reference Image", GREEN),
                P::colored("prompt", "Prompt / Script", YELLOW),
            ],
            vec![
                P::colored("video", "Generated Video", GREEN),
                P::colored("thumbnail", "Thumbnail", GREEN),
            ],
            vec![
                media("input_image", "Input Image"),
                model("video_model", "Video Model", ModelScope::Video),
                choice("duration", "Duration", &["5s", "10s", "15s", "30s"]),
                choice("aspect_ratio", "Aspect Ratio", &[
                    "9:16 (TikTok)", "1:1 (Instagram)", "16:9 (YouTube)",
                ]),
                choice("style", "Style", &[
                    "Product Showcase", "UGC Style", "Cinematic", "Fast-Paced", "Lifestyle",
                ]),
                choice("camera_motion", "Camera", &[
                    "Auto", "Slow Zoom", "Pan L→R", "Orbit", "Static", "Handheld",
                ]),
            ],
        ),
        block(
            "image_generator", "Image Generator", Generation,
            "Generate product photos", "~$0.02", "Replicate (Flux)",
            vec![P::colored("product_image", "Product Image", GREEN)],
            vec![P::colored("image", "Generated Image", GREEN)],
            vec![
                media("input_image", "Product Image"),
                choice("scene", "Scene", &[
                    "White Background", "Kitchen", "Gym", "Living Room", "Outdoor", "Studio",
                ]),
                choice("count", "# Images", &["1", "2", "4"]),
            ],
        ),
        block(
            "add_text", "Add Text to Image", Generation,
            "AI text overlay on images", "~$0.01", "OpenAI / FFmpeg",
            vec![P::colored("image_in", "Image", GREEN)],
            vec![P::colored("image_out", "Image + Text", GREEN)],
            vec![
                media("input_image", "Image"),
                long_text("text", "Text"),
                choice("position", "Position", &["Top", "Center", "Bottom"]),
                choice("font_style", "Font", &[
                    "Bold Modern", "Handwritten", "Neon Glow", "TikTok Style", "Meme",
                ]),
                choice("color", "Color", &["White", "Black", "Yellow", "Red"]),
            ],
        ),
        block(
            "remove_bg", "Remove Background", Generation,
            "Remove image background", "~$0.01", "Replicate (RMBG)",
            vec![P::colored("image_in", "Image", GREEN)],
            vec![P::colored("image_out", "No-BG Image", GREEN)],
            vec![media("input_image", "Image")],
        ),
        block(
            "image_editor", "Image Editor", Generation,
            "Crop, resize, adjust images", "Free", "FFmpeg",
            vec![P::colored("image_in", "Image", GREEN)],
            vec![P::colored("image_out", "Edited Image", GREEN)],
            vec![
                media("input_image", "Image"),
                choice("action", "Action", &[
                    "Crop", "Resize", "Brightness", "Contrast", "Blur BG", "Add Border",
                ]),
                choice("target_size", "Size", &["1080x1920", "1080x1080", "1920x1080"]),
            ],
        ),
        // Actions
        block(
            DOWNLOAD_EXPORT, "Download / Export", Action,
            "Save final output", "Free", "Local",
            vec![P::colored("video_in", "Video", GREEN), P::colored("image_in", "Image", GREEN)],
            vec![],
            vec![
                choice("format", "Format", &["MP4 (H.264)", "MOV", "WebM"]),
                choice("quality", "Quality", &["High (1080p)", "Medium (720p)"]),
            ],
        ),
        block(
            "watermark", "Remove Watermark", Action,
            "Remove watermark from video", "Free", "FFmpeg (delogo)",
            vec![P::colored("video_in", "Video", GREEN)],
            vec![P::colored("video_out", "Clean Video", GREEN)],
            vec![
                choice("position", "Watermark Location", &[
                    "Top-Left", "Top-Right", "Bottom-Left", "Bottom-Right", "Center",
                ]),
                choice("size", "Watermark Size", &["Small", "Medium", "Large"]),
            ],
        ),
        block(
            "resize_crop", "Resize / Crop", Action,
            "Convert aspect ratios", "Free", "FFmpeg",
            vec![P::colored("video_in", "Video", GREEN)],
            vec![P::colored("video_out", "Resized", GREEN)],
            vec![
                choice("target_ratio", "Ratio", &["9:16 (TikTok)", "1:1 (IG)", "16:9 (YT)"]),
                choice("fill_mode", "Fill", &["Crop", "Black Bars", "Blur BG"]),
            ],
        ),
        block(
            "analytics_check", "Analytics Check", Action,
            "Check post performance", "~$0.01", "TikTok Scraper",
            vec![],
            vec![P::colored("metrics", "Metrics", PURPLE)],
            vec![
                model("scraper_provider", "Provider", ModelScope::Scraper),
                text("username", "Username"),
                choice("hours_after", "Check After", &["6h", "12h", "24h", "48h", "7d"]),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_complete() {
        let catalog = BlockCatalog::builtin();
        assert_eq!(catalog.len(), 20);
        for category in BlockCategory::ALL {
            assert!(!catalog.by_category(category).is_empty(), "{:?} is empty", category);
        }
        assert!(catalog.contains(DOWNLOAD_EXPORT));
        assert!(catalog.contains("script_writer"));
    }

    #[test]
    fn test_port_lookup() {
        let catalog = BlockCatalog::builtin();
        let video = catalog.get("video_generator").unwrap();
        assert_eq!(video.port_index("prompt", PortDirection::Input), Some(2));
        assert_eq!(video.port_index("video", PortDirection::Output), Some(0));
        assert!(!video.has_port("video", PortDirection::Input));
    }

    #[test]
    fn test_duplicate_port_rejected() {
        let mut def = BlockCatalog::builtin().get("watermark").unwrap().clone();
        def.id = "broken".to_string();
        def.inputs.push(PortDefinition::new("video_in", "Again"));

        let mut catalog = BlockCatalog::new();
        let err = catalog.register(def).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicatePort { direction: PortDirection::Input, .. }));
    }

    #[test]
    fn test_same_port_name_on_both_sides_is_fine() {
        let mut catalog = BlockCatalog::new();
        let def = BlockDefinition {
            id: "echo".to_string(),
            label: "Echo".to_string(),
            category: BlockCategory::Writing,
            description: String::new(),
            cost: "Free".to_string(),
            powered_by: "Local".to_string(),
            inputs: vec![PortDefinition::new("text", "Text")],
            outputs: vec![PortDefinition::new("text", "Text")],
            fields: vec![],
        };
        assert!(catalog.register(def.clone()).is_ok());
        assert_eq!(catalog.register(def), Err(CatalogError::DuplicateBlock("echo".to_string())));
    }

    #[test]
    fn test_estimated_cost() {
        let catalog = BlockCatalog::builtin();
        assert_eq!(catalog.get("media_upload").unwrap().estimated_cost(), 0.0);
        assert_eq!(catalog.get("video_generator").unwrap().estimated_cost(), 0.05);
        assert_eq!(catalog.get("caption_writer").unwrap().estimated_cost(), 0.003);
    }

    #[test]
    fn test_model_field_options() {
        let catalog = BlockCatalog::builtin();
        let field = catalog.get("video_generator").unwrap().field("video_model").unwrap();
        let options = field.options();
        assert_eq!(options.len(), VIDEO_MODELS.len());
        assert_eq!(options[0], "wan-2.1-i2v");
    }

    #[test]
    fn test_model_quality_ratings() {
        assert!(VIDEO_MODELS
            .iter()
            .chain(LLM_MODELS)
            .all(|m| matches!(m.quality, Some(1..=5))));
        assert!(SCRAPER_PROVIDERS.iter().all(|m| m.quality.is_none()));

        let veo = VIDEO_MODELS.iter().find(|m| m.id == "google-veo-2").unwrap();
        assert_eq!(veo.stars(), "*****");
        assert_eq!(SCRAPER_PROVIDERS[0].stars(), "");

        let json = serde_json::to_value(VIDEO_MODELS[0]).unwrap();
        assert_eq!(json["quality"], 3);
        let json = serde_json::to_value(SCRAPER_PROVIDERS[0]).unwrap();
        assert!(json.get("quality").is_none());
    }
}
