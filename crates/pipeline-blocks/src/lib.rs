//! Pipeline Blocks
//!
//! Local handlers for pipeline blocks that can run without a media provider.
//! Each handler executes exactly one block id and plugs into a
//! `pipeline_engine::HandlerRegistry`.
//!
//! # Categories
//!
//! - **Research**: Product, competitor, hashtag, sound and analytics lookups
//! - **Writing**: Hooks, persona rewrites, scripts, captions and A/B variations
//! - **Media**: Publishing user uploads downstream
//!
//! Research and writing blocks call a host-supplied [`TextGenerator`].

pub mod generator;
pub mod media;
pub mod research;
pub mod setup;
pub mod text;
pub mod writing;

pub use generator::{GeneratorError, TextGenerator};
pub use media::MediaUploadHandler;
pub use research::RESEARCH_BLOCKS;
pub use setup::{register_builtin_handlers, register_media_handlers};
pub use text::{ModelPolicy, Prompt, TextBlock, TextBlockHandler, DEFAULT_TEXT_MODEL};
pub use writing::WRITING_BLOCKS;
