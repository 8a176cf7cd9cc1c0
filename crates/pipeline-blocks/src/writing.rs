//! Writing blocks
//!
//! Hooks, persona rewrites, ad scripts, captions and A/B variations. Each
//! writing block lets the user pick the model (`llm_model`) and falls back
//! to upstream text when its own text field is empty.

use pipeline_engine::DispatchRequest;

use crate::text::{ModelPolicy, Prompt, TextBlock};

/// Hook Generator
///
/// # Config
/// - `style` (default `Curiosity`), `count` (default 5)
/// - `context`, else upstream text
///
/// # Outputs
/// - `hooks` - numbered hooks
pub const HOOK_GENERATOR: TextBlock = TextBlock {
    block_id: "hook_generator",
    outputs: &["hooks"],
    model: ModelPolicy::Configurable,
    prompt: hook_generator_prompt,
};

/// Persona Filter: rewrites upstream text in a creator's voice
pub const PERSONA_FILTER: TextBlock = TextBlock {
    block_id: "persona_filter",
    outputs: &["text"],
    model: ModelPolicy::Configurable,
    prompt: persona_filter_prompt,
};

/// Script Writer
///
/// The script is published twice, as `script` and as `prompt`, so it can
/// feed a video generator directly.
pub const SCRIPT_WRITER: TextBlock = TextBlock {
    block_id: "script_writer",
    outputs: &["script", "prompt"],
    model: ModelPolicy::Configurable,
    prompt: script_writer_prompt,
};

pub const CAPTION_WRITER: TextBlock = TextBlock {
    block_id: "caption_writer",
    outputs: &["caption"],
    model: ModelPolicy::Configurable,
    prompt: caption_writer_prompt,
};

pub const AB_SPLITTER: TextBlock = TextBlock {
    block_id: "ab_splitter",
    outputs: &["variations"],
    model: ModelPolicy::Configurable,
    prompt: ab_splitter_prompt,
};

/// All writing blocks
pub const WRITING_BLOCKS: [TextBlock; 5] = [
    HOOK_GENERATOR,
    PERSONA_FILTER,
    SCRIPT_WRITER,
    CAPTION_WRITER,
    AB_SPLITTER,
];

fn hook_generator_prompt(request: &DispatchRequest) -> Prompt {
    Prompt::new(
        format!(
            "You write viral TikTok hooks. Write {} hooks in the \"{}\" style. Each hook is one or \
             two sentences that stop the scroll. Number them.",
            request.config_or("count", "5"),
            request.config_or("style", "Curiosity")
        ),
        format!(
            "Context: {}",
            request.text_or_upstream("context").unwrap_or("A trending product")
        ),
    )
}

fn persona_filter_prompt(request: &DispatchRequest) -> Prompt {
    Prompt::new(
        format!(
            "Rewrite the following content in the voice of a \"{}\". Keep the core message and \
             change the wording, slang and energy to match the persona.",
            request.config_or("persona", "Gen-Z Creator")
        ),
        request
            .text_or_upstream("text_in")
            .unwrap_or("Please provide text to rewrite."),
    )
}

fn script_writer_prompt(request: &DispatchRequest) -> Prompt {
    let style = request.config_or("script_style", "Direct Sale");
    Prompt::new(
        format!(
            "You write TikTok ad scripts. Write a {} style script formatted as HOOK (first 3 \
             seconds), BODY and CTA. Keep it punchy and made for short-form video.",
            style
        ),
        format!(
            "Product: {}\nPrice: {}\nSelling points: {}\nStyle: {}",
            request.config_or("product_name", "Product"),
            request.config_or("price", "N/A"),
            request
                .text_or_upstream("selling_points")
                .unwrap_or("Great product"),
            style
        ),
    )
}

fn caption_writer_prompt(request: &DispatchRequest) -> Prompt {
    let hashtags = match request.config_or("include_hashtags", "5") {
        "None" => "No hashtags.".to_string(),
        count => format!("Include {} relevant hashtags.", count),
    };
    Prompt::new(
        format!(
            "Write a viral TikTok caption in a \"{}\" tone. {}",
            request.config_or("tone", "Casual"),
            hashtags
        ),
        format!(
            "Write a caption based on: {}",
            request
                .inputs
                .first_text()
                .unwrap_or("A trending TikTok product video")
        ),
    )
}

fn ab_splitter_prompt(request: &DispatchRequest) -> Prompt {
    Prompt::new(
        format!(
            "Write {} variations of the following content. Vary the {}. Label each variation \
             with a letter (A, B, C...).",
            request.config_or("variations", "2"),
            request.config_or("vary_what", "Hook Only")
        ),
        request
            .text_or_upstream("script_in")
            .unwrap_or("Please provide a script to split."),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::testing::{run_block, FakeGenerator};
    use crate::text::{DEFAULT_TEXT_MODEL, MODEL_FIELD};
    use pipeline_engine::{DispatchEnvelope, OutputBundle};

    #[tokio::test]
    async fn test_hook_generator_uses_upstream_context() {
        let generator = FakeGenerator::replying("1. You won't believe this serum");
        let request = DispatchRequest::new("hook_generator")
            .with_config("style", "FOMO")
            .with_input("text_out", OutputBundle::text("text", "1. Glow Serum $19"));
        let envelope = run_block(HOOK_GENERATOR, generator.clone(), request).await;

        assert_eq!(
            envelope,
            DispatchEnvelope::Success(OutputBundle::text(
                "hooks",
                "1. You won't believe this serum"
            ))
        );
        let call = generator.last_call();
        assert_eq!(call.model, DEFAULT_TEXT_MODEL);
        assert!(call.system.contains("5 hooks in the \"FOMO\" style"));
        assert_eq!(call.user, "Context: 1. Glow Serum $19");
    }

    #[tokio::test]
    async fn test_hook_generator_config_beats_upstream() {
        let generator = FakeGenerator::replying("hooks");
        let request = DispatchRequest::new("hook_generator")
            .with_config("context", "Vitamin C serum")
            .with_input("text_out", OutputBundle::text("text", "ignored"));
        run_block(HOOK_GENERATOR, generator.clone(), request).await;
        assert_eq!(generator.last_call().user, "Context: Vitamin C serum");
    }

    #[tokio::test]
    async fn test_persona_filter_fallback_text() {
        let generator = FakeGenerator::replying("no cap");
        let request =
            DispatchRequest::new("persona_filter").with_config(MODEL_FIELD, "llama-3.1-70b");
        let envelope = run_block(PERSONA_FILTER, generator.clone(), request).await;

        assert_eq!(envelope, DispatchEnvelope::Success(OutputBundle::text("text", "no cap")));
        let call = generator.last_call();
        assert_eq!(call.model, "llama-3.1-70b");
        assert!(call.system.contains("\"Gen-Z Creator\""));
        assert_eq!(call.user, "Please provide text to rewrite.");
    }

    #[tokio::test]
    async fn test_script_writer_publishes_script_and_prompt() {
        let generator = FakeGenerator::replying("HOOK: Glow up\nBODY: ...\nCTA: Shop now");
        let request = DispatchRequest::new("script_writer")
            .with_config("product_name", "Glow Serum")
            .with_config("price", "$19")
            .with_input("hooks", OutputBundle::text("hooks", "brightens in 7 days"));
        let envelope = run_block(SCRIPT_WRITER, generator.clone(), request).await;

        let DispatchEnvelope::Success(bundle) = envelope else {
            panic!("expected success");
        };
        assert_eq!(bundle.get("script"), bundle.get("prompt"));
        assert!(bundle.get("script").unwrap().starts_with("HOOK"));

        let call = generator.last_call();
        assert!(call.system.contains("Direct Sale"));
        assert!(call.user.contains("Product: Glow Serum"));
        assert!(call.user.contains("Price: $19"));
        assert!(call.user.contains("Selling points: brightens in 7 days"));
    }

    #[tokio::test]
    async fn test_caption_writer_hashtag_option() {
        let generator = FakeGenerator::replying("caption");
        run_block(
            CAPTION_WRITER,
            generator.clone(),
            DispatchRequest::new("caption_writer").with_config("include_hashtags", "None"),
        )
        .await;
        let call = generator.last_call();
        assert!(call.system.contains("No hashtags."));
        assert_eq!(call.user, "Write a caption based on: A trending TikTok product video");

        run_block(
            CAPTION_WRITER,
            generator.clone(),
            DispatchRequest::new("caption_writer").with_config("tone", "Funny"),
        )
        .await;
        let call = generator.last_call();
        assert!(call.system.contains("\"Funny\" tone"));
        assert!(call.system.contains("Include 5 relevant hashtags."));
    }

    #[tokio::test]
    async fn test_ab_splitter_reads_upstream_script() {
        let generator = FakeGenerator::replying("A: ...\nB: ...");
        let request = DispatchRequest::new("ab_splitter")
            .with_config("variations", "3")
            .with_input("script", OutputBundle::text("script", "HOOK: Glow up"));
        let envelope = run_block(AB_SPLITTER, generator.clone(), request).await;

        assert!(envelope.is_success());
        let call = generator.last_call();
        assert!(call.system.contains("Write 3 variations"));
        assert!(call.system.contains("Vary the Hook Only"));
        assert_eq!(call.user, "HOOK: Glow up");
    }
}
