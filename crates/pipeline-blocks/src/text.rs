//! Prompt-driven block handler
//!
//! Every text block follows the same shape: build a system and a user
//! prompt from the request, ask the generator, and publish the answer
//! under one or more output keys. A `TextBlock` captures the per-block
//! part; `TextBlockHandler` does the rest.

use std::sync::Arc;

use async_trait::async_trait;
use pipeline_engine::{
    BlockHandler, DispatchEnvelope, DispatchRequest, OutputBundle, OutputKind, Result,
};

use crate::generator::{GeneratorError, TextGenerator};

/// Model used when a block has no model choice or none is configured
pub const DEFAULT_TEXT_MODEL: &str = "gpt-4o-mini";

/// Config key of the model choice on writing blocks
pub const MODEL_FIELD: &str = "llm_model";

/// Prompts for one generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// How a block picks its model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelPolicy {
    /// Always this model
    Fixed(&'static str),
    /// The node's `llm_model` choice, else the default model
    Configurable,
}

impl ModelPolicy {
    pub fn resolve<'a>(&self, request: &'a DispatchRequest) -> &'a str {
        match self {
            Self::Fixed(model) => *model,
            Self::Configurable => request.config_or(MODEL_FIELD, DEFAULT_TEXT_MODEL),
        }
    }
}

/// Static description of a text block
#[derive(Clone, Copy)]
pub struct TextBlock {
    pub block_id: &'static str,
    /// Output keys that all receive the generated text
    pub outputs: &'static [&'static str],
    pub model: ModelPolicy,
    pub prompt: fn(&DispatchRequest) -> Prompt,
}

/// Handler running a `TextBlock` against a generator
pub struct TextBlockHandler {
    block: TextBlock,
    generator: Arc<dyn TextGenerator>,
}

impl TextBlockHandler {
    pub fn new(block: TextBlock, generator: Arc<dyn TextGenerator>) -> Self {
        Self { block, generator }
    }

    pub fn block_id(&self) -> &'static str {
        self.block.block_id
    }
}

#[async_trait]
impl BlockHandler for TextBlockHandler {
    async fn handle(&self, request: DispatchRequest) -> Result<DispatchEnvelope> {
        let model = self.block.model.resolve(&request);
        let prompt = (self.block.prompt)(&request);
        log::debug!(
            "Generating text for node '{}' ({}) with {}",
            request.node_id,
            self.block.block_id,
            model
        );

        let generated = match self
            .generator
            .generate(model, &prompt.system, &prompt.user)
            .await
        {
            Ok(text) if text.trim().is_empty() => Err(GeneratorError::EmptyResponse),
            other => other,
        };

        match generated {
            Ok(text) => {
                let bundle = self
                    .block
                    .outputs
                    .iter()
                    .fold(OutputBundle::new(OutputKind::Text), |bundle, key| {
                        bundle.with(*key, text.as_str())
                    });
                Ok(DispatchEnvelope::Success(bundle))
            }
            Err(e) => {
                log::warn!(
                    "Text generation for node '{}' ({}) failed: {}",
                    request.node_id,
                    self.block.block_id,
                    e
                );
                Ok(DispatchEnvelope::failure(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;

    /// One recorded `generate` call
    #[derive(Debug, Clone)]
    pub struct Call {
        pub model: String,
        pub system: String,
        pub user: String,
    }

    /// Generator that answers with a canned reply and records prompts
    pub struct FakeGenerator {
        reply: std::result::Result<String, String>,
        pub calls: Mutex<Vec<Call>>,
    }

    impl FakeGenerator {
        pub fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(message.to_string()),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub fn last_call(&self) -> Call {
            self.calls.lock().last().cloned().expect("no generate call recorded")
        }
    }

    #[async_trait]
    impl TextGenerator for FakeGenerator {
        async fn generate(
            &self,
            model: &str,
            system_prompt: &str,
            user_prompt: &str,
        ) -> std::result::Result<String, GeneratorError> {
            self.calls.lock().push(Call {
                model: model.to_string(),
                system: system_prompt.to_string(),
                user: user_prompt.to_string(),
            });
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(message) => Err(GeneratorError::MissingCredentials(message.clone())),
            }
        }
    }

    /// Run one block through a fresh handler
    pub async fn run_block(
        block: TextBlock,
        generator: Arc<FakeGenerator>,
        request: DispatchRequest,
    ) -> DispatchEnvelope {
        TextBlockHandler::new(block, generator)
            .handle(request)
            .await
            .unwrap()
    }
}
