//! Operation dispatch contract
//!
//! The engine hands every node (except `download_export`) to a
//! `Dispatcher` as a `DispatchRequest` and gets back a `DispatchEnvelope`.
//! Anticipated failures (missing input, rejected option, provider error)
//! must come back as failure envelopes. `Err` is for transport problems
//! and bugs; the engine records both the same way on the node.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::bundle::{InputBundle, OutputBundle};
use crate::error::Result;
use crate::types::NodeId;

/// Everything a block operation gets to see
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    /// Node being executed (diagnostics only)
    #[serde(skip)]
    pub node_id: NodeId,
    pub block_id: String,
    /// Resolved field values
    pub config: BTreeMap<String, String>,
    /// Outputs of successful upstream producers, by source port name
    #[serde(rename = "upstreamData")]
    pub inputs: InputBundle,
}

impl DispatchRequest {
    pub fn new(block_id: impl Into<String>) -> Self {
        Self {
            node_id: NodeId::new(),
            block_id: block_id.into(),
            config: BTreeMap::new(),
            inputs: InputBundle::new(),
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn with_input(mut self, port: impl Into<String>, bundle: OutputBundle) -> Self {
        self.inputs.insert(port, bundle);
        self
    }

    /// A configured value, treating empty strings as unset
    pub fn config_value(&self, key: &str) -> Option<&str> {
        self.config
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Configured value or a fallback default
    pub fn config_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.config_value(key).unwrap_or(default)
    }

    /// Explicit config wins; otherwise the first upstream text
    pub fn text_or_upstream(&self, key: &str) -> Option<&str> {
        self.config_value(key).or_else(|| self.inputs.first_text())
    }

    /// Explicit config wins; otherwise the first upstream media URL
    pub fn media_or_upstream(&self, key: &str) -> Option<&str> {
        self.config_value(key)
            .or_else(|| self.inputs.first_media_url().map(|(url, _)| url))
    }
}

/// Outcome of one dispatch
///
/// Serializes as `{"success": true, "output": {...}}` or
/// `{"success": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "RawEnvelope", try_from = "RawEnvelope")]
pub enum DispatchEnvelope {
    Success(OutputBundle),
    Failure(String),
}

impl DispatchEnvelope {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl From<OutputBundle> for DispatchEnvelope {
    fn from(bundle: OutputBundle) -> Self {
        Self::Success(bundle)
    }
}

#[derive(Serialize, Deserialize)]
struct RawEnvelope {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output: Option<OutputBundle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<DispatchEnvelope> for RawEnvelope {
    fn from(envelope: DispatchEnvelope) -> Self {
        match envelope {
            DispatchEnvelope::Success(output) => Self {
                success: true,
                output: Some(output),
                error: None,
            },
            DispatchEnvelope::Failure(error) => Self {
                success: false,
                output: None,
                error: Some(error),
            },
        }
    }
}

impl TryFrom<RawEnvelope> for DispatchEnvelope {
    type Error = String;

    fn try_from(raw: RawEnvelope) -> std::result::Result<Self, Self::Error> {
        match (raw.success, raw.output) {
            (true, Some(output)) => Ok(Self::Success(output)),
            (true, None) => Err("successful envelope without output".to_string()),
            (false, _) => Ok(Self::Failure(
                raw.error.unwrap_or_else(|| "Unknown error".to_string()),
            )),
        }
    }
}

/// Executes block operations
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchEnvelope>;
}
