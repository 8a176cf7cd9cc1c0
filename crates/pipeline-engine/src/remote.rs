//! HTTP dispatcher
//!
//! Forwards every dispatch to a remote execute endpoint as
//! `{blockId, config, upstreamData}` and reads back the envelope. The
//! endpoint reports anticipated failures as `{success: false, error}`,
//! usually with a 4xx/5xx status, so the body is parsed regardless of
//! the status code.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::bundle::{OutputBundle, OutputKind};
use crate::dispatch::{DispatchEnvelope, DispatchRequest, Dispatcher};
use crate::error::{PipelineError, Result};

/// Dispatcher that POSTs requests to an HTTP endpoint
pub struct RemoteDispatcher {
    http_client: reqwest::Client,
    endpoint: String,
}

impl RemoteDispatcher {
    /// Create a dispatcher for the given endpoint URL
    ///
    /// The engine never times out a dispatch on its own; pass a timeout to
    /// bound each request.
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http_client: builder.build()?,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Dispatcher for RemoteDispatcher {
    async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchEnvelope> {
        log::debug!(
            "POST {} for node '{}' ({})",
            self.endpoint,
            request.node_id,
            request.block_id
        );
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        parse_envelope(&body).ok_or_else(|| {
            PipelineError::dispatch(format!("Execute endpoint returned {}: {}", status, body))
        })
    }
}

/// Read an envelope from a response body
///
/// Output values are coerced to strings: nulls are dropped, numbers and
/// booleans are printed and nested values are kept as JSON text.
pub fn parse_envelope(body: &str) -> Option<DispatchEnvelope> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    let success = json.get("success")?.as_bool()?;

    if !success {
        let message = json
            .get("error")
            .and_then(|e| e.as_str())
            .unwrap_or("Unknown error");
        return Some(DispatchEnvelope::failure(message));
    }

    let output = json.get("output")?.as_object()?;
    let kind: OutputKind = serde_json::from_value(output.get("type")?.clone()).ok()?;
    let values: BTreeMap<String, String> = output
        .iter()
        .filter(|(key, _)| key.as_str() != "type")
        .filter_map(|(key, value)| {
            let text = match value {
                serde_json::Value::Null => return None,
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((key.clone(), text))
        })
        .collect();

    Some(DispatchEnvelope::Success(OutputBundle { kind, values }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success() {
        let envelope = parse_envelope(
            r#"{
                "success": true,
                "output": {
                    "type": "download",
                    "download_url": "/a.mp4",
                    "image_url": null,
                    "count": 3
                }
            }"#,
        )
        .unwrap();
        let DispatchEnvelope::Success(bundle) = envelope else {
            panic!("expected success");
        };
        assert_eq!(bundle.kind, OutputKind::Download);
        assert_eq!(bundle.get("download_url"), Some("/a.mp4"));
        assert_eq!(bundle.get("count"), Some("3"));
        assert!(bundle.get("image_url").is_none());
    }

    #[test]
    fn test_parse_failure_and_garbage() {
        assert_eq!(
            parse_envelope(r#"{"success": false, "error": "Unknown model: sora"}"#),
            Some(DispatchEnvelope::failure("Unknown model: sora"))
        );
        assert!(parse_envelope("<html>502 Bad Gateway</html>").is_none());
        assert!(parse_envelope(r#"{"success": true, "output": {"script": "x"}}"#).is_none());
    }

    #[test]
    fn test_new_with_timeout() {
        let dispatcher = RemoteDispatcher::new(
            "http://localhost:3000/api/pipeline/execute",
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(dispatcher.endpoint(), "http://localhost:3000/api/pipeline/execute");
    }
}
