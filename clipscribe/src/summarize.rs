//! Client for a remote abstractive-summarization endpoint (Hugging Face
//! Inference API, `facebook/bart-large-cnn` by default).

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SummarizerConfig;
use crate::error::{Error, Result};

/// Length bounds and sampling mode for one summarization call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummarizeOptions {
    /// Maximum summary length, in model tokens.
    pub max_length: u32,
    /// Minimum summary length, in model tokens.
    pub min_length: u32,
    /// Disable sampling so the same input gives the same summary.
    pub deterministic: bool,
}

impl Default for SummarizeOptions {
    fn default() -> Self {
        Self {
            max_length: 150,
            min_length: 30,
            deterministic: true,
        }
    }
}

impl SummarizeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_length(mut self, n: u32) -> Self {
        self.max_length = n;
        self
    }

    pub fn min_length(mut self, n: u32) -> Self {
        self.min_length = n;
        self
    }

    pub fn deterministic(mut self, enabled: bool) -> Self {
        self.deterministic = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_length == 0 || self.max_length == 0 {
            return Err(Error::InvalidInput(
                "summary lengths must be greater than zero".into(),
            ));
        }
        if self.min_length > self.max_length {
            return Err(Error::InvalidInput(format!(
                "min_length ({}) exceeds max_length ({})",
                self.min_length, self.max_length
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SummarizationRequest<'a> {
    inputs: &'a str,
    parameters: Parameters,
}

#[derive(Debug, Serialize)]
struct Parameters {
    max_length: u32,
    min_length: u32,
    do_sample: bool,
}

#[derive(Debug, Deserialize)]
struct SummaryItem {
    summary_text: String,
}

/// Sends text to the summarization endpoint. One attempt per call, no retries.
#[derive(Debug, Clone)]
pub struct SummarizationClient {
    http: Client,
    config: SummarizerConfig,
}

impl SummarizationClient {
    pub fn new(config: SummarizerConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::InvalidOption(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Summarize `text`, returning the trimmed summary.
    ///
    /// Without a token this fails with [`Error::SummarizationUnconfigured`]
    /// before touching the network.
    pub async fn summarize(&self, text: &str, options: &SummarizeOptions) -> Result<String> {
        let Some(token) = self.config.token.as_deref() else {
            return Err(Error::SummarizationUnconfigured);
        };
        options.validate()?;

        let request = SummarizationRequest {
            inputs: text,
            parameters: Parameters {
                max_length: options.max_length,
                min_length: options.min_length,
                do_sample: !options.deterministic,
            },
        };

        info!(
            endpoint = %self.config.endpoint,
            chars = text.len(),
            max_length = options.max_length,
            "requesting summary"
        );

        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "summarization request failed");
                Error::SummarizationFailed(describe_transport_error(&e, &self.config))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            Error::SummarizationFailed(format!("failed to read response body: {e}"))
        })?;

        if !status.is_success() {
            let detail = error_detail(status, &body);
            warn!(%status, detail = %detail, "summarization API returned an error");
            return Err(Error::SummarizationFailed(detail));
        }

        let summary = parse_summary(&body)?;
        debug!(chars = summary.len(), "summary received");
        Ok(summary)
    }
}

fn describe_transport_error(e: &reqwest::Error, config: &SummarizerConfig) -> String {
    if e.is_timeout() {
        format!(
            "summarization API timed out after {}s",
            config.timeout.as_secs_f32()
        )
    } else if e.is_connect() {
        format!("could not connect to summarization API: {e}")
    } else {
        format!("summarization request failed: {e}")
    }
}

/// The most specific message available for a non-2xx response.
///
/// Hugging Face reports failures as `{"error": "..."}` (occasionally a list
/// of strings); that message wins over the bare status line.
fn error_detail(status: StatusCode, body: &str) -> String {
    if let Some(message) = embedded_error(body) {
        return message;
    }
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {body}")
    }
}

fn embedded_error(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("error")? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Array(items) => {
            let messages: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}

/// Pull the summary out of a `[{"summary_text": ...}]` body.
fn parse_summary(body: &str) -> Result<String> {
    let items: Vec<SummaryItem> = serde_json::from_str(body).map_err(|e| {
        match embedded_error(body) {
            Some(message) => Error::SummarizationFailed(message),
            None => Error::SummarizationFailed(format!("unexpected response shape: {e}")),
        }
    })?;

    items
        .into_iter()
        .next()
        .map(|item| item.summary_text.trim().to_string())
        .ok_or_else(|| Error::SummarizationFailed("API returned an empty result list".into()))
}
