use std::io::{BufRead, BufReader, Read};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_MODEL: &str = "llama3.1:8b";
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

const FAILURE_PREFIX: &str = "AI model failed to respond";
const REASONING_END_TAG: &str = "</think>";

#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    pub text: String,
    pub latency_seconds: f64,
    /// Set when `text` is a diagnostic placeholder rather than model output.
    pub failed: bool,
}

impl ModelReply {
    pub fn failure(error: &anyhow::Error, latency_seconds: f64) -> Self {
        Self {
            text: format!("{FAILURE_PREFIX}: {error:#}"),
            latency_seconds,
            failed: true,
        }
    }
}

/// A language model that answers advising prompts. Failures are folded into
/// the reply so a single bad call never aborts an evaluation run.
pub trait AdvisorModel {
    fn name(&self) -> &str;

    fn ask(&self, prompt: &str) -> ModelReply;
}

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub stream: bool,
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct OllamaClient {
    client: Client,
    config: OllamaConfig,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build HTTP client for model endpoint")?;
        Ok(Self { client, config })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.config.base_url.trim_end_matches('/'))
    }

    fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: self.config.stream,
        };

        let response = self
            .client
            .post(self.generate_url())
            .json(&request)
            .send()
            .with_context(|| format!("request to {} failed", self.generate_url()))?
            .error_for_status()
            .context("model endpoint returned an error status")?;

        let raw = if self.config.stream {
            collect_stream(response)?
        } else {
            let chunk: GenerateChunk = response
                .json()
                .context("failed to decode model response body")?;
            chunk_text(chunk)?
        };

        Ok(clean_reply(&raw))
    }
}

impl AdvisorModel for OllamaClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    fn ask(&self, prompt: &str) -> ModelReply {
        let started = Instant::now();
        let result = self.generate(prompt);
        let latency_seconds = started.elapsed().as_secs_f64();

        match result {
            Ok(text) => {
                debug!(model = %self.config.model, latency_seconds, chars = text.len(), "model replied");
                ModelReply {
                    text,
                    latency_seconds,
                    failed: false,
                }
            }
            Err(err) => {
                warn!(model = %self.config.model, latency_seconds, error = %format!("{err:#}"), "model call failed");
                ModelReply::failure(&err, latency_seconds)
            }
        }
    }
}

/// Concatenates the `response` field of every NDJSON line of a streamed reply.
pub fn collect_stream<R: Read>(reader: R) -> Result<String> {
    let mut text = String::new();
    for line in BufReader::new(reader).lines() {
        let line = line.context("failed to read streamed model response")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let chunk: GenerateChunk = serde_json::from_str(line)
            .with_context(|| format!("failed to decode streamed chunk: {line}"))?;
        text.push_str(&chunk_text(chunk)?);
    }
    Ok(text)
}

fn chunk_text(chunk: GenerateChunk) -> Result<String> {
    if let Some(error) = chunk.error {
        bail!("model endpoint reported: {error}");
    }
    Ok(chunk.response.unwrap_or_default())
}

/// Drops any reasoning preamble closed by `</think>` and trims the rest.
pub fn clean_reply(raw: &str) -> String {
    match raw.rsplit_once(REASONING_END_TAG) {
        Some((_, answer)) => answer.trim().to_string(),
        None => raw.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_stream_concatenates_response_fields() {
        let body = concat!(
            "{\"model\":\"m\",\"response\":\"CPS 2232\",\"done\":false}\n",
            "\n",
            "{\"model\":\"m\",\"response\":\": Data Structure\",\"done\":false}\n",
            "{\"model\":\"m\",\"done\":true}\n",
        );

        let text = collect_stream(body.as_bytes()).expect("stream should decode");
        assert_eq!(text, "CPS 2232: Data Structure");
    }

    #[test]
    fn collect_stream_surfaces_endpoint_errors() {
        let body = "{\"error\":\"model not found\"}\n";
        let error = collect_stream(body.as_bytes()).expect_err("error chunk should fail");
        assert!(error.to_string().contains("model not found"), "unexpected error: {error}");
    }

    #[test]
    fn clean_reply_strips_reasoning_preamble() {
        assert_eq!(
            clean_reply("<think>plan first</think>\n  CPS 2232: Data Structure \n"),
            "CPS 2232: Data Structure"
        );
        assert_eq!(clean_reply("  plain answer\n"), "plain answer");
    }

    #[test]
    fn failure_reply_carries_placeholder_and_latency() {
        let error = anyhow::anyhow!("connection refused");
        let reply = ModelReply::failure(&error, 1.5);

        assert!(reply.failed);
        assert_eq!(reply.latency_seconds, 1.5);
        assert_eq!(reply.text, "AI model failed to respond: connection refused");
    }

    #[test]
    fn unreachable_endpoint_yields_failure_reply() {
        let client = OllamaClient::new(OllamaConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            model: DEFAULT_MODEL.to_string(),
            stream: false,
            timeout: Duration::from_secs(2),
        })
        .expect("client should build");

        let reply = client.ask("hello");
        assert!(reply.failed);
        assert!(reply.text.starts_with(FAILURE_PREFIX));
        assert!(reply.latency_seconds >= 0.0);
    }
}
