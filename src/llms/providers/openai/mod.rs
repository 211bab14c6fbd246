//! OpenAI-compatible chat completions provider.
//!
//! Talks to `/chat/completions` on the OpenAI API or any server exposing the
//! same wire format. Retries with exponential backoff live here, not in the
//! crew: transport errors, HTTP 429 and 5xx are retried up to `max_retries`
//! times, any other 4xx fails immediately.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::llms::base_llm::{build_messages, BaseLLM, LLMMessage};
use crate::utilities::errors::InvocationError;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: f64 = 120.0;

/// OpenAI chat completions client.
///
/// # Example
///
/// ```ignore
/// let llm = OpenAICompletion::new("gpt-4o-mini", None, None).with_json_mode(true);
/// let answer = llm.call("Score this candidate", None)?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAICompletion {
    /// Model name (e.g. `gpt-4o-mini`).
    pub model: String,
    /// API key. Defaults to `OPENAI_API_KEY`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL override. Defaults to `OPENAI_BASE_URL`, then the public API.
    pub base_url: Option<String>,
    /// Organization header, from `OPENAI_ORGANIZATION` when set.
    pub organization: Option<String>,
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// Maximum tokens in the response.
    pub max_tokens: Option<u32>,
    /// Seed for deterministic sampling where the provider supports it.
    pub seed: Option<i64>,
    /// Request timeout in seconds.
    pub timeout: Option<f64>,
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled after each attempt.
    pub initial_backoff: Duration,
    /// Ask the provider for a JSON object response.
    pub json_mode: bool,
    /// Optional system message sent before every prompt.
    pub system_prompt: Option<String>,
}

impl OpenAICompletion {
    /// Create a new provider.
    ///
    /// # Arguments
    ///
    /// * `model` - Model name.
    /// * `api_key` - Optional API key (defaults to the `OPENAI_API_KEY` env var).
    /// * `base_url` - Optional base URL (defaults to the `OPENAI_BASE_URL` env var).
    pub fn new(model: impl Into<String>, api_key: Option<String>, base_url: Option<String>) -> Self {
        Self {
            model: model.into(),
            api_key: api_key.or_else(|| std::env::var("OPENAI_API_KEY").ok()),
            base_url: base_url.or_else(|| std::env::var("OPENAI_BASE_URL").ok()),
            organization: std::env::var("OPENAI_ORGANIZATION").ok(),
            temperature: None,
            max_tokens: None,
            seed: None,
            timeout: None,
            max_retries: 2,
            initial_backoff: Duration::from_secs(1),
            json_mode: false,
            system_prompt: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Get the API base URL.
    pub fn api_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// Build the JSON request body for the chat completions endpoint.
    pub fn build_request_body(&self, messages: &[LLMMessage]) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });
        if let Some(temperature) = self.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(seed) = self.seed {
            body["seed"] = json!(seed);
        }
        if self.json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }

    /// Extract the assistant text from a chat completions response.
    pub fn parse_completions_response(response: &Value) -> Result<String, InvocationError> {
        let message = response
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .ok_or_else(|| InvocationError::MalformedResponse("no choices in response".to_string()))?;

        let content = message
            .get("content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| InvocationError::MalformedResponse("choice has no text content".to_string()))?;

        if let Some(usage) = response.get("usage") {
            log::debug!(
                "OpenAI token usage: prompt={}, completion={}, total={}",
                usage.get("prompt_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
                usage.get("completion_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
                usage.get("total_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
            );
        }

        Ok(content.to_string())
    }

    fn send_once(
        &self,
        client: &reqwest::blocking::Client,
        endpoint: &str,
        api_key: &str,
        body: &Value,
    ) -> Result<String, Attempt> {
        let mut request = client
            .post(endpoint)
            .header("Content-Type", "application/json")
            .bearer_auth(api_key);
        if let Some(ref org) = self.organization {
            request = request.header("OpenAI-Organization", org);
        }

        let response = request
            .json(body)
            .send()
            .map_err(|e| Attempt::Retry(InvocationError::from(e)))?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|e| Attempt::Retry(InvocationError::from(e)))?;

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(Attempt::Retry(InvocationError::Status {
                status: status.as_u16(),
                body: truncate(&text, 500),
            }));
        }
        if !status.is_success() {
            return Err(Attempt::Fatal(InvocationError::Status {
                status: status.as_u16(),
                body: truncate(&text, 500),
            }));
        }

        let json: Value = serde_json::from_str(&text).map_err(|e| {
            Attempt::Fatal(InvocationError::MalformedResponse(format!(
                "{} - body: {}",
                e,
                truncate(&text, 500)
            )))
        })?;
        Self::parse_completions_response(&json).map_err(Attempt::Fatal)
    }
}

/// Outcome of a single failed request.
enum Attempt {
    Retry(InvocationError),
    Fatal(InvocationError),
}

impl BaseLLM for OpenAICompletion {
    fn model(&self) -> &str {
        &self.model
    }

    fn provider(&self) -> &str {
        "openai"
    }

    fn call(&self, instructions: &str, context: Option<&str>) -> Result<String, InvocationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| InvocationError::MissingApiKey {
                model: self.model.clone(),
            })?;

        let messages = build_messages(self.system_prompt.as_deref(), instructions, context);
        let body = self.build_request_body(&messages);
        let endpoint = format!("{}/chat/completions", self.api_base_url());

        log::debug!(
            "OpenAICompletion.call: model={}, messages={}, json_mode={}",
            self.model,
            messages.len(),
            self.json_mode
        );

        let seconds = self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let timeout = Duration::try_from_secs_f64(seconds)
            .map_err(|e| InvocationError::InvalidSetting(format!("timeout {seconds}: {e}")))?;
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;

        let mut delay = self.initial_backoff;
        let mut attempt = 0;
        loop {
            match self.send_once(&client, &endpoint, api_key, &body) {
                Ok(text) => return Ok(text),
                Err(Attempt::Fatal(err)) => return Err(err),
                Err(Attempt::Retry(err)) if attempt >= self.max_retries => return Err(err),
                Err(Attempt::Retry(err)) => {
                    attempt += 1;
                    log::warn!(
                        "OpenAI request failed ({}), retry {}/{} after {:?}",
                        err,
                        attempt,
                        self.max_retries,
                        delay
                    );
                    std::thread::sleep(delay);
                    delay = delay.saturating_mul(2);
                }
            }
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAICompletion {
        OpenAICompletion::new("gpt-4o-mini", Some("sk-test".to_string()), Some("http://localhost:1/v1/".to_string()))
    }

    #[test]
    fn test_api_base_url_trims_slash() {
        assert_eq!(provider().api_base_url(), "http://localhost:1/v1");
    }

    #[test]
    fn test_build_request_body() {
        let llm = provider().with_temperature(0.2).with_json_mode(true);
        let body = llm.build_request_body(&[LLMMessage::user("hi")]);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["temperature"], 0.2);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert!(body.get("seed").is_none());
    }

    #[test]
    fn test_parse_completions_response() {
        let response = json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"score\": 80}"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });
        assert_eq!(
            OpenAICompletion::parse_completions_response(&response).unwrap(),
            "{\"score\": 80}"
        );
    }

    #[test]
    fn test_parse_response_without_choices() {
        let err = OpenAICompletion::parse_completions_response(&json!({"choices": []})).unwrap_err();
        assert!(matches!(err, InvocationError::MalformedResponse(_)));
    }

    #[test]
    fn test_missing_api_key_fails_without_request() {
        let mut llm = provider();
        llm.api_key = None;
        assert!(matches!(
            llm.call("hi", None),
            Err(InvocationError::MissingApiKey { .. })
        ));
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        for seconds in [-1.0, f64::NAN] {
            let llm = provider().with_timeout(seconds);
            assert!(matches!(
                llm.call("hi", None),
                Err(InvocationError::InvalidSetting(_))
            ));
        }
    }

    #[test]
    fn test_unreachable_host_is_transport_error() {
        let llm = provider()
            .with_max_retries(1)
            .with_timeout(2.0);
        let llm = OpenAICompletion {
            initial_backoff: Duration::from_millis(1),
            ..llm
        };
        assert!(matches!(llm.call("hi", None), Err(InvocationError::Transport(_))));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
    }
}
