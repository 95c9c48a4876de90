//! Remote generative client (OpenAI-compatible chat completions).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Generator, GeneratorError};
use crate::config::GenerationConfig;
use crate::embedder::http::API_TOKEN_ENV;
use crate::retry::with_retries;

const BASE_BACKOFF: Duration = Duration::from_millis(500);

const SYSTEM_PROMPT: &str = "You are an intelligent food analyst. You estimate the nutrition of \
Indian dishes from reference table rows provided as context. Follow the instruction exactly and \
reply with the requested JSON object only.";

pub struct HttpGenerator {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    max_retries: usize,
    api_token: String,
}

impl HttpGenerator {
    /// Build a client from config, reading the API token from the
    /// environment (same variable as the embedding client).
    pub fn new(config: &GenerationConfig) -> Result<Self, GeneratorError> {
        let api_token = std::env::var(API_TOKEN_ENV)
            .map_err(|_| GeneratorError::MissingCredentials(API_TOKEN_ENV.to_string()))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("katori/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GeneratorError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            api_token,
        })
    }

    fn request(&self, user_message: &str) -> Result<String, GeneratorError> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: user_message,
                },
            ],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_token.trim())
            .json(&body)
            .send()
            .map_err(|e| GeneratorError::RequestFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(GeneratorError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = resp
            .json()
            .map_err(|e| GeneratorError::MalformedResponse(e.to_string()))?;

        let reply = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        if reply.is_empty() {
            return Err(GeneratorError::MalformedResponse(
                "no choices in chat response".to_string(),
            ));
        }

        Ok(reply)
    }
}

impl Generator for HttpGenerator {
    fn generate(
        &self,
        instruction: &str,
        context_segments: &[String],
    ) -> Result<String, GeneratorError> {
        let user_message = if context_segments.is_empty() {
            instruction.to_string()
        } else {
            format!(
                "{instruction}\n\nReference data:\n{}",
                context_segments.join("\n")
            )
        };

        debug!(
            "Generating with {} ({} context segments)",
            self.model,
            context_segments.len()
        );

        with_retries(
            self.max_retries,
            BASE_BACKOFF,
            || self.request(&user_message),
            GeneratorError::is_retryable,
        )
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}
