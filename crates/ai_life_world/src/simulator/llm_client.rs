//! Language-model bridge: client configuration, an OpenAI-compatible chat completion
//! client, and the decision client that turns agent snapshots into actions.

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;

use super::decision::{parse_decision, DecisionError, DecisionRequest, DecisionResponse, DecisionTrace};
use super::prompt::{conversation_prompt, decision_prompt};
use crate::models::Personality;

pub const ENV_LLM_MODEL: &str = "AI_LIFE_LLM_MODEL";
pub const ENV_LLM_BASE_URL: &str = "AI_LIFE_LLM_BASE_URL";
pub const ENV_LLM_API_KEY: &str = "AI_LIFE_LLM_API_KEY";
pub const ENV_LLM_TIMEOUT_MS: &str = "AI_LIFE_LLM_TIMEOUT_MS";
pub const ENV_LLM_SYSTEM_PROMPT: &str = "AI_LIFE_LLM_SYSTEM_PROMPT";
pub const ENV_LLM_MAX_TOKENS: &str = "AI_LIFE_LLM_MAX_TOKENS";
pub const ENV_LLM_TEMPERATURE: &str = "AI_LIFE_LLM_TEMPERATURE";

pub const DEFAULT_CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_LLM_MODEL: &str = "deepseek-chat";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.deepseek.com";
pub const DEFAULT_LLM_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_LLM_MAX_TOKENS: u32 = 100;
pub const DEFAULT_LLM_TEMPERATURE: f32 = 0.8;
pub const DEFAULT_LLM_SYSTEM_PROMPT: &str =
    "You are a self-conscious game character controlled by JSON commands. Always speak in Chinese.";

pub const CONVERSATION_MAX_TOKENS: u32 = 50;
pub const CONVERSATION_MAX_CHARS: usize = 40;
pub const CONVERSATION_FALLBACK_REPLY: &str = "...";

#[derive(Debug, Clone, PartialEq)]
pub struct LlmClientConfig {
    pub model: String,
    pub base_url: String,
    /// Access token; decisions fall back to `Stop` without one.
    pub api_key: Option<String>,
    pub timeout_ms: u64,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmClientConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_LLM_MODEL.to_string(),
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            api_key: None,
            timeout_ms: DEFAULT_LLM_TIMEOUT_MS,
            system_prompt: DEFAULT_LLM_SYSTEM_PROMPT.to_string(),
            max_tokens: DEFAULT_LLM_MAX_TOKENS,
            temperature: DEFAULT_LLM_TEMPERATURE,
        }
    }
}

impl LlmClientConfig {
    pub fn from_default_sources() -> Result<Self, LlmConfigError> {
        let config_path = Path::new(DEFAULT_CONFIG_FILE_NAME);
        if config_path.exists() {
            return Self::from_config_file(config_path);
        }
        Self::from_env()
    }

    pub fn from_config_file(path: &Path) -> Result<Self, LlmConfigError> {
        let table = read_config_table(path)?;
        Self::from_env_with(|key| {
            table
                .get(key)
                .and_then(toml_value_to_string)
                .or_else(|| std::env::var(key).ok())
        })
    }

    pub fn from_env() -> Result<Self, LlmConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_env_with<F>(mut getter: F) -> Result<Self, LlmConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let model = optional_value(&mut getter, ENV_LLM_MODEL).unwrap_or(defaults.model);
        let base_url = optional_value(&mut getter, ENV_LLM_BASE_URL)
            .unwrap_or(defaults.base_url)
            .trim_end_matches('/')
            .to_string();
        let api_key = optional_value(&mut getter, ENV_LLM_API_KEY);
        let timeout_ms = parse_number(&mut getter, ENV_LLM_TIMEOUT_MS, defaults.timeout_ms)?;
        let system_prompt =
            optional_value(&mut getter, ENV_LLM_SYSTEM_PROMPT).unwrap_or(defaults.system_prompt);
        let max_tokens = parse_number(&mut getter, ENV_LLM_MAX_TOKENS, defaults.max_tokens)?;
        let temperature = parse_number(&mut getter, ENV_LLM_TEMPERATURE, defaults.temperature)?;

        Ok(Self {
            model,
            base_url,
            api_key,
            timeout_ms,
            system_prompt,
            max_tokens,
            temperature,
        })
    }
}

pub(crate) fn read_config_table(path: &Path) -> Result<toml::Table, LlmConfigError> {
    let content = fs::read_to_string(path).map_err(|err| LlmConfigError::ReadConfigFile {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    let value: toml::Value =
        toml::from_str(&content).map_err(|err| LlmConfigError::ParseConfigFile {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
    match value {
        toml::Value::Table(table) => Ok(table),
        _ => Err(LlmConfigError::ParseConfigFile {
            path: path.display().to_string(),
            message: "root is not a TOML table".to_string(),
        }),
    }
}

fn toml_value_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(value) => Some(value.clone()),
        toml::Value::Integer(value) => Some(value.to_string()),
        toml::Value::Float(value) => Some(value.to_string()),
        toml::Value::Boolean(value) => Some(value.to_string()),
        _ => None,
    }
}

fn optional_value<F>(getter: &mut F, key: &str) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    getter(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_number<F, T>(getter: &mut F, key: &'static str, default: T) -> Result<T, LlmConfigError>
where
    F: FnMut(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match optional_value(getter, key) {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| LlmConfigError::InvalidNumber { key, value }),
        None => Ok(default),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmConfigError {
    #[error("invalid numeric value for {key}: {value}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("read config file failed ({path}): {message}")]
    ReadConfigFile { path: String, message: String },
    #[error("parse config file failed ({path}): {message}")]
    ParseConfigFile { path: String, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmCompletionRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    /// Ask the service to constrain output to a JSON object.
    pub json_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmCompletionResult {
    pub output: String,
    pub model: Option<String>,
    pub total_tokens: Option<u64>,
}

pub trait LlmCompletionClient: Send + Sync {
    fn complete(
        &self,
        credential: &str,
        request: &LlmCompletionRequest,
    ) -> Result<LlmCompletionResult, LlmClientError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmClientError {
    #[error("client build failed: {message}")]
    BuildClient { message: String },
    #[error("http request failed: {message}")]
    Http { message: String },
    #[error("http status {code}: {message}")]
    HttpStatus { code: u16, message: String },
    #[error("decode response failed: {message}")]
    DecodeResponse { message: String },
    #[error("empty completion choice")]
    EmptyChoice,
}

#[derive(Debug, Clone)]
pub struct OpenAiChatCompletionClient {
    base_url: String,
    client: Client,
}

impl OpenAiChatCompletionClient {
    pub fn from_config(config: &LlmClientConfig) -> Result<Self, LlmClientError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms.max(1)))
            .build()
            .map_err(|err| LlmClientError::BuildClient {
                message: err.to_string(),
            })?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<ChatUsage>,
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl LlmCompletionClient for OpenAiChatCompletionClient {
    fn complete(
        &self,
        credential: &str,
        request: &LlmCompletionRequest,
    ) -> Result<LlmCompletionResult, LlmClientError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut messages = Vec::with_capacity(2);
        if let Some(system_prompt) = request.system_prompt.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system_prompt,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.user_prompt.as_str(),
        });
        let payload = ChatCompletionRequest {
            model: request.model.as_str(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: request.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(credential)
            .json(&payload)
            .send()
            .map_err(|err| LlmClientError::Http {
                message: err.to_string(),
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let message = response.text().unwrap_or_else(|_| "<no body>".to_string());
            return Err(LlmClientError::HttpStatus {
                code: status.as_u16(),
                message,
            });
        }

        let response: ChatCompletionResponse =
            response
                .json()
                .map_err(|err| LlmClientError::DecodeResponse {
                    message: err.to_string(),
                })?;

        let first = response
            .choices
            .into_iter()
            .next()
            .ok_or(LlmClientError::EmptyChoice)?;
        let output = first
            .message
            .content
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmClientError::EmptyChoice)?;

        Ok(LlmCompletionResult {
            output,
            model: response.model,
            total_tokens: response.usage.and_then(|usage| usage.total_tokens),
        })
    }
}

/// Stateless bridge from agent snapshots to decisions.
///
/// Every failure path resolves to `DecisionResponse::Stop`; nothing here retries.
#[derive(Debug)]
pub struct DecisionClient<C: LlmCompletionClient> {
    config: LlmClientConfig,
    client: C,
}

impl DecisionClient<OpenAiChatCompletionClient> {
    pub fn from_config(config: LlmClientConfig) -> Result<Self, LlmClientError> {
        let client = OpenAiChatCompletionClient::from_config(&config)?;
        Ok(Self::new(config, client))
    }
}

impl<C: LlmCompletionClient> DecisionClient<C> {
    pub fn new(config: LlmClientConfig, client: C) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &LlmClientConfig {
        &self.config
    }

    pub fn decide(&self, credential: Option<&str>, request: &DecisionRequest) -> DecisionResponse {
        self.decide_with_trace(credential, request).response
    }

    pub fn decide_with_trace(
        &self,
        credential: Option<&str>,
        request: &DecisionRequest,
    ) -> DecisionTrace {
        let Some(credential) = usable_credential(credential) else {
            return DecisionTrace::fallback(
                request.agent.clone(),
                &DecisionError::MissingCredential,
            );
        };

        let completion_request = LlmCompletionRequest {
            model: self.config.model.clone(),
            system_prompt: Some(self.config.system_prompt.clone()),
            user_prompt: decision_prompt(request),
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
            json_mode: true,
        };
        let llm_input = trace_input(&completion_request);

        let started_at = Instant::now();
        let completion = self.client.complete(credential, &completion_request);
        let latency_ms = started_at.elapsed().as_millis() as u64;

        let (response, llm_output, error) = match completion {
            Ok(completion) => match parse_decision(&completion.output) {
                Ok(response) => (response, Some(completion.output), None),
                Err(err) => {
                    tracing::warn!(agent = %request.agent, error = %err, "decision output rejected");
                    (DecisionResponse::Stop, Some(completion.output), Some(err))
                }
            },
            Err(err) => {
                let err = DecisionError::from(err);
                tracing::warn!(agent = %request.agent, error = %err, "decision request failed");
                (DecisionResponse::Stop, None, Some(err))
            }
        };

        DecisionTrace {
            agent: request.agent.clone(),
            ticket: None,
            response,
            llm_input: Some(llm_input),
            llm_output,
            error: error.map(|err| err.to_string()),
            latency_ms: Some(latency_ms),
        }
    }

    /// One short line voiced as `own` on meeting someone `other`; `"..."` when anything fails.
    pub fn converse(
        &self,
        credential: Option<&str>,
        own: Personality,
        other: Personality,
        context: &str,
    ) -> String {
        let Some(credential) = usable_credential(credential) else {
            return CONVERSATION_FALLBACK_REPLY.to_string();
        };
        let request = LlmCompletionRequest {
            model: self.config.model.clone(),
            system_prompt: None,
            user_prompt: conversation_prompt(own, other, context),
            max_tokens: CONVERSATION_MAX_TOKENS,
            temperature: None,
            json_mode: false,
        };
        match self.client.complete(credential, &request) {
            Ok(completion) => truncate_reply(&completion.output),
            Err(err) => {
                tracing::warn!(error = %err, "conversation request failed");
                CONVERSATION_FALLBACK_REPLY.to_string()
            }
        }
    }
}

fn usable_credential(credential: Option<&str>) -> Option<&str> {
    credential
        .map(str::trim)
        .filter(|credential| !credential.is_empty())
}

fn trace_input(request: &LlmCompletionRequest) -> String {
    match request.system_prompt.as_deref() {
        Some(system_prompt) => format!(
            "[system]\n{}\n\n[user]\n{}",
            system_prompt, request.user_prompt
        ),
        None => format!("[user]\n{}", request.user_prompt),
    }
}

fn truncate_reply(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CONVERSATION_FALLBACK_REPLY.to_string();
    }
    trimmed.chars().take(CONVERSATION_MAX_CHARS).collect()
}
