use super::error::{ApiError, ApiErrorKind, Error, Result};
use super::prompt::SYSTEM_INSTRUCTION;
use super::settings::Settings;

pub const COMPLETIONS_PATH: &str = "/chat/completions";

/// Output ceiling sent as `max_tokens` unless overridden.
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "user")]
    User,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Content {
    pub role: Role,
    #[serde(rename = "content")]
    pub message: String,
}

impl Content {
    pub fn new(role: Role, message: impl Into<String>) -> Self {
        Self {
            role,
            message: message.into(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Content>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, serde::Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, serde::Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, serde::Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Anything that can turn a prompt into generated text.
pub trait CompletionBackend: Send + Sync {
    fn complete(&self, prompt: &str, settings: &Settings) -> Result<String>;
}

pub struct CompletionClient {
    http: reqwest::blocking::Client,
    max_tokens: u32,
}

impl CompletionClient {
    pub fn new() -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("http client: {e}")))?;
        Ok(Self {
            http,
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn endpoint(settings: &Settings) -> String {
        format!("{}{COMPLETIONS_PATH}", settings.url.trim_end_matches('/'))
    }
}

impl CompletionBackend for CompletionClient {
    fn complete(&self, prompt: &str, settings: &Settings) -> Result<String> {
        settings.require_api_key()?;

        let request = ChatRequest {
            model: &settings.model,
            messages: vec![
                Content::new(Role::System, SYSTEM_INSTRUCTION),
                Content::new(Role::User, prompt),
            ],
            temperature: settings.temperature,
            max_tokens: self.max_tokens,
        };

        let endpoint = Self::endpoint(settings);
        let request_body = serde_json::to_string(&request).unwrap_or_default();
        let fail = |kind| {
            let err = ApiError {
                kind,
                endpoint: endpoint.clone(),
                request: request_body.clone(),
            };
            log::warn!("{err}");
            Error::Api(err)
        };

        log::info!("POST {endpoint} model={}", settings.model);
        log::debug!("request body: {request_body}");

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(settings.api_key.trim())
            .json(&request)
            .send()
            .map_err(|e| fail(ApiErrorKind::Transport(e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| fail(ApiErrorKind::Transport(e)))?;

        if !status.is_success() {
            return Err(fail(ApiErrorKind::Status {
                status: status.as_u16(),
                body,
            }));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| fail(ApiErrorKind::Malformed(format!("{e}: {body}"))))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| fail(ApiErrorKind::Malformed(format!("no message content: {body}"))))
    }
}
