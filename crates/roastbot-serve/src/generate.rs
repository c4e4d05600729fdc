//! Roast and compliment text generation through an OpenAI-compatible API.

use std::time::Duration;

use async_trait::async_trait;
use roastbot_core::{ContentType, RetryPolicy};
use serde::{Deserialize, Serialize};

use crate::config::OpenAiConfig;

const SYSTEM_PROMPT: &str = "You are RoastBot, an AI specialized in generating creative roasts and compliments. Your responses should be:
1. Clever and witty
2. Personalized to the input
3. Never generic
4. Avoiding harmful stereotypes or truly offensive content
5. Using creative language and metaphors
6. Maintaining a playful tone even in roasts";

const MAX_TOKENS: u32 = 1000;
const TEMPERATURE: f32 = 0.9;
const PRESENCE_PENALTY: f32 = 0.6;
const FREQUENCY_PENALTY: f32 = 0.6;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// How harsh the output should be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    #[default]
    Medium,
    Nuclear,
}

impl Severity {
    fn modifier(self) -> &'static str {
        match self {
            Self::Mild => "Keep it very light and playful.",
            Self::Medium => "Be moderately edgy but not too harsh.",
            Self::Nuclear => "Go all out but stay within ethical bounds.",
        }
    }
}

/// Voice of the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Style {
    Formal,
    #[default]
    Sarcastic,
    Shakespearean,
    RapBattle,
}

impl Style {
    fn modifier(self) -> &'static str {
        match self {
            Self::Formal => "Use sophisticated, formal language.",
            Self::Sarcastic => "Be extremely sarcastic and ironic.",
            Self::Shakespearean => "Write in Shakespearean style with thee/thou/thy.",
            Self::RapBattle => "Write in rap battle style with rhymes.",
        }
    }
}

/// What the user supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationInput {
    /// A self-description.
    Text(String),
    /// An image URL or data URL of the subject.
    Image(String),
}

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub content_type: ContentType,
    pub input: GenerationInput,
    pub severity: Severity,
    pub style: Style,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("text generation is not configured")]
    NotConfigured,

    #[error("request to generation API failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("No response generated")]
    EmptyResponse,
}

impl GenerationError {
    /// Transport failures, rate limits and server errors are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(err) => !err.is_decode() && !err.is_builder(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::NotConfigured | Self::EmptyResponse => false,
        }
    }
}

/// Produces roast or compliment text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, options: &GenerateOptions) -> Result<String, GenerationError>;
}

// =============================================================================
// Chat completions wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    presence_penalty: f32,
    frequency_penalty: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct ImageUrl {
    url: String,
    detail: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// System and user messages for a generation request.
pub fn build_messages(options: &GenerateOptions) -> Vec<ChatMessage> {
    let system = [
        SYSTEM_PROMPT.to_string(),
        format!("Generate a {} that is:", options.content_type),
        options.severity.modifier().to_string(),
        options.style.modifier().to_string(),
    ]
    .join("\n");

    let verb = options.content_type.as_str();
    let user = match &options.input {
        GenerationInput::Text(text) => MessageContent::Text(format!(
            "Please {verb} me based on this description: {text}"
        )),
        GenerationInput::Image(url) => MessageContent::Parts(vec![
            ContentPart::Text {
                text: format!(
                    "Please {verb} the person in this image. Focus on visible features and the overall vibe of the image."
                ),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: url.clone(),
                    detail: "high",
                },
            },
        ]),
    };

    vec![
        ChatMessage {
            role: "system",
            content: MessageContent::Text(system),
        },
        ChatMessage {
            role: "user",
            content: user,
        },
    ]
}

/// [`TextGenerator`] backed by a `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    http: reqwest::Client,
    config: OpenAiConfig,
    retry: RetryPolicy,
}

impl OpenAiGenerator {
    pub fn new(config: OpenAiConfig, retry: RetryPolicy) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            config,
            retry,
        })
    }

    async fn complete_once(&self, request: &ChatRequest<'_>) -> Result<String, GenerationError> {
        let resp = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let parsed: ChatResponse = resp.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, options: &GenerateOptions) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: build_messages(options),
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            presence_penalty: PRESENCE_PENALTY,
            frequency_penalty: FREQUENCY_PENALTY,
        };

        let result = self
            .retry
            .run("chat_completion", GenerationError::is_retryable, || {
                self.complete_once(&request)
            })
            .await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        metrics::counter!("generation_requests_total", "outcome" => outcome).increment(1);
        tracing::info!(
            content_type = %options.content_type,
            severity = ?options.severity,
            style = ?options.style,
            outcome,
            "text generated"
        );

        result
    }
}
