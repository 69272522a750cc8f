//! Zhipu API request/response types.

use serde::{Deserialize, Serialize};

/// Image generation request body.
#[derive(Debug, Serialize)]
pub struct ImageGenerationRequest<'a> {
    /// Model identifier.
    pub model: &'a str,
    /// The (possibly enhanced) prompt.
    pub prompt: &'a str,
    /// Pixel size, e.g. "1024x1024".
    pub size: &'a str,
    /// Quality tier.
    pub quality: &'a str,
}

/// Image generation response body: `{ "data": [{ "url": "..." }] }`.
#[derive(Debug, Deserialize)]
pub struct ImageGenerationResponse {
    /// Generated images.
    #[serde(default)]
    pub data: Vec<GeneratedImage>,
}

/// One generated image.
#[derive(Debug, Deserialize)]
pub struct GeneratedImage {
    /// URL of the generated image.
    #[serde(default)]
    pub url: String,
}

/// Chat completion request body (used for prompt enhancement).
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    /// Model identifier.
    pub model: &'a str,
    /// Conversation messages.
    pub messages: Vec<ChatMessage<'a>>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Output token cap.
    pub max_tokens: u32,
}

/// A chat message.
#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    /// Message role ("system" or "user").
    pub role: &'a str,
    /// Message content.
    pub content: &'a str,
}

/// Chat completion response body.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    /// Completion choices.
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

/// One completion choice.
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    /// The completion message.
    pub message: ChatResponseMessage,
}

/// The message inside a completion choice.
#[derive(Debug, Deserialize)]
pub struct ChatResponseMessage {
    /// Message content.
    #[serde(default)]
    pub content: String,
}

/// Error envelope returned by the Zhipu API.
#[derive(Debug, Deserialize)]
pub struct ZhipuErrorResponse {
    /// Error details.
    pub error: Option<ZhipuErrorDetail>,
}

/// Error details.
#[derive(Debug, Deserialize)]
pub struct ZhipuErrorDetail {
    /// Error message.
    #[serde(default)]
    pub message: String,
}
