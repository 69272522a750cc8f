//! Zhipu API client implementation.

use std::time::Duration;

use reqwest::Client;

use pixora_core::{ImageModel, Style};

use super::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ImageGenerationRequest,
    ImageGenerationResponse, ZhipuErrorResponse,
};

/// Model used for prompt enhancement.
const ENHANCE_MODEL: &str = "glm-4-flash";

/// System prompt for the enhancement call. Keeps the user's language and any
/// quoted text intact while expanding the prompt with artistic detail.
const ENHANCE_SYSTEM_PROMPT: &str = "You are an expert AI art prompt engineer for image generation. Transform the user's prompt into a detailed, vivid description that will produce a stunning image.\n\nRules:\n1. Detect whether the input is Chinese or English and answer in the SAME language; never translate the core meaning.\n2. Keep any quoted text (text meant to be rendered in the image) EXACTLY as written.\n3. Expand with artistic details: lighting, composition, atmosphere, textures, colors.\n4. Add quality boosters natural to the language (8K, highly detailed, masterpiece / \u{9ad8}\u{6e05}, \u{7cbe}\u{7ec6}, \u{5927}\u{5e08}\u{7ea7}).\n5. Incorporate this style direction, phrased naturally in the target language: \"{style}\".\n6. Output ONLY the improved prompt, no explanations or quotes.\n7. Keep it under 200 words.";

/// Error type for Zhipu operations.
#[derive(Debug, thiserror::Error)]
pub enum ZhipuError {
    /// HTTP request failed (includes timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned an error status.
    #[error("Zhipu API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the API, when parseable.
        message: String,
    },

    /// The API answered 2xx but the payload is unusable.
    #[error("invalid upstream result: {0}")]
    InvalidResult(String),
}

/// Zhipu API client.
///
/// One client serves both the image generation endpoint and the
/// chat-completion endpoint used for prompt enhancement. The `reqwest`
/// client carries the bounded timeout, so no call can block past it.
#[derive(Debug, Clone)]
pub struct ZhipuClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ZhipuClient {
    /// Create a new Zhipu client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API base, e.g. `https://open.bigmodel.cn/api/paas/v4`
    /// * `api_key` - Zhipu API key
    /// * `timeout` - upper bound for every request
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Generate an image and return its URL.
    ///
    /// The result is validated before being treated as a success: an empty
    /// or non-http URL is an `InvalidResult` error, which the gateway
    /// handles exactly like an upstream failure.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, timeout, non-2xx status, or
    /// an unusable response payload.
    pub async fn generate_image(
        &self,
        model: ImageModel,
        prompt: &str,
        size: &str,
    ) -> Result<String, ZhipuError> {
        let request = ImageGenerationRequest {
            model: model.as_str(),
            prompt,
            size,
            quality: "standard",
        };

        let response = self
            .client
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ZhipuErrorResponse>()
                .await
                .ok()
                .and_then(|e| e.error)
                .map_or_else(|| "unknown error".to_string(), |e| e.message);

            return Err(ZhipuError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ImageGenerationResponse = response.json().await?;
        let url = body
            .data
            .into_iter()
            .next()
            .map(|image| image.url)
            .unwrap_or_default();

        if url.is_empty() || !url.starts_with("http") {
            return Err(ZhipuError::InvalidResult(format!(
                "missing or malformed image URL: {url:?}"
            )));
        }

        Ok(url)
    }

    /// Enhance a prompt using a fast chat model.
    ///
    /// Callers treat any error as "use the original prompt"; this function
    /// never gates the main generation path.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, timeout, non-2xx status, or
    /// an empty/too-short completion.
    pub async fn enhance_prompt(&self, prompt: &str, style: Style) -> Result<String, ZhipuError> {
        let system = ENHANCE_SYSTEM_PROMPT.replace("{style}", style.hint());
        let request = ChatCompletionRequest {
            model: ENHANCE_MODEL,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.7,
            max_tokens: 500,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ZhipuError::Api {
                status: status.as_u16(),
                message: "enhancement request rejected".into(),
            });
        }

        let body: ChatCompletionResponse = response.json().await?;
        let enhanced = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .unwrap_or_default();

        // Very short completions are garbage; short Chinese prompts are
        // still several characters long.
        if enhanced.chars().count() <= 5 {
            return Err(ZhipuError::InvalidResult(
                "enhancement produced no usable prompt".into(),
            ));
        }

        Ok(enhanced)
    }
}
