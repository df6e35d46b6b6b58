use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::ai_service::{ImageInput, VisionService};
use super::prompt::build_prompt;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "openai/gpt-4-turbo";
const MAX_TOKENS: u32 = 1500;

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ContentPart {
    Text {
        #[serde(rename = "type")]
        content_type: String,
        text: String,
    },
    ImageUrl {
        #[serde(rename = "type")]
        content_type: String,
        image_url: ImageData,
    },
}

#[derive(Debug, Serialize)]
struct ImageData {
    url: String,
    detail: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    /// Text of the first choice; a reply without choices reads as empty.
    fn into_content(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default()
    }
}

/// OpenAI-compatible chat-completions client (OpenRouter by default).
pub struct OpenRouterService {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenRouterService {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn build_request(&self, image: &ImageInput, dietary_hint: Option<&str>) -> ChatRequest {
        let messages = vec![ChatMessage {
            role: "user".to_string(),
            content: vec![
                ContentPart::Text {
                    content_type: "text".to_string(),
                    text: build_prompt(dietary_hint),
                },
                ContentPart::ImageUrl {
                    content_type: "image_url".to_string(),
                    image_url: ImageData {
                        url: image.to_data_url(),
                        detail: "high".to_string(),
                    },
                },
            ],
        }];

        ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: MAX_TOKENS,
        }
    }
}

#[async_trait::async_trait]
impl VisionService for OpenRouterService {
    async fn analyze(&self, image: &ImageInput, dietary_hint: Option<&str>) -> Result<String> {
        let request = self.build_request(image, dietary_hint);

        log::info!("🤖 Sending request to OpenRouter with model: {}", self.model);
        log::debug!("📤 Request payload size: {} bytes", serde_json::to_string(&request)?.len());
        if let Some(hint) = dietary_hint {
            log::debug!("🥗 Dietary hint: {}", hint);
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", "https://github.com/fridge-chef")
            .header("X-Title", "FridgeChef")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        log::debug!("📥 OpenRouter response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await?;
            log::error!("❌ OpenRouter API error response: {}", error_text);
            anyhow::bail!("OpenRouter API error ({}): {}", status, error_text);
        }

        let response_text = response.text().await?;
        log::debug!("📄 Raw OpenRouter response size: {} bytes", response_text.len());

        let chat_response: ChatResponse = serde_json::from_str(&response_text)?;
        let content = chat_response.into_content();
        log::info!("💬 OpenRouter response content: {}", content);

        Ok(content)
    }
}
