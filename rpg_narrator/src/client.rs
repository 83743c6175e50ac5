//! Async LLM client for narration.
//!
//! Supports Gemini `generateContent` endpoints and OpenAI-compatible chat
//! completion APIs. The format is picked from the URL.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{NarrationError, Result};

pub const DEFAULT_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// API format type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFormat {
    Gemini,
    OpenAI,
}

impl ApiFormat {
    /// Detect API format from URL
    pub fn detect(url: &str) -> Self {
        if url.contains("generativelanguage.googleapis.com") || url.contains(":generateContent") {
            ApiFormat::Gemini
        } else {
            ApiFormat::OpenAI
        }
    }
}

/// Sampling settings sent with every request.
#[derive(Debug, Clone, Copy)]
struct Sampling {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 1024,
        }
    }
}

pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    api_format: ApiFormat,
    sampling: Sampling,
}

impl LlmClient {
    pub fn new(api_key: String, api_url: String, model: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NarrationError::Client(e.to_string()))?;
        Ok(Self {
            client,
            api_format: ApiFormat::detect(&api_url),
            api_key,
            api_url,
            model,
            sampling: Sampling::default(),
        })
    }

    pub fn api_format(&self) -> ApiFormat {
        self.api_format
    }

    /// Send a prompt and return the model's raw text.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        match self.api_format {
            ApiFormat::Gemini => self.complete_gemini(prompt).await,
            ApiFormat::OpenAI => self.complete_openai(prompt).await,
        }
    }

    async fn complete_gemini(&self, prompt: &str) -> Result<String> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.sampling.temperature,
                top_k: self.sampling.top_k,
                top_p: self.sampling.top_p,
                max_output_tokens: self.sampling.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;
        let completion: GeminiResponse = response.json().await?;

        completion
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or(NarrationError::EmptyResponse)
    }

    async fn complete_openai(&self, prompt: &str) -> Result<String> {
        let request = OpenAIRequest {
            model: self.model.clone(),
            max_tokens: self.sampling.max_output_tokens,
            temperature: self.sampling.temperature,
            messages: vec![Message {
                role: "user".into(),
                content: prompt.into(),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;
        let completion: OpenAIResponse = response.json().await?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(NarrationError::EmptyResponse)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(NarrationError::Api {
        status: status.as_u16(),
        body,
    })
}

// Gemini API format
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

// OpenAI-compatible API format
#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}
