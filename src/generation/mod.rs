//! Generation module
//!
//! Action-based proxy over a model hub and inference service: model search,
//! text-to-image, text classification and prompt-based text generation.

mod action;
mod dispatcher;
mod huggingface;
mod prompts;

pub use action::Payload;
pub use dispatcher::{ActionDispatcher, ActionResult, DispatchDefaults};
pub use huggingface::HuggingFaceClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::UpstreamError;

/// Model task family, serialized with the hub's pipeline tag names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelCategory {
    TextToImage,
    TextGeneration,
    TextClassification,
    Other,
}

impl ModelCategory {
    pub fn from_pipeline_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("text-to-image") => Self::TextToImage,
            Some("text-generation" | "text2text-generation") => Self::TextGeneration,
            Some("text-classification" | "sentiment-analysis") => Self::TextClassification,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: ModelCategory,
}

impl ModelInfo {
    fn new(id: &str, name: &str, description: &str, category: ModelCategory) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            category,
        }
    }
}

/// Static list served by `get-models`
pub fn curated_models() -> Vec<ModelInfo> {
    vec![
        ModelInfo::new(
            "stabilityai/stable-diffusion-xl-base-1.0",
            "Stable Diffusion XL",
            "High-quality image generation for chart concepts and illustrations",
            ModelCategory::TextToImage,
        ),
        ModelInfo::new(
            "mistralai/Mistral-7B-Instruct-v0.2",
            "Mistral 7B Instruct",
            "Instruction-tuned model for market insights and lessons",
            ModelCategory::TextGeneration,
        ),
        ModelInfo::new(
            "ProsusAI/finbert",
            "FinBERT",
            "Sentiment analysis tuned on financial text",
            ModelCategory::TextClassification,
        ),
    ]
}

/// Text-to-image call parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub seed: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedImage {
    /// `data:` URL holding the encoded image
    pub url: String,
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextAnalysis {
    pub model: String,
    /// Highest scoring label
    pub label: String,
    pub score: f64,
    pub scores: Vec<LabelScore>,
}

/// Text generation call parameters
#[derive(Debug, Clone, PartialEq)]
pub struct TextPrompt {
    pub model: String,
    pub prompt: String,
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub seed: Option<u64>,
}

/// Downstream capabilities used by the dispatcher, one call per action
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn search_models(&self, query: &str, limit: usize)
        -> Result<Vec<ModelInfo>, UpstreamError>;

    async fn generate_image(&self, request: &ImageRequest) -> Result<GeneratedImage, UpstreamError>;

    async fn analyze_text(&self, model: &str, text: &str) -> Result<Vec<LabelScore>, UpstreamError>;

    async fn generate_text(&self, request: &TextPrompt) -> Result<String, UpstreamError>;
}
