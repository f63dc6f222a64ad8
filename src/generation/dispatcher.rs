//! Action dispatcher
//!
//! RECEIVED -> VALIDATED -> EXECUTING -> SUCCEEDED | FAILED, per request.
//! Validation happens before any outbound call; each executed action makes
//! exactly one call to the generation service.

use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;

use super::action::{Action, ActionRequest, Payload};
use super::{
    curated_models, prompts, GeneratedImage, GenerationService, ImageRequest, ModelInfo,
    TextAnalysis, TextPrompt,
};
use crate::config::GenerationConfig;
use crate::error::{DispatchError, UpstreamError};
use crate::logger;

/// Successful dispatch result, serialized as a single top-level key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ActionResult {
    #[serde(rename = "models")]
    ModelList(Vec<ModelInfo>),
    #[serde(rename = "images")]
    ImageList(Vec<GeneratedImage>),
    #[serde(rename = "analysis")]
    TextAnalysis(TextAnalysis),
    #[serde(rename = "insight")]
    Insight(String),
    #[serde(rename = "content")]
    EducationalContent(String),
    #[serde(rename = "prompt")]
    VisualizationPrompt(String),
}

/// Model names and sampling settings applied when the caller gives none
#[derive(Debug, Clone)]
pub struct DispatchDefaults {
    pub image_model: String,
    pub text_model: String,
    pub analysis_model: String,
    pub search_limit: usize,
    pub max_new_tokens: u32,
    pub temperature: f32,
}

impl From<&GenerationConfig> for DispatchDefaults {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            image_model: config.image_model.clone(),
            text_model: config.text_model.clone(),
            analysis_model: config.analysis_model.clone(),
            search_limit: config.search_limit,
            max_new_tokens: config.max_new_tokens,
            temperature: config.temperature,
        }
    }
}

pub struct ActionDispatcher {
    service: Arc<dyn GenerationService>,
    defaults: DispatchDefaults,
}

impl ActionDispatcher {
    pub fn new(service: Arc<dyn GenerationService>, defaults: DispatchDefaults) -> Self {
        Self { service, defaults }
    }

    /// Validate and execute any action
    pub async fn dispatch(
        &self,
        action: Option<&str>,
        payload: &Payload,
    ) -> Result<ActionResult, DispatchError> {
        let request = ActionRequest::parse(action, payload)?;
        let action = request.action();

        self.execute(request).await.map_err(|e| {
            logger::log_dispatch_failure(action.as_str(), &e);
            e
        })
    }

    /// Dispatch for query-string callers: only read actions are recognized
    pub async fn dispatch_read(
        &self,
        action: Option<&str>,
        payload: &Payload,
    ) -> Result<ActionResult, DispatchError> {
        if let Some(name) = action.filter(|a| !a.trim().is_empty()) {
            if !Action::from_str(name)?.is_read_only() {
                return Err(DispatchError::UnknownAction(name.to_string()));
            }
        }
        self.dispatch(action, payload).await
    }

    async fn execute(&self, request: ActionRequest) -> Result<ActionResult, DispatchError> {
        let result = match request {
            ActionRequest::GetModels => ActionResult::ModelList(curated_models()),
            ActionRequest::SearchModels { query, limit } => {
                let limit = limit.unwrap_or(self.defaults.search_limit);
                ActionResult::ModelList(self.service.search_models(&query, limit).await?)
            }
            ActionRequest::GenerateImage {
                prompt,
                model,
                negative_prompt,
                seed,
                width,
                height,
            } => {
                let request = ImageRequest {
                    model: model.unwrap_or_else(|| self.defaults.image_model.clone()),
                    prompt,
                    negative_prompt,
                    seed,
                    width,
                    height,
                };
                let image = self.service.generate_image(&request).await?;
                ActionResult::ImageList(vec![image])
            }
            ActionRequest::AnalyzeText { text, model } => {
                let model = model.unwrap_or_else(|| self.defaults.analysis_model.clone());
                let scores = self.service.analyze_text(&model, &text).await?;
                ActionResult::TextAnalysis(summarize_scores(model, scores)?)
            }
            ActionRequest::MarketInsight {
                market_data,
                insight_prompt,
                seed,
            } => {
                let prompt = prompts::market_insight(&market_data, &insight_prompt);
                ActionResult::Insight(self.complete(prompt, seed).await?)
            }
            ActionRequest::EducationalContent { topic, level, seed } => {
                let prompt = prompts::educational_content(&topic, &level);
                ActionResult::EducationalContent(self.complete(prompt, seed).await?)
            }
            ActionRequest::VisualizationPrompt {
                data_type,
                chart_type,
                data,
                seed,
            } => {
                let prompt = prompts::visualization_prompt(&data_type, &chart_type, data.as_ref());
                ActionResult::VisualizationPrompt(self.complete(prompt, seed).await?)
            }
        };

        Ok(result)
    }

    async fn complete(&self, prompt: String, seed: Option<u64>) -> Result<String, DispatchError> {
        let request = TextPrompt {
            model: self.defaults.text_model.clone(),
            prompt,
            max_new_tokens: self.defaults.max_new_tokens,
            temperature: self.defaults.temperature,
            seed,
        };
        let text = self.service.generate_text(&request).await?;
        if text.trim().is_empty() {
            return Err(UpstreamError::InvalidResponse("empty generation".to_string()).into());
        }
        Ok(text.trim().to_string())
    }
}

/// Pick the top label; upstream order is not guaranteed
fn summarize_scores(
    model: String,
    mut scores: Vec<super::LabelScore>,
) -> Result<TextAnalysis, DispatchError> {
    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    let top = scores
        .first()
        .cloned()
        .ok_or_else(|| UpstreamError::InvalidResponse("no classification labels".to_string()))?;

    Ok(TextAnalysis {
        model,
        label: top.label,
        score: top.score,
        scores,
    })
}
