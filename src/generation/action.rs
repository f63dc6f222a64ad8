//! Action names and per-action request validation

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::DispatchError;

/// Named request parameters, from a query string or a JSON body
pub type Payload = serde_json::Map<String, Value>;

const MAX_SEARCH_LIMIT: usize = 100;
const MIN_IMAGE_SIDE: u64 = 64;
const MAX_IMAGE_SIDE: u64 = 2048;
const DEFAULT_LEVEL: &str = "beginner";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    SearchModels,
    GetModels,
    GenerateImage,
    AnalyzeText,
    MarketInsight,
    EducationalContent,
    VisualizationPrompt,
}

impl Action {
    pub const ALL: [Self; 7] = [
        Self::SearchModels,
        Self::GetModels,
        Self::GenerateImage,
        Self::AnalyzeText,
        Self::MarketInsight,
        Self::EducationalContent,
        Self::VisualizationPrompt,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SearchModels => "search-models",
            Self::GetModels => "get-models",
            Self::GenerateImage => "generate-image",
            Self::AnalyzeText => "analyze-text",
            Self::MarketInsight => "market-insight",
            Self::EducationalContent => "educational-content",
            Self::VisualizationPrompt => "visualization-prompt",
        }
    }

    /// Pure reads, safe to retry and exposed over GET
    pub const fn is_read_only(self) -> bool {
        matches!(self, Self::SearchModels | Self::GetModels)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| DispatchError::UnknownAction(s.to_string()))
    }
}

/// A validated request: one variant per action, fields already checked
#[derive(Debug, Clone, PartialEq)]
pub enum ActionRequest {
    SearchModels {
        query: String,
        limit: Option<usize>,
    },
    GetModels,
    GenerateImage {
        prompt: String,
        model: Option<String>,
        negative_prompt: Option<String>,
        seed: Option<u64>,
        width: Option<u32>,
        height: Option<u32>,
    },
    AnalyzeText {
        text: String,
        model: Option<String>,
    },
    MarketInsight {
        market_data: Value,
        insight_prompt: String,
        seed: Option<u64>,
    },
    EducationalContent {
        topic: String,
        level: String,
        seed: Option<u64>,
    },
    VisualizationPrompt {
        data_type: String,
        chart_type: String,
        data: Option<Value>,
        seed: Option<u64>,
    },
}

impl ActionRequest {
    /// Validate the action name and the fields it requires
    pub fn parse(action: Option<&str>, payload: &Payload) -> Result<Self, DispatchError> {
        let name = action
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| DispatchError::validation("Action parameter is required"))?;

        let request = match name.parse::<Action>()? {
            Action::SearchModels => Self::SearchModels {
                query: required_str(payload, "query", "Query is required for model search")?,
                limit: optional_uint(payload, "limit")?
                    .map(check_limit)
                    .transpose()?,
            },
            Action::GetModels => Self::GetModels,
            Action::GenerateImage => Self::GenerateImage {
                prompt: required_str(payload, "prompt", "Prompt is required for image generation")?,
                model: optional_model(payload)?,
                negative_prompt: optional_str(payload, "negativePrompt"),
                seed: optional_uint(payload, "seed")?,
                width: optional_side(payload, "width")?,
                height: optional_side(payload, "height")?,
            },
            Action::AnalyzeText => Self::AnalyzeText {
                text: required_str(payload, "text", "Text is required for analysis")?,
                model: optional_model(payload)?,
            },
            Action::MarketInsight => Self::MarketInsight {
                market_data: required_value(
                    payload,
                    "marketData",
                    "Market data is required for market insight",
                )?,
                insight_prompt: required_str(
                    payload,
                    "insightPrompt",
                    "Insight prompt is required for market insight",
                )?,
                seed: optional_uint(payload, "seed")?,
            },
            Action::EducationalContent => Self::EducationalContent {
                topic: required_str(payload, "topic", "Topic is required for educational content")?,
                level: optional_str(payload, "level").unwrap_or_else(|| DEFAULT_LEVEL.to_string()),
                seed: optional_uint(payload, "seed")?,
            },
            Action::VisualizationPrompt => Self::VisualizationPrompt {
                data_type: required_str(
                    payload,
                    "dataType",
                    "Data type is required for visualization prompt",
                )?,
                chart_type: required_str(
                    payload,
                    "chartType",
                    "Chart type is required for visualization prompt",
                )?,
                data: payload.get("data").filter(|v| !v.is_null()).cloned(),
                seed: optional_uint(payload, "seed")?,
            },
        };

        Ok(request)
    }

    pub const fn action(&self) -> Action {
        match self {
            Self::SearchModels { .. } => Action::SearchModels,
            Self::GetModels => Action::GetModels,
            Self::GenerateImage { .. } => Action::GenerateImage,
            Self::AnalyzeText { .. } => Action::AnalyzeText,
            Self::MarketInsight { .. } => Action::MarketInsight,
            Self::EducationalContent { .. } => Action::EducationalContent,
            Self::VisualizationPrompt { .. } => Action::VisualizationPrompt,
        }
    }
}

/// Non-blank string field
fn required_str(payload: &Payload, key: &str, message: &str) -> Result<String, DispatchError> {
    optional_str(payload, key).ok_or_else(|| DispatchError::validation(message))
}

/// Any non-null value; strings must also be non-blank
fn required_value(payload: &Payload, key: &str, message: &str) -> Result<Value, DispatchError> {
    match payload.get(key) {
        None | Some(Value::Null) => Err(DispatchError::validation(message)),
        Some(Value::String(s)) if s.trim().is_empty() => Err(DispatchError::validation(message)),
        Some(value) => Ok(value.clone()),
    }
}

fn optional_str(payload: &Payload, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(ToString::to_string)
}

/// Caller-chosen model override; must look like `name` or `owner/name`
fn optional_model(payload: &Payload) -> Result<Option<String>, DispatchError> {
    match optional_str(payload, "model") {
        Some(model) if !is_model_id(&model) => {
            Err(DispatchError::validation("model must be a valid model id"))
        }
        model => Ok(model),
    }
}

/// One or two `/`-separated segments of `[A-Za-z0-9._-]`, none of them `.` or `..`
pub fn is_model_id(id: &str) -> bool {
    let segments: Vec<&str> = id.split('/').collect();
    segments.len() <= 2
        && segments.iter().all(|segment| {
            !segment.is_empty()
                && *segment != "."
                && *segment != ".."
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        })
}

/// Non-negative integer given as a JSON number or a numeric string
fn optional_uint(payload: &Payload, key: &str) -> Result<Option<u64>, DispatchError> {
    let invalid = || DispatchError::validation(format!("{key} must be a non-negative integer"));
    match payload.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_u64().map(Some).ok_or_else(invalid),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

fn optional_side(payload: &Payload, key: &str) -> Result<Option<u32>, DispatchError> {
    match optional_uint(payload, key)? {
        None => Ok(None),
        Some(side) if (MIN_IMAGE_SIDE..=MAX_IMAGE_SIDE).contains(&side) => {
            Ok(u32::try_from(side).ok())
        }
        Some(_) => Err(DispatchError::validation(format!(
            "{key} must be between {MIN_IMAGE_SIDE} and {MAX_IMAGE_SIDE}"
        ))),
    }
}

fn check_limit(limit: u64) -> Result<usize, DispatchError> {
    usize::try_from(limit)
        .ok()
        .filter(|l| (1..=MAX_SEARCH_LIMIT).contains(l))
        .ok_or_else(|| {
            DispatchError::validation(format!("limit must be between 1 and {MAX_SEARCH_LIMIT}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => panic!("payload must be an object"),
        }
    }

    fn validation_message(action: &str, body: Value) -> String {
        match ActionRequest::parse(Some(action), &payload(body)) {
            Err(DispatchError::Validation(message)) => message,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_action_names_round_trip() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn test_only_reads_are_read_only() {
        let reads: Vec<_> = Action::ALL.into_iter().filter(|a| a.is_read_only()).collect();
        assert_eq!(reads, vec![Action::SearchModels, Action::GetModels]);
    }

    #[test]
    fn test_missing_action() {
        let empty = Payload::new();
        for action in [None, Some(""), Some("   ")] {
            match ActionRequest::parse(action, &empty) {
                Err(DispatchError::Validation(message)) => {
                    assert_eq!(message, "Action parameter is required");
                }
                other => panic!("unexpected: {other:?}"),
            }
        }
    }

    #[test]
    fn test_unknown_action() {
        let err = ActionRequest::parse(Some("not-a-real-action"), &Payload::new()).unwrap_err();
        assert!(
            matches!(err, DispatchError::UnknownAction(ref name) if name == "not-a-real-action")
        );
        assert_eq!(err.to_string(), "Unknown action");

        // exact match only
        assert!(ActionRequest::parse(Some("Get-Models"), &Payload::new()).is_err());
    }

    #[test]
    fn test_required_field_messages() {
        assert_eq!(
            validation_message("search-models", json!({})),
            "Query is required for model search"
        );
        assert_eq!(
            validation_message("generate-image", json!({})),
            "Prompt is required for image generation"
        );
        assert_eq!(
            validation_message("analyze-text", json!({ "text": "  " })),
            "Text is required for analysis"
        );
        assert_eq!(
            validation_message("market-insight", json!({ "insightPrompt": "why?" })),
            "Market data is required for market insight"
        );
        assert_eq!(
            validation_message("market-insight", json!({ "marketData": { "btc": 1 } })),
            "Insight prompt is required for market insight"
        );
        assert_eq!(
            validation_message("educational-content", json!({ "level": "advanced" })),
            "Topic is required for educational content"
        );
        assert_eq!(
            validation_message("visualization-prompt", json!({ "chartType": "line" })),
            "Data type is required for visualization prompt"
        );
        assert_eq!(
            validation_message("visualization-prompt", json!({ "dataType": "dominance" })),
            "Chart type is required for visualization prompt"
        );
    }

    #[test]
    fn test_get_models_ignores_payload() {
        let request =
            ActionRequest::parse(Some("get-models"), &payload(json!({ "query": 5, "x": null })))
                .unwrap();
        assert_eq!(request, ActionRequest::GetModels);
    }

    #[test]
    fn test_search_limit_from_string() {
        let request = ActionRequest::parse(
            Some("search-models"),
            &payload(json!({ "query": "bitcoin", "limit": "25" })),
        )
        .unwrap();
        assert_eq!(
            request,
            ActionRequest::SearchModels {
                query: "bitcoin".to_string(),
                limit: Some(25)
            }
        );

        assert_eq!(
            validation_message("search-models", json!({ "query": "btc", "limit": 0 })),
            "limit must be between 1 and 100"
        );
        assert_eq!(
            validation_message("search-models", json!({ "query": "btc", "limit": "many" })),
            "limit must be a non-negative integer"
        );
    }

    #[test]
    fn test_generate_image_optional_fields() {
        let request = ActionRequest::parse(
            Some("generate-image"),
            &payload(json!({
                "prompt": "a bull market",
                "negativePrompt": "text",
                "seed": 42,
                "width": 512,
                "height": "768"
            })),
        )
        .unwrap();
        assert_eq!(
            request,
            ActionRequest::GenerateImage {
                prompt: "a bull market".to_string(),
                model: None,
                negative_prompt: Some("text".to_string()),
                seed: Some(42),
                width: Some(512),
                height: Some(768),
            }
        );

        assert_eq!(
            validation_message("generate-image", json!({ "prompt": "x", "width": 10 })),
            "width must be between 64 and 2048"
        );
        assert_eq!(
            validation_message("generate-image", json!({ "prompt": "x", "seed": -1 })),
            "seed must be a non-negative integer"
        );
    }

    #[test]
    fn test_model_override_must_be_model_id() {
        for model in ["../api/whoami-v2", "..", "a/b/c", "org/../x", "org//x", "/abs", "a b"] {
            assert_eq!(
                validation_message("analyze-text", json!({ "text": "hi", "model": model })),
                "model must be a valid model id",
                "{model}"
            );
        }
        assert_eq!(
            validation_message("generate-image", json!({ "prompt": "x", "model": "a?b=c" })),
            "model must be a valid model id"
        );

        let request = ActionRequest::parse(
            Some("analyze-text"),
            &payload(json!({ "text": "hi", "model": "org/model-1.0_v2" })),
        )
        .unwrap();
        assert_eq!(
            request,
            ActionRequest::AnalyzeText {
                text: "hi".to_string(),
                model: Some("org/model-1.0_v2".to_string()),
            }
        );
        assert!(is_model_id("gpt2"));
    }

    #[test]
    fn test_educational_level_defaults() {
        let request = ActionRequest::parse(
            Some("educational-content"),
            &payload(json!({ "topic": "What is a blockchain?" })),
        )
        .unwrap();
        assert_eq!(
            request,
            ActionRequest::EducationalContent {
                topic: "What is a blockchain?".to_string(),
                level: "beginner".to_string(),
                seed: None,
            }
        );
        assert_eq!(request.action(), Action::EducationalContent);
    }

    #[test]
    fn test_market_insight_accepts_structured_data() {
        let request = ActionRequest::parse(
            Some("market-insight"),
            &payload(json!({
                "marketData": { "bitcoin_dominance": 52.3 },
                "insightPrompt": "What does this mean?"
            })),
        )
        .unwrap();
        match request {
            ActionRequest::MarketInsight { market_data, .. } => {
                assert_eq!(market_data, json!({ "bitcoin_dominance": 52.3 }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
