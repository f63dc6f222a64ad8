//! Hugging Face style model hub and inference client

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;

use super::action::is_model_id;
use super::{
    GeneratedImage, GenerationService, ImageRequest, LabelScore, ModelCategory, ModelInfo,
    TextPrompt,
};
use crate::config::GenerationConfig;
use crate::error::UpstreamError;

const USER_AGENT: &str = concat!("crypto-edu-gateway/", env!("CARGO_PKG_VERSION"));

/// Hub search entry, only the fields we map
#[derive(Debug, Deserialize)]
struct HubModel {
    #[serde(alias = "modelId")]
    id: String,
    #[serde(default)]
    pipeline_tag: Option<String>,
    #[serde(default)]
    downloads: Option<u64>,
}

impl From<HubModel> for ModelInfo {
    fn from(model: HubModel) -> Self {
        let name = model.id.rsplit('/').next().unwrap_or(&model.id).to_string();
        let task = model.pipeline_tag.as_deref().unwrap_or("general");
        let description = match model.downloads {
            Some(downloads) => format!("{task} model, {downloads} downloads"),
            None => format!("{task} model"),
        };
        Self {
            category: ModelCategory::from_pipeline_tag(model.pipeline_tag.as_deref()),
            id: model.id,
            name,
            description,
        }
    }
}

pub struct HuggingFaceClient {
    client: Client,
    hub_url: String,
    inference_url: String,
    api_token: Option<String>,
}

impl HuggingFaceClient {
    pub fn new(config: &GenerationConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            hub_url: config.hub_url.trim_end_matches('/').to_string(),
            inference_url: config.inference_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// `{inference_url}/models/{owner}/{name}`, each id segment pushed on its own
    fn model_url(&self, model: &str) -> Result<Url, UpstreamError> {
        let invalid = || UpstreamError::InvalidModel(model.to_string());
        if !is_model_id(model) {
            return Err(invalid());
        }
        let mut url = Url::parse(&self.inference_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .push("models")
            .extend(model.split('/'));
        Ok(url)
    }

    /// POST to a model endpoint, non-success statuses become errors
    async fn call_model(&self, model: &str, body: &Value) -> Result<Response, UpstreamError> {
        let request = self.client.post(self.model_url(model)?).json(body);
        let response = self.authorized(request).send().await?;
        ensure_success(response).await
    }
}

async fn ensure_success(response: Response) -> Result<Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(UpstreamError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Drop unset parameters so the upstream applies its own defaults
fn parameters(entries: Vec<(&str, Option<Value>)>) -> Value {
    let map: Map<String, Value> = entries
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
        .collect();
    Value::Object(map)
}

/// Classification output is either `[[{label, score}]]` or `[{label, score}]`
fn parse_label_scores(body: Value) -> Result<Vec<LabelScore>, UpstreamError> {
    let rows = match body {
        Value::Array(rows) => rows,
        other => {
            return Err(UpstreamError::InvalidResponse(format!(
                "expected classification array, got {other}"
            )))
        }
    };
    let flat = if matches!(rows.first(), Some(Value::Array(_))) {
        match rows.into_iter().next() {
            Some(Value::Array(inner)) => inner,
            _ => Vec::new(),
        }
    } else {
        rows
    };
    flat.into_iter()
        .map(|v| {
            serde_json::from_value(v)
                .map_err(|e| UpstreamError::InvalidResponse(format!("bad label score: {e}")))
        })
        .collect()
}

/// Generation output is either `[{generated_text}]` or `{generated_text}`
fn parse_generated_text(body: &Value) -> Result<String, UpstreamError> {
    let item = match body {
        Value::Array(items) => items.first(),
        other => Some(other),
    };
    item.and_then(|i| i.get("generated_text"))
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| UpstreamError::InvalidResponse("missing generated_text".to_string()))
}

#[async_trait]
impl GenerationService for HuggingFaceClient {
    async fn search_models(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ModelInfo>, UpstreamError> {
        let limit = limit.to_string();
        let request = self
            .client
            .get(format!("{}/api/models", self.hub_url))
            .query(&[
                ("search", query),
                ("limit", limit.as_str()),
                ("sort", "downloads"),
                ("direction", "-1"),
            ]);
        let response = ensure_success(self.authorized(request).send().await?).await?;
        let models: Vec<HubModel> = response.json().await?;
        Ok(models.into_iter().map(ModelInfo::from).collect())
    }

    async fn generate_image(
        &self,
        request: &ImageRequest,
    ) -> Result<GeneratedImage, UpstreamError> {
        let body = json!({
            "inputs": request.prompt,
            "parameters": parameters(vec![
                ("negative_prompt", request.negative_prompt.clone().map(Value::from)),
                ("seed", request.seed.map(Value::from)),
                ("width", request.width.map(Value::from)),
                ("height", request.height.map(Value::from)),
            ]),
        });
        let response = self.call_model(&request.model, &body).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(UpstreamError::InvalidResponse(format!(
                "expected image, got {content_type}"
            )));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(UpstreamError::InvalidResponse("empty image".to_string()));
        }

        Ok(GeneratedImage {
            url: format!("data:{content_type};base64,{}", STANDARD.encode(&bytes)),
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            seed: request.seed,
        })
    }

    async fn analyze_text(
        &self,
        model: &str,
        text: &str,
    ) -> Result<Vec<LabelScore>, UpstreamError> {
        let response = self.call_model(model, &json!({ "inputs": text })).await?;
        let body: Value = response.json().await?;
        parse_label_scores(body)
    }

    async fn generate_text(&self, request: &TextPrompt) -> Result<String, UpstreamError> {
        let body = json!({
            "inputs": request.prompt,
            "parameters": parameters(vec![
                ("max_new_tokens", Some(Value::from(request.max_new_tokens))),
                ("temperature", Some(Value::from(request.temperature))),
                ("return_full_text", Some(Value::Bool(false))),
                ("seed", request.seed.map(Value::from)),
            ]),
        });
        let response = self.call_model(&request.model, &body).await?;
        let body: Value = response.json().await?;
        parse_generated_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer, token: Option<&str>) -> HuggingFaceClient {
        HuggingFaceClient::new(&GenerationConfig {
            hub_url: server.base_url(),
            inference_url: server.base_url(),
            api_token: token.map(ToString::to_string),
            timeout_secs: 5,
            image_model: "img/model".to_string(),
            text_model: "text/model".to_string(),
            analysis_model: "cls/model".to_string(),
            search_limit: 10,
            max_new_tokens: 128,
            temperature: 0.5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_search_models_maps_hub_entries() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/models")
                    .query_param("search", "finbert")
                    .query_param("limit", "5");
                then.status(200).json_body(json!([
                    {
                        "id": "ProsusAI/finbert",
                        "pipeline_tag": "text-classification",
                        "downloads": 1000
                    },
                    { "modelId": "someone/finbert-tone" }
                ]));
            })
            .await;

        let models = client_for(&server, None)
            .search_models("finbert", 5)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].name, "finbert");
        assert_eq!(models[0].category, ModelCategory::TextClassification);
        assert_eq!(models[0].description, "text-classification model, 1000 downloads");
        assert_eq!(models[1].id, "someone/finbert-tone");
        assert_eq!(models[1].category, ModelCategory::Other);
    }

    #[tokio::test]
    async fn test_generate_image_returns_data_url() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/img/model")
                    .header("authorization", "Bearer hf_token")
                    .json_body(json!({
                        "inputs": "a calm ocean of candles",
                        "parameters": { "seed": 9 }
                    }));
                then.status(200)
                    .header("content-type", "image/png")
                    .body([1u8, 2, 3]);
            })
            .await;

        let image = client_for(&server, Some("hf_token"))
            .generate_image(&ImageRequest {
                model: "img/model".to_string(),
                prompt: "a calm ocean of candles".to_string(),
                negative_prompt: None,
                seed: Some(9),
                width: None,
                height: None,
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(image.url, "data:image/png;base64,AQID");
        assert_eq!(image.seed, Some(9));
    }

    #[tokio::test]
    async fn test_generate_image_rejects_json_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/models/img/model");
                then.status(200).json_body(json!({ "error": "loading" }));
            })
            .await;

        let err = client_for(&server, None)
            .generate_image(&ImageRequest {
                model: "img/model".to_string(),
                prompt: "x".to_string(),
                negative_prompt: None,
                seed: None,
                width: None,
                height: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_analyze_text_flattens_nested_scores() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/models/cls/model");
                then.status(200).json_body(json!([[
                    { "label": "positive", "score": 0.9 },
                    { "label": "negative", "score": 0.1 }
                ]]));
            })
            .await;

        let scores = client_for(&server, None)
            .analyze_text("cls/model", "great news")
            .await
            .unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].label, "positive");
    }

    #[tokio::test]
    async fn test_generate_text_sends_parameters() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/text/model")
                    .json_body(json!({
                        "inputs": "explain staking",
                        "parameters": {
                            "max_new_tokens": 128,
                            "temperature": 0.5,
                            "return_full_text": false
                        }
                    }));
                then.status(200)
                    .json_body(json!([{ "generated_text": "Staking locks coins." }]));
            })
            .await;

        let text = client_for(&server, None)
            .generate_text(&TextPrompt {
                model: "text/model".to_string(),
                prompt: "explain staking".to_string(),
                max_new_tokens: 128,
                temperature: 0.5,
                seed: None,
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(text, "Staking locks coins.");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/models/text/model");
                then.status(503).body("Model text/model is currently loading");
            })
            .await;

        let err = client_for(&server, None)
            .generate_text(&TextPrompt {
                model: "text/model".to_string(),
                prompt: "x".to_string(),
                max_new_tokens: 8,
                temperature: 0.5,
                seed: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_model_id_cannot_leave_models_path() {
        let server = MockServer::start_async().await;
        let whoami = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/whoami-v2");
                then.status(200).json_body(json!({ "name": "owner" }));
            })
            .await;

        let client = client_for(&server, Some("hf_secret"));
        for model in ["../api/whoami-v2", "../../api/whoami-v2", "..", "a/b/c"] {
            let err = client.analyze_text(model, "hi").await.unwrap_err();
            assert!(matches!(err, UpstreamError::InvalidModel(ref m) if m == model));
        }
        assert_eq!(whoami.hits_async().await, 0);
    }

    #[test]
    fn test_model_url_keeps_base_path() {
        let mut client = client_for(&MockServer::start(), None);
        client.inference_url = "https://api-inference.example/v1".to_string();
        assert_eq!(
            client.model_url("ProsusAI/finbert").unwrap().as_str(),
            "https://api-inference.example/v1/models/ProsusAI/finbert"
        );
        assert_eq!(
            client.model_url("gpt2").unwrap().as_str(),
            "https://api-inference.example/v1/models/gpt2"
        );
    }

    #[test]
    fn test_parse_flat_label_scores() {
        let scores =
            parse_label_scores(json!([{ "label": "neutral", "score": 0.5 }])).unwrap();
        assert_eq!(scores[0].label, "neutral");
        assert!(parse_label_scores(json!({ "error": "x" })).is_err());
    }

    #[test]
    fn test_parse_generated_text_object() {
        let text = parse_generated_text(&json!({ "generated_text": "hi" })).unwrap();
        assert_eq!(text, "hi");
        assert!(parse_generated_text(&json!([])).is_err());
    }
}
