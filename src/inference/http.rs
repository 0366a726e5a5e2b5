use async_trait::async_trait;
use serde_json::{json, Value};

use super::{
    schema, AnalysisRequest, ChatTurn, InferenceError, InferenceService, MediaPart,
    PRESCRIPTION_EMPTY_MESSAGE,
};
use crate::db::models::AnalysisResult;
use crate::language::Language;

/// Reference gateway client. The gateway wraps the actual model provider
/// and exposes one JSON endpoint per operation.
pub struct HttpInferenceService {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpInferenceService {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            // No request timeout: calls resolve or reject on the link's
            // own terms, however slow the uplink is.
            client: reqwest::Client::new(),
            base_url,
            api_key: api_key.into(),
        }
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, InferenceError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| InferenceError::Transport(err.to_string()))?
            .error_for_status()
            .map_err(|err| InferenceError::Transport(err.to_string()))?;

        response
            .json::<Value>()
            .await
            .map_err(|err| InferenceError::MalformedResponse(err.to_string()))
    }
}

#[async_trait]
impl InferenceService for HttpInferenceService {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, InferenceError> {
        let body = serde_json::to_value(request)
            .map_err(|err| InferenceError::Transport(err.to_string()))?;
        let raw = self.post("analyze", body).await?;
        schema::decode_analysis(raw)
    }

    async fn chat(
        &self,
        history: &[ChatTurn],
        message: &str,
        language: Language,
    ) -> Result<String, InferenceError> {
        let body = json!({
            "history": history,
            "message": message,
            "language": language.tag(),
        });
        let raw = self.post("chat", body).await?;

        match raw.get("reply").and_then(Value::as_str) {
            Some(reply) if !reply.trim().is_empty() => Ok(reply.to_string()),
            _ => Err(InferenceError::EmptyResponse),
        }
    }

    async fn generate_diagram(&self, prompt: &str) -> Result<Option<String>, InferenceError> {
        let raw = self.post("diagram", json!({ "prompt": prompt })).await?;

        Ok(raw
            .get("image")
            .and_then(Value::as_str)
            .filter(|encoded| !encoded.is_empty())
            .map(|encoded| format!("data:image/png;base64,{encoded}")))
    }

    async fn transcribe_prescription(&self, image: &MediaPart) -> Result<String, InferenceError> {
        let body = json!({
            "image": serde_json::to_value(image)
                .map_err(|err| InferenceError::Transport(err.to_string()))?,
        });
        let raw = self.post("prescription", body).await?;

        match raw.get("text").and_then(Value::as_str) {
            Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
            _ => Ok(PRESCRIPTION_EMPTY_MESSAGE.to_string()),
        }
    }
}
