use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::models::AnalysisResult;
use crate::language::Language;
use crate::media::MediaAsset;

pub mod fingerprint;
mod http;
pub mod schema;

pub use fingerprint::{analysis_fingerprint, diagram_fingerprint};
pub use http::HttpInferenceService;

/// Shown as the AI turn when a chat round fails outright.
pub const CHAT_FALLBACK_MESSAGE: &str = "Error communicating with AI.";
/// Returned when the gateway answered but produced no legible text.
pub const PRESCRIPTION_EMPTY_MESSAGE: &str = "Could not read prescription.";
/// Used when the prescription request itself failed.
pub const PRESCRIPTION_FALLBACK_MESSAGE: &str = "Failed to digitize prescription.";

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference transport failed: {0}")]
    Transport(String),
    #[error("inference service returned an empty response")]
    EmptyResponse,
    #[error("malformed inference response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPart {
    pub name: String,
    pub mime: String,
    /// Base64 payload without a data-URL prefix.
    pub data: String,
}

impl MediaPart {
    pub fn from_asset(asset: &MediaAsset) -> Self {
        Self {
            name: asset.name.clone(),
            mime: asset.mime.clone(),
            data: base64::engine::general_purpose::STANDARD.encode(&asset.bytes),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub narrative: String,
    pub metadata: String,
    pub language: Language,
    pub media: Vec<MediaPart>,
}

impl AnalysisRequest {
    pub fn new(
        narrative: String,
        metadata: String,
        language: Language,
        assets: &[MediaAsset],
    ) -> Self {
        Self {
            narrative,
            metadata,
            language,
            media: assets.iter().map(MediaPart::from_asset).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// The remote analysis gateway. One implementation speaks HTTP; tests
/// substitute scripted fakes. Calls have no client-side timeout: in the
/// field they resolve or reject on the network's own terms.
#[async_trait]
pub trait InferenceService: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, InferenceError>;

    async fn chat(
        &self,
        history: &[ChatTurn],
        message: &str,
        language: Language,
    ) -> Result<String, InferenceError>;

    /// Returns a data-URL image, or `None` when the gateway declines the
    /// prompt. Best-effort; callers never block a flow on it.
    async fn generate_diagram(&self, prompt: &str) -> Result<Option<String>, InferenceError>;

    async fn transcribe_prescription(&self, image: &MediaPart) -> Result<String, InferenceError>;
}
