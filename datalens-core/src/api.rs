//! HTTP transport for the analysis API.
//!
//! `ApiClient` is the only component that talks to the backend. It folds the
//! three ways a call can go wrong into [`ApiError`]:
//! - **transport**: the request never completed or the body was not JSON
//! - **status**: a non-success HTTP status (body `message`/`error` kept when present)
//! - **remote**: a 2xx body carrying an `error` field
//!
//! Missing fields are not errors; the wire types default them.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::config::ApiConfig;
use crate::models::{
    ChatAnswer, ChatRequest, DashboardSummary, FullDocumentation, OutlierReasoning,
    OutlierReasoningRequest, QualityReport, SchemaMap, TableAiSummary, UploadFile, UploadResponse,
};

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("API error ({code}): {}", message.as_deref().unwrap_or("no details"))]
    Status { code: u16, message: Option<String> },

    #[error("Backend error: {0}")]
    Remote(String),
}

impl ApiError {
    /// True when the backend could not be reached or answered garbage.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Http(_) | ApiError::Decode(_))
    }

    /// Human-readable message supplied by the backend, if any.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } => message.as_deref(),
            ApiError::Remote(message) => Some(message.as_str()),
            ApiError::Http(_) | ApiError::Decode(_) => None,
        }
    }
}

/// Pull a `message` or `error` string out of an error body, falling back to
/// the raw text when the body is not JSON.
fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => ["message", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
            .map(str::to_string),
        Err(_) => Some(trimmed.to_string()),
    }
}

// ============================================================================
// ApiClient
// ============================================================================

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let base_url: String = base_url.into();
        Ok(Self {
            client: Client::builder().build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Decode a response, classifying status and `error`-field failures.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = extract_message(&body);
            tracing::warn!(code = status.as_u16(), message = ?message, "Analysis API returned an error status");
            return Err(ApiError::Status {
                code: status.as_u16(),
                message,
            });
        }

        let value: serde_json::Value = serde_json::from_str(&body)?;
        if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
            tracing::warn!(error = %error, "Analysis API reported an error payload");
            return Err(ApiError::Remote(error.to_string()));
        }

        Ok(serde_json::from_value(value)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.client.get(self.url(path)).send().await?;
        Self::decode(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::decode(response).await
    }

    // ------------------------------------------------------------------------
    // Endpoints
    // ------------------------------------------------------------------------

    /// `POST /reset` clears server-held data. Only the status matters.
    pub async fn reset(&self) -> Result<(), ApiError> {
        let response = self.client.post(self.url("/reset")).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            code: status.as_u16(),
            message: extract_message(&body),
        })
    }

    /// `POST /upload`: multipart with an `append` flag and one `files` part
    /// per file. `append` is sent as `"true"` / `"false"`.
    pub async fn upload(
        &self,
        files: &[UploadFile],
        append: bool,
    ) -> Result<UploadResponse, ApiError> {
        let mut form = Form::new().text("append", append.to_string());
        for file in files {
            let part = Part::bytes(file.content.to_vec()).file_name(file.name.clone());
            form = form.part("files", part);
        }

        let response = self
            .client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn dashboard(&self) -> Result<DashboardSummary, ApiError> {
        self.get_json("/dashboard").await
    }

    pub async fn schema(&self) -> Result<SchemaMap, ApiError> {
        self.get_json("/schema").await
    }

    pub async fn quality(&self, table: &str) -> Result<QualityReport, ApiError> {
        self.get_json(&format!("/quality/{}", urlencoding::encode(table)))
            .await
    }

    pub async fn full_docs(&self) -> Result<FullDocumentation, ApiError> {
        self.get_json("/full-docs").await
    }

    pub async fn table_summary(&self, table: &str) -> Result<TableAiSummary, ApiError> {
        self.get_json(&format!("/summary/{}", urlencoding::encode(table)))
            .await
    }

    pub async fn outlier_reasoning(
        &self,
        request: &OutlierReasoningRequest,
    ) -> Result<OutlierReasoning, ApiError> {
        self.post_json("/outlier-reasoning", request).await
    }

    pub async fn chat(&self, question: &str) -> Result<ChatAnswer, ApiError> {
        self.post_json("/chat", &ChatRequest { question }).await
    }
}

// ============================================================================
// TESTS
// ============================================================================
