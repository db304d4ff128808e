//! Clients for the external render and placeholder-extraction microservice.
//!
//! The renderer merges a template binary with a flat data dictionary and
//! returns PDF + DOCX payloads. The extractor reports the substitution
//! tokens a template contains; its JSON response is passed through to the
//! caller verbatim.

use crate::error::DocumentError;
use async_trait::async_trait;
use base64::Engine;
use std::collections::HashMap;
use std::env;
use std::path::Path;

/// Both rendered payloads. A response missing either one is a protocol
/// violation, never a partial success.
pub struct RenderedArtifacts {
    pub pdf: Vec<u8>,
    pub docx: Vec<u8>,
}

#[async_trait]
pub trait DocumentRenderer {
    async fn render(
        &self,
        template_path: &Path,
        data: &HashMap<String, serde_json::Value>,
    ) -> Result<RenderedArtifacts, DocumentError>;
}

#[async_trait]
pub trait PlaceholderExtractor {
    async fn extract(
        &self,
        filename: &str,
        file_data: Vec<u8>,
    ) -> Result<serde_json::Value, DocumentError>;
}

#[derive(Debug, Clone)]
pub struct RenderServiceConfig {
    pub base_url: String,
}

impl RenderServiceConfig {
    pub fn from_env() -> Result<Self, String> {
        let base_url = env::var("RENDERER_SERVICE_URL")
            .map_err(|_| "RENDERER_SERVICE_URL must be set".to_string())?;
        Ok(RenderServiceConfig { base_url })
    }
}

/// Wire format of a render response.
#[derive(serde::Deserialize)]
struct RenderResponse {
    success: bool,
    error: Option<String>,
    pdf_b64: Option<String>,
    docx_b64: Option<String>,
}

pub struct RenderService {
    config: RenderServiceConfig,
    client: reqwest::Client,
}

impl RenderService {
    pub fn new(config: RenderServiceConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl DocumentRenderer for RenderService {
    async fn render(
        &self,
        template_path: &Path,
        data: &HashMap<String, serde_json::Value>,
    ) -> Result<RenderedArtifacts, DocumentError> {
        let template_bytes = tokio::fs::read(template_path)
            .await
            .map_err(|e| DocumentError::Render(format!("failed to read template file: {}", e)))?;

        let data_json = serde_json::to_string(data)
            .map_err(|e| DocumentError::Render(format!("failed to encode data dictionary: {}", e)))?;

        let filename = template_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("template.docx")
            .to_string();

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(template_bytes).file_name(filename),
            )
            .text("data", data_json);

        let response = self
            .client
            .post(format!("{}/render", self.config.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| DocumentError::Render(format!("renderer unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(DocumentError::Render(format!(
                "renderer returned status {}",
                response.status()
            )));
        }

        let body: RenderResponse = response
            .json()
            .await
            .map_err(|e| DocumentError::Render(format!("malformed renderer response: {}", e)))?;

        if !body.success {
            let message = body
                .error
                .unwrap_or_else(|| "renderer reported failure without a message".to_string());
            return Err(DocumentError::Render(message));
        }

        // Both payloads are mandatory; a half-filled response is treated as
        // a protocol violation.
        let (pdf_b64, docx_b64) = match (body.pdf_b64, body.docx_b64) {
            (Some(pdf), Some(docx)) => (pdf, docx),
            _ => {
                return Err(DocumentError::Render(
                    "renderer response missing pdf or docx payload".to_string(),
                ))
            }
        };

        let engine = base64::engine::general_purpose::STANDARD;
        let pdf = engine
            .decode(pdf_b64)
            .map_err(|e| DocumentError::Render(format!("invalid pdf payload: {}", e)))?;
        let docx = engine
            .decode(docx_b64)
            .map_err(|e| DocumentError::Render(format!("invalid docx payload: {}", e)))?;

        Ok(RenderedArtifacts { pdf, docx })
    }
}

#[async_trait]
impl PlaceholderExtractor for RenderService {
    async fn extract(
        &self,
        filename: &str,
        file_data: Vec<u8>,
    ) -> Result<serde_json::Value, DocumentError> {
        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(file_data).file_name(filename.to_string()),
        );

        let response = self
            .client
            .post(format!("{}/extract-placeholders", self.config.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| DocumentError::Render(format!("extractor unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(DocumentError::Render(format!(
                "extractor returned status {}",
                response.status()
            )));
        }

        // Passed through verbatim; the shape is owned by the microservice.
        response
            .json()
            .await
            .map_err(|e| DocumentError::Render(format!("malformed extractor response: {}", e)))
    }
}
