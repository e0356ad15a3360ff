use async_trait::async_trait;
use doccore::{EngineError, ExtractConfig, Result, UploadedFile};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::collections::HashMap;

/// Outbound HTTP seam for everything a run talks to: the extraction service
/// and the connector / sheet-sink targets. Implementations perform exactly
/// one request per call; nothing here retries.
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Multipart request against the extraction service. Returns the raw
    /// response body as text; any transport or HTTP failure surfaces as
    /// `ExternalCall`.
    async fn extract(&self, config: &ExtractConfig, file: Option<&UploadedFile>)
        -> Result<String>;

    /// JSON-body request used by connector and sheet-sink nodes.
    async fn post_json(
        &self,
        url: &str,
        method: &str,
        headers: &HashMap<String, String>,
        body: &Value,
    ) -> Result<String>;
}

/// reqwest-backed implementation.
pub struct HttpDocumentService {
    client: reqwest::Client,
}

impl HttpDocumentService {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpDocumentService {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_method(method: &str) -> Result<reqwest::Method> {
    reqwest::Method::from_bytes(method.to_uppercase().as_bytes())
        .map_err(|_| EngineError::Config(format!("unsupported HTTP method: {}", method)))
}

fn call_failed(e: reqwest::Error) -> EngineError {
    EngineError::ExternalCall(e.to_string())
}

#[async_trait]
impl DocumentService for HttpDocumentService {
    async fn extract(
        &self,
        config: &ExtractConfig,
        file: Option<&UploadedFile>,
    ) -> Result<String> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| EngineError::Config("extract node has no URL configured".into()))?;

        let mut form = Form::new();
        for (key, value) in &config.form_fields {
            form = form.text(key.clone(), value.clone());
        }
        if let Some(file) = file.filter(|f| !f.is_empty()) {
            let file_name = if file.name.is_empty() {
                "file".to_string()
            } else {
                file.name.clone()
            };
            let mut part = Part::bytes(file.data.clone()).file_name(file_name);
            if let Some(content_type) = &file.content_type {
                part = part.mime_str(content_type).map_err(|e| {
                    EngineError::ExternalCall(format!(
                        "invalid content type {}: {}",
                        content_type, e
                    ))
                })?;
            }
            form = form.part(config.file_field_name().to_string(), part);
        }

        let method = parse_method(config.method())?;
        tracing::debug!("extraction call: {} {}", method, url);

        let response = self
            .client
            .request(method, url)
            .multipart(form)
            .send()
            .await
            .map_err(call_failed)?
            .error_for_status()
            .map_err(call_failed)?;

        response.text().await.map_err(call_failed)
    }

    async fn post_json(
        &self,
        url: &str,
        method: &str,
        headers: &HashMap<String, String>,
        body: &Value,
    ) -> Result<String> {
        let method = parse_method(method)?;
        tracing::debug!("json post: {} {}", method, url);

        let mut request = self.client.request(method, url).json(body);
        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request
            .send()
            .await
            .map_err(call_failed)?
            .error_for_status()
            .map_err(call_failed)?;

        response.text().await.map_err(call_failed)
    }
}
