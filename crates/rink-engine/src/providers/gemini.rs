use anyhow::Context;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use rink_contracts::text::truncate_text;
use serde_json::{json, Map, Value};

use super::{ImageProvider, ProviderError, ProviderRequest, ProviderResponse, ResponsePart};
use crate::config::EngineConfig;

pub struct GeminiProvider {
    api_base: String,
    api_key: Option<String>,
    http: HttpClient,
}

impl GeminiProvider {
    pub fn new(config: &EngineConfig) -> anyhow::Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.request_timeout)
            .build()
            .context("failed to build Gemini HTTP client")?;
        Ok(Self {
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            http,
        })
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn build_payload(request: &ProviderRequest) -> Value {
        let mut parts = vec![json!({ "text": request.prompt })];
        if let Some(attachment) = request.attachment.as_ref() {
            parts.push(json!({
                "inlineData": {
                    "mimeType": attachment.mime_type,
                    "data": attachment.to_base64(),
                }
            }));
        }
        json!({
            "contents": [{
                "role": "user",
                "parts": parts,
            }],
            "generationConfig": {
                "responseModalities": ["TEXT", "IMAGE"],
                "imageConfig": {
                    "aspectRatio": request.aspect_ratio,
                },
            },
        })
    }

    /// Content parts of the first candidate, in response order.
    fn extract_parts(response_payload: &Value) -> Vec<ResponsePart> {
        let parts = response_payload
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut out = Vec::new();
        for part in parts {
            let inline = part
                .get("inlineData")
                .or_else(|| part.get("inline_data"))
                .and_then(Value::as_object);
            if let Some(inline) = inline {
                let data = inline
                    .get("data")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if !data.is_empty() {
                    out.push(ResponsePart::InlineImage {
                        mime_type: inline
                            .get("mimeType")
                            .or_else(|| inline.get("mime_type"))
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        data: data.to_string(),
                    });
                    continue;
                }
            }
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                out.push(ResponsePart::Text(text.to_string()));
            }
        }
        out
    }
}

impl ImageProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ProviderError::MissingCredential(
                "API Key is missing. Please check your configuration (GEMINI_API_KEY, GOOGLE_API_KEY or API_KEY)."
                    .to_string(),
            ));
        };
        let endpoint = self.endpoint_for_model(&request.model);
        let payload = Self::build_payload(request);

        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", api_key)])
            .json(&payload)
            .send()
            .map_err(|err| ProviderError::service(format!("Gemini request failed: {err}")))?;
        let response_payload = response_json_or_error(response)?;

        let mut provider_request = Map::new();
        provider_request.insert("endpoint".to_string(), Value::String(endpoint));
        provider_request.insert("model".to_string(), Value::String(request.model.clone()));
        provider_request.insert(
            "has_attachment".to_string(),
            Value::Bool(request.attachment.is_some()),
        );
        Ok(ProviderResponse {
            provider_request,
            parts: Self::extract_parts(&response_payload),
        })
    }
}

fn response_json_or_error(response: HttpResponse) -> Result<Value, ProviderError> {
    let status = response.status();
    let body = response
        .text()
        .map_err(|err| ProviderError::service(format!("Gemini response body read failed: {err}")))?;
    if !status.is_success() {
        return Err(ProviderError::service(service_error_message(
            status.as_u16(),
            &body,
        )));
    }
    serde_json::from_str(&body)
        .map_err(|err| ProviderError::service(format!("Gemini returned invalid JSON payload: {err}")))
}

/// Prefers the service's own `error.message`, then the raw body, then a generic label.
fn service_error_message(code: u16, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|payload| {
        payload
            .get("error")
            .and_then(|error| error.get("message"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .map(str::to_string)
    });
    let detail = from_json.unwrap_or_else(|| truncate_text(body.trim(), 512));
    if detail.is_empty() {
        return format!("Gemini request failed ({code})");
    }
    format!("Gemini request failed ({code}): {detail}")
}
