use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Map, Value};

use crate::gateway::{GatewayRequest, GatewayResponse, ModelGateway};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
/// The key travels as a header so it never appears in a request URL.
const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiGateway {
    api_base: String,
    api_key: Option<String>,
    http: HttpClient,
}

impl GeminiGateway {
    /// `timeout` of `None` leaves request lifetime to the remote service.
    pub fn new(
        api_base: Option<&str>,
        api_key: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_base = api_base
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("failed building Gemini HTTP client")?;
        Ok(Self {
            api_base,
            api_key: api_key.filter(|value| !value.trim().is_empty()),
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

    fn build_payload(request: &GatewayRequest) -> Value {
        let mut payload = Map::new();
        payload.insert(
            "contents".to_string(),
            Value::Array(vec![json!({
                "role": "user",
                "parts": request.parts.iter().map(|part| part.to_json()).collect::<Vec<Value>>(),
            })]),
        );
        if let Some(instruction) = request.system_instruction.as_deref() {
            payload.insert(
                "systemInstruction".to_string(),
                json!({ "parts": [{ "text": instruction }] }),
            );
        }

        let mut generation_config = Map::new();
        generation_config.insert(
            "responseMimeType".to_string(),
            Value::String("application/json".to_string()),
        );
        generation_config.insert("responseSchema".to_string(), request.response_schema.clone());
        if let Some(budget) = request.thinking_budget {
            generation_config.insert(
                "thinkingConfig".to_string(),
                json!({ "thinkingBudget": budget }),
            );
        }
        payload.insert(
            "generationConfig".to_string(),
            Value::Object(generation_config),
        );
        Value::Object(payload)
    }

    fn extract_text(response_payload: &Value) -> Result<Option<String>> {
        let candidates = response_payload
            .get("candidates")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        if candidates.is_empty() {
            if let Some(reason) = response_payload
                .get("promptFeedback")
                .and_then(|feedback| feedback.get("blockReason"))
                .and_then(Value::as_str)
            {
                bail!("Gemini blocked the request ({reason})");
            }
            return Ok(None);
        }

        let text: String = candidates[0]
            .get("content")
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter(|part| !part.get("thought").and_then(Value::as_bool).unwrap_or(false))
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(text))
    }
}

impl ModelGateway for GeminiGateway {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(&self, request: &GatewayRequest) -> Result<GatewayResponse> {
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("GEMINI_API_KEY or GOOGLE_API_KEY or API_KEY not set");
        };
        let endpoint = self.endpoint_for_model(&request.model);
        let payload = Self::build_payload(request);

        tracing::debug!(endpoint = %endpoint, parts = request.parts.len(), "sending Gemini request");
        let response = self
            .http
            .post(&endpoint)
            .header(API_KEY_HEADER, api_key)
            .json(&payload)
            .send()
            .map_err(|err| err.without_url())
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;
        let response_payload = read_gemini_reply(response)?;
        let text = Self::extract_text(&response_payload)?;

        let mut metadata = Map::new();
        metadata.insert("endpoint".to_string(), Value::String(endpoint));
        metadata.insert(
            "usage_metadata".to_string(),
            response_payload
                .get("usageMetadata")
                .cloned()
                .unwrap_or(Value::Null),
        );
        if let Some(version) = response_payload.get("modelVersion").cloned() {
            metadata.insert("model_version".to_string(), version);
        }
        Ok(GatewayResponse { text, metadata })
    }
}

/// Non-2xx replies become errors carrying the status and the service's own
/// `error.message` when the body has one.
fn read_gemini_reply(response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let body = response
        .text()
        .map_err(|err| err.without_url())
        .context("Gemini response body read failed")?;
    if status.is_success() {
        return serde_json::from_str(&body).context("Gemini returned invalid JSON payload");
    }
    let detail = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|payload| {
            payload
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or(body);
    bail!(
        "Gemini request failed ({}): {}",
        status.as_u16(),
        truncate_text(detail.trim(), 512)
    )
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::gateway::ContentPart;

    fn request() -> GatewayRequest {
        GatewayRequest {
            model: "gemini-3-pro-preview".to_string(),
            system_instruction: Some("triage persona".to_string()),
            parts: vec![
                ContentPart::Text("headache".to_string()),
                ContentPart::InlineData {
                    mime_type: "image/png".to_string(),
                    data: "AAEC".to_string(),
                },
            ],
            response_schema: json!({"type": "OBJECT"}),
            thinking_budget: Some(2048),
        }
    }

    #[test]
    fn endpoint_accepts_bare_and_prefixed_models() -> Result<()> {
        let gateway = GeminiGateway::new(Some("https://example.test/v1beta/"), None, None)?;
        assert_eq!(
            gateway.endpoint_for_model("gemini-3-pro-preview"),
            "https://example.test/v1beta/models/gemini-3-pro-preview:generateContent"
        );
        assert_eq!(
            gateway.endpoint_for_model("models/gemini-2.5-flash"),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
        Ok(())
    }

    #[test]
    fn payload_carries_schema_instruction_and_ordered_parts() {
        let payload = GeminiGateway::build_payload(&request());
        let parts = &payload["contents"][0]["parts"];
        assert_eq!(payload["contents"][0]["role"], json!("user"));
        assert_eq!(parts[0], json!({"text": "headache"}));
        assert_eq!(parts[1]["inlineData"]["mimeType"], json!("image/png"));
        assert_eq!(
            payload["systemInstruction"]["parts"][0]["text"],
            json!("triage persona")
        );
        let config = &payload["generationConfig"];
        assert_eq!(config["responseMimeType"], json!("application/json"));
        assert_eq!(config["responseSchema"], json!({"type": "OBJECT"}));
        assert_eq!(config["thinkingConfig"]["thinkingBudget"], json!(2048));
    }

    #[test]
    fn payload_omits_optional_sections() {
        let mut bare = request();
        bare.system_instruction = None;
        bare.thinking_budget = None;
        let payload = GeminiGateway::build_payload(&bare);
        assert!(payload.get("systemInstruction").is_none());
        assert!(payload["generationConfig"].get("thinkingConfig").is_none());
    }

    #[test]
    fn extract_text_joins_parts_and_skips_thoughts() -> Result<()> {
        let payload = json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "thinking...", "thought": true},
                    {"text": "{\"a\":"},
                    {"text": "1}"}
                ]}
            }]
        });
        assert_eq!(
            GeminiGateway::extract_text(&payload)?,
            Some("{\"a\":1}".to_string())
        );
        assert_eq!(GeminiGateway::extract_text(&json!({}))?, None);
        Ok(())
    }

    #[test]
    fn blocked_prompt_is_a_gateway_failure() {
        let payload = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = GeminiGateway::extract_text(&payload).err();
        assert!(err
            .map(|err| err.to_string().contains("SAFETY"))
            .unwrap_or(false));
    }

    #[test]
    fn missing_key_fails_before_any_request() -> Result<()> {
        let gateway = GeminiGateway::new(None, Some("  ".to_string()), None)?;
        let err = gateway.generate(&request()).err();
        assert!(err
            .map(|err| err.to_string().contains("GEMINI_API_KEY"))
            .unwrap_or(false));
        Ok(())
    }

    #[test]
    fn transport_errors_do_not_echo_the_key() -> Result<()> {
        let gateway = GeminiGateway::new(
            Some("http://127.0.0.1:1/v1beta"),
            Some("SECRET-KEY-123".to_string()),
            Some(Duration::from_secs(5)),
        )?;
        let message = gateway
            .generate(&request())
            .err()
            .map(|err| format!("{err:#}"))
            .unwrap_or_default();
        assert!(message.starts_with("Gemini request failed"));
        assert!(!message.contains("SECRET-KEY-123"));
        Ok(())
    }

    #[test]
    fn truncate_text_marks_cut() {
        assert_eq!(truncate_text("abcdef", 3), "abc…");
        assert_eq!(truncate_text("abc", 3), "abc");
    }
}
