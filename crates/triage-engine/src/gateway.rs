use std::collections::BTreeMap;

use anyhow::Result;
use serde_json::{json, Map, Value};
use triage_contracts::MediaAttachment;

/// One segment of a multimodal prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    InlineData { mime_type: String, data: String },
}

impl ContentPart {
    pub fn from_attachment(attachment: &MediaAttachment) -> Self {
        ContentPart::InlineData {
            mime_type: attachment.mime_type().to_string(),
            data: attachment.data().to_string(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ContentPart::Text(text) => json!({ "text": text }),
            ContentPart::InlineData { mime_type, data } => json!({
                "inlineData": {
                    "mimeType": mime_type,
                    "data": data,
                }
            }),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text(text) => Some(text),
            ContentPart::InlineData { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    pub model: String,
    pub system_instruction: Option<String>,
    pub parts: Vec<ContentPart>,
    pub response_schema: Value,
    pub thinking_budget: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct GatewayResponse {
    /// Concatenated text of the first candidate, if any.
    pub text: Option<String>,
    pub metadata: Map<String, Value>,
}

/// A hosted generative model: takes a multimodal prompt plus an output
/// schema and returns text that should be a JSON document.
pub trait ModelGateway: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, request: &GatewayRequest) -> Result<GatewayResponse>;
}

#[derive(Default)]
pub struct GatewayRegistry {
    gateways: BTreeMap<String, Box<dyn ModelGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<G: ModelGateway + 'static>(&mut self, gateway: G) {
        self.gateways
            .insert(gateway.name().to_string(), Box::new(gateway));
    }

    pub fn get(&self, name: &str) -> Option<&dyn ModelGateway> {
        self.gateways.get(name).map(|gateway| gateway.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.gateways.keys().cloned().collect()
    }
}
