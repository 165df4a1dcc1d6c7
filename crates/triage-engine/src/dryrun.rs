use anyhow::Result;
use serde_json::{json, Map, Value};

use crate::gateway::{GatewayRequest, GatewayResponse, ModelGateway};

const EMERGENCY_KEYWORDS: &[&str] = &[
    "chest pain",
    "shortness of breath",
    "unconscious",
    "severe bleeding",
];

/// Offline gateway returning canned, schema-conforming documents. Used for
/// local runs without credentials and for end-to-end tests.
pub struct DryrunGateway;

impl ModelGateway for DryrunGateway {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate(&self, request: &GatewayRequest) -> Result<GatewayResponse> {
        let prompt: String = request
            .parts
            .iter()
            .filter_map(|part| part.as_text())
            .collect::<Vec<&str>>()
            .join("\n");
        let inline_parts = request
            .parts
            .iter()
            .filter(|part| part.as_text().is_none())
            .count();

        let document = if is_analysis_schema(&request.response_schema) {
            canned_analysis(&prompt, inline_parts)
        } else {
            canned_condition(&prompt)
        };

        let mut metadata = Map::new();
        metadata.insert("endpoint".to_string(), Value::String("dryrun-native".to_string()));
        metadata.insert("model".to_string(), Value::String(request.model.clone()));
        Ok(GatewayResponse {
            text: Some(document.to_string()),
            metadata,
        })
    }
}

fn is_analysis_schema(schema: &Value) -> bool {
    schema
        .get("properties")
        .and_then(|properties| properties.get("riskLevel"))
        .is_some()
}

fn canned_analysis(prompt: &str, inline_parts: usize) -> Value {
    let lowered = prompt.to_ascii_lowercase();
    let emergency = EMERGENCY_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword));
    let subject = if prompt.trim().is_empty() {
        format!("{inline_parts} attached file(s)")
    } else {
        prompt.trim().to_string()
    };

    if emergency {
        return json!({
            "riskLevel": "Critical",
            "urgency": "Immediate",
            "summary": format!("Reported symptoms suggest a possible emergency: {subject}"),
            "possibleConditions": ["Acute coronary syndrome", "Pulmonary embolism"],
            "recommendations": ["Call emergency services now", "Do not drive yourself"],
            "doctorSummary": format!("S: {subject}. B: unknown. A: possible emergency. R: immediate evaluation."),
            "disclaimer": "Dry-run output. Not medical advice.",
            "medications": [],
            "interactions": [],
            "riskScores": [{"category": "Cardiac", "score": 92, "status": "Critical"}],
            "glossary": [],
            "emergencyInstructions": ["Call your local emergency number.", "Stay with someone until help arrives."],
            "followUpQuestions": ["When did the symptoms start?"]
        });
    }

    json!({
        "riskLevel": "Low",
        "urgency": "Routine",
        "summary": format!("Symptoms appear mild: {subject}"),
        "possibleConditions": ["Viral illness"],
        "recommendations": ["Rest and fluids", "See a doctor if symptoms persist"],
        "doctorSummary": format!("S: {subject}. B: unknown. A: low risk. R: routine follow-up."),
        "disclaimer": "Dry-run output. Not medical advice.",
        "medications": [],
        "interactions": [],
        "riskScores": [{"category": "General", "score": 15, "status": "Normal"}],
        "glossary": [],
        "followUpQuestions": ["Do you have a fever?", "How long has this lasted?"]
    })
}

fn canned_condition(prompt: &str) -> Value {
    let name = prompt
        .split('"')
        .nth(1)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("Unknown condition");
    json!({
        "name": name,
        "overview": format!("{name} is described here for offline testing."),
        "symptoms": ["Varies by patient"],
        "causes": ["Varies"],
        "diagnosis": "Clinical assessment.",
        "treatment": ["Consult a clinician"],
        "prevention": ["General healthy habits"]
    })
}
