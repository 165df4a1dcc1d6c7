//! Fixed instructions and response schemas sent with every gateway call.
//!
//! Schemas use the gateway's OpenAPI subset (`OBJECT`, `ARRAY`, `STRING`,
//! `INTEGER`). The required lists here are the same ones `validate` enforces
//! on the way back.

use serde_json::{json, Value};

use crate::analysis::{RiskLevel, RiskStatus, Urgency};

pub const DEFAULT_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_THINKING_BUDGET: u32 = 2048;

pub const ANALYSIS_REQUIRED_FIELDS: &[&str] = &[
    "riskLevel",
    "urgency",
    "summary",
    "possibleConditions",
    "recommendations",
    "doctorSummary",
    "disclaimer",
    "medications",
    "interactions",
    "riskScores",
    "glossary",
];

pub const CONDITION_REQUIRED_FIELDS: &[&str] = &[
    "name",
    "overview",
    "symptoms",
    "causes",
    "diagnosis",
    "treatment",
    "prevention",
];

pub const SYSTEM_INSTRUCTION: &str = r#"You are a multimodal AI health triage assistant.

MISSION:
Analyze text symptoms, voice recordings, and medical images (lab reports, prescriptions, x-rays, visible symptoms) to provide a holistic health assessment.

TASKS:
1. Emergency detection: check for life-threatening symptoms first. If detected, set riskLevel to 'Critical', urgency to 'Immediate', and provide emergencyInstructions.
2. Handwritten OCR: decipher handwritten prescriptions and extract medication names accurately.
3. Triage and risk: assess riskLevel and urgency.
4. Diagnosis: identify 3-5 possible conditions.
5. Medication analysis: identify medications, explain the likely rationale for each, mention common alternatives (educational only), and check for interactions.
6. Report analysis and prediction: interpret key lab values, predict potential future trends or risks, and suggest specific follow-up lab tests.
7. Risk dashboard: generate 3-4 relevant health risk scores (0-100).
8. Translator: simplify medical jargon in a glossary.
9. Clinical summary: write a professional SBAR summary in doctorSummary.
10. Follow-up: suggest 3 relevant follow-up questions.

RULES:
1. You are not a doctor. Always state that this is an AI assessment.
2. Return JSON only, matching the response schema.
3. Cross-reference all provided inputs."#;

fn string() -> Value {
    json!({ "type": "STRING" })
}

fn string_array() -> Value {
    json!({ "type": "ARRAY", "items": { "type": "STRING" } })
}

fn string_enum(values: &[&str]) -> Value {
    json!({ "type": "STRING", "enum": values })
}

pub fn analysis_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "riskLevel": string_enum(&RiskLevel::ALL),
            "urgency": string_enum(&Urgency::ALL),
            "summary": string(),
            "labAnalysis": string(),
            "labPredictions": string_array(),
            "suggestedFollowUpTests": string_array(),
            "possibleConditions": string_array(),
            "recommendations": string_array(),
            "doctorSummary": string(),
            "disclaimer": string(),
            "emergencyInstructions": string_array(),
            "medications": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": string(),
                        "purpose": string(),
                        "sideEffects": string(),
                        "warnings": string(),
                        "rationale": string(),
                        "alternatives": string(),
                    },
                    "required": ["name", "purpose", "sideEffects", "warnings"],
                }
            },
            "interactions": string_array(),
            "riskScores": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "category": string(),
                        "score": { "type": "INTEGER" },
                        "status": string_enum(&RiskStatus::ALL),
                    },
                    "required": ["category", "score", "status"],
                }
            },
            "glossary": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "term": string(),
                        "definition": string(),
                    },
                    "required": ["term", "definition"],
                }
            },
            "followUpQuestions": string_array(),
        },
        "required": ANALYSIS_REQUIRED_FIELDS,
    })
}

pub fn condition_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "name": string(),
            "overview": string(),
            "symptoms": string_array(),
            "causes": string_array(),
            "diagnosis": string(),
            "treatment": string_array(),
            "prevention": string_array(),
        },
        "required": CONDITION_REQUIRED_FIELDS,
    })
}

pub fn condition_lookup_prompt(condition: &str) -> String {
    format!(
        "Provide a comprehensive medical knowledge base article for the condition: \"{}\".\n\
         Ensure the language is accessible to a general audience but clinically accurate.\n\
         If the input is not a recognized medical condition, provide the closest match or a \
         generic explanation of why it might not be found in the 'overview' and 'name' fields.",
        condition.trim()
    )
}
