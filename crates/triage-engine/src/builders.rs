//! Analysis Request Builder and Knowledge Lookup Builder.
//!
//! Both send one gateway call with a fixed response schema and hand the
//! returned text to the validators. Neither persists anything.

use triage_contracts::schema::{
    analysis_response_schema, condition_lookup_prompt, condition_response_schema,
    SYSTEM_INSTRUCTION,
};
use triage_contracts::validate::{parse_analysis_text, parse_condition_text};
use triage_contracts::{AnalysisRequest, AnalysisResult, ConditionDetails, Result, TriageError};

use crate::gateway::{ContentPart, GatewayRequest, GatewayResponse, ModelGateway};

/// Text first, then attachments in submission order, then the voice note.
pub fn build_analysis_parts(request: &AnalysisRequest) -> Vec<ContentPart> {
    let mut parts = Vec::with_capacity(request.attachments.len() + 2);
    if let Some(text) = request
        .free_text
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
    {
        parts.push(ContentPart::Text(text.to_string()));
    }
    parts.extend(request.attachments.iter().map(ContentPart::from_attachment));
    if let Some(audio) = request.audio.as_ref() {
        parts.push(ContentPart::from_attachment(audio));
    }
    parts
}

pub fn build_analysis_request(
    model: &str,
    request: &AnalysisRequest,
    thinking_budget: Option<u32>,
) -> Result<GatewayRequest> {
    if request.is_empty() {
        return Err(TriageError::NoInput);
    }
    Ok(GatewayRequest {
        model: model.to_string(),
        system_instruction: Some(SYSTEM_INSTRUCTION.to_string()),
        parts: build_analysis_parts(request),
        response_schema: analysis_response_schema(),
        thinking_budget,
    })
}

pub fn build_lookup_request(model: &str, condition: &str) -> Result<GatewayRequest> {
    if condition.trim().is_empty() {
        return Err(TriageError::EmptyCondition);
    }
    Ok(GatewayRequest {
        model: model.to_string(),
        system_instruction: None,
        parts: vec![ContentPart::Text(condition_lookup_prompt(condition))],
        response_schema: condition_response_schema(),
        thinking_budget: None,
    })
}

pub fn analyze(
    gateway: &dyn ModelGateway,
    model: &str,
    request: &AnalysisRequest,
    thinking_budget: Option<u32>,
) -> Result<AnalysisResult> {
    let gateway_request = build_analysis_request(model, request, thinking_budget)?;
    let response = call(gateway, &gateway_request)?;
    parse_analysis_text(response.text.as_deref()).inspect_err(|err| {
        tracing::warn!(gateway = gateway.name(), error = %err, "analysis response rejected");
    })
}

pub fn lookup(
    gateway: &dyn ModelGateway,
    model: &str,
    condition: &str,
) -> Result<ConditionDetails> {
    let gateway_request = build_lookup_request(model, condition)?;
    let response = call(gateway, &gateway_request)?;
    parse_condition_text(response.text.as_deref()).inspect_err(|err| {
        tracing::warn!(gateway = gateway.name(), error = %err, "lookup response rejected");
    })
}

fn call(gateway: &dyn ModelGateway, request: &GatewayRequest) -> Result<GatewayResponse> {
    gateway
        .generate(request)
        .map_err(|err| TriageError::Gateway(format!("{err:#}")))
}
