//! Field-by-field checks on model output before it is trusted as a typed
//! document.
//!
//! Required fields must be present with the declared type. Optional fields
//! may be absent or `null`. Unknown fields are ignored.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::analysis::{AnalysisResult, RiskLevel, RiskStatus, Urgency};
use crate::condition::ConditionDetails;
use crate::error::{Result, TriageError};

pub fn parse_analysis_text(text: Option<&str>) -> Result<AnalysisResult> {
    let value = parse_json_text(text)?;
    validate_analysis(&value)?;
    decode(value)
}

pub fn parse_condition_text(text: Option<&str>) -> Result<ConditionDetails> {
    let value = parse_json_text(text)?;
    validate_condition(&value)?;
    decode(value)
}

fn parse_json_text(text: Option<&str>) -> Result<Value> {
    let raw = text.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(violation("empty response from model"));
    }
    serde_json::from_str(raw).map_err(|err| violation(format!("response is not JSON: {err}")))
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|err| violation(err.to_string()))
}

fn violation(message: impl Into<String>) -> TriageError {
    TriageError::InvalidResponse(message.into())
}

pub fn validate_analysis(value: &Value) -> Result<()> {
    let root = object(value, "$")?;
    require_enum(root, "riskLevel", "riskLevel", &RiskLevel::ALL)?;
    require_enum(root, "urgency", "urgency", &Urgency::ALL)?;
    require_str(root, "summary", "summary")?;
    require_str_array(root, "possibleConditions", "possibleConditions")?;
    require_str_array(root, "recommendations", "recommendations")?;
    require_str(root, "doctorSummary", "doctorSummary")?;
    require_str(root, "disclaimer", "disclaimer")?;
    require_str_array(root, "interactions", "interactions")?;

    for (idx, row) in require_array(root, "medications", "medications")?
        .iter()
        .enumerate()
    {
        let path = format!("medications[{idx}]");
        let medication = object(row, &path)?;
        for key in ["name", "purpose", "sideEffects", "warnings"] {
            require_str(medication, key, &format!("{path}.{key}"))?;
        }
        for key in ["rationale", "alternatives"] {
            optional_str(medication, key, &format!("{path}.{key}"))?;
        }
    }

    for (idx, row) in require_array(root, "riskScores", "riskScores")?
        .iter()
        .enumerate()
    {
        let path = format!("riskScores[{idx}]");
        let score = object(row, &path)?;
        require_str(score, "category", &format!("{path}.category"))?;
        require_score(score, &format!("{path}.score"))?;
        require_enum(score, "status", &format!("{path}.status"), &RiskStatus::ALL)?;
    }

    for (idx, row) in require_array(root, "glossary", "glossary")?
        .iter()
        .enumerate()
    {
        let path = format!("glossary[{idx}]");
        let entry = object(row, &path)?;
        require_str(entry, "term", &format!("{path}.term"))?;
        require_str(entry, "definition", &format!("{path}.definition"))?;
    }

    optional_str(root, "labAnalysis", "labAnalysis")?;
    for key in [
        "emergencyInstructions",
        "labPredictions",
        "suggestedFollowUpTests",
        "followUpQuestions",
    ] {
        optional_str_array(root, key, key)?;
    }
    Ok(())
}

pub fn validate_condition(value: &Value) -> Result<()> {
    let root = object(value, "$")?;
    for key in ["name", "overview", "diagnosis"] {
        require_str(root, key, key)?;
    }
    for key in ["symptoms", "causes", "treatment", "prevention"] {
        require_str_array(root, key, key)?;
    }
    Ok(())
}

fn object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| violation(format!("`{path}` must be an object")))
}

fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|value| !value.is_null())
}

fn require<'a>(obj: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a Value> {
    present(obj, key).ok_or_else(|| violation(format!("required field `{path}` is missing")))
}

fn require_str<'a>(obj: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a str> {
    require(obj, key, path)?
        .as_str()
        .ok_or_else(|| violation(format!("field `{path}` must be a string")))
}

fn require_array<'a>(obj: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a [Value]> {
    require(obj, key, path)?
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| violation(format!("field `{path}` must be an array")))
}

fn require_str_array(obj: &Map<String, Value>, key: &str, path: &str) -> Result<()> {
    string_items(require_array(obj, key, path)?, path)
}

fn require_enum(obj: &Map<String, Value>, key: &str, path: &str, allowed: &[&str]) -> Result<()> {
    let value = require_str(obj, key, path)?;
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(violation(format!(
        "field `{path}` has unexpected value '{value}' (expected one of: {})",
        allowed.join(", ")
    )))
}

fn require_score(obj: &Map<String, Value>, path: &str) -> Result<()> {
    let value = require(obj, "score", path)?;
    match value.as_u64() {
        Some(score) if score <= 100 => Ok(()),
        Some(score) => Err(violation(format!(
            "field `{path}` is {score}, outside 0..=100"
        ))),
        None => Err(violation(format!(
            "field `{path}` must be an integer between 0 and 100"
        ))),
    }
}

fn optional_str(obj: &Map<String, Value>, key: &str, path: &str) -> Result<()> {
    match present(obj, key) {
        None | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(violation(format!("field `{path}` must be a string"))),
    }
}

fn optional_str_array(obj: &Map<String, Value>, key: &str, path: &str) -> Result<()> {
    match present(obj, key) {
        None => Ok(()),
        Some(Value::Array(rows)) => string_items(rows, path),
        Some(_) => Err(violation(format!("field `{path}` must be an array"))),
    }
}

fn string_items(rows: &[Value], path: &str) -> Result<()> {
    for (idx, row) in rows.iter().enumerate() {
        if !row.is_string() {
            return Err(violation(format!("field `{path}[{idx}]` must be a string")));
        }
    }
    Ok(())
}
