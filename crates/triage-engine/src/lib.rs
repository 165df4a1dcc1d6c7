pub mod builders;
pub mod config;
pub mod dryrun;
pub mod gateway;
pub mod gemini;

use std::time::Instant;

use anyhow::Context;
use serde_json::{json, Map, Value};
use triage_contracts::events::{attachment_summary, EventPayload, EventWriter};
use triage_contracts::{
    AnalysisRequest, AnalysisResult, ConditionDetails, HistoryStore, ProfileTable, Result,
    TriageError,
};

pub use config::TriageConfig;
pub use dryrun::DryrunGateway;
pub use gateway::{ContentPart, GatewayRegistry, GatewayRequest, GatewayResponse, ModelGateway};
pub use gemini::GeminiGateway;

pub fn default_gateway_registry(config: &TriageConfig) -> anyhow::Result<GatewayRegistry> {
    let mut gateways = GatewayRegistry::new();
    gateways.register(DryrunGateway);
    gateways.register(GeminiGateway::new(
        Some(&config.api_base),
        config.api_key.clone(),
        config.request_timeout,
    )?);
    Ok(gateways)
}

/// Runs analyses and lookups against the selected gateway, records each
/// successful analysis in the history log, and writes session events.
pub struct TriageEngine {
    gateways: GatewayRegistry,
    gateway: String,
    model: String,
    thinking_budget: u32,
    history: HistoryStore,
    events: EventWriter,
    profiles: ProfileTable,
}

impl TriageEngine {
    pub fn new(config: &TriageConfig) -> anyhow::Result<Self> {
        Self::with_gateways(config, default_gateway_registry(config)?)
    }

    pub fn with_gateways(config: &TriageConfig, gateways: GatewayRegistry) -> anyhow::Result<Self> {
        if gateways.get(&config.gateway).is_none() {
            return Err(TriageError::UnknownGateway(config.gateway.clone()).into());
        }
        std::fs::create_dir_all(&config.home)
            .with_context(|| format!("failed creating {}", config.home.display()))?;
        let session_id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(session_id = %session_id, home = %config.home.display(), "engine ready");
        Ok(Self {
            gateways,
            gateway: config.gateway.clone(),
            model: config.model.clone(),
            thinking_budget: config.thinking_budget,
            history: HistoryStore::new(config.history_path()),
            events: EventWriter::new(config.events_path(), session_id),
            profiles: ProfileTable::load_or_default(&config.profiles_path()),
        })
    }

    pub fn gateway_name(&self) -> &str {
        &self.gateway
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn profiles(&self) -> &ProfileTable {
        &self.profiles
    }

    pub fn event_writer(&self) -> EventWriter {
        self.events.clone()
    }

    /// Analyzes one submission for `profile_id` and appends the result to
    /// history. A failed history write is logged and does not fail the
    /// analysis.
    pub fn analyze(&self, profile_id: &str, request: &AnalysisRequest) -> Result<AnalysisResult> {
        if self.profiles.get(profile_id).is_none() {
            return Err(TriageError::UnknownProfile(profile_id.to_string()));
        }
        if request.is_empty() {
            return Err(TriageError::NoInput);
        }
        let gateway = self.active_gateway()?;

        self.emit(
            "analysis_started",
            json!({
                "profile_id": profile_id,
                "gateway": gateway.name(),
                "model": self.model,
                "text_chars": request.free_text.as_deref().map(|text| text.chars().count()).unwrap_or(0),
                "attachments": request.attachments.iter().map(attachment_summary).collect::<Vec<Value>>(),
                "audio": request.audio.as_ref().map(attachment_summary),
            }),
        );
        let started = Instant::now();
        let outcome =
            builders::analyze(gateway, &self.model, request, Some(self.thinking_budget));
        let latency_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(result) => {
                let history_id = match self.history.append(&result, profile_id) {
                    Ok(item) => Some(item.id),
                    Err(err) => {
                        tracing::warn!(error = %format!("{err:#}"), "history append failed");
                        None
                    }
                };
                tracing::info!(
                    profile_id,
                    risk_level = result.risk_level.as_str(),
                    latency_ms,
                    "analysis completed"
                );
                self.emit(
                    "analysis_completed",
                    json!({
                        "profile_id": profile_id,
                        "risk_level": result.risk_level.as_str(),
                        "urgency": result.urgency.as_str(),
                        "history_id": history_id,
                        "latency_ms": latency_ms,
                    }),
                );
                Ok(result)
            }
            Err(err) => {
                self.emit(
                    "analysis_failed",
                    json!({
                        "profile_id": profile_id,
                        "error": err.to_string(),
                        "latency_ms": latency_ms,
                    }),
                );
                Err(err)
            }
        }
    }

    pub fn lookup(&self, condition: &str) -> Result<ConditionDetails> {
        let gateway = self.active_gateway()?;
        match builders::lookup(gateway, &self.model, condition) {
            Ok(details) => {
                self.emit(
                    "lookup_completed",
                    json!({ "condition": condition.trim(), "name": details.name }),
                );
                Ok(details)
            }
            Err(err) => {
                if !err.is_local() {
                    self.emit(
                        "lookup_failed",
                        json!({ "condition": condition.trim(), "error": err.to_string() }),
                    );
                }
                Err(err)
            }
        }
    }

    /// Removes every history item for `profile_id`. Callers confirm with the
    /// user first.
    pub fn clear_history(&self, profile_id: &str) -> anyhow::Result<usize> {
        let removed = self.history.clear_for(profile_id)?;
        self.emit(
            "history_cleared",
            json!({ "profile_id": profile_id, "removed": removed }),
        );
        Ok(removed)
    }

    fn active_gateway(&self) -> Result<&dyn ModelGateway> {
        self.gateways
            .get(&self.gateway)
            .ok_or_else(|| TriageError::UnknownGateway(self.gateway.clone()))
    }

    fn emit(&self, event_type: &str, payload: Value) {
        if let Err(err) = self.events.emit(event_type, map_object(payload)) {
            tracing::warn!(event_type, error = %format!("{err:#}"), "event write failed");
        }
    }
}

fn map_object(value: Value) -> EventPayload {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use triage_contracts::presentation::{emergency_instructions, DEFAULT_EMERGENCY_INSTRUCTION};
    use triage_contracts::{MediaAttachment, RiskLevel};

    use super::*;
    use crate::builders::tests::{critical_document, RecordingGateway};

    fn config(home: &Path, gateway: &str) -> TriageConfig {
        TriageConfig {
            home: home.to_path_buf(),
            gateway: gateway.to_string(),
            ..TriageConfig::default()
        }
    }

    fn engine_with(home: &Path, gateway: RecordingGateway) -> anyhow::Result<TriageEngine> {
        let mut gateways = GatewayRegistry::new();
        gateways.register(gateway);
        TriageEngine::with_gateways(&config(home, "recording"), gateways)
    }

    fn event_types(path: &Path) -> anyhow::Result<Vec<String>> {
        Ok(std::fs::read_to_string(path)?
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter_map(|event| event["type"].as_str().map(str::to_string))
            .collect())
    }

    #[test]
    fn critical_result_gets_default_instruction_and_history_entry() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let engine = engine_with(temp.path(), RecordingGateway::replying(critical_document()))?;

        let result = engine.analyze(
            "p2",
            &AnalysisRequest::text("I have chest pain and shortness of breath"),
        )?;
        assert_eq!(
            emergency_instructions(&result),
            Some(vec![DEFAULT_EMERGENCY_INSTRUCTION.to_string()])
        );

        let items = engine.history().list_for("p2");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].risk_level, RiskLevel::Critical);
        assert_eq!(items[0].full_result, result);
        assert!(engine.history().list_for("p1").is_empty());

        assert_eq!(
            event_types(&temp.path().join("events.jsonl"))?,
            vec!["analysis_started", "analysis_completed"]
        );
        Ok(())
    }

    #[test]
    fn failures_leave_history_untouched() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let engine = engine_with(temp.path(), RecordingGateway::failing("quota exceeded"))?;
        let err = engine.analyze("p1", &AnalysisRequest::text("cough")).err();
        assert_eq!(err, Some(TriageError::Gateway("quota exceeded".to_string())));
        assert!(engine.history().list_for("p1").is_empty());
        assert_eq!(
            event_types(&temp.path().join("events.jsonl"))?,
            vec!["analysis_started", "analysis_failed"]
        );
        Ok(())
    }

    #[test]
    fn local_rejections_skip_the_gateway() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let engine = engine_with(temp.path(), RecordingGateway::replying(critical_document()))?;
        assert_eq!(
            engine.analyze("p1", &AnalysisRequest::default()).err(),
            Some(TriageError::NoInput)
        );
        assert_eq!(
            engine.analyze("p9", &AnalysisRequest::text("cough")).err(),
            Some(TriageError::UnknownProfile("p9".to_string()))
        );
        assert!(!temp.path().join("events.jsonl").exists());
        Ok(())
    }

    #[test]
    fn event_log_never_contains_media_payload() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let engine = engine_with(temp.path(), RecordingGateway::replying(critical_document()))?;
        let scan = MediaAttachment::from_bytes("image/png", "scan.png", b"secret-pixels");
        engine.analyze(
            "p1",
            &AnalysisRequest::new(None, vec![scan.clone()], None),
        )?;
        let log = std::fs::read_to_string(temp.path().join("events.jsonl"))?;
        assert!(!log.contains(scan.data()));
        assert!(log.contains(&scan.digest()));
        Ok(())
    }

    #[test]
    fn clear_history_only_touches_one_profile() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let engine = engine_with(temp.path(), RecordingGateway::replying(critical_document()))?;
        engine.analyze("p1", &AnalysisRequest::text("a"))?;
        engine.analyze("p2", &AnalysisRequest::text("b"))?;
        engine.analyze("p1", &AnalysisRequest::text("c"))?;

        assert_eq!(engine.clear_history("p1")?, 2);
        assert!(engine.history().list_for("p1").is_empty());
        assert_eq!(engine.history().list_for("p2").len(), 1);
        Ok(())
    }

    #[test]
    fn dryrun_gateway_works_end_to_end() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let engine = TriageEngine::new(&config(temp.path(), "dryrun"))?;
        let details = engine.lookup("Asthma")?;
        assert_eq!(details.name, "Asthma");
        let result = engine.analyze("p1", &AnalysisRequest::text("mild headache"))?;
        assert_eq!(result.risk_level, RiskLevel::Low);
        Ok(())
    }

    #[test]
    fn unreachable_gateway_keeps_the_key_out_of_messages_and_log() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let engine = TriageEngine::new(&TriageConfig {
            api_key: Some("SECRET-KEY-123".to_string()),
            api_base: "http://127.0.0.1:1/v1beta".to_string(),
            request_timeout: Some(std::time::Duration::from_secs(5)),
            ..config(temp.path(), "gemini")
        })?;
        let err = match engine.analyze("p1", &AnalysisRequest::text("cough")) {
            Err(err @ TriageError::Gateway(_)) => err,
            other => panic!("expected a gateway error, got {other:?}"),
        };
        assert!(!err.user_message().contains("SECRET-KEY-123"));
        assert!(!err.to_string().contains("SECRET-KEY-123"));

        let log = std::fs::read_to_string(temp.path().join("events.jsonl"))?;
        assert!(log.contains("analysis_failed"));
        assert!(!log.contains("SECRET-KEY-123"));
        Ok(())
    }

    #[test]
    fn unknown_gateway_is_rejected_at_startup() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let err = TriageEngine::new(&config(temp.path(), "openai")).err();
        let message = err.map(|err| err.to_string()).unwrap_or_default();
        assert_eq!(message, "Unknown gateway 'openai'.");
        Ok(())
    }
}
