use serde::{Deserialize, Serialize};

use crate::media::MediaAttachment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [&'static str; 4] = ["Low", "Moderate", "High", "Critical"];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Urgency {
    Immediate,
    #[serde(rename = "Within 24 hours")]
    Within24Hours,
    Routine,
}

impl Urgency {
    pub const ALL: [&'static str; 3] = ["Immediate", "Within 24 hours", "Routine"];

    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::Immediate => "Immediate",
            Urgency::Within24Hours => "Within 24 hours",
            Urgency::Routine => "Routine",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskStatus {
    Normal,
    Elevated,
    High,
    Critical,
}

impl RiskStatus {
    pub const ALL: [&'static str; 4] = ["Normal", "Elevated", "High", "Critical"];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskStatus::Normal => "Normal",
            RiskStatus::Elevated => "Elevated",
            RiskStatus::High => "High",
            RiskStatus::Critical => "Critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub name: String,
    pub purpose: String,
    pub side_effects: String,
    pub warnings: String,
    /// Why the drug was likely prescribed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskScore {
    pub category: String,
    /// 0..=100
    pub score: u8,
    pub status: RiskStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermDefinition {
    pub term: String,
    pub definition: String,
}

/// Structured triage document returned by the model for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub risk_level: RiskLevel,
    pub urgency: Urgency,
    pub summary: String,
    pub possible_conditions: Vec<String>,
    pub recommendations: Vec<String>,
    pub doctor_summary: String,
    pub disclaimer: String,
    pub medications: Vec<Medication>,
    pub interactions: Vec<String>,
    pub risk_scores: Vec<RiskScore>,
    pub glossary: Vec<TermDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_instructions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lab_analysis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lab_predictions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_follow_up_tests: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_questions: Option<Vec<String>>,
}

impl AnalysisResult {
    pub fn is_critical(&self) -> bool {
        self.risk_level == RiskLevel::Critical
    }

    pub fn follow_up_questions(&self) -> &[String] {
        self.follow_up_questions.as_deref().unwrap_or_default()
    }
}

/// One submission: free text, attachments in completion order, and an
/// optional voice recording sent last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub free_text: Option<String>,
    pub attachments: Vec<MediaAttachment>,
    pub audio: Option<MediaAttachment>,
}

impl AnalysisRequest {
    pub fn new(
        free_text: Option<String>,
        attachments: Vec<MediaAttachment>,
        audio: Option<MediaAttachment>,
    ) -> Self {
        Self {
            free_text: free_text.filter(|text| !text.trim().is_empty()),
            attachments,
            audio,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Some(text.into()), Vec::new(), None)
    }

    pub fn is_empty(&self) -> bool {
        self.free_text
            .as_deref()
            .map(|text| text.trim().is_empty())
            .unwrap_or(true)
            && self.attachments.is_empty()
            && self.audio.is_none()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn urgency_uses_display_strings_on_the_wire() -> anyhow::Result<()> {
        let value = serde_json::to_value(Urgency::Within24Hours)?;
        assert_eq!(value, json!("Within 24 hours"));
        let parsed: Urgency = serde_json::from_value(json!("Routine"))?;
        assert_eq!(parsed, Urgency::Routine);
        Ok(())
    }

    #[test]
    fn optional_sections_are_omitted_when_absent() -> anyhow::Result<()> {
        let result = AnalysisResult {
            risk_level: RiskLevel::Low,
            urgency: Urgency::Routine,
            summary: "Mild cold".to_string(),
            possible_conditions: vec!["Common cold".to_string()],
            recommendations: Vec::new(),
            doctor_summary: String::new(),
            disclaimer: "Not a doctor".to_string(),
            medications: Vec::new(),
            interactions: Vec::new(),
            risk_scores: Vec::new(),
            glossary: Vec::new(),
            emergency_instructions: None,
            lab_analysis: None,
            lab_predictions: None,
            suggested_follow_up_tests: None,
            follow_up_questions: None,
        };
        let value = serde_json::to_value(&result)?;
        assert_eq!(value["riskLevel"], json!("Low"));
        assert!(value.get("emergencyInstructions").is_none());
        assert!(value.get("labAnalysis").is_none());
        assert_eq!(value["possibleConditions"], json!(["Common cold"]));
        assert!(result.follow_up_questions().is_empty());
        Ok(())
    }

    #[test]
    fn whitespace_only_text_counts_as_no_input() {
        assert!(AnalysisRequest::new(Some("   ".to_string()), Vec::new(), None).is_empty());
        assert!(AnalysisRequest::default().is_empty());
        assert!(!AnalysisRequest::text("headache").is_empty());
        let audio_only = AnalysisRequest::new(
            None,
            Vec::new(),
            Some(MediaAttachment::recorded_audio(b"RIFF", None)),
        );
        assert!(!audio_only.is_empty());
    }
}
