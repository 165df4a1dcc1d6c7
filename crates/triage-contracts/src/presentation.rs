//! Display rules that change what the user sees, independent of styling.

use crate::analysis::{AnalysisResult, RiskLevel};

pub const DEFAULT_EMERGENCY_INSTRUCTION: &str =
    "Please seek professional medical help immediately.";

/// Instructions for the emergency banner, or `None` when the result is not
/// critical. Never returns an empty list.
pub fn emergency_instructions(result: &AnalysisResult) -> Option<Vec<String>> {
    if result.risk_level != RiskLevel::Critical {
        return None;
    }
    let listed: Vec<String> = result
        .emergency_instructions
        .iter()
        .flatten()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if listed.is_empty() {
        return Some(vec![DEFAULT_EMERGENCY_INSTRUCTION.to_string()]);
    }
    Some(listed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Low,
    Medium,
    High,
}

impl ScoreBand {
    /// Each band includes its lower bound: 40 is medium, 70 is high.
    pub fn for_score(score: u8) -> Self {
        match score {
            0..=39 => ScoreBand::Low,
            40..=69 => ScoreBand::Medium,
            _ => ScoreBand::High,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScoreBand::Low => "low",
            ScoreBand::Medium => "medium",
            ScoreBand::High => "high",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            ScoreBand::Low => "green",
            ScoreBand::Medium => "yellow",
            ScoreBand::High => "red",
        }
    }
}

pub fn risk_palette(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "green",
        RiskLevel::Moderate => "yellow",
        RiskLevel::High => "orange",
        RiskLevel::Critical => "red",
    }
}
