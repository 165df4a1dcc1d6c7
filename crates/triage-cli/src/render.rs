//! Terminal rendering for analysis results, knowledge articles and history.

use std::fmt::Write as _;

use triage_contracts::error::GENERIC_LOOKUP_FAILURE;
use triage_contracts::presentation::{emergency_instructions, risk_palette, ScoreBand};
use triage_contracts::{AnalysisResult, ConditionDetails, HistoryItem, ProfileTable, TriageError};

pub fn render_analysis(result: &AnalysisResult, elder_mode: bool) -> String {
    let mut out = String::new();
    let gap = if elder_mode { "\n" } else { "" };

    if let Some(instructions) = emergency_instructions(result) {
        let _ = writeln!(out, "!!! EMERGENCY: ACT NOW !!!");
        for line in instructions {
            let _ = writeln!(out, "  * {line}");
        }
        let _ = writeln!(out, "{gap}");
    }

    let _ = writeln!(
        out,
        "Risk: {} [{}]   Urgency: {}",
        result.risk_level.as_str(),
        risk_palette(result.risk_level),
        result.urgency.as_str()
    );
    let _ = writeln!(out, "{gap}");
    heading(&mut out, "Summary", elder_mode);
    let _ = writeln!(out, "{}\n{gap}", result.summary);

    list(&mut out, "Possible conditions", &result.possible_conditions, elder_mode);
    list(&mut out, "Recommendations", &result.recommendations, elder_mode);

    if !result.risk_scores.is_empty() {
        heading(&mut out, "Risk scores", elder_mode);
        for score in &result.risk_scores {
            let band = ScoreBand::for_score(score.score);
            let _ = writeln!(
                out,
                "  {:<20} {:>3}/100  {} ({} band, {})",
                score.category,
                score.score,
                score.status.as_str(),
                band.as_str(),
                band.color()
            );
        }
        let _ = writeln!(out, "{gap}");
    }

    if let Some(lab) = result
        .lab_analysis
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
    {
        heading(&mut out, "Lab report analysis", elder_mode);
        let _ = writeln!(out, "{lab}\n{gap}");
    }
    if let Some(predictions) = result.lab_predictions.as_deref() {
        list(&mut out, "Lab predictions", predictions, elder_mode);
    }

    if !result.medications.is_empty() {
        heading(&mut out, "Medications", elder_mode);
        for medication in &result.medications {
            let _ = writeln!(out, "  - {}: {}", medication.name, medication.purpose);
            let _ = writeln!(out, "      side effects: {}", medication.side_effects);
            let _ = writeln!(out, "      warnings: {}", medication.warnings);
            if let Some(rationale) = medication.rationale.as_deref() {
                let _ = writeln!(out, "      why: {rationale}");
            }
            if let Some(alternatives) = medication
                .alternatives
                .as_deref()
                .filter(|text| !text.trim().is_empty())
            {
                let _ = writeln!(out, "      alternatives: {alternatives}");
            }
        }
        let _ = writeln!(out, "{gap}");
    }
    list(&mut out, "Interactions", &result.interactions, elder_mode);

    if let Some(tests) = result.suggested_follow_up_tests.as_deref() {
        list(&mut out, "Suggested follow-up tests", tests, elder_mode);
    }

    if !result.glossary.is_empty() {
        heading(&mut out, "Glossary", elder_mode);
        for entry in &result.glossary {
            let _ = writeln!(out, "  {}: {}", entry.term, entry.definition);
        }
        let _ = writeln!(out, "{gap}");
    }

    heading(&mut out, "Doctor summary (SBAR)", elder_mode);
    let _ = writeln!(out, "{}\n{gap}", result.doctor_summary);

    let questions = result.follow_up_questions();
    if !questions.is_empty() {
        heading(&mut out, "Follow-up questions (/followup <n>)", elder_mode);
        for (idx, question) in questions.iter().enumerate() {
            let _ = writeln!(out, "  {}. {question}", idx + 1);
        }
        let _ = writeln!(out, "{gap}");
    }

    let _ = write!(out, "{}", result.disclaimer);
    out
}

pub fn render_condition(details: &ConditionDetails) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", details.name);
    let _ = writeln!(out, "{}\n", details.overview);
    list(&mut out, "Symptoms", &details.symptoms, false);
    list(&mut out, "Causes", &details.causes, false);
    heading(&mut out, "Diagnosis", false);
    let _ = writeln!(out, "{}\n", details.diagnosis);
    list(&mut out, "Treatment", &details.treatment, false);
    list(&mut out, "Prevention", &details.prevention, false);
    out.trim_end().to_string()
}

pub fn render_history(items: &[HistoryItem]) -> String {
    if items.is_empty() {
        return "No history for this profile.".to_string();
    }
    items
        .iter()
        .map(|item| {
            format!(
                "{}  {}  {:<8} {}",
                item.id,
                item.timestamp.format("%Y-%m-%d %H:%M"),
                item.risk_level.as_str(),
                item.preview
            )
        })
        .collect::<Vec<String>>()
        .join("\n")
}

pub fn render_profiles(profiles: &ProfileTable, active: &str) -> String {
    profiles
        .list()
        .map(|profile| {
            let marker = if profile.id == active { "*" } else { " " };
            format!(
                "{marker} {:<4} {:<10} {}",
                profile.id,
                profile.display_name,
                profile.role.as_str()
            )
        })
        .collect::<Vec<String>>()
        .join("\n")
}

/// Lookup failures reuse the analysis taxonomy but carry their own generic
/// wording for contract violations.
pub fn lookup_failure_message(err: &TriageError) -> String {
    match err {
        TriageError::InvalidResponse(_) => GENERIC_LOOKUP_FAILURE.to_string(),
        other => other.user_message(),
    }
}

fn heading(out: &mut String, title: &str, elder_mode: bool) {
    if elder_mode {
        let _ = writeln!(out, "== {} ==", title.to_uppercase());
    } else {
        let _ = writeln!(out, "{title}:");
    }
}

fn list(out: &mut String, title: &str, rows: &[String], elder_mode: bool) {
    if rows.is_empty() {
        return;
    }
    heading(out, title, elder_mode);
    for row in rows {
        let _ = writeln!(out, "  - {row}");
    }
    let _ = writeln!(out, "{}", if elder_mode { "\n" } else { "" });
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use triage_contracts::presentation::DEFAULT_EMERGENCY_INSTRUCTION;
    use triage_contracts::{RiskLevel, RiskScore, RiskStatus, Urgency};

    use super::*;

    fn result(level: RiskLevel) -> AnalysisResult {
        AnalysisResult {
            risk_level: level,
            urgency: Urgency::Immediate,
            summary: "Chest pain with dyspnea.".to_string(),
            possible_conditions: vec!["Angina".to_string()],
            recommendations: vec!["Call 911".to_string()],
            doctor_summary: "S: chest pain.".to_string(),
            disclaimer: "Not medical advice.".to_string(),
            medications: Vec::new(),
            interactions: Vec::new(),
            risk_scores: vec![RiskScore {
                category: "Cardiac".to_string(),
                score: 70,
                status: RiskStatus::Critical,
            }],
            glossary: Vec::new(),
            emergency_instructions: None,
            lab_analysis: None,
            lab_predictions: None,
            suggested_follow_up_tests: None,
            follow_up_questions: Some(vec!["When did it start?".to_string()]),
        }
    }

    #[test]
    fn critical_result_shows_default_emergency_line() {
        let text = render_analysis(&result(RiskLevel::Critical), false);
        assert!(text.starts_with("!!! EMERGENCY"));
        assert!(text.contains(DEFAULT_EMERGENCY_INSTRUCTION));
        assert!(text.contains("high band, red"));
        assert!(text.contains("1. When did it start?"));
    }

    #[test]
    fn non_critical_result_has_no_banner() {
        let text = render_analysis(&result(RiskLevel::Moderate), true);
        assert!(!text.contains("EMERGENCY"));
        assert!(text.contains("== SUMMARY =="));
        assert!(text.ends_with("Not medical advice."));
    }

    #[test]
    fn history_lines_show_risk_and_preview() {
        let item = HistoryItem {
            id: "1700000000000".to_string(),
            profile_id: "p1".to_string(),
            timestamp: Utc::now(),
            preview: "Chest pain with dyspnea....".to_string(),
            risk_level: RiskLevel::Critical,
            full_result: result(RiskLevel::Critical),
        };
        let text = render_history(&[item]);
        assert!(text.starts_with("1700000000000"));
        assert!(text.contains("Critical"));
        assert_eq!(render_history(&[]), "No history for this profile.");
    }

    #[test]
    fn lookup_contract_violation_uses_lookup_wording() {
        assert_eq!(
            lookup_failure_message(&TriageError::InvalidResponse("bad".to_string())),
            GENERIC_LOOKUP_FAILURE
        );
        assert_eq!(
            lookup_failure_message(&TriageError::Gateway("offline".to_string())),
            "offline"
        );
    }

    #[test]
    fn profiles_mark_the_active_one() {
        let table = ProfileTable::default();
        let text = render_profiles(&table, "p2");
        assert!(text.lines().nth(1).map(|line| line.starts_with('*')).unwrap_or(false));
    }
}
