use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::analysis::AnalysisResult;

const RULE: &str = "----------------------------------------";

/// Plain-text report with a fixed section order: header, risk and urgency,
/// summary, possible conditions, recommendations, lab analysis (if any),
/// medications (if any), doctor summary, disclaimer.
pub fn render_report(result: &AnalysisResult, generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "AI MEDICAL TRIAGE REPORT");
    let _ = writeln!(out, "Date: {}", generated_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out);
    let _ = writeln!(out, "RISK LEVEL: {}", result.risk_level.as_str());
    let _ = writeln!(out, "URGENCY: {}", result.urgency.as_str());
    let _ = writeln!(out);
    let _ = writeln!(out, "SUMMARY");
    let _ = writeln!(out, "{}", result.summary);
    let _ = writeln!(out);
    push_list(&mut out, "POSSIBLE CONDITIONS", &result.possible_conditions);
    push_list(&mut out, "RECOMMENDATIONS", &result.recommendations);

    if let Some(lab) = result
        .lab_analysis
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
    {
        let _ = writeln!(out, "LAB REPORT ANALYSIS");
        let _ = writeln!(out, "{lab}");
        let _ = writeln!(out);
    }

    if !result.medications.is_empty() {
        let _ = writeln!(out, "MEDICATIONS");
        for medication in &result.medications {
            let _ = writeln!(out, "- {}: {}", medication.name, medication.purpose);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "DOCTOR SUMMARY (SBAR)");
    let _ = writeln!(out, "{}", result.doctor_summary);
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out);
    let _ = writeln!(out, "DISCLAIMER");
    let _ = write!(out, "{}", result.disclaimer);
    out
}

pub fn report_file_name(generated_at: DateTime<Utc>) -> String {
    format!("Triage_Report_{}.txt", generated_at.format("%Y-%m-%d"))
}

pub fn write_report(
    path: &Path,
    result: &AnalysisResult,
    generated_at: DateTime<Utc>,
) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_report(result, generated_at))?;
    Ok(())
}

fn push_list(out: &mut String, title: &str, rows: &[String]) {
    let _ = writeln!(out, "{title}");
    for row in rows {
        let _ = writeln!(out, "- {row}");
    }
    let _ = writeln!(out);
}
