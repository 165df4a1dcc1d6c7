use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisResult, RiskLevel};

pub const PREVIEW_CHARS: usize = 60;

/// One logged analysis. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    pub profile_id: String,
    #[serde(rename = "date")]
    pub timestamp: DateTime<Utc>,
    pub preview: String,
    pub risk_level: RiskLevel,
    #[serde(rename = "data")]
    pub full_result: AnalysisResult,
}

/// Append-only log of analyses stored as a single JSON array.
///
/// Every mutation reads the file, edits the list, and replaces the file in
/// one rename. A file that cannot be parsed is treated as an empty log.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, result: &AnalysisResult, profile_id: &str) -> anyhow::Result<HistoryItem> {
        self.append_at(result, profile_id, Utc::now())
    }

    pub fn append_at(
        &self,
        result: &AnalysisResult,
        profile_id: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<HistoryItem> {
        let mut items = self.load();
        let item = HistoryItem {
            id: next_id(&items, now),
            profile_id: profile_id.to_string(),
            timestamp: now,
            preview: preview_for(&result.summary),
            risk_level: result.risk_level,
            full_result: result.clone(),
        };
        items.push(item.clone());
        write_items(&self.path, &items)?;
        tracing::debug!(id = %item.id, profile_id, "history item appended");
        Ok(item)
    }

    /// Items for one profile, most recent first.
    pub fn list_for(&self, profile_id: &str) -> Vec<HistoryItem> {
        let mut items: Vec<HistoryItem> = self
            .load()
            .into_iter()
            .filter(|item| item.profile_id == profile_id)
            .collect();
        items.reverse();
        items
    }

    pub fn get(&self, id: &str) -> Option<HistoryItem> {
        self.load().into_iter().find(|item| item.id == id)
    }

    /// Removes every item of `profile_id` and returns how many were dropped.
    /// Callers confirm with the user first.
    pub fn clear_for(&self, profile_id: &str) -> anyhow::Result<usize> {
        let items = self.load();
        let before = items.len();
        let kept: Vec<HistoryItem> = items
            .into_iter()
            .filter(|item| item.profile_id != profile_id)
            .collect();
        let removed = before - kept.len();
        if removed > 0 {
            write_items(&self.path, &kept)?;
        }
        Ok(removed)
    }

    pub fn load(&self) -> Vec<HistoryItem> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        if raw.trim().is_empty() {
            return Vec::new();
        }
        match serde_json::from_str::<Vec<HistoryItem>>(&raw) {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "history store unreadable; treating as empty"
                );
                Vec::new()
            }
        }
    }
}

pub fn preview_for(summary: &str) -> String {
    let head: String = summary.chars().take(PREVIEW_CHARS).collect();
    format!("{head}...")
}

fn next_id(items: &[HistoryItem], now: DateTime<Utc>) -> String {
    let mut candidate = now.timestamp_millis();
    while items.iter().any(|item| item.id == candidate.to_string()) {
        candidate += 1;
    }
    candidate.to_string()
}

fn write_items(path: &Path, items: &[HistoryItem]) -> anyhow::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(&parent)
        .with_context(|| format!("failed creating temp file in {}", parent.display()))?;
    tmp.write_all(serde_json::to_string(items)?.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .with_context(|| format!("failed replacing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::analysis::Urgency;

    fn result(summary: &str, risk_level: RiskLevel) -> AnalysisResult {
        AnalysisResult {
            risk_level,
            urgency: Urgency::Routine,
            summary: summary.to_string(),
            possible_conditions: vec!["Tension headache".to_string()],
            recommendations: vec!["Rest".to_string()],
            doctor_summary: "SBAR".to_string(),
            disclaimer: "AI only".to_string(),
            medications: Vec::new(),
            interactions: Vec::new(),
            risk_scores: Vec::new(),
            glossary: Vec::new(),
            emergency_instructions: None,
            lab_analysis: None,
            lab_predictions: None,
            suggested_follow_up_tests: None,
            follow_up_questions: None,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_780_000_000 + secs, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    #[test]
    fn append_then_list_returns_newest_first() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = HistoryStore::new(temp.path().join("history.json"));
        store.append_at(&result("first", RiskLevel::Low), "p1", at(0))?;
        let newest = store.append_at(&result("second", RiskLevel::High), "p1", at(5))?;

        let listed = store.list_for("p1");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], newest);
        assert_eq!(listed[1].full_result.summary, "first");
        assert!(store.list_for("p2").is_empty());
        Ok(())
    }

    #[test]
    fn item_copies_risk_and_builds_preview() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = HistoryStore::new(temp.path().join("history.json"));
        let summary = "x".repeat(75);
        let item = store.append_at(&result(&summary, RiskLevel::Critical), "p2", at(1))?;
        assert_eq!(item.risk_level, RiskLevel::Critical);
        assert_eq!(item.preview, format!("{}...", "x".repeat(60)));
        assert_eq!(item.id, at(1).timestamp_millis().to_string());

        assert_eq!(preview_for("short"), "short...");
        assert_eq!(preview_for(&"é".repeat(61)).chars().count(), 63);
        Ok(())
    }

    #[test]
    fn ids_stay_unique_within_one_millisecond() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = HistoryStore::new(temp.path().join("history.json"));
        let a = store.append_at(&result("a", RiskLevel::Low), "p1", at(2))?;
        let b = store.append_at(&result("b", RiskLevel::Low), "p1", at(2))?;
        assert_ne!(a.id, b.id);
        Ok(())
    }

    #[test]
    fn clear_for_only_touches_one_profile() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = HistoryStore::new(temp.path().join("history.json"));
        store.append_at(&result("mine 1", RiskLevel::Low), "p1", at(0))?;
        store.append_at(&result("mom 1", RiskLevel::Low), "p2", at(1))?;
        store.append_at(&result("mine 2", RiskLevel::Low), "p1", at(2))?;
        store.append_at(&result("mom 2", RiskLevel::Moderate), "p2", at(3))?;

        let removed = store.clear_for("p1")?;
        assert_eq!(removed, 2);
        assert!(store.list_for("p1").is_empty());
        let remaining: Vec<String> = store
            .load()
            .into_iter()
            .map(|item| item.full_result.summary)
            .collect();
        assert_eq!(remaining, vec!["mom 1", "mom 2"]);
        Ok(())
    }

    #[test]
    fn corrupt_store_is_treated_as_empty() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("history.json");
        std::fs::write(&path, "[{\"id\": ")?;
        let store = HistoryStore::new(&path);
        assert!(store.list_for("p1").is_empty());

        store.append_at(&result("fresh", RiskLevel::Low), "p1", at(0))?;
        assert_eq!(store.list_for("p1").len(), 1);
        Ok(())
    }

    #[test]
    fn persisted_item_round_trips() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = HistoryStore::new(temp.path().join("history.json"));
        let item = store.append(&result("round trip", RiskLevel::Moderate), "p3")?;

        let raw = serde_json::to_string(&item)?;
        let parsed: HistoryItem = serde_json::from_str(&raw)?;
        assert_eq!(parsed, item);
        assert_eq!(store.get(&item.id), Some(item));

        let value: serde_json::Value = serde_json::from_str(&raw)?;
        assert!(value.get("profileId").is_some());
        assert!(value.get("date").is_some());
        assert!(value.get("data").is_some());
        Ok(())
    }
}
