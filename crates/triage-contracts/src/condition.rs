use serde::{Deserialize, Serialize};

/// Topics offered as one-click lookups.
pub const COMMON_CONDITIONS: &[&str] = &[
    "Common Cold",
    "Influenza (Flu)",
    "Migraine",
    "Hypertension",
    "Type 2 Diabetes",
    "Asthma",
    "Gastroenteritis",
    "Anxiety Disorder",
];

/// Knowledge-base article for a single condition. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionDetails {
    pub name: String,
    pub overview: String,
    pub symptoms: Vec<String>,
    pub causes: Vec<String>,
    pub diagnosis: String,
    pub treatment: Vec<String>,
    pub prevention: Vec<String>,
}
