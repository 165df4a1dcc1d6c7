//! Runtime configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use triage_contracts::schema::{DEFAULT_MODEL, DEFAULT_THINKING_BUDGET};

use crate::gemini::DEFAULT_API_BASE;

pub const DEFAULT_GATEWAY: &str = "gemini";
pub const DEFAULT_HOME: &str = ".triage";
pub const API_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY", "API_KEY"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageConfig {
    /// First non-empty value among `API_KEY_VARS`.
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub gateway: String,
    /// Holds `history.json`, `events.jsonl` and the optional `profiles.json`.
    pub home: PathBuf,
    /// `None` leaves timeouts to the gateway.
    pub request_timeout: Option<Duration>,
    pub thinking_budget: u32,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            gateway: DEFAULT_GATEWAY.to_string(),
            home: PathBuf::from(DEFAULT_HOME),
            request_timeout: None,
            thinking_budget: DEFAULT_THINKING_BUDGET,
        }
    }
}

impl TriageConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(non_empty_env)
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let request_timeout = match lookup("TRIAGE_REQUEST_TIMEOUT") {
            Some(raw) => {
                let seconds: f64 = raw
                    .parse()
                    .with_context(|| format!("invalid TRIAGE_REQUEST_TIMEOUT '{raw}'"))?;
                if !seconds.is_finite() || seconds <= 0.0 {
                    anyhow::bail!("TRIAGE_REQUEST_TIMEOUT must be a positive number of seconds");
                }
                Some(Duration::try_from_secs_f64(seconds).with_context(|| {
                    format!("TRIAGE_REQUEST_TIMEOUT '{raw}' is out of range")
                })?)
            }
            None => None,
        };
        let thinking_budget = match lookup("TRIAGE_THINKING_BUDGET") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid TRIAGE_THINKING_BUDGET '{raw}'"))?,
            None => defaults.thinking_budget,
        };

        Ok(Self {
            api_key: API_KEY_VARS.iter().find_map(|key| lookup(key)),
            api_base: lookup("GEMINI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            model: lookup("TRIAGE_MODEL").unwrap_or(defaults.model),
            gateway: lookup("TRIAGE_GATEWAY")
                .map(|value| value.to_ascii_lowercase())
                .unwrap_or(defaults.gateway),
            home: lookup("TRIAGE_HOME")
                .map(PathBuf::from)
                .unwrap_or(defaults.home),
            request_timeout,
            thinking_budget,
        })
    }

    pub fn history_path(&self) -> PathBuf {
        self.home.join("history.json")
    }

    pub fn events_path(&self) -> PathBuf {
        self.home.join("events.jsonl")
    }

    pub fn profiles_path(&self) -> PathBuf {
        self.home.join("profiles.json")
    }
}

pub fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
