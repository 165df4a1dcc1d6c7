use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use crate::media::MediaAttachment;

pub type EventPayload = Map<String, Value>;

/// Keys whose values may hold base64 media.
const MEDIA_KEYS: &[&str] = &["data", "inlineData", "inline_data"];

/// Session log written to `events.jsonl`, one compact object per line.
///
/// Every line carries `type`, `session_id` and `ts`; payload keys are merged
/// on top. Media keys are stripped at any depth before writing.
#[derive(Debug, Clone)]
pub struct EventWriter {
    path: PathBuf,
    session_id: String,
    write_lock: Arc<Mutex<()>>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            session_id: session_id.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Appends one event and returns the object as written.
    pub fn emit(&self, event_type: &str, payload: EventPayload) -> anyhow::Result<Value> {
        let mut event = json!({
            "type": event_type,
            "session_id": self.session_id,
            "ts": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        if let Value::Object(fields) = &mut event {
            fields.extend(payload);
        }
        strip_media(&mut event);

        let mut line = serde_json::to_string(&event)?;
        line.push('\n');

        let _held = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("event log lock poisoned"))?;
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed creating {}", dir.display()))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .with_context(|| format!("failed appending to {}", self.path.display()))?;
        Ok(event)
    }
}

/// Diagnostic description of an attachment; never includes the payload.
pub fn attachment_summary(attachment: &MediaAttachment) -> Value {
    json!({
        "name": attachment.name(),
        "mime_type": attachment.mime_type(),
        "bytes": attachment.byte_len(),
        "sha256": attachment.digest(),
    })
}

fn strip_media(value: &mut Value) {
    match value {
        Value::Object(fields) => {
            fields.retain(|key, _| !MEDIA_KEYS.contains(&key.as_str()));
            fields.values_mut().for_each(strip_media);
        }
        Value::Array(rows) => rows.iter_mut().for_each(strip_media),
        _ => {}
    }
}
