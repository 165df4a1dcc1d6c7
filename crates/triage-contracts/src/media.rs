use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const DEFAULT_AUDIO_MIME: &str = "audio/wav";
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// A binary payload ready for transport: base64 text plus its MIME type.
///
/// No size or format checks happen here; whatever was read is passed on and
/// the gateway decides whether it accepts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAttachment {
    mime_type: String,
    data: String,
    name: String,
}

impl MediaAttachment {
    pub fn from_bytes(mime_type: impl Into<String>, name: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: BASE64.encode(bytes),
            name: name.into(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
        let name = path
            .file_name()
            .map(|value| value.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::from_bytes(mime_for_path(path), name, &bytes))
    }

    /// Wraps a finished microphone recording.
    pub fn recorded_audio(bytes: &[u8], mime_type: Option<&str>) -> Self {
        let mime = mime_type
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_AUDIO_MIME);
        Self::from_bytes(mime, "voice-note", bytes)
    }

    /// Accepts `data:<mime>;base64,<payload>` and keeps only the payload.
    pub fn from_data_url(data_url: &str, name: impl Into<String>) -> Result<Self> {
        let trimmed = data_url.trim();
        let Some(rest) = trimmed.strip_prefix("data:") else {
            bail!("not a data URL");
        };
        let Some((header, payload)) = rest.split_once(',') else {
            bail!("data URL has no payload");
        };
        let mime = header
            .split(';')
            .next()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(FALLBACK_MIME);
        Ok(Self {
            mime_type: mime.to_string(),
            data: payload.to_string(),
            name: name.into(),
        })
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Base64 payload without any data-URL prefix.
    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn byte_len(&self) -> usize {
        let padding = self.data.chars().rev().take_while(|ch| *ch == '=').count();
        (self.data.len() / 4 * 3).saturating_sub(padding)
    }

    /// SHA-256 of the decoded bytes, or of the raw text when it is not valid
    /// base64.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        match BASE64.decode(self.data.as_bytes()) {
            Ok(bytes) => hasher.update(bytes),
            Err(_) => hasher.update(self.data.as_bytes()),
        }
        hex::encode(hasher.finalize())
    }
}

pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "pdf" => "application/pdf",
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "webm" => "audio/webm",
        _ => FALLBACK_MIME,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;

    #[test]
    fn from_path_preserves_mime_and_name() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("lab report.PDF");
        fs::write(&path, b"%PDF-1.4")?;

        let attachment = MediaAttachment::from_path(&path)?;
        assert_eq!(attachment.mime_type(), "application/pdf");
        assert_eq!(attachment.name(), "lab report.PDF");
        assert_eq!(BASE64.decode(attachment.data())?, b"%PDF-1.4");
        assert_eq!(attachment.byte_len(), 8);
        Ok(())
    }

    #[test]
    fn from_path_reports_read_failures() {
        let err = MediaAttachment::from_path(Path::new("/definitely/missing.png"));
        assert!(err.is_err());
    }

    #[test]
    fn data_url_prefix_is_stripped() -> anyhow::Result<()> {
        let attachment =
            MediaAttachment::from_data_url("data:image/jpeg;base64,AAEC", "rash.jpg")?;
        assert_eq!(attachment.mime_type(), "image/jpeg");
        assert_eq!(attachment.data(), "AAEC");
        assert!(attachment.is_image());
        assert!(MediaAttachment::from_data_url("AAEC", "x").is_err());
        Ok(())
    }

    #[test]
    fn recorded_audio_defaults_to_wav() {
        let clip = MediaAttachment::recorded_audio(b"RIFF", None);
        assert_eq!(clip.mime_type(), DEFAULT_AUDIO_MIME);
        let webm = MediaAttachment::recorded_audio(b"RIFF", Some("audio/webm"));
        assert_eq!(webm.mime_type(), "audio/webm");
    }

    #[test]
    fn digest_is_stable_for_same_bytes() {
        let a = MediaAttachment::from_bytes("image/png", "a.png", b"same");
        let b = MediaAttachment::from_bytes("image/png", "b.png", b"same");
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }
}
