//! Jarvis Bot HTTP client.
//!
//! Endpoints (relative to the configured base URL):
//! - GET  /api/voice-notes/unprocessed   (Bearer)
//! - POST /api/voice-notes/{id}/processed (Bearer)
//! - GET  /test-connection                (no auth)
//! - GET  /health                         (Bearer)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, Url};
use tracing::{debug, warn};

use super::VoiceNoteSource;
use crate::config::Settings;
use crate::domain::{RawVoiceNote, VoiceNote};
use crate::error::SyncError;

/// Jarvis Bot API client
pub struct RemoteClient {
    base_url: Url,
    api_key: String,
    client: reqwest::Client,
}

/// Statuses returned by the connectivity probes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionCheck {
    /// Status of the unauthenticated /test-connection probe
    pub test_connection: u16,

    /// Status of the authenticated /health probe
    pub health: u16,
}

impl RemoteClient {
    /// Create a new client.
    ///
    /// The base URL may carry a path prefix; API paths are appended to it.
    pub fn new(base_url: &str, api_key: &str, timeout: Option<Duration>) -> Result<Self, SyncError> {
        let raw = base_url.trim();
        let invalid = |reason: String| SyncError::InvalidUrl {
            url: raw.to_string(),
            reason,
        };

        let base_url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(invalid("expected an http(s) URL".to_string()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url,
            api_key: api_key.trim().to_string(),
            client: builder.build()?,
        })
    }

    /// Create from settings
    pub fn from_settings(settings: &Settings) -> Result<Self, SyncError> {
        Self::new(
            &settings.jarvis_bot_url,
            &settings.api_key,
            settings.request_timeout(),
        )
    }

    /// Build an endpoint URL from path segments (each segment is encoded)
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, "application/json")
    }

    /// Check that the service is reachable and accepts the API key
    pub async fn test_connectivity(&self) -> Result<ConnectionCheck, SyncError> {
        let test_connection = probe(
            "/test-connection",
            self.client.get(self.endpoint(&["test-connection"])),
        )
        .await?;

        let health = probe(
            "/health",
            self.authed(self.client.get(self.endpoint(&["health"]))),
        )
        .await?;

        Ok(ConnectionCheck {
            test_connection,
            health,
        })
    }
}

async fn probe(name: &'static str, request: RequestBuilder) -> Result<u16, SyncError> {
    let response = request.send().await.map_err(|e| SyncError::Probe {
        probe: name,
        reason: e.to_string(),
    })?;

    let status = response.status();
    if status.is_success() {
        debug!("Probe {} returned {}", name, status);
        return Ok(status.as_u16());
    }

    let text = response.text().await.unwrap_or_default();
    Err(SyncError::Probe {
        probe: name,
        reason: if text.trim().is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, text.trim())
        },
    })
}

#[async_trait]
impl VoiceNoteSource for RemoteClient {
    fn name(&self) -> &str {
        "jarvis-bot"
    }

    async fn fetch_pending(&self) -> Result<Vec<VoiceNote>, SyncError> {
        let url = self.endpoint(&["api", "voice-notes", "unprocessed"]);
        debug!("Fetching voice notes from {}", url);

        let response = self.authed(self.client.get(url)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::from_status(status));
        }

        let body = response.text().await?;
        parse_voice_notes(&body)
    }

    async fn acknowledge(&self, id: &str) -> Result<(), SyncError> {
        let url = self.endpoint(&["api", "voice-notes", id, "processed"]);

        let response = self.authed(self.client.post(url)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::from_status(status));
        }

        Ok(())
    }
}

/// Validate a response body into voice notes.
///
/// The body must be a JSON array, otherwise the whole fetch fails. Elements
/// without a non-empty `id`, a `transcription` and a parseable `timestamp`
/// are logged and skipped; they stay pending upstream.
pub fn parse_voice_notes(body: &str) -> Result<Vec<VoiceNote>, SyncError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| SyncError::InvalidResponse(format!("body is not JSON: {}", e)))?;

    let serde_json::Value::Array(items) = value else {
        return Err(SyncError::InvalidResponse(
            "expected a JSON array of voice notes".to_string(),
        ));
    };

    let notes = items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match parse_item(item) {
            Ok(note) => Some(note),
            Err(reason) => {
                warn!("Skipping voice note #{}: {}", i, reason);
                None
            }
        })
        .collect();

    Ok(notes)
}

fn parse_item(item: serde_json::Value) -> Result<VoiceNote, String> {
    let raw: RawVoiceNote = serde_json::from_value(item).map_err(|e| e.to_string())?;
    VoiceNote::try_from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> RemoteClient {
        RemoteClient::new(base, "KEY", None).unwrap()
    }

    #[test]
    fn test_endpoint_paths() {
        let c = client("https://bot.example.dev");
        assert_eq!(
            c.endpoint(&["api", "voice-notes", "unprocessed"]).as_str(),
            "https://bot.example.dev/api/voice-notes/unprocessed"
        );

        let c = client("https://bot.example.dev/");
        assert_eq!(
            c.endpoint(&["health"]).as_str(),
            "https://bot.example.dev/health"
        );
    }

    #[test]
    fn test_endpoint_keeps_path_prefix() {
        let c = client("https://example.dev/jarvis/");
        assert_eq!(
            c.endpoint(&["test-connection"]).as_str(),
            "https://example.dev/jarvis/test-connection"
        );
    }

    #[test]
    fn test_endpoint_encodes_note_id() {
        let c = client("https://bot.example.dev");
        assert_eq!(
            c.endpoint(&["api", "voice-notes", "a/b c", "processed"]).as_str(),
            "https://bot.example.dev/api/voice-notes/a%2Fb%20c/processed"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            RemoteClient::new("not a url", "KEY", None),
            Err(SyncError::InvalidUrl { .. })
        ));
        assert!(matches!(
            RemoteClient::new("ftp://bot.example.dev", "KEY", None),
            Err(SyncError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_parse_voice_notes() {
        let body = r#"[
            {"id": "abcd1234efgh", "transcription": "Buy milk", "timestamp": "2023-05-02T10:20:30Z", "phone": "+15550001", "processed": false},
            {"id": "n2", "transcription": "", "timestamp": "2023-05-03T08:00:00.000Z"}
        ]"#;

        let notes = parse_voice_notes(body).unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].id, "abcd1234efgh");
        assert_eq!(notes[0].phone, "+15550001");
        assert_eq!(notes[1].phone, "");
        assert!(!notes[1].processed);
    }

    #[test]
    fn test_parse_rejects_wrong_shapes() {
        assert!(matches!(
            parse_voice_notes(r#"{"notes": []}"#),
            Err(SyncError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_voice_notes("<html>"),
            Err(SyncError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_skips_malformed_records() {
        let body = r#"[
            {"id": "good0001aaaa", "transcription": "keep me", "timestamp": "2023-05-02T10:20:30Z"},
            {"id": "bad00002bbbb", "transcription": "no ts"},
            {"id": 42, "transcription": "x", "timestamp": "2023-05-02"},
            {"id": "", "transcription": "x", "timestamp": "2023-05-02"},
            "not an object",
            {"id": "good0003cccc", "transcription": "me too", "timestamp": "2023-05-02"}
        ]"#;

        let notes = parse_voice_notes(body).unwrap();
        let ids: Vec<&str> = notes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["good0001aaaa", "good0003cccc"]);
    }

    #[test]
    fn test_parse_empty_array() {
        assert!(parse_voice_notes("[]").unwrap().is_empty());
    }
}
