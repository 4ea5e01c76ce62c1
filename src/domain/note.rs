//! Voice note records as delivered by the Jarvis Bot.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Number of id characters used in filenames
pub const SHORT_ID_LEN: usize = 8;

/// A transcribed voice message waiting to be written to the vault.
///
/// Only exists for the duration of one sync pass; the remote service is the
/// source of truth for whether a note is still pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceNote {
    /// Remote identifier (dedup key, filename component)
    pub id: String,

    /// Transcribed text
    pub transcription: String,

    /// When the message was recorded
    pub timestamp: DateTime<Utc>,

    /// Sender phone number
    pub phone: String,

    /// Remote processed flag (informational only)
    pub processed: bool,
}

/// Wire shape of a voice note, before validation
#[derive(Debug, Clone, Deserialize)]
pub struct RawVoiceNote {
    pub id: Option<String>,
    pub transcription: Option<String>,
    pub timestamp: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub processed: Option<bool>,
}

impl VoiceNote {
    /// First characters of the id, used to keep filenames unique
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(SHORT_ID_LEN) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }
}

impl TryFrom<RawVoiceNote> for VoiceNote {
    type Error = String;

    fn try_from(raw: RawVoiceNote) -> Result<Self, Self::Error> {
        let id = raw.id.filter(|id| !id.trim().is_empty()).ok_or("missing or empty 'id'")?;
        let transcription = raw.transcription.ok_or("missing 'transcription'")?;
        let timestamp_str = raw.timestamp.ok_or("missing 'timestamp'")?;
        let timestamp = parse_timestamp(&timestamp_str)
            .ok_or_else(|| format!("unparseable timestamp '{}'", timestamp_str))?;

        Ok(Self {
            id,
            transcription,
            timestamp,
            phone: raw.phone.unwrap_or_default(),
            processed: raw.processed.unwrap_or(false),
        })
    }
}

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339 (with offset). Offset-less date-times are host-local
/// time; bare dates are UTC midnight.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    parse_timestamp_in(value, &Local)
}

/// [`parse_timestamp`] with offset-less date-times read in `tz`
pub fn parse_timestamp_in<Tz: TimeZone>(value: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            // Inside a DST gap there is no local reading; fall back to UTC
            let local = tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc));
            return Some(local.unwrap_or_else(|| naive.and_utc()));
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
