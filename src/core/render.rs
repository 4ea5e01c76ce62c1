//! Rendering voice notes into vault files.
//!
//! Everything here is a pure function of the note and the formatting
//! settings: the same note always maps to the same filename, which is what
//! lets the pipeline detect notes that were already written.

use chrono::{DateTime, Datelike, TimeZone, Timelike};

use crate::domain::VoiceNote;

/// Characters of the transcription considered for the filename preview
pub const PREVIEW_CHARS: usize = 30;

/// Characters that are not safe in filenames on common filesystems
const UNSAFE_FILENAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Footer appended to every note
pub const FOOTER: &str = "*Synced from WhatsApp Voice Notes*";

/// A piece of a date template during substitution
#[derive(Clone, Copy)]
enum Piece<'a> {
    Template(&'a str),
    Value(usize),
}

/// Substitute date tokens in `template`.
///
/// Tokens are `YYYY`, `MM`, `DD`, `HH` and `mm`, matched case-sensitively and
/// applied in that order. Each token replaces only its first occurrence, and
/// only in template text: substituted values are never scanned again.
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>, template: &str) -> String {
    let values = [
        ("YYYY", format!("{:04}", date.year())),
        ("MM", format!("{:02}", date.month())),
        ("DD", format!("{:02}", date.day())),
        ("HH", format!("{:02}", date.hour())),
        ("mm", format!("{:02}", date.minute())),
    ];

    let mut pieces = vec![Piece::Template(template)];

    for (idx, (token, _)) in values.iter().enumerate() {
        let found = pieces.iter().enumerate().find_map(|(i, piece)| match piece {
            Piece::Template(text) => text.find(token).map(|pos| (i, *text, pos)),
            Piece::Value(_) => None,
        });

        if let Some((i, text, pos)) = found {
            pieces.splice(
                i..=i,
                [
                    Piece::Template(&text[..pos]),
                    Piece::Value(idx),
                    Piece::Template(&text[pos + token.len()..]),
                ],
            );
        }
    }

    pieces
        .iter()
        .map(|piece| match piece {
            Piece::Template(text) => *text,
            Piece::Value(idx) => values[*idx].1.as_str(),
        })
        .collect()
}

/// Replace filesystem-unsafe characters with `-`
pub fn sanitize_for_filename(value: &str) -> String {
    value
        .chars()
        .map(|c| if UNSAFE_FILENAME_CHARS.contains(&c) { '-' } else { c })
        .collect()
}

/// Short slug of the start of a transcription.
///
/// Takes the first [`PREVIEW_CHARS`] characters, keeps ASCII letters, digits,
/// `_`, `-` and whitespace, turns every whitespace run into one `-` and
/// lowercases the result.
pub fn preview_slug(transcription: &str) -> String {
    let mut slug = String::new();
    let mut in_whitespace = false;

    let kept = transcription
        .chars()
        .take(PREVIEW_CHARS)
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace());

    for c in kept {
        if c.is_whitespace() {
            if !in_whitespace {
                slug.push('-');
            }
            in_whitespace = true;
        } else {
            in_whitespace = false;
            slug.push(c.to_ascii_lowercase());
        }
    }

    slug
}

/// Filename for a note: `voice-note-<timestamp>-<short-id>-<preview>.md`
pub fn render_filename<Tz: TimeZone>(note: &VoiceNote, date_format: &str, tz: &Tz) -> String {
    let local = note.timestamp.with_timezone(tz);
    let timestamp = sanitize_for_filename(&format_date(&local, date_format));

    format!(
        "voice-note-{}-{}-{}.md",
        timestamp,
        sanitize_for_filename(note.short_id()),
        preview_slug(&note.transcription)
    )
}

/// Markdown body for a note
pub fn render_content<Tz: TimeZone>(
    note: &VoiceNote,
    include_metadata: bool,
    date_format: &str,
    tz: &Tz,
) -> String {
    let mut content = String::new();

    if include_metadata {
        let date = format_date(&note.timestamp.with_timezone(tz), date_format);
        content.push_str(&format!("# Voice Note - {}\n\n", date));
        content.push_str(&format!("**Date:** {}\n", date));
        content.push_str(&format!("**Source:** WhatsApp ({})\n", note.phone));
        content.push_str(&format!("**ID:** {}\n\n", note.id));
    }

    content.push_str("## Transcription\n\n");
    content.push_str(&note.transcription);
    content.push_str("\n\n---\n");
    content.push_str(FOOTER);

    content
}
