
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::{QaRow, SENTINEL};
use crate::config::TranscriptEncoding;
use crate::{RagError, Result};

/// Read and unpack a transcript file
#[inline]
pub fn unpack_transcript(path: &Path, encoding: TranscriptEncoding) -> Result<Vec<QaRow>> {
    if !path.exists() {
        return Err(RagError::InputNotFound(path.to_path_buf()));
    }

    let bytes = fs::read(path)?;
    let text = decode(bytes, encoding)
        .map_err(|e| RagError::Dataset(format!("{}: {}", path.display(), e)))?;
    let rows = parse_transcript(&text);

    info!("Unpacked {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Decode transcript bytes
#[inline]
pub fn decode(bytes: Vec<u8>, encoding: TranscriptEncoding) -> std::result::Result<String, String> {
    match encoding {
        TranscriptEncoding::Utf8 => {
            String::from_utf8(bytes).map_err(|e| format!("Invalid UTF-8 in transcript: {}", e))
        }
        // Every Latin-1 byte maps to the code point of the same value
        TranscriptEncoding::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
    }
}

/// Turn transcript text into QA rows.
///
/// Each trimmed line is matched against the `URL:`, `QUESTION:` and
/// `ANSWER:` prefixes and the bare sentinel line; anything else is ignored.
/// A question is only emitted once its answer arrives. A question still
/// pending when another question, a URL, a sentinel or the end of input
/// arrives is dropped, as is an answer with no pending question.
#[inline]
pub fn parse_transcript(text: &str) -> Vec<QaRow> {
    let mut rows = Vec::new();
    let mut current_url = String::new();
    let mut pending: Option<String> = None;

    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.trim();

        if let Some(rest) = line.strip_prefix("URL:") {
            drop_pending(&mut pending, line_no, "new URL");
            current_url = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("QUESTION:") {
            drop_pending(&mut pending, line_no, "new question");
            pending = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("ANSWER:") {
            match pending.take() {
                Some(question) => rows.push(QaRow::new(&current_url, question, rest.trim())),
                None => debug!(
                    "Dropping answer without a question at line {}",
                    line_no + 1
                ),
            }
        } else if line == SENTINEL {
            drop_pending(&mut pending, line_no, "sentinel");
            rows.push(QaRow::sentinel(&current_url));
        }
    }

    drop_pending(&mut pending, text.lines().count(), "end of input");
    rows
}

fn drop_pending(pending: &mut Option<String>, line_no: usize, reason: &str) {
    if let Some(question) = pending.take() {
        debug!(
            "Dropping unanswered question before line {} ({}): {}",
            line_no + 1,
            reason,
            question
        );
    }
}
