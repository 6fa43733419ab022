//! Answer extraction from the rendered transcript.
//!
//! The transcript seen by a probe contains the echoed prompt (with any
//! markers the template itself carried), the freshly generated answer,
//! and the assistant's own closing marker, surrounded by page chrome.
//! The answer is the text between the last prompt-echo marker and the
//! closing marker.

use anyhow::{bail, Result};

/// Isolate the assistant's answer from `full_text`.
///
/// `prompt_marker_count` is how many times the marker appears in the
/// prompt itself; the answer starts immediately after that many echoed
/// occurrences and ends immediately before the next one. When the
/// closing occurrence is missing the remainder of the text is taken
/// (see the fallback note in DESIGN.md). When fewer than
/// `prompt_marker_count` occurrences exist at all, the expected echo
/// structure never materialized and extraction fails.
pub fn extract(full_text: &str, prompt_marker_count: usize, marker: &str) -> Result<String> {
    assert!(!marker.is_empty(), "sentinel marker must not be empty");

    let mut start = 0usize;
    for seen in 0..prompt_marker_count {
        match full_text[start..].find(marker) {
            Some(offset) => start += offset + marker.len(),
            None => bail!(
                "transcript contains {} marker(s), expected at least {} from the echoed prompt",
                seen,
                prompt_marker_count
            ),
        }
    }

    let answer = match full_text[start..].find(marker) {
        Some(offset) => &full_text[start..start + offset],
        None => &full_text[start..],
    };

    Ok(answer.trim().to_string())
}
