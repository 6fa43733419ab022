//! Bridge data types: session phases, options, prompt and poll samples,
//! and the terminal completion result.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sentinel;
use crate::prompts::COMPLETION_MARKER;

/// Lifecycle phase of an injection session. Exactly one phase is live at
/// a time and it is owned by the session itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Idle,
    Loading,
    Injecting,
    Monitoring,
    StableConfirmed,
    Extracting,
    Completed,
    Failed,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Completed | SessionPhase::Failed)
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CompletionOutcome {
    Success,
    /// The remote page had no editable surface to inject into.
    InputNotFound,
    /// Stability was never reached within the configured ceiling.
    Timeout,
    /// Transport or script failure while loading, injecting or probing,
    /// or the echoed prompt structure never materialized.
    HostError,
    /// The caller cancelled the session.
    Cancelled,
}

impl CompletionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionOutcome::Success => "Success",
            CompletionOutcome::InputNotFound => "InputNotFound",
            CompletionOutcome::Timeout => "Timeout",
            CompletionOutcome::HostError => "HostError",
            CompletionOutcome::Cancelled => "Cancelled",
        }
    }
}

/// Terminal result of one injection session. Produced exactly once;
/// failures carry no answer text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    pub outcome: CompletionOutcome,
    pub answer_text: Option<String>,
}

impl CompletionResult {
    pub fn success(answer_text: String) -> Self {
        Self {
            outcome: CompletionOutcome::Success,
            answer_text: Some(answer_text),
        }
    }

    pub fn failure(outcome: CompletionOutcome) -> Self {
        Self {
            outcome,
            answer_text: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == CompletionOutcome::Success
    }
}

/// The prompt to submit, with its own marker count precomputed.
///
/// Templates may legitimately mention the completion marker as an
/// instruction, so the count is not always zero; the session expects the
/// transcript to reach `own_sentinel_count() + 1` occurrences (the
/// echoed prompt plus the assistant's terminator) before completion.
#[derive(Debug, Clone)]
pub struct PromptSpec {
    text: String,
    own_sentinel_count: usize,
}

impl PromptSpec {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let own_sentinel_count = sentinel::count(&text, COMPLETION_MARKER);
        Self {
            text,
            own_sentinel_count,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn own_sentinel_count(&self) -> usize {
        self.own_sentinel_count
    }

    /// Marker occurrences the transcript must reach before the answer
    /// can be complete: every echoed prompt marker plus the assistant's
    /// obligatory terminator.
    pub fn required_sentinel_count(&self) -> usize {
        self.own_sentinel_count + 1
    }
}

/// One probe of the rendered transcript. Superseded by the next poll
/// tick; never persisted.
#[derive(Debug, Clone)]
pub struct PollSample {
    pub raw_text: String,
    /// Visible length in chars, so multi-byte glyphs cannot fake growth.
    pub length: usize,
    pub sentinel_count: usize,
    pub timestamp: DateTime<Utc>,
}

impl PollSample {
    pub fn capture(raw_text: String) -> Self {
        let length = raw_text.chars().count();
        let sentinel_count = sentinel::count(&raw_text, COMPLETION_MARKER);
        Self {
            raw_text,
            length,
            sentinel_count,
            timestamp: Utc::now(),
        }
    }
}

/// Tunables for one injection session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub poll_interval: Duration,
    pub stable_threshold: u32,
    pub settle_delay: Duration,
    pub timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            stable_threshold: super::stability::STABLE_THRESHOLD,
            settle_delay: Duration::from_millis(2000),
            timeout: Duration::from_secs(120),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_spec_counts_its_own_markers() {
        let plain = PromptSpec::new("write a poem about rain");
        assert_eq!(plain.own_sentinel_count(), 0);
        assert_eq!(plain.required_sentinel_count(), 1);

        let with_footer = PromptSpec::new(format!(
            "write a poem about rain\nEnd with {COMPLETION_MARKER} on its own line."
        ));
        assert_eq!(with_footer.own_sentinel_count(), 1);
        assert_eq!(with_footer.required_sentinel_count(), 2);
    }

    #[test]
    fn poll_sample_length_is_in_chars() {
        let sample = PollSample::capture("héllo — ça va".to_string());
        assert_eq!(sample.length, "héllo — ça va".chars().count());
        assert_eq!(sample.sentinel_count, 0);
    }
}
