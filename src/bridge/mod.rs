//! Completion-detection and extraction bridge.
//!
//! Submits a generated prompt to an externally-hosted chat page (behind
//! the [`ContentHost`] abstraction), watches the rendered transcript
//! until the answer has finished appearing, and isolates exactly the
//! newly produced text.

pub mod controller;
pub mod extractor;
pub mod host;
pub mod sentinel;
pub mod session;
pub mod stability;
pub mod state;

pub use controller::BridgeController;
pub use host::{ContentHost, InjectionAck};
pub use session::InjectionSession;
pub use stability::{StabilityDecision, StabilityTracker, STABLE_THRESHOLD};
pub use state::{
    CompletionOutcome, CompletionResult, PollSample, PromptSpec, SessionOptions, SessionPhase,
};
