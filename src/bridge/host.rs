//! The abstract surface the bridge drives.
//!
//! A `ContentHost` is a live, rendered page on an externally-hosted chat
//! service: something that can load a target resource, write text into
//! its editable surface and submit it, and report the currently visible
//! transcript text. Concrete hosts (a webview, a driven browser) live
//! outside this crate; tests use a scripted fake.

use anyhow::Result;
use async_trait::async_trait;

/// Result of asking the host to inject and submit the prompt.
///
/// A missing editable surface is an expected condition of remote pages
/// whose layout changed, kept distinct from transport or script errors
/// so callers can offer a manual-paste fallback instead of retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionAck {
    /// The prompt was written into the input surface and submitted.
    Submitted,
    /// No editable surface was found on the page.
    InputNotFound,
}

/// Abstract rendered-page capability consumed by an injection session.
///
/// All operations may also fail with a host-level error (transport or
/// script failure), which the session surfaces as a host error outcome.
/// A host is exclusively owned by one session at a time; injection and
/// submission are not idempotent.
#[async_trait]
pub trait ContentHost: Send {
    /// Navigate the page to the target resource and wait for the load to
    /// complete.
    async fn load(&mut self, url: &str) -> Result<()>;

    /// Write `text` into the page's editable surface and trigger
    /// submission.
    async fn inject_and_submit(&mut self, text: &str) -> Result<InjectionAck>;

    /// Read the full visible transcript text as currently rendered.
    async fn probe_visible_text(&mut self) -> Result<String>;

    /// Release the page and any resources behind it. Called exactly once
    /// per session, on every exit path.
    async fn dispose(&mut self);
}
