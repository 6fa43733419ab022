//! Owns at most one live injection session and its cancellation handle.
//!
//! The host's live page is not safe to share: injected text and
//! submission clicks are not idempotent, and concurrent probing would
//! corrupt the sentinel-count bookkeeping. Starting a second session
//! while one is running is therefore refused.

use std::sync::Arc;

use anyhow::{bail, Result};
use log::{error, info};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::host::ContentHost;
use super::session::InjectionSession;
use super::state::{CompletionOutcome, CompletionResult, PromptSpec, SessionOptions};

struct ActiveSession {
    id: String,
    cancel: CancellationToken,
    handle: JoinHandle<CompletionResult>,
}

#[derive(Clone)]
pub struct BridgeController {
    active: Arc<Mutex<Option<ActiveSession>>>,
    last_result: Arc<Mutex<Option<CompletionResult>>>,
}

impl BridgeController {
    pub fn new() -> Self {
        Self {
            active: Arc::new(Mutex::new(None)),
            last_result: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawn a session against `host` and return its id immediately.
    /// The result is collected with [`wait`](Self::wait).
    pub async fn start_session<H>(
        &self,
        host: H,
        prompt: PromptSpec,
        target_url: String,
        options: SessionOptions,
    ) -> Result<String>
    where
        H: ContentHost + 'static,
    {
        let mut guard = self.active.lock().await;
        if let Some(active) = guard.as_ref() {
            if !active.handle.is_finished() {
                bail!("an injection session is already running");
            }
        }

        let session_id = Uuid::new_v4().to_string();
        let cancel = CancellationToken::new();
        let session = InjectionSession::new(host, prompt, target_url, options);
        let handle = tokio::spawn(session.run(cancel.clone()));

        info!("injection session {session_id} started");
        *guard = Some(ActiveSession {
            id: session_id.clone(),
            cancel,
            handle,
        });

        Ok(session_id)
    }

    /// Request cancellation of the session with `session_id`.
    ///
    /// A no-op when the id is unknown or the session already reached a
    /// terminal state; the stored result is never altered. The poll loop
    /// observes the token within one tick and releases the host on its
    /// way out.
    pub async fn cancel(&self, session_id: &str) {
        let guard = self.active.lock().await;
        match guard.as_ref() {
            Some(active) if active.id == session_id && !active.handle.is_finished() => {
                info!("cancelling injection session {session_id}");
                active.cancel.cancel();
            }
            _ => {}
        }
    }

    /// Wait for the session with `session_id` to reach its terminal
    /// result. Consumes the slot so a new session can start afterwards.
    pub async fn wait(&self, session_id: &str) -> Result<CompletionResult> {
        let active = {
            let mut guard = self.active.lock().await;
            match guard.take() {
                Some(active) if active.id == session_id => active,
                other => {
                    *guard = other;
                    bail!("no injection session with id {session_id}");
                }
            }
        };

        let result = match active.handle.await {
            Ok(result) => result,
            Err(err) => {
                error!("injection session {session_id} task failed: {err}");
                CompletionResult::failure(CompletionOutcome::HostError)
            }
        };

        *self.last_result.lock().await = Some(result.clone());
        Ok(result)
    }

    /// Run a session start-to-finish and return its terminal result.
    pub async fn run_session<H>(
        &self,
        host: H,
        prompt: PromptSpec,
        target_url: String,
        options: SessionOptions,
    ) -> Result<CompletionResult>
    where
        H: ContentHost + 'static,
    {
        let session_id = self
            .start_session(host, prompt, target_url, options)
            .await?;
        self.wait(&session_id).await
    }

    /// The terminal result of the most recently finished session.
    pub async fn last_result(&self) -> Option<CompletionResult> {
        self.last_result.lock().await.clone()
    }
}

impl Default for BridgeController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::Result;
    use async_trait::async_trait;

    use super::*;
    use crate::bridge::host::InjectionAck;
    use crate::prompts::COMPLETION_MARKER;

    struct StreamingHost {
        frames: Vec<String>,
        cursor: usize,
        dispose_count: Arc<AtomicUsize>,
    }

    impl StreamingHost {
        fn finished(answer: &str) -> Self {
            let frame = format!("{answer}{COMPLETION_MARKER}");
            Self {
                frames: vec![frame; 5],
                cursor: 0,
                dispose_count: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn endless() -> Self {
            let frames = (1..500).map(|n| "x".repeat(n)).collect();
            Self {
                frames,
                cursor: 0,
                dispose_count: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl ContentHost for StreamingHost {
        async fn load(&mut self, _url: &str) -> Result<()> {
            Ok(())
        }

        async fn inject_and_submit(&mut self, _text: &str) -> Result<InjectionAck> {
            Ok(InjectionAck::Submitted)
        }

        async fn probe_visible_text(&mut self) -> Result<String> {
            let frame = self
                .frames
                .get(self.cursor)
                .or_else(|| self.frames.last())
                .cloned()
                .unwrap_or_default();
            self.cursor += 1;
            Ok(frame)
        }

        async fn dispose(&mut self) {
            self.dispose_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn refuses_a_second_live_session() {
        let controller = BridgeController::new();
        let id = controller
            .start_session(
                StreamingHost::endless(),
                PromptSpec::new("p"),
                "https://chat.example/".into(),
                SessionOptions::default(),
            )
            .await
            .unwrap();

        let second = controller
            .start_session(
                StreamingHost::endless(),
                PromptSpec::new("q"),
                "https://chat.example/".into(),
                SessionOptions::default(),
            )
            .await;
        assert!(second.is_err());

        controller.cancel(&id).await;
        let result = controller.wait(&id).await.unwrap();
        assert_eq!(result.outcome, CompletionOutcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_terminal_is_a_no_op() {
        let controller = BridgeController::new();
        let host = StreamingHost::finished("steady prose");
        let disposals = host.dispose_count.clone();

        let id = controller
            .start_session(
                host,
                PromptSpec::new("p"),
                "https://chat.example/".into(),
                SessionOptions::default(),
            )
            .await
            .unwrap();
        let result = controller.wait(&id).await.unwrap();
        assert_eq!(result.outcome, CompletionOutcome::Success);
        assert_eq!(disposals.load(Ordering::SeqCst), 1);

        // Late cancel: unknown to the controller by now, must not change
        // the stored result or touch the host again.
        controller.cancel(&id).await;
        let stored = controller.last_result().await.unwrap();
        assert_eq!(stored.outcome, CompletionOutcome::Success);
        assert_eq!(stored.answer_text.as_deref(), Some("steady prose"));
        assert_eq!(disposals.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_session_frees_the_slot() {
        let controller = BridgeController::new();
        let id = controller
            .start_session(
                StreamingHost::endless(),
                PromptSpec::new("p"),
                "https://chat.example/".into(),
                SessionOptions::default(),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        controller.cancel(&id).await;
        let result = controller.wait(&id).await.unwrap();
        assert_eq!(result.outcome, CompletionOutcome::Cancelled);

        // The slot is free again for a fresh session.
        let host = StreamingHost::finished("second attempt");
        let second = controller
            .run_session(
                host,
                PromptSpec::new("p2"),
                "https://chat.example/".into(),
                SessionOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(second.outcome, CompletionOutcome::Success);
    }
}
