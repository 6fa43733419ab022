//! The injection session state machine.
//!
//! One session submits one prompt to a remote chat page and watches the
//! rendered transcript until the answer has finished appearing, then
//! extracts it. The remote service offers no structured API or callback,
//! so completion is inferred from two signals joined together: the
//! visible text length has stopped changing, and the completion marker
//! has appeared often enough to account for the echoed prompt plus the
//! assistant's own terminator.
//!
//! Sessions are single-use: `run` consumes the session and the host. A
//! new prompt requires a new session.

use log::{debug, info, warn};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::extractor;
use super::host::{ContentHost, InjectionAck};
use super::stability::{StabilityDecision, StabilityTracker};
use super::state::{
    CompletionOutcome, CompletionResult, PollSample, PromptSpec, SessionOptions, SessionPhase,
};
use crate::prompts::COMPLETION_MARKER;

pub struct InjectionSession<H: ContentHost> {
    host: H,
    prompt: PromptSpec,
    target_url: String,
    options: SessionOptions,
    phase: SessionPhase,
    stability: StabilityTracker,
    last_sample: Option<PollSample>,
}

impl<H: ContentHost> InjectionSession<H> {
    pub fn new(host: H, prompt: PromptSpec, target_url: String, options: SessionOptions) -> Self {
        let stability = StabilityTracker::new(options.stable_threshold);
        Self {
            host,
            prompt,
            target_url,
            options,
            phase: SessionPhase::Idle,
            stability,
            last_sample: None,
        }
    }

    /// Drive the session to a terminal result.
    ///
    /// Every exit path, including cancellation racing a probe in flight,
    /// releases the host exactly once before the result is returned.
    /// Failures are returned as values; nothing escapes as an error.
    pub async fn run(mut self, cancel: CancellationToken) -> CompletionResult {
        let result = self.drive(&cancel).await;

        self.host.dispose().await;
        self.set_phase(if result.is_success() {
            SessionPhase::Completed
        } else {
            SessionPhase::Failed
        });

        info!(
            "injection session finished: {} (required {} sentinel(s))",
            result.outcome.as_str(),
            self.prompt.required_sentinel_count()
        );
        result
    }

    async fn drive(&mut self, cancel: &CancellationToken) -> CompletionResult {
        self.set_phase(SessionPhase::Loading);
        let loaded = tokio::select! {
            _ = cancel.cancelled() => return CompletionResult::failure(CompletionOutcome::Cancelled),
            loaded = self.host.load(&self.target_url) => loaded,
        };
        if let Err(err) = loaded {
            warn!("host failed to load {}: {err:#}", self.target_url);
            return CompletionResult::failure(CompletionOutcome::HostError);
        }

        self.set_phase(SessionPhase::Injecting);
        // The timeout ceiling covers everything from injection up to the
        // confirmed-stable re-probe.
        let deadline = Instant::now() + self.options.timeout;

        let ack = tokio::select! {
            _ = cancel.cancelled() => return CompletionResult::failure(CompletionOutcome::Cancelled),
            _ = time::sleep_until(deadline) => return CompletionResult::failure(CompletionOutcome::Timeout),
            ack = self.host.inject_and_submit(self.prompt.text()) => ack,
        };
        match ack {
            Ok(InjectionAck::Submitted) => {}
            Ok(InjectionAck::InputNotFound) => {
                warn!("no editable surface found on {}", self.target_url);
                return CompletionResult::failure(CompletionOutcome::InputNotFound);
            }
            Err(err) => {
                warn!("injection failed: {err:#}");
                return CompletionResult::failure(CompletionOutcome::HostError);
            }
        }

        self.set_phase(SessionPhase::Monitoring);
        if let Some(failure) = self.monitor(cancel, deadline).await {
            return failure;
        }

        self.set_phase(SessionPhase::StableConfirmed);
        // One extra confirmation read after a settle delay, so a late
        // re-render between the last poll and extraction is not missed.
        tokio::select! {
            _ = cancel.cancelled() => return CompletionResult::failure(CompletionOutcome::Cancelled),
            _ = time::sleep_until(deadline) => return CompletionResult::failure(CompletionOutcome::Timeout),
            _ = time::sleep(self.options.settle_delay) => {}
        }
        let reprobed = tokio::select! {
            _ = cancel.cancelled() => return CompletionResult::failure(CompletionOutcome::Cancelled),
            probed = self.host.probe_visible_text() => probed,
        };
        let final_text = match reprobed {
            Ok(text) => text,
            Err(err) => {
                warn!("confirmation probe failed: {err:#}");
                return CompletionResult::failure(CompletionOutcome::HostError);
            }
        };

        self.set_phase(SessionPhase::Extracting);
        match extractor::extract(
            &final_text,
            self.prompt.own_sentinel_count(),
            COMPLETION_MARKER,
        ) {
            Ok(answer) => CompletionResult::success(answer),
            Err(err) => {
                warn!("extraction failed: {err:#}");
                CompletionResult::failure(CompletionOutcome::HostError)
            }
        }
    }

    /// Poll the transcript until it is both sentinel-complete and quiet.
    /// Returns `None` on success, or the failure that ended monitoring.
    async fn monitor(
        &mut self,
        cancel: &CancellationToken,
        deadline: Instant,
    ) -> Option<CompletionResult> {
        let required = self.prompt.required_sentinel_count();

        // Recurring-timer cadence: the first probe fires one full
        // interval after monitoring begins.
        let mut ticker = time::interval_at(
            Instant::now() + self.options.poll_interval,
            self.options.poll_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("injection session cancelled while monitoring");
                    return Some(CompletionResult::failure(CompletionOutcome::Cancelled));
                }
                _ = time::sleep_until(deadline) => {
                    let last_length = self.last_sample.as_ref().map(|sample| sample.length);
                    warn!(
                        "stability not reached within {:?} (last visible length {:?})",
                        self.options.timeout, last_length
                    );
                    return Some(CompletionResult::failure(CompletionOutcome::Timeout));
                }
                _ = ticker.tick() => {}
            }

            let probed = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("injection session cancelled during probe");
                    return Some(CompletionResult::failure(CompletionOutcome::Cancelled));
                }
                _ = time::sleep_until(deadline) => {
                    warn!("probe did not return within the session ceiling");
                    return Some(CompletionResult::failure(CompletionOutcome::Timeout));
                }
                probed = self.host.probe_visible_text() => probed,
            };
            let text = match probed {
                Ok(text) => text,
                Err(err) => {
                    warn!("transcript probe failed: {err:#}");
                    return Some(CompletionResult::failure(CompletionOutcome::HostError));
                }
            };

            let sample = PollSample::capture(text);
            let decision = self.stability.observe(sample.length);
            let sentinel_deficient = sample.sentinel_count < required;
            debug!(
                "poll: length={} sentinels={}/{} decision={:?}",
                sample.length, sample.sentinel_count, required, decision
            );
            self.last_sample = Some(sample);

            if sentinel_deficient {
                // Generation cannot be finished yet no matter how quiet
                // the page looks (e.g. a network stall); a quiet run that
                // reaches the threshold early must not survive into the
                // post-sentinel window.
                if decision == StabilityDecision::Stable {
                    self.stability.reset();
                }
                continue;
            }

            if decision == StabilityDecision::Stable {
                return None;
            }
        }
    }

    fn set_phase(&mut self, next: SessionPhase) {
        debug!("session phase {:?} -> {next:?}", self.phase);
        self.phase = next;
    }
}
